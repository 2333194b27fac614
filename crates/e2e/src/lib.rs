//! Catalog E2E Test Framework
//!
//! This crate drives the catalog web application through a browser and
//! checks the flows a catalog user depends on:
//! - Logs in with configured credentials and dismisses the confirmation overlay
//! - Selects, unselects and opens products from the listing
//! - Narrows the catalog with status and packshot filters, then clears them
//! - Searches by product reference and by free text
//! - Opens and dismisses the product sheet export modal
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteRunner                                                │
//! │    ├── run(driver, scenarios) -> TestSuiteResult            │
//! │    │     └── per case: new_page() -> Session -> execute()   │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Driver / Page                                              │
//! │    ├── PlaywrightHandle  (Node bridge, JSON lines)          │
//! │    └── SimulatedDriver   (in-process catalog)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario                                                   │
//! │    ├── login + open_catalog -> CatalogContext               │
//! │    └── products | filters | search | export                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod expect;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod selectors;
pub mod server;
pub mod session;
pub mod sim;
pub mod wait;

pub use config::SuiteConfig;
pub use error::{E2eError, E2eResult};
pub use page::{Driver, Locator, Page, WaitState};
pub use runner::{SuiteRunner, TestResult, TestSuiteResult};
pub use scenario::Scenario;
