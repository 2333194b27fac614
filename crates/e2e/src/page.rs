//! Browser seam: locators and the page/driver traits
//!
//! Scenarios only talk to `dyn Page`. The Playwright bridge and the simulated
//! catalog both implement it, so the same scenario code runs against a real
//! browser or in-process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// How an element is found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// CSS selector
    Css(String),
    /// Visible text (case-insensitive substring, like `getByText`)
    Text(String),
}

/// An element query, optionally narrowed to the nth match
///
/// Single-element operations are strict: without `nth`, a locator that
/// resolves to several elements is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(flatten)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            target: Target::Css(selector.into()),
            nth: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            target: Target::Text(text.into()),
            nth: None,
        }
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Css(css) => write!(f, "{}", css)?,
            Target::Text(text) => write!(f, "text={:?}", text)?,
        }
        if let Some(n) = self.nth {
            write!(f, " >> nth={}", n)?;
        }
        Ok(())
    }
}

/// Element state a wait resolves on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }

    /// Whether an element observed as (`exists`, `visible`) satisfies the state
    pub fn is_satisfied(&self, exists: bool, visible: bool) -> bool {
        match self {
            WaitState::Visible => exists && visible,
            WaitState::Hidden => !exists || !visible,
            WaitState::Attached => exists,
            WaitState::Detached => !exists,
        }
    }
}

/// One browser tab, owned by a single test case
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to a route relative to the base URL
    async fn goto(&self, route: &str) -> E2eResult<()>;

    /// Replace the value of an input
    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    /// Current value of an input
    async fn input_value(&self, locator: &Locator) -> E2eResult<String>;

    /// Click once the element is visible and enabled
    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    /// Wait for the element to reach `state`, failing with `Timeout`
    async fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()>;

    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    /// Text of the element, `None` when nothing matches
    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>>;

    async fn all_text_contents(&self, locator: &Locator) -> E2eResult<Vec<String>>;

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    async fn is_disabled(&self, locator: &Locator) -> E2eResult<bool>;

    /// Capture the page into `dir`, returning the written file
    async fn screenshot(&self, dir: &Path, name: &str) -> E2eResult<PathBuf>;

    /// Release the tab and its browser context
    async fn close(&self) -> E2eResult<()>;
}

/// Produces independent pages for concurrent test cases
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn new_page(&self) -> E2eResult<Box<dyn Page>>;

    async fn shutdown(&self) -> E2eResult<()>;
}
