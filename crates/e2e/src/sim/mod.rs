//! Simulated catalog application
//!
//! An in-process stand-in for the browser and the application behind it. It
//! renders the same selector contract as the real UI, with time-based fetches
//! during which `.Loader` is shown and the previous listing stays on screen.
//! Single-element queries are strict, as in Playwright.

mod app;
pub mod dataset;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::{Credentials, SuiteConfig};
use crate::error::{E2eError, E2eResult};
use crate::page::{Driver, Locator, Page, WaitState};

use app::{CatalogApp, Element};
use dataset::{generate_catalog, Product};

/// Behaviour of the simulated application
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Products in the catalog
    pub products: usize,

    /// Rows per listing page
    pub page_size: usize,

    /// Credentials the login form accepts
    pub credentials: Credentials,

    /// Show the confirmation overlay on the first catalog visit
    pub confirm_overlay: bool,

    /// Render the packshot filter group collapsed
    pub packshot_collapsed: bool,

    /// Time between an action and its data being rendered
    pub fetch_latency: Duration,

    /// How long clicks and fills wait for their element
    pub action_timeout: Duration,

    pub poll_interval: Duration,

    /// When false, the draft status filter leaves results unchanged
    pub status_filter_effective: bool,

    /// When false, the packshot filter leaves results unchanged
    pub packshot_filter_effective: bool,

    /// When false, removing filters only drops the packshot filter
    pub clear_filters_restores: bool,

    /// When true, the total label counts the selected rows
    pub selection_changes_total: bool,

    /// When false, the export modal ignores its close control
    pub close_hides_modal: bool,

    /// When true, search ignores case and returns near matches
    pub case_insensitive_search: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            products: 1204,
            page_size: 20,
            credentials: Credentials::default(),
            confirm_overlay: true,
            packshot_collapsed: true,
            fetch_latency: Duration::from_millis(100),
            action_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            status_filter_effective: true,
            packshot_filter_effective: true,
            clear_filters_restores: true,
            selection_changes_total: false,
            close_hides_modal: true,
            case_insensitive_search: false,
        }
    }
}

impl SimOptions {
    /// An application that accepts the suite's credentials and page size
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            page_size: config.catalog.page_size,
            credentials: config.credentials.clone(),
            action_timeout: config.timeouts.action(),
            poll_interval: config.timeouts.poll_interval().min(Duration::from_millis(10)),
            ..Self::default()
        }
    }
}

/// One tab on the simulated application
pub struct SimulatedPage {
    app: Mutex<CatalogApp>,
    action_timeout: Duration,
    poll_interval: Duration,
}

impl SimulatedPage {
    pub fn new(options: SimOptions) -> Self {
        let products = Arc::new(generate_catalog(options.products));
        Self::with_products(options, products)
    }

    pub fn with_products(options: SimOptions, products: Arc<Vec<Product>>) -> Self {
        Self {
            action_timeout: options.action_timeout,
            poll_interval: options.poll_interval,
            app: Mutex::new(CatalogApp::new(options, products)),
        }
    }

    #[cfg(test)]
    pub(crate) fn force_login(&self) {
        self.app.lock().force_login();
    }

    /// Current element for a locator, enforcing strictness
    fn resolve(app: &CatalogApp, locator: &Locator) -> E2eResult<Option<Element>> {
        let elements = app.elements(&locator.target);
        match locator.nth {
            Some(n) => Ok(elements.into_iter().nth(n)),
            None if elements.len() > 1 => Err(E2eError::StrictModeViolation {
                locator: locator.to_string(),
                count: elements.len(),
            }),
            None => Ok(elements.into_iter().next()),
        }
    }

    /// Read the page once
    fn inspect<T>(&self, f: impl FnOnce(&CatalogApp) -> T) -> T {
        let mut app = self.app.lock();
        app.settle(Instant::now());
        f(&app)
    }

    /// Retry `attempt` against the resolved element until it yields a value
    async fn until<T, F>(
        &self,
        locator: &Locator,
        timeout: Duration,
        what: &str,
        mut attempt: F,
    ) -> E2eResult<T>
    where
        F: FnMut(&mut CatalogApp, Option<Element>) -> E2eResult<Option<T>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut app = self.app.lock();
                app.settle(Instant::now());
                let element = Self::resolve(&app, locator)?;
                if let Some(value) = attempt(&mut app, element)? {
                    return Ok(value);
                }
            }
            if Instant::now() >= deadline {
                return Err(E2eError::Timeout(format!(
                    "{} {} after {:?}",
                    what, locator, timeout
                )));
            }
            sleep(self.poll_interval).await;
        }
    }
}

fn actionable(element: &Option<Element>) -> Option<&Element> {
    element.as_ref().filter(|e| e.visible && !e.disabled)
}

#[async_trait]
impl Page for SimulatedPage {
    async fn goto(&self, route: &str) -> E2eResult<()> {
        debug!(route, "simulated navigation");
        let mut app = self.app.lock();
        app.settle(Instant::now());
        app.navigate(route);
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.until(locator, self.action_timeout, "fill", |app, element| {
            match actionable(&element) {
                Some(Element { field: Some(field), .. }) => {
                    app.fill(*field, value);
                    Ok(Some(()))
                }
                Some(_) => Err(E2eError::Playwright(format!("{} is not an input", locator))),
                None => Ok(None),
            }
        })
        .await
    }

    async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        self.until(locator, self.action_timeout, "input value of", |_, element| {
            match element {
                Some(Element { value: Some(value), .. }) => Ok(Some(value)),
                Some(_) => Err(E2eError::Playwright(format!("{} is not an input", locator))),
                None => Ok(None),
            }
        })
        .await
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.until(locator, self.action_timeout, "click", |app, element| {
            Ok(actionable(&element).map(|e| app.perform(e.action)))
        })
        .await
    }

    async fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()> {
        let what = format!("{} state of", state.as_str());
        self.until(locator, timeout, &what, |_, element| {
            let visible = element.as_ref().map_or(false, |e| e.visible);
            Ok(state.is_satisfied(element.is_some(), visible).then_some(()))
        })
        .await
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let total = self.inspect(|app| app.elements(&locator.target).len());
        Ok(match locator.nth {
            Some(n) => usize::from(n < total),
            None => total,
        })
    }

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let element = self.inspect(|app| Self::resolve(app, locator))?;
        Ok(element.map(|e| e.text))
    }

    async fn all_text_contents(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        let elements = self.inspect(|app| app.elements(&locator.target));
        Ok(match locator.nth {
            Some(n) => elements.into_iter().nth(n).map(|e| e.text).into_iter().collect(),
            None => elements.into_iter().map(|e| e.text).collect(),
        })
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let element = self.inspect(|app| Self::resolve(app, locator))?;
        Ok(element.map_or(false, |e| e.visible))
    }

    async fn is_disabled(&self, locator: &Locator) -> E2eResult<bool> {
        let element = self.inspect(|app| Self::resolve(app, locator))?;
        Ok(element.map_or(false, |e| e.disabled))
    }

    async fn screenshot(&self, dir: &Path, name: &str) -> E2eResult<PathBuf> {
        let snapshot = self.inspect(|app| app.snapshot());
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", name));
        std::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(path)
    }

    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}

/// Hands out independent simulated tabs sharing one dataset
pub struct SimulatedDriver {
    options: SimOptions,
    products: Arc<Vec<Product>>,
    opened: AtomicUsize,
}

impl SimulatedDriver {
    pub fn new(options: SimOptions) -> Self {
        let products = Arc::new(generate_catalog(options.products));
        Self {
            options,
            products,
            opened: AtomicUsize::new(0),
        }
    }

    /// Number of pages handed out so far
    pub fn pages_opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Driver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn new_page(&self) -> E2eResult<Box<dyn Page>> {
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(SimulatedPage::with_products(
            self.options.clone(),
            Arc::clone(&self.products),
        )))
    }

    async fn shutdown(&self) -> E2eResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::*;

    #[tokio::test]
    async fn test_login_round_trip() {
        let page = SimulatedPage::new(SimOptions::default());
        page.goto(LOGIN_ROUTE).await.unwrap();

        let username = Locator::css(USERNAME_INPUT);
        page.fill(&username, "username").await.unwrap();
        assert_eq!(page.input_value(&username).await.unwrap(), "username");
        page.fill(&Locator::css(PASSWORD_INPUT), "password").await.unwrap();

        page.click(&Locator::css(SUBMIT_BUTTON)).await.unwrap();
        assert!(page.is_disabled(&Locator::css(SUBMIT_BUTTON)).await.unwrap());

        page.wait_for(&Locator::css(NAVBAR), WaitState::Visible, Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_click_on_missing_element_times_out() {
        let page = SimulatedPage::new(SimOptions {
            action_timeout: Duration::from_millis(30),
            ..SimOptions::default()
        });
        page.goto(LOGIN_ROUTE).await.unwrap();

        let err = page.click(&Locator::css(SELECT_ALL)).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_strict_mode_on_rows() {
        let page = SimulatedPage::new(SimOptions {
            fetch_latency: Duration::ZERO,
            ..SimOptions::default()
        });
        page.force_login();
        page.goto(CATALOG_ROUTE).await.unwrap();

        let rows = Locator::css(TABLE_ROW);
        assert_eq!(page.count(&rows).await.unwrap(), 20);
        assert!(matches!(
            page.text_content(&rows).await,
            Err(E2eError::StrictModeViolation { count: 20, .. })
        ));
        assert!(page.text_content(&rows.clone().first()).await.unwrap().is_some());
        assert_eq!(page.count(&rows.nth(25)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fill_rejects_non_input() {
        let page = SimulatedPage::new(SimOptions::default());
        page.goto(LOGIN_ROUTE).await.unwrap();
        let err = page.fill(&Locator::css(SUBMIT_BUTTON), "x").await.unwrap_err();
        assert!(matches!(err, E2eError::Playwright(_)));
    }

    #[tokio::test]
    async fn test_screenshot_dumps_state() {
        let dir = tempfile::tempdir().unwrap();
        let page = SimulatedPage::new(SimOptions::default());
        page.goto(LOGIN_ROUTE).await.unwrap();

        let path = page.screenshot(dir.path(), "login").await.unwrap();
        let dump: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(dump["route"], "login");
        assert_eq!(dump["logged_in"], false);
    }

    #[tokio::test]
    async fn test_driver_pages_are_independent() {
        let driver = SimulatedDriver::new(SimOptions::default());
        let first = driver.new_page().await.unwrap();
        let second = driver.new_page().await.unwrap();

        first.goto(LOGIN_ROUTE).await.unwrap();
        first.fill(&Locator::css(USERNAME_INPUT), "alice").await.unwrap();
        second.goto(LOGIN_ROUTE).await.unwrap();

        assert_eq!(
            second.input_value(&Locator::css(USERNAME_INPUT)).await.unwrap(),
            ""
        );
        assert_eq!(driver.pages_opened(), 2);
    }
}
