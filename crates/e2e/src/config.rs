//! Suite configuration
//!
//! Values come from defaults, then an optional YAML file, then
//! `CATALOG_E2E_*` environment variables, then harness flags.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

pub const ENV_BASE_URL: &str = "CATALOG_E2E_BASE_URL";
pub const ENV_USERNAME: &str = "CATALOG_E2E_USERNAME";
pub const ENV_PASSWORD: &str = "CATALOG_E2E_PASSWORD";
pub const ENV_WORKERS: &str = "CATALOG_E2E_WORKERS";

/// Complete suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Base URL of the application under test (None = no live target)
    pub base_url: Option<String>,

    /// Login used by every test case
    pub credentials: Credentials,

    /// Browser launch options
    pub browser: BrowserConfig,

    /// Bounds for every wait and assertion
    pub timeouts: Timeouts,

    /// Values the scenarios expect from the catalog
    pub catalog: CatalogExpectations,

    /// Maximum number of test cases running at once
    pub workers: usize,

    /// Directory for results and failure artifacts
    pub output_dir: PathBuf,

    /// Capture the page when a test case fails
    pub screenshot_on_failure: bool,

    /// Application server to spawn before the run
    pub web_server: Option<WebServerConfig>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            credentials: Credentials::default(),
            browser: BrowserConfig::default(),
            timeouts: Timeouts::default(),
            catalog: CatalogExpectations::default(),
            workers: 1,
            output_dir: PathBuf::from("test-results"),
            screenshot_on_failure: true,
            web_server: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "username".to_string(),
            password: "password".to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: BrowserKind,
    pub headless: bool,
    pub viewport: Viewport,

    /// `NODE_PATH` for resolving the `playwright` package
    pub node_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            headless: true,
            viewport: Viewport::default(),
            node_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1280, height: 720 }
    }
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub action_ms: u64,
    pub expect_ms: u64,
    pub navigation_ms: u64,
    pub overlay_probe_ms: u64,
    pub loader_appear_ms: u64,
    pub loader_hidden_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 10_000,
            expect_ms: 5_000,
            navigation_ms: 30_000,
            overlay_probe_ms: 2_000,
            loader_appear_ms: 2_000,
            loader_hidden_ms: 30_000,
            poll_interval_ms: 50,
        }
    }
}

impl Timeouts {
    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn expect(&self) -> Duration {
        Duration::from_millis(self.expect_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn overlay_probe(&self) -> Duration {
        Duration::from_millis(self.overlay_probe_ms)
    }

    pub fn loader_appear(&self) -> Duration {
        Duration::from_millis(self.loader_appear_ms)
    }

    pub fn loader_hidden(&self) -> Duration {
        Duration::from_millis(self.loader_hidden_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> E2eResult<()> {
        let fields = [
            ("action_ms", self.action_ms),
            ("expect_ms", self.expect_ms),
            ("navigation_ms", self.navigation_ms),
            ("overlay_probe_ms", self.overlay_probe_ms),
            ("loader_appear_ms", self.loader_appear_ms),
            ("loader_hidden_ms", self.loader_hidden_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(E2eError::Config(format!("timeouts.{} must be positive", name)));
            }
        }
        Ok(())
    }
}

/// Literals the scenarios assert against
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogExpectations {
    /// Rows rendered per listing page
    pub page_size: usize,

    /// Token for the name-precision search
    pub free_text_query: String,

    /// Searched when the first row shows no reference
    pub gtin_fallback: String,

    /// Label of the bulk export dropdown with one row selected
    pub export_label: String,

    /// Dropdown entry opening the export modal
    pub export_action: String,
}

impl Default for CatalogExpectations {
    fn default() -> Self {
        Self {
            page_size: 20,
            free_text_query: "KAT".to_string(),
            gtin_fallback: "Default Value".to_string(),
            export_label: "Exporter 1".to_string(),
            export_action: "Export fiche produit".to_string(),
        }
    }
}

/// Command that serves the application, polled until reachable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebServerConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Path appended to the base URL for the readiness probe
    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

fn default_health_path() -> String {
    "/".to_string()
}

fn default_startup_timeout_ms() -> u64 {
    60_000
}

impl WebServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

impl SuiteConfig {
    /// Parse a configuration from YAML
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Load from a YAML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    E2eError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_yaml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `CATALOG_E2E_*` overrides from the process environment
    pub fn apply_env(&mut self) -> E2eResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.credentials.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.credentials.password = password;
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.workers = workers.trim().parse().map_err(|_| {
                E2eError::Config(format!("{} must be a number, got '{}'", ENV_WORKERS, workers))
            })?;
        }
        Ok(())
    }

    /// Reject configurations no scenario can run with
    pub fn validate(&self) -> E2eResult<()> {
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(E2eError::Config(format!(
                    "base_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }
        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".to_string()));
        }
        if self.catalog.page_size == 0 {
            return Err(E2eError::Config("catalog.page_size must be positive".to_string()));
        }
        if self.catalog.free_text_query.is_empty() {
            return Err(E2eError::Config("catalog.free_text_query must not be empty".to_string()));
        }
        self.timeouts.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_catalog_contract() {
        let config = SuiteConfig::default();
        assert_eq!(config.credentials.username, "username");
        assert_eq!(config.credentials.password, "password");
        assert_eq!(config.catalog.page_size, 20);
        assert_eq!(config.catalog.free_text_query, "KAT");
        assert_eq!(config.catalog.export_label, "Exporter 1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
base_url: http://localhost:3000
workers: 4
browser:
  kind: firefox
  viewport:
    width: 1920
    height: 1080
timeouts:
  expect_ms: 8000
web_server:
  command: npm
  args: [run, start]
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.workers, 4);
        assert_eq!(config.browser.kind, BrowserKind::Firefox);
        assert!(config.browser.headless);
        assert_eq!(config.browser.viewport.width, 1920);
        assert_eq!(config.timeouts.expect(), Duration::from_secs(8));
        assert_eq!(config.timeouts.action_ms, 10_000);

        let server = config.web_server.unwrap();
        assert_eq!(server.args, vec!["run", "start"]);
        assert_eq!(server.health_path, "/");
        assert_eq!(server.startup_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SuiteConfig::default();
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "https://catalog.example.test"),
            (ENV_USERNAME, "qa"),
            (ENV_WORKERS, "3"),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://catalog.example.test"));
        assert_eq!(config.credentials.username, "qa");
        assert_eq!(config.credentials.password, "password");
        assert_eq!(config.workers, 3);
    }

    #[test]
    fn test_env_rejects_bad_worker_count() {
        let mut config = SuiteConfig::default();
        let result = config.apply_env_from(|k| (k == ENV_WORKERS).then(|| "many".to_string()));
        assert!(matches!(result, Err(E2eError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SuiteConfig::default();
        config.base_url = Some("localhost:3000".to_string());
        assert!(config.validate().is_err());

        let mut config = SuiteConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = SuiteConfig::default();
        config.timeouts.loader_hidden_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let credentials = Credentials {
            username: "qa".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("qa"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_browser_kind_from_str() {
        assert_eq!("Chromium".parse::<BrowserKind>().unwrap(), BrowserKind::Chromium);
        assert_eq!("webkit".parse::<BrowserKind>().unwrap(), BrowserKind::Webkit);
        assert!("lynx".parse::<BrowserKind>().is_err());
    }
}
