//! Playwright browser automation
//!
//! A small Node script owns the browser. Rust talks to it over stdin/stdout
//! with one JSON object per line; requests carry an id so pages from
//! concurrent test cases can share the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::{BrowserKind, SuiteConfig, Viewport};
use crate::error::{E2eError, E2eResult};
use crate::page::{Driver, Locator, Page, WaitState};

static STRICT_VIOLATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"strict mode violation:.*?resolved to (\d+) elements")
        .expect("strict mode pattern is valid")
});

/// Script run by `node`; it resolves `playwright` through `NODE_PATH`
const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const pages = new Map();
let browser = null;
let nextPage = 1;

function reply(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function pageOf(req) {
  const page = pages.get(req.page);
  if (!page) throw new Error(`unknown page ${req.page}`);
  return page;
}

function locate(req) {
  const page = pageOf(req);
  const target = req.locator;
  let locator = target.text !== undefined ? page.getByText(target.text) : page.locator(target.css);
  if (target.nth !== undefined) locator = locator.nth(target.nth);
  return locator;
}

async function handle(req) {
  switch (req.op) {
    case 'launch':
      browser = await playwright[req.browser].launch({ headless: req.headless });
      return null;
    case 'newPage': {
      const context = await browser.newContext({
        baseURL: req.baseUrl,
        viewport: { width: req.width, height: req.height },
      });
      const page = await context.newPage();
      page.setDefaultTimeout(req.actionTimeoutMs);
      page.setDefaultNavigationTimeout(req.navigationTimeoutMs);
      const id = nextPage++;
      pages.set(id, page);
      return id;
    }
    case 'closePage': {
      const page = pageOf(req);
      pages.delete(req.page);
      await page.context().close();
      return null;
    }
    case 'goto':
      await pageOf(req).goto(req.url);
      return null;
    case 'fill':
      await locate(req).fill(req.value);
      return null;
    case 'inputValue':
      return await locate(req).inputValue();
    case 'click':
      await locate(req).click();
      return null;
    case 'waitFor':
      await locate(req).waitFor({ state: req.state, timeout: req.timeoutMs });
      return null;
    case 'count':
      return await locate(req).count();
    case 'textContent': {
      const locator = locate(req);
      if ((await locator.count()) === 0) return null;
      return await locator.textContent();
    }
    case 'allTextContents':
      return await locate(req).allTextContents();
    case 'isVisible':
      return await locate(req).isVisible();
    case 'isDisabled': {
      const locator = locate(req);
      if ((await locator.count()) === 0) return false;
      return await locator.isDisabled();
    }
    case 'screenshot':
      await pageOf(req).screenshot({ path: req.path, fullPage: true });
      return null;
    case 'shutdown':
      if (browser) await browser.close();
      browser = null;
      return null;
    default:
      throw new Error(`unknown op ${req.op}`);
  }
}

const rl = readline.createInterface({ input: process.stdin });
rl.on('line', (line) => {
  let req;
  try {
    req = JSON.parse(line);
  } catch (error) {
    process.stderr.write(`bad request: ${error.message}\n`);
    return;
  }
  handle(req).then(
    (value) => reply({ id: req.id, ok: true, value: value === undefined ? null : value }),
    (error) => reply({ id: req.id, ok: false, error: error.message, timeout: error.name === 'TimeoutError' }),
  ).finally(() => {
    if (req.op === 'shutdown') process.exit(0);
  });
});
rl.on('close', async () => {
  if (browser) await browser.close();
  process.exit(0);
});
"#;

/// One request to the bridge
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeCommand {
    #[serde(rename_all = "camelCase")]
    Launch { browser: String, headless: bool },
    #[serde(rename_all = "camelCase")]
    NewPage {
        base_url: String,
        width: u32,
        height: u32,
        action_timeout_ms: u64,
        navigation_timeout_ms: u64,
    },
    ClosePage { page: u64 },
    Goto { page: u64, url: String },
    Fill { page: u64, locator: Locator, value: String },
    InputValue { page: u64, locator: Locator },
    Click { page: u64, locator: Locator },
    #[serde(rename_all = "camelCase")]
    WaitFor {
        page: u64,
        locator: Locator,
        state: WaitState,
        timeout_ms: u64,
    },
    Count { page: u64, locator: Locator },
    TextContent { page: u64, locator: Locator },
    AllTextContents { page: u64, locator: Locator },
    IsVisible { page: u64, locator: Locator },
    IsDisabled { page: u64, locator: Locator },
    Screenshot { page: u64, path: String },
    Shutdown,
}

impl BridgeCommand {
    fn locator(&self) -> Option<&Locator> {
        match self {
            BridgeCommand::Fill { locator, .. }
            | BridgeCommand::InputValue { locator, .. }
            | BridgeCommand::Click { locator, .. }
            | BridgeCommand::WaitFor { locator, .. }
            | BridgeCommand::Count { locator, .. }
            | BridgeCommand::TextContent { locator, .. }
            | BridgeCommand::AllTextContents { locator, .. }
            | BridgeCommand::IsVisible { locator, .. }
            | BridgeCommand::IsDisabled { locator, .. } => Some(locator),
            _ => None,
        }
    }

    fn op(&self) -> &'static str {
        match self {
            BridgeCommand::Launch { .. } => "launch",
            BridgeCommand::NewPage { .. } => "newPage",
            BridgeCommand::ClosePage { .. } => "closePage",
            BridgeCommand::Goto { .. } => "goto",
            BridgeCommand::Fill { .. } => "fill",
            BridgeCommand::InputValue { .. } => "inputValue",
            BridgeCommand::Click { .. } => "click",
            BridgeCommand::WaitFor { .. } => "waitFor",
            BridgeCommand::Count { .. } => "count",
            BridgeCommand::TextContent { .. } => "textContent",
            BridgeCommand::AllTextContents { .. } => "allTextContents",
            BridgeCommand::IsVisible { .. } => "isVisible",
            BridgeCommand::IsDisabled { .. } => "isDisabled",
            BridgeCommand::Screenshot { .. } => "screenshot",
            BridgeCommand::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a BridgeCommand,
}

/// One reply from the bridge
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeReply {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timeout: bool,
}

impl BridgeReply {
    fn into_result(self, op: &str, locator: Option<&Locator>) -> E2eResult<serde_json::Value> {
        if self.ok {
            return Ok(self.value);
        }
        let error = self.error.unwrap_or_else(|| "unknown error".to_string());
        if let Some(count) = STRICT_VIOLATION
            .captures(&error)
            .and_then(|c| c[1].parse::<usize>().ok())
        {
            return Err(E2eError::StrictModeViolation {
                locator: locator.map_or_else(|| op.to_string(), |l| l.to_string()),
                count,
            });
        }
        let message = format!("{}: {}", op, error);
        if self.timeout {
            Err(E2eError::Timeout(message))
        } else {
            Err(E2eError::Playwright(message))
        }
    }
}

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>>;

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub viewport: Viewport,
    pub browser: BrowserKind,
    pub headless: bool,
    pub node_path: Option<PathBuf>,
    pub action_timeout: Duration,
    pub navigation_timeout: Duration,
    pub launch_timeout: Duration,

    /// Slack added on top of Playwright's own timeout for each request
    pub request_grace: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            viewport: Viewport::default(),
            browser: BrowserKind::Chromium,
            headless: true,
            node_path: None,
            action_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
            launch_timeout: Duration::from_secs(60),
            request_grace: Duration::from_secs(5),
        }
    }
}

impl PlaywrightConfig {
    pub fn from_suite(config: &SuiteConfig, base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            viewport: config.browser.viewport,
            browser: config.browser.kind,
            headless: config.browser.headless,
            node_path: config.browser.node_path.clone(),
            action_timeout: config.timeouts.action(),
            navigation_timeout: config.timeouts.navigation(),
            ..Self::default()
        }
    }
}

/// Running bridge process
struct Bridge {
    child: tokio::sync::Mutex<Child>,
    outbound: mpsc::UnboundedSender<String>,
    pending: PendingReplies,
    next_id: AtomicU64,
    _script_dir: tempfile::TempDir,
}

impl Bridge {
    async fn request(&self, command: BridgeCommand, budget: Duration) -> E2eResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let op = command.op();
        let line = serde_json::to_string(&BridgeRequest { id, command: &command })?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        debug!(id, op, "bridge request");
        if self.outbound.send(line).is_err() {
            self.pending.lock().remove(&id);
            return Err(E2eError::Playwright("bridge process is gone".to_string()));
        }

        match tokio::time::timeout(budget, rx).await {
            Ok(Ok(reply)) => reply.into_result(op, command.locator()),
            Ok(Err(_)) => Err(E2eError::Playwright(format!("{}: bridge exited before replying", op))),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(E2eError::Timeout(format!("{}: no reply from bridge within {:?}", op, budget)))
            }
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    bridge: Arc<Bridge>,
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Start the bridge and launch the browser
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(node_path) = &config.node_path {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "playwright_bridge", "{}", line);
                }
            });
        }

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = outbound_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err()
                    || stdin.write_all(b"\n").await.is_err()
                    || stdin.flush().await.is_err()
                {
                    break;
                }
            }
        });

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let routes = Arc::clone(&pending);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<BridgeReply>(&line) {
                    Ok(reply) => {
                        let waiter = routes.lock().remove(&reply.id);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(reply);
                            }
                            None => debug!(id = reply.id, "reply for abandoned request"),
                        }
                    }
                    Err(_) => debug!(target: "playwright_bridge", "{}", line),
                }
            }
            // dropping the senders wakes every waiter with an error
            routes.lock().clear();
        });

        let bridge = Arc::new(Bridge {
            child: tokio::sync::Mutex::new(child),
            outbound,
            pending,
            next_id: AtomicU64::new(1),
            _script_dir: script_dir,
        });

        bridge
            .request(
                BridgeCommand::Launch {
                    browser: config.browser.as_str().to_string(),
                    headless: config.headless,
                },
                config.launch_timeout,
            )
            .await?;

        info!(browser = config.browser.as_str(), headless = config.headless, "Playwright browser launched");
        Ok(Self { bridge, config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl Driver for PlaywrightHandle {
    fn name(&self) -> &'static str {
        "playwright"
    }

    async fn new_page(&self) -> E2eResult<Box<dyn Page>> {
        let value = self
            .bridge
            .request(
                BridgeCommand::NewPage {
                    base_url: self.config.base_url.clone(),
                    width: self.config.viewport.width,
                    height: self.config.viewport.height,
                    action_timeout_ms: self.config.action_timeout.as_millis() as u64,
                    navigation_timeout_ms: self.config.navigation_timeout.as_millis() as u64,
                },
                self.config.navigation_timeout + self.config.request_grace,
            )
            .await?;
        let id = value
            .as_u64()
            .ok_or_else(|| E2eError::Playwright(format!("newPage returned {}", value)))?;

        Ok(Box::new(PlaywrightPage {
            bridge: Arc::clone(&self.bridge),
            id,
            action_budget: self.config.action_timeout + self.config.request_grace,
            navigation_budget: self.config.navigation_timeout + self.config.request_grace,
            grace: self.config.request_grace,
        }))
    }

    async fn shutdown(&self) -> E2eResult<()> {
        let result = self
            .bridge
            .request(BridgeCommand::Shutdown, self.config.request_grace)
            .await;

        let mut child = self.bridge.child.lock().await;
        match tokio::time::timeout(self.config.request_grace, child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!("bridge did not exit, killing it");
                child.kill().await?;
            }
        }
        result.map(|_| ())
    }
}

/// A page living in the bridge process
pub struct PlaywrightPage {
    bridge: Arc<Bridge>,
    id: u64,
    action_budget: Duration,
    navigation_budget: Duration,
    grace: Duration,
}

impl PlaywrightPage {
    async fn call(&self, command: BridgeCommand) -> E2eResult<serde_json::Value> {
        self.bridge.request(command, self.action_budget).await
    }

    fn decode<T: for<'de> Deserialize<'de>>(value: serde_json::Value) -> E2eResult<T> {
        serde_json::from_value(value).map_err(E2eError::from)
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&self, route: &str) -> E2eResult<()> {
        let command = BridgeCommand::Goto {
            page: self.id,
            url: route.to_string(),
        };
        self.bridge.request(command, self.navigation_budget).await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.call(BridgeCommand::Fill {
            page: self.id,
            locator: locator.clone(),
            value: value.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        let value = self
            .call(BridgeCommand::InputValue {
                page: self.id,
                locator: locator.clone(),
            })
            .await?;
        Self::decode(value)
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.call(BridgeCommand::Click {
            page: self.id,
            locator: locator.clone(),
        })
        .await?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()> {
        let command = BridgeCommand::WaitFor {
            page: self.id,
            locator: locator.clone(),
            state,
            timeout_ms: timeout.as_millis() as u64,
        };
        self.bridge.request(command, timeout + self.grace).await?;
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let value = self
            .call(BridgeCommand::Count {
                page: self.id,
                locator: locator.clone(),
            })
            .await?;
        Self::decode(value)
    }

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let value = self
            .call(BridgeCommand::TextContent {
                page: self.id,
                locator: locator.clone(),
            })
            .await?;
        Self::decode(value)
    }

    async fn all_text_contents(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        let value = self
            .call(BridgeCommand::AllTextContents {
                page: self.id,
                locator: locator.clone(),
            })
            .await?;
        Self::decode(value)
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let value = self
            .call(BridgeCommand::IsVisible {
                page: self.id,
                locator: locator.clone(),
            })
            .await?;
        Self::decode(value)
    }

    async fn is_disabled(&self, locator: &Locator) -> E2eResult<bool> {
        let value = self
            .call(BridgeCommand::IsDisabled {
                page: self.id,
                locator: locator.clone(),
            })
            .await?;
        Self::decode(value)
    }

    async fn screenshot(&self, dir: &Path, name: &str) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.png", name));
        self.call(BridgeCommand::Screenshot {
            page: self.id,
            path: path.to_string_lossy().into_owned(),
        })
        .await?;
        Ok(path)
    }

    async fn close(&self) -> E2eResult<()> {
        self.call(BridgeCommand::ClosePage { page: self.id }).await?;
        Ok(())
    }
}
