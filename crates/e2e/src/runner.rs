//! Suite runner: one isolated page per test case, bounded concurrency

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::SuiteConfig;
use crate::error::E2eResult;
use crate::page::{Driver, Page};
use crate::scenario::Scenario;
use crate::session::{Session, StepResult};

/// Page capture written when a test case fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureArtifact {
    pub path: PathBuf,
    pub sha256: String,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub failure_artifact: Option<FailureArtifact>,
}

impl TestResult {
    fn crashed(scenario: Scenario, error: String) -> Self {
        Self {
            name: scenario.name().to_string(),
            success: false,
            started_at: Utc::now(),
            duration_ms: 0,
            steps: Vec::new(),
            error: Some(error),
            failure_artifact: None,
        }
    }

    /// Name of the step that failed, if any
    pub fn failed_step(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| !s.success)
            .map(|s| s.step_name.as_str())
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn result(&self, scenario: Scenario) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == scenario.name())
    }
}

/// Runs scenarios against pages from a driver
pub struct SuiteRunner {
    config: Arc<SuiteConfig>,
}

impl SuiteRunner {
    pub fn new(config: SuiteConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run the scenarios, at most `workers` at a time; results keep scenario order
    pub async fn run(&self, driver: Arc<dyn Driver>, scenarios: &[Scenario]) -> TestSuiteResult {
        let start = Instant::now();
        let workers = self.config.workers.max(1);
        let permits = Arc::new(Semaphore::new(workers));

        info!(
            driver = driver.name(),
            tests = scenarios.len(),
            workers,
            "Running {} test(s)...",
            scenarios.len()
        );

        let mut tasks = JoinSet::new();
        for (index, scenario) in scenarios.iter().copied().enumerate() {
            let driver = Arc::clone(&driver);
            let config = Arc::clone(&self.config);
            let permits = Arc::clone(&permits);
            let span = info_span!("case", scenario = scenario.name());

            tasks.spawn(
                async move {
                    let _permit = permits.acquire_owned().await;
                    let result = match run_case(driver.as_ref(), &config, scenario).await {
                        Ok(result) => result,
                        Err(e) => TestResult::crashed(scenario, e.to_string()),
                    };
                    (index, result)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<TestResult>> = vec![None; scenarios.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "test task panicked"),
            }
        }

        let results: Vec<TestResult> = slots
            .into_iter()
            .zip(scenarios)
            .map(|(slot, scenario)| {
                slot.unwrap_or_else(|| TestResult::crashed(*scenario, "test task aborted".to_string()))
            })
            .collect();

        let mut passed = 0;
        let mut failed = 0;
        for result in &results {
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, 0, duration_ms
        );

        TestSuiteResult {
            total: results.len(),
            passed,
            failed,
            skipped: 0,
            duration_ms,
            results,
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

async fn run_case(driver: &dyn Driver, config: &SuiteConfig, scenario: Scenario) -> E2eResult<TestResult> {
    let started_at = Utc::now();
    let start = Instant::now();
    let page = driver.new_page().await?;

    let mut session = Session::new(page.as_ref(), config);
    let outcome = scenario.execute(&mut session).await;
    let steps = session.into_steps();

    let failure_artifact = match &outcome {
        Err(_) if config.screenshot_on_failure => capture_failure(page.as_ref(), config, scenario).await,
        _ => None,
    };

    if let Err(e) = page.close().await {
        warn!(error = %e, "failed to close page");
    }

    Ok(TestResult {
        name: scenario.name().to_string(),
        success: outcome.is_ok(),
        started_at,
        duration_ms: start.elapsed().as_millis() as u64,
        steps,
        error: outcome.err().map(|e| e.to_string()),
        failure_artifact,
    })
}

async fn capture_failure(page: &dyn Page, config: &SuiteConfig, scenario: Scenario) -> Option<FailureArtifact> {
    let dir = config.output_dir.join("failures");
    let captured = match page.screenshot(&dir, scenario.name()).await {
        Ok(path) => digest_file(path),
        Err(e) => Err(e),
    };

    match captured {
        Ok(artifact) => {
            info!(path = %artifact.path.display(), "failure captured");
            Some(artifact)
        }
        Err(e) => {
            warn!(error = %e, "failed to capture failure screenshot");
            None
        }
    }
}

fn digest_file(path: PathBuf) -> E2eResult<FailureArtifact> {
    let bytes = std::fs::read(&path)?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    Ok(FailureArtifact { path, sha256 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimOptions, SimulatedDriver};

    fn quick_config(output: &std::path::Path) -> SuiteConfig {
        let mut config = SuiteConfig::default();
        config.output_dir = output.to_path_buf();
        config.timeouts.expect_ms = 1_000;
        config.timeouts.overlay_probe_ms = 500;
        config.timeouts.loader_appear_ms = 500;
        config.timeouts.loader_hidden_ms = 2_000;
        config
    }

    #[test]
    fn test_digest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(&path, b"abc").unwrap();

        let artifact = digest_file(path.clone()).unwrap();
        assert_eq!(artifact.path, path);
        assert_eq!(
            artifact.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_results_keep_scenario_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick_config(dir.path());
        config.workers = 2;
        let runner = SuiteRunner::new(config);
        let driver = Arc::new(SimulatedDriver::new(SimOptions::default()));

        let order = [Scenario::ExportProduct, Scenario::InteractWithProducts];
        let suite = runner.run(driver, &order).await;

        let names: Vec<&str> = suite.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["export-product", "interact-with-products"]);
        assert_eq!(suite.total, 2);
        assert!(suite.success(), "{:#?}", suite.results);
    }

    #[tokio::test]
    async fn test_failure_is_captured_and_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick_config(dir.path());
        config.credentials.password = "wrong".to_string();
        config.timeouts.navigation_ms = 300;
        let runner = SuiteRunner::new(config);
        let driver = Arc::new(SimulatedDriver::new(SimOptions::default()));

        let suite = runner.run(driver, &[Scenario::ExportProduct]).await;
        assert_eq!(suite.failed, 1);

        let result = suite.result(Scenario::ExportProduct).unwrap();
        assert!(result.failed_step().is_some());
        let artifact = result.failure_artifact.as_ref().unwrap();
        assert!(artifact.path.exists());
        assert_eq!(artifact.sha256.len(), 64);

        let path = runner.write_results(&suite).unwrap();
        let written: TestSuiteResult =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.failed, 1);
        assert_eq!(written.results[0].name, "export-product");
    }
}
