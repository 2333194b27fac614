//! Per-test-case execution context

use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, warn, Instrument};

use crate::config::SuiteConfig;
use crate::error::E2eResult;
use crate::expect::Expect;
use crate::page::Page;

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// The page, configuration and step log of one running test case
pub struct Session<'p> {
    page: &'p dyn Page,
    config: &'p SuiteConfig,
    steps: Vec<StepResult>,
}

impl<'p> Session<'p> {
    pub fn new(page: &'p dyn Page, config: &'p SuiteConfig) -> Self {
        Self {
            page,
            config,
            steps: Vec::new(),
        }
    }

    pub fn page(&self) -> &'p dyn Page {
        self.page
    }

    pub fn config(&self) -> &'p SuiteConfig {
        self.config
    }

    pub fn expect(&self) -> Expect<'p> {
        Expect::new(
            self.page,
            self.config.timeouts.expect(),
            self.config.timeouts.poll_interval(),
        )
    }

    /// Run one named step, recording its outcome
    pub async fn step<T, F>(&mut self, name: &str, action: F) -> E2eResult<T>
    where
        F: Future<Output = E2eResult<T>>,
    {
        let start = Instant::now();
        debug!(step = name, "running step");

        let outcome = action.instrument(debug_span!("step", step = name)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let error = match &outcome {
            Ok(_) => None,
            Err(e) => {
                warn!(step = name, error = %e, "step failed");
                Some(e.to_string())
            }
        };
        self.steps.push(StepResult {
            success: error.is_none(),
            step_name: name.to_string(),
            duration_ms,
            error,
        });
        outcome
    }

    pub fn into_steps(self) -> Vec<StepResult> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use crate::sim::{SimOptions, SimulatedPage};

    #[tokio::test]
    async fn test_steps_are_recorded_in_order() {
        let page = SimulatedPage::new(SimOptions::default());
        let config = SuiteConfig::default();
        let mut session = Session::new(&page, &config);

        session.step("first", async { Ok::<_, E2eError>(1) }).await.unwrap();
        let err = session
            .step("second", async {
                Err::<(), _>(E2eError::AssertionFailed("nope".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(_)));

        let steps = session.into_steps();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].success);
        assert_eq!(steps[1].step_name, "second");
        assert!(steps[1].error.as_deref().unwrap().contains("nope"));
    }
}
