//! Web-first assertions
//!
//! Each assertion re-reads the page until its condition holds or the expect
//! timeout runs out, then fails with the last value it observed.

use std::fmt;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::error::{E2eError, E2eResult};
use crate::page::{Locator, Page};

/// Collapse runs of whitespace and trim, as text assertions compare
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy)]
enum Condition<'a> {
    Count(usize),
    Text(&'a str),
    NotText(&'a str),
    ContainsText(&'a str),
    AnyContainsText(&'a str),
    Visible,
    Hidden,
    Disabled,
}

impl fmt::Display for Condition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Count(n) => write!(f, "to have count {}", n),
            Condition::Text(t) => write!(f, "to have text {:?}", t),
            Condition::NotText(t) => write!(f, "not to have text {:?}", t),
            Condition::ContainsText(t) => write!(f, "to contain text {:?}", t),
            Condition::AnyContainsText(t) => write!(f, "to have an element containing {:?}", t),
            Condition::Visible => write!(f, "to be visible"),
            Condition::Hidden => write!(f, "to be hidden"),
            Condition::Disabled => write!(f, "to be disabled"),
        }
    }
}

/// Polling assertions bound to one page
#[derive(Clone, Copy)]
pub struct Expect<'p> {
    page: &'p dyn Page,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'p> Expect<'p> {
    pub fn new(page: &'p dyn Page, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            page,
            timeout,
            poll_interval,
        }
    }

    pub async fn to_have_count(&self, locator: &Locator, expected: usize) -> E2eResult<()> {
        self.poll(locator, Condition::Count(expected)).await
    }

    pub async fn to_have_text(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        self.poll(locator, Condition::Text(expected)).await
    }

    pub async fn not_to_have_text(&self, locator: &Locator, unexpected: &str) -> E2eResult<()> {
        self.poll(locator, Condition::NotText(unexpected)).await
    }

    pub async fn to_contain_text(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        self.poll(locator, Condition::ContainsText(expected)).await
    }

    /// At least one of the matched elements contains `expected`
    pub async fn to_have_any_containing(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        self.poll(locator, Condition::AnyContainsText(expected)).await
    }

    pub async fn to_be_visible(&self, locator: &Locator) -> E2eResult<()> {
        self.poll(locator, Condition::Visible).await
    }

    pub async fn to_be_hidden(&self, locator: &Locator) -> E2eResult<()> {
        self.poll(locator, Condition::Hidden).await
    }

    pub async fn to_be_disabled(&self, locator: &Locator) -> E2eResult<()> {
        self.poll(locator, Condition::Disabled).await
    }

    async fn poll(&self, locator: &Locator, condition: Condition<'_>) -> E2eResult<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let (passed, observed) = self.observe(locator, condition).await?;
            if passed {
                return Ok(());
            }
            trace!(locator = %locator, %condition, %observed, "condition not met yet");
            if Instant::now() >= deadline {
                return Err(E2eError::AssertionFailed(format!(
                    "expected {} {} within {:?}, last observed {}",
                    locator, condition, self.timeout, observed
                )));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn observe(&self, locator: &Locator, condition: Condition<'_>) -> E2eResult<(bool, String)> {
        let page = self.page;
        let outcome = match condition {
            Condition::Count(expected) => {
                let count = page.count(locator).await?;
                (count == expected, count.to_string())
            }
            Condition::Text(expected) => {
                let actual = page.text_content(locator).await?.map(|t| normalize_text(&t));
                let passed = actual.as_deref() == Some(normalize_text(expected).as_str());
                (passed, format!("{:?}", actual))
            }
            Condition::NotText(unexpected) => {
                let actual = page.text_content(locator).await?.map(|t| normalize_text(&t));
                let passed = matches!(&actual, Some(t) if *t != normalize_text(unexpected));
                (passed, format!("{:?}", actual))
            }
            Condition::ContainsText(expected) => {
                let actual = page.text_content(locator).await?;
                let passed = matches!(&actual, Some(t) if t.contains(expected));
                (passed, format!("{:?}", actual))
            }
            Condition::AnyContainsText(expected) => {
                let texts = page.all_text_contents(locator).await?;
                let passed = texts.iter().any(|t| t.contains(expected));
                (passed, format!("{:?}", texts))
            }
            Condition::Visible => {
                let visible = page.is_visible(locator).await?;
                (visible, if visible { "visible" } else { "hidden" }.to_string())
            }
            Condition::Hidden => {
                let visible = page.is_visible(locator).await?;
                (!visible, if visible { "visible" } else { "hidden" }.to_string())
            }
            Condition::Disabled => {
                let disabled = page.is_disabled(locator).await?;
                (disabled, if disabled { "disabled" } else { "enabled" }.to_string())
            }
        };
        Ok(outcome)
    }
}

/// Fail unless `actual` differs from `previous`
pub fn ensure_differs(what: &str, actual: &str, previous: &str) -> E2eResult<()> {
    if normalize_text(actual) == normalize_text(previous) {
        return Err(E2eError::AssertionFailed(format!(
            "expected {} to change, still {:?}",
            what, actual
        )));
    }
    Ok(())
}

/// Fail unless every text contains `token`
pub fn ensure_all_contain(what: &str, texts: &[String], token: &str) -> E2eResult<()> {
    let offenders: Vec<&String> = texts.iter().filter(|t| !t.contains(token)).collect();
    if !offenders.is_empty() {
        return Err(E2eError::AssertionFailed(format!(
            "expected every {} to contain {:?}, {} of {} do not: {:?}",
            what,
            token,
            offenders.len(),
            texts.len(),
            offenders
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::selectors::{LOGIN_ROUTE, SUBMIT_BUTTON, USERNAME_INPUT};
    use crate::sim::{SimOptions, SimulatedPage};

    fn page() -> SimulatedPage {
        SimulatedPage::new(SimOptions {
            credentials: Credentials::default(),
            ..SimOptions::default()
        })
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  1,204\n  résultats "), "1,204 résultats");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_ensure_differs() {
        assert!(ensure_differs("total", "312 résultats", "1,204 résultats").is_ok());
        assert!(ensure_differs("total", " 312 résultats", "312  résultats").is_err());
    }

    #[test]
    fn test_ensure_all_contain_reports_offenders() {
        let names = vec!["KATANA DESK".to_string(), "Kathmandu RUG".to_string()];
        let err = ensure_all_contain("name", &names, "KAT").unwrap_err();
        assert!(err.to_string().contains("Kathmandu RUG"));
        assert!(ensure_all_contain("name", &[], "KAT").is_ok());
    }

    #[tokio::test]
    async fn test_count_passes_immediately() {
        let page = page();
        page.goto(LOGIN_ROUTE).await.unwrap();
        let expect = Expect::new(&page, Duration::from_millis(200), Duration::from_millis(5));
        expect.to_have_count(&Locator::css(USERNAME_INPUT), 1).await.unwrap();
        expect.to_have_count(&Locator::css(".missing"), 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_reports_last_observation() {
        let page = page();
        page.goto(LOGIN_ROUTE).await.unwrap();
        let expect = Expect::new(&page, Duration::from_millis(30), Duration::from_millis(5));

        let err = expect
            .to_be_disabled(&Locator::css(SUBMIT_BUTTON))
            .await
            .unwrap_err();
        match err {
            E2eError::AssertionFailed(msg) => {
                assert!(msg.contains("#submit"));
                assert!(msg.contains("enabled"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_not_to_have_text_requires_element() {
        let page = page();
        page.goto(LOGIN_ROUTE).await.unwrap();
        let expect = Expect::new(&page, Duration::from_millis(20), Duration::from_millis(5));
        assert!(expect
            .not_to_have_text(&Locator::css(".missing"), "anything")
            .await
            .is_err());
    }
}
