//! Catalog entry: overlay dismissal, first load and the baseline total

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::expect::normalize_text;
use crate::page::{Locator, Page, WaitState};
use crate::selectors::{CATALOG_ROUTE, CONFIRM_MODAL, TOTAL_LABEL};
use crate::session::Session;
use crate::wait::{probe, wait_for_loader_to_disappear, Presence};

static TOTAL_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d[\d,.\s]*").expect("total pattern is valid")
});

/// State captured when the catalog first loads, scoped to one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogContext {
    /// Pagination label before any filter or search ("1,204 résultats")
    pub origin_total: String,
}

impl CatalogContext {
    pub fn origin_count(&self) -> Option<u64> {
        parse_total(&self.origin_total)
    }
}

/// Number in a pagination label, ignoring thousands separators
pub fn parse_total(label: &str) -> Option<u64> {
    let number = TOTAL_NUMBER.find(label)?;
    let digits: String = number.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Read the pagination label
pub async fn read_total(page: &dyn Page) -> E2eResult<String> {
    page.text_content(&Locator::css(TOTAL_LABEL))
        .await?
        .map(|text| normalize_text(&text))
        .ok_or_else(|| E2eError::AssertionFailed(format!("{} is not rendered", TOTAL_LABEL)))
}

pub async fn open_catalog(session: &mut Session<'_>) -> E2eResult<CatalogContext> {
    let page = session.page();
    let timeouts = &session.config().timeouts;

    session.step("open catalog", page.goto(CATALOG_ROUTE)).await?;

    let overlay = Locator::css(CONFIRM_MODAL);
    let presence = session
        .step(
            "probe confirmation overlay",
            probe(page, &overlay, WaitState::Visible, timeouts.overlay_probe()),
        )
        .await?;
    match presence {
        Presence::Present => {
            session
                .step("dismiss confirmation overlay", async {
                    page.click(&overlay).await?;
                    page.wait_for(&overlay, WaitState::Hidden, timeouts.action())
                        .await
                })
                .await?;
        }
        Presence::Absent => debug!("no confirmation overlay"),
    }

    session
        .step("wait for catalog", wait_for_loader_to_disappear(page, timeouts))
        .await?;

    let origin_total = session.step("capture baseline total", read_total(page)).await?;
    let context = CatalogContext { origin_total };
    info!(total = %context.origin_total, count = ?context.origin_count(), "catalog loaded");
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1,204 résultats", Some(1204))]
    #[test_case("312 résultats", Some(312))]
    #[test_case("1 204 résultats", Some(1204))]
    #[test_case("1\u{202f}204 résultats", Some(1204))]
    #[test_case("Total : 47", Some(47))]
    #[test_case("aucun résultat", None)]
    fn test_parse_total(label: &str, expected: Option<u64>) {
        assert_eq!(parse_total(label), expected);
    }

    #[test]
    fn test_context_count() {
        let context = CatalogContext {
            origin_total: "1,204 résultats".to_string(),
        };
        assert_eq!(context.origin_count(), Some(1204));
    }
}
