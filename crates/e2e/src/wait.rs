//! Bounded waits shared by the scenarios

use std::time::Duration;

use tracing::debug;

use crate::config::Timeouts;
use crate::error::E2eResult;
use crate::page::{Locator, Page, WaitState};
use crate::selectors::LOADER;

/// Outcome of a bounded probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present)
    }
}

/// Wait up to `within` for `state`; running out is `Absent`, not an error
pub async fn probe(
    page: &dyn Page,
    locator: &Locator,
    state: WaitState,
    within: Duration,
) -> E2eResult<Presence> {
    match page.wait_for(locator, state, within).await {
        Ok(()) => Ok(Presence::Present),
        Err(e) if e.is_timeout() => {
            debug!(locator = %locator, state = state.as_str(), "probe ran out, treating as absent");
            Ok(Presence::Absent)
        }
        Err(e) => Err(e),
    }
}

/// Wait for the loading indicator to attach and then hide
///
/// Callers invoke this right after an action that starts a fetch. The loader
/// must attach within `loader_appear` and hide within `loader_hidden`; either
/// bound running out fails the step.
pub async fn wait_for_loader_to_disappear(page: &dyn Page, timeouts: &Timeouts) -> E2eResult<()> {
    let loader = Locator::css(LOADER);

    page.wait_for(&loader, WaitState::Attached, timeouts.loader_appear())
        .await?;
    debug!("loader attached");
    page.wait_for(&loader, WaitState::Hidden, timeouts.loader_hidden())
        .await?;
    debug!("loader cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use crate::selectors::{CATALOG_ROUTE, CONFIRM_MODAL, LOGIN_ROUTE, NAVBAR};
    use crate::sim::{SimOptions, SimulatedPage};

    fn fast_timeouts() -> Timeouts {
        Timeouts {
            loader_appear_ms: 100,
            loader_hidden_ms: 1_000,
            ..Timeouts::default()
        }
    }

    async fn logged_in(options: SimOptions) -> SimulatedPage {
        let page = SimulatedPage::new(options);
        page.force_login();
        page
    }

    #[tokio::test]
    async fn test_probe_absent_is_not_an_error() {
        let page = SimulatedPage::new(SimOptions::default());
        page.goto(LOGIN_ROUTE).await.unwrap();

        let presence = probe(
            &page,
            &Locator::css(CONFIRM_MODAL),
            WaitState::Visible,
            Duration::from_millis(30),
        )
        .await
        .unwrap();
        assert_eq!(presence, Presence::Absent);
    }

    #[tokio::test]
    async fn test_probe_present() {
        let page = logged_in(SimOptions::default()).await;
        page.goto(CATALOG_ROUTE).await.unwrap();

        let presence = probe(
            &page,
            &Locator::css(CONFIRM_MODAL),
            WaitState::Visible,
            Duration::from_millis(200),
        )
        .await
        .unwrap();
        assert!(presence.is_present());
    }

    #[tokio::test]
    async fn test_probe_propagates_other_errors() {
        let page = logged_in(SimOptions::default()).await;
        page.goto(CATALOG_ROUTE).await.unwrap();
        wait_for_loader_to_disappear(&page, &fast_timeouts()).await.unwrap();

        // several rows match and no index was given
        let err = probe(
            &page,
            &Locator::css(crate::selectors::TABLE_ROW),
            WaitState::Visible,
            Duration::from_millis(30),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, E2eError::StrictModeViolation { .. }));
    }

    #[tokio::test]
    async fn test_loader_wait_covers_fetch() {
        let page = logged_in(SimOptions {
            fetch_latency: Duration::from_millis(80),
            ..SimOptions::default()
        })
        .await;
        page.goto(CATALOG_ROUTE).await.unwrap();

        wait_for_loader_to_disappear(&page, &fast_timeouts()).await.unwrap();
        assert!(!page.is_visible(&Locator::css(LOADER)).await.unwrap());
        assert_eq!(page.count(&Locator::css(crate::selectors::TABLE_ROW)).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_loader_wait_without_fetch_times_out() {
        let page = logged_in(SimOptions::default()).await;
        page.goto(CATALOG_ROUTE).await.unwrap();
        wait_for_loader_to_disappear(&page, &fast_timeouts()).await.unwrap();

        // the listing has settled and nothing new was requested
        let err = wait_for_loader_to_disappear(&page, &fast_timeouts()).await.unwrap_err();
        assert!(err.is_timeout(), "{err}");
        assert!(page.is_visible(&Locator::css(NAVBAR)).await.unwrap());
    }

    #[tokio::test]
    async fn test_loader_wait_fails_when_fetch_renders_no_loader() {
        let page = logged_in(SimOptions {
            fetch_latency: Duration::ZERO,
            ..SimOptions::default()
        })
        .await;
        page.goto(CATALOG_ROUTE).await.unwrap();

        let err = wait_for_loader_to_disappear(&page, &fast_timeouts()).await.unwrap_err();
        assert!(err.is_timeout(), "{err}");
    }

    #[tokio::test]
    async fn test_loader_stuck_is_fatal() {
        let page = logged_in(SimOptions {
            fetch_latency: Duration::from_secs(10),
            ..SimOptions::default()
        })
        .await;
        page.goto(CATALOG_ROUTE).await.unwrap();

        let timeouts = Timeouts {
            loader_appear_ms: 100,
            loader_hidden_ms: 50,
            ..Timeouts::default()
        };
        let err = wait_for_loader_to_disappear(&page, &timeouts).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
