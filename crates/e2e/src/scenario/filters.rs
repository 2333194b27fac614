//! Status and packshot filters

use tracing::{debug, info};

use crate::error::E2eResult;
use crate::expect::ensure_differs;
use crate::page::Locator;
use crate::selectors::{
    FILTER_REMOVE, PACKSHOT_COLLAPSED, PACKSHOT_OPTION, PACKSHOT_TOGGLE, STATUS_FILTER_DRAFT,
    TOTAL_LABEL,
};
use crate::session::Session;
use crate::wait::wait_for_loader_to_disappear;

use super::catalog::{parse_total, read_total};
use super::CatalogContext;

pub async fn interact_with_filters(session: &mut Session<'_>, context: &CatalogContext) -> E2eResult<()> {
    let page = session.page();
    let expect = session.expect();
    let timeouts = &session.config().timeouts;
    let total = Locator::css(TOTAL_LABEL);

    session
        .step(
            "apply draft status filter",
            page.click(&Locator::css(STATUS_FILTER_DRAFT)),
        )
        .await?;
    session
        .step("wait for draft listing", wait_for_loader_to_disappear(page, timeouts))
        .await?;

    let draft_total = session.step("capture draft total", read_total(page)).await?;
    info!(total = %draft_total, count = ?parse_total(&draft_total), "draft filter applied");
    session
        .step("draft total differs from baseline", async {
            ensure_differs("total after draft filter", &draft_total, &context.origin_total)
        })
        .await?;

    // the collapsed marker only exists while the group is folded
    let collapsed = session
        .step(
            "check packshot group",
            page.count(&Locator::css(PACKSHOT_COLLAPSED)),
        )
        .await?;
    if collapsed > 0 {
        session
            .step(
                "expand packshot group",
                page.click(&Locator::css(PACKSHOT_TOGGLE).first()),
            )
            .await?;
    } else {
        debug!("packshot group already expanded");
    }

    session
        .step(
            "apply first packshot option",
            page.click(&Locator::css(PACKSHOT_OPTION).first()),
        )
        .await?;
    session
        .step("wait for packshot listing", wait_for_loader_to_disappear(page, timeouts))
        .await?;

    session
        .step(
            "total differs from baseline",
            expect.not_to_have_text(&total, &context.origin_total),
        )
        .await?;
    session
        .step(
            "total differs from draft total",
            expect.not_to_have_text(&total, &draft_total),
        )
        .await?;

    session
        .step(
            "remove selected filters",
            page.click(&Locator::css(FILTER_REMOVE).first()),
        )
        .await?;
    session
        .step(
            "total reverts to baseline",
            expect.to_have_text(&total, &context.origin_total),
        )
        .await?;

    Ok(())
}
