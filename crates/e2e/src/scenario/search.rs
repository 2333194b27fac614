//! Search by reference and by free text

use tracing::{info, warn};

use crate::error::E2eResult;
use crate::expect::{ensure_all_contain, normalize_text};
use crate::page::Locator;
use crate::selectors::{GTIN_CELL, NAME_CELL, PRODUCT_REFERENCE, SEARCH_INPUT};
use crate::session::Session;
use crate::wait::wait_for_loader_to_disappear;

pub async fn search_in_catalog(session: &mut Session<'_>) -> E2eResult<()> {
    let page = session.page();
    let expect = session.expect();
    let config = session.config();
    let timeouts = &config.timeouts;
    let search = Locator::css(SEARCH_INPUT);

    let reference = session
        .step(
            "read first product reference",
            page.text_content(&Locator::css(PRODUCT_REFERENCE).first()),
        )
        .await?;
    let gtin = match reference.map(|r| normalize_text(&r)).filter(|r| !r.is_empty()) {
        Some(gtin) => gtin,
        None => {
            warn!(fallback = %config.catalog.gtin_fallback, "first row shows no reference");
            config.catalog.gtin_fallback.clone()
        }
    };

    session.step("search by reference", page.fill(&search, &gtin)).await?;
    session
        .step("wait for reference results", wait_for_loader_to_disappear(page, timeouts))
        .await?;
    session
        .step(
            "a result carries the reference",
            expect.to_have_any_containing(&Locator::css(GTIN_CELL), &gtin),
        )
        .await?;

    let query = &config.catalog.free_text_query;
    session.step("search by free text", page.fill(&search, query)).await?;
    session
        .step("wait for free text results", wait_for_loader_to_disappear(page, timeouts))
        .await?;

    let names = session
        .step(
            "read matched names",
            page.all_text_contents(&Locator::css(NAME_CELL)),
        )
        .await?;
    if names.is_empty() {
        warn!(query = %query, "free text search matched nothing");
    }
    session
        .step("every name contains the query", async {
            ensure_all_contain("product name", &names, query)
        })
        .await?;

    info!(reference = %gtin, query = %query, matches = names.len(), "search checks passed");
    Ok(())
}
