//! Row selection and product detail

use crate::error::E2eResult;
use crate::page::Locator;
use crate::selectors::{PRODUCT_FOOTER, ROW_LINK, SELECTED_ROW, SELECT_ALL, TABLE_ROW, TOTAL_LABEL};
use crate::session::Session;
use crate::wait::wait_for_loader_to_disappear;

use super::CatalogContext;

pub async fn interact_with_products(session: &mut Session<'_>, context: &CatalogContext) -> E2eResult<()> {
    let page = session.page();
    let expect = session.expect();
    let config = session.config();
    let page_size = config.catalog.page_size;

    let rows = Locator::css(TABLE_ROW);
    let selected = Locator::css(SELECTED_ROW);
    let select_all = Locator::css(SELECT_ALL);
    let total = Locator::css(TOTAL_LABEL);

    session
        .step("listing shows a full page", expect.to_have_count(&rows, page_size))
        .await?;

    session.step("select all rows", page.click(&select_all)).await?;
    session
        .step("every row is selected", expect.to_have_count(&selected, page_size))
        .await?;
    // selection never changes what the listing matches
    session
        .step(
            "total is unchanged by selection",
            expect.to_have_text(&total, &context.origin_total),
        )
        .await?;

    session.step("toggle selection off", page.click(&select_all)).await?;
    session
        .step("no row is selected", expect.to_have_count(&selected, 0))
        .await?;

    session
        .step("open first product", page.click(&Locator::css(ROW_LINK).first()))
        .await?;
    session
        .step(
            "wait for product",
            wait_for_loader_to_disappear(page, &config.timeouts),
        )
        .await?;
    session
        .step(
            "product footer is visible",
            expect.to_be_visible(&Locator::css(PRODUCT_FOOTER)),
        )
        .await?;

    Ok(())
}
