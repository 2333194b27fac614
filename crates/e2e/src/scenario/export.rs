//! Product sheet export modal

use crate::error::E2eResult;
use crate::page::Locator;
use crate::selectors::{DROPDOWN_BUTTON, EXPORT_FORMAT_SELECTOR, MODAL_CLOSE, ROW_CHECKBOX};
use crate::session::Session;

pub async fn export_product(session: &mut Session<'_>) -> E2eResult<()> {
    let page = session.page();
    let expect = session.expect();
    let catalog = &session.config().catalog;

    session
        .step("select first row", page.click(&Locator::css(ROW_CHECKBOX).first()))
        .await?;

    let dropdown = Locator::css(DROPDOWN_BUTTON).first();
    session
        .step(
            "export dropdown counts the selection",
            expect.to_contain_text(&dropdown, &catalog.export_label),
        )
        .await?;
    session.step("open export dropdown", page.click(&dropdown)).await?;
    session
        .step(
            "choose product sheet export",
            page.click(&Locator::text(&catalog.export_action)),
        )
        .await?;

    session
        .step(
            "format selector is visible",
            expect.to_be_visible(&Locator::css(EXPORT_FORMAT_SELECTOR)),
        )
        .await?;

    // the close control disappears together with its modal
    let close = Locator::css(MODAL_CLOSE);
    session
        .step("close control is visible", expect.to_be_visible(&close))
        .await?;
    session.step("close export modal", page.click(&close)).await?;
    session
        .step("close control is hidden", expect.to_be_hidden(&close))
        .await?;

    Ok(())
}
