//! Login step shared by every test case

use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::page::{Locator, Page, WaitState};
use crate::selectors::{LOGIN_ROUTE, NAVBAR, PASSWORD_INPUT, SUBMIT_BUTTON, USERNAME_INPUT};
use crate::session::Session;

pub async fn login(session: &mut Session<'_>) -> E2eResult<()> {
    let page = session.page();
    let expect = session.expect();
    let config = session.config();
    let credentials = &config.credentials;

    session.step("open login page", page.goto(LOGIN_ROUTE)).await?;

    let username = Locator::css(USERNAME_INPUT);
    session
        .step("fill username", fill_and_verify(page, &username, &credentials.username))
        .await?;

    let password = Locator::css(PASSWORD_INPUT);
    session
        .step("fill password", fill_and_verify(page, &password, &credentials.password))
        .await?;

    let submit = Locator::css(SUBMIT_BUTTON);
    session.step("submit credentials", page.click(&submit)).await?;
    session
        .step("submit is disabled", expect.to_be_disabled(&submit))
        .await?;

    session
        .step(
            "wait for navbar",
            page.wait_for(
                &Locator::css(NAVBAR),
                WaitState::Visible,
                config.timeouts.navigation(),
            ),
        )
        .await?;

    info!(user = %credentials.username, "logged in");
    Ok(())
}

/// Fill an input and check it holds exactly what was written
///
/// The values are kept out of the error so passwords never reach the logs.
async fn fill_and_verify(page: &dyn Page, field: &Locator, value: &str) -> E2eResult<()> {
    page.fill(field, value).await?;
    let actual = page.input_value(field).await?;
    if actual != value {
        return Err(E2eError::AssertionFailed(format!(
            "{} does not hold the value just written ({} chars instead of {})",
            field,
            actual.chars().count(),
            value.chars().count()
        )));
    }
    Ok(())
}
