//! JavaScript, permission and authentication dialogs against the
//! simulated browser and the fixture server.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use common::{browser_at, quick, title_of};
use webpilot::fixture_server::pages::{BASIC_AUTH_PASSWORD, BASIC_AUTH_USER};
use webpilot::prelude::*;

// ============================================================================
// confirm / alert / prompt
// ============================================================================

#[test]
fn test_confirm_cancel_sets_cancel_title() {
    let scenario = browser_at("/js-confirm-dialog");
    let browser = scenario.browser().unwrap();
    let dialog = browser.confirm_dialog().unwrap();
    assert_eq!(dialog.text().unwrap(), "Confirm Dialog");
    dialog.click_cancel().unwrap();
    eventually(|| title_of(&browser), equals("CANCEL")).unwrap();
}

#[test]
fn test_confirm_ok_on_fresh_load_sets_ok_title() {
    let scenario = browser_at("/js-confirm-dialog");
    let browser = scenario.browser().unwrap();
    browser.confirm_dialog().unwrap().click_cancel().unwrap();
    eventually(|| title_of(&browser), equals("CANCEL")).unwrap();

    browser.chrome().unwrap().click_reload_button().unwrap();
    let dialog = browser.confirm_dialog().unwrap();
    dialog.click_ok().unwrap();
    eventually(|| title_of(&browser), equals("OK")).unwrap();
}

#[test]
fn test_answered_dialog_is_stale() {
    let scenario = browser_at("/js-confirm-dialog");
    let browser = scenario.browser().unwrap();
    let dialog = browser.confirm_dialog().unwrap();
    dialog.click_ok().unwrap();
    dialog.wait_until_destroyed().unwrap();
    let err = dialog.text().unwrap_err();
    assert!(matches!(err, PilotError::StaleNode { .. }), "got {err:?}");
}

#[test]
fn test_second_dismissal_of_destroyed_dialog_is_stale() {
    let scenario = browser_at("/js-confirm-dialog");
    let browser = scenario.browser().unwrap();
    let dialog = browser.confirm_dialog().unwrap();
    dialog.click_ok().unwrap();
    dialog.wait_until_destroyed().unwrap();
    let err = dialog.click_ok().unwrap_err();
    assert!(matches!(err, PilotError::StaleNode { .. }), "got {err:?}");
    let err = dialog.click_cancel().unwrap_err();
    assert!(matches!(err, PilotError::StaleNode { .. }), "got {err:?}");
}

#[test]
fn test_alert_ok_closes_dialog() {
    let scenario = browser_at("/js-alert-dialog");
    let browser = scenario.browser().unwrap();
    let dialog = browser.alert_dialog().unwrap();
    assert_eq!(dialog.text().unwrap(), "Alert Dialog");
    dialog.click_ok().unwrap();
    dialog.wait_until_destroyed().unwrap();
    assert_eq!(title_of(&browser).unwrap(), "JS Alert");
}

#[test]
fn test_prompt_answer_becomes_title() {
    let scenario = browser_at("/js-prompt-dialog");
    let browser = scenario.browser().unwrap();
    let dialog = browser.prompt_dialog().unwrap();
    assert_eq!(dialog.input_text().unwrap(), "Default");
    dialog.write_input("hello").unwrap();
    dialog.click_ok().unwrap();
    eventually(|| title_of(&browser), equals("hello")).unwrap();
}

#[test]
fn test_prompt_cancel() {
    let scenario = browser_at("/js-prompt-dialog");
    let browser = scenario.browser().unwrap();
    browser.prompt_dialog().unwrap().click_cancel().unwrap();
    eventually(|| title_of(&browser), equals("CANCEL")).unwrap();
}

#[test]
fn test_any_dialog_classifies_open_dialog() {
    let scenario = browser_at("/js-confirm-dialog");
    let browser = scenario.browser().unwrap();
    let dialog = browser.any_dialog().unwrap();
    assert!(matches!(dialog, AnyDialog::Confirm(_)));
    dialog.dismiss().unwrap();
    eventually(|| title_of(&browser), equals("CANCEL")).unwrap();
}

// ============================================================================
// beforeunload
// ============================================================================

#[test]
fn test_before_unload_stay_keeps_page() {
    let scenario = browser_at("/js-before-unload-dialog");
    let browser = scenario.browser().unwrap();
    let start = scenario.fixture_url("/js-before-unload-dialog").unwrap();

    browser.go_to_url(&scenario.fixture_url("/test1").unwrap()).unwrap();
    let dialog = browser.before_unload_dialog().unwrap();
    dialog.click_stay().unwrap();
    dialog.wait_until_destroyed().unwrap();
    assert_eq!(browser.current_webview().unwrap().url().unwrap(), start);
}

#[test]
fn test_before_unload_leave_navigates() {
    let scenario = browser_at("/js-before-unload-dialog");
    let browser = scenario.browser().unwrap();
    let target = scenario.fixture_url("/test1").unwrap();

    browser.go_to_url(&target).unwrap();
    browser.before_unload_dialog().unwrap().click_leave().unwrap();
    browser.wait_until_page_loaded(&target).unwrap();
    assert_eq!(title_of(&browser).unwrap(), "test1");
}

// ============================================================================
// permissions
// ============================================================================

#[test]
fn test_media_access_allow_and_deny() {
    let scenario = browser_at("/media/av");
    let browser = scenario.browser().unwrap();
    browser.media_access_dialog().unwrap().click_allow().unwrap();
    eventually(|| title_of(&browser), equals("test1")).unwrap();

    browser.go_to_url(&scenario.fixture_url("/media/a").unwrap()).unwrap();
    browser.media_access_dialog().unwrap().click_deny().unwrap();
    eventually(|| title_of(&browser), equals("test2")).unwrap();
}

#[test]
fn test_geolocation_allow() {
    let scenario = browser_at("/geolocation");
    let browser = scenario.browser().unwrap();
    let dialog = browser.geolocation_dialog().unwrap();
    assert!(dialog.visible().unwrap());
    dialog.click_allow().unwrap();
    eventually(|| title_of(&browser), equals("ALLOWED")).unwrap();
}

#[test]
fn test_geolocation_deny() {
    let scenario = browser_at("/geolocation");
    let browser = scenario.browser().unwrap();
    browser.geolocation_dialog().unwrap().click_deny().unwrap();
    eventually(|| title_of(&browser), equals("DENIED")).unwrap();
}

// ============================================================================
// HTTP authentication
// ============================================================================

#[test]
fn test_basic_auth_with_valid_credentials() {
    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .with_fixture_server()
        .open_fixture("/basicauth")
        .build()
        .unwrap();
    let browser = scenario.browser().unwrap();
    let dialog = browser.http_auth_dialog().unwrap();
    dialog
        .authenticate(BASIC_AUTH_USER, BASIC_AUTH_PASSWORD)
        .unwrap();
    eventually(|| title_of(&browser), equals("Authenticated")).unwrap();
}

#[test]
fn test_basic_auth_with_wrong_password_asks_again() {
    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .with_fixture_server()
        .open_fixture("/basicauth")
        .build()
        .unwrap();
    let browser = scenario.browser().unwrap();
    let first = browser.http_auth_dialog().unwrap();
    first.authenticate(BASIC_AUTH_USER, "wrong").unwrap();
    first.wait_until_destroyed().unwrap();
    let second = browser.http_auth_dialog().unwrap();
    second.dismiss().unwrap();
    second.wait_until_destroyed().unwrap();
    assert_ne!(title_of(&browser).unwrap(), "Authenticated");
}
