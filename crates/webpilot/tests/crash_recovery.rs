//! Renderer crashes: silent reload after the first, sad tab after a quick
//! second one.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use common::{browser_at, title_of};
use webpilot::prelude::*;

const SIGKILL: i32 = 9;

#[test]
fn test_first_crash_reloads_silently() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    let url = scenario.fixture_url("/test1").unwrap();

    assert_eq!(scenario.session().kill_web_processes(SIGKILL).unwrap(), 1);
    browser.wait_until_page_loaded(&url).unwrap();
    assert_eq!(title_of(&browser).unwrap(), "test1");
    assert!(scenario
        .session()
        .select_many(&SadTab::query())
        .unwrap()
        .is_empty());
}

#[test]
fn test_second_crash_shows_sad_tab_and_reload_recovers() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    let url = scenario.fixture_url("/test1").unwrap();

    scenario.session().kill_web_processes(SIGKILL).unwrap();
    browser.wait_until_page_loaded(&url).unwrap();
    scenario.session().kill_web_processes(SIGKILL).unwrap();

    let sad = browser.sad_tab().unwrap();
    assert!(sad.text().unwrap().contains(&url));
    sad.click_reload_button().unwrap();
    sad.wait_until_destroyed().unwrap();
    browser.wait_until_page_loaded(&url).unwrap();
    assert_eq!(title_of(&browser).unwrap(), "test1");
}

#[test]
fn test_sad_tab_close_button_closes_tab() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    let url = scenario.fixture_url("/test1").unwrap();

    scenario.session().kill_web_processes(SIGKILL).unwrap();
    browser.wait_until_page_loaded(&url).unwrap();
    scenario.session().kill_web_processes(SIGKILL).unwrap();

    let sad = browser.sad_tab().unwrap();
    sad.click_close_tab_button().unwrap();
    sad.wait_until_destroyed().unwrap();
    browser.new_tab_view().unwrap();
}

#[test]
fn test_signal_zero_leaves_renderer_running() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    assert_eq!(scenario.session().kill_web_processes(0).unwrap(), 1);
    assert!(!browser.current_webview().unwrap().loading().unwrap());
    assert_eq!(title_of(&browser).unwrap(), "test1");
}
