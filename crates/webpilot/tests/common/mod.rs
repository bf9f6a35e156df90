//! Shared setup for the scenario tests.

#![allow(dead_code)]

use webpilot::prelude::*;

/// Short timeouts: the simulated browser answers within milliseconds
pub fn quick() -> PilotConfig {
    PilotConfig::default()
        .with_timeout(3_000)
        .with_page_load_timeout(5_000)
        .with_poll_interval(10)
        .with_select_retry(1_000)
}

/// Browser with a fixture server, showing `path`
pub fn browser_at(path: &str) -> Scenario {
    let _ = webpilot::init_tracing();
    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .with_fixture_server()
        .open_fixture(path)
        .build()
        .expect("browser scenario should start");
    let url = scenario.fixture_url(path).expect("fixture url");
    scenario
        .browser()
        .expect("browser window")
        .wait_until_page_loaded(&url)
        .expect("initial page should load");
    scenario
}

/// Container with a fixture server and extra flags, showing `path`
pub fn container_at(path: &str, flags: &[&str]) -> Scenario {
    let _ = webpilot::init_tracing();
    let scenario = ScenarioBuilder::container()
        .with_config(quick())
        .with_fixture_server()
        .args(flags.iter().copied())
        .open_fixture(path)
        .build()
        .expect("container scenario should start");
    let url = scenario.fixture_url(path).expect("fixture url");
    scenario
        .container()
        .expect("container window")
        .wait_until_page_loaded(&url)
        .expect("initial page should load");
    scenario
}

/// Title of the current tab, for use with `eventually`
pub fn title_of(browser: &Browser) -> PilotResult<String> {
    browser.current_webview()?.title()
}
