//! Browser window scenarios: navigation, address bar, tabs, bookmarks,
//! history, settings, find in page, context menus.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use common::{browser_at, quick, title_of};
use std::time::Duration;
use webpilot::fixture_server::pages::FIND_IN_PAGE_TERM;
use webpilot::mock::MockBrowser;
use webpilot::prelude::*;
use webpilot::profile::{BookmarkStore, BOOKMARKS_DB};

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn test_go_to_url_loads_page() {
    let scenario = browser_at("/");
    let browser = scenario.browser().unwrap();
    let url = scenario.fixture_url("/loremipsum").unwrap();
    browser.go_to_url(&url).unwrap();
    browser.wait_until_page_loaded(&url).unwrap();
    assert_eq!(title_of(&browser).unwrap(), "Lorem Ipsum");
}

#[test]
fn test_back_and_forward() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    let chrome = browser.chrome().unwrap();
    let first = scenario.fixture_url("/test1").unwrap();
    let second = scenario.fixture_url("/test2").unwrap();
    assert!(!chrome.back_button().unwrap().enabled().unwrap());

    browser.go_to_url(&second).unwrap();
    browser.wait_until_page_loaded(&second).unwrap();
    eventually(|| chrome.back_button()?.enabled(), is_true()).unwrap();

    chrome.click_back_button().unwrap();
    browser.wait_until_page_loaded(&first).unwrap();
    eventually(|| chrome.forward_button()?.enabled(), is_true()).unwrap();

    chrome.click_forward_button().unwrap();
    browser.wait_until_page_loaded(&second).unwrap();
    assert_eq!(title_of(&browser).unwrap(), "test2");
}

#[test]
fn test_keyboard_back_navigation() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    let first = scenario.fixture_url("/test1").unwrap();
    let second = scenario.fixture_url("/test2").unwrap();
    browser.go_to_url(&second).unwrap();
    browser.wait_until_page_loaded(&second).unwrap();
    browser.press_key("Alt+Left").unwrap();
    browser.wait_until_page_loaded(&first).unwrap();
}

#[test]
fn test_blank_target_link_opens_new_tab() {
    let scenario = browser_at("/blanktargetlink");
    let browser = scenario.browser().unwrap();
    let target = scenario.fixture_url("/aleaiactaest").unwrap();
    browser.current_webview().unwrap().click().unwrap();
    eventually(|| browser.webviews().map(|w| w.len()), equals(2_usize)).unwrap();
    browser.wait_until_page_loaded(&target).unwrap();
    assert_eq!(title_of(&browser).unwrap(), "Alea Iacta Est");
}

#[test]
fn test_unreachable_page_shows_error_sheet() {
    let scenario = browser_at("/");
    let browser = scenario.browser().unwrap();
    browser.go_to_url("http://127.0.0.1:1/").unwrap();
    eventually(|| browser.error_sheet()?.visible(), is_true()).unwrap();
}

#[test]
fn test_user_agent_override() {
    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .with_fixture_server()
        .arg("--user-agent-string=webpilot-agent")
        .open_fixture("/show-user-agent")
        .build()
        .unwrap();
    let browser = scenario.browser().unwrap();
    eventually(|| title_of(&browser), equals("webpilot-agent")).unwrap();
}

// ============================================================================
// Address bar
// ============================================================================

#[test]
fn test_address_bar_write_and_clear() {
    let scenario = browser_at("/");
    let address_bar = scenario.browser().unwrap().address_bar().unwrap();
    address_bar.focus().unwrap();
    assert!(address_bar.has_focus().unwrap());
    address_bar.clear().unwrap();
    address_bar.write("abc").unwrap();
    assert_eq!(address_bar.text().unwrap(), "abc");
    address_bar.clear().unwrap();
    assert_eq!(address_bar.text().unwrap(), "");
}

#[test]
fn test_address_bar_shows_loaded_url() {
    let scenario = browser_at("/");
    let browser = scenario.browser().unwrap();
    let url = scenario.fixture_url("/test1").unwrap();
    browser.go_to_url(&url).unwrap();
    browser.wait_until_page_loaded(&url).unwrap();
    let address_bar = browser.address_bar().unwrap();
    eventually(|| address_bar.text(), equals(url.clone())).unwrap();
    assert!(!address_bar.has_focus().unwrap());
}

#[test]
fn test_local_suggestions_from_history() {
    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .history([HistoryEntry::new("http://example.org/lorem", "Lorem Ipsum")])
        .build()
        .unwrap();
    let browser = scenario.browser().unwrap();
    let address_bar = browser.address_bar().unwrap();
    address_bar.focus().unwrap();
    address_bar.write("lorem").unwrap();
    let suggestions = browser.suggestions().unwrap();
    eventually(|| suggestions.visible(), is_true()).unwrap();
    let entries = suggestions.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].url().unwrap(), "http://example.org/lorem");
}

// ============================================================================
// Selection idempotence
// ============================================================================

#[test]
fn test_repeated_selection_returns_same_node() {
    let scenario = browser_at("/");
    let first = scenario.browser().unwrap();
    let second = scenario.browser().unwrap();
    assert_eq!(first.node().id(), second.node().id());
    assert_eq!(
        first.chrome().unwrap().node().id(),
        second.chrome().unwrap().node().id()
    );
    assert_eq!(title_of(&first).unwrap(), title_of(&second).unwrap());
}

// ============================================================================
// Tabs
// ============================================================================

#[test]
fn test_new_tab_then_tabs_view() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    browser.open_new_tab().unwrap();
    eventually(|| browser.webviews().map(|w| w.len()), equals(2_usize)).unwrap();

    let tabs = browser.open_tabs_view().unwrap();
    assert_eq!(tabs.count().unwrap(), 2);
    let previews = tabs.previews().unwrap();
    assert_eq!(previews[0].title().unwrap(), "test1");
    assert_eq!(previews[1].url().unwrap(), "");

    previews[0].select().unwrap();
    eventually(|| title_of(&browser), equals("test1")).unwrap();
}

#[test]
fn test_close_tab_from_tabs_view() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    browser.open_new_tab().unwrap();
    let tabs = browser.open_tabs_view().unwrap();
    tabs.previews().unwrap()[1].close().unwrap();
    eventually(|| tabs.count(), equals(1_usize)).unwrap();
    tabs.click_done().unwrap();
    assert_eq!(browser.webviews().unwrap().len(), 1);
}

#[test]
fn test_closing_last_tab_opens_blank_one() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    browser.press_key("Ctrl+W").unwrap();
    browser.new_tab_view().unwrap();
    eventually(|| browser.current_webview()?.url(), equals(String::new())).unwrap();
}

// ============================================================================
// New tab view
// ============================================================================

#[test]
fn test_bookmark_folders_in_new_tab_view() {
    let unnamed = 4;
    let mut bookmarks: Vec<Bookmark> = (0..unnamed)
        .map(|i| Bookmark::new(format!("http://example.org/{i}"), format!("Example {i}")))
        .collect();
    bookmarks.push(Bookmark::new("http://example.org/u", "Uranium").in_folder("Actinide"));
    bookmarks.push(Bookmark::new("http://example.org/p", "Plutonium").in_folder("Actinide"));
    bookmarks.push(Bookmark::new("http://example.org/ne", "Neon").in_folder("NobleGas"));

    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .bookmarks(bookmarks)
        .build()
        .unwrap();
    let view = scenario.browser().unwrap().new_tab_view().unwrap();
    let folders = view.folders().unwrap();
    assert_eq!(folders.len(), 3);
    assert_eq!(folders[0].name().unwrap(), "");

    let default = view.folder("").unwrap();
    assert!(default.expanded().unwrap());
    assert_eq!(default.bookmarks().unwrap().len(), unnamed);

    let actinide = view.folder("Actinide").unwrap();
    assert!(actinide.bookmarks().unwrap().is_empty());
    actinide.expand().unwrap();
    assert_eq!(actinide.bookmarks().unwrap().len(), 2);
}

#[test]
fn test_homepage_bookmark_opens_homepage() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    let home = scenario.fixture_url("/test2").unwrap();
    browser.open_settings().unwrap().set_homepage(&home).unwrap();
    browser.settings_page().unwrap().click_back().unwrap();

    let view = browser.open_new_tab().unwrap();
    let bookmark = view.homepage_bookmark().unwrap();
    assert_eq!(bookmark.url().unwrap(), home);
    bookmark.click().unwrap();
    browser.wait_until_page_loaded(&home).unwrap();
}

#[test]
fn test_top_sites_follow_history() {
    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .history([
            HistoryEntry::new("http://example.org/a", "A"),
            HistoryEntry::new("http://example.com/b", "B"),
        ])
        .build()
        .unwrap();
    let view = scenario.browser().unwrap().new_tab_view().unwrap();
    assert_eq!(view.top_sites().unwrap().len(), 2);
}

// ============================================================================
// Bookmarking
// ============================================================================

#[test]
fn test_toggle_bookmark_persists_to_profile() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    let url = scenario.fixture_url("/test1").unwrap();
    let address_bar = browser.address_bar().unwrap();
    assert!(!address_bar.bookmarked().unwrap());

    address_bar.click_bookmark_toggle().unwrap();
    let options = browser.bookmark_options().unwrap();
    assert_eq!(options.save_in_folder().unwrap(), "All Bookmarks");
    options.click_dismiss_button().unwrap();
    eventually(|| address_bar.bookmarked(), is_true()).unwrap();

    let store = BookmarkStore::open(
        &scenario.profile().data_location().unwrap().join(BOOKMARKS_DB),
    )
    .unwrap();
    let saved = store.list().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].url, url);

    address_bar.click_bookmark_toggle().unwrap();
    eventually(|| address_bar.bookmarked(), is_false()).unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_bookmark_options_rename() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    browser.press_key("Ctrl+D").unwrap();
    let options = browser.bookmark_options().unwrap();
    options.set_title("Renamed").unwrap();
    options.click_dismiss_button().unwrap();
    options.wait_until_destroyed().unwrap();

    let store = BookmarkStore::open(
        &scenario.profile().data_location().unwrap().join(BOOKMARKS_DB),
    )
    .unwrap();
    eventually(
        || Ok(store.list()?.first().map(|b| b.title.clone())),
        equals(Some("Renamed".to_string())),
    )
    .unwrap();
}

// ============================================================================
// History and settings
// ============================================================================

#[test]
fn test_history_groups_visits_by_domain() {
    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .history([
            HistoryEntry::new("http://example.org/a", "A"),
            HistoryEntry::new("http://example.org/b", "B"),
            HistoryEntry::new("http://example.com/c", "C"),
        ])
        .build()
        .unwrap();
    let history = scenario.browser().unwrap().open_history().unwrap();
    let domains = history.domains().unwrap();
    assert_eq!(domains.len(), 2);
    let org = domains
        .iter()
        .find(|d| d.domain().unwrap() == "example.org")
        .unwrap();
    assert_eq!(org.entry_count().unwrap(), 2);
    history.click_done().unwrap();
}

#[test]
fn test_visits_are_recorded() {
    let scenario = browser_at("/test1");
    let browser = scenario.browser().unwrap();
    let history = browser.open_history().unwrap();
    let domains = history.domains().unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].domain().unwrap(), "127.0.0.1");
}

#[test]
fn test_settings_show_search_engine_and_homepage() {
    let scenario = ScenarioBuilder::browser()
        .with_config(quick())
        .homepage("http://example.org/")
        .arg("http://127.0.0.1:1/")
        .build()
        .unwrap();
    let settings = scenario.browser().unwrap().open_settings().unwrap();
    assert_eq!(settings.search_engine().unwrap(), "DuckDuckGo");
    assert_eq!(settings.homepage().unwrap(), "http://example.org/");
    assert_eq!(settings.entries().unwrap().len(), 3);
}

// ============================================================================
// Find in page
// ============================================================================

#[test]
fn test_find_in_page_counts_and_cycles() {
    let scenario = browser_at("/findinpage");
    let browser = scenario.browser().unwrap();
    let bar = browser.open_find_in_page().unwrap();
    bar.search(FIND_IN_PAGE_TERM).unwrap();
    eventually(|| bar.counter(), equals((1, 3))).unwrap();
    bar.next().unwrap();
    eventually(|| bar.counter(), equals((2, 3))).unwrap();
    bar.previous().unwrap();
    bar.previous().unwrap();
    eventually(|| bar.counter(), equals((3, 3))).unwrap();
    bar.close().unwrap();
}

#[test]
fn test_find_in_page_without_match() {
    let scenario = browser_at("/findinpage");
    let bar = scenario.browser().unwrap().open_find_in_page().unwrap();
    bar.search("absent").unwrap();
    eventually(|| bar.counter(), equals((0, 0))).unwrap();
}

// ============================================================================
// Context menus
// ============================================================================

#[test]
fn test_image_menu_header_differs_from_textarea() {
    let scenario = browser_at("/image");
    let browser = scenario.browser().unwrap();
    let menu = browser.open_context_menu().unwrap();
    let label = menu.title_label().unwrap();
    assert!(label.visible().unwrap());
    assert!(label.text().unwrap().starts_with("data:"));
    assert!(menu.action("OpenImageInNewTabContextualAction").is_ok());
    menu.dismiss().unwrap();

    let textarea = scenario.fixture_url("/textarea").unwrap();
    browser.go_to_url(&textarea).unwrap();
    browser.wait_until_page_loaded(&textarea).unwrap();
    let menu = browser.open_context_menu().unwrap();
    let label = menu.title_label().unwrap();
    assert!(!label.visible().unwrap());
    assert!(menu.action("OpenImageInNewTabContextualAction").is_err());
}

#[test]
fn test_link_menu_opens_new_tab() {
    let scenario = browser_at("/link");
    let browser = scenario.browser().unwrap();
    let target = scenario.fixture_url("/aleaiactaest").unwrap();
    let menu = browser.open_context_menu().unwrap();
    assert_eq!(menu.title_label().unwrap().text().unwrap(), target);
    menu.click_action("openLinkInNewTabContextualAction").unwrap();
    eventually(|| browser.webviews().map(|w| w.len()), equals(2_usize)).unwrap();
    browser.wait_until_page_loaded(&target).unwrap();
}

#[test]
fn test_short_configured_long_press_lowers_threshold() {
    let process = MockBrowser::browser().start().unwrap();
    let _session = process.attach(quick().with_long_press(60));
    assert_eq!(
        process.app().long_press_threshold(),
        Duration::from_millis(30)
    );
}

#[test]
fn test_phone_menu_opens_on_long_press() {
    let scenario = ScenarioBuilder::browser()
        .with_config(quick().with_long_press(50))
        .with_device_class(DeviceClass::Phone)
        .with_fixture_server()
        .open_fixture("/link")
        .build()
        .unwrap();
    let browser = scenario.browser().unwrap();
    let url = scenario.fixture_url("/link").unwrap();
    browser.wait_until_page_loaded(&url).unwrap();
    assert!(!browser.wide().unwrap());
    let menu = browser.open_context_menu().unwrap();
    assert_eq!(menu.layout(), MenuLayout::Narrow);
    assert!(menu.action("ShareLinkContextualAction").is_ok());
    menu.dismiss().unwrap();
    menu.node().wait_until_destroyed().unwrap();
}
