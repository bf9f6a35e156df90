//! Full-window views: new tab page, sad tab, tabs overview, drawer,
//! settings, history, find-in-page bar and address bar suggestions.

use super::{search_url, Action, Engine, NavKind, State, CONTENT, SEARCH_ENGINE_NAME, WINDOW};
use crate::mock::app::{Gesture, MockApp, NodeSpec};
use crate::mock::page::{count_matches, PageRequest};
use crate::node::GLOBAL_RECT;
use crate::profile::{write_settings, HistoryEntry};
use crate::transport::NodeId;
use crate::value::Rect;
use reqwest::Url;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const ROW: i32 = 40;
const TOP_SITES: usize = 10;
const TOP_SITES_PER_ROW: usize = 5;
const LOCAL_SUGGESTIONS: usize = 4;

fn rows(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

// =============================================================================
// NEW TAB VIEW
// =============================================================================

#[derive(Debug)]
struct Folder {
    node: NodeId,
    header: NodeId,
    entries: Vec<NodeId>,
    expanded: bool,
}

/// The new tab view shown over a blank tab
#[derive(Debug)]
pub(super) struct NewTabNodes {
    view: NodeId,
    folders_top: i32,
    folders: Vec<Folder>,
}

impl NewTabNodes {
    fn relayout(&self, app: &MockApp) {
        let mut y = self.folders_top;
        for folder in &self.folders {
            let shown = if folder.expanded { folder.entries.len() } else { 0 };
            app.set(folder.node, "expanded", folder.expanded);
            app.set(folder.node, GLOBAL_RECT, Rect::new(10, y, 780, ROW * (1 + rows(shown))));
            app.set(folder.header, GLOBAL_RECT, Rect::new(10, y, 780, ROW));
            for (row, entry) in (1..).zip(&folder.entries) {
                app.set(*entry, "visible", folder.expanded);
                app.set(*entry, GLOBAL_RECT, Rect::new(10, y + row * ROW, 780, ROW));
            }
            y += ROW * (1 + rows(shown));
        }
    }
}

/// Top sites: most visited first
fn top_sites(visits: &[HistoryEntry]) -> Vec<&HistoryEntry> {
    let mut sites: Vec<&HistoryEntry> = visits
        .iter()
        .filter(|e| !e.url.starts_with("data:"))
        .collect();
    sites.sort_by(|a, b| {
        b.visits
            .cmp(&a.visits)
            .then(b.last_visit.cmp(&a.last_visit))
    });
    sites.truncate(TOP_SITES);
    sites
}

impl Engine {
    fn url_delegate(
        self: &Arc<Self>,
        app: &MockApp,
        parent: NodeId,
        name: &str,
        url: &str,
        title: &str,
        rect: Rect,
    ) -> NodeId {
        let node = app.insert(
            Some(parent),
            NodeSpec::new("UrlDelegate")
                .name(name)
                .prop("url", url)
                .prop("title", title)
                .rect(rect),
        );
        let url = url.to_string();
        self.on(app, node, Gesture::Click, move |engine, app, _| {
            let mut state = engine.lock();
            let key = state.current;
            engine.start_load(&mut state, app, key, url.clone(), NavKind::Fresh, false);
        });
        node
    }

    pub(super) fn sync_new_tab_view(self: &Arc<Self>, state: &mut State, app: &MockApp, blank: bool) {
        match (blank, state.views.new_tab.take()) {
            (true, Some(view)) => state.views.new_tab = Some(view),
            (true, None) => state.views.new_tab = Some(self.build_new_tab_view(state, app)),
            (false, Some(view)) => app.destroy(view.view),
            (false, None) => {}
        }
    }

    fn build_new_tab_view(self: &Arc<Self>, state: &State, app: &MockApp) -> NewTabNodes {
        let view = app.insert(
            Some(self.layout.views),
            NodeSpec::new("NewTabView").name("newTabView").rect(CONTENT),
        );
        let sites = top_sites(&state.visits);
        let site_rows = rows(sites.len().div_ceil(TOP_SITES_PER_ROW));
        let section = app.insert(
            Some(view),
            NodeSpec::new("QQuickItem")
                .name("topSitesList")
                .rect(Rect::new(0, 58, 800, site_rows * 100)),
        );
        for (i, site) in sites.iter().enumerate() {
            let (col, row) = (rows(i % TOP_SITES_PER_ROW), rows(i / TOP_SITES_PER_ROW));
            let rect = Rect::new(10 + col * 156, 58 + row * 100, 146, 90);
            self.url_delegate(app, section, "topSiteDelegate", &site.url, &site.title, rect);
        }

        let mut by_folder: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
        for bookmark in &state.bookmarks {
            by_folder
                .entry(bookmark.folder.as_str())
                .or_default()
                .push((bookmark.url.as_str(), bookmark.title.as_str()));
        }
        if state.homepage.is_some() {
            by_folder.entry("").or_default();
        }
        let mut folders = Vec::new();
        for (name, bookmarks) in by_folder {
            let node = app.insert(
                Some(view),
                NodeSpec::new("BookmarksFolderDelegate")
                    .name("bookmarkFolderDelegate")
                    .prop("folderName", name)
                    .prop("expanded", name.is_empty()),
            );
            let header = app.insert(
                Some(node),
                NodeSpec::new("QQuickItem").name("folderHeader").text(name),
            );
            let mut entries = Vec::new();
            if let Some(homepage) = state.homepage.as_deref().filter(|_| name.is_empty()) {
                entries.push(self.url_delegate(
                    app,
                    node,
                    "homepageBookmark",
                    homepage,
                    "Homepage",
                    Rect::default(),
                ));
            }
            for (url, title) in bookmarks {
                entries.push(self.url_delegate(app, node, "bookmarkDelegate", url, title, Rect::default()));
            }
            let index = folders.len();
            self.on(app, header, Gesture::Click, move |engine, app, _| {
                let mut state = engine.lock();
                if let Some(view) = state.views.new_tab.as_mut() {
                    if let Some(folder) = view.folders.get_mut(index) {
                        folder.expanded = !folder.expanded;
                    }
                    view.relayout(app);
                }
            });
            folders.push(Folder {
                node,
                header,
                entries,
                expanded: name.is_empty(),
            });
        }
        let nodes = NewTabNodes {
            view,
            folders_top: 58 + site_rows * 100 + 10,
            folders,
        };
        nodes.relayout(app);
        nodes
    }

    // =========================================================================
    // SAD TAB
    // =========================================================================

    pub(super) fn sync_sad_tab(self: &Arc<Self>, state: &mut State, app: &MockApp, sad: bool) {
        match (sad, state.views.sad_tab) {
            (true, None) => {
                let url = state.current_tab().map(|t| t.url.clone()).unwrap_or_default();
                let view = app.insert(
                    Some(self.layout.views),
                    NodeSpec::new("SadTab")
                        .name("sadTab")
                        .text(&format!(
                            "Something went wrong while displaying {url}."
                        ))
                        .rect(CONTENT),
                );
                let reload = app.insert(
                    Some(view),
                    NodeSpec::new("Button")
                        .name("reloadButton")
                        .rect(Rect::new(300, 400, 200, 40)),
                );
                let close = app.insert(
                    Some(view),
                    NodeSpec::new("Button")
                        .name("closeButton")
                        .rect(Rect::new(300, 460, 200, 40)),
                );
                self.on_click(app, reload, Self::sad_tab_reload);
                self.on_click(app, close, Self::close_current_tab);
                state.views.sad_tab = Some(view);
            }
            (false, Some(view)) => {
                app.destroy(view);
                state.views.sad_tab = None;
            }
            _ => {}
        }
    }

    // =========================================================================
    // DRAWER
    // =========================================================================

    pub(super) fn open_drawer(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        if let Some(drawer) = state.views.drawer.take() {
            app.destroy(drawer);
            return;
        }
        let Some(chrome) = self.layout.chrome else {
            return;
        };
        let entries: [(&str, Action); 4] = [
            ("history", Self::open_history_view),
            ("settings", Self::open_settings),
            ("newtab", Self::new_tab),
            ("findinpage", Self::open_find_bar),
        ];
        let drawer = app.insert(
            Some(chrome.chrome),
            NodeSpec::new("Drawer")
                .name("drawer")
                .rect(Rect::new(600, 48, 200, ROW * rows(entries.len()))),
        );
        for ((name, action), row) in entries.into_iter().zip(0..) {
            let item = app.insert(
                Some(drawer),
                NodeSpec::new("DrawerAction")
                    .name(name)
                    .rect(Rect::new(600, 48 + row * ROW, 200, ROW)),
            );
            self.on(app, item, Gesture::Click, move |engine, app, _| {
                if let Some(drawer) = engine.lock().views.drawer.take() {
                    app.destroy(drawer);
                }
                action(engine, app);
            });
        }
        state.views.drawer = Some(drawer);
    }

    // =========================================================================
    // TABS VIEW
    // =========================================================================

    pub(super) fn open_tabs_view(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        if state.views.tabs.is_some() {
            return;
        }
        let view = app.insert(
            Some(self.layout.root),
            NodeSpec::new("TabsView").name("tabsView").rect(WINDOW),
        );
        state.views.tabs = Some(view);
        self.fill_tabs_view(&state, app, view);
    }

    fn fill_tabs_view(self: &Arc<Self>, state: &State, app: &MockApp, view: NodeId) {
        app.clear_children(view);
        for (column, key) in (0..).zip(state.tab_keys()) {
            let Some(tab) = state.tab(key) else {
                continue;
            };
            let x = 20 + column * 200;
            let preview = app.insert(
                Some(view),
                NodeSpec::new("PageDelegate")
                    .name("openTabDelegate")
                    .prop("title", tab.title.as_str())
                    .prop("url", tab.url.as_str())
                    .rect(Rect::new(x, 100, 180, 240)),
            );
            let close = app.insert(
                Some(preview),
                NodeSpec::new("AbstractButton")
                    .name("closeButton")
                    .rect(Rect::new(x + 150, 100, 30, 30)),
            );
            self.on(app, preview, Gesture::Click, move |engine, app, _| {
                let mut state = engine.lock();
                if let Some(view) = state.views.tabs.take() {
                    app.destroy(view);
                }
                engine.select_tab(&mut state, app, key);
            });
            self.on(app, close, Gesture::Click, move |engine, app, _| {
                let mut state = engine.lock();
                engine.close_tab(&mut state, app, key);
                if let Some(view) = state.views.tabs {
                    engine.fill_tabs_view(&state, app, view);
                }
            });
        }
        let new_tab = app.insert(
            Some(view),
            NodeSpec::new("QQuickItem")
                .name("newTabDelegate")
                .rect(Rect::new(20, 380, 180, 60)),
        );
        let done = app.insert(
            Some(view),
            NodeSpec::new("Button")
                .name("doneButton")
                .rect(Rect::new(700, 10, 80, 40)),
        );
        self.on_click(app, new_tab, |engine, app| {
            if let Some(view) = engine.lock().views.tabs.take() {
                app.destroy(view);
            }
            engine.new_tab(app);
        });
        self.on_click(app, done, |engine, app| {
            if let Some(view) = engine.lock().views.tabs.take() {
                app.destroy(view);
            }
        });
    }

    // =========================================================================
    // SETTINGS
    // =========================================================================

    fn open_settings(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        if state.views.settings.is_some() {
            return;
        }
        let page = app.insert(
            Some(self.layout.root),
            NodeSpec::new("SettingsPage").name("settingsPage").rect(WINDOW),
        );
        let homepage = state.homepage.clone().unwrap_or_default();
        let entries = [
            ("searchengine", SEARCH_ENGINE_NAME.to_string()),
            ("homepage", homepage),
            ("restoreSession", "Restore previous session at startup".to_string()),
        ];
        let mut homepage_entry = None;
        for ((name, sub_text), row) in entries.into_iter().zip(0..) {
            let entry = app.insert(
                Some(page),
                NodeSpec::new("SettingsListItem")
                    .name(name)
                    .prop("subText", sub_text)
                    .rect(Rect::new(0, 60 + row * 60, 800, 60)),
            );
            if name == "homepage" {
                homepage_entry = Some(entry);
            }
        }
        let back = app.insert(
            Some(page),
            NodeSpec::new("Button")
                .name("settingsBackButton")
                .rect(Rect::new(0, 0, 60, 48)),
        );
        self.on_click(app, back, |engine, app| {
            if let Some(page) = engine.lock().views.settings.take() {
                app.destroy(page);
            }
        });
        if let Some(entry) = homepage_entry {
            self.on(app, entry, Gesture::Click, |engine, app, entry| {
                engine.open_homepage_dialog(app, entry);
            });
        }
        state.views.settings = Some(page);
    }

    fn open_homepage_dialog(self: &Arc<Self>, app: &MockApp, entry: NodeId) {
        let current = self.lock().homepage.clone().unwrap_or_default();
        let dialog = app.insert(
            Some(self.layout.root),
            NodeSpec::new("Popover")
                .name("homepageDialog")
                .rect(Rect::new(200, 150, 400, 200)),
        );
        let field = app.insert(
            Some(dialog),
            NodeSpec::new("TextField")
                .name("homepageDialog.textField")
                .editable()
                .text(&current)
                .rect(Rect::new(220, 200, 360, 40)),
        );
        let cancel = app.insert(
            Some(dialog),
            NodeSpec::new("Button")
                .name("homepageDialog.cancelButton")
                .rect(Rect::new(220, 290, 170, 40)),
        );
        let save = app.insert(
            Some(dialog),
            NodeSpec::new("Button")
                .name("homepageDialog.saveButton")
                .rect(Rect::new(410, 290, 170, 40)),
        );
        self.on(app, cancel, Gesture::Click, move |_, app, _| app.destroy(dialog));
        self.on(app, save, Gesture::Click, move |engine, app, _| {
            let homepage = app.get_string(field, "text").trim().to_string();
            let mut state = engine.lock();
            app.destroy(dialog);
            app.set(entry, "subText", homepage.as_str());
            if let Some(path) = engine.paths.settings() {
                if let Err(err) = write_settings(&path, &[("homepage", homepage.as_str())]) {
                    tracing::warn!(%err, "could not save homepage");
                }
            }
            state.homepage = Some(homepage).filter(|h| !h.is_empty());
        });
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    fn open_history_view(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        if state.views.history.is_some() {
            return;
        }
        let view = app.insert(
            Some(self.layout.root),
            NodeSpec::new("HistoryView").name("historyView").rect(WINDOW),
        );
        // domain -> (entries, latest visit, latest url)
        let mut domains: BTreeMap<&str, (i64, i64, &str)> = BTreeMap::new();
        for entry in state.visits.iter().filter(|e| !e.domain.is_empty()) {
            let slot = domains
                .entry(entry.domain.as_str())
                .or_insert((0, i64::MIN, entry.url.as_str()));
            slot.0 += 1;
            if entry.last_visit > slot.1 {
                slot.1 = entry.last_visit;
                slot.2 = entry.url.as_str();
            }
        }
        let mut domains: Vec<_> = domains.into_iter().collect();
        domains.sort_by(|a, b| b.1 .1.cmp(&a.1 .1).then(a.0.cmp(&b.0)));
        for ((domain, (count, _, url)), row) in domains.into_iter().zip(0..) {
            let node = app.insert(
                Some(view),
                NodeSpec::new("HistoryDomainDelegate")
                    .name("historyDomainDelegate")
                    .prop("domain", domain)
                    .prop("count", count)
                    .rect(Rect::new(0, 60 + row * 50, 800, 50)),
            );
            let url = url.to_string();
            self.on(app, node, Gesture::Click, move |engine, app, _| {
                let mut state = engine.lock();
                if let Some(view) = state.views.history.take() {
                    app.destroy(view);
                }
                let key = state.current;
                engine.start_load(&mut state, app, key, url.clone(), NavKind::Fresh, false);
            });
        }
        let done = app.insert(
            Some(view),
            NodeSpec::new("Button")
                .name("doneButton")
                .rect(Rect::new(700, 10, 80, 40)),
        );
        self.on_click(app, done, |engine, app| {
            if let Some(view) = engine.lock().views.history.take() {
                app.destroy(view);
            }
        });
        state.views.history = Some(view);
    }

    // =========================================================================
    // FIND IN PAGE
    // =========================================================================

    pub(super) fn open_find_bar(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        if let Some(bar) = &state.views.find_bar {
            app.focus(Some(bar.field));
            return;
        }
        let node = app.insert(
            Some(self.layout.root),
            NodeSpec::new("FindInPageBar")
                .name("findInPageBar")
                .rect(Rect::new(0, 552, 800, 48)),
        );
        let field = app.insert(
            Some(node),
            NodeSpec::new("TextField")
                .name("findInPageTextField")
                .editable()
                .rect(Rect::new(0, 552, 560, 48)),
        );
        let counter = app.insert(
            Some(node),
            NodeSpec::new("Label")
                .name("findInPageCounter")
                .text("0/0")
                .rect(Rect::new(560, 552, 96, 48)),
        );
        let buttons = [
            ("findPreviousButton", 656),
            ("findNextButton", 704),
            ("findInPageCloseButton", 752),
        ];
        for (name, x) in buttons {
            let button = app.insert(
                Some(node),
                NodeSpec::new("AbstractButton")
                    .name(name)
                    .rect(Rect::new(x, 552, 48, 48)),
            );
            let step: fn(&mut FindBar) = match name {
                "findPreviousButton" => FindBar::previous,
                "findNextButton" => FindBar::next,
                _ => {
                    self.on_click(app, button, |engine, app| {
                        if let Some(bar) = engine.lock().views.find_bar.take() {
                            app.destroy(bar.node);
                        }
                    });
                    continue;
                }
            };
            self.on_click_step(app, button, step);
        }
        self.on(app, field, Gesture::Edit, |engine, app, field| {
            let term = app.get_string(field, "text");
            let mut state = engine.lock();
            let total = state
                .current_tab()
                .map_or(0, |tab| count_matches(&tab.script.text, &term));
            if let Some(bar) = state.views.find_bar.as_mut() {
                bar.total = total;
                bar.current = u32::from(total > 0);
                bar.show(app);
            }
        });
        app.focus(Some(field));
        state.views.find_bar = Some(FindBar {
            node,
            field,
            counter,
            current: 0,
            total: 0,
        });
    }

    fn on_click_step(self: &Arc<Self>, app: &MockApp, button: NodeId, step: fn(&mut FindBar)) {
        self.on(app, button, Gesture::Click, move |engine, app, _| {
            if let Some(bar) = engine.lock().views.find_bar.as_mut() {
                step(bar);
                bar.show(app);
            }
        });
    }

    // =========================================================================
    // SUGGESTIONS
    // =========================================================================

    fn local_suggestions(state: &State, term: &str) -> Vec<(String, String)> {
        let needle = term.to_lowercase();
        let hit = |url: &str, title: &str| {
            url.to_lowercase().contains(&needle) || title.to_lowercase().contains(&needle)
        };
        let mut found: Vec<(String, String)> = Vec::new();
        let history = state
            .visits
            .iter()
            .filter(|e| hit(&e.url, &e.title))
            .take(LOCAL_SUGGESTIONS)
            .map(|e| (e.title.clone(), e.url.clone()));
        let bookmarks = state
            .bookmarks
            .iter()
            .filter(|b| hit(&b.url, &b.title))
            .take(LOCAL_SUGGESTIONS)
            .map(|b| (b.title.clone(), b.url.clone()));
        for (title, url) in history.chain(bookmarks) {
            if !found.iter().any(|(_, u)| *u == url) {
                found.push((title, url));
            }
        }
        found
    }

    pub(super) fn update_suggestions(self: &Arc<Self>, state: &mut State, app: &MockApp, term: &str) {
        if term.trim().is_empty() {
            self.hide_suggestions(state, app);
            return;
        }
        state.suggest_seq += 1;
        let local = Self::local_suggestions(state, term);
        self.show_suggestions(app, &local);
        let Some(base) = self.options.suggestions_url.as_deref() else {
            return;
        };
        let Ok(mut url) = Url::parse(base) else {
            tracing::warn!(%base, "invalid suggestions URL");
            return;
        };
        url.query_pairs_mut().append_pair("q", term);
        let request = PageRequest::get(url.to_string());
        let (seq, term) = (state.suggest_seq, term.to_string());
        let engine = Arc::clone(self);
        app.spawn(Duration::ZERO, move |app| {
            let terms = match engine.loader.load(&request) {
                Ok(page) => parse_suggestions(&page.body),
                Err(err) => {
                    tracing::debug!(%err, "suggestions request failed");
                    return;
                }
            };
            let state = engine.lock();
            if state.suggest_seq != seq {
                return;
            }
            let mut entries = Self::local_suggestions(&state, &term);
            entries.extend(terms.into_iter().map(|t| {
                let url = search_url(&t);
                (t, url)
            }));
            engine.show_suggestions(app, &entries);
        });
    }

    fn show_suggestions(self: &Arc<Self>, app: &MockApp, entries: &[(String, String)]) {
        let Some((popup, list)) = self.layout.suggestions else {
            return;
        };
        app.clear_children(list);
        for ((title, url), row) in entries.iter().zip(0..) {
            let node = app.insert(
                Some(list),
                NodeSpec::new("Base")
                    .name("suggestionDelegate")
                    .prop("title", title.as_str())
                    .prop("url", url.as_str())
                    .rect(Rect::new(144, 48 + row * ROW, 512, ROW)),
            );
            let url = url.clone();
            self.on(app, node, Gesture::Click, move |engine, app, _| {
                app.focus(None);
                let mut state = engine.lock();
                engine.hide_suggestions(&mut state, app);
                let key = state.current;
                engine.start_load(&mut state, app, key, url.clone(), NavKind::Fresh, false);
            });
        }
        app.set(popup, "visible", !entries.is_empty());
    }

    pub(super) fn hide_suggestions(&self, state: &mut State, app: &MockApp) {
        if let Some((popup, list)) = self.layout.suggestions {
            state.suggest_seq += 1;
            app.set(popup, "visible", false);
            app.clear_children(list);
        }
    }
}

/// `[term, [suggestion, ...]]`
fn parse_suggestions(body: &str) -> Vec<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get(1).and_then(|v| v.as_array()).cloned())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Find-in-page bar and its match cursor
#[derive(Debug)]
pub(super) struct FindBar {
    node: NodeId,
    pub(super) field: NodeId,
    counter: NodeId,
    current: u32,
    total: u32,
}

impl FindBar {
    fn next(&mut self) {
        if self.total > 0 {
            self.current = self.current % self.total + 1;
        }
    }

    fn previous(&mut self) {
        if self.total > 0 {
            self.current = if self.current <= 1 { self.total } else { self.current - 1 };
        }
    }

    fn show(&self, app: &MockApp) {
        app.set(self.counter, "text", format!("{}/{}", self.current, self.total));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod find_bar_tests {
        use super::*;

        fn bar(current: u32, total: u32) -> FindBar {
            FindBar {
                node: 1,
                field: 2,
                counter: 3,
                current,
                total,
            }
        }

        #[test]
        fn test_next_wraps_to_first() {
            let mut bar = bar(3, 3);
            bar.next();
            assert_eq!(bar.current, 1);
        }

        #[test]
        fn test_previous_wraps_to_last() {
            let mut bar = bar(1, 3);
            bar.previous();
            assert_eq!(bar.current, 3);
        }

        #[test]
        fn test_steps_without_matches_stay_at_zero() {
            let mut bar = bar(0, 0);
            bar.next();
            bar.previous();
            assert_eq!(bar.current, 0);
        }
    }

    mod suggestion_tests {
        use super::*;

        #[test]
        fn test_parse_suggestions_reads_second_element() {
            let terms = parse_suggestions(r#"["foo", ["foo bar", "food"]]"#);
            assert_eq!(terms, vec!["foo bar".to_string(), "food".to_string()]);
        }

        #[test]
        fn test_parse_suggestions_tolerates_garbage() {
            assert!(parse_suggestions("not json").is_empty());
            assert!(parse_suggestions("[]").is_empty());
        }

        #[test]
        fn test_top_sites_sorted_by_visits() {
            let visits = vec![
                HistoryEntry::new("http://a.test/", "a").with_visits(1),
                HistoryEntry::new("http://b.test/", "b").with_visits(5),
                HistoryEntry::new("data:text/plain,x", "x").with_visits(9),
            ];
            let sites = top_sites(&visits);
            let urls: Vec<&str> = sites.iter().map(|e| e.url.as_str()).collect();
            assert_eq!(urls, vec!["http://b.test/", "http://a.test/"]);
        }
    }
}
