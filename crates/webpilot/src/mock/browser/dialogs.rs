//! Modal surfaces: JavaScript dialogs, permission and auth prompts,
//! bookmark options and context menus.

use super::{AppKind, Engine, NavKind, State};
use crate::mock::app::{Gesture, MockApp, NodeSpec};
use crate::mock::page::{ContentKind, JsDialog, PermissionKind, PermissionRequest, Reaction};
use crate::profile::BookmarkStore;
use crate::transport::NodeId;
use crate::value::Rect;
use std::sync::Arc;

const DIALOG: Rect = Rect::new(200, 150, 400, 300);
const MENU_ITEM_HEIGHT: i32 = 28;
const MENU_TITLE_HEIGHT: i32 = 30;
const DEFAULT_FOLDER_TEXT: &str = "All Bookmarks";

fn button(app: &MockApp, parent: NodeId, name: &str, slot: i32) -> NodeId {
    app.insert(
        Some(parent),
        NodeSpec::new("Button")
            .name(name)
            .rect(Rect::new(DIALOG.x + 20 + slot * 190, 390, 170, 40)),
    )
}

fn text_field(app: &MockApp, parent: NodeId, name: &str, row: i32, text: &str) -> NodeId {
    app.insert(
        Some(parent),
        NodeSpec::new("TextField")
            .name(name)
            .editable()
            .text(text)
            .rect(Rect::new(DIALOG.x + 20, 250 + row * 50, 360, 40)),
    )
}

impl Engine {
    fn dialog(&self, app: &MockApp, type_name: &str, name: &str, text: &str) -> NodeId {
        app.insert(
            Some(self.layout.root),
            NodeSpec::new(type_name).name(name).text(text).rect(DIALOG),
        )
    }

    /// Close `dialog`, then run `f` with the engine state
    fn on_answer(
        self: &Arc<Self>,
        app: &MockApp,
        button: NodeId,
        dialog: NodeId,
        f: impl Fn(&Arc<Self>, &mut State, &MockApp) + Send + Sync + 'static,
    ) {
        self.on(app, button, Gesture::Click, move |engine, app, _| {
            let mut state = engine.lock();
            app.destroy(dialog);
            f(engine, &mut state, app);
        });
    }

    fn react(self: &Arc<Self>, state: &mut State, app: &MockApp, key: u64, reaction: Option<&Reaction>) {
        match reaction {
            Some(Reaction::Navigate(url)) => {
                self.start_load(state, app, key, url.clone(), NavKind::Fresh, true);
            }
            Some(Reaction::SetTitle(title)) => {
                if let Some(tab) = state.tab_mut(key) {
                    tab.title.clone_from(title);
                    app.set(tab.webview, "title", title.as_str());
                }
                self.sync(state, app);
            }
            None => {}
        }
    }

    // =========================================================================
    // PAGE DIALOGS
    // =========================================================================

    pub(super) fn show_js_dialog(self: &Arc<Self>, app: &MockApp, key: u64, dialog: JsDialog) {
        match dialog {
            JsDialog::Alert { message } => {
                let node = self.dialog(app, "Dialog", "alertDialog", &message);
                let ok = button(app, node, "okButton", 0);
                self.on_answer(app, ok, node, |_, _, _| {});
            }
            JsDialog::Confirm {
                message,
                on_ok,
                on_cancel,
            } => {
                let node = self.dialog(app, "Dialog", "confirmDialog", &message);
                let ok = button(app, node, "okButton", 1);
                let cancel = button(app, node, "cancelButton", 0);
                self.on_answer(app, ok, node, move |engine, state, app| {
                    engine.react(state, app, key, on_ok.as_ref());
                });
                self.on_answer(app, cancel, node, move |engine, state, app| {
                    engine.react(state, app, key, on_cancel.as_ref());
                });
            }
            JsDialog::Prompt {
                message,
                default,
                cancel_title,
            } => {
                let node = self.dialog(app, "Dialog", "promptDialog", &message);
                let field = text_field(app, node, "inputTextField", 0, &default);
                let ok = button(app, node, "okButton", 1);
                let cancel = button(app, node, "cancelButton", 0);
                self.on(app, ok, Gesture::Click, move |engine, app, _| {
                    let answer = app.get_string(field, "text");
                    let mut state = engine.lock();
                    app.destroy(node);
                    engine.react(&mut state, app, key, Some(&Reaction::SetTitle(answer)));
                });
                self.on_answer(app, cancel, node, move |engine, state, app| {
                    engine.react(state, app, key, Some(&Reaction::SetTitle(cancel_title.clone())));
                });
            }
        }
    }

    pub(super) fn show_permission(self: &Arc<Self>, app: &MockApp, key: u64, request: PermissionRequest) {
        let node = match request.kind {
            PermissionKind::Media => self.dialog(
                app,
                "Dialog",
                "mediaAccessDialog",
                "Allow this domain to access your camera and microphone?",
            ),
            PermissionKind::Geolocation => self.dialog(
                app,
                "GeolocationPermissionRequest",
                "geolocationDialog",
                "This page wants to know your location",
            ),
        };
        let allow = button(app, node, "allowButton", 1);
        let deny = button(app, node, "denyButton", 0);
        let PermissionRequest {
            on_allow, on_deny, ..
        } = request;
        self.on_answer(app, allow, node, move |engine, state, app| {
            engine.react(state, app, key, on_allow.as_ref());
        });
        self.on_answer(app, deny, node, move |engine, state, app| {
            engine.react(state, app, key, on_deny.as_ref());
        });
    }

    /// Ask before leaving a page with a `beforeunload` handler
    pub(super) fn show_before_unload(self: &Arc<Self>, app: &MockApp) {
        let node = self.dialog(
            app,
            "Dialog",
            "beforeUnloadDialog",
            "Changes you made may not be saved.",
        );
        let leave = button(app, node, "leaveButton", 1);
        let stay = button(app, node, "stayButton", 0);
        self.on_answer(app, leave, node, |engine, state, app| {
            if let Some(pending) = state.pending.take() {
                engine.start_load(state, app, pending.key, pending.url, pending.kind, true);
            }
        });
        self.on_answer(app, stay, node, |_, state, _| {
            state.pending = None;
        });
    }

    /// Ask for credentials for the pending navigation
    pub(super) fn show_http_auth(self: &Arc<Self>, app: &MockApp) {
        let node = self.dialog(
            app,
            "Dialog",
            "httpAuthenticationDialog",
            "The server requires a username and password.",
        );
        let username = text_field(app, node, "username", 0, "");
        let password = text_field(app, node, "password", 1, "");
        let allow = button(app, node, "allowButton", 1);
        let deny = button(app, node, "denyButton", 0);
        self.on(app, allow, Gesture::Click, move |engine, app, _| {
            let credentials = (
                app.get_string(username, "text"),
                app.get_string(password, "text"),
            );
            let mut state = engine.lock();
            app.destroy(node);
            let Some(pending) = state.pending.take() else {
                return;
            };
            if let Some(tab) = state.tab_mut(pending.key) {
                tab.credentials = Some(credentials);
            }
            engine.start_load(&mut state, app, pending.key, pending.url, pending.kind, true);
        });
        self.on_answer(app, deny, node, |_, state, _| {
            state.pending = None;
        });
    }

    // =========================================================================
    // BOOKMARK OPTIONS
    // =========================================================================

    pub(super) fn show_bookmark_options(self: &Arc<Self>, app: &MockApp, url: &str, title: &str) {
        let node = app.insert(
            Some(self.layout.root),
            NodeSpec::new("BookmarkOptions")
                .name("bookmarkOptions")
                .rect(Rect::new(400, 48, 360, 220)),
        );
        app.insert(
            Some(node),
            NodeSpec::new("OptionSelector")
                .name("bookmarkFolderSelector")
                .prop("selectedText", DEFAULT_FOLDER_TEXT)
                .rect(Rect::new(420, 68, 320, 40)),
        );
        let field = app.insert(
            Some(node),
            NodeSpec::new("TextField")
                .name("titleTextField")
                .editable()
                .text(title)
                .rect(Rect::new(420, 128, 320, 40)),
        );
        let ok = app.insert(
            Some(node),
            NodeSpec::new("Button")
                .name("okButton")
                .rect(Rect::new(640, 208, 100, 40)),
        );
        let url = url.to_string();
        self.on(app, ok, Gesture::Click, move |engine, app, _| {
            let title = app.get_string(field, "text");
            let mut state = engine.lock();
            app.destroy(node);
            engine.rename_bookmark(&mut state, &url, &title);
        });
    }

    fn rename_bookmark(&self, state: &mut State, url: &str, title: &str) {
        let Some(bookmark) = state.bookmarks.iter_mut().find(|b| b.url == url) else {
            return;
        };
        if bookmark.title == title {
            return;
        }
        bookmark.title = title.to_string();
        let Some(path) = self.paths.bookmarks() else {
            return;
        };
        let renamed = BookmarkStore::open(&path)
            .and_then(|store| store.remove(url).and_then(|()| store.insert(bookmark)));
        if let Err(err) = renamed {
            tracing::warn!(%err, "could not rename bookmark");
        }
    }

    // =========================================================================
    // CONTEXT MENU
    // =========================================================================

    /// Menu for whatever the page has under the pointer
    pub(super) fn open_context_menu(self: &Arc<Self>, app: &MockApp, key: u64) {
        let mut state = self.lock();
        if let Some(menu) = state.views.menu.take() {
            app.destroy(menu);
        }
        let Some(content) = state.tab(key).map(|t| t.script.content.clone()) else {
            return;
        };
        let mut actions: Vec<String> = content
            .actions(self.touch)
            .into_iter()
            .map(str::to_string)
            .collect();
        if !self.wide {
            actions.push("cancelAction".to_string());
        }
        let count = i32::try_from(actions.len()).unwrap_or(i32::MAX);
        let height = MENU_TITLE_HEIGHT + count * MENU_ITEM_HEIGHT;
        let (name, frame) = if self.wide {
            ("contextMenuWide", Rect::new(300, 150, 200, height))
        } else {
            ("contextMenuMobile", Rect::new(0, 600 - height, 800, height))
        };
        let menu = app.insert(
            Some(self.layout.root),
            NodeSpec::new("ContextMenu").name(name).rect(frame),
        );
        let title = content.title();
        app.insert(
            Some(menu),
            NodeSpec::new("Label")
                .name("titleLabel")
                .text(title.as_deref().unwrap_or_default())
                .visible(title.is_some())
                .rect(Rect::new(frame.x, frame.y, frame.width, MENU_TITLE_HEIGHT)),
        );
        for (row, action) in (0..).zip(actions) {
            let item = app.insert(
                Some(menu),
                NodeSpec::new("Empty").name(&format!("{action}_item")).rect(Rect::new(
                    frame.x,
                    frame.y + MENU_TITLE_HEIGHT + row * MENU_ITEM_HEIGHT,
                    frame.width,
                    MENU_ITEM_HEIGHT,
                )),
            );
            let content = content.clone();
            self.on(app, item, Gesture::Click, move |engine, app, _| {
                let mut state = engine.lock();
                if let Some(menu) = state.views.menu.take() {
                    app.destroy(menu);
                }
                engine.run_menu_action(&mut state, app, key, &action, &content);
            });
        }
        state.views.menu = Some(menu);
        tracing::debug!(tab = key, menu = name, "context menu opened");
    }

    fn run_menu_action(
        self: &Arc<Self>,
        state: &mut State,
        app: &MockApp,
        key: u64,
        action: &str,
        content: &ContentKind,
    ) {
        let link = content.link().map(str::to_string);
        match (action, link) {
            ("openLinkInNewTabContextualAction", Some(href)) => self.open_link(state, app, href, true),
            ("openLinkInNewBackgroundTabContextualAction", Some(href)) => {
                self.open_link(state, app, href, false);
            }
            ("bookmarkLinkContextualAction", Some(href)) => {
                if !state.is_bookmarked(&href) {
                    self.add_bookmark(state, app, &href, "");
                }
            }
            ("OpenImageInNewTabContextualAction", _) => {
                if let Some(uri) = content.title() {
                    self.open_link(state, app, uri, true);
                }
            }
            (other, _) => tracing::debug!(tab = key, action = other, "context action has no effect"),
        }
    }

    fn open_link(self: &Arc<Self>, state: &mut State, app: &MockApp, url: String, switch: bool) {
        match self.kind {
            AppKind::Browser => {
                self.open_tab(state, app, Some(url), switch);
            }
            AppKind::Container => self.open_popup(state, app, url),
        }
    }
}
