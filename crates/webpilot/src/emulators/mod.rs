//! Semantic accessors ("emulators").
//!
//! One wrapper type per UI surface. Every selector the toolkit knows about
//! lives in this module tree; scenario code only calls named methods such
//! as [`Browser::go_to_url`] or [`ContextMenu::click_action`].
//!
//! Absence is never swallowed: asking for a surface that does not exist in
//! the current UI state (the chrome of a chromeless window, a dialog that
//! was never opened) propagates `NotFound`.
//!
//! ```ignore
//! let browser: Browser = session.select_single_as(Query::any())?;
//! browser.go_to_url(&format!("{base}/js-confirm-dialog"))?;
//! let dialog = browser.confirm_dialog()?;
//! dialog.wait_until_visible()?;
//! dialog.click_cancel()?;
//! dialog.wait_until_destroyed()?;
//! eventually(|| browser.current_webview()?.title(), equals("CANCEL"))?;
//! ```

mod address_bar;
mod chrome;
mod context_menu;
mod dialogs;
mod find_in_page;
mod history;
mod main_window;
mod new_tab_view;
mod sad_tab;
mod settings;
mod tabs;
mod webapp;

pub use address_bar::{AddressBar, Suggestion, Suggestions};
pub use chrome::{Chrome, Drawer};
pub use context_menu::{ContextMenu, MenuLayout};
pub use dialogs::{
    AlertDialog, AnyDialog, BeforeUnloadDialog, BookmarkOptions, ConfirmDialog, DialogSurface,
    GeolocationDialog, HttpAuthDialog, MediaAccessDialog, PromptDialog,
};
pub use find_in_page::FindInPageBar;
pub use history::{HistoryDomain, HistoryView};
pub use main_window::{Browser, WebView};
pub use new_tab_view::{BookmarksFolder, NewTabView, UrlDelegate};
pub use sad_tab::SadTab;
pub use settings::SettingsPage;
pub use tabs::{TabPreview, TabsView};
pub use webapp::{PopupOverlay, WebappContainer};

use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;

/// A typed wrapper around one kind of node
pub trait Emulator: Sized {
    /// Type tag the wrapped node carries
    const TYPE_NAME: &'static str;

    /// Wrap a node. The type tag is not re-checked.
    fn from_node(node: UiNode) -> Self;

    /// The wrapped node
    fn node(&self) -> &UiNode;

    /// Query selecting this emulator's nodes
    #[must_use]
    fn query() -> Query {
        Query::of_type(Self::TYPE_NAME)
    }
}

/// Implements [`Emulator`] for a single-field wrapper struct
macro_rules! emulator {
    ($ty:ident, $type_name:literal) => {
        impl $crate::emulators::Emulator for $ty {
            const TYPE_NAME: &'static str = $type_name;

            fn from_node(node: $crate::node::UiNode) -> Self {
                Self { node }
            }

            fn node(&self) -> &$crate::node::UiNode {
                &self.node
            }
        }
    };
    ($ty:ident, $type_name:literal, $object_name:literal) => {
        impl $crate::emulators::Emulator for $ty {
            const TYPE_NAME: &'static str = $type_name;

            fn from_node(node: $crate::node::UiNode) -> Self {
                Self { node }
            }

            fn node(&self) -> &$crate::node::UiNode {
                &self.node
            }

            fn query() -> $crate::query::Query {
                $crate::query::Query::of_type($type_name).with_name($object_name)
            }
        }
    };
}
pub(crate) use emulator;

/// Click a node through the session's pointer
pub(crate) fn click(node: &UiNode) -> PilotResult<()> {
    node.session()?.pointer().click_object(node)
}

/// Child button by object name, clickable (visible and enabled)
pub(crate) fn button(scope: &UiNode, object_name: &str) -> PilotResult<UiNode> {
    scope.select_single(&Query::named(object_name).visible())
}

/// Click a child by object name
pub(crate) fn click_named(scope: &UiNode, object_name: &str) -> PilotResult<()> {
    click(&button(scope, object_name)?)
}
