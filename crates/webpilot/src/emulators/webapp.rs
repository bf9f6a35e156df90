//! Web application container window.
//!
//! The container shows a single webview, optionally under a thin chrome
//! panel whose colors follow the page's `theme-color`. Links opened with
//! `target="_blank"` land in popup overlays stacked over the main view.

use super::main_window::{navigate, wait_until_loaded};
use super::{click_named, emulator, AddressBar, Chrome, ContextMenu, Emulator, WebView};
use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;
use crate::value::Color;

/// Container main window
#[derive(Debug, Clone)]
pub struct WebappContainer {
    node: UiNode,
}

emulator!(WebappContainer, "WebappContainer", "webappContainer");

impl WebappContainer {
    /// Whether the window uses the wide layout
    pub fn wide(&self) -> PilotResult<bool> {
        self.node.get("wide")
    }

    /// Application name taken from the manifest or the page title
    pub fn webapp_name(&self) -> PilotResult<String> {
        self.node.get("webappName")
    }

    /// The main webview
    pub fn webview(&self) -> PilotResult<WebView> {
        self.node
            .select_single_as(Query::named("webappBrowserView"))
    }

    /// Chrome panel. `NotFound` when chromeless.
    pub fn panel(&self) -> PilotResult<UiNode> {
        self.node.select_single(&Query::named("panel"))
    }

    /// Chrome inside the panel
    pub fn chrome(&self) -> PilotResult<Chrome> {
        self.node.select_single_as(Query::named("chromeBase"))
    }

    /// Address bar (only with `--enable-addressbar`)
    pub fn address_bar(&self) -> PilotResult<AddressBar> {
        self.node.select_single_as(Query::named("addressBar"))
    }

    /// Chrome background color
    pub fn chrome_background_color(&self) -> PilotResult<Color> {
        self.chrome()?.background_color()
    }

    /// Title label in the chrome
    pub fn chrome_text_label(&self) -> PilotResult<UiNode> {
        self.node.select_single(&Query::named("chromeTextLabel"))
    }

    /// Title label color (contrasts with the background)
    pub fn chrome_text_color(&self) -> PilotResult<Color> {
        self.chrome_text_label()?.get("color")
    }

    /// Icon color of a chrome button (`backButton`, `reloadButton`)
    pub fn button_icon_color(&self, button: &str) -> PilotResult<Color> {
        self.chrome()?
            .node()
            .select_single(&Query::named(button))?
            .get("iconColor")
    }

    /// Navigate through the address bar (requires `--enable-addressbar`)
    pub fn go_to_url(&self, url: &str) -> PilotResult<()> {
        navigate(&self.address_bar()?, url)
    }

    /// Wait until the main webview shows `url` fully loaded
    pub fn wait_until_page_loaded(&self, url: &str) -> PilotResult<()> {
        wait_until_loaded(&self.node, url, || self.webview())
    }

    /// Open popup overlays, oldest first
    pub fn popup_overlays(&self) -> PilotResult<Vec<PopupOverlay>> {
        let mut keyed = Vec::new();
        for overlay in self.node.select_many_as::<PopupOverlay>(Query::any())? {
            keyed.push((overlay.node.get::<i64>("z")?, overlay));
        }
        keyed.sort_by_key(|(z, _)| *z);
        Ok(keyed.into_iter().map(|(_, o)| o).collect())
    }

    /// Open the context menu over the main webview
    pub fn open_context_menu(&self) -> PilotResult<ContextMenu> {
        ContextMenu::open(&self.node, self.wide()?, self.webview()?.node().clone())
    }

    /// The open context menu
    pub fn context_menu(&self) -> PilotResult<ContextMenu> {
        ContextMenu::wait_for(&self.node, self.wide()?, self.webview()?.node().clone())
    }

    /// `uri` rewritten by the intent filter; empty when it is not an intent
    pub fn intent_filtered_uri(&self, uri: &str) -> PilotResult<String> {
        self.node.set("intentUriToFilter", uri)?;
        self.node.get("filteredIntentUri")
    }

    /// `uri` rewritten by the scheme filter
    pub fn scheme_filtered_uri(&self, uri: &str) -> PilotResult<String> {
        self.node.set("schemeUriToFilter", uri)?;
        self.node.get("filteredSchemeUri")
    }
}

/// Popup webview stacked over the main view
#[derive(Debug, Clone)]
pub struct PopupOverlay {
    node: UiNode,
}

emulator!(PopupOverlay, "PopupWindowOverlay");

impl PopupOverlay {
    /// The overlay's webview
    pub fn webview(&self) -> PilotResult<WebView> {
        self.node.select_single_as(Query::named("overlayWebview"))
    }

    /// URL shown in the overlay
    pub fn url(&self) -> PilotResult<String> {
        self.webview()?.url()
    }

    /// Close the overlay and wait for it to go away
    pub fn close(&self) -> PilotResult<()> {
        click_named(&self.node, "overlayCloseButton")?;
        self.node.wait_until_destroyed()
    }
}
