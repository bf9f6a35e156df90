use super::{click_named, emulator, DialogSurface};
use crate::node::UiNode;
use crate::result::PilotResult;

/// Recovery view shown after a tab's web process crashed
#[derive(Debug, Clone)]
pub struct SadTab {
    node: UiNode,
}

emulator!(SadTab, "SadTab", "sadTab");

impl SadTab {
    /// Explanation text
    pub fn text(&self) -> PilotResult<String> {
        self.node.text()
    }

    /// Reload the crashed page
    pub fn click_reload_button(&self) -> PilotResult<()> {
        click_named(&self.node, "reloadButton")
    }

    /// Close the crashed tab
    pub fn click_close_tab_button(&self) -> PilotResult<()> {
        click_named(&self.node, "closeButton")
    }

    /// Block until the view is gone
    pub fn wait_until_destroyed(&self) -> PilotResult<()> {
        self.node.wait_until_destroyed()
    }
}

impl DialogSurface for SadTab {
    fn surface(&self) -> &UiNode {
        &self.node
    }

    fn dismiss(&self) -> PilotResult<()> {
        self.click_close_tab_button()
    }
}
