use super::{click, click_named, emulator, Emulator};
use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;

/// Settings page
#[derive(Debug, Clone)]
pub struct SettingsPage {
    node: UiNode,
}

emulator!(SettingsPage, "SettingsPage", "settingsPage");

impl SettingsPage {
    /// Every entry, in display order
    pub fn entries(&self) -> PilotResult<Vec<UiNode>> {
        self.node
            .select_many(&Query::of_type("SettingsListItem").visible())
    }

    /// Entry by object name (`searchengine`, `homepage`, `restoreSession`, ...)
    pub fn entry(&self, name: &str) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("SettingsListItem").with_name(name))
    }

    /// Current homepage
    pub fn homepage(&self) -> PilotResult<String> {
        self.entry("homepage")?.get("subText")
    }

    /// Current search engine name
    pub fn search_engine(&self) -> PilotResult<String> {
        self.entry("searchengine")?.get("subText")
    }

    /// Change the homepage through its edit dialog
    pub fn set_homepage(&self, url: &str) -> PilotResult<()> {
        click(&self.entry("homepage")?)?;
        let session = self.node.session()?;
        let dialog = session.wait_select_single(&Query::named("homepageDialog"))?;
        let field = dialog.select_single(&Query::of_type("TextField"))?;
        session.pointer().click_object(&field)?;
        for _ in 0..field.text()?.chars().count() {
            session.keyboard().press_key("Backspace")?;
        }
        session.keyboard().type_text(url)?;
        click_named(&dialog, "homepageDialog.saveButton")?;
        dialog.wait_until_destroyed()
    }

    /// Leave settings
    pub fn click_back(&self) -> PilotResult<()> {
        click_named(self.node(), "settingsBackButton")?;
        self.node.wait_until_destroyed()
    }
}
