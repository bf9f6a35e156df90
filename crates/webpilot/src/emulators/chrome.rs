use super::{click, click_named, emulator, AddressBar};
use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;
use crate::value::Color;

/// Navigation toolbar
#[derive(Debug, Clone)]
pub struct Chrome {
    node: UiNode,
}

emulator!(Chrome, "Chrome");

impl Chrome {
    fn chrome_button(&self, name: &str) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("ChromeButton").with_name(name))
    }

    /// Back button
    pub fn back_button(&self) -> PilotResult<UiNode> {
        self.chrome_button("backButton")
    }

    /// Forward button
    pub fn forward_button(&self) -> PilotResult<UiNode> {
        self.chrome_button("forwardButton")
    }

    /// Reload button
    pub fn reload_button(&self) -> PilotResult<UiNode> {
        self.chrome_button("reloadButton")
    }

    /// Drawer (overflow menu) button
    pub fn drawer_button(&self) -> PilotResult<UiNode> {
        self.chrome_button("drawerButton")
    }

    /// Tabs overview button (wide layout only)
    pub fn tabs_button(&self) -> PilotResult<UiNode> {
        self.chrome_button("tabsButton")
    }

    /// Go back
    pub fn click_back_button(&self) -> PilotResult<()> {
        click(&self.back_button()?)
    }

    /// Go forward
    pub fn click_forward_button(&self) -> PilotResult<()> {
        click(&self.forward_button()?)
    }

    /// Reload the page
    pub fn click_reload_button(&self) -> PilotResult<()> {
        click(&self.reload_button()?)
    }

    /// Open the tabs overview
    pub fn click_tabs_button(&self) -> PilotResult<()> {
        click(&self.tabs_button()?)
    }

    /// Address bar inside this chrome
    pub fn address_bar(&self) -> PilotResult<AddressBar> {
        self.node.select_single_as(Query::named("addressBar"))
    }

    /// Toggle the bookmark state of the current page
    pub fn toggle_bookmark(&self) -> PilotResult<()> {
        self.address_bar()?.click_bookmark_toggle()
    }

    /// Whether the current page is bookmarked
    pub fn bookmarked(&self) -> PilotResult<bool> {
        self.node.get("bookmarked")
    }

    /// Toolbar background color (follows the page's theme color)
    pub fn background_color(&self) -> PilotResult<Color> {
        self.node.get("backgroundColor")
    }

    /// Open the drawer menu
    pub fn open_drawer(&self) -> PilotResult<Drawer> {
        click(&self.drawer_button()?)?;
        self.node.wait_select_single_as(Query::named("drawer"))
    }
}

/// Overflow menu opened from the chrome
#[derive(Debug, Clone)]
pub struct Drawer {
    node: UiNode,
}

emulator!(Drawer, "Drawer");

impl Drawer {
    /// Action entries, in display order
    pub fn actions(&self) -> PilotResult<Vec<UiNode>> {
        self.node
            .select_many(&Query::of_type("DrawerAction").visible())
    }

    /// Click the action named `name` (`history`, `settings`, `newtab`, ...).
    /// The drawer closes afterwards.
    pub fn click_action(&self, name: &str) -> PilotResult<()> {
        click_named(&self.node, name)?;
        self.node.wait_until_destroyed()
    }
}
