//! Context menus.
//!
//! Wide layouts show a popover next to the pointer; narrow layouts show a
//! modal sheet with an explicit cancel entry. Both hang their entries off
//! `Empty` items named `<action>_item`, so [`ContextMenu::click_action`]
//! works the same way for either. Only [`ContextMenu::dismiss`] differs:
//! the popover is dismissed by clicking on the page beside it.

use super::click;
use crate::input::MouseButton;
use crate::node::UiNode;
use crate::query::Query;
use crate::result::{PilotError, PilotResult};

/// Which implementation is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuLayout {
    /// Popover (tablet/desktop)
    Wide,
    /// Modal sheet (phone)
    Narrow,
}

impl MenuLayout {
    /// Layout used by a window with the given `wide` flag
    #[must_use]
    pub const fn for_window(wide: bool) -> Self {
        if wide {
            Self::Wide
        } else {
            Self::Narrow
        }
    }

    const fn object_name(self) -> &'static str {
        match self {
            Self::Wide => "contextMenuWide",
            Self::Narrow => "contextMenuMobile",
        }
    }
}

/// An open context menu
#[derive(Debug, Clone)]
pub struct ContextMenu {
    node: UiNode,
    layout: MenuLayout,
    webview: UiNode,
}

impl ContextMenu {
    pub(crate) fn new(node: UiNode, wide: bool, webview: UiNode) -> Self {
        Self {
            node,
            layout: MenuLayout::for_window(wide),
            webview,
        }
    }

    /// Wait for the menu hanging off `window`
    pub(crate) fn wait_for(window: &UiNode, wide: bool, webview: UiNode) -> PilotResult<Self> {
        let node = window.wait_select_single(&Self::query_for(wide))?;
        Ok(Self::new(node, wide, webview))
    }

    /// Open the menu over `webview`: long-press on touch devices, right
    /// click otherwise
    pub(crate) fn open(window: &UiNode, wide: bool, webview: UiNode) -> PilotResult<Self> {
        let session = window.session()?;
        let pointer = session.pointer();
        if session.device_class().is_touch() {
            pointer.long_press_object(&webview)?;
        } else {
            pointer.move_to(&webview)?;
            pointer.click_button(MouseButton::Right)?;
        }
        Self::wait_for(window, wide, webview)
    }

    /// Query selecting the menu for a window layout
    #[must_use]
    pub fn query_for(wide: bool) -> Query {
        Query::named(MenuLayout::for_window(wide).object_name())
    }

    /// Root node
    #[must_use]
    pub const fn node(&self) -> &UiNode {
        &self.node
    }

    /// Layout variant
    #[must_use]
    pub const fn layout(&self) -> MenuLayout {
        self.layout
    }

    /// Header label: the link URL, or a `data:` URI for images. Hidden
    /// for text selections.
    pub fn title_label(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("Label").with_name("titleLabel"))
    }

    /// Visible entries, top to bottom
    pub fn visible_actions(&self) -> PilotResult<Vec<UiNode>> {
        let mut keyed = Vec::new();
        for action in self.node.select_many(&Query::of_type("Empty").visible())? {
            keyed.push((action.global_rect()?.y, action));
        }
        keyed.sort_by_key(|(y, _)| *y);
        Ok(keyed.into_iter().map(|(_, a)| a).collect())
    }

    /// Entry for `name`, e.g. `OpenImageInNewTabContextualAction`
    pub fn action(&self, name: &str) -> PilotResult<UiNode> {
        self.node.select_single(
            &Query::of_type("Empty")
                .with_name(format!("{name}_item"))
                .visible()
                .enabled(),
        )
    }

    /// Click an entry and wait for the menu to close
    pub fn click_action(&self, name: &str) -> PilotResult<()> {
        click(&self.action(name)?)?;
        self.node.wait_until_destroyed()
    }

    /// Close the menu without choosing anything
    pub fn dismiss(&self) -> PilotResult<()> {
        match self.layout {
            MenuLayout::Wide => {
                let actions = self.visible_actions()?;
                let first = actions.first().ok_or_else(|| PilotError::NotFound {
                    query: Query::of_type("Empty").visible().to_selector(),
                })?;
                let page = self.webview.global_rect()?;
                let x = (page.x + first.global_rect()?.x) / 2;
                let y = page.center().y;
                let session = self.node.session()?;
                session.pointer().move_xy(x, y)?;
                session.pointer().click()?;
            }
            MenuLayout::Narrow => click(&self.action("cancelAction")?)?,
        }
        self.node.wait_until_destroyed()
    }
}
