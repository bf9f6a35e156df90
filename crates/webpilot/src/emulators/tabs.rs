use super::{click, click_named, emulator, Emulator};
use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;

/// Tabs overview
#[derive(Debug, Clone)]
pub struct TabsView {
    node: UiNode,
}

emulator!(TabsView, "TabsView");

impl TabsView {
    /// Open tab previews, left to right
    pub fn previews(&self) -> PilotResult<Vec<TabPreview>> {
        let mut keyed = Vec::new();
        for node in self
            .node
            .select_many(&Query::of_type("PageDelegate").with_name("openTabDelegate"))?
        {
            keyed.push((node.global_rect()?.x, node));
        }
        keyed.sort_by_key(|(x, _)| *x);
        Ok(keyed
            .into_iter()
            .map(|(_, node)| TabPreview::from_node(node))
            .collect())
    }

    /// Number of open tabs
    pub fn count(&self) -> PilotResult<usize> {
        Ok(self.previews()?.len())
    }

    /// The "new tab" tile
    pub fn new_tab_delegate(&self) -> PilotResult<UiNode> {
        self.node.select_single(&Query::named("newTabDelegate"))
    }

    /// Open a new tab and leave the overview
    pub fn click_new_tab(&self) -> PilotResult<()> {
        click(&self.new_tab_delegate()?)?;
        self.node.wait_until_destroyed()
    }

    /// Close the overview
    pub fn click_done(&self) -> PilotResult<()> {
        click_named(&self.node, "doneButton")?;
        self.node.wait_until_destroyed()
    }
}

/// Preview tile of one open tab
#[derive(Debug, Clone)]
pub struct TabPreview {
    node: UiNode,
}

emulator!(TabPreview, "PageDelegate", "openTabDelegate");

impl TabPreview {
    /// Tab title
    pub fn title(&self) -> PilotResult<String> {
        self.node.get("title")
    }

    /// Tab URL
    pub fn url(&self) -> PilotResult<String> {
        self.node.get("url")
    }

    /// Switch to this tab
    pub fn select(&self) -> PilotResult<()> {
        click(&self.node)
    }

    /// Close this tab
    pub fn close(&self) -> PilotResult<()> {
        click_named(&self.node, "closeButton")
    }
}
