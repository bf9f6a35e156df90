use super::{click, emulator, Emulator};
use crate::matcher::is_true;
use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;
use crate::wait::{eventually_with, WaitOptions};

/// Content of an empty tab: top sites and bookmarks grouped by folder
#[derive(Debug, Clone)]
pub struct NewTabView {
    node: UiNode,
}

emulator!(NewTabView, "NewTabView");

impl NewTabView {
    /// Folder delegates, default folder first
    pub fn folders(&self) -> PilotResult<Vec<BookmarksFolder>> {
        self.node.select_many_as(Query::any().visible())
    }

    /// Folder named `name` (`""` is the default folder)
    pub fn folder(&self, name: &str) -> PilotResult<BookmarksFolder> {
        self.node
            .select_single_as(Query::any().with_property("folderName", name))
    }

    /// Bookmark for the configured homepage (always first in the default
    /// folder)
    pub fn homepage_bookmark(&self) -> PilotResult<UrlDelegate> {
        self.node.select_single_as(Query::named("homepageBookmark"))
    }

    /// Most visited sites
    pub fn top_sites(&self) -> PilotResult<Vec<UrlDelegate>> {
        let section = self.node.select_single(&Query::named("topSitesList"))?;
        section.select_many_as(Query::any().visible())
    }
}

/// A bookmarks folder in the new tab view
#[derive(Debug, Clone)]
pub struct BookmarksFolder {
    node: UiNode,
}

emulator!(BookmarksFolder, "BookmarksFolderDelegate");

impl BookmarksFolder {
    /// Folder name (`""` for the default folder)
    pub fn name(&self) -> PilotResult<String> {
        self.node.get("folderName")
    }

    /// Whether the folder shows its bookmarks
    pub fn expanded(&self) -> PilotResult<bool> {
        self.node.get("expanded")
    }

    /// Expand the folder by clicking its header; no-op when already open
    pub fn expand(&self) -> PilotResult<()> {
        if self.expanded()? {
            return Ok(());
        }
        click(&self.node.select_single(&Query::named("folderHeader"))?)?;
        let options = WaitOptions::from_config(self.node.session()?.config());
        eventually_with(&options, || self.expanded(), is_true()).map(|_| ())
    }

    /// Visible bookmark entries, excluding the homepage bookmark
    pub fn bookmarks(&self) -> PilotResult<Vec<UrlDelegate>> {
        self.node
            .select_many_as(Query::any().with_name("bookmarkDelegate").visible())
    }
}

/// A URL entry (bookmark or top site)
#[derive(Debug, Clone)]
pub struct UrlDelegate {
    node: UiNode,
}

emulator!(UrlDelegate, "UrlDelegate");

impl UrlDelegate {
    /// Target URL
    pub fn url(&self) -> PilotResult<String> {
        self.node.get("url")
    }

    /// Title
    pub fn title(&self) -> PilotResult<String> {
        self.node.get("title")
    }

    /// Open the entry
    pub fn click(&self) -> PilotResult<()> {
        click(self.node())
    }
}
