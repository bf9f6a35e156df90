use super::{click, emulator, Emulator};
use crate::matcher::{equals, is_true};
use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;
use crate::wait::{eventually_with, WaitOptions};

/// URL entry field with its clear, action and bookmark buttons
#[derive(Debug, Clone)]
pub struct AddressBar {
    node: UiNode,
}

emulator!(AddressBar, "AddressBar", "addressBar");

impl AddressBar {
    fn options(&self) -> PilotResult<WaitOptions> {
        Ok(WaitOptions::from_config(self.node.session()?.config()))
    }

    /// The editable text field
    pub fn text_field(&self) -> PilotResult<UiNode> {
        self.node.select_single(&Query::of_type("TextField"))
    }

    /// Clear button (only visible while there is text to clear)
    pub fn clear_button(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("AbstractButton").with_name("clearButton"))
    }

    /// Reload/stop/go button at the start of the field
    pub fn action_button(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("QQuickMouseArea").with_name("actionButton"))
    }

    /// Bookmark star
    pub fn bookmark_toggle(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("QQuickMouseArea").with_name("bookmarkToggle"))
    }

    /// Current text
    pub fn text(&self) -> PilotResult<String> {
        self.text_field()?.text()
    }

    /// Whether the field has keyboard focus
    pub fn has_focus(&self) -> PilotResult<bool> {
        self.text_field()?.get("activeFocus")
    }

    /// Whether the current page is bookmarked
    pub fn bookmarked(&self) -> PilotResult<bool> {
        self.node.get("bookmarked")
    }

    /// Click into the field and wait for it to take focus
    pub fn focus(&self) -> PilotResult<()> {
        let field = self.text_field()?;
        click(&field)?;
        eventually_with(&self.options()?, || field.get::<bool>("activeFocus"), is_true())
            .map(|_| ())
    }

    /// Empty the field with its clear button and wait until it is empty.
    /// A field that is already empty is left alone.
    pub fn clear(&self) -> PilotResult<()> {
        if self.text()?.is_empty() {
            return Ok(());
        }
        click(&self.clear_button()?)?;
        eventually_with(&self.options()?, || self.text(), equals("")).map(|_| ())
    }

    /// Type `text` into the (focused) field
    pub fn write(&self, text: &str) -> PilotResult<()> {
        self.node.session()?.keyboard().type_text(text)
    }

    /// Click the action button
    pub fn click_action_button(&self) -> PilotResult<()> {
        click(&self.action_button()?)
    }

    /// Click the bookmark star
    pub fn click_bookmark_toggle(&self) -> PilotResult<()> {
        click(&self.bookmark_toggle()?)
    }
}

/// Suggestion popup under the address bar
#[derive(Debug, Clone)]
pub struct Suggestions {
    node: UiNode,
}

emulator!(Suggestions, "Suggestions");

impl Suggestions {
    /// Whether the popup is showing
    pub fn visible(&self) -> PilotResult<bool> {
        self.node.visible()
    }

    /// Visible entries, top to bottom
    pub fn entries(&self) -> PilotResult<Vec<Suggestion>> {
        let list = self.node.select_single(&Query::of_type("QQuickListView"))?;
        list.select_many_as(Query::any().visible())
    }
}

/// One suggestion entry
#[derive(Debug, Clone)]
pub struct Suggestion {
    node: UiNode,
}

emulator!(Suggestion, "Base");

impl Suggestion {
    /// Title line
    pub fn title(&self) -> PilotResult<String> {
        self.node.get("title")
    }

    /// URL the entry navigates to
    pub fn url(&self) -> PilotResult<String> {
        self.node.get("url")
    }

    /// Navigate to the entry
    pub fn click(&self) -> PilotResult<()> {
        click(self.node())
    }
}
