use super::{click_named, emulator};
use crate::node::UiNode;
use crate::query::Query;
use crate::result::{PilotError, PilotResult};

/// Find-in-page bar
#[derive(Debug, Clone)]
pub struct FindInPageBar {
    node: UiNode,
}

emulator!(FindInPageBar, "FindInPageBar", "findInPageBar");

impl FindInPageBar {
    /// Search field
    pub fn text_field(&self) -> PilotResult<UiNode> {
        self.node
            .select_single(&Query::of_type("TextField").with_name("findInPageTextField"))
    }

    /// Type a search term into the (focused) field
    pub fn search(&self, term: &str) -> PilotResult<()> {
        let field = self.text_field()?;
        let session = field.session()?;
        session.pointer().click_object(&field)?;
        session.keyboard().type_text(term)
    }

    /// Counter label, e.g. `"1/3"`
    pub fn counter_text(&self) -> PilotResult<String> {
        self.node
            .select_single(&Query::named("findInPageCounter"))?
            .text()
    }

    /// `(current, total)` parsed from the counter label
    pub fn counter(&self) -> PilotResult<(u32, u32)> {
        let text = self.counter_text()?;
        let parsed = text
            .split_once('/')
            .and_then(|(cur, total)| Some((cur.trim().parse().ok()?, total.trim().parse().ok()?)));
        parsed.ok_or_else(|| PilotError::TypeMismatch {
            name: "findInPageCounter.text".into(),
            expected: "current/total",
            actual: text,
        })
    }

    /// Jump to the next match
    pub fn next(&self) -> PilotResult<()> {
        click_named(&self.node, "findNextButton")
    }

    /// Jump to the previous match
    pub fn previous(&self) -> PilotResult<()> {
        click_named(&self.node, "findPreviousButton")
    }

    /// Close the bar
    pub fn close(&self) -> PilotResult<()> {
        click_named(&self.node, "findInPageCloseButton")
    }
}
