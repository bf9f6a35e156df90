use super::{click, click_named, emulator};
use crate::node::UiNode;
use crate::query::Query;
use crate::result::PilotResult;

/// Browsing history, grouped by domain
#[derive(Debug, Clone)]
pub struct HistoryView {
    node: UiNode,
}

emulator!(HistoryView, "HistoryView", "historyView");

impl HistoryView {
    /// Domain entries, most recently visited first
    pub fn domains(&self) -> PilotResult<Vec<HistoryDomain>> {
        let mut keyed = Vec::new();
        for node in self
            .node
            .select_many(&Query::of_type("HistoryDomainDelegate").visible())?
        {
            keyed.push((node.global_rect()?.y, node));
        }
        keyed.sort_by_key(|(y, _)| *y);
        Ok(keyed.into_iter().map(|(_, node)| HistoryDomain { node }).collect())
    }

    /// Close the view
    pub fn click_done(&self) -> PilotResult<()> {
        click_named(&self.node, "doneButton")?;
        self.node.wait_until_destroyed()
    }
}

/// One domain in the history view
#[derive(Debug, Clone)]
pub struct HistoryDomain {
    node: UiNode,
}

emulator!(HistoryDomain, "HistoryDomainDelegate");

impl HistoryDomain {
    /// Domain name
    pub fn domain(&self) -> PilotResult<String> {
        self.node.get("domain")
    }

    /// Number of history entries under the domain
    pub fn entry_count(&self) -> PilotResult<i64> {
        self.node.get("count")
    }

    /// Open the domain's most recent URL
    pub fn click(&self) -> PilotResult<()> {
        click(&self.node)
    }
}
