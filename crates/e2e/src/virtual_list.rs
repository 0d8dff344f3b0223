//! Item resolution inside virtualized lists
//!
//! A virtualized list only materializes the rows inside its scrolled window.
//! [`VirtualListNavigator::locate`] rewinds the list, then alternates between
//! scanning the window and paging forward until the label shows up or the
//! end-of-list sentinel has been materialized.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use vstester_common::{AutomationHandle, Error, Key, Locator, Node, Result};

pub(crate) const ROW_CLASS: &str = "monaco-list-row";
pub(crate) const LABEL_ATTR: &str = "aria-label";
pub(crate) const LEVEL_ATTR: &str = "aria-level";
pub(crate) const LAST_ATTR: &str = "data-last-element";

/// One materialized row of a virtualized list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub node: Node,
    pub label: String,
    /// Depth in the tree, 1 for direct children of the root
    pub level: u32,
    /// Set only on the true last row, once scrolling has reached it
    pub last: bool,
}

/// A scrollable container whose rows materialize one window at a time.
#[async_trait]
pub trait VirtualContainer: Send + Sync {
    /// Rows currently materialized, in display order.
    async fn rows(&self) -> Result<Vec<ListRow>>;

    async fn scroll_to_top(&self) -> Result<()>;

    /// Advance the window by one page.
    async fn page_forward(&self) -> Result<()>;
}

pub struct VirtualListNavigator;

impl VirtualListNavigator {
    /// Find the row labelled `label` anywhere in `container`.
    ///
    /// `max_level` of 0 accepts any depth; otherwise only rows at depth
    /// `<= max_level` match, which is how duplicate labels at different depths
    /// are told apart. Returns `None` only after the sentinel row has been seen
    /// (or the list materializes nothing at all). There is no page cap: the
    /// loop is bounded by the real length of the list.
    ///
    /// Leaves the container scrolled to wherever the search stopped.
    pub async fn locate<C>(container: &C, label: &str, max_level: u32) -> Result<Option<ListRow>>
    where
        C: VirtualContainer + ?Sized,
    {
        container.scroll_to_top().await?;
        let mut pages = 0usize;

        loop {
            let rows = container.rows().await?;

            if let Some(row) = rows
                .iter()
                .find(|r| r.label == label && (max_level == 0 || r.level <= max_level))
            {
                debug!("Located '{}' at level {} after {} page(s)", label, row.level, pages);
                return Ok(Some(row.clone()));
            }

            if rows.is_empty() || rows.iter().any(|r| r.last) {
                debug!("'{}' not in list, end reached after {} page(s)", label, pages);
                return Ok(None);
            }

            container.page_forward().await?;
            pages += 1;
        }
    }
}

/// The `monaco-list` body of a section, driven through an automation handle.
#[derive(Clone)]
pub struct ListBody {
    automation: Arc<dyn AutomationHandle>,
    node: Node,
}

impl ListBody {
    pub fn new(automation: Arc<dyn AutomationHandle>, node: Node) -> Self {
        Self { automation, node }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    async fn read_row(&self, node: Node) -> Result<ListRow> {
        let label = self
            .automation
            .get_attribute(&node, LABEL_ATTR)
            .await?
            .unwrap_or_default();
        let level = match self.automation.get_attribute(&node, LEVEL_ATTR).await? {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                Error::Automation(format!("row {} has non-numeric {}: {}", node, LEVEL_ATTR, raw))
            })?,
            None => 1,
        };
        let last = self.automation.get_attribute(&node, LAST_ATTR).await?.as_deref() == Some("true");

        Ok(ListRow {
            node,
            label,
            level,
            last,
        })
    }
}

#[async_trait]
impl VirtualContainer for ListBody {
    async fn rows(&self) -> Result<Vec<ListRow>> {
        let nodes = self
            .automation
            .find_nodes(Some(&self.node), &Locator::class(ROW_CLASS))
            .await?;

        let mut rows = Vec::with_capacity(nodes.len());
        for node in nodes {
            rows.push(self.read_row(node).await?);
        }
        Ok(rows)
    }

    async fn scroll_to_top(&self) -> Result<()> {
        self.automation.send_keys(&self.node, &Key::Home).await
    }

    async fn page_forward(&self) -> Result<()> {
        self.automation.send_keys(&self.node, &Key::PageDown).await
    }
}
