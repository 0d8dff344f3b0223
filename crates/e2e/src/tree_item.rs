//! Items of a section's tree

use async_trait::async_trait;
use tracing::debug;

use vstester_common::{wait_for_attribute_value, Error, Locator, Node, Result};

use crate::path::PathNode;
use crate::section::Section;
use crate::virtual_list::{ListBody, ListRow, VirtualContainer};

const EXPANDED_ATTR: &str = "aria-expanded";
const TWISTIE_CLASS: &str = "monaco-tl-twistie";

/// Labels of the rows enclosing the row last visited, by depth.
///
/// Built by walking rows in display order. Ancestors that lie above the
/// first row walked are `None` and match any label.
#[derive(Debug, Clone, Default)]
pub(crate) struct Ancestry(Vec<Option<String>>);

impl Ancestry {
    pub(crate) fn visit(&mut self, row: &ListRow) {
        self.0.resize(row.level.saturating_sub(1) as usize, None);
        self.0.push(Some(row.label.clone()));
    }

    /// Enclosing labels of the last visited row, outermost first.
    pub(crate) fn parents(&self) -> Vec<Option<String>> {
        self.0[..self.0.len().saturating_sub(1)].to_vec()
    }

    fn matches(&self, label: &str, ancestors: &[Option<String>]) -> bool {
        let Some((Some(last), seen)) = self.0.split_last() else {
            return false;
        };
        last == label
            && seen.len() == ancestors.len()
            && seen.iter().zip(ancestors).all(|pair| match pair {
                (Some(a), Some(b)) => a == b,
                _ => true,
            })
    }
}

/// A row in a section's tree, identified by its label and the labels of the
/// items enclosing it.
///
/// Holds no node and no children: every call re-reads the section's
/// materialized rows, so an item never goes stale, it can only go missing.
/// Labels are unique only among a parent's immediate children, which is why
/// the enclosing labels are part of the identity.
#[derive(Clone)]
pub struct TreeItem {
    label: String,
    ancestors: Vec<Option<String>>,
    section: Section,
}

impl std::fmt::Debug for TreeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeItem")
            .field("label", &self.label)
            .field("ancestors", &self.ancestors)
            .field("section", &self.section.title())
            .finish()
    }
}

impl TreeItem {
    /// An item at `level` whose enclosing items are unknown.
    pub fn new(section: Section, label: impl Into<String>, level: u32) -> Self {
        Self::with_ancestors(section, label, vec![None; level.saturating_sub(1) as usize])
    }

    pub(crate) fn with_ancestors(
        section: Section,
        label: impl Into<String>,
        ancestors: Vec<Option<String>>,
    ) -> Self {
        Self {
            label: label.into(),
            ancestors,
            section,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn level(&self) -> u32 {
        self.ancestors.len() as u32 + 1
    }

    /// Labels of the enclosing items that were known when this item was
    /// found, outermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = Option<&str>> {
        self.ancestors.iter().map(|a| a.as_deref())
    }

    pub fn section(&self) -> &Section {
        &self.section
    }

    fn position_in(&self, rows: &[ListRow], ancestry: &mut Ancestry) -> Option<usize> {
        rows.iter().position(|row| {
            ancestry.visit(row);
            ancestry.matches(&self.label, &self.ancestors)
        })
    }

    /// The section's list, its materialized rows and this item's position
    /// among them. Walks the list from the top when the item is not in the
    /// current window.
    async fn locate_row(&self) -> Result<(ListBody, Vec<ListRow>, usize)> {
        let body = self.section.body().await?;
        let rows = body.rows().await?;
        if let Some(index) = self.position_in(&rows, &mut Ancestry::default()) {
            return Ok((body, rows, index));
        }

        body.scroll_to_top().await?;
        let mut ancestry = Ancestry::default();
        loop {
            let rows = body.rows().await?;
            if let Some(index) = self.position_in(&rows, &mut ancestry) {
                return Ok((body, rows, index));
            }
            if rows.is_empty() || rows.iter().any(|r| r.last) {
                return Err(Error::ElementNotFound(format!(
                    "tree item '{}' at level {}",
                    self.label,
                    self.level()
                )));
            }
            body.page_forward().await?;
        }
    }

    pub async fn node(&self) -> Result<Node> {
        let (_, mut rows, index) = self.locate_row().await?;
        Ok(rows.swap_remove(index).node)
    }

    /// Expandable items carry an `aria-expanded` attribute, leaves do not.
    pub async fn has_children(&self) -> Result<bool> {
        let node = self.node().await?;
        Ok(self.section.automation().get_attribute(&node, EXPANDED_ATTR).await?.is_some())
    }

    pub async fn is_expanded(&self) -> Result<bool> {
        let node = self.node().await?;
        Ok(self
            .section
            .automation()
            .get_attribute(&node, EXPANDED_ATTR)
            .await?
            .as_deref()
            == Some("true"))
    }

    pub async fn expand(&self) -> Result<()> {
        self.set_expanded(true).await
    }

    pub async fn collapse(&self) -> Result<()> {
        self.set_expanded(false).await
    }

    async fn set_expanded(&self, expanded: bool) -> Result<()> {
        let automation = self.section.automation();
        let node = self.node().await?;
        let Some(state) = automation.get_attribute(&node, EXPANDED_ATTR).await? else {
            return Ok(());
        };
        if (state == "true") == expanded {
            return Ok(());
        }

        let twistie = automation.find_node(Some(&node), &Locator::class(TWISTIE_CLASS)).await?;
        automation.click(&twistie).await?;

        let want = if expanded { "true" } else { "false" };
        wait_for_attribute_value(
            automation.as_ref(),
            &node,
            EXPANDED_ATTR,
            want,
            self.section.wait_timeout(),
        )
        .await
    }

    /// Click the item. Expandable items are waited on until expanded and
    /// their immediate children returned; leaves return nothing.
    pub async fn select(&self) -> Result<Vec<TreeItem>> {
        let automation = self.section.automation();
        let node = self.node().await?;
        automation.click(&node).await?;

        if automation.get_attribute(&node, EXPANDED_ATTR).await?.is_none() {
            return Ok(Vec::new());
        }

        wait_for_attribute_value(
            automation.as_ref(),
            &node,
            EXPANDED_ATTR,
            "true",
            self.section.wait_timeout(),
        )
        .await?;
        self.children().await
    }

    /// Immediate children shown below this item.
    ///
    /// Pages the list forward while the item's descendants run past the
    /// bottom of the window, so the list may be left scrolled.
    pub async fn children(&self) -> Result<Vec<TreeItem>> {
        let (body, mut rows, index) = self.locate_row().await?;
        let level = self.level();
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Some(self.label.clone()));

        let mut children = Vec::new();
        let mut start = index + 1;
        'pages: loop {
            for row in &rows[start..] {
                if row.level <= level {
                    break 'pages;
                }
                if row.level == level + 1 {
                    children.push(TreeItem::with_ancestors(
                        self.section.clone(),
                        row.label.clone(),
                        ancestors.clone(),
                    ));
                }
            }

            let Some(tail) = rows.last().cloned() else { break };
            if tail.last {
                break;
            }
            body.page_forward().await?;
            rows = body.rows().await?;
            start = rows
                .iter()
                .position(|r| r.node == tail.node && r.label == tail.label && r.level == tail.level)
                .map(|i| i + 1)
                .unwrap_or(0);
            if start >= rows.len() {
                // the window did not move
                break;
            }
        }

        debug!("'{}' has {} child(ren)", self.label, children.len());
        Ok(children)
    }
}

#[async_trait]
impl PathNode for TreeItem {
    fn label(&self) -> &str {
        &self.label
    }

    async fn has_children(&self) -> Result<bool> {
        TreeItem::has_children(self).await
    }

    async fn is_expanded(&self) -> Result<bool> {
        TreeItem::is_expanded(self).await
    }

    async fn collapse(&self) -> Result<()> {
        TreeItem::collapse(self).await
    }

    async fn select(&self) -> Result<Vec<Self>> {
        TreeItem::select(self).await
    }
}
