//! Collapsible sections of the side bar

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use vstester_common::{wait_for_attribute_value, AutomationHandle, Error, Locator, Node, Result};

use crate::path::{PathResolver, PathRoot};
use crate::tree_item::{Ancestry, TreeItem};
use crate::virtual_list::{ListBody, VirtualContainer, VirtualListNavigator};

const VIEW_CLASS: &str = "split-view-view";
const HEADER_CLASS: &str = "panel-header";
const LIST_CLASS: &str = "monaco-list";
const ACTIONS_CLASS: &str = "actions";

/// Header states. A hidden header is distinct from a collapsed one: some
/// sections never show a header, and expanding or collapsing them is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderState {
    Hidden,
    Collapsed,
    Expanded,
}

/// A side bar section, found by its (case-insensitive) title.
#[derive(Clone)]
pub struct Section {
    title: String,
    automation: Arc<dyn AutomationHandle>,
    wait_timeout: Duration,
}

impl Section {
    pub fn new(automation: Arc<dyn AutomationHandle>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            automation,
            wait_timeout: Duration::from_secs(1),
        }
    }

    /// Timeout for header and tree item expand/collapse waits.
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn automation(&self) -> &Arc<dyn AutomationHandle> {
        &self.automation
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    pub async fn node(&self) -> Result<Node> {
        let wanted = self.title.to_lowercase();
        let views = self.automation.find_nodes(None, &Locator::class(VIEW_CLASS)).await?;

        for view in views {
            for heading in self.automation.find_nodes(Some(&view), &Locator::tag("h3")).await? {
                if self.automation.get_text(&heading).await?.trim().to_lowercase() == wanted {
                    return Ok(view);
                }
            }
        }
        Err(Error::ElementNotFound(format!("section '{}'", self.title)))
    }

    async fn header(&self) -> Result<Node> {
        let node = self.node().await?;
        self.automation.find_node(Some(&node), &Locator::class(HEADER_CLASS)).await
    }

    pub async fn header_state(&self) -> Result<HeaderState> {
        let header = self.header().await?;
        self.state_of(&header).await
    }

    async fn state_of(&self, header: &Node) -> Result<HeaderState> {
        if self.automation.has_class(header, "hidden").await? {
            return Ok(HeaderState::Hidden);
        }
        match self.automation.get_attribute(header, "aria-expanded").await?.as_deref() {
            Some("true") => Ok(HeaderState::Expanded),
            _ => Ok(HeaderState::Collapsed),
        }
    }

    pub async fn is_expanded(&self) -> Result<bool> {
        Ok(self.header_state().await? == HeaderState::Expanded)
    }

    pub async fn expand(&self) -> Result<()> {
        self.toggle_to(HeaderState::Expanded).await
    }

    pub async fn collapse(&self) -> Result<()> {
        self.toggle_to(HeaderState::Collapsed).await
    }

    async fn toggle_to(&self, target: HeaderState) -> Result<()> {
        let header = self.header().await?;
        let state = self.state_of(&header).await?;
        if state == HeaderState::Hidden || state == target {
            return Ok(());
        }

        debug!("Section '{}': {:?} -> {:?}", self.title, state, target);
        self.automation.click(&header).await?;
        let want = if target == HeaderState::Expanded { "true" } else { "false" };
        wait_for_attribute_value(
            self.automation.as_ref(),
            &header,
            "aria-expanded",
            want,
            self.wait_timeout,
        )
        .await
    }

    /// The virtualized list holding this section's items.
    pub async fn body(&self) -> Result<ListBody> {
        let node = self.node().await?;
        let list = self.automation.find_node(Some(&node), &Locator::class(LIST_CLASS)).await?;
        Ok(ListBody::new(self.automation.clone(), list))
    }

    /// Items inside the current scroll window only.
    pub async fn visible_items(&self) -> Result<Vec<TreeItem>> {
        let rows = self.body().await?.rows().await?;
        let mut ancestry = Ancestry::default();
        Ok(rows
            .into_iter()
            .map(|r| {
                ancestry.visit(&r);
                TreeItem::with_ancestors(self.clone(), r.label, ancestry.parents())
            })
            .collect())
    }

    /// Find an item by label, scrolling through all expanded content.
    ///
    /// Not a recursive search: collapsed subtrees are never opened. `max_level`
    /// limits how deep into expanded items a match may sit (0 = unlimited).
    pub async fn find_item(&self, label: &str, max_level: u32) -> Result<Option<TreeItem>> {
        self.expand().await?;
        let body = self.body().await?;
        let Some(found) = VirtualListNavigator::locate(&body, label, max_level).await? else {
            return Ok(None);
        };

        // enclosing labels visible above the match
        let mut ancestry = Ancestry::default();
        for row in body.rows().await? {
            ancestry.visit(&row);
            if row.node == found.node {
                return Ok(Some(TreeItem::with_ancestors(self.clone(), row.label, ancestry.parents())));
            }
        }
        Ok(Some(TreeItem::new(self.clone(), found.label, found.level)))
    }

    /// Open the item at `path` and return its children.
    ///
    /// e.g. `open_item(&["folder", "file"])` opens `file` inside `folder`.
    /// The first label is only looked up among top-level items. A leaf in the
    /// middle of the path ends resolution with an empty result.
    pub async fn open_item<S>(&self, path: &[S]) -> Result<Vec<TreeItem>>
    where
        S: AsRef<str> + Sync,
    {
        PathResolver::open_path(self, path).await
    }

    /// Action buttons on the header; none when the header is hidden.
    pub async fn actions(&self) -> Result<Vec<HeaderAction>> {
        let header = self.header().await?;
        if self.state_of(&header).await? == HeaderState::Hidden {
            return Ok(Vec::new());
        }

        let mut actions = Vec::new();
        for button in self.action_buttons(&header).await? {
            if let Some(title) = self.automation.get_attribute(&button, "title").await? {
                actions.push(HeaderAction::new(self.clone(), title));
            }
        }
        Ok(actions)
    }

    pub fn action(&self, label: impl Into<String>) -> HeaderAction {
        HeaderAction::new(self.clone(), label)
    }

    async fn action_buttons(&self, header: &Node) -> Result<Vec<Node>> {
        let bar = self.automation.find_node(Some(header), &Locator::class(ACTIONS_CLASS)).await?;
        self.automation
            .find_nodes(Some(&bar), &Locator::attribute("role", "button"))
            .await
    }
}

#[async_trait]
impl PathRoot for Section {
    type Item = TreeItem;

    async fn find_top_level(&self, label: &str) -> Result<Option<TreeItem>> {
        self.find_item(label, 1).await
    }
}

/// A button on a section header, addressed by its title.
#[derive(Clone)]
pub struct HeaderAction {
    section: Section,
    label: String,
}

impl HeaderAction {
    fn new(section: Section, label: impl Into<String>) -> Self {
        Self {
            section,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn click(&self) -> Result<()> {
        let header = self.section.header().await?;
        let automation = self.section.automation();
        for button in self.section.action_buttons(&header).await? {
            if automation.get_attribute(&button, "title").await?.as_deref() == Some(self.label.as_str()) {
                return automation.click(&button).await;
            }
        }
        Err(Error::ElementNotFound(format!(
            "action '{}' on section '{}'",
            self.label,
            self.section.title()
        )))
    }
}
