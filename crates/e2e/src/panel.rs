//! Bottom bar panels with a channel selector and a text area

use std::sync::Arc;
use std::time::Duration;

use vstester_common::{wait_until_hidden, AutomationHandle, Error, Key, Locator, Node, Result};

const WORKBENCH_CLASS: &str = "monaco-workbench";
const CONTEXT_VIEW_CLASS: &str = "context-view";
const ROW_CLASS: &str = "monaco-list-row";

/// A panel whose content is switched between named channels, such as the
/// Output panel.
#[derive(Clone)]
pub struct OutputPanel {
    automation: Arc<dyn AutomationHandle>,
    root: Locator,
    actions_label: String,
    wait_timeout: Duration,
}

impl OutputPanel {
    pub fn new(
        automation: Arc<dyn AutomationHandle>,
        root: Locator,
        actions_label: impl Into<String>,
    ) -> Self {
        Self {
            automation,
            root,
            actions_label: actions_label.into(),
            wait_timeout: Duration::from_secs(1),
        }
    }

    /// The workbench Output panel.
    pub fn output(automation: Arc<dyn AutomationHandle>) -> Self {
        Self::new(
            automation,
            Locator::attribute("id", "workbench.panel.output"),
            "Output actions",
        )
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    async fn node(&self) -> Result<Node> {
        self.automation.find_node(None, &self.root).await
    }

    async fn actions_bar(&self) -> Result<Node> {
        let root = self.node().await?;
        self.automation
            .find_node(Some(&root), &Locator::attribute("aria-label", self.actions_label.clone()))
            .await
    }

    /// Names of all selectable (enabled) channels.
    pub async fn channel_names(&self) -> Result<Vec<String>> {
        let bar = self.actions_bar().await?;
        let mut names = Vec::new();
        for option in self.automation.find_nodes(Some(&bar), &Locator::tag("option")).await? {
            if self.automation.get_attribute(&option, "disabled").await?.is_some() {
                continue;
            }
            if let Some(value) = self.automation.get_attribute(&option, "value").await? {
                names.push(value);
            }
        }
        Ok(names)
    }

    /// Pick `name` from the channel combo.
    pub async fn select_channel(&self, name: &str) -> Result<()> {
        let root = self.node().await?;
        let combo = self.automation.find_node(Some(&root), &Locator::tag("select")).await?;
        let workbench = self
            .automation
            .find_node(None, &Locator::class(WORKBENCH_CLASS))
            .await?;
        let menu = self
            .automation
            .find_node(Some(&workbench), &Locator::class(CONTEXT_VIEW_CLASS))
            .await?;

        // a menu left open by an earlier interaction swallows the next click
        if self.automation.is_displayed(&menu).await? {
            self.automation.click(&combo).await?;
            wait_until_hidden(self.automation.as_ref(), &menu, self.wait_timeout).await?;
        }
        self.automation.click(&combo).await?;

        for row in self.automation.find_nodes(Some(&menu), &Locator::class(ROW_CLASS)).await? {
            if self.automation.has_class(&row, "disabled").await? {
                continue;
            }
            let text_node = self
                .automation
                .find_node(Some(&row), &Locator::class("option-text"))
                .await?;
            if self.automation.get_text(&text_node).await? == name {
                return self.automation.click(&row).await;
            }
        }
        Err(Error::ItemNotFound(name.to_string()))
    }

    /// All text of the current channel, read through the clipboard.
    pub async fn text(&self) -> Result<String> {
        let root = self.node().await?;
        let textarea = self.automation.find_node(Some(&root), &Locator::tag("textarea")).await?;
        self.automation.send_keys(&textarea, &Key::select_all()).await?;
        self.automation.send_keys(&textarea, &Key::copy()).await?;
        let text = self.automation.read_clipboard().await?;
        self.automation.click(&textarea).await?;
        Ok(text)
    }

    pub async fn clear_text(&self) -> Result<()> {
        let bar = self.actions_bar().await?;
        let clear = self
            .automation
            .find_node(Some(&bar), &Locator::class("clear-output"))
            .await?;
        self.automation.click(&clear).await
    }
}
