//! The automation seam
//!
//! [`AutomationHandle`] is the only way vstester touches the application
//! under test. Implementations wrap a concrete driver (WebDriver, CDP, an
//! accessibility bridge); vstester itself never performs protocol I/O.
//! Handles are stateless between calls: every read re-queries the live UI.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::locator::Locator;

/// Opaque reference to a node in the application's DOM/accessibility tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node(String);

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Node(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Control,
    Meta,
    Shift,
    Alt,
}

impl Modifier {
    /// The primary shortcut modifier of the host platform.
    pub fn platform() -> Self {
        if cfg!(target_os = "macos") {
            Modifier::Meta
        } else {
            Modifier::Control
        }
    }
}

/// Synthetic input sent to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    Escape,
    Text(String),
    Chord(Modifier, char),
}

impl Key {
    pub fn select_all() -> Self {
        Key::Chord(Modifier::platform(), 'a')
    }

    pub fn copy() -> Self {
        Key::Chord(Modifier::platform(), 'c')
    }
}

/// Driver operations the page objects are layered on.
#[async_trait]
pub trait AutomationHandle: Send + Sync {
    /// Find every node matching `locator`, searching below `scope` when given
    /// and from the document root otherwise.
    async fn find_nodes(&self, scope: Option<&Node>, locator: &Locator) -> Result<Vec<Node>>;

    async fn get_attribute(&self, node: &Node, name: &str) -> Result<Option<String>>;

    async fn get_text(&self, node: &Node) -> Result<String>;

    async fn click(&self, node: &Node) -> Result<()>;

    async fn send_keys(&self, node: &Node, keys: &Key) -> Result<()>;

    async fn is_displayed(&self, node: &Node) -> Result<bool>;

    async fn read_clipboard(&self) -> Result<String>;

    /// First match of `locator`, or [`Error::ElementNotFound`].
    async fn find_node(&self, scope: Option<&Node>, locator: &Locator) -> Result<Node> {
        self.find_nodes(scope, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ElementNotFound(locator.to_string()))
    }

    /// Whether the node's `class` attribute contains `class` as a whole word.
    async fn has_class(&self, node: &Node, class: &str) -> Result<bool> {
        let classes = self.get_attribute(node, "class").await?.unwrap_or_default();
        Ok(classes.split_whitespace().any(|c| c == class))
    }
}
