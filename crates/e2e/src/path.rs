//! Hierarchical path resolution
//!
//! Opens a nested item by descending through labels one level at a time.
//! Each step collapses the item if a previous navigation left it expanded,
//! selects it, and looks for the next label among the children that
//! selecting produced.

use async_trait::async_trait;
use tracing::debug;

use vstester_common::{Error, Result};

/// An item that can take part in path resolution.
#[async_trait]
pub trait PathNode: Sized + Send + Sync {
    fn label(&self) -> &str;

    async fn has_children(&self) -> Result<bool>;

    async fn is_expanded(&self) -> Result<bool>;

    async fn collapse(&self) -> Result<()>;

    /// Activate the item and return its immediate children, empty for a leaf.
    async fn select(&self) -> Result<Vec<Self>>;
}

/// Where a path starts.
#[async_trait]
pub trait PathRoot: Send + Sync {
    type Item: PathNode;

    /// Find a direct child of the root, never searching deeper.
    async fn find_top_level(&self, label: &str) -> Result<Option<Self::Item>>;
}

pub struct PathResolver;

impl PathResolver {
    /// Resolve `labels` below `root` and return the children of the last item.
    ///
    /// A leaf met before the path is consumed ends resolution early with an
    /// empty result; the remaining labels are ignored. A label that cannot be
    /// matched fails with [`Error::ItemNotFound`] naming that label.
    pub async fn open_path<R, S>(root: &R, labels: &[S]) -> Result<Vec<R::Item>>
    where
        R: PathRoot + ?Sized,
        S: AsRef<str> + Sync,
    {
        let first = labels.first().ok_or(Error::EmptyPath)?;
        let mut current = root.find_top_level(first.as_ref()).await?;
        let mut index = 0;

        loop {
            let label = labels[index].as_ref();
            let item = current.ok_or_else(|| Error::ItemNotFound(label.to_string()))?;

            if item.has_children().await? && item.is_expanded().await? {
                item.collapse().await?;
            }

            let children = item.select().await?;
            if children.is_empty() {
                debug!("'{}' is a leaf, stopping at segment {}", label, index);
                return Ok(children);
            }

            index += 1;
            let Some(next) = labels.get(index) else {
                return Ok(children);
            };
            current = children.into_iter().find(|c| c.label() == next.as_ref());
        }
    }
}
