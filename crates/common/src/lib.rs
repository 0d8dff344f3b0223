//! vstester Common Library
//!
//! Shared types for driving a workbench application under test: the error
//! taxonomy, session configuration, opaque locators and the
//! [`AutomationHandle`] seam every page object is built on.

pub mod automation;
pub mod config;
pub mod error;
pub mod locator;
pub mod wait;

// Re-export commonly used types
pub use automation::{AutomationHandle, Key, Modifier, Node};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use locator::Locator;
pub use wait::{wait_for_attribute_value, wait_until, wait_until_hidden};

/// vstester version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
