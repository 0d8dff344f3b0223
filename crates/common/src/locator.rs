//! Opaque element locators
//!
//! Locators are handed to the [`AutomationHandle`](crate::AutomationHandle)
//! untouched. Nothing in vstester parses or builds selector syntax; drivers
//! translate each variant into whatever their protocol understands.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Element carrying the given class name
    Class { value: String },

    /// Element with the given tag name
    Tag { value: String },

    /// Element whose attribute `name` equals `value`
    Attribute { name: String, value: String },

    /// Raw XPath expression, passed through to the driver
    XPath { value: String },

    /// Raw CSS selector, passed through to the driver
    Css { value: String },
}

impl Locator {
    pub fn class(value: impl Into<String>) -> Self {
        Locator::Class { value: value.into() }
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Locator::Tag { value: value.into() }
    }

    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Locator::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath { value: value.into() }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Locator::Css { value: value.into() }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Class { value } => write!(f, "class={}", value),
            Locator::Tag { value } => write!(f, "tag={}", value),
            Locator::Attribute { name, value } => write!(f, "[{}='{}']", name, value),
            Locator::XPath { value } => write!(f, "xpath={}", value),
            Locator::Css { value } => write!(f, "css={}", value),
        }
    }
}
