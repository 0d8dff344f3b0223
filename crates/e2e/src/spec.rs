//! Declarative YAML test specification

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use vstester_common::{Error, Result};

use crate::runner::TestCase;
use crate::session::SessionContext;

/// A complete test specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Overrides the runner's per-case timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

/// A single step in a test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Scroll a section looking for an item
    FindItem {
        section: String,
        label: String,
        #[serde(default)]
        max_level: u32,
        #[serde(default = "default_true")]
        expect_found: bool,
    },

    /// Open an item by path and optionally check the children it reveals
    OpenPath {
        section: String,
        path: Vec<String>,
        #[serde(default)]
        expect_children: Option<Vec<String>>,
    },

    ExpandSection {
        section: String,
    },

    CollapseSection {
        section: String,
    },

    /// Assert labels are present in the section's current scroll window
    AssertVisibleItems {
        section: String,
        contains: Vec<String>,
    },

    /// Click a button on a section header
    ClickAction {
        section: String,
        label: String,
    },

    /// Switch the Output panel to a channel
    SelectChannel {
        name: String,
    },

    /// Assert the Output panel's current text contains a string
    AssertOutput {
        contains: String,
    },

    ClearOutput,

    /// Wait for a fixed amount of time (use sparingly)
    Sleep {
        ms: u64,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

fn default_true() -> bool {
    true
}

impl TestStep {
    fn name(&self) -> String {
        match self {
            TestStep::FindItem { section, label, .. } => format!("find_item:{}/{}", section, label),
            TestStep::OpenPath { section, path, .. } => {
                format!("open_path:{}/{}", section, path.join("/"))
            }
            TestStep::ExpandSection { section } => format!("expand_section:{}", section),
            TestStep::CollapseSection { section } => format!("collapse_section:{}", section),
            TestStep::AssertVisibleItems { section, .. } => format!("assert_visible_items:{}", section),
            TestStep::ClickAction { section, label } => format!("click_action:{}/{}", section, label),
            TestStep::SelectChannel { name } => format!("select_channel:{}", name),
            TestStep::AssertOutput { .. } => "assert_output".to_string(),
            TestStep::ClearOutput => "clear_output".to_string(),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Log { message } => format!("log:{}", message.chars().take(30).collect::<String>()),
        }
    }

    async fn execute(&self, ctx: &SessionContext) -> Result<()> {
        match self {
            TestStep::FindItem {
                section,
                label,
                max_level,
                expect_found,
            } => {
                let found = ctx.section(section).find_item(label, *max_level).await?.is_some();
                if found != *expect_found {
                    return Err(Error::CaseFailed(format!(
                        "expected '{}' {}to be found in '{}'",
                        label,
                        if *expect_found { "" } else { "not " },
                        section
                    )));
                }
                Ok(())
            }
            TestStep::OpenPath {
                section,
                path,
                expect_children,
            } => {
                let children = ctx.section(section).open_item(path.as_slice()).await?;
                if let Some(expected) = expect_children {
                    let actual: Vec<&str> = children.iter().map(|c| c.label()).collect();
                    if actual != expected.iter().map(String::as_str).collect::<Vec<_>>() {
                        return Err(Error::CaseFailed(format!(
                            "children of {} were {:?}, expected {:?}",
                            path.join("/"),
                            actual,
                            expected
                        )));
                    }
                }
                Ok(())
            }
            TestStep::ExpandSection { section } => ctx.section(section).expand().await,
            TestStep::CollapseSection { section } => ctx.section(section).collapse().await,
            TestStep::AssertVisibleItems { section, contains } => {
                let visible = ctx.section(section).visible_items().await?;
                for label in contains {
                    if !visible.iter().any(|i| i.label() == label) {
                        return Err(Error::CaseFailed(format!(
                            "'{}' not visible in '{}'",
                            label, section
                        )));
                    }
                }
                Ok(())
            }
            TestStep::ClickAction { section, label } => ctx.section(section).action(label.as_str()).click().await,
            TestStep::SelectChannel { name } => ctx.output_panel().select_channel(name).await,
            TestStep::AssertOutput { contains } => {
                let text = ctx.output_panel().text().await?;
                if !text.contains(contains.as_str()) {
                    return Err(Error::CaseFailed(format!("output does not contain '{}'", contains)));
                }
                Ok(())
            }
            TestStep::ClearOutput => ctx.output_panel().clear_text().await,
            TestStep::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            TestStep::Log { message } => {
                info!("[TEST LOG] {}", message);
                Ok(())
            }
        }
    }
}

impl TestSpec {
    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::SpecParse(e.to_string()))
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::SpecParse(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl TestCase for TestSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    async fn run(&self, ctx: &SessionContext) -> Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            let step_name = step.name();
            debug!("Executing step {}: {}", i + 1, step_name);
            step.execute(ctx).await.map_err(|e| match e {
                Error::CaseFailed(reason) => Error::CaseFailed(format!("step {} ({}): {}", i + 1, step_name, reason)),
                other => other,
            })?;
        }
        Ok(())
    }
}
