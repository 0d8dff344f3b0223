//! Session configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::locator::Locator;

/// Everything needed to launch, wait for, and tear down one application
/// session, plus the default timeouts applied to test cases and UI waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Path to the application binary
    pub binary_path: PathBuf,

    /// Extra command-line arguments
    pub args: Vec<String>,

    /// Extra environment variables
    pub env: BTreeMap<String, String>,

    /// Budget for start + ready signal
    pub launch_timeout_ms: u64,

    /// Extra delay after the ready signal before the session is active
    pub settle_delay_ms: u64,

    /// Budget for the post-suite teardown
    pub teardown_timeout_ms: u64,

    /// Default budget for a single test case
    pub case_timeout_ms: u64,

    /// Default budget for attribute and visibility waits
    pub wait_timeout_ms: u64,

    /// Polling interval for the ready signal
    pub poll_interval_ms: u64,

    /// Time between SIGTERM and a forced kill on quit
    pub quit_grace_ms: u64,

    /// Node whose presence means the workbench is ready
    pub ready_locator: Locator,

    /// Free-form settings handed to the application
    pub settings: serde_json::Value,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("code"),
            args: Vec::new(),
            env: BTreeMap::new(),
            launch_timeout_ms: 15_000,
            settle_delay_ms: 2_000,
            teardown_timeout_ms: 15_000,
            case_timeout_ms: 30_000,
            wait_timeout_ms: 1_000,
            poll_interval_ms: 100,
            quit_grace_ms: 500,
            ready_locator: Locator::class("monaco-workbench"),
            settings: serde_json::Value::Object(Default::default()),
        }
    }
}

impl SessionConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.binary_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("binary_path is empty".into()));
        }
        let timeouts = [
            ("launch_timeout_ms", self.launch_timeout_ms),
            ("teardown_timeout_ms", self.teardown_timeout_ms),
            ("case_timeout_ms", self.case_timeout_ms),
            ("wait_timeout_ms", self.wait_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    pub fn case_timeout(&self) -> Duration {
        Duration::from_millis(self.case_timeout_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn quit_grace(&self) -> Duration {
        Duration::from_millis(self.quit_grace_ms)
    }
}
