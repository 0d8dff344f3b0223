//! Application-under-test process management

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use vstester_common::{AutomationHandle, Error, Result, SessionConfig};

/// The application a session is bracketed around.
#[async_trait]
pub trait Application: Send {
    /// Start the application. Returning does not mean it is ready yet.
    async fn start(&mut self, config: &SessionConfig) -> Result<()>;

    /// Handle for driving the running application, if started.
    fn automation(&self) -> Option<Arc<dyn AutomationHandle>>;

    /// Stop the application. Called at most once per start.
    async fn quit(&mut self) -> Result<()>;
}

/// Runs the application as a child process.
///
/// The automation handle is supplied by the caller, typically a driver
/// connected to the application's remote debugging endpoint.
pub struct ProcessApplication {
    automation: Arc<dyn AutomationHandle>,
    child: Option<Child>,
    user_data: Option<TempDir>,
    quit_grace: Duration,
}

impl ProcessApplication {
    pub fn new(automation: Arc<dyn AutomationHandle>) -> Self {
        Self {
            automation,
            child: None,
            user_data: None,
            quit_grace: Duration::from_millis(500),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Throwaway profile directory holding `User/settings.json`, present
    /// while the application runs with custom settings.
    pub fn user_data_dir(&self) -> Option<&Path> {
        self.user_data.as_ref().map(|d| d.path())
    }
}

/// Create a fresh profile directory with `settings` as its user settings.
fn write_user_settings(settings: &serde_json::Value) -> Result<TempDir> {
    let dir = tempfile::Builder::new().prefix("vstester-profile-").tempdir()?;
    let user = dir.path().join("User");
    std::fs::create_dir_all(&user)?;
    std::fs::write(user.join("settings.json"), serde_json::to_string_pretty(settings)?)?;
    Ok(dir)
}

#[async_trait]
impl Application for ProcessApplication {
    async fn start(&mut self, config: &SessionConfig) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }

        info!("Spawning {}", config.binary_path.display());

        let mut cmd = Command::new(&config.binary_path);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let user_data = if config.settings.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            None
        } else {
            let dir = write_user_settings(&config.settings)?;
            debug!("User settings written to {}", dir.path().display());
            cmd.arg("--user-data-dir").arg(dir.path());
            Some(dir)
        };

        let child = cmd.spawn().map_err(|e| {
            Error::LaunchFailed(format!(
                "Failed to spawn {}: {}",
                config.binary_path.display(),
                e
            ))
        })?;

        self.quit_grace = config.quit_grace();
        self.child = Some(child);
        self.user_data = user_data;
        Ok(())
    }

    fn automation(&self) -> Option<Arc<dyn AutomationHandle>> {
        self.child.as_ref().map(|_| self.automation.clone())
    }

    async fn quit(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        // removed only once the process is gone
        let _user_data = self.user_data.take();

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(id) = child.id() {
                info!("Stopping application (pid: {})", id);
                if kill(Pid::from_raw(id as i32), Signal::SIGTERM).is_ok() {
                    if let Ok(status) = tokio::time::timeout(self.quit_grace, child.wait()).await {
                        let status = status?;
                        if !status.success() {
                            warn!("Application exited with {}", status);
                        }
                        return Ok(());
                    }
                }
            }
        }

        // Force kill if still running
        child
            .kill()
            .await
            .map_err(|e| Error::TeardownFailure(format!("failed to kill application: {}", e)))
    }
}
