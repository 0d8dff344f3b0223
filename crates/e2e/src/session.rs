//! Lifecycle of the single application session shared by a test run
//!
//! ```text
//! Idle --launch--> Launching --ready signal--> Ready --settle delay--> Active
//!                      |                                                 |
//!                      +--(failure)--> Closed <--quit-- Closing <--close-+
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use vstester_common::{wait_until, AutomationHandle, Error, Result, SessionConfig};

use crate::app::Application;
use crate::panel::OutputPanel;
use crate::runner::SuiteHooks;
use crate::section::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Launching,
    Ready,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    fn can_transition(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Launching)
                | (Launching, Ready)
                | (Ready, Active)
                | (Launching, Closed)
                | (Ready, Closed)
                | (Launching, Closing)
                | (Ready, Closing)
                | (Active, Closing)
                | (Closing, Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Launching => "launching",
            SessionState::Ready => "ready",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// What a test case gets to work with: the live application and the
/// session's configuration. Passed explicitly to every case.
#[derive(Clone)]
pub struct SessionContext {
    automation: Arc<dyn AutomationHandle>,
    config: Arc<SessionConfig>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("binary_path", &self.config.binary_path)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new(automation: Arc<dyn AutomationHandle>, config: Arc<SessionConfig>) -> Self {
        Self { automation, config }
    }

    pub fn automation(&self) -> &Arc<dyn AutomationHandle> {
        &self.automation
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn section(&self, title: &str) -> Section {
        Section::new(self.automation.clone(), title).with_wait_timeout(self.config.wait_timeout())
    }

    pub fn output_panel(&self) -> OutputPanel {
        OutputPanel::output(self.automation.clone()).with_wait_timeout(self.config.wait_timeout())
    }
}

/// Owns one application instance across an entire batch of test cases.
pub struct SessionOrchestrator<A> {
    app: A,
    config: Arc<SessionConfig>,
    state: SessionState,
    context: Option<SessionContext>,
}

impl<A: Application> SessionOrchestrator<A> {
    pub fn new(app: A, config: SessionConfig) -> Self {
        Self {
            app,
            config: Arc::new(config),
            state: SessionState::Idle,
            context: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    /// The session context, available only while Active.
    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    fn transition(&mut self, to: SessionState) -> Result<()> {
        if !self.state.can_transition(to) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        info!("Session {} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Start the application and wait until it is usable.
    ///
    /// On any failure whatever was started is torn down and the session ends
    /// up Closed, so a later [`close`](Self::close) has nothing left to do.
    pub async fn launch(&mut self) -> Result<SessionContext> {
        self.transition(SessionState::Launching)?;

        let launch_timeout = self.config.launch_timeout();
        let started = match timeout(launch_timeout, self.start_until_ready()).await {
            Ok(result) => result,
            Err(_) => Err(Error::LaunchTimeout {
                seconds: launch_timeout.as_secs(),
            }),
        };

        let automation = match started {
            Ok(automation) => automation,
            Err(e) => {
                error!("Launch failed: {}", e);
                if let Err(quit_err) = self.app.quit().await {
                    warn!("Cleanup after failed launch: {}", quit_err);
                }
                self.context = None;
                self.state = SessionState::Closed;
                return Err(e);
            }
        };

        self.transition(SessionState::Ready)?;
        sleep(self.config.settle_delay()).await;
        self.transition(SessionState::Active)?;

        let context = SessionContext::new(automation, self.config.clone());
        self.context = Some(context.clone());
        Ok(context)
    }

    async fn start_until_ready(&mut self) -> Result<Arc<dyn AutomationHandle>> {
        self.app.start(&self.config).await.map_err(|e| match e {
            e if e.is_fatal() => e,
            other => Error::LaunchFailed(other.to_string()),
        })?;

        let automation = self
            .app
            .automation()
            .ok_or_else(|| Error::LaunchFailed("application exposes no automation handle".into()))?;

        let ready = self.config.ready_locator.clone();
        let probe = automation.clone();
        wait_until(
            &format!("workbench ready ({})", ready),
            self.config.launch_timeout(),
            self.config.poll_interval(),
            || {
                let probe = probe.clone();
                let ready = ready.clone();
                async move {
                    // the driver may refuse connections until the app is up
                    Ok::<_, Error>(match probe.find_nodes(None, &ready).await {
                        Ok(nodes) => !nodes.is_empty(),
                        Err(_) => false,
                    })
                }
            },
        )
        .await
        .map_err(|e| match e {
            Error::OperationTimeout { .. } => Error::LaunchTimeout {
                seconds: self.config.launch_timeout().as_secs(),
            },
            other => other,
        })?;

        Ok(automation)
    }

    /// Tear the application down. Idempotent: a no-op before launch, after a
    /// failed launch, and on every call after the first.
    ///
    /// Quit problems come back as [`Error::TeardownFailure`]; the session is
    /// Closed either way.
    pub async fn close(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Closing | SessionState::Closed => return Ok(()),
            _ => {}
        }

        self.transition(SessionState::Closing)?;
        self.context = None;

        let teardown_timeout = self.config.teardown_timeout();
        let result = timeout(teardown_timeout, self.app.quit()).await;
        self.state = SessionState::Closed;
        info!("Session closing -> closed");

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::TeardownFailure(e.to_string())),
            Err(_) => Err(Error::TeardownFailure(format!(
                "application did not quit within {}ms",
                teardown_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl<A: Application> SuiteHooks for SessionOrchestrator<A> {
    fn before_all_timeout(&self) -> Duration {
        self.config.launch_timeout() + self.config.settle_delay()
    }

    async fn before_all(&mut self) -> Result<SessionContext> {
        self.launch().await
    }

    fn after_all_timeout(&self) -> Duration {
        self.config.teardown_timeout()
    }

    async fn after_all(&mut self) -> Result<()> {
        self.close().await
    }
}
