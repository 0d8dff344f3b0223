//! Suite runner: the host framework that brackets test cases with the
//! session's pre-suite and post-suite hooks

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info};
use uuid::Uuid;

use vstester_common::{Error, Result, SessionConfig};

use crate::session::SessionContext;

/// Lifecycle hooks the runner invokes exactly once each, around all cases.
/// Each hook declares its own timeout; the runner enforces it.
#[async_trait]
pub trait SuiteHooks: Send {
    fn before_all_timeout(&self) -> Duration;

    /// Bring the session up and hand out the context cases run against.
    async fn before_all(&mut self) -> Result<SessionContext>;

    fn after_all_timeout(&self) -> Duration;

    /// Always runs, whatever happened before it.
    async fn after_all(&mut self) -> Result<()>;
}

/// One independently authored test case.
#[async_trait]
pub trait TestCase: Send + Sync {
    fn name(&self) -> &str;

    /// Overrides the runner's default per-case timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn run(&self, ctx: &SessionContext) -> Result<()>;
}

/// A test case backed by an async closure.
pub struct FnCase<F> {
    name: String,
    timeout: Option<Duration>,
    body: F,
}

impl<F, Fut> FnCase<F>
where
    F: Fn(SessionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            body,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl<F, Fut> TestCase for FnCase<F>
where
    F: Fn(SessionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn run(&self, ctx: &SessionContext) -> Result<()> {
        (self.body)(ctx.clone()).await
    }
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    /// Why no case ran, when the pre-suite hook failed
    pub aborted: Option<String>,
    pub results: Vec<TestResult>,
}

impl SuiteResult {
    /// Failed cases, plus one for a failed pre-suite hook.
    pub fn failures(&self) -> usize {
        self.failed + usize::from(self.aborted.is_some())
    }

    pub fn exit_code(&self) -> i32 {
        exit_code_for(self.failures())
    }

    /// Write results as JSON into `dir`.
    pub fn write_results(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("test-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Process exit status for a failure count: there is no partial status.
pub fn exit_code_for(failures: usize) -> i32 {
    if failures > 0 {
        1
    } else {
        0
    }
}

type CompletionCallback = Box<dyn FnOnce(usize) + Send>;

/// Runs test cases serially against one session.
pub struct SuiteRunner {
    case_timeout: Duration,
    on_complete: Option<CompletionCallback>,
}

impl SuiteRunner {
    pub fn new(case_timeout: Duration) -> Self {
        Self {
            case_timeout,
            on_complete: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.case_timeout())
    }

    /// Called once with the failure count when a run finishes.
    pub fn on_complete(mut self, callback: impl FnOnce(usize) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Run `cases` between the hooks of `hooks`.
    ///
    /// If the pre-suite hook fails no case runs. The post-suite hook runs
    /// exactly once either way, and its failure never changes the result.
    pub async fn run<H>(&mut self, hooks: &mut H, cases: &[Box<dyn TestCase>]) -> SuiteResult
    where
        H: SuiteHooks + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Run {}: preparing session", run_id);
        let before_timeout = hooks.before_all_timeout();
        let aborted = match timeout(before_timeout, hooks.before_all()).await {
            Ok(Ok(ctx)) => {
                info!("Running {} test(s)...", cases.len());
                for case in cases {
                    results.push(self.run_case(case.as_ref(), &ctx).await);
                }
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(Error::timeout("\"before all\" hook", before_timeout).to_string()),
        };
        if let Some(reason) = &aborted {
            error!("\"before all\" hook failed, skipping {} test(s): {}", cases.len(), reason);
        }

        let after_timeout = hooks.after_all_timeout();
        match timeout(after_timeout, hooks.after_all()).await {
            Ok(Ok(())) => debug!("\"after all\" hook completed"),
            Ok(Err(e)) => error!("\"after all\" hook failed: {}", e),
            Err(_) => error!(
                "\"after all\" hook failed: {}",
                Error::TeardownFailure(format!("timed out after {}ms", after_timeout.as_millis()))
            ),
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = SuiteResult {
            run_id,
            started_at,
            total: cases.len(),
            passed,
            failed,
            skipped: cases.len() - results.len(),
            duration_ms,
            aborted,
            results,
        };

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            result.passed, result.failed, result.skipped, result.duration_ms
        );

        if let Some(callback) = self.on_complete.take() {
            callback(result.failures());
        }
        result
    }

    async fn run_case(&self, case: &dyn TestCase, ctx: &SessionContext) -> TestResult {
        let name = case.name().to_string();
        let limit = case.timeout().unwrap_or(self.case_timeout);
        let start = Instant::now();
        debug!("Running test: {}", name);

        let outcome = timeout(limit, AssertUnwindSafe(case.run(ctx)).catch_unwind()).await;
        let error = match outcome {
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(e))) => Some(e.to_string()),
            Ok(Err(panic)) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
            Err(_) => Some(Error::timeout(format!("test case '{}'", name), limit).to_string()),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &error {
            None => info!("✓ {} ({} ms)", name, duration_ms),
            Some(e) => error!("✗ {} - {}", name, e),
        }

        TestResult {
            name,
            success: error.is_none(),
            duration_ms,
            error,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
