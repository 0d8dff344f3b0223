//! Bounded waits over live UI state
//!
//! Each wait carries its own timeout and fails with
//! [`Error::OperationTimeout`] scoped to the operation that issued it.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::automation::{AutomationHandle, Node};
use crate::error::{Error, Result};

/// Poll `probe` every `poll` until it yields `true` or `timeout` elapses.
///
/// Errors from the probe propagate immediately; callers that expect the UI to
/// be unreachable for a while should fold them into `Ok(false)` themselves.
pub async fn wait_until<F, Fut>(
    what: &str,
    timeout: Duration,
    poll: Duration,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        if probe().await? {
            debug!("Condition '{}' met after {} attempt(s)", what, attempts);
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::timeout(what, timeout));
        }
        sleep(poll).await;
    }
}

/// Wait until `node`'s attribute `name` reads exactly `value`.
pub async fn wait_for_attribute_value(
    automation: &dyn AutomationHandle,
    node: &Node,
    name: &str,
    value: &str,
    timeout: Duration,
) -> Result<()> {
    let what = format!("{}={} on {}", name, value, node);
    wait_until(&what, timeout, poll_interval(timeout), move || async move {
        Ok::<_, Error>(automation.get_attribute(node, name).await?.as_deref() == Some(value))
    })
    .await
}

/// Wait until `node` is no longer displayed.
pub async fn wait_until_hidden(
    automation: &dyn AutomationHandle,
    node: &Node,
    timeout: Duration,
) -> Result<()> {
    let what = format!("{} to be hidden", node);
    wait_until(&what, timeout, poll_interval(timeout), move || async move {
        Ok::<_, Error>(!automation.is_displayed(node).await?)
    })
    .await
}

fn poll_interval(timeout: Duration) -> Duration {
    (timeout / 20).clamp(Duration::from_millis(10), Duration::from_millis(100))
}
