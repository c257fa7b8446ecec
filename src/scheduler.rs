use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Cancelled,
}

/// Runs simulated latencies as tokio tasks tied to the current session.
///
/// Every task races its deadline against a child of the session token, so
/// [`Scheduler::cancel_all`] drops every callback that has not fired yet.
#[derive(Debug)]
pub struct Scheduler {
    session: CancellationToken,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            session: CancellationToken::new(),
        }
    }

    /// Must be called from within a tokio runtime. The deadline is fixed
    /// here, not when the task is first polled.
    pub fn schedule<F>(&self, label: &'static str, delay: Duration, callback: F) -> ScheduledTask
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let token = self.session.child_token();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!(task = label, "simulated task cancelled");
                    TaskOutcome::Cancelled
                }
                _ = sleep_until(deadline) => {
                    callback();
                    TaskOutcome::Completed
                }
            }
        });
        ScheduledTask {
            label,
            token,
            handle,
        }
    }

    /// Cancels every outstanding task and starts a fresh session scope.
    pub fn cancel_all(&mut self) {
        self.session.cancel();
        self.session = CancellationToken::new();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.session.cancel();
    }
}

#[derive(Debug)]
pub struct ScheduledTask {
    label: &'static str,
    token: CancellationToken,
    handle: JoinHandle<TaskOutcome>,
}

impl ScheduledTask {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub async fn join(self) -> TaskOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(task = self.label, error = %err, "simulated task aborted");
                TaskOutcome::Cancelled
            }
        }
    }
}
