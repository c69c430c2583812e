use crate::assistants::{AssistantsApi, Run, RunStatus};
use crate::config::AssistantSettings;
use crate::core::error::AgentError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Satisfies a run parked in `requires_action` and returns the run as the
/// service reports it after the submission.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn fulfil(&self, api: &dyn AssistantsApi, run: &Run) -> Result<Run, AgentError>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Also covers `incomplete` runs; the thread still holds whatever was produced.
    Failed,
    Expired,
    Cancelled,
    /// The poll budget ran out before the run settled.
    TimedOut,
}

impl RunOutcome {
    /// Whether the thread is worth reading back.
    pub fn has_transcript(self) -> bool {
        matches!(self, RunOutcome::Completed | RunOutcome::Failed)
    }
}

/// Drives a run to a terminal status at a fixed cadence.
#[derive(Clone)]
pub struct RunPoller {
    interval: Duration,
    max_polls: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl RunPoller {
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn from_settings(settings: &AssistantSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.poll_interval_ms),
            settings.max_polls,
        )
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    async fn give_up(&self, api: &dyn AssistantsApi, run: &Run, polls: u32) -> RunOutcome {
        warn!(polls, "run did not settle, cancelling");
        if let Err(e) = api.cancel_run(&run.thread_id, &run.id).await {
            warn!(error = %e, "failed to cancel run");
        }
        RunOutcome::TimedOut
    }

    #[instrument(skip_all, fields(run_id = %run.id, thread_id = %run.thread_id))]
    pub async fn drive(
        &self,
        api: &dyn AssistantsApi,
        run: Run,
        action_handler: Option<&dyn ActionHandler>,
    ) -> Result<RunOutcome, AgentError> {
        let mut run = run;
        let mut polls = 0u32;

        loop {
            match &run.status {
                RunStatus::Completed => return Ok(RunOutcome::Completed),
                RunStatus::Failed | RunStatus::Incomplete => {
                    if let Some(error) = &run.last_error {
                        warn!(code = %error.code, message = %error.message, "run failed");
                    } else {
                        warn!(status = ?run.status, "run ended without completing");
                    }
                    return Ok(RunOutcome::Failed);
                }
                RunStatus::Expired => return Ok(RunOutcome::Expired),
                RunStatus::Cancelled => return Ok(RunOutcome::Cancelled),
                RunStatus::RequiresAction => match action_handler {
                    // Each submission spends one poll of the budget.
                    Some(handler) => {
                        if polls >= self.max_polls {
                            return Ok(self.give_up(api, &run, polls).await);
                        }
                        polls += 1;
                        info!(calls = run.required_tool_calls().len(), "run requires action");
                        run = handler.fulfil(api, &run).await?;
                        continue;
                    }
                    None => debug!("run requires action but no handler is attached"),
                },
                RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling => {}
                RunStatus::Unknown(status) => debug!(status = %status, "unrecognised run status"),
            }

            if polls >= self.max_polls {
                return Ok(self.give_up(api, &run, polls).await);
            }
            polls += 1;
            self.sleeper.sleep(self.interval).await;
            run = api.retrieve_run(&run.thread_id, &run.id).await?;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns immediately and counts how often it was asked to wait.
    #[derive(Default)]
    pub struct InstantSleeper {
        naps: AtomicUsize,
    }

    impl InstantSleeper {
        pub fn naps(&self) -> usize {
            self.naps.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Sleeper for InstantSleeper {
        async fn sleep(&self, _duration: Duration) {
            self.naps.fetch_add(1, Ordering::SeqCst);
        }
    }
}
