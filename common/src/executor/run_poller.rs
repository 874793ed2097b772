// Bounded polling of an assistant run until it reaches a terminal state

use crate::clients::{AssistantBackend, RunStatus};
use crate::config::AssistantConfig;
use crate::errors::ProcessError;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument};

/// How often and for how long a run is polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.run_poll_interval_ms),
            max_wait: Duration::from_secs(config.run_max_wait_seconds),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// Poll a run until it completes, returning the number of status polls made.
///
/// Any terminal status other than `completed` (including `requires_action`
/// and unrecognised values) is an `UpstreamRunFailure`. A run still pending
/// once `max_wait` has elapsed is a `Timeout`.
#[instrument(skip(backend, policy))]
pub async fn wait_for_run(
    backend: &dyn AssistantBackend,
    thread_id: &str,
    run_id: &str,
    policy: PollPolicy,
) -> Result<u32, ProcessError> {
    let started = Instant::now();
    let mut polls: u32 = 0;

    loop {
        let status = backend.run_status(thread_id, run_id).await?;
        polls += 1;

        match status {
            RunStatus::Completed => {
                debug!(polls, "Assistant run completed");
                return Ok(polls);
            }
            status if status.is_pending() => {
                if started.elapsed() + policy.interval > policy.max_wait {
                    return Err(ProcessError::Timeout {
                        run_id: run_id.to_string(),
                        waited_seconds: started.elapsed().as_secs(),
                    });
                }
                debug!(status = status.as_str(), polls, "Assistant run pending");
                sleep(policy.interval).await;
            }
            status => {
                return Err(ProcessError::UpstreamRunFailure {
                    run_id: run_id.to_string(),
                    status: status.as_str().to_string(),
                });
            }
        }
    }
}
