// Periodic scheduler loop around the due-schedule processor

use super::processor::{ProcessSummary, ScheduleProcessor};
use crate::errors::ProcessError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

/// Scheduler trait for the polling service
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Run the polling loop until `stop` is called
    async fn start(&self) -> Result<(), ProcessError>;

    /// Signal the polling loop to finish
    async fn stop(&self) -> Result<(), ProcessError>;

    /// Run a single processing pass
    async fn process_due(&self) -> Result<ProcessSummary, ProcessError>;
}

/// Calls the processor on a fixed interval
pub struct SchedulerEngine {
    processor: Arc<ScheduleProcessor>,
    poll_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
}

impl SchedulerEngine {
    pub fn new(processor: Arc<ScheduleProcessor>, poll_interval: Duration) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Self {
            processor,
            poll_interval,
            shutdown_tx,
        }
    }

    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

#[async_trait]
impl Scheduler for SchedulerEngine {
    #[instrument(skip(self))]
    async fn start(&self) -> Result<(), ProcessError> {
        info!(
            poll_interval_seconds = self.poll_interval.as_secs(),
            "Starting scheduler engine"
        );

        let mut poll_interval = interval(self.poll_interval);
        // A slow pass must not trigger a burst of catch-up passes
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_receiver();

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    debug!("Polling for due schedules");

                    match self.process_due().await {
                        Ok(summary) if summary.selected > 0 => {
                            info!(
                                selected = summary.selected,
                                succeeded = summary.succeeded,
                                failed = summary.failed,
                                skipped = summary.skipped,
                                "Scheduler pass finished"
                            );
                        }
                        Ok(_) => debug!("No schedules due"),
                        Err(e) => {
                            // The next tick retries the selection
                            error!(error = %e, "Error processing due schedules");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        info!("Scheduler engine stopped");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop(&self) -> Result<(), ProcessError> {
        info!("Stopping scheduler engine");
        let _ = self.shutdown_tx.send(());
        Ok(())
    }

    async fn process_due(&self) -> Result<ProcessSummary, ProcessError> {
        self.processor.process_due_schedules(None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::repositories::{MockResultStore, MockScheduleStore};
    use crate::errors::DatabaseError;
    use crate::lock::LocalLock;
    use crate::scheduler::ProcessorConfig;
    use chrono::{TimeZone, Utc};

    fn processor(schedules: MockScheduleStore) -> Arc<ScheduleProcessor> {
        Arc::new(ScheduleProcessor::new(
            ProcessorConfig::default(),
            Arc::new(schedules),
            Arc::new(MockResultStore::new()),
            Arc::new(LocalLock::new()),
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 3, 11, 10, 0, 0).unwrap(),
            )),
        ))
    }

    #[tokio::test]
    async fn test_engine_polls_until_stopped() {
        let mut schedules = MockScheduleStore::new();
        schedules.expect_find_due().returning(|_, _| Ok(vec![]));
        let engine = Arc::new(SchedulerEngine::new(
            processor(schedules),
            Duration::from_millis(10),
        ));

        let runner = engine.clone();
        let handle = tokio::spawn(async move { runner.start().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.stop().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("engine did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_process_due_surfaces_selection_errors() {
        let mut schedules = MockScheduleStore::new();
        schedules
            .expect_find_due()
            .returning(|_, _| Err(DatabaseError::ConnectionFailed("down".to_string())));
        let engine = SchedulerEngine::new(processor(schedules), Duration::from_millis(10));

        assert!(matches!(
            engine.process_due().await,
            Err(ProcessError::Selection(_))
        ));
    }
}
