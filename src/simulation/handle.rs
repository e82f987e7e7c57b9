//! Handle to a batch running on the tokio runtime

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::error::{ForecastError, Result};
use crate::simulation::control::{BatchControl, BatchStatus};
use crate::simulation::orchestrator::BatchReport;

/// A spawned batch. Each handle owns a fresh `BatchControl`, so it never
/// reports another batch's result.
#[derive(Debug)]
pub struct BatchHandle {
    control: BatchControl,
    task: JoinHandle<Result<BatchReport>>,
}

impl BatchHandle {
    pub(crate) fn new(control: BatchControl, task: JoinHandle<Result<BatchReport>>) -> Self {
        Self { control, task }
    }

    pub fn status(&self) -> BatchStatus {
        self.control.status()
    }

    /// Trials completed so far
    pub fn progress(&self) -> usize {
        self.control.completed()
    }

    /// Stop before the next trial, or before the first one while input is
    /// still being fetched; `wait` then yields the partial report
    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchStatus> {
        self.control.subscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn control(&self) -> &BatchControl {
        &self.control
    }

    pub async fn wait(self) -> Result<BatchReport> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                let reason = e.to_string();
                self.control
                    .finish(&Err(ForecastError::WorkerFailed(reason.clone())));
                Err(ForecastError::WorkerFailed(reason))
            }
        }
    }
}
