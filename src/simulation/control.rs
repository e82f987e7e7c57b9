//! Batch progress, cancellation and status
//!
//! One `BatchControl` belongs to one batch. The batch worker is its only
//! writer; any number of readers may poll progress or subscribe to status
//! changes from another thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Notify};

use crate::core::error::Result;
use crate::simulation::aggregate::AggregateResult;
use crate::simulation::orchestrator::BatchReport;

/// Observable state of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    NotStarted,
    InProgress { completed: usize, total: u32 },
    Completed(AggregateResult),
    Failed(String),
    Cancelled(AggregateResult),
}

impl BatchStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed(_) | BatchStatus::Failed(_) | BatchStatus::Cancelled(_)
        )
    }
}

pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Clone)]
pub struct BatchControl {
    cancelled: Arc<AtomicBool>,
    cancel_signal: Arc<Notify>,
    completed: Arc<AtomicUsize>,
    status: Arc<watch::Sender<BatchStatus>>,
    on_progress: Option<ProgressCallback>,
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BatchControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchControl")
            .field("cancelled", &self.is_cancelled())
            .field("completed", &self.completed())
            .finish()
    }
}

impl BatchControl {
    pub fn new() -> Self {
        let (status, _) = watch::channel(BatchStatus::NotStarted);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            cancel_signal: Arc::new(Notify::new()),
            completed: Arc::new(AtomicUsize::new(0)),
            status: Arc::new(status),
            on_progress: None,
        }
    }

    /// Call `callback(completed)` after every finished trial
    pub fn with_progress(self, callback: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.with_progress_callback(Arc::new(callback))
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Ask the batch to stop before its next trial, or before its trials
    /// start if input assembly is still in flight
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel_signal.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called on this control or a clone
    pub async fn cancelled(&self) {
        loop {
            let notified = self.cancel_signal.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Trials finished so far
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Current status; while running, the completed count is live
    pub fn status(&self) -> BatchStatus {
        match &*self.status.borrow() {
            BatchStatus::InProgress { total, .. } => BatchStatus::InProgress {
                completed: self.completed(),
                total: *total,
            },
            other => other.clone(),
        }
    }

    /// Receiver notified on every phase change
    pub fn subscribe(&self) -> watch::Receiver<BatchStatus> {
        self.status.subscribe()
    }

    pub(crate) fn mark_started(&self, total: u32) {
        self.completed.store(0, Ordering::SeqCst);
        self.status
            .send_replace(BatchStatus::InProgress { completed: 0, total });
    }

    pub(crate) fn record_completion(&self) -> usize {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(callback) = &self.on_progress {
            callback(completed);
        }
        completed
    }

    pub(crate) fn finish(&self, result: &Result<BatchReport>) {
        let status = match result {
            Ok(report) if report.cancelled => BatchStatus::Cancelled(report.result.clone()),
            Ok(report) => BatchStatus::Completed(report.result.clone()),
            Err(e) => BatchStatus::Failed(e.to_string()),
        };
        self.status.send_replace(status);
    }
}
