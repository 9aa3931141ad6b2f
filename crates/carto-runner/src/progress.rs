//! Progress and status notifications.
//!
//! The pipeline runs on a worker thread and reports through a channel; the
//! caller drains it on its own thread. Sending never blocks and a receiver
//! that went away is not an error.

use crossbeam_channel::{Receiver, Sender};
use tracing::info;

/// A notification from a running operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Human-readable status for a stage.
    Status {
        /// Stage name.
        stage: String,
        /// Message.
        message: String,
    },
    /// Completion percentage of the current operation.
    Progress {
        /// Stage name.
        stage: String,
        /// 0 to 100.
        percent: u8,
    },
    /// The operation ended.
    Finished {
        /// Whether it completed without an aborting error.
        success: bool,
        /// Summary.
        message: String,
    },
}

/// Sending half of the progress channel.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<Sender<ProgressEvent>>,
}

/// An unbounded progress channel.
pub fn progress_channel() -> (ProgressReporter, Receiver<ProgressEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ProgressReporter { tx: Some(tx) }, rx)
}

impl ProgressReporter {
    /// A reporter that drops every event.
    pub fn silent() -> Self {
        Self { tx: None }
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    /// Report a status message; also logged.
    pub fn status(&self, stage: &str, message: impl Into<String>) {
        let message = message.into();
        info!(stage, "{}", message);
        self.send(ProgressEvent::Status {
            stage: stage.to_string(),
            message,
        });
    }

    /// Report a percentage, clamped to 100.
    pub fn progress(&self, stage: &str, percent: u8) {
        metrics::gauge!(carto_metrics::metric_defs::RUN_PROGRESS.name).set(percent.min(100) as f64);
        self.send(ProgressEvent::Progress {
            stage: stage.to_string(),
            percent: percent.min(100),
        });
    }

    /// Report `done` of `total` steps as a percentage.
    pub fn step(&self, stage: &str, done: usize, total: usize) {
        let percent = if total == 0 { 100 } else { (done * 100 / total).min(100) as u8 };
        self.progress(stage, percent);
    }

    /// Report the end of an operation.
    pub fn finished(&self, success: bool, message: impl Into<String>) {
        self.send(ProgressEvent::Finished {
            success,
            message: message.into(),
        });
    }
}
