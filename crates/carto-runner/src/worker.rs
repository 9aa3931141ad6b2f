//! Running an operation on a background thread.

use crate::{PipelineError, Result};
use std::thread::{self, JoinHandle};

/// Handle to an operation running on the worker thread.
pub struct WorkerHandle<T> {
    thread: JoinHandle<T>,
}

impl<T> WorkerHandle<T> {
    /// Whether the worker has returned.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the worker returns.
    pub fn join(self) -> Result<T> {
        self.thread.join().map_err(|_| PipelineError::WorkerPanicked)
    }
}

/// Run `job` on a named worker thread.
///
/// The job typically owns a [`Pipeline`](crate::Pipeline) and the layer
/// registry and hands both back when done; progress flows over the
/// pipeline's reporter meanwhile.
pub fn spawn_worker<T, F>(job: F) -> Result<WorkerHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let thread = thread::Builder::new()
        .name("carto-pipeline".to_string())
        .spawn(job)?;
    Ok(WorkerHandle { thread })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_returns_value() {
        let handle = spawn_worker(|| 21 * 2).unwrap();
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_panic_is_reported() {
        let handle = spawn_worker(|| -> u32 { panic!("stage exploded") }).unwrap();
        assert!(matches!(handle.join(), Err(PipelineError::WorkerPanicked)));
    }
}
