//! Dispatcher error types.

use std::any::Any;

use taskpace_core::ConfigError;
use thiserror::Error;

use crate::report::RunReport;

/// Failure reported by a worker for a single task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("{0}")]
    Failed(String),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl WorkerError {
    pub fn msg(message: impl std::fmt::Display) -> Self {
        WorkerError::Failed(message.to_string())
    }

    /// Turn a caught panic payload into an error, keeping the message when
    /// the payload is a string.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        WorkerError::Panicked(message)
    }
}

/// Errors surfaced by [`Dispatcher`](crate::Dispatcher) and its completion handle.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("dispatcher already started")]
    AlreadyStarted,

    #[error("no tokio runtime available to start the dispatcher")]
    NoRuntime,

    #[error("run aborted after task {index} failed: {message}")]
    Aborted {
        index: usize,
        message: String,
        report: Box<RunReport>,
    },

    #[error("dispatcher dropped before the run completed")]
    Abandoned,
}

/// Errors surfaced per job by [`TaskQueue`](crate::TaskQueue).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("job failed: {0}")]
    Job(#[from] WorkerError),

    #[error("queue closed before the job could run")]
    Closed,
}
