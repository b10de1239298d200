//! Worker contract: how the dispatcher invokes the caller's routine.
//!
//! A worker is declared either synchronous or asynchronous by the variant it
//! is wrapped in. The dispatcher reads that declaration once at
//! construction; the routine itself is never called to find out.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// A routine that finishes a task before returning.
pub trait SyncWorker<T>: Send + Sync {
    fn run(&self, task: T) -> Result<(), WorkerError>;
}

/// A routine whose task is finished when its future resolves.
#[async_trait]
pub trait AsyncWorker<T>: Send + Sync {
    async fn run(&self, task: T) -> Result<(), WorkerError>;
}

/// Whether invocations run to completion inline or are awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerMode {
    Sync,
    Async,
}

impl fmt::Display for WorkerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerMode::Sync => write!(f, "sync"),
            WorkerMode::Async => write!(f, "async"),
        }
    }
}

/// The worker routine handed to a [`Dispatcher`](crate::Dispatcher).
pub enum Worker<T> {
    Sync(Arc<dyn SyncWorker<T>>),
    Async(Arc<dyn AsyncWorker<T>>),
}

impl<T: Send + 'static> Worker<T> {
    /// Wrap a plain closure as a synchronous worker.
    pub fn sync_fn<F>(f: F) -> Self
    where
        F: Fn(T) -> Result<(), WorkerError> + Send + Sync + 'static,
    {
        Worker::Sync(Arc::new(SyncFn(f)))
    }

    /// Wrap a closure returning a future as an asynchronous worker.
    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        Worker::Async(Arc::new(AsyncFn(f)))
    }

    pub fn mode(&self) -> WorkerMode {
        match self {
            Worker::Sync(_) => WorkerMode::Sync,
            Worker::Async(_) => WorkerMode::Async,
        }
    }
}

impl<T> Clone for Worker<T> {
    fn clone(&self) -> Self {
        match self {
            Worker::Sync(w) => Worker::Sync(Arc::clone(w)),
            Worker::Async(w) => Worker::Async(Arc::clone(w)),
        }
    }
}

impl<T> fmt::Debug for Worker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Worker::Sync(_) => f.write_str("Worker::Sync(..)"),
            Worker::Async(_) => f.write_str("Worker::Async(..)"),
        }
    }
}

/// Determine how every invocation of `worker` will be awaited.
///
/// Called exactly once per dispatcher, before anything is scheduled.
pub fn detect_mode<T: Send + 'static>(worker: &Worker<T>) -> WorkerMode {
    let mode = worker.mode();
    tracing::debug!(%mode, "Worker contract detected");
    mode
}

struct SyncFn<F>(F);

impl<T, F> SyncWorker<T> for SyncFn<F>
where
    F: Fn(T) -> Result<(), WorkerError> + Send + Sync,
{
    fn run(&self, task: T) -> Result<(), WorkerError> {
        (self.0)(task)
    }
}

struct AsyncFn<F>(F);

#[async_trait]
impl<T, F, Fut> AsyncWorker<T> for AsyncFn<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    async fn run(&self, task: T) -> Result<(), WorkerError> {
        (self.0)(task).await
    }
}
