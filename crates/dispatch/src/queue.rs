//! Open-ended task queue with a fixed concurrency width.
//!
//! Unlike [`Dispatcher`](crate::Dispatcher), jobs can be submitted at any
//! time and each one reports its own outcome. A failing job only fails its
//! own handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use taskpace_core::ConfigError;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{QueueError, WorkerError};

pub struct TaskQueue {
    concurrency: usize,
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    submitted: AtomicU64,
}

impl TaskQueue {
    pub fn new(concurrency: usize) -> Result<Self, QueueError> {
        if concurrency == 0 {
            return Err(QueueError::Config(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            }));
        }
        Ok(Self {
            concurrency,
            permits: Arc::new(Semaphore::new(concurrency)),
            waiting: Arc::new(AtomicUsize::new(0)),
            submitted: AtomicU64::new(0),
        })
    }

    /// Submit a job. It starts as soon as one of the `concurrency` slots is free.
    ///
    /// Must be called from within a tokio runtime.
    pub fn queue<F, Fut, R>(&self, job: F) -> QueueHandle<R>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, WorkerError>> + Send + 'static,
        R: Send + 'static,
    {
        let id = self.submitted.fetch_add(1, Ordering::Relaxed);
        let permits = Arc::clone(&self.permits);
        let waiting = Arc::clone(&self.waiting);
        waiting.fetch_add(1, Ordering::SeqCst);

        let inner = tokio::spawn(async move {
            let permit = permits.acquire_owned().await;
            waiting.fetch_sub(1, Ordering::SeqCst);
            let _permit = permit.map_err(|_| QueueError::Closed)?;
            debug!(job = id, "Queued job started");
            let result = job().await.map_err(QueueError::Job);
            debug!(job = id, ok = result.is_ok(), "Queued job finished");
            result
        });

        QueueHandle { id, inner }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Jobs currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.concurrency - self.permits.available_permits()
    }

    /// Jobs submitted but still waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Total jobs ever submitted to this queue.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

/// Resolves to the job's own result.
#[derive(Debug)]
pub struct QueueHandle<R> {
    id: u64,
    inner: JoinHandle<Result<R, QueueError>>,
}

impl<R> QueueHandle<R> {
    /// Submission sequence number, starting at 0.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<R> Future for QueueHandle<R> {
    type Output = Result<R, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_panic() => {
                Poll::Ready(Err(QueueError::Job(WorkerError::from_panic(e.into_panic()))))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueueError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
