//! Bounded-concurrency dispatcher over a fixed task list.
//!
//! ```ignore
//! let worker = Worker::async_fn(|url: String| async move { fetch(&url).await });
//! let mut dispatcher = Dispatcher::new(urls, worker, DispatchConfig::default())?;
//! dispatcher.start()?;
//! let report = dispatcher.finish().await?;
//! ```

use taskpace_core::DispatchConfig;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::report::RunReport;
use crate::scheduler::EventLoop;
use crate::signal::{Completion, CompletionSignal, RunState};
use crate::worker::{detect_mode, Worker, WorkerMode};

/// Everything the event loop takes ownership of on `start`.
struct Pending<T> {
    tasks: Vec<T>,
    worker: Worker<T>,
    signal: CompletionSignal,
}

/// Runs at most `concurrency` worker invocations at once over a task list,
/// pacing successive tasks in each slot with a jittered delay.
pub struct Dispatcher<T> {
    run_id: Uuid,
    config: DispatchConfig,
    mode: WorkerMode,
    total: usize,
    pending: Option<Pending<T>>,
    completion: watch::Receiver<Option<RunState>>,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Validate `config` and detect the worker's mode. Nothing runs yet.
    pub fn new(tasks: Vec<T>, worker: Worker<T>, config: DispatchConfig) -> Result<Self, DispatchError> {
        config.validate()?;
        let mode = detect_mode(&worker);
        let total = tasks.len();

        if config.concurrency > total {
            warn!(
                concurrency = config.concurrency,
                tasks = total,
                "Concurrency exceeds task count, only {} slot(s) will start",
                total
            );
        }

        let (signal, completion) = CompletionSignal::new();
        Ok(Self {
            run_id: Uuid::new_v4(),
            config,
            mode,
            total,
            pending: Some(Pending { tasks, worker, signal }),
            completion,
        })
    }

    /// Begin dispatch on the current tokio runtime.
    ///
    /// A second call returns [`DispatchError::AlreadyStarted`] and has no effect.
    pub fn start(&mut self) -> Result<(), DispatchError> {
        let handle = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let Pending { tasks, worker, signal } =
            self.pending.take().ok_or(DispatchError::AlreadyStarted)?;

        if self.config.debug {
            self.config.log_summary();
        }
        let event_loop = EventLoop::new(self.run_id, tasks, worker, self.mode, self.config.clone(), signal);
        handle.spawn(event_loop.run());
        info!(run_id = %self.run_id, "Dispatcher started");
        Ok(())
    }

    /// Handle that resolves once every task has finished.
    ///
    /// Can be requested before `start`, while running, or after the run
    /// drained; every handle resolves exactly once.
    pub fn finish(&self) -> Completion {
        Completion::new(self.completion.clone())
    }

    pub fn is_started(&self) -> bool {
        self.pending.is_none()
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn mode(&self) -> WorkerMode {
        self.mode
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Construct, start, and wait for a dispatcher in one call.
pub async fn run<T: Send + 'static>(
    tasks: Vec<T>,
    worker: Worker<T>,
    config: DispatchConfig,
) -> Result<RunReport, DispatchError> {
    let mut dispatcher = Dispatcher::new(tasks, worker, config)?;
    let completion = dispatcher.finish();
    dispatcher.start()?;
    completion.await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use taskpace_core::ConfigError;

    fn noop() -> Worker<u32> {
        Worker::sync_fn(|_| Ok::<(), WorkerError>(()))
    }

    #[test]
    fn zero_concurrency_rejected_at_construction() {
        let config = DispatchConfig { concurrency: 0, ..DispatchConfig::unpaced(1) };
        let err = Dispatcher::new(vec![1, 2], noop(), config).err().unwrap();
        assert!(matches!(err, DispatchError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let mut dispatcher = Dispatcher::new(vec![1], noop(), DispatchConfig::unpaced(1)).unwrap();
        assert!(matches!(dispatcher.start(), Err(DispatchError::NoRuntime)));
        // Nothing consumed, so it can still be started later.
        assert!(!dispatcher.is_started());
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let mut dispatcher = Dispatcher::new(vec![1, 2, 3], noop(), DispatchConfig::unpaced(2)).unwrap();
        dispatcher.start().unwrap();
        assert!(matches!(dispatcher.start(), Err(DispatchError::AlreadyStarted)));
        let report = dispatcher.finish().await.unwrap();
        assert_eq!(report.finished, 3);
    }

    #[tokio::test]
    async fn dropped_before_start_abandons_waiters() {
        let dispatcher = Dispatcher::new(vec![1], noop(), DispatchConfig::unpaced(1)).unwrap();
        let completion = dispatcher.finish();
        drop(dispatcher);
        assert!(matches!(completion.await, Err(DispatchError::Abandoned)));
    }

    #[test]
    fn accessors_reflect_construction() {
        let dispatcher = Dispatcher::new(vec![1, 2], noop(), DispatchConfig::default()).unwrap();
        assert_eq!(dispatcher.total(), 2);
        assert_eq!(dispatcher.mode(), WorkerMode::Sync);
        assert_eq!(dispatcher.config().concurrency, 3);
        assert!(!dispatcher.finish().is_done());
    }
}
