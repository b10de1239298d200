//! Demo runs mirroring how the dispatcher is meant to be used.

use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::{info, warn};

use taskpace_dispatch::{
    DispatchConfig, DispatchError, Dispatcher, QueueError, RunReport, TaskQueue, Worker, WorkerError,
};

/// Dummy task inputs: `task-0`, `task-1`, ...
pub fn dummy_tasks(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("task-{i}")).collect()
}

/// Synchronous worker that blocks for `work` per task.
pub async fn run_sync(config: &DispatchConfig, tasks: usize, work: Duration, json: bool) -> Result<()> {
    info!("Testing sync worker");
    let worker = Worker::sync_fn(move |task: String| {
        std::thread::sleep(work);
        tracing::debug!(%task, "sync task done");
        Ok(())
    });
    dispatch(config.clone(), dummy_tasks(tasks), worker, json).await
}

/// Asynchronous worker, first with the configured pacing, then unpaced.
pub async fn run_async(config: &DispatchConfig, tasks: usize, work: Duration, json: bool) -> Result<()> {
    let worker = Worker::async_fn(move |task: String| async move {
        tokio::time::sleep(work).await;
        tracing::debug!(%task, "async task done");
        Ok::<(), WorkerError>(())
    });

    info!("Testing async worker");
    dispatch(config.clone(), dummy_tasks(tasks), worker.clone(), json).await?;

    info!("Testing async worker without delay");
    let unpaced = DispatchConfig {
        nominal_delay_ms: 0,
        jitter_ms: 0,
        ..config.clone()
    };
    dispatch(unpaced, dummy_tasks(tasks), worker, json).await
}

async fn dispatch(
    config: DispatchConfig,
    tasks: Vec<String>,
    worker: Worker<String>,
    json: bool,
) -> Result<()> {
    let mut dispatcher = Dispatcher::new(tasks, worker, config)?;
    dispatcher.start()?;
    match dispatcher.finish().await {
        Ok(report) => {
            print_report(&report, json);
            Ok(())
        }
        Err(DispatchError::Aborted { index, message, report }) => {
            print_report(&report, json);
            warn!(index, %message, "Run aborted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &RunReport, json: bool) {
    report.log_summary();
    if json {
        println!("{}", report.to_json());
    }
}

async fn sleep(work: Duration) -> Result<Duration, WorkerError> {
    tokio::time::sleep(work).await;
    Ok(work)
}

/// Sleeps like [`sleep`] but refuses about half the time.
async fn broken_sleep(work: Duration) -> Result<Duration, WorkerError> {
    let refuse = rand::thread_rng().gen_bool(0.5);
    if refuse {
        return Err(WorkerError::msg("I don't want to sleep."));
    }
    tokio::time::sleep(work).await;
    Ok(work)
}

/// Open-ended queue: a batch of normal sleeps, then a batch of flaky ones.
pub async fn run_queue(concurrency: usize, jobs: usize, work: Duration) -> Result<()> {
    let queue = TaskQueue::new(concurrency)?;

    info!(concurrency, jobs, "Queue: normal sleep");
    let handles: Vec<_> = (0..jobs).map(|_| queue.queue(move || sleep(work))).collect();
    for (i, handle) in handles.into_iter().enumerate() {
        if let Err(e) = handle.await {
            warn!(job = i, error = %e, "Queued job failed");
        }
    }

    info!(concurrency, jobs, "Queue: broken sleep");
    let handles: Vec<_> = (0..jobs).map(|_| queue.queue(move || broken_sleep(work))).collect();
    let mut failed = 0usize;
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(slept) => info!(job = i, slept_ms = slept.as_millis() as u64, "Queued job finished"),
            Err(QueueError::Job(e)) => {
                failed += 1;
                warn!(job = i, error = %e, "Queued job failed");
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(failed, succeeded = jobs - failed, "Queue: broken sleep done");
    Ok(())
}
