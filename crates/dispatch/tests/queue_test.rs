//! Task queue: width limit and per-job error surfacing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use taskpace_dispatch::{QueueError, TaskQueue, WorkerError};

async fn sleep(ms: u64) -> Result<u64, WorkerError> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(ms)
}

/// Deterministic stand-in for a sleep that refuses half the time.
async fn broken_sleep(id: usize, ms: u64) -> Result<u64, WorkerError> {
    if id % 2 == 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ms)
    } else {
        Err(WorkerError::msg("I don't want to sleep."))
    }
}

#[tokio::test(start_paused = true)]
async fn never_exceeds_width() {
    let queue = TaskQueue::new(5).unwrap();
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..15)
        .map(|_| {
            let (current, peak) = (current.clone(), peak.clone());
            queue.queue(move || async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                let slept = sleep(1000).await;
                current.fetch_sub(1, Ordering::SeqCst);
                slept
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1000);
    }
    assert_eq!(peak.load(Ordering::SeqCst), 5);
    assert_eq!(queue.submitted(), 15);
    assert_eq!(queue.in_flight(), 0);
    assert_eq!(queue.waiting(), 0);
}

#[tokio::test(start_paused = true)]
async fn counters_track_running_and_waiting_jobs() {
    let queue = TaskQueue::new(2).unwrap();
    let handles: Vec<_> = (0..5).map(|_| queue.queue(|| sleep(500))).collect();

    // Let the spawned jobs reach the semaphore.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(queue.in_flight(), 2);
    assert_eq!(queue.waiting(), 3);

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(queue.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn failures_are_surfaced_per_job() {
    let queue = TaskQueue::new(5).unwrap();
    let handles: Vec<_> = (0..15)
        .map(|id| queue.queue(move || broken_sleep(id, 1000)))
        .collect();

    let mut ok = 0;
    let mut failed = 0;
    for (id, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(ms) => {
                assert_eq!(id % 2, 0);
                assert_eq!(ms, 1000);
                ok += 1;
            }
            Err(QueueError::Job(WorkerError::Failed(msg))) => {
                assert_eq!(id % 2, 1);
                assert_eq!(msg, "I don't want to sleep.");
                failed += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(ok, 8);
    assert_eq!(failed, 7);
}

#[tokio::test(start_paused = true)]
async fn jobs_can_be_submitted_after_earlier_ones_finish() {
    let queue = TaskQueue::new(1).unwrap();
    assert_eq!(queue.queue(|| sleep(10)).await.unwrap(), 10);
    let second = queue.queue(|| sleep(20));
    assert_eq!(second.id(), 1);
    assert_eq!(second.await.unwrap(), 20);
}
