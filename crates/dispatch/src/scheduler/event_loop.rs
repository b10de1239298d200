use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use taskpace_core::{DispatchConfig, FailurePolicy};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::WorkerError;
use crate::jitter::paced_delay;
use crate::report::{RunReport, TaskFailure};
use crate::signal::{CompletionSignal, RunState};
use crate::worker::{Worker, WorkerMode};

use super::cursor::Cursor;
use super::slot::Slot;

/// Per-schedule / per-completion events: `debug` when the config asks for
/// them, `trace` otherwise.
macro_rules! pace_event {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// Reports from timers and async workers back to the loop.
#[derive(Debug)]
enum SlotEvent {
    /// Pacing delay elapsed for a claimed index.
    Due { slot: usize, index: usize },
    Finished {
        slot: usize,
        index: usize,
        outcome: Result<(), WorkerError>,
    },
}

/// Owns the cursor and every slot. All mutation happens on the task running
/// [`EventLoop::run`]; timers and async workers only send events.
pub(crate) struct EventLoop<T> {
    run_id: Uuid,
    tasks: Vec<Option<T>>,
    worker: Worker<T>,
    mode: WorkerMode,
    config: DispatchConfig,
    cursor: Cursor,
    slots: Vec<Slot>,
    /// Claimed indices to execute without a timer.
    ready: VecDeque<(usize, usize)>,
    failures: Vec<TaskFailure>,
    /// Claimed indices dropped after an abort, before their worker ran.
    skipped: Vec<usize>,
    abort: Option<TaskFailure>,
    events_tx: mpsc::UnboundedSender<SlotEvent>,
    events_rx: mpsc::UnboundedReceiver<SlotEvent>,
    signal: CompletionSignal,
    started_at: DateTime<Utc>,
}

impl<T: Send + 'static> EventLoop<T> {
    pub(crate) fn new(
        run_id: Uuid,
        tasks: Vec<T>,
        worker: Worker<T>,
        mode: WorkerMode,
        config: DispatchConfig,
        signal: CompletionSignal,
    ) -> Self {
        let total = tasks.len();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            run_id,
            tasks: tasks.into_iter().map(Some).collect(),
            worker,
            mode,
            cursor: Cursor::new(total),
            slots: Vec::with_capacity(config.concurrency.min(total)),
            ready: VecDeque::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            abort: None,
            events_tx,
            events_rx,
            signal,
            started_at: Utc::now(),
            config,
        }
    }

    /// Drive the run to its terminal state and fulfill the completion signal.
    pub(crate) async fn run(mut self) {
        info!(
            run_id = %self.run_id,
            tasks = self.cursor.total(),
            concurrency = self.config.concurrency,
            paced = self.config.is_paced(),
            mode = %self.mode,
            "Dispatch run starting"
        );
        self.start_slots();

        loop {
            while let Some((slot, index)) = self.ready.pop_front() {
                self.execute(slot, index);
            }
            if self.is_complete() {
                break;
            }
            // The loop holds a sender itself, so `None` never happens while it runs.
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            match event {
                SlotEvent::Due { slot, index } => self.execute(slot, index),
                SlotEvent::Finished { slot, index, outcome } => {
                    self.on_finished(slot, index, outcome)
                }
            }
        }

        let state = self.terminal_state();
        info!(
            run_id = %self.run_id,
            scheduled = self.cursor.scheduled(),
            finished = self.cursor.finished(),
            failed = self.failures.len(),
            skipped = self.skipped.len(),
            aborted = self.abort.is_some(),
            "Dispatch run drained"
        );
        self.signal.fulfill(state);
    }

    /// Claim one index per slot and queue it for immediate execution.
    fn start_slots(&mut self) {
        for id in 0..self.config.concurrency {
            let Some(index) = self.cursor.claim() else {
                break;
            };
            let mut slot = Slot::new(id);
            slot.assign(index);
            pace_event!(self.config.debug, index, slot = id, delay_ms = 0u64, "Task scheduled");
            self.slots.push(slot);
            self.ready.push_back((id, index));
        }
    }

    fn execute(&mut self, slot: usize, index: usize) {
        if self.abort.is_some() {
            self.skip(slot, index);
            return;
        }
        self.slots[slot].begin(index);
        let Some(task) = self.tasks[index].take() else {
            error!(run_id = %self.run_id, index, slot, "Task input already consumed");
            let outcome = Err(WorkerError::Failed(format!("input for task {index} was already consumed")));
            self.on_finished(slot, index, outcome);
            return;
        };

        let outcome = match &self.worker {
            Worker::Sync(worker) => {
                let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| worker.run(task)))
                    .unwrap_or_else(|payload| Err(WorkerError::from_panic(payload)));
                Some(outcome)
            }
            Worker::Async(worker) => {
                let worker = Arc::clone(worker);
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let outcome = AssertUnwindSafe(worker.run(task))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| Err(WorkerError::from_panic(payload)));
                    // Receiver only goes away with the loop itself.
                    let _ = events.send(SlotEvent::Finished { slot, index, outcome });
                });
                None
            }
        };

        if let Some(outcome) = outcome {
            self.on_finished(slot, index, outcome);
        }
    }

    /// Drop a claimed index that has not started yet. Only happens after an abort.
    fn skip(&mut self, slot: usize, index: usize) {
        if !self.cursor.cancel() {
            error!(run_id = %self.run_id, index, slot, "Skipped task was not in flight");
        }
        self.slots[slot].cancel(index);
        self.tasks[index] = None;
        self.skipped.push(index);
        pace_event!(self.config.debug, index, slot, "Task skipped after abort");
    }

    fn on_finished(&mut self, slot: usize, index: usize, outcome: Result<(), WorkerError>) {
        if !self.cursor.finish() {
            error!(run_id = %self.run_id, index, slot, "Finished task was not in flight");
        }
        self.slots[slot].complete(index);

        match outcome {
            Ok(()) => {
                pace_event!(self.config.debug, index, slot, "Task finished");
            }
            Err(e) => {
                warn!(run_id = %self.run_id, index, slot, error = %e, "Task failed");
                let failure = TaskFailure { index, message: e.to_string() };
                if self.config.failure_policy == FailurePolicy::Abort && self.abort.is_none() {
                    warn!(run_id = %self.run_id, index, "Aborting run, no further tasks will be claimed");
                    self.abort = Some(failure.clone());
                }
                self.failures.push(failure);
            }
        }

        self.advance(slot);
    }

    /// Claim the next index for `slot`, or drain it.
    fn advance(&mut self, slot: usize) {
        if self.abort.is_some() {
            self.slots[slot].drain();
            return;
        }
        let Some(index) = self.cursor.claim() else {
            self.slots[slot].drain();
            return;
        };
        self.slots[slot].assign(index);

        match paced_delay(self.config.nominal_delay_ms, self.config.jitter_ms) {
            None => {
                pace_event!(self.config.debug, index, slot, delay_ms = 0u64, "Task scheduled");
                self.ready.push_back((slot, index));
            }
            Some(delay) => {
                pace_event!(
                    self.config.debug,
                    index,
                    slot,
                    delay_ms = delay.as_millis() as u64,
                    "Task scheduled"
                );
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events.send(SlotEvent::Due { slot, index });
                });
            }
        }
    }

    fn is_complete(&self) -> bool {
        let settled = if self.abort.is_some() {
            self.cursor.in_flight() == 0
        } else {
            self.cursor.is_drained()
        };
        settled && self.slots.iter().all(Slot::is_drained)
    }

    fn report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id,
            mode: self.mode,
            total: self.cursor.total(),
            scheduled: self.cursor.scheduled(),
            finished: self.cursor.finished(),
            slots_started: self.slots.len(),
            completed_per_slot: self.slots.iter().map(Slot::completed).collect(),
            failures: self.failures.clone(),
            skipped: self.skipped.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    fn terminal_state(&self) -> RunState {
        let report = self.report();
        match &self.abort {
            Some(failure) => RunState::Aborted {
                index: failure.index,
                message: failure.message.clone(),
                report,
            },
            None => RunState::Drained(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::signal::Completion;

    #[tokio::test]
    async fn missing_task_input_fails_the_index_instead_of_hanging() {
        let worker = Worker::sync_fn(|_: u32| Ok::<(), WorkerError>(()));
        let (signal, rx) = CompletionSignal::new();
        let mut event_loop = EventLoop::new(
            Uuid::new_v4(),
            vec![10, 11, 12],
            worker,
            WorkerMode::Sync,
            DispatchConfig::unpaced(1),
            signal,
        );
        event_loop.tasks[1] = None;

        tokio::time::timeout(std::time::Duration::from_secs(1), event_loop.run())
            .await
            .expect("run should drain");

        let report = Completion::new(rx).await.unwrap();
        assert_eq!(report.finished, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(report.skipped.is_empty());
    }
}
