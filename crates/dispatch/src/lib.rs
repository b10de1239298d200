//! Bounded-concurrency task dispatch with jittered pacing.
//!
//! This crate provides:
//! - `Dispatcher` running a fixed task list through at most N concurrent slots
//! - `Worker` contract with explicit sync and async variants
//! - Jitter helpers for pacing successive tasks in a slot
//! - `Completion` one-shot signal resolving with a `RunReport`
//! - `TaskQueue` for open-ended submission with per-job results

pub mod dispatcher;
pub mod error;
pub mod jitter;
pub mod queue;
pub mod report;
pub mod scheduler;
pub mod signal;
pub mod worker;

pub use dispatcher::{run, Dispatcher};
pub use error::{DispatchError, QueueError, WorkerError};
pub use jitter::{jitter, paced_delay};
pub use queue::{QueueHandle, TaskQueue};
pub use report::{RunReport, TaskFailure};
pub use signal::Completion;
pub use taskpace_core::{DispatchConfig, FailurePolicy};
pub use worker::{detect_mode, AsyncWorker, SyncWorker, Worker, WorkerMode};
