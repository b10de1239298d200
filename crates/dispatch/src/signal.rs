//! One-shot completion signal.
//!
//! The event loop fulfills the signal once, when the run drains. Any number
//! of [`Completion`] handles can be requested, before or after that point;
//! a handle requested after fulfillment resolves on its first poll.

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use tokio::sync::watch;

use crate::error::DispatchError;
use crate::report::RunReport;

/// Terminal state of a run.
#[derive(Debug, Clone)]
pub(crate) enum RunState {
    Drained(RunReport),
    Aborted {
        index: usize,
        message: String,
        report: RunReport,
    },
}

impl RunState {
    fn into_result(self) -> Result<RunReport, DispatchError> {
        match self {
            RunState::Drained(report) => Ok(report),
            RunState::Aborted { index, message, report } => Err(DispatchError::Aborted {
                index,
                message,
                report: Box::new(report),
            }),
        }
    }
}

/// Producer side, owned by whoever drives the run.
#[derive(Debug)]
pub(crate) struct CompletionSignal {
    tx: watch::Sender<Option<RunState>>,
}

impl CompletionSignal {
    pub(crate) fn new() -> (Self, watch::Receiver<Option<RunState>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    /// Store the terminal state. Returns `false` if it was already set.
    pub(crate) fn fulfill(&self, state: RunState) -> bool {
        let mut state = Some(state);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = state.take();
            true
        })
    }
}

/// Handle returned by [`Dispatcher::finish`](crate::Dispatcher::finish).
///
/// Resolves once with the run's report, or with an error if the run was
/// aborted or its driver went away.
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<Option<RunState>>,
}

impl Completion {
    pub(crate) fn new(rx: watch::Receiver<Option<RunState>>) -> Self {
        Self { rx }
    }

    /// Whether the run has already reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub async fn wait(mut self) -> Result<RunReport, DispatchError> {
        // Already satisfied.
        let current = self.rx.borrow_and_update().clone();
        if let Some(state) = current {
            return state.into_result();
        }
        while self.rx.changed().await.is_ok() {
            let current = self.rx.borrow_and_update().clone();
            if let Some(state) = current {
                return state.into_result();
            }
        }
        // Sender gone; it may still have stored a value on its way out.
        let last = self.rx.borrow().clone();
        match last {
            Some(state) => state.into_result(),
            None => Err(DispatchError::Abandoned),
        }
    }
}

impl IntoFuture for Completion {
    type Output = Result<RunReport, DispatchError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
