//! Outcome of a dispatcher run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::worker::WorkerMode;

/// A task whose worker reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub index: usize,
    pub message: String,
}

/// Summary handed out by the completion signal once a run has drained.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: WorkerMode,
    /// Number of tasks in the task list.
    pub total: usize,
    /// Tasks claimed by a slot.
    pub scheduled: usize,
    /// Tasks whose worker invocation returned or resolved, failed or not.
    pub finished: usize,
    pub slots_started: usize,
    /// Tasks completed by each slot, indexed by slot id.
    pub completed_per_slot: Vec<usize>,
    pub failures: Vec<TaskFailure>,
    /// Indices claimed before an abort whose worker never ran.
    pub skipped: Vec<usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Every task finished and none reported failure.
    pub fn is_clean(&self) -> bool {
        self.finished == self.total && self.failures.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.finished.saturating_sub(self.failures.len())
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Log a one-line summary at info level.
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            mode = %self.mode,
            total = self.total,
            finished = self.finished,
            failed = self.failures.len(),
            skipped = self.skipped.len(),
            slots = self.slots_started,
            elapsed_ms = self.elapsed_ms(),
            "Run report"
        );
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(total: usize, finished: usize, failures: Vec<TaskFailure>) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: Uuid::new_v4(),
            mode: WorkerMode::Async,
            total,
            scheduled: finished,
            finished,
            slots_started: 2,
            completed_per_slot: vec![finished / 2, finished - finished / 2],
            failures,
            skipped: vec![],
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn clean_run() {
        let r = report(4, 4, vec![]);
        assert!(r.is_clean());
        assert_eq!(r.succeeded(), 4);
    }

    #[test]
    fn failures_make_run_unclean() {
        let r = report(4, 4, vec![TaskFailure { index: 1, message: "boom".into() }]);
        assert!(!r.is_clean());
        assert_eq!(r.succeeded(), 3);
    }

    #[test]
    fn json_includes_cursor_and_mode() {
        let json = report(2, 2, vec![]).to_json();
        assert_eq!(json["total"], 2);
        assert_eq!(json["finished"], 2);
        assert_eq!(json["mode"], "async");
    }
}
