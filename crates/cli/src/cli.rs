use clap::{Parser, ValueEnum};
use taskpace_core::FailurePolicy;

/// Demo driver for the taskpace dispatcher.
///
/// Runs a batch of dummy tasks through the dispatcher (and the open-ended
/// task queue) so pacing, width, and failure handling can be watched in
/// the logs.
#[derive(Parser, Debug)]
#[command(name = "taskpace", version, about = "Bounded-concurrency task dispatch demo")]
pub struct CliArgs {
    /// Which demo to run
    #[arg(long, value_enum, default_value_t = Scenario::All)]
    pub scenario: Scenario,

    /// Number of dummy tasks
    #[arg(long, env = "TASKPACE_TASKS", default_value_t = 105)]
    pub tasks: usize,

    /// Simulated work per task in milliseconds
    #[arg(long, default_value_t = 500)]
    pub work_ms: u64,

    /// Path to a TOML dispatch config (default: environment / .env)
    #[arg(long)]
    pub config: Option<String>,

    /// Nominal delay between tasks in a slot (overrides config)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Max jitter added to the delay (overrides config)
    #[arg(long)]
    pub jitter_ms: Option<u64>,

    /// Concurrent slots (overrides config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// What to do when a task fails: continue or abort (overrides config)
    #[arg(long)]
    pub failure_policy: Option<FailurePolicy>,

    /// Log every schedule and completion event
    #[arg(long)]
    pub debug: bool,

    /// Print each run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Synchronous worker
    Sync,
    /// Asynchronous worker, paced and then unpaced
    Async,
    /// Open-ended queue with a well-behaved and a flaky job
    Queue,
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["taskpace"]);
        assert_eq!(args.scenario, Scenario::All);
        assert_eq!(args.work_ms, 500);
        assert!(args.delay_ms.is_none());
        assert!(!args.debug);
    }

    #[test]
    fn overrides_parse() {
        let args = CliArgs::parse_from([
            "taskpace",
            "--scenario",
            "queue",
            "--concurrency",
            "10",
            "--failure-policy",
            "abort",
            "--delay-ms",
            "0",
        ]);
        assert_eq!(args.scenario, Scenario::Queue);
        assert_eq!(args.concurrency, Some(10));
        assert_eq!(args.failure_policy, Some(FailurePolicy::Abort));
        assert_eq!(args.delay_ms, Some(0));
    }
}
