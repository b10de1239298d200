use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

/// Parse a profiled env var, keeping `default` when it is unset.
///
/// Unlike a silent fallback, a value that is present but unparsable is an
/// error: `TASKPACE_DELAY_MS=-5` must not quietly become the default.
fn profiled_env_parse<T: FromStr>(
    profile: &str,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match profiled_env_opt(profile, key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            field: key,
            reason: format!("cannot parse '{raw}'"),
        }),
        None => Ok(default),
    }
}

fn profiled_env_bool(profile: &str, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match profiled_env_opt(profile, key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                field: key,
                reason: format!("expected a boolean, got '{raw}'"),
            }),
        },
        None => Ok(default),
    }
}

// ── Failure policy ────────────────────────────────────────────

/// What the dispatcher does when a worker reports failure for a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure, count the task as finished, keep going.
    #[default]
    Continue,
    /// Stop claiming new tasks; let in-flight ones finish; fail the run.
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Continue => write!(f, "continue"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(ConfigError::Invalid {
                field: "failure_policy",
                reason: format!("expected 'continue' or 'abort', got '{other}'"),
            }),
        }
    }
}

// ── Dispatch config ───────────────────────────────────────────

/// Dispatcher configuration. Read once at construction, immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Nominal delay between two tasks in the same slot, in milliseconds.
    /// Zero disables the pacing timer entirely.
    #[serde(default = "default_delay_ms")]
    pub nominal_delay_ms: u64,
    /// Largest absolute deviation added to the nominal delay, in milliseconds.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
    /// Number of slots running tasks at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Emit a debug event per schedule and per completion.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_delay_ms() -> u64 { 1000 }
fn default_jitter_ms() -> u64 { 100 }
fn default_concurrency() -> usize { 3 }

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            nominal_delay_ms: default_delay_ms(),
            jitter_ms: default_jitter_ms(),
            concurrency: default_concurrency(),
            debug: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl DispatchConfig {
    /// A config that runs tasks back to back with no pacing timer.
    pub fn unpaced(concurrency: usize) -> Self {
        Self {
            nominal_delay_ms: 0,
            jitter_ms: 0,
            concurrency,
            ..Self::default()
        }
    }

    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TASKPACE_PROFILE`. When set (e.g. `BULK`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_or("TASKPACE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let failure_policy = match profiled_env_opt(p, "TASKPACE_FAILURE_POLICY") {
            Some(raw) => raw.parse()?,
            None => FailurePolicy::default(),
        };
        let config = Self {
            nominal_delay_ms: profiled_env_parse(p, "TASKPACE_DELAY_MS", default_delay_ms())?,
            jitter_ms: profiled_env_parse(p, "TASKPACE_JITTER_MS", default_jitter_ms())?,
            concurrency: profiled_env_parse(p, "TASKPACE_CONCURRENCY", default_concurrency())?,
            debug: profiled_env_bool(p, "TASKPACE_DEBUG", false)?,
            failure_policy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the dispatcher cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        for (field, value) in [("nominal_delay_ms", self.nominal_delay_ms), ("jitter_ms", self.jitter_ms)] {
            if i64::try_from(value).is_err() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} does not fit in a signed 64-bit millisecond count"),
                });
            }
        }
        Ok(())
    }

    /// Whether successive tasks in a slot wait on a timer at all.
    pub fn is_paced(&self) -> bool {
        self.nominal_delay_ms > 0
    }

    /// Print a one-line summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            delay_ms = self.nominal_delay_ms,
            jitter_ms = self.jitter_ms,
            concurrency = self.concurrency,
            debug = self.debug,
            failure_policy = %self.failure_policy,
            "Dispatch config loaded"
        );
    }
}
