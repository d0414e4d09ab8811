//! Reconciliation Config

use std::{path::PathBuf, time::Duration};

use clap::Args;
use trellis::conflicts::{ConflictRulesError, MarkerConflictPredicate};

use crate::{cleanup::SettlePolicy, retry::RetryPolicy};

/// Cleanup, retry and deadline settings.
#[derive(Debug, Clone, Args)]
pub struct ReconcileConfig {
    /// Delay between settle listings, in milliseconds
    #[arg(long, env = "TRELLIS_SETTLE_INTERVAL_MS", default_value_t = 500)]
    pub settle_interval_ms: u64,

    /// Settle listings before continuing unconfirmed
    #[arg(long, env = "TRELLIS_SETTLE_ATTEMPTS", default_value_t = 6)]
    pub settle_attempts: u32,

    /// Wait this long after deleting instead of polling, in milliseconds
    #[arg(long, env = "TRELLIS_SETTLE_FIXED_MS", conflicts_with = "settle_interval_ms")]
    pub settle_fixed_ms: Option<u64>,

    /// Attempts per store read or delete, including the first
    #[arg(long, env = "TRELLIS_RETRY_ATTEMPTS", default_value_t = 3)]
    pub retry_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "TRELLIS_RETRY_INITIAL_DELAY_MS", default_value_t = 250)]
    pub retry_initial_delay_ms: u64,

    /// Upper bound for any retry delay, in milliseconds
    #[arg(long, env = "TRELLIS_RETRY_MAX_DELAY_MS", default_value_t = 2_000)]
    pub retry_max_delay_ms: u64,

    /// Deadline for one normalize, cleanup and create run, in seconds
    #[arg(long, env = "TRELLIS_DEADLINE_SECS", default_value_t = 60)]
    pub deadline_secs: u64,

    /// YAML file with conflict markers and rules
    #[arg(long, env = "TRELLIS_CONFLICT_RULES")]
    pub conflict_rules: Option<PathBuf>,
}

impl ReconcileConfig {
    #[must_use]
    pub fn settle_policy(&self) -> SettlePolicy {
        match self.settle_fixed_ms {
            Some(ms) => SettlePolicy::Fixed(Duration::from_millis(ms)),
            None => SettlePolicy::Poll {
                interval: Duration::from_millis(self.settle_interval_ms),
                max_attempts: self.settle_attempts,
            },
        }
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Conflict rules from `--conflict-rules`, or the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the rules file cannot be read or parsed.
    pub fn conflict_predicate(&self) -> Result<MarkerConflictPredicate, ConflictRulesError> {
        self.conflict_rules
            .as_ref()
            .map_or_else(
                || Ok(MarkerConflictPredicate::default()),
                MarkerConflictPredicate::from_path,
            )
    }
}
