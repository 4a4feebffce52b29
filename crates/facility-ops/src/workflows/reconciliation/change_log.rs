//! Best-effort change recording for financial mutations.
//!
//! The recorder runs after the primary write has committed. It retries the sink a bounded
//! number of times and reports the outcome, but a record that cannot be written is only logged:
//! callers never roll back or fail the primary mutation because of it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::config::ChangeLogConfig;

use super::domain::{Amount, BusinessId, CostKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Updated,
    Deleted,
}

impl ChangeAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// Human-readable trail entry for one cost mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub business_id: BusinessId,
    pub change_type: CostKind,
    pub action: ChangeAction,
    pub before: Option<Amount>,
    pub after: Option<Amount>,
    pub description: String,
    pub author_name: String,
    pub recorded_at: DateTime<Utc>,
}

/// Destination for change records (audit table, log shipper, ...).
pub trait ChangeLogSink: Send + Sync {
    fn append(&self, record: &ChangeRecord) -> Result<(), ChangeLogError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeLogError {
    #[error("change log unavailable: {0}")]
    Unavailable(String),
    #[error("change log rejected record: {0}")]
    Rejected(String),
}

/// Delay source for retry backoff so tests can run without wall-clock waits.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread. Async callers should run the recorder on a blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ChangeLogConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Total sleep of a record that exhausts the budget; the latency a down sink adds to a
    /// cost change.
    pub fn worst_case_backoff(&self) -> Duration {
        (1..=self.max_retries)
            .map(|retry| self.delay_for(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ChangeLogConfig::default())
    }
}

/// What happened to a change record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordingOutcome {
    Recorded { attempts: u32 },
    Abandoned { attempts: u32, last_error: String },
}

impl RecordingOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordingOutcome::Recorded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RecordingOutcome::Recorded { attempts } | RecordingOutcome::Abandoned { attempts, .. } => {
                *attempts
            }
        }
    }
}

pub struct ChangeRecorder<L, Z = ThreadSleeper> {
    sink: Arc<L>,
    sleeper: Arc<Z>,
    policy: RetryPolicy,
}

impl<L> ChangeRecorder<L, ThreadSleeper>
where
    L: ChangeLogSink,
{
    pub fn new(sink: Arc<L>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(sink, Arc::new(ThreadSleeper), policy)
    }
}

impl<L, Z> ChangeRecorder<L, Z>
where
    L: ChangeLogSink,
    Z: Sleeper,
{
    pub fn with_sleeper(sink: Arc<L>, sleeper: Arc<Z>, policy: RetryPolicy) -> Self {
        Self {
            sink,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Writes `record` once, retrying within the budget. Never returns an error.
    pub fn record(&self, record: &ChangeRecord) -> RecordingOutcome {
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let last_error = match self.sink.append(record) {
                Ok(()) => return RecordingOutcome::Recorded { attempts: attempt },
                Err(err) => err,
            };

            if attempt >= max_attempts {
                error!(
                    business_id = %record.business_id,
                    change_type = record.change_type.label(),
                    attempts = attempt,
                    error = %last_error,
                    "change record abandoned; primary mutation stands"
                );
                return RecordingOutcome::Abandoned {
                    attempts: attempt,
                    last_error: last_error.to_string(),
                };
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                business_id = %record.business_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "change record write failed, retrying"
            );
            self.sleeper.sleep(delay);
        }
    }
}

/// `"operating cost updated: 120,000 -> 150,000"` style summary.
pub fn describe_cost_change(
    kind: CostKind,
    label: Option<&str>,
    action: ChangeAction,
    before: Option<Amount>,
    after: Option<Amount>,
) -> String {
    let subject = match label {
        Some(label) if !label.trim().is_empty() => format!("{} '{}'", kind.label(), label.trim()),
        _ => kind.label().to_string(),
    };

    match action {
        ChangeAction::Added => format!(
            "{subject} added: {}",
            format_amount(after.unwrap_or_default())
        ),
        ChangeAction::Updated => format!(
            "{subject} updated: {} -> {}",
            format_amount(before.unwrap_or_default()),
            format_amount(after.unwrap_or_default())
        ),
        ChangeAction::Deleted => format!(
            "{subject} deleted (was {})",
            format_amount(before.unwrap_or_default())
        ),
    }
}

/// Thousands-separated rendering, e.g. `-1,250,000`.
pub fn format_amount(amount: Amount) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
