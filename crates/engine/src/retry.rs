//! Transactional retry wrapper
//!
//! Contains RetryConfig and `with_retry`, the scope every batch commit runs
//! in: begin, run the unit of work, commit; on transient contention roll
//! back, sleep a random backoff and try again.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use coldstore_core::{Error, RecordStore, Result};

// ============================================================================
// Retry Configuration
// ============================================================================

/// Configuration for batch retry behavior
///
/// Backoff is drawn uniformly from `[min_backoff_ms, max_backoff_ms)` before
/// each retry. `max_retries` counts retries, not attempts: the default of 2
/// allows three attempts in total.
///
/// # Example
/// ```
/// use coldstore_engine::RetryConfig;
///
/// let config = RetryConfig::default().with_max_retries(5).with_backoff_ms(10, 50);
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: usize,
    /// Lower bound of the random backoff in milliseconds
    pub min_backoff_ms: u64,
    /// Upper bound (exclusive) of the random backoff in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_backoff_ms: 500,
            max_backoff_ms: 5500,
        }
    }
}

impl RetryConfig {
    /// Create a new RetryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a RetryConfig with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Keep the retry budget but never sleep
    pub fn immediate() -> Self {
        Self::default().with_backoff_ms(0, 0)
    }

    /// Set maximum number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff range
    pub fn with_backoff_ms(mut self, min_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        self.min_backoff_ms = min_backoff_ms;
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    /// Check that the backoff range is well formed
    pub fn validate(&self) -> Result<()> {
        if self.min_backoff_ms > self.max_backoff_ms {
            return Err(Error::invalid_input(format!(
                "retry min_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.min_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// Draw a backoff delay
    pub(crate) fn calculate_delay(&self) -> Duration {
        if self.max_backoff_ms <= self.min_backoff_ms {
            return Duration::from_millis(self.min_backoff_ms);
        }
        let ms = rand::thread_rng().gen_range(self.min_backoff_ms..self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

// ============================================================================
// Scoped execution
// ============================================================================

/// Run `f` inside a store transaction, retrying on transient contention
///
/// Commits on success. On failure the transaction is rolled back; transient
/// errors are retried up to `config.max_retries` times, anything else (or
/// the last transient error) is returned unmodified.
///
/// `label` names the unit of work in logs.
pub fn with_retry<S, T, F>(store: &S, config: &RetryConfig, label: &str, mut f: F) -> Result<T>
where
    S: RecordStore + ?Sized,
    F: FnMut(&S) -> Result<T>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        store.begin()?;
        let outcome = f(store).and_then(|value| store.commit().map(|_| value));

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => {
                if let Err(rollback_err) = store.rollback() {
                    // Commit failures may already have closed the transaction
                    tracing::debug!(target: "coldstore::retry", unit = label, error = %rollback_err, "Rollback skipped");
                }
                if e.is_transient() && attempt < config.max_retries {
                    let delay = config.calculate_delay();
                    warn!(
                        target: "coldstore::retry",
                        unit = label,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient contention, retrying"
                    );
                    last_error = Some(e);
                    std::thread::sleep(delay);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| Error::Transaction("retry loop exited without a result".to_string())))
}
