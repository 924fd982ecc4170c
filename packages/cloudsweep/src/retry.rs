//! Generic backoff/jitter retry engine.
//!
//! Wraps an arbitrary fallible async operation and re-runs it according to
//! a validated [`RetryConfig`]. Transport adapters use it around sink
//! delivery; extractors use it to ride out provider throttling. The
//! orchestrator itself never retries; retry decisions live with whoever
//! owns the failing call.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cloudsweep::retry::{RetryConfig, RetryPolicy, BackoffStrategy, JitterMode};
//!
//! let config = RetryConfig::new()
//!     .with_max_attempts(4)
//!     .with_base_delay(Duration::from_millis(250))
//!     .with_jitter(JitterMode::Full);
//! let policy = RetryPolicy::new(config)?;
//!
//! let value = policy.execute(|| client.fetch_page()).await?;
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

/// Classification of failures for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Provider or sink rate limiting (HTTP 429 and friends)
    Throttled,
    /// Operation timed out
    Timeout,
    /// Connection-level network failure
    Network,
    /// Remote service error (HTTP 5xx)
    Server,
    /// Authentication or authorization failure
    Auth,
    /// Request is fundamentally invalid; retrying cannot help
    Invalid,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Whether failures of this kind are usually worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Throttled | FailureKind::Timeout | FailureKind::Network | FailureKind::Server
        )
    }
}

/// A failure the retry engine can classify.
///
/// Implemented by the crate's error enums; external callers can implement
/// it for their own error types to use [`RetryPolicy`] directly.
pub trait Failure: fmt::Display {
    /// Classify this failure for retry decisions.
    fn kind(&self) -> FailureKind {
        FailureKind::Other
    }
}

/// How the pre-jitter delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// `base * multiplier^attempt`
    Exponential,
    /// `base + base * attempt`
    Linear,
    /// `base` for every attempt
    Fixed,
}

/// Randomized perturbation applied to the computed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterMode {
    /// No jitter; delays are deterministic
    None,
    /// Uniform random in `[0, delay]`
    Full,
    /// `delay ± delay * jitter_factor`, floored at zero
    Equal,
    /// Uniform random in `[base_delay, 3 * previous_delay]` after the
    /// first retry
    Decorrelated,
}

/// Predicate over a failure, consulted after kind filtering.
pub type RetryPredicate = Arc<dyn Fn(&dyn Failure) -> bool + Send + Sync>;

/// Invalid retry configuration, rejected at policy construction.
#[derive(Debug, Error, PartialEq)]
pub enum RetryConfigError {
    /// max_attempts must be at least 1
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    /// base_delay must be greater than zero
    #[error("base_delay must be greater than zero")]
    ZeroBaseDelay,

    /// max_delay must be at least base_delay
    #[error("max_delay ({max:?}) must be at least base_delay ({base:?})")]
    MaxBelowBase { base: Duration, max: Duration },

    /// Exponential backoff needs a multiplier above 1.0
    #[error("multiplier must be greater than 1.0 for exponential backoff, got {0}")]
    MultiplierTooSmall(f64),

    /// jitter_factor must stay within [0.0, 1.0]
    #[error("jitter_factor must be within [0.0, 1.0], got {0}")]
    JitterFactorOutOfRange(f64),
}

/// Retry tuning for a [`RetryPolicy`].
///
/// Invalid combinations are rejected by [`RetryPolicy::new`]; nothing is
/// silently clamped.
#[derive(Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first (≥ 1).
    pub max_attempts: u32,

    /// Delay unit before the first retry (> 0).
    pub base_delay: Duration,

    /// Cap applied to the computed delay before jitter (≥ base_delay).
    pub max_delay: Duration,

    /// Growth factor for [`BackoffStrategy::Exponential`] (> 1.0).
    pub multiplier: f64,

    /// Delay growth strategy.
    pub strategy: BackoffStrategy,

    /// Randomization applied to computed delays.
    pub jitter: JitterMode,

    /// Spread for [`JitterMode::Equal`], in [0.0, 1.0].
    pub jitter_factor: f64,

    /// When set, only failures of these kinds are retried.
    pub retry_on: Option<Vec<FailureKind>>,

    predicate: Option<RetryPredicate>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            strategy: BackoffStrategy::Exponential,
            jitter: JitterMode::None,
            jitter_factor: 0.5,
            retry_on: None,
            predicate: None,
        }
    }
}

impl RetryConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the exponential multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the backoff strategy.
    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the jitter mode.
    pub fn with_jitter(mut self, jitter: JitterMode) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the equal-jitter spread factor.
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Restrict retries to the given failure kinds.
    pub fn retry_on(mut self, kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        self.retry_on = Some(kinds.into_iter().collect());
        self
    }

    /// Restrict retries to transient failure kinds.
    pub fn retry_transient(self) -> Self {
        self.retry_on([
            FailureKind::Throttled,
            FailureKind::Timeout,
            FailureKind::Network,
            FailureKind::Server,
        ])
    }

    /// Add a custom predicate consulted after kind filtering.
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&dyn Failure) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Validate this configuration.
    pub fn validate(&self) -> std::result::Result<(), RetryConfigError> {
        if self.max_attempts < 1 {
            return Err(RetryConfigError::ZeroAttempts);
        }
        if self.base_delay.is_zero() {
            return Err(RetryConfigError::ZeroBaseDelay);
        }
        if self.max_delay < self.base_delay {
            return Err(RetryConfigError::MaxBelowBase {
                base: self.base_delay,
                max: self.max_delay,
            });
        }
        if self.strategy == BackoffStrategy::Exponential && self.multiplier <= 1.0 {
            return Err(RetryConfigError::MultiplierTooSmall(self.multiplier));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(RetryConfigError::JitterFactorOutOfRange(self.jitter_factor));
        }
        Ok(())
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("strategy", &self.strategy)
            .field("jitter", &self.jitter)
            .field("jitter_factor", &self.jitter_factor)
            .field("retry_on", &self.retry_on)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// One recorded attempt of a policy execution.
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    /// 0-based attempt number.
    pub attempt: u32,

    /// Delay waited before this attempt.
    pub delay: Duration,

    /// Captured failure message, if the attempt failed.
    pub error: Option<String>,

    /// When the attempt completed.
    pub at: DateTime<Utc>,
}

/// Snapshot of a policy's recorded attempt history.
///
/// Observability only, never consulted for control flow.
#[derive(Debug, Clone)]
pub struct RetryStats {
    /// Recorded failed attempts, oldest first.
    pub attempts: Vec<RetryAttempt>,

    /// Number of recorded attempts.
    pub total_attempts: usize,

    /// Sum of delays waited across recorded attempts.
    pub total_delay: Duration,

    /// Message of the most recent failure, if any.
    pub last_error: Option<String>,
}

/// Executes fallible async operations with backoff and jitter.
///
/// A policy object is reusable: each [`execute`](Self::execute) call is an
/// independent run whose attempt history replaces the previous one.
pub struct RetryPolicy {
    config: RetryConfig,
    attempts: Mutex<Vec<RetryAttempt>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // Default config is valid by construction
        Self {
            config: RetryConfig::default(),
            attempts: Mutex::new(Vec::new()),
        }
    }
}

impl RetryPolicy {
    /// Create a policy, rejecting invalid configurations.
    pub fn new(config: RetryConfig) -> std::result::Result<Self, RetryConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            attempts: Mutex::new(Vec::new()),
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Strategy delay for a 0-based attempt, capped at `max_delay`,
    /// before jitter. Attempt 0 always gets zero delay.
    fn strategy_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = self.config.base_delay.as_secs_f64();
        let raw = match self.config.strategy {
            BackoffStrategy::Exponential => base * self.config.multiplier.powi(attempt as i32),
            BackoffStrategy::Linear => base + base * attempt as f64,
            BackoffStrategy::Fixed => base,
        };
        Duration::from_secs_f64(raw.min(self.config.max_delay.as_secs_f64()))
    }

    /// Delay to wait before the given 0-based attempt, jitter included.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay = self.strategy_delay(attempt);
        if attempt == 0 {
            return delay;
        }
        match self.config.jitter {
            JitterMode::None => delay,
            JitterMode::Full => Duration::from_secs_f64(fastrand::f64() * delay.as_secs_f64()),
            JitterMode::Equal => {
                let d = delay.as_secs_f64();
                let spread = d * self.config.jitter_factor * (fastrand::f64() * 2.0 - 1.0);
                Duration::from_secs_f64((d + spread).max(0.0))
            }
            JitterMode::Decorrelated => {
                if attempt <= 1 {
                    return delay;
                }
                let previous = self
                    .attempts
                    .lock()
                    .unwrap()
                    .last()
                    .map(|a| a.delay)
                    .unwrap_or(self.config.base_delay);
                let lo = self.config.base_delay.as_secs_f64();
                let hi = (previous.as_secs_f64() * 3.0).max(lo);
                Duration::from_secs_f64(lo + fastrand::f64() * (hi - lo))
            }
        }
    }

    /// Whether a failure on the given 0-based attempt warrants another try.
    pub fn should_retry(&self, failure: &dyn Failure, attempt: u32) -> bool {
        if attempt + 1 >= self.config.max_attempts {
            return false;
        }
        if let Some(kinds) = &self.config.retry_on {
            if !kinds.contains(&failure.kind()) {
                return false;
            }
        }
        if let Some(predicate) = &self.config.predicate {
            if !predicate(failure) {
                return false;
            }
        }
        true
    }

    /// Run `operation` until it succeeds, retries are declined, or
    /// attempts are exhausted. The last failure is always propagated,
    /// never swallowed.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> std::result::Result<T, E>
    where
        E: Failure,
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
    {
        self.attempts.lock().unwrap().clear();

        let mut attempt = 0;
        loop {
            let delay = self.calculate_delay(attempt);
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            match operation().await {
                Ok(value) => {
                    self.attempts.lock().unwrap().clear();
                    return Ok(value);
                }
                Err(failure) => {
                    debug!(attempt, error = %failure, "retryable operation failed");
                    self.attempts.lock().unwrap().push(RetryAttempt {
                        attempt,
                        delay,
                        error: Some(failure.to_string()),
                        at: Utc::now(),
                    });
                    if !self.should_retry(&failure, attempt) {
                        return Err(failure);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Snapshot of the most recent execution's failed attempts.
    pub fn stats(&self) -> RetryStats {
        let attempts = self.attempts.lock().unwrap().clone();
        RetryStats {
            total_attempts: attempts.len(),
            total_delay: attempts.iter().map(|a| a.delay).sum(),
            last_error: attempts.last().and_then(|a| a.error.clone()),
            attempts,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestFailure {
        message: String,
        kind: FailureKind,
    }

    impl TestFailure {
        fn new(message: &str, kind: FailureKind) -> Self {
            Self {
                message: message.to_string(),
                kind,
            }
        }
    }

    impl fmt::Display for TestFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl Failure for TestFailure {
        fn kind(&self) -> FailureKind {
            self.kind
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig::new()
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
    }

    #[test]
    fn test_exponential_delays_with_cap() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_base_delay(Duration::from_secs(2))
                .with_max_delay(Duration::from_secs(10))
                .with_multiplier(2.0),
        )
        .unwrap();

        assert_eq!(policy.calculate_delay(0), Duration::ZERO);
        assert_eq!(policy.calculate_delay(1), Duration::from_secs_f64(4.0));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs_f64(8.0));
        // Capped at max_delay
        assert_eq!(policy.calculate_delay(3), Duration::from_secs_f64(10.0));
    }

    #[test]
    fn test_linear_and_fixed_delays() {
        let linear = RetryPolicy::new(
            RetryConfig::new()
                .with_strategy(BackoffStrategy::Linear)
                .with_base_delay(Duration::from_secs(1))
                .with_max_delay(Duration::from_secs(60)),
        )
        .unwrap();
        assert_eq!(linear.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(linear.calculate_delay(3), Duration::from_secs(4));

        let fixed = RetryPolicy::new(
            RetryConfig::new()
                .with_strategy(BackoffStrategy::Fixed)
                .with_base_delay(Duration::from_secs(1)),
        )
        .unwrap();
        assert_eq!(fixed.calculate_delay(1), Duration::from_secs(1));
        assert_eq!(fixed.calculate_delay(9), Duration::from_secs(1));
    }

    #[test]
    fn test_full_jitter_stays_in_range() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_base_delay(Duration::from_secs(2))
                .with_max_delay(Duration::from_secs(10))
                .with_jitter(JitterMode::Full),
        )
        .unwrap();

        for _ in 0..100 {
            let delay = policy.calculate_delay(2);
            assert!(delay <= Duration::from_secs(8));
        }
    }

    #[test]
    fn test_equal_jitter_floors_at_zero() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_base_delay(Duration::from_secs(1))
                .with_jitter(JitterMode::Equal)
                .with_jitter_factor(1.0),
        )
        .unwrap();

        for _ in 0..100 {
            let delay = policy.calculate_delay(1).as_secs_f64();
            assert!((0.0..=4.0).contains(&delay));
        }
    }

    #[test]
    fn test_decorrelated_first_retry_unjittered() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_base_delay(Duration::from_secs(2))
                .with_max_delay(Duration::from_secs(10))
                .with_jitter(JitterMode::Decorrelated),
        )
        .unwrap();

        assert_eq!(policy.calculate_delay(1), Duration::from_secs(4));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert_eq!(
            RetryConfig::new().with_max_attempts(0).validate(),
            Err(RetryConfigError::ZeroAttempts)
        );
        assert_eq!(
            RetryConfig::new()
                .with_base_delay(Duration::ZERO)
                .validate(),
            Err(RetryConfigError::ZeroBaseDelay)
        );
        assert!(matches!(
            RetryConfig::new()
                .with_base_delay(Duration::from_secs(10))
                .with_max_delay(Duration::from_secs(1))
                .validate(),
            Err(RetryConfigError::MaxBelowBase { .. })
        ));
        assert_eq!(
            RetryConfig::new().with_multiplier(1.0).validate(),
            Err(RetryConfigError::MultiplierTooSmall(1.0))
        );
        assert_eq!(
            RetryConfig::new().with_jitter_factor(1.5).validate(),
            Err(RetryConfigError::JitterFactorOutOfRange(1.5))
        );
        // Sub-unit multiplier is fine for non-exponential strategies
        assert!(RetryConfig::new()
            .with_strategy(BackoffStrategy::Fixed)
            .with_multiplier(0.5)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_should_retry_exhaustion() {
        let policy = RetryPolicy::new(fast_config().with_max_attempts(3)).unwrap();
        let failure = TestFailure::new("boom", FailureKind::Server);

        assert!(policy.should_retry(&failure, 0));
        assert!(policy.should_retry(&failure, 1));
        assert!(!policy.should_retry(&failure, 2));
        assert!(!policy.should_retry(&failure, 7));
    }

    #[test]
    fn test_should_retry_kind_allow_list() {
        let policy = RetryPolicy::new(
            fast_config()
                .with_max_attempts(5)
                .retry_on([FailureKind::Throttled]),
        )
        .unwrap();

        assert!(policy.should_retry(&TestFailure::new("slow down", FailureKind::Throttled), 0));
        assert!(!policy.should_retry(&TestFailure::new("bad input", FailureKind::Invalid), 0));
    }

    #[test]
    fn test_should_retry_predicate() {
        let policy = RetryPolicy::new(
            fast_config()
                .with_max_attempts(5)
                .with_predicate(|f| !f.to_string().contains("fatal")),
        )
        .unwrap();

        assert!(policy.should_retry(&TestFailure::new("transient", FailureKind::Server), 0));
        assert!(!policy.should_retry(&TestFailure::new("fatal: gone", FailureKind::Server), 0));
    }

    #[tokio::test]
    async fn test_execute_propagates_last_failure_after_exhaustion() {
        let policy = RetryPolicy::new(fast_config().with_max_attempts(3)).unwrap();
        let calls = AtomicU32::new(0);

        let result: Result<(), TestFailure> = policy
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(TestFailure::new(&format!("attempt {}", n), FailureKind::Server)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().to_string(), "attempt 2");

        let stats = policy.stats();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.last_error.as_deref(), Some("attempt 2"));
    }

    #[tokio::test]
    async fn test_execute_stops_on_first_success() {
        let policy = RetryPolicy::new(fast_config().with_max_attempts(5)).unwrap();
        let calls = AtomicU32::new(0);

        let result: Result<u32, TestFailure> = policy
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(TestFailure::new("first try fails", FailureKind::Network))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // Success discards attempt history
        assert_eq!(policy.stats().total_attempts, 0);
    }

    #[tokio::test]
    async fn test_execute_respects_non_retryable_kind() {
        let policy = RetryPolicy::new(
            fast_config().with_max_attempts(5).retry_transient(),
        )
        .unwrap();
        let calls = AtomicU32::new(0);

        let result: Result<(), TestFailure> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(TestFailure::new("unauthorized", FailureKind::Auth)) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_policy_never_sleeps() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_max_attempts(1)
                .with_base_delay(Duration::from_secs(60)),
        )
        .unwrap();

        let start = std::time::Instant::now();
        let result: Result<(), TestFailure> = policy
            .execute(|| async { Err(TestFailure::new("once", FailureKind::Server)) })
            .await;

        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    proptest! {
        #[test]
        fn prop_unjittered_delay_never_exceeds_cap(
            attempt in 0u32..32,
            base_ms in 1u64..5_000,
            extra_ms in 0u64..60_000,
            multiplier in 1.001f64..8.0,
            strategy_idx in 0usize..3,
        ) {
            let strategy = [
                BackoffStrategy::Exponential,
                BackoffStrategy::Linear,
                BackoffStrategy::Fixed,
            ][strategy_idx];
            let base = Duration::from_millis(base_ms);
            let max = base + Duration::from_millis(extra_ms);
            let policy = RetryPolicy::new(
                RetryConfig::new()
                    .with_base_delay(base)
                    .with_max_delay(max)
                    .with_multiplier(multiplier)
                    .with_strategy(strategy),
            )
            .unwrap();

            let delay = policy.calculate_delay(attempt);
            prop_assert!(delay <= max);
            if attempt == 0 {
                prop_assert_eq!(delay, Duration::ZERO);
            }
        }
    }
}
