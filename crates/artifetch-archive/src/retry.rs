//! Retry loop with bounded exponential backoff.
//!
//! Every attempt ends in one of three ways: success, a fatal failure that
//! stops the loop at once, or a transient failure that schedules another
//! attempt after a delay. The loop ends after a fixed number of attempts,
//! and cancellation is treated as fatal.
//!
//! State per run (owned by [`retry`], never shared):
//!
//! ```text
//! Pending -> Attempting -> Succeeded
//!                       -> FatalFailed
//!                       -> Cancelled
//!                       -> (backoff) -> Attempting -> ... -> Exhausted
//! ```

use std::future::Future;
use std::time::Duration;

use artifetch_core::BackoffConfig;
use tokio_util::sync::CancellationToken;

/// Delay schedule: `initial * multiplier^n`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    /// Create a schedule. `multiplier` values below 1 are treated as 1.
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            max,
            multiplier: if multiplier.is_finite() && multiplier >= 1.0 {
                multiplier
            } else {
                1.0
            },
        }
    }

    /// Delay to wait after the `n`th failed attempt (zero-based).
    pub fn delay(&self, n: u32) -> Duration {
        let exp = i32::try_from(n).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exp);
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs).min(self.max)
        }
    }
}

/// Backoff schedule plus an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay schedule between attempts.
    pub backoff: ExponentialBackoff,
    /// Total attempts including the first. Never less than 1.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Build a policy from configuration.
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self {
            backoff: ExponentialBackoff::new(
                config.initial_delay(),
                config.max_delay(),
                config.multiplier,
            ),
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// Same schedule with a different attempt cap.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}

/// How a failed attempt should be treated.
#[derive(Debug)]
pub enum Attempt<E> {
    /// Retrying cannot change the outcome; stop now.
    Fatal(E),
    /// Worth another try after the backoff delay.
    Transient(E),
}

/// Where a retry run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No attempt made yet.
    Pending,
    /// An attempt is in flight, or the loop is waiting to make the next one.
    Attempting,
    /// An attempt succeeded.
    Succeeded,
    /// An attempt failed fatally.
    FatalFailed,
    /// The attempt cap was reached.
    Exhausted,
    /// The caller cancelled the run.
    Cancelled,
}

impl Phase {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Pending | Phase::Attempting)
    }
}

/// Attempt count and accumulated backoff for one retry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts started so far.
    pub attempts: u32,
    /// Total time spent waiting between attempts.
    pub elapsed_backoff: Duration,
    /// Current phase.
    pub phase: Phase,
}

impl RetryState {
    fn new() -> Self {
        Self {
            attempts: 0,
            elapsed_backoff: Duration::ZERO,
            phase: Phase::Pending,
        }
    }

    fn enter(&mut self, next: Phase) {
        debug_assert!(
            !self.phase.is_terminal(),
            "retry state left terminal phase {:?} for {:?}",
            self.phase,
            next
        );
        tracing::trace!(from = ?self.phase, to = ?next, attempts = self.attempts, "retry transition");
        self.phase = next;
    }
}

/// Terminal failure of a retry run.
#[derive(Debug)]
pub enum RetryError<E> {
    /// An attempt failed fatally.
    Fatal {
        /// The fatal error.
        error: E,
        /// State at termination.
        state: RetryState,
    },
    /// Every attempt failed transiently.
    Exhausted {
        /// The error from the final attempt.
        last: E,
        /// State at termination.
        state: RetryState,
    },
    /// The cancellation token fired.
    Cancelled {
        /// State at termination.
        state: RetryState,
    },
}

impl<E> RetryError<E> {
    /// State at termination.
    pub fn state(&self) -> &RetryState {
        match self {
            RetryError::Fatal { state, .. }
            | RetryError::Exhausted { state, .. }
            | RetryError::Cancelled { state } => state,
        }
    }
}

/// Run `op` under `policy` until it succeeds, fails fatally, runs out of
/// attempts, or `cancel` fires.
///
/// `op` receives the one-based attempt number. Cancellation drops the
/// in-flight attempt future and interrupts backoff waits.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<(T, RetryState), RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut state = RetryState::new();

    loop {
        if cancel.is_cancelled() {
            state.enter(Phase::Cancelled);
            return Err(RetryError::Cancelled { state });
        }

        state.attempts += 1;
        if state.phase == Phase::Pending {
            state.enter(Phase::Attempting);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = op(state.attempts) => Some(result),
        };

        let error = match outcome {
            None => {
                state.enter(Phase::Cancelled);
                return Err(RetryError::Cancelled { state });
            }
            Some(Ok(value)) => {
                state.enter(Phase::Succeeded);
                return Ok((value, state));
            }
            Some(Err(Attempt::Fatal(error))) => {
                tracing::debug!(attempt = state.attempts, "attempt failed fatally: {error}");
                state.enter(Phase::FatalFailed);
                return Err(RetryError::Fatal { error, state });
            }
            Some(Err(Attempt::Transient(error))) => error,
        };

        if state.attempts >= max_attempts {
            tracing::warn!(attempts = state.attempts, "giving up: {error}");
            state.enter(Phase::Exhausted);
            return Err(RetryError::Exhausted { last: error, state });
        }

        let delay = policy.backoff.delay(state.attempts - 1);
        tracing::warn!(
            attempt = state.attempts,
            max_attempts,
            "attempt failed, retrying in {delay:?}: {error}"
        );

        let slept = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        };
        if !slept {
            state.enter(Phase::Cancelled);
            return Err(RetryError::Cancelled { state });
        }
        state.elapsed_backoff += delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            backoff: ExponentialBackoff::new(
                Duration::from_millis(100),
                Duration::from_secs(10),
                2.0,
            ),
            max_attempts,
        }
    }

    #[test]
    fn backoff_doubles_until_ceiling() {
        let b = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10), 2.0);
        assert_eq!(b.delay(0), Duration::from_millis(100));
        assert_eq!(b.delay(1), Duration::from_millis(200));
        assert_eq!(b.delay(6), Duration::from_millis(6400));
        assert_eq!(b.delay(7), Duration::from_secs(10));
        assert_eq!(b.delay(21), Duration::from_secs(10));
        assert_eq!(b.delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn default_schedule_reaches_ceiling_in_about_twelve_seconds() {
        let policy = RetryPolicy::default();
        let mut total = Duration::ZERO;
        let mut n = 0;
        while policy.backoff.delay(n) < Duration::from_secs(10) {
            total += policy.backoff.delay(n);
            n += 1;
        }
        assert_eq!(total, Duration::from_millis(12_700));

        let all: Duration = (0..policy.max_attempts - 1).map(|i| policy.backoff.delay(i)).sum();
        assert!(all > Duration::from_secs(140) && all < Duration::from_secs(160));
    }

    #[test]
    fn sub_unit_multiplier_is_flat() {
        let b = ExponentialBackoff::new(Duration::from_millis(50), Duration::from_secs(1), 0.5);
        assert_eq!(b.delay(0), Duration::from_millis(50));
        assert_eq!(b.delay(5), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_has_no_backoff() {
        let cancel = CancellationToken::new();
        let (value, state) = retry(&quick_policy(5), &cancel, |_| async { Ok::<_, Attempt<String>>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(state.attempts, 1);
        assert_eq!(state.elapsed_backoff, Duration::ZERO);
        assert_eq!(state.phase, Phase::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_stops_after_one_attempt_without_sleeping() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let cancel = CancellationToken::new();
        let err = retry(&quick_policy(22), &cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Attempt::Fatal("gone".to_string())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Fatal { ref error, .. } if error == "gone"));
        assert_eq!(err.state().phase, Phase::FatalFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_then_success() {
        let cancel = CancellationToken::new();
        let (_, state) = retry(&quick_policy(22), &cancel, |attempt| async move {
            if attempt <= 3 {
                Err(Attempt::Transient(format!("flake {attempt}")))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();
        assert_eq!(state.attempts, 4);
        assert_eq!(state.elapsed_backoff, Duration::from_millis(100 + 200 + 400));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let err = retry(&quick_policy(4), &cancel, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(Attempt::Transient(attempt)) }
        })
        .await
        .unwrap_err();
        match err {
            RetryError::Exhausted { last, state } => {
                assert_eq!(last, 4);
                assert_eq!(state.attempts, 4);
                assert_eq!(state.phase, Phase::Exhausted);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_makes_no_attempt() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = retry(&quick_policy(3), &cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Attempt<String>>(()) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Cancelled { .. }));
        assert_eq!(err.state().attempts, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_stops_retrying() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            trigger.cancel();
        });
        let err = retry(&quick_policy(22), &cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Attempt::Transient("flake")) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Cancelled { .. }));
        // 100ms backoff after attempt 1, then the 200ms wait is interrupted.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_in_flight_attempt() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let err = retry(&quick_policy(3), &cancel, |_| async {
            std::future::pending::<Result<(), Attempt<String>>>().await
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Cancelled { state } if state.attempts == 1));
    }
}
