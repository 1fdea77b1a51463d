//! Inline circuit-breaker state machine.
//!
//! One breaker guards each external dependency. Failures are counted in a
//! rolling window of ten one-second-ish buckets; when the error rate over
//! the window crosses the threshold (and enough calls were observed), the
//! breaker opens and calls fail fast until the reset timeout elapses, at
//! which point a single probe is let through.
//!
//! The machine is small enough that a library would cost more than it
//! saves: a mutex-protected state struct and plain counters cover it.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Number of buckets in the rolling window.
const BUCKET_COUNT: usize = 10;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Breaker tuning knobs. Defaults match the gateway-wide contract:
/// 50% error rate over a 10s window with at least 5 observed calls trips
/// the breaker; 30s later one probe is allowed through.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Error rate in `0.0..=1.0` that trips the breaker.
    pub error_threshold: f64,
    /// Minimum calls in the window before the rate is evaluated.
    pub volume_threshold: u64,
    /// How long the breaker stays open before half-opening.
    pub reset_timeout: Duration,
    /// Length of the rolling window.
    pub window: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold: 0.5,
            volume_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            window: Duration::from_secs(10),
        }
    }
}

/// Breaker states. `HalfOpen` admits exactly one probe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Fail-fast error returned while the circuit is open.
#[derive(Debug, thiserror::Error)]
#[error("circuit breaker '{0}' is open")]
pub struct CircuitOpen(pub String);

/// Point-in-time view of a breaker, for health output and logs.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStats {
    pub state: BreakerState,
    pub successes: u64,
    pub failures: u64,
    pub error_rate: f64,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    successes: u64,
    failures: u64,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    buckets: [Bucket; BUCKET_COUNT],
    current: usize,
    bucket_started: Instant,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// A named circuit breaker with a rolling failure window.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                buckets: [Bucket::default(); BUCKET_COUNT],
                current: 0,
                bucket_started: Instant::now(),
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask permission to make a call. `Err(CircuitOpen)` means fail fast and
    /// use the dependency's fallback instead.
    pub fn try_acquire(&self) -> Result<(), CircuitOpen> {
        self.try_acquire_at(Instant::now())
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        self.record_success_at(Instant::now());
    }

    /// Record a failed call (error or timeout).
    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.lock();
        let (successes, failures) = window_totals(&inner);
        let total = successes + failures;
        BreakerStats {
            state: inner.state,
            successes,
            failures,
            error_rate: if total == 0 {
                0.0
            } else {
                failures as f64 / total as f64
            },
        }
    }

    // -- clock-injected internals (also driven directly by tests) -----------

    fn try_acquire_at(&self, now: Instant) -> Result<(), CircuitOpen> {
        let mut inner = self.lock();
        rotate(&mut inner, now, self.config.window);

        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                if elapsed >= self.config.reset_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    tracing::info!(breaker = %self.name, "Circuit half-open, letting one probe through");
                    Ok(())
                } else {
                    Err(CircuitOpen(self.name.clone()))
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(CircuitOpen(self.name.clone()))
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    fn record_success_at(&self, now: Instant) {
        let mut inner = self.lock();
        rotate(&mut inner, now, self.config.window);

        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Closed;
                inner.buckets = [Bucket::default(); BUCKET_COUNT];
                inner.current = 0;
                inner.bucket_started = now;
                inner.opened_at = None;
                inner.probe_in_flight = false;
                tracing::info!(breaker = %self.name, "Probe succeeded, circuit closed");
            }
            _ => {
                let current = inner.current;
                inner.buckets[current].successes += 1;
            }
        }
    }

    fn record_failure_at(&self, now: Instant) {
        let mut inner = self.lock();
        rotate(&mut inner, now, self.config.window);

        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(now);
                inner.probe_in_flight = false;
                tracing::warn!(breaker = %self.name, "Probe failed, circuit re-opened");
            }
            BreakerState::Closed => {
                let current = inner.current;
                inner.buckets[current].failures += 1;
                let (successes, failures) = window_totals(&inner);
                let total = successes + failures;
                if total >= self.config.volume_threshold
                    && failures as f64 / total as f64 >= self.config.error_threshold
                {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(now);
                    tracing::warn!(
                        breaker = %self.name,
                        failures,
                        total,
                        "Error threshold crossed, circuit opened"
                    );
                }
            }
            BreakerState::Open => {
                let current = inner.current;
                inner.buckets[current].failures += 1;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Advance the window: step one bucket per elapsed bucket-duration, clearing
/// buckets as they are reused. A gap longer than the window clears it all.
fn rotate(inner: &mut Inner, now: Instant, window: Duration) {
    let bucket_duration = window / BUCKET_COUNT as u32;
    let mut elapsed = now.saturating_duration_since(inner.bucket_started);

    if elapsed >= window {
        inner.buckets = [Bucket::default(); BUCKET_COUNT];
        inner.current = 0;
        inner.bucket_started = now;
        return;
    }

    while elapsed >= bucket_duration {
        inner.current = (inner.current + 1) % BUCKET_COUNT;
        inner.buckets[inner.current] = Bucket::default();
        inner.bucket_started += bucket_duration;
        elapsed -= bucket_duration;
    }
}

fn window_totals(inner: &Inner) -> (u64, u64) {
    inner.buckets.iter().fold((0, 0), |(s, f), b| {
        (s + b.successes, f + b.failures)
    })
}

// ---------------------------------------------------------------------------
// Tests (driven through the clock-injected internals)
// ---------------------------------------------------------------------------
