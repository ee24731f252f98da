//! Circuit breaker with bounded retry for outbound calls.
//!
//! Each remote dependency owns one [`CircuitBreaker`]. Its state is shared by
//! every concurrent request against that dependency and is only mutated from
//! [`CircuitBreaker::execute`].
//!
//! # States
//!
//! - **Closed**: calls pass through. Outcomes are counted over a rolling
//!   interval and the trip policy decides when to open.
//! - **Open**: calls fail with [`ResilienceError::CircuitOpen`] without running
//!   the operation, until the open timeout elapses.
//! - **HalfOpen**: a bounded number of trial calls run. Enough consecutive
//!   successes close the circuit; any failure reopens it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// When a closed circuit should trip to open.
#[derive(Debug, Clone, PartialEq)]
pub enum TripPolicy {
    /// Trip once at least `min_requests` were seen in the current interval and
    /// the share of failures reached `ratio`.
    FailureRatio { min_requests: u32, ratio: f64 },
    /// Trip once more than this many failures happened in a row.
    ConsecutiveFailures(u32),
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub name: String,
    /// Trial calls allowed while half-open, and consecutive successes
    /// needed there to close again.
    pub max_half_open_requests: u32,
    /// Rolling window for the closed-state counters. Zero keeps them until the
    /// next state change.
    pub interval: Duration,
    /// How long the circuit stays open before allowing trial calls.
    pub open_timeout: Duration,
    pub trip: TripPolicy,
}

impl BreakerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_half_open_requests: 3,
            interval: Duration::from_secs(10),
            open_timeout: Duration::from_secs(60),
            trip: TripPolicy::FailureRatio {
                min_requests: 3,
                ratio: 0.5,
            },
        }
    }

    pub fn max_half_open_requests(mut self, max: u32) -> Self {
        self.max_half_open_requests = max.max(1);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn trip(mut self, trip: TripPolicy) -> Self {
        self.trip = trip;
        self
    }
}

/// Request counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests += 1;
    }

    fn on_success(&mut self) {
        self.total_successes += 1;
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures += 1;
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
    }
}

impl TripPolicy {
    fn should_trip(&self, counts: &Counts) -> bool {
        match self {
            TripPolicy::FailureRatio {
                min_requests,
                ratio,
            } => {
                counts.requests >= *min_requests
                    && f64::from(counts.total_failures) / f64::from(counts.requests) >= *ratio
            }
            TripPolicy::ConsecutiveFailures(max) => counts.consecutive_failures > *max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before retry `n` is `n * backoff_step`.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff_step * retry
    }
}

#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    #[error("operation failed: {0}")]
    Operation(E),

    #[error("all {attempts} attempts failed: {last}")]
    RetriesExhausted { attempts: u32, last: E },
}

impl<E> ResilienceError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }
}

type StateListener = Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync>;

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerState>,
    listener: Option<StateListener>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        let expiry = Self::expiry_for(&config, CircuitState::Closed, Instant::now());
        Self {
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry,
            }),
            listener: None,
        }
    }

    /// Register a callback invoked on every state transition.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&str, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub async fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().await;
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    pub async fn counts(&self) -> Counts {
        let mut inner = self.inner.lock().await;
        self.refresh(&mut inner, Instant::now());
        inner.counts
    }

    /// Run `operation` if the circuit allows it.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = self.before_request().await?;
        let result = operation().await;
        self.after_request(generation, result.is_ok()).await;
        result.map_err(ResilienceError::Operation)
    }

    /// [`execute`](Self::execute) with up to `policy.max_retries` retries and
    /// linear backoff. An open circuit is returned immediately, not retried.
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        policy: &RetryPolicy,
        mut operation: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut retry = 0;
        loop {
            match self.execute(&mut operation).await {
                Ok(value) => {
                    if retry > 0 {
                        tracing::info!(breaker = %self.config.name, retry, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(ResilienceError::Operation(err)) if retry >= policy.max_retries => {
                    return Err(ResilienceError::RetriesExhausted {
                        attempts: retry + 1,
                        last: err,
                    });
                }
                Err(ResilienceError::Operation(err)) => {
                    retry += 1;
                    let delay = policy.delay_for_retry(retry);
                    tracing::warn!(
                        breaker = %self.config.name,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn before_request<E>(&self) -> Result<u64, ResilienceError<E>> {
        let mut inner = self.inner.lock().await;
        self.refresh(&mut inner, Instant::now());

        let rejected = match inner.state {
            CircuitState::Open => true,
            CircuitState::HalfOpen => inner.counts.requests >= self.config.max_half_open_requests,
            CircuitState::Closed => false,
        };
        if rejected {
            tracing::debug!(breaker = %self.config.name, state = %inner.state, "Rejecting call");
            return Err(ResilienceError::CircuitOpen {
                name: self.config.name.clone(),
            });
        }

        inner.counts.on_request();
        Ok(inner.generation)
    }

    async fn after_request(&self, generation: u64, success: bool) {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        self.refresh(&mut inner, now);

        // The circuit moved on while this call was in flight.
        if inner.generation != generation {
            return;
        }

        match (inner.state, success) {
            (CircuitState::Closed, true) => inner.counts.on_success(),
            (CircuitState::Closed, false) => {
                inner.counts.on_failure();
                if self.config.trip.should_trip(&inner.counts) {
                    tracing::warn!(
                        breaker = %self.config.name,
                        requests = inner.counts.requests,
                        failures = inner.counts.total_failures,
                        "Circuit breaker tripped"
                    );
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            (CircuitState::HalfOpen, true) => {
                inner.counts.on_success();
                if inner.counts.consecutive_successes >= self.config.max_half_open_requests {
                    self.transition(&mut inner, CircuitState::Closed, now);
                }
            }
            (CircuitState::HalfOpen, false) => {
                self.transition(&mut inner, CircuitState::Open, now);
            }
            (CircuitState::Open, _) => {}
        }
    }

    /// Apply time-based transitions: interval rollover while closed and the
    /// open timeout.
    fn refresh(&self, inner: &mut BreakerState, now: Instant) {
        match (inner.state, inner.expiry) {
            (CircuitState::Closed, Some(expiry)) if expiry <= now => {
                Self::new_generation(&self.config, inner, now);
            }
            (CircuitState::Open, Some(expiry)) if expiry <= now => {
                self.transition(inner, CircuitState::HalfOpen, now);
            }
            _ => {}
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState, now: Instant) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        Self::new_generation(&self.config, inner, now);

        match to {
            CircuitState::Open => {
                tracing::warn!(breaker = %self.config.name, %from, %to, "Circuit breaker state changed")
            }
            _ => tracing::info!(breaker = %self.config.name, %from, %to, "Circuit breaker state changed"),
        }
        if let Some(listener) = &self.listener {
            listener(&self.config.name, from, to);
        }
    }

    fn new_generation(config: &BreakerConfig, inner: &mut BreakerState, now: Instant) {
        inner.generation += 1;
        inner.counts = Counts::default();
        inner.expiry = Self::expiry_for(config, inner.state, now);
    }

    fn expiry_for(config: &BreakerConfig, state: CircuitState, now: Instant) -> Option<Instant> {
        match state {
            CircuitState::Closed if config.interval.is_zero() => None,
            CircuitState::Closed => Some(now + config.interval),
            CircuitState::Open => Some(now + config.open_timeout),
            CircuitState::HalfOpen => None,
        }
    }
}
