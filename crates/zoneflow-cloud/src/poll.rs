//! Polling state machine
//!
//! The backend offers no notifications, so convergence is observed by
//! reading the zone repeatedly until it reaches a target state, fails, or the
//! deadline passes.
//!
//! ```text
//!             delay          min_interval / backoff
//!  start ──sleep──▶ read ──▶ pending ──sleep──▶ read ──▶ ...
//!                     │
//!                     ├──▶ target          → Ok(PollOutcome)
//!                     ├──▶ ERROR / other   → Err(BackendError / UnexpectedState)
//!                     ├──▶ 409 / 429       → sleep(backoff), read again
//!                     ├──▶ failure after deadline → Err(Timeout)
//!                     └──▶ other failure   → Err(Fatal)
//! ```
//!
//! Time is read and slept through a [`Clock`], so tests can drive the
//! machine without waiting on the wall clock.

use crate::error::{ConfigError, PollError, PollResult};
use crate::provider::ZoneClient;
use crate::reconcile::Phase;
use crate::retry::{RetryConfig, RetryDecision, classify};
use crate::state::{LifecycleState, StateResolver};
use crate::zone::ZoneDescriptor;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Source of time for the poller
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when slept on
///
/// Every sleep returns immediately after advancing the clock and is recorded,
/// which makes tick timing assertions exact.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<ManualClockInner>,
}

#[derive(Debug)]
struct ManualClockInner {
    origin: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ManualClockInner {
                origin: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
                sleeps: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Move the clock forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut offset = self.inner.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += duration;
    }

    /// Time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        *self.inner.offset.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner
            .sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.inner.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.inner
            .sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        self.advance(duration);
    }
}

/// Per-operation polling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    targets: Vec<LifecycleState>,
    pending: Vec<LifecycleState>,
    timeout: Duration,
    delay: Duration,
    min_interval: Duration,
    retry: RetryConfig,
}

impl PollConfig {
    /// Build a validated configuration
    ///
    /// Rejects a timeout shorter than the initial delay, a zero minimum
    /// interval, an empty target set and states listed as both target and
    /// pending.
    pub fn new(
        targets: impl Into<Vec<LifecycleState>>,
        pending: impl Into<Vec<LifecycleState>>,
        timeout: Duration,
        delay: Duration,
        min_interval: Duration,
    ) -> Result<Self, ConfigError> {
        let targets = targets.into();
        let pending = pending.into();

        if timeout < delay {
            return Err(ConfigError::TimeoutShorterThanDelay { timeout, delay });
        }
        if min_interval.is_zero() {
            return Err(ConfigError::ZeroMinInterval);
        }
        if targets.is_empty() {
            return Err(ConfigError::NoTargetStates);
        }
        if let Some(state) = targets.iter().find(|s| pending.contains(s)) {
            return Err(ConfigError::OverlappingStates(*state));
        }

        Ok(Self {
            targets,
            pending,
            timeout,
            delay,
            min_interval,
            retry: RetryConfig::default(),
        })
    }

    /// Wait for a created or updated zone to become ACTIVE
    pub fn until_active(
        timeout: Duration,
        delay: Duration,
        min_interval: Duration,
    ) -> Result<Self, ConfigError> {
        Self::new(
            [LifecycleState::Active],
            [LifecycleState::Pending],
            timeout,
            delay,
            min_interval,
        )
    }

    /// Wait for a zone to disappear
    pub fn until_deleted(
        timeout: Duration,
        delay: Duration,
        min_interval: Duration,
    ) -> Result<Self, ConfigError> {
        Self::new(
            [LifecycleState::Deleted],
            [LifecycleState::Active, LifecycleState::Pending],
            timeout,
            delay,
            min_interval,
        )
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Same timing, different state classification
    ///
    /// Only used with fixed, non-overlapping sets.
    pub(crate) fn with_states(&self, targets: &[LifecycleState], pending: &[LifecycleState]) -> Self {
        Self {
            targets: targets.to_vec(),
            pending: pending.to_vec(),
            ..self.clone()
        }
    }

    pub fn targets(&self) -> &[LifecycleState] {
        &self.targets
    }

    pub fn pending(&self) -> &[LifecycleState] {
        &self.pending
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}

/// Result of a poll that reached a target state
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub state: LifecycleState,

    /// Zone observed by the final read; `None` when it was already gone
    pub zone: Option<ZoneDescriptor>,

    /// Number of reads issued
    pub reads: u32,

    pub elapsed: Duration,
}

/// Drives one zone towards a target state
pub struct Poller<'a> {
    client: &'a dyn ZoneClient,
    resolver: &'a dyn StateResolver,
    clock: &'a dyn Clock,
    cancel: &'a CancellationToken,
    phase: Phase,
}

impl<'a> Poller<'a> {
    pub fn new(
        client: &'a dyn ZoneClient,
        resolver: &'a dyn StateResolver,
        clock: &'a dyn Clock,
        cancel: &'a CancellationToken,
        phase: Phase,
    ) -> Self {
        Self {
            client,
            resolver,
            clock,
            cancel,
            phase,
        }
    }

    /// Poll `id` until it reaches one of `config`'s target states
    pub async fn wait(&self, id: &str, config: &PollConfig) -> PollResult<PollOutcome> {
        let started = self.clock.now();
        let deadline = started + config.timeout();
        let mut last_state = None;
        let mut reads = 0u32;
        let mut retries = 0u32;
        let mut next_wait = config.delay();

        tracing::debug!(
            "Waiting for zone {} to reach {:?} ({}, timeout {:?})",
            id,
            config.targets(),
            self.phase,
            config.timeout()
        );

        loop {
            let now = self.clock.now();
            if now + next_wait > deadline {
                self.pause(deadline.saturating_duration_since(now)).await?;
                let elapsed = self.clock.now().saturating_duration_since(started);
                tracing::warn!(
                    "Timed out waiting for zone {} after {:?} ({} reads, last state {:?})",
                    id,
                    elapsed,
                    reads,
                    last_state
                );
                return Err(PollError::Timeout {
                    last_state,
                    elapsed,
                });
            }

            self.pause(next_wait).await?;
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            reads += 1;
            let observed = match self.client.read(id).await {
                Ok(zone) => {
                    let state = self.resolver.resolve(&zone.status);
                    Some((state, Some(zone)))
                }
                Err(e) if e.is_not_found() => Some((LifecycleState::Deleted, None)),
                Err(e) if self.clock.now() > deadline => {
                    let elapsed = self.clock.now().saturating_duration_since(started);
                    tracing::warn!(
                        "Timed out waiting for zone {} after {:?}, last read failed: {}",
                        id,
                        elapsed,
                        e
                    );
                    return Err(PollError::Timeout {
                        last_state,
                        elapsed,
                    });
                }
                Err(e) => match classify(&e, self.phase) {
                    RetryDecision::Retry => {
                        tracing::warn!("Retrying refresh of zone {} after error: {}", id, e);
                        None
                    }
                    RetryDecision::Fail => return Err(PollError::Fatal(e)),
                },
            };

            match observed {
                Some((state, zone)) => {
                    tracing::debug!("Zone {} is {} (read {})", id, state, reads);
                    retries = 0;
                    last_state = Some(state);

                    if config.targets().contains(&state) {
                        return Ok(PollOutcome {
                            state,
                            zone,
                            reads,
                            elapsed: self.clock.now().saturating_duration_since(started),
                        });
                    }
                    if !config.pending().contains(&state) {
                        if state == LifecycleState::Error {
                            return Err(PollError::BackendError(state));
                        }
                        return Err(PollError::UnexpectedState {
                            state,
                            expected: config.targets().to_vec(),
                        });
                    }
                    next_wait = config.min_interval();
                }
                None => {
                    next_wait = config
                        .retry()
                        .delay_for_attempt(retries, config.min_interval());
                    retries += 1;
                }
            }
        }
    }

    /// Sleep unless cancelled first
    async fn pause(&self, duration: Duration) -> PollResult<()> {
        if self.cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PollError::Cancelled),
            _ = self.clock.sleep(duration) => Ok(()),
        }
    }
}
