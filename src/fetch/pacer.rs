//! Process-wide request pacing
//!
//! A [`Pacer`] enforces a minimum interval between consecutive physical
//! requests. One pacer is shared (through an `Arc`) by every scheduler that
//! talks to the same upstream, because the limit being respected belongs to
//! the server rather than to any single caller.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Boxed sleep future returned by [`Clock::sleep`]
pub type Sleep<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Source of time for pacing and backoff
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant
    fn now(&self) -> Instant;

    /// Suspends the calling task for `duration`
    fn sleep(&self, duration: Duration) -> Sleep<'_>;
}

/// Wall clock backed by `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> Sleep<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual clock for tests
///
/// Sleeping advances virtual time immediately and records the requested
/// duration, so pacing and backoff can be asserted without waiting.
#[doc(hidden)]
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Moves virtual time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.elapsed += duration;
    }

    /// Every duration passed to [`Clock::sleep`], in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sleeps
            .clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.origin + state.elapsed
    }

    fn sleep(&self, duration: Duration) -> Sleep<'_> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.elapsed += duration;
            state.sleeps.push(duration);
        }
        Box::pin(std::future::ready(()))
    }
}

/// Global minimum-interval gate for physical requests
///
/// The last issue time is read, waited on, and rewritten under one async
/// lock, so concurrent callers are released strictly one at a time and never
/// closer together than `min_interval`.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    /// `None` until the first request, which therefore never waits
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl Pacer {
    /// Creates a pacer driven by the wall clock
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(SystemClock))
    }

    /// Creates a pacer driven by an injected clock
    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            clock,
            last_request: tokio::sync::Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// The clock used for pacing; schedulers sleep their backoff on it too
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Waits until a physical request may be issued and claims the slot
    ///
    /// Returns the instant recorded as the new last request time.
    pub async fn wait_turn(&self) -> Instant {
        let mut last_request = self.last_request.lock().await;

        if let Some(wait) = self.time_until_next_request(*last_request) {
            tracing::debug!("Pacing: waiting {:?} before next request", wait);
            self.clock.sleep(wait).await;
        }

        let issued_at = self.clock.now();
        *last_request = Some(issued_at);
        issued_at
    }

    /// Time still to wait given the last issue time, `None` if ready now
    fn time_until_next_request(&self, last_request: Option<Instant>) -> Option<Duration> {
        let last = last_request?;
        let elapsed = self.clock.now().saturating_duration_since(last);
        if elapsed < self.min_interval {
            Some(self.min_interval - elapsed)
        } else {
            None
        }
    }
}
