//! Bounded status polling
//!
//! [`poll_until`] drives a fixed-interval wait/check loop independent of any
//! transport: the check is a closure and time is an injected [`Clock`], so
//! the loop can be exercised without real timers or network calls.

use crate::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;

/// Source of delays for the polling loop.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that returns immediately and remembers every requested delay.
#[derive(Debug, Clone, Default)]
pub struct RecordingClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Worst-case time a blocking poll can hold a request open.
    pub fn budget(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }

    fn delays(&self) -> impl Iterator<Item = Duration> {
        FixedInterval::new(self.interval).take(self.max_attempts as usize)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// A check returned a value accepted by the predicate.
    Done { value: T, attempts: u32 },
    /// Every attempt ran without a terminal value. `last` is the most recent
    /// successful check, if any.
    Exhausted { attempts: u32, last: Option<T> },
}

/// Wait, check, repeat until `is_done` accepts a value or the attempt budget
/// runs out.
///
/// A failed check only costs that attempt; the error is logged and the loop
/// carries on.
pub async fn poll_until<T, C, F, Fut, P>(
    policy: &PollPolicy,
    clock: &C,
    mut check: F,
    is_done: P,
) -> PollOutcome<T>
where
    C: Clock + ?Sized,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let mut last = None;
    let mut attempts = 0;

    for delay in policy.delays() {
        clock.sleep(delay).await;
        attempts += 1;

        match check(attempts).await {
            Ok(value) if is_done(&value) => {
                tracing::debug!("Poll finished on attempt {}/{}", attempts, policy.max_attempts);
                return PollOutcome::Done { value, attempts };
            }
            Ok(value) => {
                tracing::debug!("Poll attempt {}/{}: not done yet", attempts, policy.max_attempts);
                last = Some(value);
            }
            Err(e) => {
                tracing::warn!(
                    "Poll attempt {}/{} failed: {}. Will retry...",
                    attempts,
                    policy.max_attempts,
                    e
                );
            }
        }
    }

    PollOutcome::Exhausted { attempts, last }
}
