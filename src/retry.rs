//! Bounded polling
//!
//! Every "wait until X shows up" in the crawler is the same loop: try, sleep a
//! fixed interval, give up after a deadline. `poll_until` is that loop.

use std::future::Future;
use std::time::{Duration, Instant};

/// Default interval between two attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Interval and deadline for a polled condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two attempts
    pub interval: Duration,
    /// Total time budget, measured from the first attempt
    pub timeout: Duration,
}

impl PollPolicy {
    /// Policy with the default interval
    pub fn new(timeout: Duration) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout,
        }
    }

    /// Policy from millisecond values, as stored in the configuration
    pub fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// The deadline passed without the condition being met
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    /// Time spent polling
    pub waited: Duration,
    /// Number of attempts made
    pub attempts: u32,
}

/// Runs `attempt` until it yields a value or the policy's deadline passes
///
/// The first attempt runs immediately, so a zero timeout still tries once.
/// Sleeps never overshoot the deadline by more than one attempt's duration.
///
/// # Example
///
/// ```
/// use listing_crawler::retry::{poll_until, PollPolicy};
/// use std::time::Duration;
///
/// # async fn example() {
/// let mut calls = 0;
/// let policy = PollPolicy::new(Duration::from_secs(1)).with_interval(Duration::from_millis(10));
/// let value = poll_until(policy, || {
///     calls += 1;
///     let ready = calls >= 3;
///     async move { ready.then_some(42) }
/// })
/// .await;
/// assert_eq!(value, Ok(42));
/// # }
/// ```
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut attempt: F) -> Result<T, Elapsed>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = attempt().await {
            return Ok(value);
        }

        let waited = start.elapsed();
        if waited >= policy.timeout {
            return Err(Elapsed { waited, attempts });
        }

        let remaining = policy.timeout - waited;
        tokio::time::sleep(policy.interval.min(remaining)).await;
    }
}
