//! # fedmesh Runtime
//!
//! Async runtime glue for fedmesh.
//!
//! The exchange protocol has exactly one way of waiting: re-checking a
//! predicate over live shared state at a fixed interval. Peer arrivals and
//! inbound weights come from an external push source with no backpressure,
//! so there is no single event to block on; timed polling over a fresh
//! re-read satisfies the same contract as a condition-variable wait.

use core::time::Duration;
use std::fmt;

use tokio::time::{sleep, Instant};

/// A bounded wait expired before its predicate became true
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeout {
    /// The budget that was exhausted
    pub budget: Duration,
}

impl fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "condition not met within {:?}", self.budget)
    }
}

impl std::error::Error for WaitTimeout {}

/// Suspend the calling task until `predicate` returns true.
///
/// The predicate is re-evaluated at `poll_interval` boundaries and must
/// read its inputs fresh on every call; it is `FnMut` so callers can fold
/// state maintenance (such as draining an event queue) into the re-check.
/// With `timeout` set, the wait fails with [`WaitTimeout`] once the budget
/// is exhausted; without it the wait is unbounded. The final sleep of a
/// bounded wait is clamped so the deadline is never overshot.
pub async fn await_condition<F>(
    mut predicate: F,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> Result<(), WaitTimeout>
where
    F: FnMut() -> bool,
{
    let deadline = timeout.map(|budget| Instant::now() + budget);
    loop {
        if predicate() {
            return Ok(());
        }
        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(WaitTimeout {
                        budget: timeout.unwrap_or_default(),
                    });
                }
                poll_interval.min(deadline - now)
            }
            None => poll_interval,
        };
        sleep(pause).await;
    }
}
