//! Detects a mirror that has fallen behind the server
//!
//! Sync messages are stamped with the server's wall clock. When one arrives
//! too long after it was produced, the mirror is likely missing datagrams and
//! a fresh full state is requested. Requests are throttled so a slow link
//! does not turn into a stream of full states.

use log::{debug, warn};
use std::time::{Duration, Instant};

pub const STALE_THRESHOLD: Duration = Duration::from_millis(1500);
pub const FULL_STATE_THROTTLE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StalenessMonitor {
    threshold: Duration,
    throttle: Duration,
    last_request: Option<Instant>,
}

impl Default for StalenessMonitor {
    fn default() -> Self {
        Self::new(STALE_THRESHOLD, FULL_STATE_THROTTLE)
    }
}

impl StalenessMonitor {
    pub fn new(threshold: Duration, throttle: Duration) -> Self {
        Self {
            threshold,
            throttle,
            last_request: None,
        }
    }

    /// Returns true when the caller should request a full state.
    ///
    /// `server_time` and `received_millis` are unix milliseconds, `now` drives
    /// the throttle.
    pub fn observe(&mut self, server_time: u64, received_millis: u64, now: Instant) -> bool {
        let lag = Duration::from_millis(received_millis.saturating_sub(server_time));
        if lag <= self.threshold {
            return false;
        }

        if let Some(last) = self.last_request {
            if now.duration_since(last) < self.throttle {
                debug!("Sync lag {:?}, full state already requested", lag);
                return false;
            }
        }

        warn!(
            "Sync message arrived {} ms after it was sent, requesting full state",
            lag.as_millis()
        );
        self.last_request = Some(now);
        true
    }
}
