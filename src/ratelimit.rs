//! Rate-limit budget tracking.
//!
//! The GitHub API exposes its budget through `x-ratelimit-*` response
//! headers. The tracker records that metadata after every call, persists
//! it across runs, and answers policy questions for callers. It never
//! blocks a call itself: callers consult it and decide what to do, and a
//! refused call still surfaces as an ordinary API error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Warn once the remaining budget drops below this mark.
pub const LOW_WATER_MARK: u32 = 100;

/// Tracked rate-limit state, updated from response metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Remaining requests in the current window, when known
    pub remaining: Option<u32>,

    /// When the window resets, when known
    pub reset_at: Option<DateTime<Utc>>,

    /// When exhaustion was first observed in the current window
    pub window_started_at: Option<DateTime<Utc>>,
}

impl RateLimit {
    /// Record rate-limit metadata from a response. Missing headers leave
    /// the existing values in place.
    pub fn observe(&mut self, remaining: Option<u32>, reset_at: Option<DateTime<Utc>>) {
        if let Some(remaining) = remaining {
            self.remaining = Some(remaining);
        }
        if let Some(reset_at) = reset_at {
            self.reset_at = Some(reset_at);
        }
    }

    /// Record an explicit exhaustion response (403 with a rate-limit
    /// message), which may arrive without usable headers.
    pub fn mark_exhausted(&mut self, reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.remaining = Some(0);
        self.window_started_at = Some(now);
        if let Some(reset_at) = reset_at {
            self.reset_at = Some(reset_at);
        }
    }

    /// Whether the budget is spent and the window has not yet reset.
    pub fn is_exhausted(&self, now: DateTime<Utc>) -> bool {
        self.remaining == Some(0) && self.reset_at.is_some_and(|reset| now < reset)
    }

    /// Whether the presentation layer should surface a warning: the
    /// budget is exhausted, or running low within an active window.
    pub fn should_warn(&self, now: DateTime<Utc>) -> bool {
        if self.is_exhausted(now) {
            return true;
        }
        match self.remaining {
            Some(remaining) => remaining < LOW_WATER_MARK && !self.reset_elapsed(now),
            None => false,
        }
    }

    /// Clear the state once the reset time has elapsed. Returns whether
    /// anything was cleared.
    pub fn clear_if_elapsed(&mut self, now: DateTime<Utc>) -> bool {
        if self.reset_elapsed(now) {
            *self = Self::default();
            return true;
        }
        false
    }

    /// Seconds until the window resets, clamped at zero. `None` when no
    /// reset time is known.
    pub fn seconds_until_reset(&self, now: DateTime<Utc>) -> Option<i64> {
        self.reset_at
            .map(|reset| (reset - now).num_seconds().max(0))
    }

    /// Whether any metadata has been observed.
    pub fn is_tracking(&self) -> bool {
        self.remaining.is_some() || self.reset_at.is_some()
    }

    fn reset_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.reset_at.is_some_and(|reset| now >= reset)
    }
}
