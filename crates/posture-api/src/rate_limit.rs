use std::collections::VecDeque;

use posture_core::Timestamp;

use crate::config::LimitsConfig;

/// Sliding-window message limiter for one connection
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_messages: usize,
    window_secs: f64,
    accepted: VecDeque<Timestamp>,
}

impl RateLimiter {
    pub fn new(max_messages: usize, window_secs: f64) -> Self {
        Self {
            max_messages,
            window_secs,
            accepted: VecDeque::with_capacity(max_messages),
        }
    }

    pub fn from_limits(limits: &LimitsConfig) -> Self {
        Self::new(limits.max_messages_per_window, limits.rate_window_secs)
    }

    pub fn allow(&mut self) -> bool {
        self.allow_at(Timestamp::now())
    }

    /// Record a message at `now` if the window has room; rejected messages are not counted
    pub fn allow_at(&mut self, now: Timestamp) -> bool {
        while let Some(oldest) = self.accepted.front() {
            if now.secs_since(*oldest) < self.window_secs {
                break;
            }
            self.accepted.pop_front();
        }

        if self.accepted.len() >= self.max_messages {
            return false;
        }
        self.accepted.push_back(now);
        true
    }
}
