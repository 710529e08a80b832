use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Admission-control policy: at most `max` calls per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn per_window(max: u32, window_seconds: u64) -> Self {
        Self {
            max,
            window: Duration::from_secs(window_seconds),
        }
    }
}

/// Outcome of a rate-limit check. `retry_after_seconds` is positive only
/// when the call was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub retry_after_seconds: u64,
}

impl RateLimitDecision {
    const ALLOWED: Self = Self {
        allowed: true,
        retry_after_seconds: 0,
    };
}

/// Bounds write frequency per logical key (phone number, admin id). The
/// backend is injectable; the in-memory default is per-process and does not
/// share state across server instances.
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision;
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counter map. Increments happen under one mutex so
/// concurrent callers for the same key cannot lose updates. Counters are
/// not persisted across restarts; this is admission control, not a
/// security boundary.
#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_at(&self, key: &str, policy: RateLimitPolicy, now: Instant) -> RateLimitDecision {
        if policy.max == 0 {
            return RateLimitDecision {
                allowed: false,
                retry_after_seconds: policy.window.as_secs().max(1),
            };
        }

        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let window = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(window.started_at) >= policy.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= policy.max {
            let elapsed = now.duration_since(window.started_at);
            let remaining = policy.window.saturating_sub(elapsed);
            return RateLimitDecision {
                allowed: false,
                retry_after_seconds: ceil_seconds(remaining).max(1),
            };
        }

        window.count += 1;
        RateLimitDecision::ALLOWED
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        self.check_at(key, policy, Instant::now())
    }
}

fn ceil_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
