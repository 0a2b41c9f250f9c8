//! Rate limiter (C8): sliding-window and token-bucket quota primitives,
//! composed by [`QuotaManager`] into the minute/hour/day tiers a request
//! must clear before admission.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    Ok,
    Warning,
    Exceeded,
    Disabled,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LimitCheck {
    pub allowed: bool,
    pub remaining: u64,
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
    pub retry_after: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Sliding window
// ---------------------------------------------------------------------------

/// Counts admissions in the trailing `window` per key. `check`/`consume`
/// both prune stale timestamps first so `remaining` always reflects the
/// live count in `(now - window, now]`.
pub struct SlidingWindowLimiter {
    limit: u64,
    window: Duration,
    admissions: DashMap<String, Mutex<Vec<DateTime<Utc>>>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u64, window: Duration) -> Self {
        Self { limit, window, admissions: DashMap::new() }
    }

    fn prune(&self, timestamps: &mut Vec<DateTime<Utc>>, now: DateTime<Utc>) {
        let cutoff = now - chrono::Duration::from_std(self.window).unwrap_or_default();
        timestamps.retain(|ts| *ts > cutoff);
    }

    /// Evaluate without admitting. Does not mutate the window.
    pub fn check(&self, key: &str) -> LimitCheck {
        let now = Utc::now();
        let entry = self.admissions.entry(key.to_string()).or_default();
        let mut timestamps = entry.lock().expect("sliding window lock poisoned");
        self.prune(&mut timestamps, now);
        self.result(&timestamps, now)
    }

    /// Evaluate and, if allowed, record this admission.
    pub fn consume(&self, key: &str) -> LimitCheck {
        let now = Utc::now();
        let entry = self.admissions.entry(key.to_string()).or_default();
        let mut timestamps = entry.lock().expect("sliding window lock poisoned");
        self.prune(&mut timestamps, now);
        let result = self.result(&timestamps, now);
        if result.allowed {
            timestamps.push(now);
        }
        result
    }

    pub fn reset(&self, key: &str) {
        self.admissions.remove(key);
    }

    fn result(&self, timestamps: &[DateTime<Utc>], now: DateTime<Utc>) -> LimitCheck {
        let count = timestamps.len() as u64;
        let oldest = timestamps.first().copied();
        let reset_at = oldest.map(|ts| ts + chrono::Duration::from_std(self.window).unwrap_or_default()).unwrap_or(now);
        if count < self.limit {
            LimitCheck { allowed: true, remaining: self.limit - count - 1, limit: self.limit, reset_at, retry_after: None }
        } else {
            let retry_after = oldest
                .map(|ts| (ts + chrono::Duration::from_std(self.window).unwrap_or_default()) - now)
                .and_then(|d| d.to_std().ok());
            LimitCheck { allowed: false, remaining: 0, limit: self.limit, reset_at, retry_after }
        }
    }
}

// ---------------------------------------------------------------------------
// Token bucket
// ---------------------------------------------------------------------------

struct Bucket {
    tokens: f64,
    last_update: std::time::Instant,
}

/// Refills lazily at `refill_rate` tokens/second up to `capacity`.
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_rate: f64,
    buckets: DashMap<String, Mutex<Bucket>>,
}

impl TokenBucketLimiter {
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self { capacity, refill_rate, buckets: DashMap::new() }
    }

    pub fn consume(&self, key: &str, n: f64) -> LimitCheck {
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Bucket { tokens: self.capacity, last_update: std::time::Instant::now() }));
        let mut bucket = entry.lock().expect("token bucket lock poisoned");

        let now = std::time::Instant::now();
        let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
        bucket.last_update = now;

        if bucket.tokens >= n {
            bucket.tokens -= n;
            LimitCheck {
                allowed: true,
                remaining: bucket.tokens.floor().max(0.0) as u64,
                limit: self.capacity as u64,
                reset_at: Utc::now(),
                retry_after: None,
            }
        } else {
            let deficit = n - bucket.tokens;
            let retry_after = Duration::from_secs_f64(deficit / self.refill_rate);
            LimitCheck {
                allowed: false,
                remaining: bucket.tokens.floor().max(0.0) as u64,
                limit: self.capacity as u64,
                reset_at: Utc::now(),
                retry_after: Some(retry_after),
            }
        }
    }

    pub fn reset(&self, key: &str) {
        self.buckets.remove(key);
    }
}

// ---------------------------------------------------------------------------
// Quota manager: minute/hour/day sliding windows under one config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub per_minute: u64,
    pub per_hour: u64,
    pub per_day: u64,
    /// Fraction of a tier's limit remaining below which status is `Warning`.
    pub warning_threshold: f64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { per_minute: 60, per_hour: 1000, per_day: 10_000, warning_threshold: 0.1 }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QuotaOutcome {
    pub status: QuotaStatus,
    pub minute: LimitCheck,
    pub hour: LimitCheck,
    pub day: LimitCheck,
    pub retry_after: Option<Duration>,
}

/// Composes minute/hour/day sliding windows. A request is admitted only
/// when all three pass: check-all, then consume-all, so a denial at the
/// hour tier never partially consumes the minute or day tiers.
pub struct QuotaManager {
    config: QuotaConfig,
    minute: SlidingWindowLimiter,
    hour: SlidingWindowLimiter,
    day: SlidingWindowLimiter,
}

impl QuotaManager {
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            minute: SlidingWindowLimiter::new(config.per_minute, Duration::from_secs(60)),
            hour: SlidingWindowLimiter::new(config.per_hour, Duration::from_secs(3600)),
            day: SlidingWindowLimiter::new(config.per_day, Duration::from_secs(86_400)),
            config,
        }
    }

    /// Check all three tiers, then, only if all pass, consume from all
    /// three. Returns the combined outcome either way.
    pub fn check_and_consume(&self, key: &str) -> QuotaOutcome {
        let minute_check = self.minute.check(key);
        let hour_check = self.hour.check(key);
        let day_check = self.day.check(key);

        let all_allowed = minute_check.allowed && hour_check.allowed && day_check.allowed;
        let (minute, hour, day) = if all_allowed {
            (self.minute.consume(key), self.hour.consume(key), self.day.consume(key))
        } else {
            (minute_check, hour_check, day_check)
        };

        let retry_after = [&minute, &hour, &day]
            .iter()
            .filter(|c| !c.allowed)
            .filter_map(|c| c.retry_after)
            .max();

        let status = if !all_allowed {
            QuotaStatus::Exceeded
        } else if self.any_tier_low(&minute, &hour, &day) {
            QuotaStatus::Warning
        } else {
            QuotaStatus::Ok
        };

        QuotaOutcome { status, minute, hour, day, retry_after }
    }

    fn any_tier_low(&self, minute: &LimitCheck, hour: &LimitCheck, day: &LimitCheck) -> bool {
        let low = |check: &LimitCheck| {
            check.limit > 0 && (check.remaining as f64) < (check.limit as f64) * self.config.warning_threshold
        };
        low(minute) || low(hour) || low(day)
    }

    pub fn reset(&self, key: &str) {
        self.minute.reset(key);
        self.hour.reset(key);
        self.day.reset(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_denies_the_sixth_of_five() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.consume("user").allowed);
        }
        let sixth = limiter.consume("user");
        assert!(!sixth.allowed);
        assert!(sixth.retry_after.unwrap() > Duration::from_secs(0));
    }

    #[test]
    fn reset_restores_full_remaining() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            limiter.consume("user");
        }
        limiter.reset("user");
        let check = limiter.check("user");
        assert_eq!(check.remaining, 2);
        assert!(check.allowed);
    }

    #[test]
    fn token_bucket_denies_when_insufficient_and_reports_retry_after() {
        let limiter = TokenBucketLimiter::new(1.0, 1.0);
        assert!(limiter.consume("user", 1.0).allowed);
        let denied = limiter.consume("user", 1.0);
        assert!(!denied.allowed);
        assert!(denied.retry_after.is_some());
    }

    #[test]
    fn quota_manager_denies_without_partially_consuming_other_tiers() {
        let config = QuotaConfig { per_minute: 1, per_hour: 100, per_day: 1000, warning_threshold: 0.1 };
        let manager = QuotaManager::new(config);
        let first = manager.check_and_consume("user");
        assert_eq!(first.status, QuotaStatus::Ok);
        let second = manager.check_and_consume("user");
        assert_eq!(second.status, QuotaStatus::Exceeded);
        // the minute tier denied; hour/day must not have been consumed by the denied attempt
        assert_eq!(second.hour.remaining, first.hour.remaining);
        assert_eq!(second.day.remaining, first.day.remaining);
    }

    #[test]
    fn quota_manager_reset_allows_full_quota_again() {
        let config = QuotaConfig { per_minute: 1, per_hour: 100, per_day: 1000, warning_threshold: 0.1 };
        let manager = QuotaManager::new(config);
        manager.check_and_consume("user");
        assert_eq!(manager.check_and_consume("user").status, QuotaStatus::Exceeded);
        manager.reset("user");
        assert_eq!(manager.check_and_consume("user").status, QuotaStatus::Ok);
    }

    #[test]
    fn warning_status_when_remaining_below_threshold() {
        let config = QuotaConfig { per_minute: 10, per_hour: 1000, per_day: 10_000, warning_threshold: 0.2 };
        let manager = QuotaManager::new(config);
        for _ in 0..9 {
            manager.check_and_consume("user");
        }
        assert_eq!(manager.check_and_consume("user").status, QuotaStatus::Warning);
    }
}
