use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use crate::error::GuardError;
use crate::metrics;

/// Limiter parameters for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitParams {
    /// Attempts allowed per window.
    pub max_requests: u32,
    pub window_ms: u64,
    pub block_duration_ms: u64,
    /// Extra attempts tolerated above `max_requests` before a hard block.
    #[serde(default = "default_max_blocked_attempts")]
    pub max_blocked_attempts: u32,
}

fn default_max_blocked_attempts() -> u32 {
    3
}

impl Default for LimitParams {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_ms: 60_000,
            block_duration_ms: 300_000,
            max_blocked_attempts: default_max_blocked_attempts(),
        }
    }
}

impl LimitParams {
    pub fn validate(&self) -> Result<(), GuardError> {
        if self.max_requests == 0 {
            return Err(GuardError::InvalidConfig("max_requests must be > 0".into()));
        }
        if self.window_ms == 0 {
            return Err(GuardError::InvalidConfig("window_ms must be > 0".into()));
        }
        if self.block_duration_ms == 0 {
            return Err(GuardError::InvalidConfig("block_duration_ms must be > 0".into()));
        }
        Ok(())
    }

    fn hard_limit(&self) -> u64 {
        self.max_requests as u64 + self.max_blocked_attempts as u64
    }
}

/// Result of one `check_limit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: u64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_until: Option<u64>,
}

impl LimitDecision {
    /// How long the caller has to wait before the next attempt can pass.
    pub fn retry_after_ms(&self, now: u64) -> u64 {
        match self.block_until {
            Some(until) if self.blocked => until.saturating_sub(now),
            _ => self.reset_time.saturating_sub(now),
        }
    }

    pub fn into_result(self, now: u64) -> Result<Self, GuardError> {
        if self.allowed {
            return Ok(self);
        }
        let retry_after_ms = self.retry_after_ms(now);
        match self.block_until {
            Some(block_until) if self.blocked => Err(GuardError::Blocked {
                retry_after_ms,
                block_until,
            }),
            _ => Err(GuardError::Throttled {
                retry_after_ms,
                reset_time: self.reset_time,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LimitKey {
    identifier: String,
    action: String,
}

/// State for one (identifier, action) pair.
#[derive(Debug, Clone)]
struct Entry {
    count: u64,
    reset_time: u64,
    blocked: bool,
    block_until: u64,
}

impl Entry {
    fn fresh(now: u64, p: &LimitParams) -> Self {
        Self {
            count: 1,
            reset_time: now.saturating_add(p.window_ms),
            blocked: false,
            block_until: 0,
        }
    }

    fn is_blocked_at(&self, now: u64) -> bool {
        self.blocked && self.block_until > now
    }

    fn is_stale_at(&self, now: u64) -> bool {
        self.reset_time <= now && (!self.blocked || self.block_until <= now)
    }
}

/// Fixed-window counter with escalating temporary blocks.
///
/// Client-side speed bump only: the voting contract is the authority on
/// one-vote-per-address. Each call to `check_limit` holds the map shard lock
/// for its key across the whole read-modify-write, and `sweep` takes the same
/// locks, so the limiter is safe to share across threads.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: String,
    params: LimitParams,
    table: Arc<DashMap<LimitKey, Entry>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, params: LimitParams) -> Result<Self, GuardError> {
        Self::with_clock(name, params, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: impl Into<String>,
        params: LimitParams,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GuardError> {
        params.validate()?;
        Ok(Self {
            name: name.into(),
            params,
            table: Arc::new(DashMap::new()),
            clock,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &LimitParams {
        &self.params
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn check_limit(&self, identifier: &str, action: &str) -> LimitDecision {
        let now = self.clock.now_ms();
        let p = &self.params;
        let key = LimitKey {
            identifier: identifier.to_string(),
            action: action.to_string(),
        };

        let mut e = match self.table.entry(key) {
            MapEntry::Vacant(v) => {
                let e = v.insert(Entry::fresh(now, p));
                return allowed(p, &e);
            }
            MapEntry::Occupied(o) => o.into_ref(),
        };

        if e.is_blocked_at(now) {
            return LimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: e.reset_time,
                blocked: true,
                block_until: Some(e.block_until),
            };
        }

        // window elapsed, or a block just ran out
        if e.reset_time <= now || e.blocked {
            *e = Entry::fresh(now, p);
            return allowed(p, &e);
        }

        e.count += 1;

        if e.count > p.hard_limit() {
            e.blocked = true;
            e.block_until = now.saturating_add(p.block_duration_ms);
            metrics::counters::inc_limiter_block(&self.name);
            tracing::warn!(
                limiter = %self.name,
                identifier = %identifier,
                action = %action,
                count = e.count,
                block_until = e.block_until,
                "rate limit block"
            );
            return LimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: e.reset_time,
                blocked: true,
                block_until: Some(e.block_until),
            };
        }

        if e.count > p.max_requests as u64 {
            tracing::debug!(limiter = %self.name, identifier = %identifier, action = %action, count = e.count, "rate limit throttle");
            return LimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: e.reset_time,
                blocked: false,
                block_until: None,
            };
        }

        allowed(p, &e)
    }

    /// Forget the entry for this pair, e.g. after an action completed and
    /// should not count against the caller.
    pub fn reset(&self, identifier: &str, action: &str) {
        self.table.remove(&LimitKey {
            identifier: identifier.to_string(),
            action: action.to_string(),
        });
    }

    /// Drop entries whose window is over and that are not in an active block.
    /// Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.table.len();
        self.table.retain(|_, e| !e.is_stale_at(now));
        let removed = before.saturating_sub(self.table.len());
        metrics::counters::set_limiter_entries(&self.name, self.table.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn allowed(p: &LimitParams, e: &Entry) -> LimitDecision {
    LimitDecision {
        allowed: true,
        remaining: (p.max_requests as u64).saturating_sub(e.count) as u32,
        reset_time: e.reset_time,
        blocked: false,
        block_until: None,
    }
}
