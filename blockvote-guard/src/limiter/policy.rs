use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::window::{LimitDecision, LimitParams, RateLimiter};
use crate::error::GuardError;

/// Actions the poll front end throttles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardAction {
    CreatePoll,
    Vote,
    LoadPolls,
}

impl GuardAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardAction::CreatePoll => "create_poll",
            GuardAction::Vote => "vote",
            GuardAction::LoadPolls => "load_polls",
        }
    }
}

impl std::fmt::Display for GuardAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named limiter presets.
pub struct LimitPolicy;

impl LimitPolicy {
    /// 2 polls per hour, 1h block.
    pub fn poll_creation() -> LimitParams {
        LimitParams {
            max_requests: 2,
            window_ms: 3_600_000,
            block_duration_ms: 3_600_000,
            max_blocked_attempts: 3,
        }
    }

    /// 20 votes per minute, 5min block.
    pub fn voting() -> LimitParams {
        LimitParams {
            max_requests: 20,
            window_ms: 60_000,
            block_duration_ms: 300_000,
            max_blocked_attempts: 3,
        }
    }

    /// 60 loads per minute, 1min block.
    pub fn poll_load() -> LimitParams {
        LimitParams {
            max_requests: 60,
            window_ms: 60_000,
            block_duration_ms: 60_000,
            max_blocked_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "LimitPolicy::poll_creation")]
    pub poll_creation: LimitParams,
    #[serde(default = "LimitPolicy::voting")]
    pub voting: LimitParams,
    #[serde(default = "LimitPolicy::poll_load")]
    pub poll_load: LimitParams,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            poll_creation: LimitPolicy::poll_creation(),
            voting: LimitPolicy::voting(),
            poll_load: LimitPolicy::poll_load(),
        }
    }
}

/// One limiter per action, owned by whoever builds the gate.
///
/// Clones share state, so a single set handed to every handler of a session
/// behaves like one shared limiter per action.
#[derive(Debug, Clone)]
pub struct LimiterSet {
    create_poll: RateLimiter,
    vote: RateLimiter,
    load_polls: RateLimiter,
}

impl LimiterSet {
    pub fn new(cfg: &LimitsConfig) -> Result<Self, GuardError> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: &LimitsConfig, clock: Arc<dyn Clock>) -> Result<Self, GuardError> {
        Ok(Self {
            create_poll: RateLimiter::with_clock("poll_creation", cfg.poll_creation, clock.clone())?,
            vote: RateLimiter::with_clock("voting", cfg.voting, clock.clone())?,
            load_polls: RateLimiter::with_clock("poll_load", cfg.poll_load, clock)?,
        })
    }

    pub fn limiter(&self, action: GuardAction) -> &RateLimiter {
        match action {
            GuardAction::CreatePoll => &self.create_poll,
            GuardAction::Vote => &self.vote,
            GuardAction::LoadPolls => &self.load_polls,
        }
    }

    pub fn check(&self, identifier: &str, action: GuardAction) -> LimitDecision {
        self.limiter(action).check_limit(identifier, action.as_str())
    }

    pub fn all(&self) -> [&RateLimiter; 3] {
        [&self.create_poll, &self.vote, &self.load_polls]
    }

    pub fn sweep(&self) -> usize {
        self.all().iter().map(|l| l.sweep()).sum()
    }
}
