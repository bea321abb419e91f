use thiserror::Error;

use crate::guard::moderation::ModerationResult;

/// Why a poll action was refused before reaching the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// Soft limit exceeded; clears when the window resets.
    #[error("too many attempts, try again in {}", wait(.retry_after_ms))]
    Throttled { retry_after_ms: u64, reset_time: u64 },

    /// Hard limit exceeded; clears only once `block_until` has passed.
    #[error("temporarily blocked, try again in {}", wait(.retry_after_ms))]
    Blocked { retry_after_ms: u64, block_until: u64 },

    /// Sanitization or moderation refused the text. Only the user can fix it.
    #[error("{reason}")]
    Rejected {
        reason: String,
        flagged_words: Vec<String>,
    },

    #[error("invalid limiter config: {0}")]
    InvalidConfig(String),
}

fn wait(ms: &u64) -> String {
    crate::limiter::format_time_remaining(*ms)
}

impl GuardError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
            flagged_words: Vec::new(),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            GuardError::Throttled { .. } => "throttled",
            GuardError::Blocked { .. } => "blocked",
            GuardError::Rejected { .. } => "rejected",
            GuardError::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<ModerationResult> for GuardError {
    fn from(r: ModerationResult) -> Self {
        Self::Rejected {
            reason: r.reason.unwrap_or_else(|| "Content rejected.".to_string()),
            flagged_words: r.flagged_words.unwrap_or_default(),
        }
    }
}
