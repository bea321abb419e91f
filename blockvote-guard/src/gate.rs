use serde::{Deserialize, Serialize};

use crate::error::GuardError;
use crate::guard::moderation::Moderator;
use crate::guard::patterns::{suspicious_pattern, validate_urls_in_text};
use crate::guard::sanitize::{sanitize_array, sanitize_question_input};
use crate::limiter::identity::{client_identifier, BrowserFingerprint};
use crate::limiter::policy::{GuardAction, LimiterSet};
use crate::limiter::window::LimitDecision;
use crate::metrics;

pub const MIN_OPTIONS: usize = 2;

/// Same floor moderation applies to the raw text, checked again after
/// SQL keywords have been stripped.
const MIN_QUESTION_CHARS: usize = 3;
const REASON_QUESTION_EMPTIED: &str = "Question is empty after sanitization.";

/// Whoever is asking, as the front end knows them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Caller {
    pub wallet: Option<String>,
    pub fingerprint: Option<BrowserFingerprint>,
}

impl Caller {
    pub fn wallet(address: impl Into<String>) -> Self {
        Self {
            wallet: Some(address.into()),
            fingerprint: None,
        }
    }

    pub fn identifier(&self) -> String {
        client_identifier(self.wallet.as_deref(), self.fingerprint.as_ref())
    }
}

/// Poll fields cleared for submission to the voting contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedPoll {
    pub identifier: String,
    pub question: String,
    pub options: Vec<String>,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteTicket {
    pub identifier: String,
    pub poll_id: u64,
    pub remaining: u32,
}

/// Runs the limiter and the input guard in front of every chain write.
#[derive(Clone)]
pub struct PollGate {
    limiters: LimiterSet,
    moderator: Moderator,
}

impl PollGate {
    pub fn new(limiters: LimiterSet, moderator: Moderator) -> Self {
        Self { limiters, moderator }
    }

    pub fn limiters(&self) -> &LimiterSet {
        &self.limiters
    }

    pub fn moderator(&self) -> &Moderator {
        &self.moderator
    }

    pub fn create_poll<S: AsRef<str>>(
        &self,
        caller: &Caller,
        question: &str,
        options: &[S],
    ) -> Result<SanitizedPoll, GuardError> {
        let action = GuardAction::CreatePoll;
        let identifier = caller.identifier();
        let res = self
            .throttle(&identifier, action)
            .and_then(|d| self.check_poll_text(question, options).map(|_| d))
            .and_then(|d| {
                let question = sanitize_question_input(question);
                if question.chars().count() < MIN_QUESTION_CHARS {
                    return Err(GuardError::rejected(REASON_QUESTION_EMPTIED));
                }
                let options = sanitize_array(options);
                if options.len() < MIN_OPTIONS {
                    return Err(GuardError::rejected(format!(
                        "A poll needs at least {MIN_OPTIONS} options."
                    )));
                }
                Ok(SanitizedPoll {
                    identifier: identifier.clone(),
                    question,
                    options,
                    remaining: d.remaining,
                })
            });
        self.record(action, &identifier, &res);
        res
    }

    pub fn cast_vote(&self, caller: &Caller, poll_id: u64) -> Result<VoteTicket, GuardError> {
        let action = GuardAction::Vote;
        let identifier = caller.identifier();
        let res = self.throttle(&identifier, action).map(|d| VoteTicket {
            identifier: identifier.clone(),
            poll_id,
            remaining: d.remaining,
        });
        self.record(action, &identifier, &res);
        res
    }

    pub fn load_polls(&self, caller: &Caller) -> Result<LimitDecision, GuardError> {
        let action = GuardAction::LoadPolls;
        let identifier = caller.identifier();
        let res = self.throttle(&identifier, action);
        self.record(action, &identifier, &res);
        res
    }

    fn throttle(&self, identifier: &str, action: GuardAction) -> Result<LimitDecision, GuardError> {
        let limiter = self.limiters.limiter(action);
        let now = limiter.now_ms();
        limiter.check_limit(identifier, action.as_str()).into_result(now)
    }

    /// Hard checks on the raw text. Injection markers and bad links are
    /// refused as typed, never scrubbed into something acceptable.
    fn check_poll_text<S: AsRef<str>>(&self, question: &str, options: &[S]) -> Result<(), GuardError> {
        let fields = std::iter::once(("Question".to_string(), question))
            .chain(options.iter().enumerate().map(|(i, o)| (format!("Option {}", i + 1), o.as_ref())));

        for (label, text) in fields {
            if let Some(marker) = suspicious_pattern(text) {
                tracing::warn!(field = %label, marker, "suspicious poll input");
                return Err(GuardError::rejected(format!(
                    "{label} contains potentially malicious content."
                )));
            }
            if !validate_urls_in_text(text) {
                return Err(GuardError::rejected(format!(
                    "{label} contains an invalid or disallowed link."
                )));
            }
        }

        let verdict = self.moderator.moderate_poll(question, options);
        if !verdict.is_allowed {
            return Err(verdict.into());
        }
        Ok(())
    }

    fn record<T>(&self, action: GuardAction, identifier: &str, res: &Result<T, GuardError>) {
        match res {
            Ok(_) => {
                metrics::counters::inc_decision(action.as_str(), "allow");
                tracing::debug!(action = %action, identifier = %identifier, "gate allow");
            }
            Err(e) => {
                metrics::counters::inc_decision(action.as_str(), e.kind_str());
                tracing::info!(action = %action, identifier = %identifier, kind = e.kind_str(), reason = %e, "gate refuse");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::clock::ManualClock;
    use crate::limiter::policy::LimitsConfig;
    use std::sync::Arc;

    const WALLET: &str = "0xAbC0000000000000000000000000000000000001";

    fn gate() -> (PollGate, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let limiters = LimiterSet::with_clock(&LimitsConfig::default(), Arc::new(clock.clone())).unwrap();
        (PollGate::new(limiters, Moderator::default()), clock)
    }

    #[test]
    fn clean_poll_passes_sanitized() {
        let (g, _c) = gate();
        let err = g
            .create_poll(&Caller::wallet(WALLET), "  Best   color? ", &["Red", " Blue ", ""])
            .unwrap_err();
        // the empty option is refused by moderation
        assert_eq!(
            err,
            GuardError::rejected("Option 3: Content is too short. Please provide meaningful text.")
        );

        let p = g
            .create_poll(&Caller::wallet(WALLET), "  Best   color? ", &["Red", " Blue "])
            .unwrap();
        assert_eq!(p.identifier, WALLET.to_ascii_lowercase());
        assert_eq!(p.question, "Best color?");
        assert_eq!(p.options, vec!["Red".to_string(), "Blue".to_string()]);
    }

    #[test]
    fn script_is_rejected_not_scrubbed() {
        let (g, _c) = gate();
        let err = g
            .create_poll(&Caller::default(), "<script>alert(1)</script> Best color?", &["Red", "Blue"])
            .unwrap_err();
        assert_eq!(
            err,
            GuardError::rejected("Question contains potentially malicious content.")
        );

        let err = g
            .create_poll(&Caller::default(), "Best color?", &["Red", "see ftp://x.io"])
            .unwrap_err();
        assert_eq!(
            err,
            GuardError::rejected("Option 2 contains an invalid or disallowed link.")
        );
    }

    #[test]
    fn moderation_failure_names_option() {
        let (g, _c) = gate();
        let err = g
            .create_poll(&Caller::default(), "Best color?", &["Red", "Blue", "fuck green"])
            .unwrap_err();
        match err {
            GuardError::Rejected { reason, flagged_words } => {
                assert!(reason.starts_with("Option 3:"));
                assert_eq!(flagged_words, vec!["fuck".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn question_of_sql_tokens_is_rejected() {
        let (g, _c) = gate();
        let err = g
            .create_poll(&Caller::default(), "DROP UNION EXEC", &["Red", "Blue"])
            .unwrap_err();
        assert_eq!(err, GuardError::rejected("Question is empty after sanitization."));
    }

    #[test]
    fn single_option_poll_is_rejected() {
        let (g, _c) = gate();
        let err = g.create_poll(&Caller::default(), "Best color?", &["Red"]).unwrap_err();
        assert_eq!(err, GuardError::rejected("A poll needs at least 2 options."));
    }

    #[test]
    fn poll_creation_is_throttled_per_wallet() {
        let (g, c) = gate();
        let me = Caller::wallet(WALLET);
        assert!(g.create_poll(&me, "First poll?", &["Yes", "Nope"]).is_ok());
        assert!(g.create_poll(&me, "Second poll?", &["Yes", "Nope"]).is_ok());

        c.advance(60_000);
        match g.create_poll(&me, "Third poll?", &["Yes", "Nope"]) {
            Err(GuardError::Throttled { retry_after_ms, .. }) => assert_eq!(retry_after_ms, 3_540_000),
            other => panic!("unexpected {other:?}"),
        }

        // a different wallet is unaffected
        let other = Caller::wallet("0x0000000000000000000000000000000000000002");
        assert!(g.create_poll(&other, "Third poll?", &["Yes", "Nope"]).is_ok());
    }

    #[test]
    fn voting_escalates_to_block() {
        let (g, c) = gate();
        let me = Caller::wallet(WALLET);
        for _ in 0..20 {
            assert!(g.cast_vote(&me, 7).is_ok());
        }
        for _ in 0..3 {
            assert!(matches!(g.cast_vote(&me, 7), Err(GuardError::Throttled { .. })));
        }
        match g.cast_vote(&me, 7) {
            Err(GuardError::Blocked { retry_after_ms, .. }) => assert_eq!(retry_after_ms, 300_000),
            other => panic!("unexpected {other:?}"),
        }

        c.advance(300_000);
        let t = g.cast_vote(&me, 7).unwrap();
        assert_eq!(t.remaining, 19);
        assert_eq!(t.poll_id, 7);
    }

    #[test]
    fn load_polls_uses_read_limiter() {
        let (g, _c) = gate();
        let d = g.load_polls(&Caller::default()).unwrap();
        assert_eq!(d.remaining, 59);
    }
}
