use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use super::lists::CompiledLists;
use super::patterns::count_urls;

pub const REASON_TOO_SHORT: &str = "Content is too short. Please provide meaningful text.";
pub const REASON_SHOUTING: &str = "Excessive use of capital letters is not allowed.";
pub const REASON_SPECIAL_CHARS: &str = "Excessive use of special characters is not allowed.";
pub const REASON_KEYWORDS: &str = "Content contains inappropriate or prohibited words.";
pub const REASON_GUIDELINES: &str = "Content violates community guidelines.";
pub const REASON_MULTIPLE_URLS: &str = "Multiple URLs are not allowed in polls.";

/// Capital letters in a row needed (with the length and case checks) to
/// count as shouting.
const SHOUT_RUN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub is_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged_words: Option<Vec<String>>,
}

impl ModerationResult {
    pub fn allowed() -> Self {
        Self {
            is_allowed: true,
            reason: None,
            flagged_words: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_allowed: false,
            reason: Some(reason.into()),
            flagged_words: None,
        }
    }
}

/// Content moderation over swappable word lists.
#[derive(Clone)]
pub struct Moderator {
    lists: Arc<ArcSwap<CompiledLists>>,
}

impl Default for Moderator {
    fn default() -> Self {
        Self::new(CompiledLists::builtin())
    }
}

impl Moderator {
    pub fn new(initial: CompiledLists) -> Self {
        Self {
            lists: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    pub fn swap_lists(&self, new_lists: CompiledLists) {
        self.lists.store(Arc::new(new_lists));
    }

    pub fn lists_snapshot(&self) -> Arc<CompiledLists> {
        self.lists.load_full()
    }

    /// Checks, in order: length, shouting, special-character density,
    /// keywords, patterns, link count. The first failing check decides.
    pub fn moderate_content(&self, text: &str) -> ModerationResult {
        let trimmed = text.trim();
        if trimmed.chars().count() < 3 {
            return ModerationResult::rejected(REASON_TOO_SHORT);
        }

        let len = text.chars().count();
        if len > 20 && text == text.to_uppercase() && longest_upper_run(text) >= SHOUT_RUN {
            return ModerationResult::rejected(REASON_SHOUTING);
        }

        let special = text.chars().filter(|c| "!@#$%^&*()".contains(*c)).count();
        if special as f64 > len as f64 * 0.3 {
            return ModerationResult::rejected(REASON_SPECIAL_CHARS);
        }

        let lists = self.lists.load();
        let flagged = lists.flagged_words(text);
        if !flagged.is_empty() {
            return ModerationResult {
                is_allowed: false,
                reason: Some(REASON_KEYWORDS.to_string()),
                flagged_words: Some(flagged),
            };
        }

        if let Some(category) = lists.matched_pattern(text) {
            tracing::debug!(category = %category, "moderation pattern hit");
            return ModerationResult::rejected(REASON_GUIDELINES);
        }

        if count_urls(text) > 1 {
            return ModerationResult::rejected(REASON_MULTIPLE_URLS);
        }

        ModerationResult::allowed()
    }

    /// Question first, then each option; stops at the first rejection.
    pub fn moderate_poll<S: AsRef<str>>(&self, question: &str, options: &[S]) -> ModerationResult {
        let q = self.moderate_content(question);
        if !q.is_allowed {
            return q;
        }

        for (i, opt) in options.iter().enumerate() {
            let r = self.moderate_content(opt.as_ref());
            if !r.is_allowed {
                return ModerationResult {
                    is_allowed: false,
                    reason: Some(format!(
                        "Option {}: {}",
                        i + 1,
                        r.reason.unwrap_or_default()
                    )),
                    flagged_words: r.flagged_words,
                };
            }
        }

        ModerationResult::allowed()
    }
}

/// Longest run of ASCII capitals. Whitespace continues a run, anything else
/// ends it, so "THIS IS SHOUTING" is one run of 14. Keep the whitespace
/// rule: a strict `[A-Z]{10,}` run lets "THIS IS SHOUTING TEXT HERE" through.
fn longest_upper_run(text: &str) -> usize {
    let mut best = 0;
    let mut run = 0;
    for c in text.chars() {
        if c.is_ascii_uppercase() {
            run += 1;
            best = best.max(run);
        } else if !c.is_whitespace() {
            run = 0;
        }
    }
    best
}
