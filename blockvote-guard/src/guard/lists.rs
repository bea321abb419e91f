use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use anyhow::{bail, Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Moderation word lists as written in YAML.
///
/// The built-in defaults are used when no lists file is configured.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ModerationLists {
    pub version: Option<String>,
    #[serde(default)]
    pub keywords: Vec<KeywordGroup>,
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KeywordGroup {
    pub category: String,
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PatternSpec {
    pub category: String,
    pub pattern: String,
}

fn group(category: &str, words: &[&str]) -> KeywordGroup {
    KeywordGroup {
        category: category.to_string(),
        words: words.iter().map(|w| w.to_string()).collect(),
    }
}

fn pattern(category: &str, pattern: &str) -> PatternSpec {
    PatternSpec {
        category: category.to_string(),
        pattern: pattern.to_string(),
    }
}

impl Default for ModerationLists {
    fn default() -> Self {
        Self {
            version: Some("builtin".to_string()),
            keywords: vec![
                group("adult", &["porn", "sex", "xxx", "nsfw", "nude", "naked", "explicit"]),
                group("hate", &["racist", "nazi", "hate", "kill", "death"]),
                group(
                    "profanity",
                    &["fuck", "shit", "bitch", "ass", "damn", "hell", "cock", "dick", "pussy", "cunt"],
                ),
                group(
                    "illegal",
                    &["drug", "cocaine", "meth", "heroin", "illegal", "scam", "fraud", "steal"],
                ),
                group(
                    "spam",
                    &["click here", "buy now", "free money", "crypto giveaway", "airdrop", "double your"],
                ),
            ],
            patterns: vec![
                pattern("adult", r"\b(porn|sex|xxx|nsfw)\b"),
                pattern("hate", r"\b(nazi|hitler|genocide)\b"),
                pattern("profanity", r"\b(fuck|shit|bitch|damn)\b"),
                pattern("illegal", r"\b(scam|fraud|ponzi)\b"),
                pattern("spam", r"(click\s+here|buy\s+now)"),
                pattern("spam", r"\d+x\s+your\s+(money|crypto)"),
                pattern("spam", r"(free\s+(money|crypto|eth|btc))"),
            ],
        }
    }
}

impl ModerationLists {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("parse moderation lists yaml")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read moderation lists: {}", path.display()))?;
        Self::from_yaml(&yaml)
    }

    /// Fails on a bad pattern and on lists with nothing to match, so a
    /// truncated or mistyped file never switches moderation off.
    pub fn compile(&self) -> Result<CompiledLists> {
        let words: Vec<String> = self
            .keywords
            .iter()
            .flat_map(|g| g.words.iter())
            .map(|w| w.to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() && self.patterns.is_empty() {
            bail!("moderation lists have no keywords and no patterns");
        }

        let keywords = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&words)
            .context("build keyword automaton")?;

        let mut patterns = Vec::with_capacity(self.patterns.len());
        for p in &self.patterns {
            let re = RegexBuilder::new(&p.pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("invalid moderation pattern ({}): {}", p.category, p.pattern))?;
            patterns.push(CompiledPattern {
                category: p.category.clone(),
                re,
            });
        }

        Ok(CompiledLists {
            version: self.version.clone(),
            words,
            keywords,
            patterns,
        })
    }
}

#[derive(Debug)]
pub struct CompiledPattern {
    pub category: String,
    pub re: Regex,
}

/// Lists ready for matching.
#[derive(Debug)]
pub struct CompiledLists {
    pub version: Option<String>,
    words: Vec<String>,
    keywords: AhoCorasick,
    patterns: Vec<CompiledPattern>,
}

impl CompiledLists {
    pub fn builtin() -> Self {
        ModerationLists::default()
            .compile()
            .expect("builtin moderation lists compile")
    }

    /// Every listed keyword that occurs anywhere in `text`, in list order.
    pub fn flagged_words(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let hits: BTreeSet<usize> = self
            .keywords
            .find_overlapping_iter(&lowered)
            .map(|m| m.pattern().as_usize())
            .collect();

        let mut out: Vec<String> = Vec::with_capacity(hits.len());
        for i in hits {
            let w = &self.words[i];
            if !out.contains(w) {
                out.push(w.clone());
            }
        }
        out
    }

    /// Category of the first pattern matching `text`.
    pub fn matched_pattern(&self, text: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.re.is_match(text))
            .map(|p| p.category.as_str())
    }

    pub fn keyword_count(&self) -> usize {
        self.words.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_counts() {
        let c = CompiledLists::builtin();
        assert_eq!(c.keyword_count(), 36);
        assert_eq!(c.pattern_count(), 7);
    }

    #[test]
    fn flags_every_keyword_in_list_order() {
        let c = CompiledLists::builtin();
        assert_eq!(c.flagged_words("Damn, what the HELL, porn"), vec!["porn", "damn", "hell"]);
        // substring match, overlaps included
        assert_eq!(c.flagged_words("classic assassin"), vec!["ass"]);
        assert!(c.flagged_words("Best pizza topping?").is_empty());
    }

    #[test]
    fn patterns_are_case_insensitive() {
        let c = CompiledLists::builtin();
        assert_eq!(c.matched_pattern("10X YOUR CRYPTO today"), Some("spam"));
        assert_eq!(c.matched_pattern("Get FREE   eth"), Some("spam"));
        assert_eq!(c.matched_pattern("Is Hitler history?"), Some("hate"));
        assert_eq!(c.matched_pattern("Best color?"), None);
    }

    #[test]
    fn loads_custom_lists() {
        let lists = ModerationLists::from_yaml(
            r#"
version: "2026-01"
keywords:
  - category: spam
    words: ["Moon Soon"]
patterns:
  - category: spam
    pattern: 'rug\s*pull'
"#,
        )
        .unwrap();
        let c = lists.compile().unwrap();
        assert_eq!(c.version.as_deref(), Some("2026-01"));
        assert_eq!(c.flagged_words("MOON SOON guys"), vec!["moon soon"]);
        assert_eq!(c.matched_pattern("a RUG PULL?"), Some("spam"));
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let lists = ModerationLists {
            version: None,
            keywords: vec![],
            patterns: vec![pattern("x", "(unclosed")],
        };
        assert!(lists.compile().is_err());
    }

    #[test]
    fn empty_or_mistyped_lists_are_errors() {
        assert!(ModerationLists::from_yaml("keyword:\n  - category: spam\n    words: [lambo]\n").is_err());
        assert!(ModerationLists::from_yaml("keywords:\n  - category: spam\n    word: [lambo]\n").is_err());

        let empty = ModerationLists::from_yaml("version: \"x\"\nkeywords: []\n").unwrap();
        assert!(empty.compile().is_err());
    }
}
