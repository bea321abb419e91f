pub mod lists;
pub mod moderation;
pub mod patterns;
pub mod sanitize;
pub mod update;

pub use lists::{CompiledLists, ModerationLists};
pub use moderation::{ModerationResult, Moderator};
pub use patterns::{detect_suspicious_patterns, is_valid_url, validate_urls_in_text};
pub use sanitize::{sanitize_array, sanitize_html, sanitize_input, sanitize_poll_input, sanitize_question_input};
