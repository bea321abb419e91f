//! Who is acting, as far as the limiter can tell.
//!
//! A connected wallet address is the preferred identifier. Without one the
//! limiter falls back to a browser fingerprint, which any client can change at
//! will: it slows down casual repeat submissions and nothing more. The voting
//! contract is what actually enforces one vote per address.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("address regex"));

/// Browser traits the fallback identifier is derived from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowserFingerprint {
    pub user_agent: String,
    pub language: String,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Minutes, as reported by the browser (`getTimezoneOffset`).
    pub timezone_offset: i32,
}

impl BrowserFingerprint {
    /// Stable `browser_<hex>` identifier for these traits.
    pub fn identifier(&self) -> String {
        let raw = format!(
            "{}|{}|{}|{}|{}",
            self.user_agent, self.language, self.screen_width, self.screen_height, self.timezone_offset
        );
        let digest = Sha256::digest(raw.as_bytes());
        format!("browser_{}", &hex::encode(digest)[..16])
    }
}

/// Limiter identifier for a caller: lower-cased wallet address when
/// connected, else the fingerprint hash, else `"unknown"`.
pub fn client_identifier(wallet: Option<&str>, fingerprint: Option<&BrowserFingerprint>) -> String {
    if let Some(w) = wallet.map(str::trim).filter(|w| !w.is_empty()) {
        return w.to_ascii_lowercase();
    }
    match fingerprint {
        Some(fp) => fp.identifier(),
        None => "unknown".to_string(),
    }
}

/// `0x` followed by 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_RE.is_match(address)
}
