use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use url::Url;

/// Injection markers. Matching any of them rejects the field outright.
const SUSPICIOUS: &[(&str, &str)] = &[
    ("script_tag", r"<script"),
    ("javascript_scheme", r"javascript:"),
    ("event_handler", r"on\w+\s*="),
    ("html_data_uri", r"data:text/html"),
    ("vbscript_scheme", r"vbscript:"),
    ("iframe_tag", r"<iframe"),
    ("object_tag", r"<object"),
    ("embed_tag", r"<embed"),
    ("eval_call", r"eval\("),
    ("css_expression", r"expression\("),
    ("dynamic_import", r"import\s*\("),
];

static SUSPICIOUS_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(SUSPICIOUS.iter().map(|(_, p)| format!("(?i){p}"))).expect("suspicious regex set")
});

static HTTP_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://\S*").expect("url regex"));

static ANY_SCHEME_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([a-z][a-z0-9+.\-]*)://\S*").expect("scheme regex"));

pub fn detect_suspicious_patterns(input: &str) -> bool {
    SUSPICIOUS_SET.is_match(input)
}

/// Name of the first injection marker found, if any.
pub fn suspicious_pattern(input: &str) -> Option<&'static str> {
    SUSPICIOUS_SET
        .matches(input)
        .iter()
        .next()
        .map(|i| SUSPICIOUS[i].0)
}

/// Absolute `http`/`https` URL.
pub fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some(),
        Err(_) => false,
    }
}

pub fn count_urls(text: &str) -> usize {
    HTTP_URL.find_iter(text).count()
}

/// At most one link, and it must be a well-formed http(s) URL. Links with
/// any other scheme fail.
pub fn validate_urls_in_text(text: &str) -> bool {
    let other_scheme = ANY_SCHEME_URL.captures_iter(text).any(|c| {
        let scheme = c[1].to_ascii_lowercase();
        scheme != "http" && scheme != "https"
    });
    if other_scheme {
        return false;
    }

    let urls: Vec<&str> = HTTP_URL.find_iter(text).map(|m| m.as_str()).collect();
    if urls.len() > 1 {
        return false;
    }
    urls.iter().all(|u| is_valid_url(u))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspicious_markers() {
        assert!(detect_suspicious_patterns("<script>alert(1)</script>"));
        assert!(!detect_suspicious_patterns("What is your favorite color?"));

        let hits = [
            ("<SCRIPT src=x>", "script_tag"),
            ("JavaScript:void(0)", "javascript_scheme"),
            ("<img onerror = x>", "event_handler"),
            ("DATA:TEXT/HTML;base64,xx", "html_data_uri"),
            ("vbscript:msgbox", "vbscript_scheme"),
            ("<iframe>", "iframe_tag"),
            ("<object data=x>", "object_tag"),
            ("<embed>", "embed_tag"),
            ("eval(atob(x))", "eval_call"),
            ("width: expression(alert(1))", "css_expression"),
            ("import ('x')", "dynamic_import"),
        ];
        for (text, name) in hits {
            assert_eq!(suspicious_pattern(text), Some(name), "{text}");
        }
        assert_eq!(suspicious_pattern("Best pizza topping?"), None);
    }

    #[test]
    fn url_checks() {
        assert!(!validate_urls_in_text("check ftp://evil.com"));
        assert!(!validate_urls_in_text("see https://a.com and https://b.com"));
        assert!(validate_urls_in_text("see https://a.com"));
        assert!(validate_urls_in_text("no links at all"));
        assert!(!validate_urls_in_text("broken http://"));
    }

    #[test]
    fn single_url_validity() {
        assert!(is_valid_url("https://example.com/path?q=1"));
        assert!(is_valid_url("HTTP://EXAMPLE.COM"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn counts_http_occurrences() {
        assert_eq!(count_urls("http://a.io https://b.io"), 2);
        assert_eq!(count_urls("nothing"), 0);
    }
}
