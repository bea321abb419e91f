use once_cell::sync::Lazy;
use regex::Regex;

/// Longest poll field accepted, in characters.
pub const MAX_FIELD_CHARS: usize = 200;

static DANGEROUS_ELEMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "iframe", "object", "embed", "style"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*?(?:/>|>.*?</{tag}\s*>)"))
                .expect("element regex")
        })
        .collect()
});

static LINK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<link\b[^>]*>").expect("link regex"));

static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bon\w+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("handler regex")
});

static UNSAFE_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:javascript|data)\s*:").expect("scheme regex"));

static SQL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:SELECT|INSERT|UPDATE|DELETE|DROP|UNION|EXEC)\b").expect("sql regex")
});

// `/` is entity-escaped by the time this runs, so match both spellings.
static SQL_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--|/\*|\*/|&#x2F;\*|\*&#x2F;").expect("sql comment regex"));

/// Entity-escape the characters that matter in an HTML context, then trim.
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            c => out.push(c),
        }
    }
    out.trim().to_string()
}

/// Strip active HTML: script-like elements, `<link>` tags, inline event
/// handlers and `javascript:` / `data:` schemes.
pub fn sanitize_html(html: &str) -> String {
    let mut s = html.to_string();
    for re in DANGEROUS_ELEMENTS.iter() {
        s = re.replace_all(&s, "").into_owned();
    }
    s = LINK_TAG.replace_all(&s, "").into_owned();
    s = EVENT_HANDLER.replace_all(&s, "").into_owned();
    s = UNSAFE_SCHEME.replace_all(&s, "").into_owned();
    s.trim().to_string()
}

/// Normalize a poll question or option: escape, drop control characters,
/// cap at `MAX_FIELD_CHARS`, collapse whitespace.
///
/// Running it again on its own output changes nothing.
pub fn sanitize_poll_input(input: &str) -> String {
    let escaped = sanitize_input(input);
    let capped: String = escaped
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FIELD_CHARS)
        .collect();
    collapse_whitespace(&capped)
}

/// `sanitize_poll_input` plus removal of SQL keywords and comment markers.
pub fn sanitize_question_input(input: &str) -> String {
    let s = sanitize_poll_input(input);
    let s = SQL_KEYWORD.replace_all(&s, "");
    let s = SQL_COMMENT.replace_all(&s, "");
    collapse_whitespace(&s)
}

/// Sanitize every option, dropping the ones left empty.
pub fn sanitize_array<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .map(|s| sanitize_poll_input(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_specials() {
        assert_eq!(
            sanitize_input(r#" <a href="x">'/\ "#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&#x2F;&#x5C;"
        );
        assert_eq!(sanitize_input(""), "");
    }

    #[test]
    fn strips_script_like_elements() {
        assert_eq!(sanitize_html("hi<script>alert(1)</script> there"), "hi there");
        assert_eq!(sanitize_html("a<SCRIPT src=x>\nboom\n</Script>b"), "ab");
        assert_eq!(sanitize_html("a<iframe src=x/>b"), "ab");
        assert_eq!(sanitize_html("<style>p{}</style>x<style>q{}</style>"), "x");
        assert_eq!(sanitize_html("x<link rel=stylesheet href=y>"), "x");
    }

    #[test]
    fn strips_handlers_and_schemes() {
        assert_eq!(sanitize_html(r#"<img src=x onerror="alert(1)">"#), "<img src=x >");
        assert_eq!(sanitize_html("<a href='JavaScript:go()'>"), "<a href='go()'>");
        assert_eq!(sanitize_html("data:text/html,hi"), "text/html,hi");
    }

    #[test]
    fn poll_input_strips_controls_and_collapses() {
        assert_eq!(sanitize_poll_input("  a\u{0007}b   c "), "ab c");
        assert_eq!(sanitize_poll_input("x\u{0085}y\u{007f}z"), "xyz");
        assert_eq!(sanitize_poll_input("Red\tor\nBlue"), "RedorBlue");
        assert_eq!(sanitize_poll_input("a \u{00a0} b"), "a b");
    }

    #[test]
    fn poll_input_truncates_to_200_chars() {
        let long = "a".repeat(250);
        assert_eq!(sanitize_poll_input(&long).chars().count(), 200);

        let wide = "é".repeat(250);
        assert_eq!(sanitize_poll_input(&wide).chars().count(), 200);
    }

    #[test]
    fn poll_input_is_a_fixed_point() {
        let inputs = [
            "  a\u{0007}b   c ",
            "<b>Bold</b> & 'quoted' / \\",
            "What's your   favorite\r\n color?",
            &"x y ".repeat(80),
            &format!("{}<", "a".repeat(199)),
        ];
        for i in inputs {
            let once = sanitize_poll_input(i);
            assert_eq!(sanitize_poll_input(&once), once, "input {i:?}");
        }
    }

    #[test]
    fn question_drops_sql_tokens() {
        assert_eq!(sanitize_question_input("Best DROP table -- ever?"), "Best table ever?");
        assert_eq!(sanitize_question_input("select one /* x */"), "one x");
        // word boundary: not inside other words
        assert_eq!(sanitize_question_input("Selection of updates?"), "Selection of updates?");
    }

    #[test]
    fn array_drops_empty_items() {
        let out = sanitize_array(&["  Red ", "\u{0001}", "", " Blue"]);
        assert_eq!(out, vec!["Red".to_string(), "Blue".to_string()]);
    }
}
