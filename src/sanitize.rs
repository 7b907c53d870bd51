//! Free-text sanitization.
//!
//! Strips markup and script-bearing sequences from user input before any
//! length or format rule looks at it. The output never contains `<`, `>`,
//! quotes, backticks, their HTML entities, or the `javascript:`, `data:` and
//! `vbscript:` schemes.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<script>`/`<iframe>` blocks, removed before the character pass so the
/// payload between the tags goes with them.
static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<iframe\b[^>]*>.*?</iframe\s*>")
        .expect("block pattern is valid")
});

static DANGEROUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)javascript:|vbscript:|data:|&lt;|&gt;|&quot;|&#x27;|&#x2f;|[<>"'`]"#)
        .expect("dangerous pattern is valid")
});

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Sanitize a free-text value.
///
/// Removal is repeated until the string stops changing: deleting the inner
/// match of `javajavascript:script:` leaves a fresh `javascript:` behind.
/// Whitespace runs are then collapsed to one space and the ends trimmed.
/// The function is idempotent.
pub fn sanitize(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    collapse_whitespace(&current)
}

/// True when sanitizing `input` removes more than whitespace.
pub fn contains_markup(input: &str) -> bool {
    sanitize(input) != collapse_whitespace(input)
}

fn strip_once(input: &str) -> String {
    let without_blocks = BLOCK_RE.replace_all(input, "");
    DANGEROUS_RE.replace_all(&without_blocks, "").into_owned()
}

fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RE.replace_all(input, " ").trim().to_string()
}
