use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches any markup tag: `<` through the next `>`. Deliberately not a full
/// HTML parser; nested or malformed markup degrades to plain text, which is
/// all a feed description needs.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("literal pattern"));

/// Removes markup tags from a string, leaving only text content.
///
/// Entity references (`&amp;` etc.) are left untouched; the serializer's
/// escaping layer handles them downstream.
///
/// Returns `Cow::Borrowed` when the input contains no tags (common case).
pub fn strip_html_tags(s: &str) -> Cow<'_, str> {
    TAG_RE.replace_all(s, "")
}

/// Truncates a string to at most `max` characters (Unicode scalar values,
/// not bytes), cutting on a character boundary.
///
/// May cut mid-word; the result is not re-validated as markup because it is
/// only ever applied to already-stripped plain text.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
