//! Text sanitization for user-facing strings.
//!
//! One policy, applied everywhere: keep Unicode letters and digits (CJK
//! usernames survive), single spaces, and a fixed set of common punctuation.
//! ASCII control bytes, the replacement character `U+FFFD`, emoji and other
//! symbols are stripped. Whitespace collapses to single spaces and the
//! result is truncated on a character boundary.

/// Punctuation and symbols allowed through sanitization.
const ALLOWED_PUNCTUATION: &str = "!?.,:;'\"()[]-_+=/@#$%&*<>~^|";

/// True when `c` survives sanitization.
fn is_allowed(c: char) -> bool {
    if c.is_control() || c == '\u{FFFD}' {
        return false;
    }
    c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(c)
}

/// Sanitize `input` for display, speech and logging.
///
/// Disallowed characters are dropped, whitespace runs collapse to one
/// space, and the result is trimmed and truncated to `max_chars`.
pub fn sanitize_text(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars * 4));
    let mut last_was_space = true;

    for c in input.chars() {
        if !is_allowed(c) {
            continue;
        }
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }

    let trimmed = out.trim_end();
    truncate_chars(trimmed, max_chars)
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((index, _)) => input[..index].trim_end().to_string(),
        None => input.to_string(),
    }
}
