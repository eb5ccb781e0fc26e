//! Text cleaning for speech.
//!
//! The spoken form must not read URLs or emoji aloud: any token that is a
//! URL or contains characters outside letters/digits/ASCII punctuation is
//! replaced with the literal token `[filtered]`. Runs of filtered tokens
//! collapse to one.

/// Token substituted for URLs and emoji.
pub const FILTERED_TOKEN: &str = "[filtered]";

fn is_url(token: &str) -> bool {
    let lower = token.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

fn is_speakable(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_alphanumeric() || c.is_ascii_punctuation())
}

/// Clean `input` for the speech synthesizer.
pub fn clean_for_speech(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();

    for token in input.split_whitespace() {
        if is_url(token) || !is_speakable(token) {
            // Collapse runs of filtered tokens.
            if out.last() != Some(&FILTERED_TOKEN) {
                out.push(FILTERED_TOKEN);
            }
        } else {
            out.push(token);
        }
    }

    out.join(" ")
}
