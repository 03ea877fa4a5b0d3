//! Stop-word detection for spoken transcripts.
//!
//! Two independent checks:
//! - [`is_standalone_stop`]: the whole utterance is a stop word (at most two
//!   tokens). Used while the assistant is silent to swallow stray commands.
//! - [`contains_stop_word`]: the utterance contains a stop word anywhere.
//!   Used while the assistant is speaking to detect barge-in.

/// Words and phrases that halt the assistant.
pub const STOP_WORDS: &[&str] = &[
    "stop", "wait", "pause", "hold", "enough", "cancel", "quit", "exit", "halt", "stop it",
];

/// Maximum token count for an utterance to count as a standalone stop word.
pub const STANDALONE_MAX_TOKENS: usize = 2;

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn tokens(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// True when the transcript is nothing but a stop word.
///
/// "stop", "Stop.", "stop it" and "wait wait" match; "please stop the obesity
/// analysis" does not, no matter how many stop words it carries.
pub fn is_standalone_stop(text: &str) -> bool {
    let normalized = normalize(text);
    let toks = tokens(&normalized);
    if toks.is_empty() || toks.len() > STANDALONE_MAX_TOKENS {
        return false;
    }

    let joined = toks.join(" ");
    if STOP_WORDS.contains(&joined.as_str()) {
        return true;
    }

    // "wait wait", "stop stop"
    toks.iter().all(|t| STOP_WORDS.contains(t))
}

/// True when any stop word occurs in the transcript.
/// Multi-word phrases match as substrings, single words as whole tokens.
pub fn contains_stop_word(text: &str) -> bool {
    let normalized = normalize(text);
    let toks = tokens(&normalized);

    STOP_WORDS.iter().any(|word| {
        if word.contains(' ') {
            normalized.contains(word)
        } else {
            toks.iter().any(|t| t == word)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_match_ignores_embedded_words() {
        // "stopwatch" and "holding" are not stop words.
        assert!(!contains_stop_word("show the stopwatch"));
        assert!(!contains_stop_word("holding company patents"));
        assert!(contains_stop_word("ok, hold."));
    }
}
