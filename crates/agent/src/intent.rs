//! Keyword classifiers for short conversational replies.
//!
//! Affirmative and negative checks are plain substring matches on the
//! lower-cased message, so "know" counts as negative and a message can be
//! both affirmative and negative at once.

const GREETINGS: [&str; 6] = ["hi", "hello", "hey", "hii", "hola", "greetings"];
const AFFIRMATIVE_TOKENS: [&str; 7] = ["yes", "yeah", "yep", "ok", "sure", "please", "yup"];
const NEGATIVE_TOKENS: [&str; 5] = ["no", "nope", "not", "never", "nah"];

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn is_greeting(text: &str) -> bool {
    let normalized = normalize(text);
    GREETINGS.contains(&normalized.as_str())
}

pub fn is_affirmative(text: &str) -> bool {
    let normalized = normalize(text);
    AFFIRMATIVE_TOKENS.iter().any(|token| normalized.contains(token))
}

pub fn is_negative(text: &str) -> bool {
    let normalized = normalize(text);
    NEGATIVE_TOKENS.iter().any(|token| normalized.contains(token))
}
