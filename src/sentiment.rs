//! Keyword sentiment tag returned next to the model label.
//!
//! This is a fixed heuristic, unrelated to the trained classifier's label
//! space: a text is `Negative` when its lower-cased form contains any of the
//! keywords as a substring, otherwise `Neutral`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Substrings that mark a text as negative
pub const NEGATIVE_KEYWORDS: [&str; 3] = ["sad", "hopeless", "tired"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag a text using the keyword heuristic
pub fn assess(text: &str) -> Sentiment {
    let lowered = text.to_lowercase();
    if NEGATIVE_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
    {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_negative() {
        assert_eq!(assess("I feel hopeless today"), Sentiment::Negative);
        assert_eq!(assess("so TIRED of this"), Sentiment::Negative);
        assert_eq!(assess("Sad."), Sentiment::Negative);
    }

    #[test]
    fn test_substring_matches_count() {
        // substring semantics, not whole words
        assert_eq!(assess("Saddle up"), Sentiment::Negative);
        assert_eq!(assess("retired engineer"), Sentiment::Negative);
    }

    #[test]
    fn test_everything_else_is_neutral() {
        assert_eq!(assess("What a lovely afternoon"), Sentiment::Neutral);
        assert_eq!(assess(""), Sentiment::Neutral);
        assert_eq!(assess("s a d"), Sentiment::Neutral);
    }

    #[test]
    fn test_serializes_as_capitalised_name() {
        assert_eq!(
            serde_json::to_string(&Sentiment::Negative).unwrap(),
            "\"Negative\""
        );
        assert_eq!(Sentiment::Neutral.to_string(), "Neutral");
    }
}
