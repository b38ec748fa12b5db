//! Mention extraction: turns raw message text into score pairs.
//!
//! Extraction runs in two stages. A [`MentionScanner`] finds every mention-like
//! token followed by a two-character run of `+`/`-`, then [`Symbol::parse`]
//! classifies the run. Runs that are neither `++` nor `--` are dropped here,
//! one event at a time, without failing the rest of the message.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Registered-user mention: `<@U123>` or `<@U123|name>`.
const USER_MENTION_PATTERN: &str = r"<@([UW][A-Z0-9]+)(?:\|[^>]*)?>\s?([+-]{2})";

/// Free-text mention: `@pizza++`, `@rust-lang --`, `@#general++`.
const OTHER_MENTION_PATTERN: &str = r"@([A-Za-z0-9_:#-]+)\s?([+-]{2})";

/// A whole string in user-mention form, used to normalize lookup arguments.
const USER_SUBJECT_PATTERN: &str = r"^<@([UW][A-Z0-9]+)(?:\|[^>]*)?>$";

static USER_MENTIONS: LazyLock<MentionScanner> = LazyLock::new(|| {
    MentionScanner::new(USER_MENTION_PATTERN).expect("user mention pattern is valid")
});

static OTHER_MENTIONS: LazyLock<MentionScanner> = LazyLock::new(|| {
    MentionScanner::new(OTHER_MENTION_PATTERN).expect("free-text mention pattern is valid")
});

static USER_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(USER_SUBJECT_PATTERN).expect("user subject pattern is valid"));

/// The two-character run trailing a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Increment,
    Decrement,
    Invalid,
}

impl Symbol {
    pub fn parse(token: &str) -> Self {
        match token {
            "++" => Symbol::Increment,
            "--" => Symbol::Decrement,
            _ => Symbol::Invalid,
        }
    }

    /// The vote this symbol casts, if it is a valid one.
    pub fn vote(self) -> Option<Vote> {
        match self {
            Symbol::Increment => Some(Vote::Up),
            Symbol::Decrement => Some(Vote::Down),
            Symbol::Invalid => None,
        }
    }
}

/// A validated `++` or `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn delta(self) -> i64 {
        match self {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

/// One recognized `(subject, vote)` instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScorePair {
    pub subject: String,
    pub vote: Vote,
}

impl ScorePair {
    pub fn new(subject: &str, vote: Vote) -> Self {
        Self {
            subject: subject.to_string(),
            vote,
        }
    }
}

/// Finds mention tokens of one family in message text.
///
/// The pattern must have two capture groups: the subject and the trailing
/// two-character symbol run.
pub struct MentionScanner {
    pattern: Regex,
}

impl MentionScanner {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Stage one: raw `(subject, symbol run)` tokens in order of appearance.
    pub fn scan<'t>(&self, text: &'t str) -> Vec<(&'t str, &'t str)> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let subject = caps.get(1)?.as_str();
                let symbol = caps.get(2)?.as_str();
                Some((subject, symbol))
            })
            .collect()
    }

    /// Stage two: keep only tokens whose symbol is `++` or `--`.
    pub fn extract(&self, text: &str) -> Vec<ScorePair> {
        self.scan(text)
            .into_iter()
            .filter_map(|(subject, symbol)| match Symbol::parse(symbol).vote() {
                Some(vote) => Some(ScorePair::new(subject, vote)),
                None => {
                    debug!("Skipping {subject:?} with symbol {symbol:?}");
                    None
                }
            })
            .collect()
    }
}

/// Registered-user score pairs, duplicates kept.
pub fn user_mentions(text: &str) -> Vec<ScorePair> {
    USER_MENTIONS.extract(text)
}

/// Free-text score pairs, duplicates kept.
pub fn other_mentions(text: &str) -> Vec<ScorePair> {
    OTHER_MENTIONS.extract(text)
}

/// The handle inside a string that is exactly one user mention.
pub fn mentioned_user(subject: &str) -> Option<&str> {
    USER_SUBJECT
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A free-text lookup subject with its optional `@` stripped.
pub fn normalize_label(subject: &str) -> &str {
    let subject = subject.trim();
    subject.strip_prefix('@').unwrap_or(subject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_parse() {
        assert_eq!(Symbol::parse("++"), Symbol::Increment);
        assert_eq!(Symbol::parse("--"), Symbol::Decrement);
        assert_eq!(Symbol::parse("+-"), Symbol::Invalid);
        assert_eq!(Symbol::parse("-+"), Symbol::Invalid);
        assert_eq!(Symbol::Invalid.vote(), None);
    }

    #[test]
    fn test_user_mentions_in_order() {
        let pairs = user_mentions("thanks <@U1>++ and <@W2> -- and <@U1>++");
        assert_eq!(
            pairs,
            vec![
                ScorePair::new("U1", Vote::Up),
                ScorePair::new("W2", Vote::Down),
                ScorePair::new("U1", Vote::Up),
            ]
        );
    }

    #[test]
    fn test_user_mention_with_label() {
        let pairs = user_mentions("<@U123|alice>++");
        assert_eq!(pairs, vec![ScorePair::new("U123", Vote::Up)]);
    }

    #[test]
    fn test_user_mention_needs_symbol() {
        assert!(user_mentions("hey <@U1> how are you").is_empty());
        assert!(user_mentions("<@U1>  ++").is_empty());
        assert!(user_mentions("<@U1>+").is_empty());
    }

    #[test]
    fn test_invalid_symbol_skipped_per_event() {
        let pairs = user_mentions("<@U1>+- <@U2>++");
        assert_eq!(pairs, vec![ScorePair::new("U2", Vote::Up)]);
    }

    #[test]
    fn test_other_mentions() {
        let pairs = other_mentions("@pizza++ @rust-lang -- @#general++ @a:b++");
        assert_eq!(
            pairs,
            vec![
                ScorePair::new("pizza", Vote::Up),
                ScorePair::new("rust-lang", Vote::Down),
                ScorePair::new("#general", Vote::Up),
                ScorePair::new("a:b", Vote::Up),
            ]
        );
    }

    #[test]
    fn test_other_mention_label_may_end_with_hyphen() {
        assert_eq!(other_mentions("@foo---"), vec![ScorePair::new("foo-", Vote::Down)]);
        assert!(other_mentions("@foo-+").is_empty());
    }

    #[test]
    fn test_user_mention_is_not_free_text() {
        assert!(other_mentions("<@U1>++").is_empty());
    }

    #[test]
    fn test_mentioned_user() {
        assert_eq!(mentioned_user("<@U123>"), Some("U123"));
        assert_eq!(mentioned_user("<@U123|bob>"), Some("U123"));
        assert_eq!(mentioned_user("U123"), None);
        assert_eq!(mentioned_user("<@U123> extra"), None);
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("@pizza"), "pizza");
        assert_eq!(normalize_label(" pizza "), "pizza");
    }
}
