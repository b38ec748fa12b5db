//! Decides what a chat event asks for: a command, some scoring, or nothing.

use regex::Regex;
use std::collections::HashSet;

use crate::karma::commands::Command;
use crate::karma::mention::{ScorePair, other_mentions, user_mentions};
use crate::karma::message::ChatEvent;
use crate::karma::scoring::ScoreBatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Command(Command),
    Score(ScoreBatch),
    Ignore,
}

pub struct EventClassifier {
    command_pattern: Regex,
}

impl EventClassifier {
    /// Build a classifier for the bot with the given user handle.
    pub fn new(bot_user_id: &str) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"(?s)^<@{}(?:\|[^>]*)?>:?\s+([^\s+\-]\S*)(?:\s+(.*?))?\s*$",
            regex::escape(bot_user_id)
        );
        Ok(Self {
            command_pattern: Regex::new(&pattern)?,
        })
    }

    pub fn classify(&self, event: &ChatEvent) -> Action {
        if !event.is_plain_message() {
            return Action::Ignore;
        }

        // A command never scores, even if its arguments look like mentions
        if let Some(caps) = self.command_pattern.captures(&event.text)
            && let Some(name) = caps.get(1)
        {
            let argument = caps.get(2).map(|m| m.as_str());
            return Action::Command(Command::parse(name.as_str(), argument));
        }

        let batch = score_batch(&event.text);
        if batch.is_empty() {
            Action::Ignore
        } else {
            Action::Score(batch)
        }
    }
}

/// Extract and clean up the score pairs in a message.
///
/// User pairs are deduplicated on the whole `(handle, vote)` pair, keeping the
/// first occurrence. Free-text pairs naming a handle that was also mentioned
/// as a user are dropped. Self-directed pairs are kept; the scoring step needs
/// them.
pub fn score_batch(text: &str) -> ScoreBatch {
    let mut seen: HashSet<ScorePair> = HashSet::new();
    let users: Vec<ScorePair> = user_mentions(text)
        .into_iter()
        .filter(|pair| seen.insert(pair.clone()))
        .collect();

    let handles: HashSet<&str> = users.iter().map(|p| p.subject.as_str()).collect();
    let others = other_mentions(text)
        .into_iter()
        .filter(|pair| !handles.contains(pair.subject.as_str()))
        .collect();

    ScoreBatch { users, others }
}
