//! Inbound chat events and outbound replies.

use serde::{Deserialize, Serialize};

/// One event as delivered by the chat platform.
///
/// Platform events other than plain messages (presence changes, typing
/// notifications) arrive without `user`/`text`/`channel`, so those default to
/// empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel: String,
}

impl ChatEvent {
    /// Build a plain user-authored message.
    pub fn message(user: &str, text: &str, channel: &str) -> Self {
        Self {
            kind: "message".to_string(),
            subtype: None,
            user: user.to_string(),
            text: text.to_string(),
            channel: channel.to_string(),
        }
    }

    /// Only plain messages trigger scoring or commands; edits, joins and
    /// bot posts all carry a subtype. A message with no author is dropped too.
    pub fn is_plain_message(&self) -> bool {
        self.kind == "message" && self.subtype.is_none() && !self.user.is_empty()
    }
}

/// A line of text to post to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub channel: String,
    pub text: String,
}

impl Reply {
    pub fn new(channel: &str, text: impl Into<String>) -> Self {
        Self {
            channel: channel.to_string(),
            text: text.into(),
        }
    }
}
