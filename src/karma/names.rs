//! Display names for leaderboard lines.

use std::collections::HashMap;

/// Resolves a user handle to a human-readable name.
///
/// Populated once by the transport side at startup; the core only reads it.
pub trait NameResolver: Send + Sync {
    fn display_name(&self, handle: &str) -> Option<&str>;

    /// The display name, or the raw mention when the handle is unknown.
    fn display(&self, handle: &str) -> String {
        match self.display_name(handle) {
            Some(name) => name.to_string(),
            None => format!("<@{handle}>"),
        }
    }
}

impl NameResolver for HashMap<String, String> {
    fn display_name(&self, handle: &str) -> Option<&str> {
        self.get(handle).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_falls_back_to_mention() {
        let names = HashMap::from([("U1".to_string(), "alice".to_string())]);
        assert_eq!(names.display("U1"), "alice");
        assert_eq!(names.display("U2"), "<@U2>");
    }
}
