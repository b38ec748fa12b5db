use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::karma::Reply;

/// Longest log line forwarded to the channel.
const MAX_LOG_CHARS: usize = 4000;

/// Forwards WARN and ERROR events to a chat channel through the reply writer.
pub struct ChannelLogLayer {
    tx: mpsc::UnboundedSender<Reply>,
    channel: String,
}

impl ChannelLogLayer {
    pub fn new(tx: mpsc::UnboundedSender<Reply>, channel: String) -> Self {
        Self { tx, channel }
    }
}

fn truncate(text: String) -> String {
    if text.chars().count() > MAX_LOG_CHARS {
        let truncated: String = text.chars().take(MAX_LOG_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for ChannelLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();

        // Only WARN and ERROR reach the channel
        if level > Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        let text = match level {
            Level::ERROR => format!("❌ {}", visitor.message),
            _ => format!("⚠️ {}", visitor.message),
        };

        if self.tx.send(Reply::new(&self.channel, truncate(text))).is_err() {
            eprintln!("Reply channel closed, log line dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_forwards_warnings_and_errors_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscriber =
            tracing_subscriber::registry().with(ChannelLogLayer::new(tx, "COPS".to_string()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("scored");
            tracing::warn!("odd line");
            tracing::error!("disk full");
        });

        let first = rx.try_recv().unwrap();
        assert_eq!(first.channel, "COPS");
        assert_eq!(first.text, "⚠️ odd line");
        assert_eq!(rx.try_recv().unwrap().text, "❌ disk full");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_truncates_long_lines() {
        let long = "x".repeat(MAX_LOG_CHARS + 10);
        let text = truncate(long);
        assert_eq!(text.chars().count(), MAX_LOG_CHARS + 3);
    }
}
