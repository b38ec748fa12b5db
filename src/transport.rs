//! JSON-lines transport: events in on stdin, replies out on stdout.
//!
//! Each input line is one event object or an array of events. Each reply is
//! written as one JSON object per line.

use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::karma::{ChatEvent, Reply};

#[derive(Deserialize)]
#[serde(untagged)]
enum EventLine {
    Batch(Vec<ChatEvent>),
    Single(ChatEvent),
}

/// Parse one input line into a batch of events. Blank lines are empty batches.
pub fn parse_line(line: &str) -> Result<Vec<ChatEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }
    Ok(match serde_json::from_str(line)? {
        EventLine::Batch(events) => events,
        EventLine::Single(event) => vec![event],
    })
}

/// Spawn the task that owns stdout. Replies sent on the returned channel are
/// written in order; the task ends once every sender is dropped.
pub fn spawn_reply_writer() -> (mpsc::UnboundedSender<Reply>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Reply>();

    let handle = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(reply) = rx.recv().await {
            let mut line = match serde_json::to_string(&reply) {
                Ok(line) => line,
                Err(e) => {
                    eprintln!("Failed to encode reply: {e}");
                    continue;
                }
            };
            line.push('\n');
            // Logging here would feed back into the channel log layer
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                eprintln!("Failed to write reply: {e}");
                continue;
            }
            if let Err(e) = stdout.flush().await {
                eprintln!("Failed to flush replies: {e}");
            }
        }
    });

    (tx, handle)
}

/// Wait up to `wait` for the writer task to finish. Returns false (and says so
/// on stderr) if replies may have been lost.
pub async fn drain_reply_writer(writer: JoinHandle<()>, wait: Duration) -> bool {
    match tokio::time::timeout(wait, writer).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            eprintln!("Reply writer failed: {e}");
            false
        }
        Err(_) => {
            eprintln!("Timed out draining replies after {wait:?}, some may be lost");
            false
        }
    }
}
