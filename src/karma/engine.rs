//! Karma engine - turns chat events into score updates and replies.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::karma::classifier::{Action, EventClassifier};
use crate::karma::commands::{Command, dispatch};
use crate::karma::database::{ScoreStore, StoreError};
use crate::karma::message::{ChatEvent, Reply};
use crate::karma::names::NameResolver;
use crate::karma::scoring::apply_batch;

#[derive(Debug, Error)]
pub enum KarmaError {
    #[error("invalid bot user id '{id}': {source}")]
    BotId { id: String, source: regex::Error },
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// The karma engine.
pub struct KarmaEngine {
    store: ScoreStore,
    classifier: EventClassifier,
    names: Arc<dyn NameResolver>,
}

impl KarmaEngine {
    pub fn new(
        store: ScoreStore,
        bot_user_id: &str,
        names: Arc<dyn NameResolver>,
    ) -> Result<Self, KarmaError> {
        let classifier = EventClassifier::new(bot_user_id).map_err(|source| KarmaError::BotId {
            id: bot_user_id.to_string(),
            source,
        })?;
        Ok(Self {
            store,
            classifier,
            names,
        })
    }

    pub fn store(&self) -> &ScoreStore {
        &self.store
    }

    /// Handle one event. On a storage failure nothing from this event is
    /// committed and no replies are produced.
    pub fn handle_event(&mut self, event: &ChatEvent) -> Result<Vec<Reply>, KarmaError> {
        match self.classifier.classify(event) {
            Action::Ignore => Ok(Vec::new()),
            Action::Command(command) => {
                if let Command::Unknown(name) = &command {
                    debug!("Unknown command {name:?} from {}", event.user);
                } else {
                    info!("Command {:?} from {} in {}", command, event.user, event.channel);
                }
                let text = dispatch(&self.store, self.names.as_ref(), &command)?;
                Ok(vec![Reply::new(&event.channel, text)])
            }
            Action::Score(batch) => {
                info!(
                    "Scoring message from {} in {} ({} user, {} other)",
                    event.user,
                    event.channel,
                    batch.users.len(),
                    batch.others.len()
                );
                Ok(apply_batch(&mut self.store, &event.user, &batch, &event.channel)?)
            }
        }
    }

    /// Handle every event in a batch, in order.
    ///
    /// A failing event is logged and skipped; later events still run.
    pub fn handle_batch(&mut self, events: &[ChatEvent]) -> Vec<Reply> {
        let mut replies = Vec::new();
        for event in events {
            match self.handle_event(event) {
                Ok(r) => replies.extend(r),
                Err(e) => error!("Failed to handle message from {} in {}: {e}", event.user, event.channel),
            }
        }
        replies
    }
}
