//! Applies score pairs to the store.

use tracing::{debug, info};

use crate::karma::database::{ScoreStore, ScoreTx, StoreError};
use crate::karma::mention::{ScorePair, Vote};
use crate::karma::message::Reply;

/// The score pairs from one message, already deduplicated and filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreBatch {
    pub users: Vec<ScorePair>,
    pub others: Vec<ScorePair>,
}

impl ScoreBatch {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.others.is_empty()
    }
}

pub fn self_karma_reply(poster: &str) -> String {
    format!("Nice try <@{poster}>, but karma doesn't work that way. Go pat yourself on the back instead.")
}

fn change_reply(subject: &str, vote: Vote, score: i64) -> String {
    let verb = match vote {
        Vote::Up => "increased",
        Vote::Down => "decreased",
    };
    format!("{subject}'s karma {verb} to {score}")
}

/// Apply one message's user pairs.
///
/// Pairs aimed at the poster are not scored but produce a single shaming reply
/// ahead of the others. Every pair, self-directed ones included, counts toward
/// the poster's differential.
pub fn apply_user_events(
    tx: &ScoreTx<'_>,
    poster: &str,
    pairs: &[ScorePair],
    channel: &str,
) -> Result<Vec<Reply>, StoreError> {
    let mut replies = Vec::new();

    if pairs.iter().any(|p| p.subject == poster) {
        info!("{poster} tried to give themselves karma");
        replies.push(Reply::new(channel, self_karma_reply(poster)));
    }

    let mut differential = 0;
    for pair in pairs {
        differential += pair.vote.delta();
        if pair.subject == poster {
            continue;
        }
        let score = tx.bump_user(&pair.subject, pair.vote.delta())?;
        info!("{poster} gave {:?} to {} (now {score})", pair.vote, pair.subject);
        replies.push(Reply::new(
            channel,
            change_reply(&format!("<@{}>", pair.subject), pair.vote, score),
        ));
    }

    if differential != 0 {
        let total = tx.add_differential(poster, differential)?;
        debug!("{poster} differential {differential:+} (now {total})");
    }

    Ok(replies)
}

/// Apply one message's free-text pairs. Free-text subjects have no differential.
pub fn apply_other_events(
    tx: &ScoreTx<'_>,
    pairs: &[ScorePair],
    channel: &str,
) -> Result<Vec<Reply>, StoreError> {
    let mut replies = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let score = tx.bump_other(&pair.subject, pair.vote.delta())?;
        info!("{:?} for {} (now {score})", pair.vote, pair.subject);
        replies.push(Reply::new(channel, change_reply(&pair.subject, pair.vote, score)));
    }
    Ok(replies)
}

/// Apply a whole message in one transaction. Replies are only returned once
/// the transaction has committed.
pub fn apply_batch(
    store: &mut ScoreStore,
    poster: &str,
    batch: &ScoreBatch,
    channel: &str,
) -> Result<Vec<Reply>, StoreError> {
    let tx = store.begin()?;
    let mut replies = apply_user_events(&tx, poster, &batch.users, channel)?;
    replies.extend(apply_other_events(&tx, &batch.others, channel)?);
    tx.commit()?;
    Ok(replies)
}
