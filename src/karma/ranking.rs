//! Leaderboards and single-subject lookups.

use std::num::NonZeroI64;
use thiserror::Error;

use crate::karma::database::{RankField, ScoreStore, StoreError};
use crate::karma::mention::{mentioned_user, normalize_label};

/// Most rows any ranking returns, whatever was asked for.
pub const MAX_RANKED: usize = 5;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("nothing to show")]
    EmptyResult,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a ranking is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKind {
    Users,
    Others,
    Differential,
}

impl RankKind {
    fn field(self) -> RankField {
        match self {
            RankKind::Users => RankField::UserScore,
            RankKind::Others => RankField::OtherScore,
            RankKind::Differential => RankField::Differential,
        }
    }
}

/// One displayed leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    pub position: usize,
    pub subject: String,
    pub value: i64,
}

/// Result of looking up one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    User {
        handle: String,
        score: i64,
        differential: i64,
    },
    Other {
        label: String,
        score: i64,
    },
}

/// Top (`n > 0`) or bottom (`n < 0`) `|n|` rows, capped at [`MAX_RANKED`].
pub fn top_or_bottom(
    store: &ScoreStore,
    kind: RankKind,
    n: NonZeroI64,
) -> Result<Vec<Ranked>, RankingError> {
    let descending = n.get() > 0;
    let limit = (n.get().unsigned_abs() as usize).min(MAX_RANKED);

    let rows = store.ranked(kind.field(), descending, limit)?;
    if rows.is_empty() {
        return Err(RankingError::EmptyResult);
    }
    Ok(competition_rank(rows))
}

/// Assign shared positions to equal values: `[10, 10, 8]` → `[1, 1, 3]`.
///
/// Runs over the already-truncated window.
pub fn competition_rank(rows: Vec<(String, i64)>) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = Vec::with_capacity(rows.len());
    for (index, (subject, value)) in rows.into_iter().enumerate() {
        let position = match ranked.last() {
            Some(prev) if prev.value == value => prev.position,
            _ => index + 1,
        };
        ranked.push(Ranked {
            position,
            subject,
            value,
        });
    }
    ranked
}

/// Look up a subject's karma.
///
/// A subject in user-mention form is registered with zero karma on first
/// lookup. Free-text subjects are never created by a lookup.
pub fn lookup_one(store: &ScoreStore, subject: &str) -> Result<Lookup, StoreError> {
    let subject = subject.trim();
    if let Some(handle) = mentioned_user(subject) {
        let row = store.user_or_register(handle)?;
        return Ok(Lookup::User {
            handle: handle.to_string(),
            score: row.score,
            differential: row.differential,
        });
    }

    let label = normalize_label(subject);
    let score = store.other(label)?.unwrap_or(0);
    Ok(Lookup::Other {
        label: label.to_string(),
        score,
    })
}
