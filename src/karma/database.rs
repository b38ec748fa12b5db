//! Persistent SQLite store for karma scores.
//!
//! Two tables: `UserScores` for registered users (with the differential they
//! have handed out) and `OtherScores` for free-text subjects. All writes for one
//! message go through a single [`ScoreTx`].

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Any failure talking to the database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database '{path}': {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Which table and column a ranking query orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankField {
    UserScore,
    OtherScore,
    Differential,
}

impl RankField {
    fn select(self) -> &'static str {
        match self {
            RankField::UserScore => "SELECT User, Score FROM UserScores",
            RankField::OtherScore => "SELECT Name, Score FROM OtherScores",
            RankField::Differential => "SELECT User, Differential FROM UserScores",
        }
    }

    fn order(self, descending: bool) -> &'static str {
        match (self, descending) {
            (RankField::UserScore, true) => "ORDER BY Score DESC, User ASC",
            (RankField::UserScore, false) => "ORDER BY Score ASC, User ASC",
            (RankField::OtherScore, true) => "ORDER BY Score DESC, Name ASC",
            (RankField::OtherScore, false) => "ORDER BY Score ASC, Name ASC",
            (RankField::Differential, true) => "ORDER BY Differential DESC, User ASC",
            (RankField::Differential, false) => "ORDER BY Differential ASC, User ASC",
        }
    }
}

/// A registered user's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserScore {
    pub score: i64,
    pub differential: i64,
}

/// Persistent karma store.
pub struct ScoreStore {
    conn: Connection,
}

impl ScoreStore {
    /// Create a new in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_connection(conn)?;

        let (users, others) = store.counts()?;
        info!("Loaded karma database from {:?} ({} users, {} others)", path, users, others);
        Ok(store)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS UserScores (
                User TEXT PRIMARY KEY,
                Score INTEGER NOT NULL DEFAULT 0,
                Differential INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS OtherScores (
                Name TEXT PRIMARY KEY,
                Score INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_user_scores_score ON UserScores(Score);
            CREATE INDEX IF NOT EXISTS idx_user_scores_differential ON UserScores(Differential);
            CREATE INDEX IF NOT EXISTS idx_other_scores_score ON OtherScores(Score);
        "#,
        )?;
        Ok(())
    }

    /// Row counts for `(UserScores, OtherScores)`.
    pub fn counts(&self) -> Result<(usize, usize), StoreError> {
        let users: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM UserScores", [], |row| row.get(0))?;
        let others: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM OtherScores", [], |row| row.get(0))?;
        Ok((users as usize, others as usize))
    }

    /// Run raw SQL against the store (used to inject failures in tests).
    #[cfg(test)]
    pub fn execute_raw(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Start the transaction for one message's worth of updates.
    ///
    /// Dropping the returned guard without calling [`ScoreTx::commit`] rolls
    /// everything back.
    pub fn begin(&mut self) -> Result<ScoreTx<'_>, StoreError> {
        Ok(ScoreTx {
            tx: self.conn.transaction()?,
        })
    }

    /// Read a registered user's row.
    pub fn user(&self, handle: &str) -> Result<Option<UserScore>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT Score, Differential FROM UserScores WHERE User = ?1",
                params![handle],
                |row| {
                    Ok(UserScore {
                        score: row.get(0)?,
                        differential: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Read a registered user's row, inserting a zeroed one if absent.
    pub fn user_or_register(&self, handle: &str) -> Result<UserScore, StoreError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO UserScores (User, Score, Differential) VALUES (?1, 0, 0)",
            params![handle],
        )?;
        if inserted > 0 {
            info!("Registered {handle} with zero karma");
        }
        let row = self.conn.query_row(
            "SELECT Score, Differential FROM UserScores WHERE User = ?1",
            params![handle],
            |row| {
                Ok(UserScore {
                    score: row.get(0)?,
                    differential: row.get(1)?,
                })
            },
        )?;
        Ok(row)
    }

    /// Read a free-text subject's score. Never creates a row.
    pub fn other(&self, label: &str) -> Result<Option<i64>, StoreError> {
        let score = self
            .conn
            .query_row(
                "SELECT Score FROM OtherScores WHERE Name = ?1",
                params![label],
                |row| row.get(0),
            )
            .optional()?;
        Ok(score)
    }

    /// Up to `limit` `(key, value)` rows ordered by `field`, ties broken by key.
    pub fn ranked(
        &self,
        field: RankField,
        descending: bool,
        limit: usize,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let sql = format!("{} {} LIMIT ?1", field.select(), field.order(descending));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, i64)>, _>>()?;
        debug!("Ranked {:?} (desc={}) returned {} row(s)", field, descending, rows.len());
        Ok(rows)
    }
}

/// The write side of one message: every delta lands or none do.
pub struct ScoreTx<'a> {
    tx: Transaction<'a>,
}

impl ScoreTx<'_> {
    /// Add `delta` to a user's score, creating the row at `delta` if absent.
    /// Returns the new score.
    pub fn bump_user(&self, handle: &str, delta: i64) -> Result<i64, StoreError> {
        let score = self.tx.query_row(
            "INSERT INTO UserScores (User, Score, Differential) VALUES (?1, ?2, 0)
             ON CONFLICT(User) DO UPDATE SET Score = Score + ?2
             RETURNING Score",
            params![handle, delta],
            |row| row.get(0),
        )?;
        Ok(score)
    }

    /// Add `delta` to a user's differential, creating the row with a zero
    /// score if absent. Returns the new differential.
    pub fn add_differential(&self, handle: &str, delta: i64) -> Result<i64, StoreError> {
        let differential = self.tx.query_row(
            "INSERT INTO UserScores (User, Score, Differential) VALUES (?1, 0, ?2)
             ON CONFLICT(User) DO UPDATE SET Differential = Differential + ?2
             RETURNING Differential",
            params![handle, delta],
            |row| row.get(0),
        )?;
        Ok(differential)
    }

    /// Add `delta` to a free-text subject's score, creating the row at `delta`
    /// if absent. Returns the new score.
    pub fn bump_other(&self, label: &str, delta: i64) -> Result<i64, StoreError> {
        let score = self.tx.query_row(
            "INSERT INTO OtherScores (Name, Score) VALUES (?1, ?2)
             ON CONFLICT(Name) DO UPDATE SET Score = Score + ?2
             RETURNING Score",
            params![label, delta],
            |row| row.get(0),
        )?;
        Ok(score)
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_event_sets_score_directly() {
        let mut store = ScoreStore::in_memory().unwrap();
        let tx = store.begin().unwrap();
        assert_eq!(tx.bump_user("U1", -1).unwrap(), -1);
        assert_eq!(tx.bump_other("pizza", 1).unwrap(), 1);
        tx.commit().unwrap();

        assert_eq!(
            store.user("U1").unwrap(),
            Some(UserScore { score: -1, differential: 0 })
        );
        assert_eq!(store.other("pizza").unwrap(), Some(1));
    }

    #[test]
    fn test_bump_accumulates() {
        let mut store = ScoreStore::in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.bump_user("U1", 1).unwrap();
        tx.bump_user("U1", 1).unwrap();
        assert_eq!(tx.bump_user("U1", 1).unwrap(), 3);
        tx.commit().unwrap();
    }

    #[test]
    fn test_differential_creates_zero_score_row() {
        let mut store = ScoreStore::in_memory().unwrap();
        let tx = store.begin().unwrap();
        assert_eq!(tx.add_differential("U9", 2).unwrap(), 2);
        tx.commit().unwrap();

        assert_eq!(
            store.user("U9").unwrap(),
            Some(UserScore { score: 0, differential: 2 })
        );
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut store = ScoreStore::in_memory().unwrap();
        {
            let tx = store.begin().unwrap();
            tx.bump_user("U1", 1).unwrap();
            tx.bump_other("pizza", 1).unwrap();
        }
        assert_eq!(store.user("U1").unwrap(), None);
        assert_eq!(store.other("pizza").unwrap(), None);
        assert_eq!(store.counts().unwrap(), (0, 0));
    }

    #[test]
    fn test_user_or_register_is_idempotent() {
        let store = ScoreStore::in_memory().unwrap();
        let first = store.user_or_register("U5").unwrap();
        let second = store.user_or_register("U5").unwrap();
        assert_eq!(first, UserScore { score: 0, differential: 0 });
        assert_eq!(first, second);
        assert_eq!(store.counts().unwrap(), (1, 0));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut store = ScoreStore::in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.bump_other("Pizza", 1).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.other("pizza").unwrap(), None);
        assert_eq!(store.other("Pizza").unwrap(), Some(1));
    }

    #[test]
    fn test_ranked_orders_and_breaks_ties_by_key() {
        let mut store = ScoreStore::in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.bump_other("b", 2).unwrap();
        tx.bump_other("a", 2).unwrap();
        tx.bump_other("c", -1).unwrap();
        tx.commit().unwrap();

        let top = store.ranked(RankField::OtherScore, true, 5).unwrap();
        assert_eq!(
            top,
            vec![("a".to_string(), 2), ("b".to_string(), 2), ("c".to_string(), -1)]
        );

        let bottom = store.ranked(RankField::OtherScore, false, 1).unwrap();
        assert_eq!(bottom, vec![("c".to_string(), -1)]);
    }

    #[test]
    fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("karma.db");
        {
            let mut store = ScoreStore::open(&path).unwrap();
            let tx = store.begin().unwrap();
            tx.bump_user("U1", 1).unwrap();
            tx.commit().unwrap();
        }
        let store = ScoreStore::open(&path).unwrap();
        assert_eq!(store.user("U1").unwrap().map(|u| u.score), Some(1));
    }
}
