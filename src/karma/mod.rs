//! Karma tracking - scores users and things mentioned with `++`/`--`.

pub mod classifier;
pub mod commands;
pub mod database;
pub mod engine;
pub mod mention;
pub mod message;
pub mod names;
pub mod ranking;
pub mod scoring;


pub use commands::Command;
pub use database::{ScoreStore, StoreError};
pub use engine::{KarmaEngine, KarmaError};
pub use message::{ChatEvent, Reply};
pub use names::NameResolver;
