//! karmabot - tracks karma given with `@someone++` and `@thing--` in chat.
//!
//! - `karma` - mention extraction, scoring, rankings and commands
//! - `config` - JSON configuration
//! - `transport` - JSON-lines event source and reply sink
//! - `channel_log` - forwards warnings to a chat channel

pub mod channel_log;
pub mod config;
pub mod karma;
pub mod transport;
