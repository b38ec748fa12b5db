//! Bot commands: `<@bot> leaderboard`, `<@bot> lookup @pizza`, ...

use std::num::NonZeroI64;

use crate::karma::database::{ScoreStore, StoreError};
use crate::karma::names::NameResolver;
use crate::karma::ranking::{Lookup, RankKind, RankingError, lookup_one, top_or_bottom};

pub const UNKNOWN_COMMAND_REPLY: &str =
    "Not sure what you mean. Try *help* to see what I can do.";

pub const LOOKUP_USAGE_REPLY: &str = "Usage: *lookup <@user>* or *lookup thing*";

pub const NOTHING_TO_SHOW: &str = "_nothing to show_";

pub const HELP_TEXT: &str = "\
Give karma with `@someone++` or take it with `@someone--`. Works on things too: `@pizza++`.
Commands (mention me first):
• *leaderboard* / *top* - highest karma
• *loserboard* / *bottom* - lowest karma
• *lookup <subject>* - karma for one user or thing
• *nicest* / *givers* / *diff* / *differential* - most generous
• *worst* / *takers* - least generous
• *help* - this message";

const BOARD_SIZE: NonZeroI64 = NonZeroI64::new(5).unwrap();

/// A recognized command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Leaderboard,
    Loserboard,
    Lookup(Option<String>),
    Givers,
    Takers,
    Help,
    Unknown(String),
}

impl Command {
    /// Match a command word (case-insensitive) and its optional argument.
    pub fn parse(name: &str, argument: Option<&str>) -> Self {
        let argument = argument.map(str::trim).filter(|a| !a.is_empty());
        match name.trim().to_lowercase().as_str() {
            "leaderboard" | "top" => Command::Leaderboard,
            "loserboard" | "bottom" => Command::Loserboard,
            "lookup" => Command::Lookup(argument.map(str::to_string)),
            "nicest" | "givers" | "diff" | "differential" => Command::Givers,
            "worst" | "takers" => Command::Takers,
            "help" | "usage" | "commands" | "options" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Run a command and produce its reply text.
pub fn dispatch(
    store: &ScoreStore,
    names: &dyn NameResolver,
    command: &Command,
) -> Result<String, StoreError> {
    match command {
        Command::Leaderboard => Ok(format!(
            "{}\n\n{}",
            board(store, names, RankKind::Users, BOARD_SIZE)?,
            board(store, names, RankKind::Others, BOARD_SIZE)?
        )),
        Command::Loserboard => Ok(format!(
            "{}\n\n{}",
            board(store, names, RankKind::Users, -BOARD_SIZE)?,
            board(store, names, RankKind::Others, -BOARD_SIZE)?
        )),
        Command::Givers => board(store, names, RankKind::Differential, BOARD_SIZE),
        Command::Takers => board(store, names, RankKind::Differential, -BOARD_SIZE),
        Command::Lookup(None) => Ok(LOOKUP_USAGE_REPLY.to_string()),
        Command::Lookup(Some(subject)) => Ok(match lookup_one(store, subject)? {
            Lookup::User {
                handle,
                score,
                differential,
            } => format!(
                "{} has {} karma and a giving differential of {}",
                names.display(&handle),
                score,
                differential
            ),
            Lookup::Other { label, score } => format!("{label} has {score} karma"),
        }),
        Command::Help => Ok(HELP_TEXT.to_string()),
        Command::Unknown(_) => Ok(UNKNOWN_COMMAND_REPLY.to_string()),
    }
}

fn board_title(kind: RankKind, top: bool) -> &'static str {
    match (kind, top) {
        (RankKind::Users, true) => "*Top users*",
        (RankKind::Users, false) => "*Bottom users*",
        (RankKind::Others, true) => "*Top things*",
        (RankKind::Others, false) => "*Bottom things*",
        (RankKind::Differential, true) => "*Nicest givers*",
        (RankKind::Differential, false) => "*Worst takers*",
    }
}

fn board(
    store: &ScoreStore,
    names: &dyn NameResolver,
    kind: RankKind,
    n: NonZeroI64,
) -> Result<String, StoreError> {
    let title = board_title(kind, n.get() > 0);
    let rows = match top_or_bottom(store, kind, n) {
        Ok(rows) => rows,
        Err(RankingError::EmptyResult) => return Ok(format!("{title}\n{NOTHING_TO_SHOW}")),
        Err(RankingError::Store(e)) => return Err(e),
    };

    let lines: Vec<String> = rows
        .iter()
        .map(|r| {
            let name = match kind {
                RankKind::Others => r.subject.clone(),
                RankKind::Users | RankKind::Differential => names.display(&r.subject),
            };
            format!("{}. {}: {}", r.position, name, r.value)
        })
        .collect();
    Ok(format!("{title}\n{}", lines.join("\n")))
}
