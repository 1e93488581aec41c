use crate::permissions::{Capability, Role};
use thiserror::Error;

/// Failures surfaced by everything around the two pure cores. The admission
/// filter and the daily selector never fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("profile database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid day `{0}`, expected YYYY-MM-DD")]
    InvalidDay(String),

    #[error("question {id} is invalid: {reason}")]
    InvalidQuestion { id: u32, reason: &'static str },

    #[error("quiz attempt is not in progress")]
    AttemptNotInProgress,

    #[error("choice {choice} is out of range for question {id}")]
    InvalidChoice { id: u32, choice: usize },

    #[error("unknown channel `{0}`")]
    UnknownChannel(String),

    #[error("role `{role}` lacks the `{capability}` capability")]
    NotPermitted { role: Role, capability: Capability },

    #[error("user `{0}` is not online")]
    UnknownMember(String),

    #[error("chat connection is closed")]
    Disconnected,

    #[error("a note needs a title, a description and a subject")]
    IncompleteNote,

    #[error("unknown subject `{0}`")]
    UnknownSubject(String),

    #[error("no note with id {0}")]
    UnknownNote(i64),

    #[error("subject name must not be blank")]
    BlankSubject,

    #[error("a subject named `{0}` already exists")]
    DuplicateSubject(String),
}

pub type Result<T> = std::result::Result<T, Error>;
