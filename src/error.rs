//! Error types for reading decks

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position of a physical line within a deck (or one of its includes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub source: Arc<str>,
    /// 1-based line number
    pub line: usize,
}

impl Location {
    pub fn new(source: Arc<str>, line: usize) -> Self {
        Self { source, line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

/// Errors raised while turning deck text into a [`crate::model::Deck`]
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("{at}: {message}")]
    Syntax { at: Location, message: String },

    #[error("{at}: invalid {expected} '{value}'")]
    InvalidNumber {
        at: Location,
        expected: &'static str,
        value: String,
    },

    #[error("{at}: *{keyword} requires option {option}")]
    MissingOption {
        at: Location,
        keyword: String,
        option: &'static str,
    },

    #[error("{at}: duplicate {kind} id {id}")]
    DuplicateId {
        at: Location,
        kind: &'static str,
        id: usize,
    },

    #[error("{at}: {kind} '{name}' is already defined")]
    DuplicateName {
        at: Location,
        kind: &'static str,
        name: String,
    },

    #[error("{at}: set '{name}' is not defined")]
    UnknownSet { at: Location, name: String },

    #[error("{at}: *{keyword} is not allowed {context}")]
    Misplaced {
        at: Location,
        keyword: String,
        context: &'static str,
    },

    #[error("{at}: unsupported keyword *{keyword}")]
    UnsupportedKeyword { at: Location, keyword: String },

    #[error("{at}: unsupported option {option} on *{keyword}")]
    UnsupportedOption {
        at: Location,
        keyword: String,
        option: String,
    },

    #[error("step opened at {at} is never closed")]
    UnterminatedStep { at: Location },

    #[error("{at}: include nesting deeper than {limit}")]
    IncludeDepth { at: Location, limit: usize },

    #[error("{at}: *INCLUDE needs a file-based reader")]
    IncludeUnavailable { at: Location },

    #[error("{at}: cannot read included file {path:?}: {source}")]
    Include {
        at: Location,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeckError {
    /// Location of the offending line, when the error has one
    pub fn location(&self) -> Option<&Location> {
        match self {
            DeckError::Syntax { at, .. }
            | DeckError::InvalidNumber { at, .. }
            | DeckError::MissingOption { at, .. }
            | DeckError::DuplicateId { at, .. }
            | DeckError::DuplicateName { at, .. }
            | DeckError::UnknownSet { at, .. }
            | DeckError::Misplaced { at, .. }
            | DeckError::UnsupportedKeyword { at, .. }
            | DeckError::UnsupportedOption { at, .. }
            | DeckError::UnterminatedStep { at }
            | DeckError::IncludeDepth { at, .. }
            | DeckError::IncludeUnavailable { at }
            | DeckError::Include { at, .. } => Some(at),
            DeckError::Io { .. } => None,
        }
    }
}

/// Result type for deck reading
pub type DeckResult<T> = Result<T, DeckError>;
