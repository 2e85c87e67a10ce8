use thiserror::Error;

use crate::input::SourceKind;

/// Failures of the external gesture/voice collaborators.
///
/// These are reported to the presentation layer as status messages; a round
/// still completes through the timeout auto-fill when a source is down.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{kind} input unavailable: {reason}")]
    Unavailable { kind: SourceKind, reason: String },

    #[error("{kind} input disconnected")]
    Disconnected { kind: SourceKind },
}

impl SourceError {
    pub fn source_kind(&self) -> SourceKind {
        match self {
            SourceError::Unavailable { kind, .. } | SourceError::Disconnected { kind } => *kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("results log error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
