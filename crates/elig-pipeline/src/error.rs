//! Error types for the verification pipeline.

use elig_core::{EligError, SourceError};
use thiserror::Error;

use crate::phase::{Phase, PhaseEvent};

/// An event that is not legal in the current phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid phase transition: {event} while {from}")]
pub struct PhaseError {
    pub from: Phase,
    pub event: PhaseEvent,
}

/// Errors from a phase/result store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("no verification recorded for patient {0}")]
    NotFound(String),
}

/// Pipeline errors. Source failures never surface here; they become failed
/// results. These are infrastructure failures only.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("source setup failed: {0}")]
    Source(#[from] SourceError),

    #[error("verification task failed: {0}")]
    Join(String),

    #[error(transparent)]
    Core(#[from] EligError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Join(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
