use thiserror::Error;

use crate::plan::{Status, YearId};

/// Rejected plan mutation. Nothing is changed when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("subject name cannot be empty")]
    EmptyName,

    #[error("a subject named \"{0}\" already exists")]
    DuplicateName(String),

    #[error("correlative {0} is listed more than once")]
    DuplicateCorrelative(String),

    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    #[error("unknown year: {0}")]
    UnknownYear(YearId),

    #[error("status {0:?} cannot be set manually")]
    StatusNotSettable(Status),
}

/// A plan file that could not be imported. The current plan is kept.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed plan document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("plan document has no `years` array")]
    MissingYears,

    #[error("could not read plan document: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence failure. Callers log and swallow these.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
