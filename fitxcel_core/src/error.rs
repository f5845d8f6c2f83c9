//! Error types for the fitxcel_core library.

use crate::types::{Stat, TaskId};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fitxcel_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// User id is empty or contains characters unsafe for storage keys
    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    /// Task id is not among the profile's known tasks
    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    /// Task reward has already been claimed
    #[error("Task {0} already completed")]
    TaskAlreadyCompleted(TaskId),

    /// Stat name outside the fixed stat set
    #[error("Invalid stat: {0:?} (expected strength, stamina or agility)")]
    InvalidStat(String),

    /// No level points left to spend
    #[error("Not enough level points")]
    InsufficientPoints,

    /// Stat cannot be raised any further
    #[error("{0} is already at its maximum value")]
    StatAtMaximum(Stat),

    /// Stored document changed between read and conditional write
    #[error("Profile {user_id} was modified concurrently (expected version {expected})")]
    ConcurrentModification { user_id: String, expected: u64 },

    /// Persistence boundary failed or timed out
    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    /// Stored document exists but cannot be decoded
    #[error("Corrupt profile document for {user_id}: {reason}")]
    CorruptDocument { user_id: String, reason: String },
}

impl Error {
    /// Transient repository failures that a read-then-conditional-write may retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConcurrentModification { .. } | Error::RepositoryUnavailable(_)
        )
    }

    /// Deterministic failures caused by the caller's request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUserId(_)
                | Error::TaskNotFound(_)
                | Error::TaskAlreadyCompleted(_)
                | Error::InvalidStat(_)
                | Error::InsufficientPoints
                | Error::StatAtMaximum(_)
        )
    }

    /// Stable machine-readable name of the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Error::TaskNotFound(_) => "task_not_found",
            Error::TaskAlreadyCompleted(_) => "task_already_completed",
            Error::InvalidStat(_) => "invalid_stat",
            Error::InsufficientPoints => "insufficient_points",
            Error::StatAtMaximum(_) => "stat_at_maximum",
            Error::InvalidUserId(_) => "invalid_user_id",
            Error::ConcurrentModification { .. } => "concurrent_modification",
            Error::RepositoryUnavailable(_) => "repository_unavailable",
            Error::CorruptDocument { .. } => "corrupt_document",
            Error::Config(_) | Error::Toml(_) => "config",
            Error::CatalogValidation(_) => "catalog_validation",
            Error::Io(_) | Error::Json(_) => "internal",
        }
    }
}
