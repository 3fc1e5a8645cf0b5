use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable classification of a core failure. Transport layers map these to
/// their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    SchedulingConflict,
    InvalidTransition,
    Forbidden,
    Expired,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::SchedulingConflict => "scheduling_conflict",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Expired => "expired",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Scheduling conflict: {0}")]
    SchedulingConflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::BadRequest(_) => ErrorKind::BadRequest,
            AppError::SchedulingConflict(_) => ErrorKind::SchedulingConflict,
            AppError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::Expired(_) => ErrorKind::Expired,
            AppError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::SchedulingConflict(msg)
            | AppError::InvalidTransition(msg)
            | AppError::Forbidden(msg)
            | AppError::Expired(msg)
            | AppError::Storage(msg) => msg,
        }
    }

    /// Storage failures are the only ones worth retrying, and only for reads.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }
}
