use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// A unique index rejected the write (PostgREST answers 409).
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation(_))
    }
}
