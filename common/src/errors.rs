// Error types shared across the trigger service

use thiserror::Error;

/// Errors raised while evaluating a pipeline schedule.
///
/// All three variants indicate a defective schedule string. A defective
/// string should have been rejected by validation before it was stored, so
/// these propagate to the caller rather than being retried or swallowed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CronError {
    #[error("Expected 5 space-separated cron fields, found {found}")]
    FieldCount { found: usize },

    #[error("Unsupported syntax used in cron: {token:?}")]
    UnsupportedSyntax { token: char },

    #[error("Failed to parse cron value as integer: {part:?}")]
    InvalidValue { part: String },
}

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Queue-related errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to connect to queue: {0}")]
    Connection(String),

    #[error("Failed to create stream: {0}")]
    StreamCreation(String),

    #[error("Failed to publish message: {0}")]
    PublishFailed(String),

    #[error("Message serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Queue operation timeout: {0}")]
    Timeout(String),
}

/// Inbound trigger message errors
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Invalid push envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid trigger payload: {0}")]
    InvalidPayload(String),
}

/// Errors surfaced by the starter service
#[derive(Error, Debug)]
pub enum StarterError {
    #[error(transparent)]
    Cron(#[from] CronError),

    #[error("Failed to load pipelines: {0}")]
    Store(#[from] DatabaseError),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => DatabaseError::QueryFailed(db_err.message().to_string()),
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}
