use thiserror::Error;

/// Errors raised by the query and storage layers.
///
/// Validation problems are not errors here; they travel back to the caller
/// as [`crate::schema::FormState`].
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("seed data error: {0}")]
    Seed(#[from] csv::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("background task failed: {0}")]
    Task(String),
}

pub type DashboardResult<T> = Result<T, DashboardError>;
