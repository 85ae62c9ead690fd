use thiserror::Error;

/// Failures surfaced by the progression engine.
///
/// An achievement that is already unlocked is not represented here: the
/// evaluator treats it as a successful no-op.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Invalid session: {0}")]
    InvalidSession(i64),

    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Game is locked: {0}")]
    GameLocked(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data store error: {0}")]
    DataStore(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProgressError {
    /// True when the store refused a write because of a constraint or a
    /// trigger, as opposed to the store itself being unavailable.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            ProgressError::DataStore(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, ProgressError>;

/// Failures from the quiz content pipeline.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Content generation failed: {0}")]
    Generation(String),

    #[error("No JSON object found in generated content")]
    NoJson,

    #[error("Malformed generated content: {0}")]
    Parse(#[from] serde_json::Error),
}
