// Typed errors with thiserror. Surface meaningful messages to JS.
// NotFound/OutOfRange are contract violations from a miswired view; PersistFailure is user-facing.

use thiserror::Error;

/// Roadmap core error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoadmapError {
    #[error("Game not found: {game_id}")]
    GameNotFound { game_id: String },

    #[error("Step {step_id} not found in game {game_id}")]
    StepNotFound { game_id: String, step_id: u32 },

    #[error("Index {index} out of range for {len} steps")]
    OutOfRange { index: usize, len: usize },

    #[error("Game id already in use: {0}")]
    DuplicateGameId(String),

    #[error("Persist failure: {0}")]
    PersistFailure(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RoadmapError {
    /// True for the lookup failures (`GameNotFound` and `StepNotFound`).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RoadmapError::GameNotFound { .. } | RoadmapError::StepNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for RoadmapError {
    fn from(err: serde_json::Error) -> Self {
        RoadmapError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RoadmapError>;
