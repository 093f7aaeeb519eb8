// ===============================
// src/error.rs
// ===============================
use thiserror::Error;

/// Failure taxonomy for one advisor run.
///
/// `InvalidInput` is raised at the boundary of each function before any
/// working state is touched, so callers never see partial results.
/// Running out of cash or instruments is NOT an error; the planner returns
/// a normal terminal result (partial plan + leftover) instead.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("broker request failed: {0}")]
    Broker(#[from] reqwest::Error),
}

impl AdvisorError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AdvisorError::InvalidInput(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        AdvisorError::DataUnavailable(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
