//! Error types and handling
//!
//! This module provides the error types used throughout the Genesis engine.
//! All errors implement the `GenesisErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Provider-level failures have their own classified error type in the engine
//! (`LLMError`); they only surface here once the router has given up.

use thiserror::Error;

/// Trait for Genesis error extensions
///
/// Provides a user-facing hint and recoverability information. The end user
/// never sees a raw error, so every variant maps to a short hint.
pub trait GenesisErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried on the next turn. Non-recoverable
    /// errors need the operator to change configuration or environment.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, GenesisErrorExt};
///
/// let error = EngineError::ToolNotFound("teleport".to_string());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Config("history_tail must be below history_ceiling".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path canonicalization failed for {0:?}: {1}")]
    PathCanonicalization(std::path::PathBuf, String),

    // Persistence errors
    #[error("Task state error: {0}")]
    TaskState(String),

    // Decision loop errors
    #[error("Max iterations exceeded ({0} turns)")]
    MaxIterationsExceeded(usize),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenesisErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::PathCanonicalization(_, _) => "Invalid path specified",

            Self::TaskState(_) => "Task progress could not be saved. Check workspace permissions",

            Self::MaxIterationsExceeded(_) => {
                "Task took too many steps. Try breaking it into smaller requests"
            }

            Self::ToolNotFound(_) => "The requested tool is not available",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::PathCanonicalization(_, _))
    }
}
