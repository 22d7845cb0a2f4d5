//! Error types for the waiter voice subsystem

use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur at the edges of the voice subsystem.
///
/// Inside the core these never reach a caller: the lifecycle controller and
/// the orchestrator log them and degrade (error state, spoken fallback, no-op).
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Speech recognition error: {0}")]
    Recognition(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(&'static str),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Config load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
