//! # Error Types
//!
//! Custom error types for Deck Input using `thiserror`.
//!
//! Device errors are contained per task: a reader that hits one of them ends,
//! logs, and leaves its siblings running. Only `AlreadyStarted` reaches the
//! caller of [`crate::session::DeckInput::start`].

use thiserror::Error;

/// Main error type for Deck Input
#[derive(Debug, Error)]
pub enum DeckInputError {
    /// A device handle could not be acquired (fatal to that reader only)
    #[error("Failed to open device {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure mid-loop (terminates that reader)
    #[error("Failed to read from device {path}: {source}")]
    DeviceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Report buffer too short for the required fields (skipped, never fatal)
    #[error("Malformed report: {len} bytes, need at least {min}")]
    MalformedReport { len: usize, min: usize },

    /// Exclusive capture could not be released (logged only)
    #[error("Failed to release capture on {path}: {source}")]
    CaptureRelease {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(String),

    /// `start()` was called on a session that already ran
    #[error("Session already started")]
    AlreadyStarted,
}

/// Result type alias for Deck Input
pub type Result<T> = std::result::Result<T, DeckInputError>;
