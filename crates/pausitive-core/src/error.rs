//! Core error types for pausitive-core.
//!
//! Validation and lifecycle errors are returned to the caller. Storage errors
//! are only surfaced by the low-level store; history persistence swallows them.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineStatus;
use crate::session::AppState;

/// Core error type for pausitive-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Engine lifecycle errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Session tracker lifecycle errors
    #[error("Session error: {0}")]
    Tracker(#[from] TrackerError),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A phase duration was zero, negative or not a number.
    #[error("Invalid {phase} duration for technique '{technique}': {value} (must be > 0)")]
    InvalidDuration {
        technique: String,
        phase: &'static str,
        value: f64,
    },

    /// Set count outside the accepted range.
    #[error("Invalid set count {sets}: must be between {min} and {max}")]
    InvalidSets { sets: u32, min: u32, max: u32 },

    /// Custom mode selected without a set count.
    #[error("Mode '{mode}' requires an explicit set count")]
    MissingSets { mode: String },

    /// Catalog lookup failed.
    #[error("Unknown {kind}: '{id}'")]
    UnknownId { kind: &'static str, id: String },
}

/// Illegal engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Cannot {action} while engine is {from:?}")]
    InvalidTransition {
        from: EngineStatus,
        action: &'static str,
    },
}

/// Illegal session tracker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Cannot {action} while session is {from:?}")]
    InvalidTransition {
        from: AppState,
        action: &'static str,
    },
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    /// Stored value could not be encoded or decoded
    #[error("Corrupt stored value: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),

    /// Backend refused the write
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
