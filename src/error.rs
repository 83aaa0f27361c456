//! # Error Types
//!
//! Custom error types for InstaLog using `thiserror`.

use thiserror::Error;

/// Main error type for InstaLog
#[derive(Debug, Error)]
pub enum InstalogError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A serial port could not be opened or enumerated
    #[error("Serial error: {0}")]
    Serial(String),

    /// Discovery found no port emitting a recognized NMEA sentence
    #[error("Could not find a connected GPS (tried: {0})")]
    GpsNotFound(String),

    /// A sheet on disk does not match the expected name or layout
    #[error("Invalid sheet: {0}")]
    InvalidSheet(String),

    /// A ledger edit addressed a cell or row shape that does not exist
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),
}

/// Result type alias for InstaLog
pub type Result<T> = std::result::Result<T, InstalogError>;
