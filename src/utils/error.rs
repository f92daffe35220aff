// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 403 Forbidden
}

/// Structural failures inside an extractor. Never escapes the public
/// `extract` entry points; those log it and return an empty sequence.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Spreadsheet could not be read: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Spreadsheet has no worksheets")]
    NoWorksheet,

    #[error("Sheet is empty after dropping blank rows")]
    EmptySheet,

    #[error("No header row within the first {0} rows")]
    HeaderNotFound(usize),

    #[error("Required columns missing: {0}")]
    MissingColumns(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("No dataset has been stored yet")]
    Empty,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Fetching failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
