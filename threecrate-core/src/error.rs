//! Error types for 3DCrate

use thiserror::Error;

/// Main error type for 3DCrate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    
    #[error("Invalid data: {0}")]
    InvalidData(String),
    
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for 3DCrate operations
pub type Result<T> = std::result::Result<T, Error>;
