//! Error types for delimstream

use thiserror::Error;

/// Errors that can occur while configuring, reading or writing delimited text
///
/// Malformed *input* is not represented here: the scanner recovers from bad
/// lines locally and reports them through the error callback as data. This
/// type covers the fatal cases - invalid configuration and I/O failures.
#[derive(Error, Debug)]
pub enum DelimError {
    /// Invalid parser or encoder configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read input
    #[error("Read error: {0}")]
    Read(String),

    /// Failed to write output
    #[error("Write error: {0}")]
    Write(String),
}

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, DelimError>;

impl From<std::io::Error> for DelimError {
    fn from(e: std::io::Error) -> Self {
        DelimError::Read(e.to_string())
    }
}
