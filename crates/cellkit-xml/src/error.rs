//! Parse error type shared by all part parsers.

use thiserror::Error;

/// A failure while parsing one part of an OOXML package.
///
/// `location` is the ZIP entry name of the offending part; `message` is a
/// single-sentence description of what went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location}: {message}")]
pub struct ParseError {
    pub location: String,
    pub message: String,
}

impl ParseError {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// A convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ParseError>;
