//! Error types for the cellkit engine.
//!
//! All parsers and the writer return [`Result`]; nothing panics. Recoverable
//! oddities (unknown elements, unknown attributes) are captured as residue at
//! the XML layer rather than surfacing here.

use thiserror::Error;

pub use cellkit_xml::ParseError;

/// The top-level error type for cellkit.
#[derive(Error, Debug)]
pub enum Error {
    /// A part failed to parse; carries the part location and message.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error originating from the ZIP layer.
    #[error("ZIP error: {0}")]
    Zip(String),

    /// An explicit reader limit was breached.
    #[error("security limit exceeded: {0}")]
    Security(String),

    /// A construction invariant was violated by the caller.
    #[error("validation error: {0}")]
    Validation(String),
}

/// A convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal conditions noticed while opening a workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// `xl/styles.xml` was absent; defaults are in effect.
    MissingStylesXml,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::MissingStylesXml => write!(f, "xl/styles.xml is missing; using defaults"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_includes_location() {
        let err = Error::Parse(ParseError::new("xl/worksheets/sheet2.xml", "bad cell ref"));
        assert_eq!(err.to_string(), "parse error: xl/worksheets/sheet2.xml: bad cell ref");
    }

    #[test]
    fn test_security_display() {
        let err = Error::Security("entry count 20000 exceeds limit 10000".to_string());
        assert_eq!(
            err.to_string(),
            "security limit exceeded: entry count 20000 exceeds limit 10000"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_warning_display() {
        assert_eq!(
            Warning::MissingStylesXml.to_string(),
            "xl/styles.xml is missing; using defaults"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
