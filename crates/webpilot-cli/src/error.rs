//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Input file could not be parsed
    #[error("Cannot read {path}: {message}")]
    InputFile {
        /// Offending file
        path: String,
        /// Parser message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// webpilot library error
    #[error("webpilot error: {0}")]
    Pilot(#[from] webpilot::PilotError),
}

impl CliError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an input file error
    #[must_use]
    pub fn input_file(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::InputFile {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_invalid_argument_message() {
        let err = CliError::invalid_argument("--suggest needs TERM=a,b");
        assert_eq!(err.to_string(), "Invalid argument: --suggest needs TERM=a,b");
    }

    #[test]
    fn test_input_file_names_path() {
        let err = CliError::input_file(Path::new("marks.json"), "expected value");
        assert!(err.to_string().contains("marks.json"));
        assert!(err.to_string().contains("expected value"));
    }

    #[test]
    fn test_from_pilot_error() {
        let err: CliError = webpilot::PilotError::profile("no name").into();
        assert!(matches!(err, CliError::Pilot(_)));
    }

    #[test]
    fn test_from_io_error() {
        let err: CliError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
