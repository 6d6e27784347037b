//! Unified error types for flowstate.
//!
//! Library code uses `Error` and `Result<T>`. Configuration problems
//! (bad filter names, dependency cycles, unreadable config files) are
//! reported as `Error` values at startup; invariant violations inside the
//! core (interning a state over an unregistered domain, mixing values of
//! different domains) are programming errors and panic.

use std::path::PathBuf;
use thiserror::Error as ThisError;

use crate::ids::AnalysisId;

/// Unified error type for flowstate library operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Configuration file error.
    #[error("configuration error in {}: {message}", path.display())]
    Config {
        /// Path to the problematic configuration file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration parse error.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An analysis name that matches no registered analysis kind.
    #[error("unknown analysis: {0}")]
    UnknownAnalysis(String),

    /// An operation referenced an analysis id that was never registered.
    #[error("analysis {0} is not registered")]
    UnregisteredAnalysis(AnalysisId),

    /// The dependency graph of the required analyses contains a cycle.
    #[error("dependency cycle among analyses: {0}")]
    DependencyCycle(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{context}: {message}")]
    WithContext {
        /// Context describing where the error occurred.
        context: String,
        /// The underlying error message.
        message: String,
    },

    /// Generic error for other cases.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unknown analysis error.
    pub fn unknown_analysis(name: impl Into<String>) -> Self {
        Self::UnknownAnalysis(name.into())
    }

    /// Create a dependency cycle error from the offending analysis names.
    pub fn dependency_cycle(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let joined = names
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>()
            .join(", ");
        Self::DependencyCycle(joined)
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Add context to an error.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias for flowstate library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_analysis("fake-analysis");
        assert_eq!(err.to_string(), "unknown analysis: fake-analysis");

        let err = Error::dependency_cycle(["divzero", "taint"]);
        assert_eq!(
            err.to_string(),
            "dependency cycle among analyses: divzero, taint"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::other("bad filter").with_context("resolving analyses option");
        assert!(err.to_string().contains("resolving analyses option"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
