//! Error types for build operations.
//!
//! Errors are split along the propagation policy: manifest errors are fatal
//! and abort a run before any reconciliation, everything else is isolated to
//! the item (or core phase) that produced it and surfaced as a status line.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of buildkit errors.
///
/// Categories drive how the reconciler treats a failure: fatal errors stop
/// the run, everything else is reported and the run continues with the next
/// item. Nothing is retried within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Manifest missing or unparseable; aborts before reconciliation.
    Fatal,
    /// Registry unreachable or returned garbage; item stays unresolved.
    Network,
    /// Platform CLI invocation failed; item action is marked failed.
    Execution,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this category terminates the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Errors that can occur during build operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Build manifest file does not exist.
    #[error("build file not found: {0}")]
    ManifestNotFound(PathBuf),

    /// Build manifest could not be parsed.
    #[error("error parsing build file {path}: {message}")]
    ManifestParse {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser error message.
        message: String,
    },

    /// Registry request failed (transport, timeout, non-2xx).
    #[error("registry error: {message}")]
    Network {
        /// Detailed error message from the failed request.
        message: String,
    },

    /// Registry returned a response we could not make sense of.
    #[error("invalid registry response: {0}")]
    InvalidResponse(String),

    /// The platform CLI executable could not be located.
    #[error("wp executable not found in PATH")]
    CliNotFound,

    /// A platform CLI invocation could not be launched or reported an error.
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what failed.
        message: String,
        /// Standard error output from the failed invocation.
        stderr: String,
    },

    /// Downloaded item archive could not be unpacked.
    #[error("archive error: {0}")]
    Archive(String),

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Credential acquisition failed (closed stdin, aborted prompt).
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error category for propagation policy.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ManifestNotFound(_) | Error::ManifestParse { .. } => ErrorCategory::Fatal,
            Error::Network { .. } | Error::InvalidResponse(_) => ErrorCategory::Network,
            Error::CommandFailed { .. } | Error::CliNotFound => ErrorCategory::Execution,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error terminates the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Network {
                message: format!("HTTP {}", code),
            },
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_errors_are_fatal() {
        assert!(Error::ManifestNotFound(PathBuf::from("build.yml")).is_fatal());
        assert!(
            Error::ManifestParse {
                path: PathBuf::from("build.yml"),
                message: "bad yaml".to_string(),
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_item_level_errors_are_not_fatal() {
        let network = Error::Network {
            message: "timeout".to_string(),
        };
        assert_eq!(network.category(), ErrorCategory::Network);
        assert!(!network.is_fatal());

        let exec = Error::CommandFailed {
            message: "wp plugin install".to_string(),
            stderr: "Error: nope".to_string(),
        };
        assert_eq!(exec.category(), ErrorCategory::Execution);
        assert!(!exec.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = Error::ManifestNotFound(PathBuf::from("production.yml"));
        assert!(format!("{}", err).contains("production.yml"));
    }

    #[test]
    fn test_io_constructor_keeps_path() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        match Error::io("/srv/site", io_err) {
            Error::Io { path, .. } => assert_eq!(path, PathBuf::from("/srv/site")),
            _ => panic!("expected Error::Io"),
        }
    }
}
