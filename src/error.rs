//! error.rs
//!
//! Error taxonomy shared by the generation pipeline, the AI client and the
//! runner harness.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Introspection found no class declaration. Callers skip the file.
    #[error("no class declaration found in {0}")]
    NotAClass(PathBuf),

    /// Overwrite blocked: the file exists and `--force` was not given, or the
    /// destination was already written during this invocation.
    #[error("test file already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("{0}")]
    MissingConfiguration(String),

    #[error("Unsupported AI provider: {0}")]
    UnsupportedProvider(String),

    #[error("failed to reach {provider}: {message}")]
    Connection { provider: String, message: String },

    #[error("{provider} API request failed ({status}): {body}")]
    ProviderCallFailed {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("test runner failed: {0}")]
    RunnerInvocationFailed(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that abort a command instead of degrading to a `false` result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MissingConfiguration(_)
                | Error::UnsupportedProvider(_)
                | Error::Connection { .. }
                | Error::ProviderCallFailed { .. }
                | Error::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_errors_are_fatal_generation_errors_are_not() {
        assert!(Error::MissingConfiguration("AI API key is not configured".into()).is_fatal());
        assert!(Error::UnsupportedProvider("mistral".into()).is_fatal());
        assert!(!Error::NotAClass(PathBuf::from("a.php")).is_fatal());
        assert!(!Error::DestinationExists(PathBuf::from("tests/Unit/ATest.php")).is_fatal());
        assert!(!Error::RunnerInvocationFailed("exit 2".into()).is_fatal());
    }

    #[test]
    fn unsupported_provider_message_names_provider() {
        let e = Error::UnsupportedProvider("mistral".into());
        assert_eq!(e.to_string(), "Unsupported AI provider: mistral");
    }
}
