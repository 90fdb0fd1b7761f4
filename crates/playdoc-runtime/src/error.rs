//! Error types for snippet execution.

/// Infrastructure failures. Errors raised by snippets themselves are not
/// `Err`s; they come back as error [`ExecutionResult`](crate::ExecutionResult)s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The interpreter process could not be started
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The interpreter did not report ready in time
    #[error("runtime did not become ready within {secs}s")]
    LoadTimeout { secs: u64 },

    /// The interpreter sent something other than the expected line
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A runtime load failed; every caller waiting on it receives this
    #[error("runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// The JavaScript engine could not be set up
    #[error("javascript engine error: {0}")]
    JavaScript(String),
}

impl Error {
    /// Whether the runtime that produced this error can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Protocol(_))
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
