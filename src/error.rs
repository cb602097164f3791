use thiserror::Error;

/// Boxed error type used for failures of the next handler in the chain.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration rejected by `StaticConfig::validate`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The index file name was empty.
    #[error("index file name must not be empty")]
    EmptyIndexFile,
    /// The index file name was not a single plain file name.
    #[error("index file must be a plain file name")]
    InvalidIndexFile {
        /// Offending value.
        value: String,
    },
}

/// Failure while executing a request in the static stage.
///
/// File system errors never end up here: those cause the request to be passed on instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A response could not be assembled.
    #[error("unable to build response")]
    Response(#[from] http::Error),
    /// The next handler in the chain failed.
    #[error("next handler failed")]
    Next(#[source] BoxError),
}
