//! Error handling for warden.
use thiserror::Error;

/// Defines all possible errors that can occur in the process registry.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A process with the same identifier is already registered.
    #[error("Process '{id}' is already registered")]
    DuplicateProcess {
        /// The identifier that was already taken.
        id: String,
    },

    /// The requested identifier is not present in the registry.
    #[error("Process '{id}' not found")]
    ProcessNotFound {
        /// The identifier that was looked up.
        id: String,
    },

    /// Error launching the OS process for a registered entry.
    #[error("Failed to start process '{id}': {source}")]
    LaunchError {
        /// The process identifier that failed to start.
        id: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error signalling or reaping the OS process during a stop.
    #[error("Failed to stop process '{id}': {source}")]
    StopError {
        /// The process identifier that failed to stop.
        id: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The `run_as` account does not exist on this system.
    #[error("Process '{id}' requests unknown user '{user}'")]
    UnknownUser {
        /// The process identifier.
        id: String,
        /// The account name that could not be resolved.
        user: String,
    },

    /// Error for poisoned mutex.
    #[error("Mutex is poisoned: {0}")]
    MutexPoisoned(String),
}

/// Implement the `From` trait to convert a `std::sync::PoisonError` into a `SupervisorError`.
impl<T> From<std::sync::PoisonError<T>> for SupervisorError {
    /// Converts a `std::sync::PoisonError` into a `SupervisorError`.
    fn from(err: std::sync::PoisonError<T>) -> Self {
        SupervisorError::MutexPoisoned(err.to_string())
    }
}

/// Error type for the log tail client.
#[derive(Debug, Error)]
pub enum TailError {
    /// Error reaching the logs endpoint or decoding its response.
    #[error("Log fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error parsing a duration argument such as the poll interval.
    #[error("Invalid duration: '{0}'")]
    InvalidDuration(String),
}
