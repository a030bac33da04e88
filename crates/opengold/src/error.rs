//! Error types for the Opengold server binary.
//!
//! [`AppError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the Opengold binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: opengold_server::ConfigError,
    },

    /// Application state could not be built.
    #[error("startup error: {source}")]
    State {
        /// The underlying request-layer error.
        #[from]
        source: opengold_server::ApiError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: opengold_server::ServerError,
    },
}
