//! Authentication error types

/// Errors raised while obtaining credentials for the backend.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The session token has expired and cannot be refreshed here.
    #[error("Session expired: {message}")]
    SessionExpired { message: String },
}
