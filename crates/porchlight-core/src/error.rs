//! Error types for porchlight-core operations

use thiserror::Error;

/// Errors that can occur in the trust primitives
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    #[error("password must be between {min} and {max} bytes")]
    PasswordLength { min: usize, max: usize },

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("invalid domain {host:?}: {reason}")]
    InvalidDomain { host: String, reason: &'static str },

    #[error("session token expired")]
    TokenExpired,

    #[error("invalid session token")]
    TokenInvalid,

    #[error("token encoding failed: {0}")]
    TokenEncoding(String),
}

/// Result type for porchlight-core operations
pub type Result<T> = std::result::Result<T, Error>;
