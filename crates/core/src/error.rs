//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid bundle '{0}' (valid bundles are ca|int)")]
    InvalidBundle(String),

    #[error("malformed version '{0}'")]
    MalformedVersion(String),

    #[error("incrementing the version would cause a regression ({0})")]
    Regression(&'static str),

    #[error("unsupported public key kind: {0}")]
    UnsupportedKeyKind(String),

    #[error("x509 error: {0}")]
    X509(#[from] openssl::error::ErrorStack),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
