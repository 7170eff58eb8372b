// keygate — Top-level error types
//
// Aggregates errors from every module into a single enum for the
// application boundary.

use thiserror::Error;

/// Top-level error type for all keygate operations.
#[derive(Debug, Error)]
pub enum KeygateError {
    #[error("{} (status {})", .0.message(), .0.code())]
    Keychain(#[from] crate::keychain::KeychainError),

    #[error("Enclave error: {0}")]
    Enclave(#[from] crate::enclave::EnclaveError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KeygateError>;
