//! Error types for credential-store

use thiserror::Error;

/// Result type alias for credential storage operations
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Credential storage error types
///
/// "Not authenticated" is not an error: token lookups return `None` once the
/// fallback chain is exhausted.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Stored record is corrupt: {0}")]
    Corruption(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Identity '{bound}' is bound to this session - log out before binding '{requested}'")]
    IdentityAlreadyBound { bound: String, requested: String },

    #[error("Refusing to store an empty access token")]
    EmptyAccessToken,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CredentialError {
    /// Whether this failure came from the filesystem or the platform primitive
    /// rather than from caller input.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            CredentialError::Io(_) | CredentialError::Encryption(_) | CredentialError::Keychain(_)
        )
    }
}
