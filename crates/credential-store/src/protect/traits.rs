//! Protector trait definitions

use crate::error::Result;

/// Encrypts and decrypts bytes with key material bound to the current OS account
pub trait DataProtector: Send + Sync {
    /// Encrypt `plaintext`, binding `entropy` into the result
    fn protect(&self, plaintext: &[u8], entropy: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt bytes produced by [`DataProtector::protect`].
    ///
    /// Fails deterministically on tampered input or mismatched entropy.
    fn unprotect(&self, protected: &[u8], entropy: &[u8]) -> Result<Vec<u8>>;

    /// Whether the key material is held by an OS facility
    fn is_os_bound(&self) -> bool;

    /// Get a human-readable name for this backend
    fn backend_name(&self) -> &'static str;
}
