//! User-scoped encryption primitives
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption with caller-supplied entropy as AAD
//! - An OS keychain backed key (macOS Keychain, Windows Credential Manager, Secret Service)
//! - A key-file fallback for hosts without a keychain
//! - A plaintext protector for local development (`insecure-plaintext` feature, debug builds only)

mod aead;
mod key;
mod key_file;
mod keychain;
#[cfg(feature = "insecure-plaintext")]
mod plaintext;
mod traits;

pub use aead::AeadProtector;
pub use key::MasterKey;
pub use key_file::KeyFileProtector;
pub use keychain::KeychainProtector;
#[cfg(feature = "insecure-plaintext")]
pub use plaintext::PlaintextProtector;
pub use traits::DataProtector;

#[cfg(all(feature = "insecure-plaintext", not(debug_assertions)))]
compile_error!(
    "the `insecure-plaintext` feature stores tokens unencrypted and cannot be enabled in release builds"
);
