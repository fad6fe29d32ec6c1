//! OS keychain backed protector
//!
//! The AES key lives in the system keychain, so only the same OS account on
//! the same machine can open the token files:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::{AeadProtector, DataProtector, MasterKey};
use crate::error::{CredentialError, Result};

/// Keychain account holding the token protection key
const KEY_ACCOUNT: &str = "token-protection-key";

/// Protector whose key is held by the OS keychain
pub struct KeychainProtector {
    inner: AeadProtector,
}

impl KeychainProtector {
    /// Open the key stored under `service`, creating it on first use
    pub fn open(service: &str) -> Result<Self> {
        let entry = Entry::new(service, KEY_ACCOUNT)
            .map_err(|e| CredentialError::Keychain(e.to_string()))?;

        let key = match entry.get_password() {
            Ok(encoded) => {
                let encoded = Zeroizing::new(encoded);
                let bytes = Zeroizing::new(base64_decode(&encoded)?);
                let key = MasterKey::from_slice(&bytes).ok_or_else(|| {
                    CredentialError::Keychain("stored protection key has the wrong length".to_string())
                })?;
                debug!("Loaded token protection key from keychain service {}", service);
                key
            }
            Err(keyring::Error::NoEntry) => {
                let key = MasterKey::generate();
                let encoded = Zeroizing::new(base64_encode(key.as_bytes()));
                entry
                    .set_password(&encoded)
                    .map_err(|e| CredentialError::Keychain(e.to_string()))?;
                info!("Created token protection key in keychain service {}", service);
                key
            }
            Err(e) => return Err(CredentialError::Keychain(e.to_string())),
        };

        Ok(Self {
            inner: AeadProtector::new(key),
        })
    }
}

impl DataProtector for KeychainProtector {
    fn protect(&self, plaintext: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        self.inner.protect(plaintext, entropy)
    }

    fn unprotect(&self, protected: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        self.inner.unprotect(protected, entropy)
    }

    fn is_os_bound(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        return "macOS Keychain";

        #[cfg(target_os = "windows")]
        return "Windows Credential Manager";

        #[cfg(target_os = "linux")]
        return "Linux Secret Service";

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        return "System Keychain";
    }
}

/// Base64 encode bytes
fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Base64 decode string
fn base64_decode(encoded: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| CredentialError::Keychain(format!("Base64 decode error: {}", e)))
}
