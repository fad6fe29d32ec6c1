//! AES-256-GCM authenticated encryption
//!
//! Envelope format (binary): `{version}{iv}{ciphertext}{auth_tag}`
//! - Version: 1 byte
//! - IV: 12 bytes (96 bits) - standard for GCM
//! - Ciphertext: variable length
//! - Auth tag: 16 bytes (128 bits)
//!
//! The caller's entropy is passed as additional authenticated data, so a
//! record written under different entropy fails to open.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use super::{DataProtector, MasterKey};
use crate::error::{CredentialError, Result};

const ENVELOPE_VERSION: u8 = 1;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + IV_LEN;

/// Encrypts with a fixed 256-bit key.
///
/// The keychain and key-file protectors wrap this once they have obtained
/// their key.
pub struct AeadProtector {
    key: MasterKey,
}

impl AeadProtector {
    pub fn new(key: MasterKey) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| CredentialError::Encryption(e.to_string()))
    }

    /// Encrypt plaintext into an envelope, authenticating `aad` alongside it
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.cipher()?;

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        // aes-gcm appends the auth tag to the ciphertext
        let sealed = cipher
            .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        let mut envelope = Vec::with_capacity(HEADER_LEN + sealed.len());
        envelope.push(ENVELOPE_VERSION);
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&sealed);
        Ok(envelope)
    }

    /// Open an envelope produced by [`AeadProtector::encrypt`]
    pub fn decrypt(&self, envelope: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if envelope.len() < HEADER_LEN + TAG_LEN {
            return Err(CredentialError::Corruption(format!(
                "envelope too short: {} bytes",
                envelope.len()
            )));
        }
        if envelope[0] != ENVELOPE_VERSION {
            return Err(CredentialError::Corruption(format!(
                "unsupported envelope version {}",
                envelope[0]
            )));
        }

        let cipher = self.cipher()?;
        let nonce = Nonce::from_slice(&envelope[1..HEADER_LEN]);

        cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &envelope[HEADER_LEN..],
                    aad,
                },
            )
            .map_err(|_| CredentialError::Corruption("authentication failed".to_string()))
    }
}

impl DataProtector for AeadProtector {
    fn protect(&self, plaintext: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        self.encrypt(plaintext, entropy)
    }

    fn unprotect(&self, protected: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        self.decrypt(protected, entropy)
    }

    fn is_os_bound(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "AES-256-GCM (in-memory key)"
    }
}
