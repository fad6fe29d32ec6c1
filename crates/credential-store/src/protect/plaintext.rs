//! Pass-through protector for local development
//!
//! Only compiled with the `insecure-plaintext` feature, and that feature is a
//! compile error outside debug builds.

use tracing::warn;

use super::DataProtector;
use crate::error::{CredentialError, Result};

const MARKER: &[u8] = b"plaintext:";

/// Stores bytes as-is, prefixed by the entropy so mismatches are still detected
pub struct PlaintextProtector;

impl PlaintextProtector {
    pub fn new() -> Self {
        warn!("Plaintext token protector in use - tokens are stored unencrypted");
        Self
    }
}

impl Default for PlaintextProtector {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProtector for PlaintextProtector {
    fn protect(&self, plaintext: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(MARKER.len() + entropy.len() + 1 + plaintext.len());
        out.extend_from_slice(MARKER);
        out.extend_from_slice(entropy);
        out.push(b'\n');
        out.extend_from_slice(plaintext);
        Ok(out)
    }

    fn unprotect(&self, protected: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        let header_len = MARKER.len() + entropy.len() + 1;
        let header_ok = protected.len() >= header_len
            && protected.starts_with(MARKER)
            && &protected[MARKER.len()..header_len - 1] == entropy
            && protected[header_len - 1] == b'\n';

        if !header_ok {
            return Err(CredentialError::Corruption(
                "plaintext record header mismatch".to_string(),
            ));
        }

        Ok(protected[header_len..].to_vec())
    }

    fn is_os_bound(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "Plaintext (development only)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_entropy_check() {
        let protector = PlaintextProtector::new();
        let stored = protector.protect(b"tokA", b"app-a").unwrap();

        assert_eq!(protector.unprotect(&stored, b"app-a").unwrap(), b"tokA");
        assert!(protector.unprotect(&stored, b"app-b").is_err());
    }
}
