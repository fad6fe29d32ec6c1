//! Local application identities

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CredentialError, Result};

/// Longest identity accepted, in UTF-8 bytes. The record file name is the hex
/// stem plus `.token`: 2 * 120 + 6 = 246 bytes, within the 255-byte limit.
pub(crate) const MAX_IDENTITY_LEN: usize = 120;

/// Stable name of a local application user.
///
/// Selects whose persisted record is used. Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Validate and wrap an identity string
    pub fn new(value: &str) -> Result<Self> {
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(CredentialError::InvalidIdentity(
                "identity cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_IDENTITY_LEN {
            return Err(CredentialError::InvalidIdentity(format!(
                "identity too long (max {} bytes)",
                MAX_IDENTITY_LEN
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(CredentialError::InvalidIdentity(
                "identity contains control characters".to_string(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem for this identity's record: hex of the UTF-8 bytes, so any
    /// identity maps to a portable, collision-free file name.
    pub fn file_stem(&self) -> String {
        hex::encode(self.0.as_bytes())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = CredentialError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_whitespace() {
        let identity = Identity::new("  alice@shop  ").unwrap();
        assert_eq!(identity.as_str(), "alice@shop");
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(Identity::new("").is_err());
        assert!(Identity::new("   ").is_err());
        assert!(Identity::new("bad\nname").is_err());
        assert!(Identity::new(&"x".repeat(MAX_IDENTITY_LEN + 1)).is_err());
    }

    #[test]
    fn test_longest_identity_fits_file_name_limit() {
        let identity = Identity::new(&"x".repeat(MAX_IDENTITY_LEN)).unwrap();
        assert!(identity.file_stem().len() + ".token".len() <= 255);

        // Multi-byte characters count by bytes, not chars.
        assert!(Identity::new(&"é".repeat(MAX_IDENTITY_LEN / 2)).is_ok());
        assert!(Identity::new(&"é".repeat(MAX_IDENTITY_LEN / 2 + 1)).is_err());
    }

    #[test]
    fn test_file_stem_is_path_safe() {
        let identity = Identity::new("../../etc/passwd").unwrap();
        let stem = identity.file_stem();
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(stem, Identity::new("other").unwrap().file_stem());
    }

    #[test]
    fn test_serde_validates() {
        let parsed: Identity = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(parsed.as_str(), "u1");
        assert!(serde_json::from_str::<Identity>("\"\"").is_err());
    }
}
