//! Key-file protector for hosts without a usable keychain
//!
//! A random key is kept next to the token files with owner-only permissions
//! (0600 on Unix), which scopes it to the current OS account.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::key::KEY_LEN;
use super::{AeadProtector, DataProtector, MasterKey};
use crate::error::{CredentialError, Result};

/// Name of the key file inside the storage root
pub const KEY_FILE_NAME: &str = ".token_key";

/// Protector whose key is held in an owner-only file
pub struct KeyFileProtector {
    inner: AeadProtector,
    key_path: PathBuf,
}

impl KeyFileProtector {
    /// Load the key file in `root`, creating it on first use
    pub fn open(root: &Path) -> Result<Self> {
        let key_path = root.join(KEY_FILE_NAME);

        let key = if key_path.exists() {
            let bytes = Zeroizing::new(fs::read(&key_path)?);
            let key = MasterKey::from_slice(&bytes).ok_or_else(|| {
                CredentialError::Encryption(format!(
                    "key file {:?} has {} bytes, expected {}",
                    key_path,
                    bytes.len(),
                    KEY_LEN
                ))
            })?;
            debug!("Loaded token protection key from {:?}", key_path);
            key
        } else {
            fs::create_dir_all(root)?;
            let key = MasterKey::generate();
            write_owner_only(&key_path, key.as_bytes())?;
            info!("Created token protection key at {:?}", key_path);
            key
        };

        Ok(Self {
            inner: AeadProtector::new(key),
            key_path,
        })
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

#[cfg(unix)]
fn write_owner_only(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, bytes: &[u8]) -> Result<()> {
    // Per-user profile directories already carry an owner-only ACL on Windows.
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

impl DataProtector for KeyFileProtector {
    fn protect(&self, plaintext: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        self.inner.protect(plaintext, entropy)
    }

    fn unprotect(&self, protected: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        self.inner.unprotect(protected, entropy)
    }

    fn is_os_bound(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "Key File"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_persists_across_opens() {
        let temp_dir = TempDir::new().unwrap();

        let sealed = {
            let protector = KeyFileProtector::open(temp_dir.path()).unwrap();
            protector.protect(b"tokA", b"entropy").unwrap()
        };

        let reopened = KeyFileProtector::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.unprotect(&sealed, b"entropy").unwrap(), b"tokA");
    }

    #[test]
    fn test_rejects_malformed_key_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(KEY_FILE_NAME), b"short").unwrap();

        let result = KeyFileProtector::open(temp_dir.path());
        assert!(matches!(result, Err(CredentialError::Encryption(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let protector = KeyFileProtector::open(temp_dir.path()).unwrap();

        let mode = fs::metadata(protector.key_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
