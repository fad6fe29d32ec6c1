//! Token record files
//!
//! Layout under the storage root:
//! - `identities/<hex(identity)>.token` - one record per identity
//! - `pending.token` - unscoped record awaiting an identity

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::{ProtectedFileStore, RecordKind};
use crate::error::Result;
use crate::identity::Identity;
use crate::types::TokenRecord;

const IDENTITIES_DIR: &str = "identities";
const PENDING_FILE: &str = "pending.token";
const TOKEN_EXTENSION: &str = "token";

/// Which token record to address
#[derive(Debug, Clone, Copy)]
pub enum Slot<'a> {
    /// The record owned by an identity
    Identity(&'a Identity),
    /// The unscoped record written before the identity is known
    Temporary,
}

/// Reads and writes encrypted token records
pub struct TokenFileStore {
    files: Arc<ProtectedFileStore>,
}

impl TokenFileStore {
    pub fn new(files: Arc<ProtectedFileStore>) -> Self {
        Self { files }
    }

    /// Path of the file backing a slot
    pub fn path_for(&self, slot: Slot<'_>) -> PathBuf {
        match slot {
            Slot::Identity(identity) => self
                .files
                .root()
                .join(IDENTITIES_DIR)
                .join(identity.file_stem())
                .with_extension(TOKEN_EXTENSION),
            Slot::Temporary => self.files.root().join(PENDING_FILE),
        }
    }

    /// Encrypt and atomically write a record
    pub fn save(&self, slot: Slot<'_>, record: &TokenRecord) -> Result<()> {
        self.files.write(&self.path_for(slot), RecordKind::Token, record)?;
        debug!("Saved token record for {}", describe(slot));
        Ok(())
    }

    /// Load a record. Absent or corrupt → `None`; a corrupt file is deleted.
    pub fn load(&self, slot: Slot<'_>) -> Result<Option<TokenRecord>> {
        let expected_owner = match slot {
            Slot::Identity(identity) => Some(identity),
            Slot::Temporary => None,
        };

        self.files
            .read(&self.path_for(slot), RecordKind::Token, |record: &TokenRecord| {
                if record.access_token.is_empty() {
                    return Err("empty access token".to_string());
                }
                match (expected_owner, &record.owner_identity) {
                    (Some(expected), Some(owner)) if expected != owner => Err(format!(
                        "record owned by '{}' found in slot for '{}'",
                        owner, expected
                    )),
                    _ => Ok(()),
                }
            })
    }

    /// Delete a record; absence is not an error
    pub fn delete(&self, slot: Slot<'_>) -> Result<()> {
        if self.files.remove(&self.path_for(slot))? {
            debug!("Deleted token record for {}", describe(slot));
        }
        Ok(())
    }

    /// Atomically move a record between slots. `Ok(false)` when `from` is empty.
    pub fn relocate(&self, from: Slot<'_>, to: Slot<'_>) -> Result<bool> {
        self.files.rename(&self.path_for(from), &self.path_for(to))
    }

    pub fn exists(&self, slot: Slot<'_>) -> bool {
        self.files.exists(&self.path_for(slot))
    }
}

fn describe(slot: Slot<'_>) -> String {
    match slot {
        Slot::Identity(identity) => format!("identity '{}'", identity),
        Slot::Temporary => "pending slot".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protect::{AeadProtector, MasterKey};
    use std::fs;
    use tempfile::TempDir;

    fn test_tokens(temp_dir: &TempDir, key: &MasterKey) -> TokenFileStore {
        let protector = Arc::new(AeadProtector::new(key.clone()));
        let files =
            ProtectedFileStore::new(temp_dir.path().to_path_buf(), protector, "shopdesk").unwrap();
        TokenFileStore::new(Arc::new(files))
    }

    fn identity(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    #[test]
    fn test_save_and_load_identity() {
        let temp_dir = TempDir::new().unwrap();
        let tokens = test_tokens(&temp_dir, &MasterKey::generate());
        let u1 = identity("u1");

        let record = TokenRecord::new("tokA", Some("refA"), Some(u1.clone()));
        tokens.save(Slot::Identity(&u1), &record).unwrap();

        let loaded = tokens.load(Slot::Identity(&u1)).unwrap().unwrap();
        assert_eq!(loaded.access_token, "tokA");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refA"));
        assert_eq!(loaded.owner_identity, Some(u1));
    }

    #[test]
    fn test_slots_are_independent() {
        let temp_dir = TempDir::new().unwrap();
        let tokens = test_tokens(&temp_dir, &MasterKey::generate());
        let (a, b) = (identity("alice"), identity("bob"));

        tokens.save(Slot::Identity(&a), &TokenRecord::new("tokA", None, None)).unwrap();
        tokens.save(Slot::Temporary, &TokenRecord::new("tokP", None, None)).unwrap();

        assert!(tokens.load(Slot::Identity(&b)).unwrap().is_none());
        assert_eq!(tokens.load(Slot::Identity(&a)).unwrap().unwrap().access_token, "tokA");
        assert_eq!(tokens.load(Slot::Temporary).unwrap().unwrap().access_token, "tokP");
    }

    #[test]
    fn test_reload_with_same_key() {
        let temp_dir = TempDir::new().unwrap();
        let key = MasterKey::generate();
        let u1 = identity("u1");

        test_tokens(&temp_dir, &key)
            .save(Slot::Identity(&u1), &TokenRecord::new("tokA", None, None))
            .unwrap();

        let reopened = test_tokens(&temp_dir, &key);
        assert_eq!(reopened.load(Slot::Identity(&u1)).unwrap().unwrap().access_token, "tokA");
    }

    #[test]
    fn test_flipped_byte_self_heals() {
        let temp_dir = TempDir::new().unwrap();
        let tokens = test_tokens(&temp_dir, &MasterKey::generate());
        let u1 = identity("u1");
        let path = tokens.path_for(Slot::Identity(&u1));

        let record = TokenRecord::new("tokA", Some("refA"), Some(u1.clone()));
        tokens.save(Slot::Identity(&u1), &record).unwrap();
        let pristine = fs::read(&path).unwrap();

        for i in [0, 1, pristine.len() / 2, pristine.len() - 1] {
            let mut tampered = pristine.clone();
            tampered[i] ^= 0xFF;
            fs::write(&path, &tampered).unwrap();

            assert!(tokens.load(Slot::Identity(&u1)).unwrap().is_none());
            assert!(!path.exists(), "corrupt file survived flip at byte {}", i);
        }
    }

    #[test]
    fn test_foreign_key_self_heals() {
        let temp_dir = TempDir::new().unwrap();
        let u1 = identity("u1");

        let writer = test_tokens(&temp_dir, &MasterKey::generate());
        writer.save(Slot::Identity(&u1), &TokenRecord::new("tokA", None, None)).unwrap();

        let other_account = test_tokens(&temp_dir, &MasterKey::generate());
        assert!(other_account.load(Slot::Identity(&u1)).unwrap().is_none());
        assert!(!other_account.exists(Slot::Identity(&u1)));
    }

    #[test]
    fn test_swapped_identity_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let tokens = test_tokens(&temp_dir, &MasterKey::generate());
        let (a, b) = (identity("alice"), identity("bob"));

        tokens
            .save(Slot::Identity(&a), &TokenRecord::new("tokA", None, Some(a.clone())))
            .unwrap();
        fs::copy(tokens.path_for(Slot::Identity(&a)), tokens.path_for(Slot::Identity(&b))).unwrap();

        assert!(tokens.load(Slot::Identity(&b)).unwrap().is_none());
        assert!(!tokens.exists(Slot::Identity(&b)));
        assert!(tokens.exists(Slot::Identity(&a)));
    }

    #[test]
    fn test_empty_access_token_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let tokens = test_tokens(&temp_dir, &MasterKey::generate());

        tokens.save(Slot::Temporary, &TokenRecord::new("", None, None)).unwrap();

        assert!(tokens.load(Slot::Temporary).unwrap().is_none());
        assert!(!tokens.exists(Slot::Temporary));
    }

    #[test]
    fn test_delete_is_best_effort() {
        let temp_dir = TempDir::new().unwrap();
        let tokens = test_tokens(&temp_dir, &MasterKey::generate());

        tokens.delete(Slot::Temporary).unwrap();

        tokens.save(Slot::Temporary, &TokenRecord::new("tokP", None, None)).unwrap();
        tokens.delete(Slot::Temporary).unwrap();
        assert!(!tokens.exists(Slot::Temporary));
    }

    #[test]
    fn test_relocate() {
        let temp_dir = TempDir::new().unwrap();
        let tokens = test_tokens(&temp_dir, &MasterKey::generate());
        let u1 = identity("u1");

        assert!(!tokens.relocate(Slot::Temporary, Slot::Identity(&u1)).unwrap());

        tokens.save(Slot::Temporary, &TokenRecord::new("tokP", None, None)).unwrap();
        assert!(tokens.relocate(Slot::Temporary, Slot::Identity(&u1)).unwrap());

        assert!(!tokens.exists(Slot::Temporary));
        assert_eq!(tokens.load(Slot::Identity(&u1)).unwrap().unwrap().access_token, "tokP");
    }
}
