//! Protected record files with atomic writes and self-healing reads
//!
//! Every record is JSON, sealed by the configured [`DataProtector`] with the
//! application entropy and the record kind as authenticated data. Reads that
//! fail to open or parse delete the file and report "no data".

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{CredentialError, Result};
use crate::protect::DataProtector;

/// What a protected file holds; bound into the authenticated data so a file
/// of one kind never opens as another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Token,
    IdentityPointer,
}

impl RecordKind {
    fn label(self) -> &'static [u8] {
        match self {
            RecordKind::Token => b"token",
            RecordKind::IdentityPointer => b"identity-pointer",
        }
    }
}

/// Shared storage root, protector, and I/O serialization
pub struct ProtectedFileStore {
    root: PathBuf,
    protector: Arc<dyn DataProtector>,
    entropy: Vec<u8>,
    io_lock: Mutex<()>,
}

impl ProtectedFileStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new(root: PathBuf, protector: Arc<dyn DataProtector>, application_id: &str) -> Result<Self> {
        fs::create_dir_all(&root)?;

        debug!(
            "Protected file store at {:?} using {}",
            root,
            protector.backend_name()
        );

        Ok(Self {
            root,
            protector,
            entropy: format!("{}/credential-store/v1", application_id).into_bytes(),
            io_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn aad(&self, kind: RecordKind) -> Vec<u8> {
        let mut aad = self.entropy.clone();
        aad.push(b'#');
        aad.extend_from_slice(kind.label());
        aad
    }

    /// Seal and atomically write a record
    pub fn write<T: Serialize>(&self, path: &Path, kind: RecordKind, value: &T) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(value)?);
        let sealed = self
            .protector
            .protect(&plaintext, &self.aad(kind))
            .map_err(|e| match e {
                CredentialError::Io(_) | CredentialError::Encryption(_) => e,
                other => CredentialError::Encryption(other.to_string()),
            })?;

        let _guard = self.io_lock.lock();
        write_atomic(path, &sealed)?;

        debug!("Wrote {:?} record to {:?}", kind, path);
        Ok(())
    }

    /// Read and open a record.
    ///
    /// Absent → `Ok(None)`. Undecryptable or unparsable → file deleted, `Ok(None)`.
    /// `validate` may reject a parsed record, which is handled as corruption.
    pub fn read<T, F>(&self, path: &Path, kind: RecordKind, validate: F) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        F: FnOnce(&T) -> std::result::Result<(), String>,
    {
        let _guard = self.io_lock.lock();

        let sealed = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let opened = self
            .protector
            .unprotect(&sealed, &self.aad(kind))
            .map(Zeroizing::new)
            .map_err(|e| e.to_string())
            .and_then(|plaintext| {
                serde_json::from_slice::<T>(&plaintext).map_err(|e| format!("invalid record: {}", e))
            })
            .and_then(|value| validate(&value).map(|()| value));

        match opened {
            Ok(value) => Ok(Some(value)),
            Err(reason) => {
                debug!("Discarding unreadable {:?} record {:?}: {}", kind, path, reason);
                remove_if_exists(path)?;
                Ok(None)
            }
        }
    }

    /// Delete a record; absence is not an error
    pub fn remove(&self, path: &Path) -> Result<bool> {
        let _guard = self.io_lock.lock();
        let removed = remove_if_exists(path)?;
        if removed {
            debug!("Removed {:?}", path);
        }
        Ok(removed)
    }

    /// Atomically move a record. `Ok(false)` when `from` is absent.
    pub fn rename(&self, from: &Path, to: &Path) -> Result<bool> {
        let _guard = self.io_lock.lock();

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::rename(from, to) {
            Ok(()) => {
                debug!("Moved {:?} to {:?}", from, to);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, path: &Path) -> bool {
        let _guard = self.io_lock.lock();
        path.exists()
    }
}

/// Write via a uniquely named temp file in the same directory, then rename.
/// A reader sees either the old file or the new one, never a partial write.
///
/// The temp name does not embed the target name, so it stays short for any
/// target that itself fits the platform limit.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| CredentialError::Storage(format!("{:?} has no parent directory", path)))?;
    fs::create_dir_all(parent)?;

    let temp_path = temp_path_in(parent);

    let result = (|| -> std::io::Result<()> {
        let mut file = create_owner_only(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            if cleanup.kind() != ErrorKind::NotFound {
                warn!("Failed to remove temp file {:?}: {}", temp_path, cleanup);
            }
        }
        return Err(e.into());
    }

    Ok(())
}

fn temp_path_in(dir: &Path) -> PathBuf {
    dir.join(format!(".{}.tmp", Uuid::new_v4().simple()))
}

#[cfg(unix)]
fn create_owner_only(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_owner_only(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path)
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
