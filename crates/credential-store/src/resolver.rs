//! Last-user pointer for silent resume across restarts
//!
//! Advisory only: it picks which identity file to try, it never proves
//! authentication. The pointer is sealed like token records.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::identity::Identity;
use crate::store::{ProtectedFileStore, RecordKind};
use crate::types::IdentityPointer;

const POINTER_FILE: &str = "last-identity.token";

/// Persists the last identity that completed a remember-me login
pub struct IdentityResolver {
    files: Arc<ProtectedFileStore>,
    pointer_path: PathBuf,
}

impl IdentityResolver {
    pub fn new(files: Arc<ProtectedFileStore>) -> Self {
        let pointer_path = files.root().join(POINTER_FILE);
        Self { files, pointer_path }
    }

    pub fn record_last_user(&self, identity: &Identity) -> Result<()> {
        let pointer = IdentityPointer::new(identity.clone());
        self.files
            .write(&self.pointer_path, RecordKind::IdentityPointer, &pointer)?;
        debug!("Recorded last user '{}'", identity);
        Ok(())
    }

    /// The last remembered identity. A corrupt pointer is deleted and reads as `None`.
    pub fn last_user(&self) -> Result<Option<Identity>> {
        let pointer: Option<IdentityPointer> =
            self.files
                .read(&self.pointer_path, RecordKind::IdentityPointer, |_| Ok(()))?;
        Ok(pointer.map(|p| p.identity))
    }

    /// Forget the last user. Called on explicit logout only.
    pub fn clear_last_user(&self) -> Result<()> {
        if self.files.remove(&self.pointer_path)? {
            info!("Cleared last-user pointer");
        }
        Ok(())
    }
}
