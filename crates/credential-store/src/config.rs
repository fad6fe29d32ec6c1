//! Credential store configuration
//!
//! Plain JSON, safe to embed in the host application's settings file.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{CredentialError, Result};
use crate::protect::{DataProtector, KeyFileProtector, KeychainProtector};

/// Default application id; also the first part of the encryption entropy
pub const DEFAULT_APPLICATION_ID: &str = "shopdesk";

/// Which encryption backend protects token files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ProtectorKind {
    /// Key held by the OS keychain
    #[default]
    Keychain,
    /// Key held in an owner-only file in the storage root
    KeyFile,
    /// No encryption (development builds with `insecure-plaintext` only)
    #[cfg(feature = "insecure-plaintext")]
    Plaintext,
}

/// Credential store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Application id; separates stores of different apps on one account
    pub application_id: String,
    /// Storage root (defaults to the platform data directory)
    pub storage_root: Option<PathBuf>,
    /// Encryption backend
    pub protector: ProtectorKind,
    /// Oldest remembered record that may be resumed silently (None = no limit)
    pub resume_max_age_hours: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            application_id: DEFAULT_APPLICATION_ID.to_string(),
            storage_root: None,
            protector: ProtectorKind::default(),
            resume_max_age_hours: None,
        }
    }
}

impl StoreConfig {
    /// Config rooted at a fixed directory (tests, portable installs)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No credential store config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        debug!("Loaded credential store config from {:?}", path);
        Ok(config)
    }

    /// Resolve the storage root directory
    pub fn resolve_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.storage_root {
            return Ok(root.clone());
        }

        ProjectDirs::from("com", "shopdesk", &self.application_id)
            .map(|dirs| dirs.data_dir().join("credentials"))
            .ok_or_else(|| CredentialError::Storage("Could not determine data directory".to_string()))
    }

    /// Keychain service name for this application
    pub fn keychain_service(&self) -> String {
        format!("{}-credential-store", self.application_id)
    }

    /// Resume age limit; a value beyond what a duration can hold means no limit
    pub fn resume_max_age(&self) -> Option<chrono::Duration> {
        let hours = self.resume_max_age_hours?;
        let max_age = i64::try_from(hours).ok().and_then(chrono::Duration::try_hours);
        if max_age.is_none() {
            warn!("resumeMaxAgeHours {} is out of range, resuming without an age limit", hours);
        }
        max_age
    }

    /// Construct the configured protector
    pub fn build_protector(&self, root: &Path) -> Result<Arc<dyn DataProtector>> {
        let protector: Arc<dyn DataProtector> = match self.protector {
            ProtectorKind::Keychain => Arc::new(KeychainProtector::open(&self.keychain_service())?),
            ProtectorKind::KeyFile => Arc::new(KeyFileProtector::open(root)?),
            #[cfg(feature = "insecure-plaintext")]
            ProtectorKind::Plaintext => Arc::new(crate::protect::PlaintextProtector::new()),
        };
        Ok(protector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.application_id, "shopdesk");
        assert_eq!(config.protector, ProtectorKind::Keychain);
        assert_eq!(config.keychain_service(), "shopdesk-credential-store");
        assert!(config.resume_max_age().is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::load(&temp_dir.path().join("missing.json")).unwrap();
        assert_eq!(config.application_id, DEFAULT_APPLICATION_ID);
    }

    #[test]
    fn test_load_partial_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{ "applicationId": "shopdesk-agent", "protector": "keyFile", "resumeMaxAgeHours": 72 }"#,
        )
        .unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.application_id, "shopdesk-agent");
        assert_eq!(config.protector, ProtectorKind::KeyFile);
        assert_eq!(config.resume_max_age(), Some(chrono::Duration::hours(72)));
        assert!(config.storage_root.is_none());
    }

    #[test]
    fn test_out_of_range_resume_age_means_no_limit() {
        for hours in [u64::MAX, u64::MAX / 2, i64::MAX as u64] {
            let config = StoreConfig {
                resume_max_age_hours: Some(hours),
                ..StoreConfig::default()
            };
            assert_eq!(config.resume_max_age(), None);
        }

        let config = StoreConfig {
            resume_max_age_hours: Some(24 * 365 * 100),
            ..StoreConfig::default()
        };
        assert_eq!(config.resume_max_age(), Some(chrono::Duration::hours(24 * 365 * 100)));
    }

    #[test]
    fn test_out_of_range_resume_age_opens_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        std::fs::write(
            &path,
            format!(r#"{{ "protector": "keyFile", "resumeMaxAgeHours": {} }}"#, u64::MAX / 2),
        )
        .unwrap();

        let config = StoreConfig {
            storage_root: Some(temp_dir.path().join("store")),
            ..StoreConfig::load(&path).unwrap()
        };
        let storage = crate::CredentialStorage::open(&config).unwrap();
        assert_eq!(storage.get_token(), None);
    }

    #[test]
    fn test_explicit_root() {
        let config = StoreConfig::with_root("/tmp/shopdesk-creds");
        assert_eq!(config.resolve_root().unwrap(), PathBuf::from("/tmp/shopdesk-creds"));
    }

    #[test]
    fn test_build_key_file_protector() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            protector: ProtectorKind::KeyFile,
            ..StoreConfig::with_root(temp_dir.path())
        };

        let protector = config.build_protector(temp_dir.path()).unwrap();
        assert_eq!(protector.backend_name(), "Key File");
    }
}
