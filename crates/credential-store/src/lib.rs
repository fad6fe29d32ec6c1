//! # credential-store
//!
//! Session token storage for ShopDesk including:
//! - OS-account-scoped encryption (keychain-held AES-256-GCM key, key-file fallback)
//! - Per-identity "remember me" records with an unscoped pending slot
//! - Silent resume through the last-user pointer
//! - Self-healing loads: corrupt records are deleted, never surfaced

pub mod config;
pub mod error;
pub mod identity;
pub mod migration;
pub mod protect;
pub mod resolver;
pub mod session;
pub mod store;
pub mod types;
mod storage;

pub use config::{ProtectorKind, StoreConfig};
pub use error::{CredentialError, Result};
pub use identity::Identity;
pub use migration::{MigrationManager, MigrationOutcome};
pub use protect::{AeadProtector, DataProtector, KeyFileProtector, KeychainProtector, MasterKey};
pub use resolver::IdentityResolver;
pub use session::SessionTokenCache;
pub use storage::{BindingState, CredentialStorage, LoginOutcome, ResumeValidator, SaveOutcome};
pub use store::{Slot, TokenFileStore};
pub use types::{IdentityPointer, SessionState, TokenRecord};

#[cfg(feature = "insecure-plaintext")]
pub use protect::PlaintextProtector;
