//! Encrypted record files
//!
//! `ProtectedFileStore` owns the storage root, the protector, and the I/O lock.
//! `TokenFileStore` maps identities and the pending slot onto it.

mod protected_file;
mod token_file;

pub use protected_file::{ProtectedFileStore, RecordKind};
pub use token_file::{Slot, TokenFileStore};
