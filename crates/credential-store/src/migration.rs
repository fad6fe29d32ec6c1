//! Moves the pending token record to its identity once the identity is known

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::identity::Identity;
use crate::store::{Slot, TokenFileStore};

/// Result of a migration attempt. Failures are logged, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The pending record now belongs to the identity
    Migrated,
    /// No readable pending record existed
    NothingPending,
    /// An identity was already bound in this process
    Skipped,
    /// The record could not be moved; the session cache still holds the tokens
    Failed,
}

/// Relocates the pending record to an identity-scoped record
pub struct MigrationManager {
    tokens: Arc<TokenFileStore>,
}

impl MigrationManager {
    pub fn new(tokens: Arc<TokenFileStore>) -> Self {
        Self { tokens }
    }

    /// Called when the owner of the current session becomes known.
    ///
    /// The move is a single rename, so the pending and identity copies never
    /// coexist. The owner is stamped into the record afterwards.
    pub fn on_identity_established(
        &self,
        identity: &Identity,
        bound: Option<&Identity>,
    ) -> MigrationOutcome {
        if let Some(current) = bound {
            debug!("Skipping migration for '{}': '{}' already bound", identity, current);
            return MigrationOutcome::Skipped;
        }

        // Loading first discards a corrupt pending record instead of moving it.
        match self.tokens.load(Slot::Temporary) {
            Ok(Some(_)) => {}
            Ok(None) => return MigrationOutcome::NothingPending,
            Err(e) => {
                warn!("Could not read pending token record: {}", e);
                return MigrationOutcome::Failed;
            }
        }

        match self.tokens.relocate(Slot::Temporary, Slot::Identity(identity)) {
            Ok(true) => {}
            Ok(false) => return MigrationOutcome::NothingPending,
            Err(e) => {
                warn!("Failed to migrate pending token record to '{}': {}", identity, e);
                return MigrationOutcome::Failed;
            }
        }

        self.stamp_owner(identity);

        info!("Migrated pending token record to '{}'", identity);
        MigrationOutcome::Migrated
    }

    fn stamp_owner(&self, identity: &Identity) {
        let slot = Slot::Identity(identity);
        let stamped = self.tokens.load(slot).and_then(|record| match record {
            Some(mut record) if record.owner_identity.is_none() => {
                record.owner_identity = Some(identity.clone());
                self.tokens.save(slot, &record)
            }
            _ => Ok(()),
        });

        if let Err(e) = stamped {
            // The unstamped record is still valid for this slot.
            warn!("Failed to stamp owner on migrated record for '{}': {}", identity, e);
        }
    }
}
