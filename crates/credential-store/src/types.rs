//! Token and pointer records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::identity::Identity;

/// Persisted token record - one per identity, plus the pending slot
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Bearer access token (never empty once persisted)
    pub access_token: String,

    /// Refresh token, when the auth server issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When this record was written
    #[zeroize(skip)]
    pub saved_at: DateTime<Utc>,

    /// Identity that owns this record (absent while pending)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[zeroize(skip)]
    pub owner_identity: Option<Identity>,
}

impl TokenRecord {
    pub fn new(access_token: &str, refresh_token: Option<&str>, owner: Option<Identity>) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            saved_at: Utc::now(),
            owner_identity: owner,
        }
    }

    /// Age of the record relative to now
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.saved_at)
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("saved_at", &self.saved_at)
            .field("owner_identity", &self.owner_identity)
            .finish()
    }
}

/// In-memory session tokens - never serialized, zeroed when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionState {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl SessionState {
    pub fn new(access_token: &str, refresh_token: Option<&str>) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
        }
    }
}

impl From<&TokenRecord> for SessionState {
    fn from(record: &TokenRecord) -> Self {
        Self {
            access_token: record.access_token.clone(),
            refresh_token: record.refresh_token.clone(),
        }
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Last identity that completed a remember-me login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPointer {
    pub identity: Identity,
    pub recorded_at: DateTime<Utc>,
}

impl IdentityPointer {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            recorded_at: Utc::now(),
        }
    }
}
