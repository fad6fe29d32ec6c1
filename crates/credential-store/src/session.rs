//! In-memory session tokens for the lifetime of the process
//!
//! The fast path for every authenticated call: no I/O, one read lock.

use parking_lot::RwLock;

use crate::types::{SessionState, TokenRecord};

/// Access/refresh token holder, never persisted
#[derive(Default)]
pub struct SessionTokenCache {
    state: RwLock<Option<SessionState>>,
}

impl SessionTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both tokens in one write
    pub fn set(&self, access_token: &str, refresh_token: Option<&str>) {
        *self.state.write() = Some(SessionState::new(access_token, refresh_token));
    }

    /// Replace both tokens from a loaded record
    pub fn populate_from(&self, record: &TokenRecord) {
        *self.state.write() = Some(SessionState::from(record));
    }

    pub fn get(&self) -> Option<String> {
        self.state.read().as_ref().map(|s| s.access_token.clone())
    }

    pub fn get_refresh(&self) -> Option<String> {
        self.state.read().as_ref().and_then(|s| s.refresh_token.clone())
    }

    /// Run `f` against the current session, if any
    pub fn with_session<T>(&self, f: impl FnOnce(&SessionState) -> T) -> Option<T> {
        self.state.read().as_ref().map(f)
    }

    pub fn is_populated(&self) -> bool {
        self.state.read().is_some()
    }

    /// Drop both tokens (zeroed on drop)
    pub fn clear(&self) {
        self.state.write().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache() {
        let cache = SessionTokenCache::new();
        assert!(!cache.is_populated());
        assert_eq!(cache.get(), None);
        assert_eq!(cache.get_refresh(), None);
    }

    #[test]
    fn test_set_overwrites_both_fields() {
        let cache = SessionTokenCache::new();

        cache.set("tokA", Some("refA"));
        assert_eq!(cache.get().as_deref(), Some("tokA"));
        assert_eq!(cache.get_refresh().as_deref(), Some("refA"));

        cache.set("tokB", None);
        assert_eq!(cache.get().as_deref(), Some("tokB"));
        assert_eq!(cache.get_refresh(), None);
    }

    #[test]
    fn test_populate_and_clear() {
        let cache = SessionTokenCache::new();
        cache.populate_from(&TokenRecord::new("tokA", Some("refA"), None));
        assert!(cache.with_session(|s| s.refresh_token.is_some()).unwrap());

        cache.clear();
        assert!(!cache.is_populated());
        assert_eq!(cache.get(), None);
    }
}
