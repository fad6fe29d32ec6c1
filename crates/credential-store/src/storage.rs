//! Credential storage facade
//!
//! Composes the session cache, token files, last-user pointer, and migration
//! into the single contract used by the API client and the login flow.
//!
//! Token lookup order:
//! 1. session cache (no I/O)
//! 2. bound identity's record
//! 3. last-user pointer → that identity's record (binds the identity)
//! 4. pending record
//! 5. `None` - not authenticated

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{CredentialError, Result};
use crate::identity::Identity;
use crate::migration::{MigrationManager, MigrationOutcome};
use crate::protect::DataProtector;
use crate::resolver::IdentityResolver;
use crate::session::SessionTokenCache;
use crate::store::{ProtectedFileStore, Slot, TokenFileStore};
use crate::types::{SessionState, TokenRecord};

/// Which identity, if any, owns this process's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingState {
    /// Only the session cache and the pending record are valid
    Unbound,
    /// The identity's record is the source of truth
    Bound(Identity),
    /// Explicit logout happened; no silent resume for the rest of the process
    LoggedOut,
}

impl BindingState {
    pub fn bound(&self) -> Option<&Identity> {
        match self {
            BindingState::Bound(identity) => Some(identity),
            _ => None,
        }
    }
}

/// What `save_token` managed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Held in memory only, by request
    SessionOnly,
    /// Held in memory and written to disk
    Persisted,
    /// Disk write failed; the session continues from memory
    PersistFailed,
}

/// A successful login as reported by the authentication service
#[derive(Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub identity: String,
    pub remember_me: bool,
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("access_token", &"[REDACTED]")
            .field("identity", &self.identity)
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// Gate for silently resuming a remembered session at startup.
///
/// Hosts typically plug in a refresh-and-validate call against the auth server.
pub trait ResumeValidator: Send + Sync {
    fn validate(&self, identity: &Identity, record: &TokenRecord) -> bool;
}

impl<F> ResumeValidator for F
where
    F: Fn(&Identity, &TokenRecord) -> bool + Send + Sync,
{
    fn validate(&self, identity: &Identity, record: &TokenRecord) -> bool {
        self(identity, record)
    }
}

#[derive(Debug, Clone, Copy)]
enum TokenField {
    Access,
    Refresh,
}

impl TokenField {
    fn of_session(self, session: &SessionState) -> Option<String> {
        match self {
            TokenField::Access => Some(session.access_token.clone()),
            TokenField::Refresh => session.refresh_token.clone(),
        }
    }

    fn of_record(self, record: &TokenRecord) -> Option<String> {
        match self {
            TokenField::Access => Some(record.access_token.clone()),
            TokenField::Refresh => record.refresh_token.clone(),
        }
    }
}

/// Per-process session context, owned by the facade
struct SessionContext {
    state: BindingState,
    /// Whether the live session is backed by a record on disk
    remembered: bool,
}

/// Credential storage facade
pub struct CredentialStorage {
    cache: SessionTokenCache,
    tokens: Arc<TokenFileStore>,
    resolver: IdentityResolver,
    migration: MigrationManager,
    context: Mutex<SessionContext>,
    backend_name: &'static str,
    os_bound: bool,
    resume_max_age: Option<chrono::Duration>,
    resume_validator: Option<Arc<dyn ResumeValidator>>,
}

impl CredentialStorage {
    /// Open the store described by `config`, constructing its protector
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let root = config.resolve_root()?;
        std::fs::create_dir_all(&root)?;

        let protector = config.build_protector(&root)?;
        let mut storage = Self::with_protector(root, protector, &config.application_id)?;
        storage.resume_max_age = config.resume_max_age();
        Ok(storage)
    }

    /// Create with an explicit root and protector (tests, custom platforms)
    pub fn with_protector(
        root: PathBuf,
        protector: Arc<dyn DataProtector>,
        application_id: &str,
    ) -> Result<Self> {
        let backend_name = protector.backend_name();
        let os_bound = protector.is_os_bound();
        let files = Arc::new(ProtectedFileStore::new(root, protector, application_id)?);
        let tokens = Arc::new(TokenFileStore::new(files.clone()));

        if os_bound {
            info!("Credential storage ready ({})", backend_name);
        } else {
            warn!("Credential storage ready ({}); key is not held by the OS", backend_name);
        }

        Ok(Self {
            cache: SessionTokenCache::new(),
            resolver: IdentityResolver::new(files),
            migration: MigrationManager::new(tokens.clone()),
            tokens,
            context: Mutex::new(SessionContext {
                state: BindingState::Unbound,
                remembered: false,
            }),
            backend_name,
            os_bound,
            resume_max_age: None,
            resume_validator: None,
        })
    }

    /// Refuse silent resume of records older than `max_age`
    pub fn with_resume_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.resume_max_age = Some(max_age);
        self
    }

    /// Require `validator` to accept a remembered record before resuming it
    pub fn with_resume_validator(mut self, validator: impl ResumeValidator + 'static) -> Self {
        self.resume_validator = Some(Arc::new(validator));
        self
    }

    /// Current access token, or `None` when not authenticated
    pub fn get_token(&self) -> Option<String> {
        self.resolve(TokenField::Access)
    }

    /// Current refresh token, or `None` when not authenticated or none was issued
    pub fn get_refresh_token(&self) -> Option<String> {
        self.resolve(TokenField::Refresh)
    }

    /// Store a token pair. Always updates the session; writes to disk when `persist`.
    ///
    /// A failed disk write degrades to a session-only login rather than an error.
    pub fn save_token(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        persist: bool,
    ) -> Result<SaveOutcome> {
        let mut ctx = self.context.lock();
        self.save_locked(&mut ctx, access_token, refresh_token, persist)
    }

    /// Explicit logout: clears the session, the identity and pending records,
    /// and the last-user pointer. Every step runs; the first failure is returned.
    pub fn remove_token(&self) -> Result<()> {
        let mut ctx = self.context.lock();

        self.cache.clear();

        let target = match ctx.state.bound() {
            Some(identity) => Some(identity.clone()),
            None => self.resolver.last_user().unwrap_or_else(|e| {
                warn!("Could not read last-user pointer during logout: {}", e);
                None
            }),
        };

        let mut first_error = None;
        if let Some(identity) = &target {
            keep_first(&mut first_error, self.tokens.delete(Slot::Identity(identity)));
        }
        keep_first(&mut first_error, self.tokens.delete(Slot::Temporary));
        keep_first(&mut first_error, self.resolver.clear_last_user());

        ctx.state = BindingState::LoggedOut;
        ctx.remembered = false;

        match first_error {
            Some(e) => {
                warn!("Logout completed with errors: {}", e);
                Err(e)
            }
            None => {
                info!("Logged out");
                Ok(())
            }
        }
    }

    /// Bind the identity that owns the current session.
    ///
    /// First bind wins; binding a different identity requires a logout first.
    pub fn bind_identity(&self, identity: &str) -> Result<()> {
        let identity = Identity::new(identity)?;
        let mut ctx = self.context.lock();
        self.bind_locked(&mut ctx, identity)
    }

    /// Record a successful login from the authentication service.
    ///
    /// Logging in as a different identity than the one bound switches the
    /// session without touching the previous identity's record or logging out.
    pub fn complete_login(&self, login: &LoginOutcome) -> Result<SaveOutcome> {
        let identity = Identity::new(&login.identity)?;
        if login.access_token.is_empty() {
            return Err(CredentialError::EmptyAccessToken);
        }

        let mut ctx = self.context.lock();

        if let Some(current) = ctx.state.bound() {
            if *current != identity {
                info!("Switching session from '{}' to '{}'", current, identity);
                self.cache.clear();
                ctx.state = BindingState::Unbound;
                ctx.remembered = false;
            }
        }

        // A pending record from an interrupted flow must not be migrated into this one.
        if let Err(e) = self.tokens.delete(Slot::Temporary) {
            warn!("Failed to discard stale pending token record: {}", e);
        }

        let outcome = self.save_locked(
            &mut ctx,
            &login.access_token,
            login.refresh_token.as_deref(),
            login.remember_me,
        )?;
        self.bind_locked(&mut ctx, identity)?;

        Ok(outcome)
    }

    pub fn binding_state(&self) -> BindingState {
        self.context.lock().state.clone()
    }

    pub fn bound_identity(&self) -> Option<Identity> {
        self.context.lock().state.bound().cloned()
    }

    /// Whether the live session is backed by a remembered record
    pub fn is_remembered(&self) -> bool {
        self.context.lock().remembered
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Whether the encryption key is held by an OS facility such as the keychain
    pub fn is_os_bound(&self) -> bool {
        self.os_bound
    }

    fn resolve(&self, field: TokenField) -> Option<String> {
        if let Some(value) = self.cache.with_session(|s| field.of_session(s)) {
            return value;
        }

        let mut ctx = self.context.lock();

        // Another caller may have filled the cache while we waited.
        if let Some(value) = self.cache.with_session(|s| field.of_session(s)) {
            return value;
        }

        let record = self.load_session_locked(&mut ctx)?;
        field.of_record(&record)
    }

    fn load_session_locked(&self, ctx: &mut SessionContext) -> Option<TokenRecord> {
        if let Some(identity) = ctx.state.bound().cloned() {
            if let Some(record) = self.load_or_warn(Slot::Identity(&identity)) {
                self.cache.populate_from(&record);
                ctx.remembered = true;
                return Some(record);
            }
        } else if ctx.state == BindingState::Unbound {
            if let Some((identity, record)) = self.try_resume() {
                info!("Resumed remembered session for '{}'", identity);
                self.cache.populate_from(&record);
                ctx.state = BindingState::Bound(identity);
                ctx.remembered = true;
                return Some(record);
            }
        }

        let record = self.load_or_warn(Slot::Temporary)?;
        debug!("Using pending token record");
        self.cache.populate_from(&record);
        ctx.remembered = true;
        Some(record)
    }

    fn try_resume(&self) -> Option<(Identity, TokenRecord)> {
        let identity = match self.resolver.last_user() {
            Ok(Some(identity)) => identity,
            Ok(None) => return None,
            Err(e) => {
                warn!("Could not read last-user pointer: {}", e);
                return None;
            }
        };

        let record = self.load_or_warn(Slot::Identity(&identity))?;

        if let Some(max_age) = self.resume_max_age {
            if record.age() > max_age {
                info!(
                    "Remembered session for '{}' is older than {}h, not resuming",
                    identity,
                    max_age.num_hours()
                );
                return None;
            }
        }

        if let Some(validator) = &self.resume_validator {
            if !validator.validate(&identity, &record) {
                info!("Remembered session for '{}' rejected by validator", identity);
                return None;
            }
        }

        Some((identity, record))
    }

    fn load_or_warn(&self, slot: Slot<'_>) -> Option<TokenRecord> {
        match self.tokens.load(slot) {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not load token record: {}", e);
                None
            }
        }
    }

    fn save_locked(
        &self,
        ctx: &mut SessionContext,
        access_token: &str,
        refresh_token: Option<&str>,
        persist: bool,
    ) -> Result<SaveOutcome> {
        if access_token.is_empty() {
            return Err(CredentialError::EmptyAccessToken);
        }

        self.cache.set(access_token, refresh_token);
        ctx.remembered = persist;

        if !persist {
            debug!("Stored session-only tokens");
            return Ok(SaveOutcome::SessionOnly);
        }

        let owner = ctx.state.bound().cloned();
        let record = TokenRecord::new(access_token, refresh_token, owner.clone());
        let slot = match &owner {
            Some(identity) => Slot::Identity(identity),
            None => Slot::Temporary,
        };

        if let Err(e) = self.tokens.save(slot, &record) {
            warn!("Failed to persist tokens, continuing for this session only: {}", e);
            ctx.remembered = false;
            return Ok(SaveOutcome::PersistFailed);
        }

        if let Some(identity) = &owner {
            if let Err(e) = self.resolver.record_last_user(identity) {
                warn!("Failed to record last user '{}': {}", identity, e);
            }
        }

        Ok(SaveOutcome::Persisted)
    }

    fn bind_locked(&self, ctx: &mut SessionContext, identity: Identity) -> Result<()> {
        if let Some(current) = ctx.state.bound() {
            if *current == identity {
                debug!("Identity '{}' already bound", identity);
                return Ok(());
            }
            return Err(CredentialError::IdentityAlreadyBound {
                bound: current.to_string(),
                requested: identity.to_string(),
            });
        }

        let outcome = self.migration.on_identity_established(&identity, None);
        if outcome == MigrationOutcome::Migrated {
            ctx.remembered = true;
            if let Err(e) = self.resolver.record_last_user(&identity) {
                warn!("Failed to record last user '{}': {}", identity, e);
            }
        }

        info!("Bound identity '{}' to this session", identity);
        ctx.state = BindingState::Bound(identity);
        Ok(())
    }
}

fn keep_first(first: &mut Option<CredentialError>, result: Result<()>) {
    if let Err(e) = result {
        if first.is_none() {
            *first = Some(e);
        } else {
            warn!("Additional logout failure: {}", e);
        }
    }
}
