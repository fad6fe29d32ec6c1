//! Remember-me login, restart, silent resume, and logout.
//!
//! Uses the key-file protector in a temporary root so it runs on machines
//! without a keychain. The store is blocking; async hosts call it through
//! `spawn_blocking`.
//!
//! ```text
//! RUST_LOG=credential_store=debug cargo run -p credential-store --example session_resume
//! ```

use std::sync::Arc;
use tracing::info;

use credential_store::{CredentialStorage, LoginOutcome, ProtectorKind, StoreConfig};

fn open(config: &StoreConfig) -> anyhow::Result<Arc<CredentialStorage>> {
    Ok(Arc::new(CredentialStorage::open(config)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let root = tempfile::TempDir::new()?;
    let config = StoreConfig {
        protector: ProtectorKind::KeyFile,
        ..StoreConfig::with_root(root.path())
    };

    // First run: the auth service reports a remember-me login.
    let storage = open(&config)?;
    info!("Using {}", storage.backend_name());

    let login = LoginOutcome {
        access_token: "tokA".to_string(),
        refresh_token: Some("refA".to_string()),
        identity: "u1".to_string(),
        remember_me: true,
    };
    let outcome = {
        let storage = storage.clone();
        tokio::task::spawn_blocking(move || storage.complete_login(&login)).await??
    };
    info!("Login stored: {:?}", outcome);
    drop(storage);

    // Second run: nothing bound, the last-user pointer resumes u1.
    let storage = open(&config)?;
    let token = {
        let storage = storage.clone();
        tokio::task::spawn_blocking(move || storage.get_token()).await?
    };
    info!(
        "After restart: authenticated={} identity={:?}",
        token.is_some(),
        storage.bound_identity().map(|i| i.to_string())
    );

    // Explicit logout.
    {
        let storage = storage.clone();
        tokio::task::spawn_blocking(move || storage.remove_token()).await??;
    }
    drop(storage);

    let storage = open(&config)?;
    info!("After logout and restart: authenticated={}", storage.is_authenticated());

    Ok(())
}
