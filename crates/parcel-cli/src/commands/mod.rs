//! CLI command implementations.

mod auth;
mod config;

pub use auth::{login, logout, register, status};
pub use config::config_show;

use anyhow::Result;
use client_core::{Config, Paths};
use client_storage::{FileStore, SessionFlagStore, TokenStore};
use session_engine::{ApiClient, AuthStateMachine, PersistenceCoordinator};
use std::sync::Arc;

/// Build a coordinator over the shared on-disk store.
///
/// Sessions started here are visible to every other `parcel` process
/// through the same store file.
pub fn build_coordinator(config: &Config) -> Result<PersistenceCoordinator> {
    let paths = Paths::new()?;
    paths.ensure_dirs()?;

    let storage = Arc::new(FileStore::new(paths.store_file()));
    let tokens = TokenStore::new(storage);
    let api = ApiClient::new(config.api_url()?);

    let coordinator = PersistenceCoordinator::new(
        api,
        tokens,
        SessionFlagStore::new(),
        Arc::new(AuthStateMachine::new()),
    );
    coordinator.set_navigation_hook(Box::new(|_route| {
        eprintln!("Session expired. Run 'parcel login' to sign in again.");
    }));
    Ok(coordinator)
}
