//! Polling watcher for cross-process token changes.
//!
//! Browsers deliver a storage event when another tab writes the shared
//! namespace; a native process gets no such signal for a shared file,
//! so this task polls the access-token key and synthesizes the same
//! [`StorageEvent`] the coordinator's handler expects.

use crate::coordinator::{PersistenceCoordinator, StorageEvent};
use client_storage::StorageKeys;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default poll cadence. Coarse on purpose: the watcher exists to
/// converge eventually, not to race the other process.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Spawn the token watcher. The task runs until aborted.
///
/// Changes this process makes through the coordinator are observed too,
/// but the event handler ignores a token appearing while already
/// authenticated and a removal while already anonymous, so self-writes
/// are no-ops.
pub fn spawn_token_watcher(
    coordinator: Arc<PersistenceCoordinator>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = coordinator.tokens().access_token();
        debug!(interval_ms = interval.as_millis() as u64, "Token watcher started");
        loop {
            tokio::time::sleep(interval).await;
            let current = coordinator.tokens().access_token();
            if current != last {
                debug!(
                    had_token = last.is_some(),
                    has_token = current.is_some(),
                    "Observed access token change in shared store"
                );
                coordinator.handle_storage_event(&StorageEvent {
                    key: StorageKeys::ACCESS_TOKEN.to_string(),
                    old_value: last.clone(),
                    new_value: current.clone(),
                });
                last = current;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::auth_fsm::{AuthState, AuthStateMachine};
    use client_storage::{
        KeyValueStore, MemoryStore, SessionFlagStore, TokenStore, UserProfile, UserRole,
    };
    use url::Url;

    fn coordinator() -> (Arc<PersistenceCoordinator>, Arc<MemoryStore>) {
        let backing = Arc::new(MemoryStore::new());
        let coordinator = PersistenceCoordinator::new(
            ApiClient::new(Url::parse("http://127.0.0.1:1/").unwrap()),
            TokenStore::new(backing.clone()),
            SessionFlagStore::new(),
            Arc::new(AuthStateMachine::new()),
        );
        (Arc::new(coordinator), backing)
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: "1".to_string(),
            name: "Ada".to_string(),
            email: "a@b.com".to_string(),
            role: UserRole::Sender,
        }
    }

    #[tokio::test]
    async fn test_watcher_observes_external_token_removal() {
        let (coordinator, backing) = coordinator();
        backing.set(StorageKeys::ACCESS_TOKEN, "tok1").unwrap();
        backing
            .set(
                StorageKeys::USER_DATA,
                &serde_json::to_string(&profile()).unwrap(),
            )
            .unwrap();
        coordinator.restore_from_cache();
        assert!(coordinator.state().is_authenticated());

        let handle = spawn_token_watcher(coordinator.clone(), Duration::from_millis(10));

        // Another process logs out.
        backing.delete(StorageKeys::ACCESS_TOKEN).unwrap();

        let mut dropped = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if coordinator.state() == AuthState::Anonymous {
                dropped = true;
                break;
            }
        }
        handle.abort();
        assert!(dropped, "watcher never observed the token removal");
    }

    #[tokio::test]
    async fn test_watcher_observes_external_token_appearance() {
        let (coordinator, backing) = coordinator();
        backing
            .set(
                StorageKeys::USER_DATA,
                &serde_json::to_string(&profile()).unwrap(),
            )
            .unwrap();
        assert_eq!(coordinator.state(), AuthState::Anonymous);

        let handle = spawn_token_watcher(coordinator.clone(), Duration::from_millis(10));

        // Another process logs in.
        backing.set(StorageKeys::ACCESS_TOKEN, "tok2").unwrap();

        let mut adopted = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if coordinator.state().is_authenticated() {
                adopted = true;
                break;
            }
        }
        handle.abort();
        assert!(adopted, "watcher never observed the token appearance");
    }
}
