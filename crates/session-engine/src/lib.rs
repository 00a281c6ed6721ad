//! Authentication session engine.
//!
//! Ties together the token store, the auth state machine, and the
//! backend REST client behind a single [`PersistenceCoordinator`] that
//! implements the session lifecycle: optimistic restore at startup,
//! server verification, login/logout, and reconciliation when another
//! process changes the shared token store.

pub mod api;
pub mod auth_fsm;
pub mod coordinator;
pub mod error;
pub mod watcher;

pub use api::{ApiClient, LoginData, RegisterRequest};
pub use auth_fsm::{AuthState, AuthStateCallback, AuthStateMachine};
pub use coordinator::{NavigationHook, PersistenceCoordinator, StorageEvent, LOGIN_ROUTE};
pub use error::{AuthError, AuthResult};
pub use watcher::{spawn_token_watcher, DEFAULT_POLL_INTERVAL};

// Storage types callers need alongside the engine.
pub use client_storage::{SessionFlagStore, TokenStore, UserProfile, UserRole};
