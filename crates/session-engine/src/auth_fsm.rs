//! Authentication state machine.
//!
//! An explicit finite state machine for the session lifecycle, with the
//! associated user profile held beside the machine rather than inside
//! it.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    Anonymous    │ (initial)
//! └────────┬────────┘
//!          │ BeginAuthenticating
//!          ▼
//! ┌─────────────────┐
//! │  Authenticating │ ◄─── credentials present, verification pending
//! └────────┬────────┘
//!          │ Confirmed                  Invalidated
//!          ▼                                │
//! ┌─────────────────┐ ── Confirmed ──┐     │
//! │  Authenticated  │ ◄──────────────┘     │
//! └────────┬────────┘   (re-affirmation)   │
//!          │ Invalidated                   │
//!          ▼                               ▼
//!      Anonymous ◄─────────────────── Anonymous
//! ```
//!
//! All transitions are synchronous and side-effect-free apart from
//! subscriber notification; persistence belongs to the coordinator.

use crate::{AuthError, AuthResult};
use client_storage::UserProfile;
use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Anonymous)

    Anonymous => {
        BeginAuthenticating => Authenticating
    },
    Authenticating => {
        Confirmed => Authenticated,
        Invalidated => Anonymous
    },
    Authenticated => {
        Confirmed => Authenticated,
        Invalidated => Anonymous
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Public authentication state, with the profile attached when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No session.
    Anonymous,
    /// Credentials exist but have not been confirmed yet.
    Authenticating,
    /// Session active for this user.
    Authenticated(UserProfile),
}

impl AuthState {
    /// Returns true if the user has an active session.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    /// The profile attached to an authenticated state.
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            AuthState::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    /// Short label for status output and logs.
    pub fn label(&self) -> &'static str {
        match self {
            AuthState::Anonymous => "anonymous",
            AuthState::Authenticating => "authenticating",
            AuthState::Authenticated(_) => "authenticated",
        }
    }
}

/// Callback type for auth state change notifications.
pub type AuthStateCallback = Box<dyn Fn(AuthState) + Send + Sync>;

struct Inner {
    machine: SessionMachine,
    profile: Option<UserProfile>,
}

/// Shared, observable authentication state for one process.
///
/// Constructed once at startup and threaded through by reference; the
/// coordinator owns all transitions besides explicit login/logout.
pub struct AuthStateMachine {
    inner: Mutex<Inner>,
    callback: Mutex<Option<AuthStateCallback>>,
}

impl Default for AuthStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateMachine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                machine: SessionMachine::new(),
                profile: None,
            }),
            callback: Mutex::new(None),
        }
    }

    /// Set a callback to be notified of every state change.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        let mut cb = self.callback.lock().unwrap_or_else(|p| p.into_inner());
        *cb = Some(callback);
    }

    /// Current state snapshot.
    pub fn state(&self) -> AuthState {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        Self::snapshot(&inner)
    }

    /// Returns true if an active session exists right now.
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Anonymous → Authenticating: credentials were found or a login
    /// attempt started.
    pub fn begin_authenticating(&self) -> AuthResult<()> {
        let state = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            self.consume(&mut inner, &SessionMachineInput::BeginAuthenticating)?;
            Self::snapshot(&inner)
        };
        self.notify(state);
        Ok(())
    }

    /// Authenticating/Authenticated → Authenticated with this profile.
    ///
    /// Confirming from `Anonymous` (setting a user without so much as a
    /// pending token read) is a programming error and is rejected.
    pub fn complete_authentication(&self, user: UserProfile) -> AuthResult<()> {
        let state = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            self.consume(&mut inner, &SessionMachineInput::Confirmed)?;
            inner.profile = Some(user);
            Self::snapshot(&inner)
        };
        self.notify(state);
        Ok(())
    }

    /// Replace the profile of an active session. Only legal from
    /// `Authenticated`.
    pub fn update_profile(&self, user: UserProfile) -> AuthResult<()> {
        let state = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            if *inner.machine.state() != SessionMachineState::Authenticated {
                return Err(AuthError::InvalidStateTransition(format!(
                    "Cannot update profile in state {:?}",
                    inner.machine.state()
                )));
            }
            inner.profile = Some(user);
            Self::snapshot(&inner)
        };
        self.notify(state);
        Ok(())
    }

    /// Drop to `Anonymous`, clearing the attached profile.
    ///
    /// Idempotent: invalidating while already anonymous is a no-op and
    /// returns `false`. The return value tells the caller whether this
    /// call performed the transition, so follow-up work (clearing
    /// stores, redirects) runs exactly once.
    pub fn invalidate(&self) -> bool {
        let state = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            if *inner.machine.state() == SessionMachineState::Anonymous {
                return false;
            }
            if self
                .consume(&mut inner, &SessionMachineInput::Invalidated)
                .is_err()
            {
                return false;
            }
            inner.profile = None;
            Self::snapshot(&inner)
        };
        self.notify(state);
        true
    }

    fn consume(&self, inner: &mut Inner, input: &SessionMachineInput) -> AuthResult<()> {
        let old_state = inner.machine.state().clone();
        inner.machine.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                inner.machine.state()
            ))
        })?;
        debug!(
            old_state = ?old_state,
            new_state = ?inner.machine.state(),
            "Auth state transition"
        );
        Ok(())
    }

    fn snapshot(inner: &Inner) -> AuthState {
        match inner.machine.state() {
            SessionMachineState::Anonymous => AuthState::Anonymous,
            SessionMachineState::Authenticating => AuthState::Authenticating,
            SessionMachineState::Authenticated => match &inner.profile {
                Some(profile) => AuthState::Authenticated(profile.clone()),
                // Confirmed is always accompanied by a profile write.
                None => AuthState::Authenticating,
            },
        }
    }

    // A panicking subscriber poisons the callback mutex; recover so
    // later transitions keep working and notifying.
    fn notify(&self, state: AuthState) {
        let cb = self.callback.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(callback) = cb.as_ref() {
            callback(state);
        }
    }
}
