//! Startup and cross-context session reconciliation.
//!
//! The coordinator owns the protocol around the auth state machine: it
//! decides whether to trust cached credentials at startup, issues the
//! verification call, reconciles the result, and keeps this process
//! consistent when another process changes the shared token store.
//!
//! Every network result is applied through a synchronous applier
//! (`apply_verification`, `apply_login`) guarded by an invalidation
//! epoch, so a response that was in flight when a logout completed is
//! dropped instead of resurrecting the session.

use crate::api::{ApiClient, LoginData, RegisterRequest};
use crate::auth_fsm::{AuthState, AuthStateMachine};
use crate::error::{AuthError, AuthResult};
use client_storage::{SessionFlagStore, StorageKeys, TokenStore, UserProfile};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Route the navigation hook is sent to after a hard invalidation.
pub const LOGIN_ROUTE: &str = "/login";

/// Callback invoked when the coordinator forces navigation (e.g. to the
/// login view after a hard invalidation). Fired at most once per
/// invalidation.
pub type NavigationHook = Box<dyn Fn(&str) + Send + Sync>;

/// A change observed in the shared persistent store, typically caused
/// by another process. Handlers are side-effect-free beyond dispatching
/// state transitions, so tests drive them with synthetic events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Orchestrates token persistence, verification, and invalidation for
/// one process.
pub struct PersistenceCoordinator {
    api: ApiClient,
    tokens: TokenStore,
    flags: SessionFlagStore,
    state: Arc<AuthStateMachine>,
    /// Bumped on every invalidation; in-flight results from an older
    /// epoch are dropped on arrival.
    epoch: AtomicU64,
    /// Token from the most recent login in this process. Takes
    /// precedence over the persisted one when both exist.
    memory_token: Mutex<Option<String>>,
    navigation: Mutex<Option<NavigationHook>>,
}

impl PersistenceCoordinator {
    pub fn new(
        api: ApiClient,
        tokens: TokenStore,
        flags: SessionFlagStore,
        state: Arc<AuthStateMachine>,
    ) -> Self {
        Self {
            api,
            tokens,
            flags,
            state,
            epoch: AtomicU64::new(0),
            memory_token: Mutex::new(None),
            navigation: Mutex::new(None),
        }
    }

    /// Install the hook invoked on forced navigation.
    pub fn set_navigation_hook(&self, hook: NavigationHook) {
        let mut navigation = self.navigation.lock().unwrap_or_else(|p| p.into_inner());
        *navigation = Some(hook);
    }

    /// The auth state machine this coordinator drives.
    pub fn auth_state(&self) -> &Arc<AuthStateMachine> {
        &self.state
    }

    /// The token store this coordinator persists through.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Current state snapshot.
    pub fn state(&self) -> AuthState {
        self.state.state()
    }

    /// The token to authenticate requests with: the in-memory one from
    /// the latest login in this process, else the persisted one.
    pub fn effective_access_token(&self) -> Option<String> {
        let memory = self.memory_token.lock().unwrap_or_else(|p| p.into_inner());
        memory.clone().or_else(|| self.tokens.access_token())
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Startup protocol: optimistic restore, then verification.
    ///
    /// Runs at most once per process; a second call is a no-op. The
    /// verification outcome never produces an error here: transient
    /// failures deliberately leave the restored state intact, and a
    /// hard rejection resolves to `Anonymous` rather than failing.
    pub async fn bootstrap(&self) -> AuthState {
        if self.flags.is_initialized() {
            debug!("Bootstrap already ran in this process, skipping");
            return self.state();
        }
        self.flags.mark_initialized();

        self.restore_from_cache();

        if let Some(token) = self.effective_access_token() {
            let epoch = self.current_epoch();
            let result = self.api.me(&token).await;
            if let Err(e) = self.apply_verification(epoch, result) {
                debug!("Startup verification did not confirm session: {}", e);
            }
        }

        self.state()
    }

    /// Optimistic restore from cached credentials, without a network
    /// round trip. Returns true when any credentials were found.
    ///
    /// With both a token and a cached profile present the state goes
    /// straight to `Authenticated(cached)`, unverified and display-only,
    /// so there is no flash of logged-out UI while `/auth/me` is in
    /// flight. A token without a profile parks in `Authenticating`.
    pub(crate) fn restore_from_cache(&self) -> bool {
        if !self.tokens.has_valid_tokens() {
            debug!("No persisted tokens, starting anonymous");
            return false;
        }

        let _ = self.state.begin_authenticating();
        match self.tokens.cached_profile() {
            Some(profile) => {
                info!(user_id = %profile.id, "Optimistically restored session from cache");
                let _ = self.state.complete_authentication(profile);
                self.flags.set_session_active(true);
            }
            None => debug!("Token present but no cached profile, awaiting verification"),
        }
        true
    }

    /// Re-verify the current session against the backend.
    pub async fn verify(&self) -> AuthResult<UserProfile> {
        let token = self
            .effective_access_token()
            .ok_or(AuthError::NotLoggedIn)?;
        let epoch = self.current_epoch();
        let result = self.api.me(&token).await;
        self.apply_verification(epoch, result)
    }

    /// Reconcile a verification result captured at `epoch`.
    ///
    /// - Success: the server's profile overwrites the cached one and
    ///   re-affirms `Authenticated`.
    /// - Auth-rejected (401/403): hard invalidation. Tokens and cached
    ///   profile are cleared, the state drops to `Anonymous`, and the
    ///   navigation hook fires once. Never retried with the same token.
    /// - Transient (network/timeout/5xx): the optimistic state is left
    ///   intact. Availability over strict consistency.
    pub(crate) fn apply_verification(
        &self,
        epoch: u64,
        result: AuthResult<UserProfile>,
    ) -> AuthResult<UserProfile> {
        if epoch != self.current_epoch() {
            debug!("Dropping verification result from a superseded epoch");
            return Err(AuthError::Superseded);
        }

        match result {
            Ok(profile) => {
                self.tokens.set_cached_profile(&profile);
                self.confirm(profile.clone());
                self.flags.set_session_active(true);
                debug!(user_id = %profile.id, "Session verified");
                Ok(profile)
            }
            Err(e) if e.is_auth_rejected() => {
                warn!("Verification rejected, invalidating session: {}", e);
                self.drop_local_session();
                Err(e)
            }
            Err(e) if e.is_transient() => {
                debug!("Transient verification failure, keeping current state: {}", e);
                Err(e)
            }
            Err(e) => {
                warn!("Verification failed, keeping current state: {}", e);
                Err(e)
            }
        }
    }

    /// Exchange credentials for a session.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<UserProfile> {
        let _ = self.state.begin_authenticating();
        let epoch = self.current_epoch();
        let result = self.api.login(email, password).await;
        self.apply_login(epoch, result)
    }

    /// Reconcile a login result captured at `epoch`.
    ///
    /// A result from a superseded epoch is dropped without persisting
    /// anything: a logout that completed while the request was in
    /// flight must win.
    pub(crate) fn apply_login(
        &self,
        epoch: u64,
        result: AuthResult<LoginData>,
    ) -> AuthResult<UserProfile> {
        if epoch != self.current_epoch() {
            debug!("Dropping login result from a superseded epoch");
            return Err(AuthError::Superseded);
        }

        match result {
            Ok(data) => {
                {
                    let mut memory =
                        self.memory_token.lock().unwrap_or_else(|p| p.into_inner());
                    *memory = Some(data.access_token.clone());
                }
                self.tokens
                    .set_tokens(&data.access_token, data.refresh_token.as_deref());
                self.tokens.set_cached_profile(&data.user);
                self.confirm(data.user.clone());
                self.flags.set_session_active(true);
                info!(user_id = %data.user.id, "Logged in");
                Ok(data.user)
            }
            Err(e) => {
                // A failed attempt never persisted anything; just back
                // out of Authenticating if that is where we are.
                if self.state() == AuthState::Authenticating {
                    let _ = self.state.invalidate();
                }
                Err(e)
            }
        }
    }

    /// Create an account. Stateless; the caller logs in afterwards.
    pub async fn register(&self, request: &RegisterRequest) -> AuthResult<()> {
        self.api.register(request).await
    }

    /// End the session: local state first, then a fire-and-forget
    /// server-side revocation. Idempotent.
    pub async fn logout(&self) {
        let token = self.effective_access_token();
        self.drop_local_session();
        if let Some(token) = token {
            self.api.logout(&token).await;
        }
    }

    /// Tear down local session state.
    ///
    /// Bumps the epoch so in-flight results are dropped, then clears
    /// exactly once: the state machine's idempotent `invalidate` gates
    /// the token clear, so two concurrent invalidations perform one
    /// clear and the second is a silent no-op. Returns whether this
    /// call did the teardown.
    pub(crate) fn drop_local_session(&self) -> bool {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if !self.state.invalidate() {
            return false;
        }

        self.tokens.clear_tokens();
        self.tokens.clear_cached_profile();
        {
            let mut memory = self.memory_token.lock().unwrap_or_else(|p| p.into_inner());
            *memory = None;
        }
        self.flags.set_session_active(false);
        info!("Session cleared");
        self.navigate(LOGIN_ROUTE);
        true
    }

    /// React to a change in the shared store made by another process.
    ///
    /// Token removed elsewhere: drop to `Anonymous` immediately with no
    /// network call; the other process already cleared the store.
    /// Token appeared while `Anonymous`: optimistic restore from the
    /// cached profile using the observed token, again without a round
    /// trip.
    pub fn handle_storage_event(&self, event: &StorageEvent) {
        if event.key != StorageKeys::ACCESS_TOKEN {
            return;
        }

        match &event.new_value {
            None => {
                if self.state() == AuthState::Anonymous {
                    return;
                }
                info!("Access token removed by another process, dropping session");
                self.epoch.fetch_add(1, Ordering::SeqCst);
                if self.state.invalidate() {
                    {
                        let mut memory =
                            self.memory_token.lock().unwrap_or_else(|p| p.into_inner());
                        *memory = None;
                    }
                    self.flags.set_session_active(false);
                    self.navigate(LOGIN_ROUTE);
                }
            }
            Some(token) => {
                if self.state() != AuthState::Anonymous {
                    return;
                }
                info!("Access token appeared in shared store, adopting session");
                {
                    let mut memory =
                        self.memory_token.lock().unwrap_or_else(|p| p.into_inner());
                    *memory = Some(token.clone());
                }
                let _ = self.state.begin_authenticating();
                if let Some(profile) = self.tokens.cached_profile() {
                    let _ = self.state.complete_authentication(profile);
                    self.flags.set_session_active(true);
                }
            }
        }
    }

    /// React to the process regaining foreground visibility.
    ///
    /// Catches a token clear this process missed while backgrounded.
    /// Not a renewed verification: if the token is still present,
    /// nothing happens.
    pub fn handle_visibility_change(&self, visible: bool) {
        if !visible {
            return;
        }
        if self.state.is_authenticated() && !self.tokens.has_valid_tokens() {
            info!("Token disappeared while backgrounded, dropping session");
            self.drop_local_session();
        }
    }

    /// Move the machine to `Authenticated(profile)` from wherever the
    /// server confirmation found it.
    fn confirm(&self, profile: UserProfile) {
        match self.state() {
            AuthState::Authenticated(_) => {
                let _ = self.state.update_profile(profile);
            }
            AuthState::Authenticating => {
                let _ = self.state.complete_authentication(profile);
            }
            AuthState::Anonymous => {
                let _ = self.state.begin_authenticating();
                let _ = self.state.complete_authentication(profile);
            }
        }
    }

    fn navigate(&self, route: &str) {
        let navigation = self.navigation.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(hook) = navigation.as_ref() {
            hook(route);
        }
    }
}
