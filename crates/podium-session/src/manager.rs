//! The auth manager: owns the session and keeps storage in step with it.
//!
//! # Concurrency note
//!
//! State sits behind a plain `std::sync::Mutex`. It is only ever held for
//! short synchronous sections and never across an `.await`; network calls
//! happen outside the lock and their results are applied afterwards. Every
//! change is mirrored into a `watch` channel so readers never lock at all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use podium_api::{ApiClient, ApiError};
use podium_protocol::{
    require, validate_email, validate_password, ConfirmRequest, GameStats,
    LoginRequest, MessageResponse, ProfileResponse, RegisterRequest,
    RegisterResponse, User,
};
use podium_transport::HttpTransport;
use tokio::sync::watch;

use crate::store::{TOKEN_KEY, USER_KEY};
use crate::{
    AuthSnapshot, BearerToken, CredentialStore, RestoreOutcome, Session,
    SessionError, StorageError,
};

/// Client-side auth state, constructed explicitly and shared by handle.
///
/// ## Lifecycle
///
/// ```text
///              restore() ──(stored creds)──→ [Verifying] ──ok──→ [Signed in]
///                  │                              │
///                  └─(nothing stored)─┐           └──401──┐
///                                     ▼                   ▼
/// login() ──ok──→ [Signed in] ──logout()──→ [Signed out] ◀┘
/// ```
///
/// Cloning yields another handle to the same state.
pub struct AuthManager<T, S> {
    shared: Arc<Shared<T, S>>,
}

struct Shared<T, S> {
    api: ApiClient<T>,
    store: S,
    state: Mutex<AuthState>,
    tx: watch::Sender<AuthSnapshot>,
    restored: AtomicBool,
}

#[derive(Default)]
struct AuthState {
    session: Option<Session>,
    game_stats: Option<GameStats>,
    // Number of login/verify operations in flight.
    pending: usize,
}

impl AuthState {
    fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            session: self.session.clone(),
            game_stats: self.game_stats.clone(),
            is_loading: self.pending > 0,
        }
    }

    fn holds(&self, token: &BearerToken) -> bool {
        self.session.as_ref().is_some_and(|s| &s.token == token)
    }

    fn clear(&mut self) {
        self.session = None;
        self.game_stats = None;
    }
}

impl<T, S> Clone for AuthManager<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: HttpTransport, S: CredentialStore> AuthManager<T, S> {
    /// Creates a signed-out manager. Call [`restore`](Self::restore) to
    /// pick up credentials from a previous run.
    pub fn new(api: ApiClient<T>, store: S) -> Self {
        let (tx, _) = watch::channel(AuthSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                api,
                store,
                state: Mutex::new(AuthState::default()),
                tx,
                restored: AtomicBool::new(false),
            }),
        }
    }

    // -- reads --------------------------------------------------------------

    pub fn snapshot(&self) -> AuthSnapshot {
        self.shared.tx.borrow().clone()
    }

    /// A receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.shared.tx.subscribe()
    }

    /// The current bearer token, if signed in.
    pub fn token(&self) -> Option<BearerToken> {
        self.lock().session.as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.lock().session.as_ref().map(|s| s.user.clone())
    }

    pub fn game_stats(&self) -> Option<GameStats> {
        self.lock().game_stats.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().session.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().pending > 0
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.shared.api
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    // -- restore ------------------------------------------------------------

    /// Picks up credentials persisted by an earlier run.
    ///
    /// Only reads storage synchronously. When both a token and a parsable
    /// user are stored, the session is installed right away and verified
    /// against the server in a background task; a rejection clears
    /// everything. A half-present or unreadable pair is wiped.
    ///
    /// Runs once per manager. Must be called from within a tokio runtime.
    pub fn restore(&self) -> RestoreOutcome {
        if self.shared.restored.swap(true, Ordering::SeqCst) {
            tracing::debug!("restore already ran, ignoring");
            return RestoreOutcome::AlreadyRestored;
        }

        let stored = self.read_stored();
        let (token, user) = match stored {
            Ok((None, None)) => return RestoreOutcome::Empty,
            Ok((Some(token), Some(user))) => match serde_json::from_str::<User>(&user) {
                Ok(user) => (BearerToken::from(token), user),
                Err(e) => {
                    tracing::warn!(error = %e, "stored user is unreadable, clearing credentials");
                    self.clear_storage();
                    return RestoreOutcome::Empty;
                }
            },
            Ok(_) => {
                tracing::warn!("stored credentials are incomplete, clearing");
                self.clear_storage();
                return RestoreOutcome::Empty;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored credentials, clearing");
                self.clear_storage();
                return RestoreOutcome::Empty;
            }
        };

        tracing::info!(username = %user.username, "restoring stored session");
        self.update(|state| {
            state.session = Some(Session {
                user,
                token: token.clone(),
            });
            state.pending += 1;
        });

        let manager = self.clone();
        RestoreOutcome::Verifying(tokio::spawn(async move {
            let _loading = Loading::adopt(&manager);
            manager.verify(token).await;
        }))
    }

    fn read_stored(&self) -> Result<(Option<String>, Option<String>), StorageError> {
        let nonblank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let token = nonblank(self.shared.store.get(TOKEN_KEY)?);
        let user = nonblank(self.shared.store.get(USER_KEY)?);
        Ok((token, user))
    }

    async fn verify(&self, token: BearerToken) {
        let api = &self.shared.api;
        let result = match api.verify_token(token.as_str()).await {
            Ok(_) => api.get_profile(token.as_str()).await,
            Err(e) => Err(e),
        };
        self.apply_profile(&token, result, "verification");
    }

    // -- login / logout -----------------------------------------------------

    /// Signs in and persists the session.
    ///
    /// On any failure after validation, all auth state and storage is
    /// cleared and the error is returned with the server's message intact.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let email = require("email", email)?.trim();
        let password = require("password", password)?;

        let result = {
            let _loading = Loading::begin(self);
            self.sign_in(email, password).await
        };

        match result {
            Ok(user) => {
                tracing::info!(username = %user.username, "signed in");
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-in failed, clearing session");
                self.clear();
                Err(e)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let api = &self.shared.api;
        let login = api
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        let token = BearerToken::from(login.tokens.id_token);
        let ProfileResponse { user, game_stats } = api.get_profile(token.as_str()).await?;

        self.persist(&token, &user)?;
        self.update(|state| {
            state.session = Some(Session {
                user: user.clone(),
                token,
            });
            state.game_stats = Some(game_stats);
        });
        Ok(user)
    }

    /// Clears memory and storage. Safe to call in any state, any number
    /// of times.
    pub fn logout(&self) {
        let was_signed_in = self.is_authenticated();
        self.clear();
        if was_signed_in {
            tracing::info!("signed out");
        }
    }

    // -- account ------------------------------------------------------------

    /// Creates an account. Does not sign in; the address must be
    /// confirmed first.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<RegisterResponse, SessionError> {
        let email = validate_email(email)?;
        let username = require("username", username)?.trim();
        let password = validate_password(password)?;

        let resp = self
            .shared
            .api
            .register(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                username: username.to_string(),
            })
            .await?;
        tracing::info!(%username, "account registered, awaiting confirmation");
        Ok(resp)
    }

    /// Submits the emailed confirmation code. No local state changes.
    pub async fn confirm_email(
        &self,
        email: &str,
        code: &str,
    ) -> Result<MessageResponse, SessionError> {
        let email = require("email", email)?.trim();
        let code = require("confirmation code", code)?.trim();
        let resp = self
            .shared
            .api
            .confirm_email(&ConfirmRequest {
                email: email.to_string(),
                confirmation_code: code.to_string(),
            })
            .await?;
        Ok(resp)
    }

    /// Re-fetches the profile for the current session.
    ///
    /// Does nothing when signed out. A failure signs the player out; it is
    /// logged, not returned.
    pub async fn refresh_profile(&self) {
        let Some(token) = self.token() else {
            return;
        };
        let result = self.shared.api.get_profile(token.as_str()).await;
        self.apply_profile(&token, result, "profile refresh");
    }

    // -- internals ----------------------------------------------------------

    /// Applies a profile fetched for `token`, unless the session moved on
    /// while the request was in flight.
    fn apply_profile(
        &self,
        token: &BearerToken,
        result: Result<ProfileResponse, ApiError>,
        what: &'static str,
    ) {
        let mut state = self.lock();
        if !state.holds(token) {
            tracing::debug!(what, "session changed mid-flight, dropping result");
            return;
        }
        match result {
            Ok(ProfileResponse { user, game_stats }) => {
                if let Err(e) = self.persist_user(&user) {
                    tracing::warn!(error = %e, "could not persist refreshed user");
                }
                if let Some(session) = state.session.as_mut() {
                    session.user = user;
                }
                state.game_stats = Some(game_stats);
                tracing::debug!(what, "session confirmed");
            }
            Err(e) => {
                tracing::warn!(what, error = %e, "session rejected, signing out");
                state.clear();
                self.clear_storage();
            }
        }
        self.shared.tx.send_replace(state.snapshot());
    }

    fn persist(&self, token: &BearerToken, user: &User) -> Result<(), StorageError> {
        self.shared.store.set(TOKEN_KEY, token.as_str())?;
        self.persist_user(user)
    }

    fn persist_user(&self, user: &User) -> Result<(), StorageError> {
        let json = serde_json::to_string(user)?;
        self.shared.store.set(USER_KEY, &json)
    }

    fn clear(&self) {
        self.update(AuthState::clear);
        self.clear_storage();
    }

    fn clear_storage(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.shared.store.remove(key) {
                tracing::warn!(key, error = %e, "could not remove stored credential");
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut AuthState)) {
        let mut state = self.lock();
        f(&mut state);
        self.shared.tx.send_replace(state.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds `is_loading` up for as long as it lives, including when the
/// owning future is dropped mid-flight.
struct Loading<'a, T: HttpTransport, S: CredentialStore> {
    manager: &'a AuthManager<T, S>,
}

impl<'a, T: HttpTransport, S: CredentialStore> Loading<'a, T, S> {
    fn begin(manager: &'a AuthManager<T, S>) -> Self {
        manager.update(|state| state.pending += 1);
        Self { manager }
    }

    /// Takes over a count that was already added.
    fn adopt(manager: &'a AuthManager<T, S>) -> Self {
        Self { manager }
    }
}

impl<T: HttpTransport, S: CredentialStore> Drop for Loading<'_, T, S> {
    fn drop(&mut self) {
        self.manager
            .update(|state| state.pending = state.pending.saturating_sub(1));
    }
}
