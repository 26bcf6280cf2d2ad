//! Session store: single source of truth for who is signed in and as what.

use std::sync::{Arc, RwLock};

use thiserror::Error;

use coursedeck_core::Role;

use crate::api::types::{LoginRequest, ProfileUpdate, RegisterRequest, User};
use crate::api::{ApiClient, ApiError};
use crate::store::vault::PersistedSession;

const GENERIC_LOGIN_MESSAGE: &str = "Login failed. Please check your credentials.";
const GENERIC_REGISTER_MESSAGE: &str = "Registration failed. Please try again.";
const GENERIC_PROFILE_MESSAGE: &str = "Profile update failed";

/// Errors surfaced to the user by session operations.
///
/// These are recoverable: the prior session state is never mutated by a
/// failed operation.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login rejected; carries the server-provided message when present.
    #[error("{0}")]
    LoginFailed(String),

    /// Registration rejected; carries the server-provided message when present.
    #[error("{0}")]
    RegistrationFailed(String),

    /// Profile update rejected.
    #[error("{0}")]
    ProfileUpdateFailed(String),

    /// Operation requires an authenticated session.
    #[error("not signed in")]
    NotSignedIn,
}

// =============================================================================
// TokenCell
// =============================================================================

/// Shared cell holding the session token.
///
/// The API client reads it on every outbound request; only this module
/// writes it. That keeps the "written only by the session store" contract a
/// matter of visibility, not discipline.
#[derive(Debug, Clone, Default)]
pub struct TokenCell {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenCell {
    /// Create an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if a session is installed.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: &str) {
        *self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token.to_owned());
    }

    fn clear(&self) {
        *self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

// =============================================================================
// Session
// =============================================================================

/// An installed session: a user plus a non-empty token.
///
/// The authenticated-iff-token-present invariant holds by construction; a
/// `Session` cannot be built from an empty token.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub user: User,
    token: String,
}

impl Session {
    fn new(user: User, token: String) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        Some(Self { user, token })
    }

    /// The session token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Authentication state as seen by the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Persisted state has not been read yet.
    Loading,
    Unauthenticated,
    Authenticated(Role),
}

#[derive(Debug)]
enum SessionState {
    Loading,
    Ready(Option<Session>),
}

// =============================================================================
// SessionStore
// =============================================================================

/// The session container.
///
/// Starts in [`SessionStatus::Loading`] until hydrated from the persistence
/// vault. A failed login or registration leaves the prior state untouched.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    api: ApiClient,
    tokens: TokenCell,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create an unhydrated store.
    #[must_use]
    pub fn new(api: ApiClient, tokens: TokenCell) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                api,
                tokens,
                state: RwLock::new(SessionState::Loading),
            }),
        }
    }

    /// Current authentication status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match &*self.read() {
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Ready(None) => SessionStatus::Unauthenticated,
            SessionState::Ready(Some(session)) => SessionStatus::Authenticated(session.user.role),
        }
    }

    /// Whether a session is installed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.status(), SessionStatus::Authenticated(_))
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        match &*self.read() {
            SessionState::Ready(Some(session)) => Some(session.user.clone()),
            _ => None,
        }
    }

    /// The signed-in user's role, if any.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.current_user().map(|user| user.role)
    }

    /// Authenticate and install the session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::LoginFailed`] with the server-provided message
    /// (or a generic fallback); the prior state is untouched on failure.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<User, AuthError> {
        let response = self
            .inner
            .api
            .login(credentials)
            .await
            .map_err(|e| AuthError::LoginFailed(surface_message(&e, GENERIC_LOGIN_MESSAGE)))?;

        let Some(session) = Session::new(response.data, response.token) else {
            return Err(AuthError::LoginFailed(GENERIC_LOGIN_MESSAGE.to_owned()));
        };

        let user = session.user.clone();
        self.install(session);
        Ok(user)
    }

    /// Create an account. Does not sign the user in; callers log in after.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RegistrationFailed`] with the server-provided
    /// message (or a generic fallback).
    pub async fn register(&self, data: &RegisterRequest) -> Result<(), AuthError> {
        self.inner.api.register(data).await.map_err(|e| {
            AuthError::RegistrationFailed(surface_message(&e, GENERIC_REGISTER_MESSAGE))
        })?;
        Ok(())
    }

    /// Push a profile update to the server and merge the result into the
    /// current session without touching authentication state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] without a session, or
    /// [`AuthError::ProfileUpdateFailed`] if the server rejects the update.
    pub async fn update_profile(&self, patch: &ProfileUpdate) -> Result<User, AuthError> {
        let current = self.current_user().ok_or(AuthError::NotSignedIn)?;

        let updated = self
            .inner
            .api
            .update_profile(&current.id, patch)
            .await
            .map_err(|e| {
                AuthError::ProfileUpdateFailed(surface_message(&e, GENERIC_PROFILE_MESSAGE))
            })?;

        self.update_user(updated.clone());
        Ok(updated)
    }

    /// Merge an already-fetched user record into the session.
    ///
    /// No-op when no session is installed; authentication flags and the
    /// token are never affected.
    pub fn update_user(&self, user: User) {
        let mut state = self.write();
        if let SessionState::Ready(Some(session)) = &mut *state {
            session.user = user;
        }
    }

    /// Drop the session and clear the shared token cell.
    ///
    /// Wiping the persistence vault and the other stores is coordinated by
    /// [`crate::state::AppState::logout`], which calls this.
    pub fn logout(&self) {
        self.inner.tokens.clear();
        *self.write() = SessionState::Ready(None);
    }

    /// Leave `Loading` using the persisted session, if any.
    ///
    /// A persisted record with an empty token is discarded rather than
    /// restored half-authenticated.
    pub(crate) fn hydrate(&self, persisted: Option<PersistedSession>) {
        match persisted.and_then(|p| Session::new(p.user, p.token)) {
            Some(restored) => self.install(restored),
            None => *self.write() = SessionState::Ready(None),
        }
    }

    /// Snapshot for the persistence vault.
    pub(crate) fn snapshot(&self) -> Option<PersistedSession> {
        match &*self.read() {
            SessionState::Ready(Some(session)) => Some(PersistedSession {
                user: session.user.clone(),
                token: session.token.clone(),
            }),
            _ => None,
        }
    }

    fn install(&self, session: Session) {
        self.inner.tokens.set(&session.token);
        *self.write() = SessionState::Ready(Some(session));
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Pick the message shown to the user for a failed auth call.
///
/// Server-provided messages win; transport and parse failures fall back to
/// the generic wording.
fn surface_message(error: &ApiError, generic: &str) -> String {
    match error {
        ApiError::Api { message, .. }
        | ApiError::Unauthorized(message)
        | ApiError::NotFound(message)
            if !message.is_empty() =>
        {
            message.clone()
        }
        _ => generic.to_owned(),
    }
}
