//! Application state shared across the UI shell.
//!
//! `AppState` is the dependency-injection root: it builds every container
//! exactly once, wires the event bus, and owns the lifecycle contract:
//!
//! 1. [`AppState::new`] constructs the containers (session starts `Loading`)
//! 2. [`AppState::hydrate`] reads the persistence vault
//! 3. [`AppState::spawn_unauthorized_listener`] installs the global 401
//!    handling; keep the handle for teardown
//! 4. operations run; the flows that mutate persisted state re-save it
//! 5. drop the listener handle (or let it die with the runtime) on exit

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use coursedeck_core::CourseId;

use crate::api::types::{Course, LoginRequest, ProfileUpdate, RegisterRequest, User};
use crate::api::ApiClient;
use crate::checkout::{CheckoutOutcome, PaymentOrchestrator, PaymentProvider};
use crate::config::ClientConfig;
use crate::enrollment::{EnrollmentError, EnrollmentReconciler};
use crate::error::ClientError;
use crate::events::{AuthEvent, EventBus};
use crate::guard::Router;
use crate::routes::LOGIN_PATH;
use crate::store::cart::CartStore;
use crate::store::session::{AuthError, SessionStore, TokenCell};
use crate::store::vault::{PersistedState, StateVault, StorageBackend};

/// Application state shared across the UI shell.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// stores, the API client, and the checkout orchestrator.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    api: ApiClient,
    events: EventBus,
    vault: StateVault,
    session: SessionStore,
    cart: CartStore,
    enrollment: EnrollmentReconciler,
    checkout: PaymentOrchestrator,
    router: Router,
}

impl AppState {
    /// Create a new application state over the given storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self, ClientError> {
        let events = EventBus::new();
        let tokens = TokenCell::new();
        let api = ApiClient::new(&config, tokens.clone(), events.clone())?;
        let vault = StateVault::new(backend);
        let session = SessionStore::new(api.clone(), tokens);
        let cart = CartStore::new();
        let enrollment = EnrollmentReconciler::new(api.clone());
        let checkout = PaymentOrchestrator::new(api.clone(), cart.clone(), enrollment.clone());
        let router = Router::new();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                events,
                vault,
                session,
                cart,
                enrollment,
                checkout,
                router,
            }),
        })
    }

    /// Application state with in-memory persistence (tests, ephemeral runs).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn in_memory(config: ClientConfig) -> Result<Self, ClientError> {
        Self::new(
            config,
            Arc::new(crate::store::vault::MemoryBackend::default()),
        )
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the marketplace API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the enrollment reconciler.
    #[must_use]
    pub fn enrollment(&self) -> &EnrollmentReconciler {
        &self.inner.enrollment
    }

    /// Get a reference to the checkout orchestrator.
    #[must_use]
    pub fn checkout_orchestrator(&self) -> &PaymentOrchestrator {
        &self.inner.checkout
    }

    /// Get a reference to the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Read the persistence vault and leave the `Loading` session state.
    ///
    /// Absent or corrupt persisted state hydrates as signed-out defaults.
    pub fn hydrate(&self) {
        let persisted = self.inner.vault.load();
        self.inner.session.hydrate(persisted.session);
        self.inner.cart.restore(persisted.cart);
        self.inner.enrollment.restore(persisted.enrollment);
    }

    /// Write the current session, cart, and enrollment state to the vault.
    ///
    /// Checkout state is never included.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault write fails.
    pub fn persist(&self) -> Result<(), ClientError> {
        let state = PersistedState {
            session: self.inner.session.snapshot(),
            cart: self.inner.cart.snapshot(),
            enrollment: self.inner.enrollment.snapshot(),
        };
        self.inner.vault.save(&state)?;
        Ok(())
    }

    /// Subscribe to the event bus and turn every observed 401 into a forced
    /// logout plus navigation to the login view.
    ///
    /// This is the cross-cutting half of the 401 policy: it supersedes
    /// whatever local error handling the failing caller had.
    pub fn spawn_unauthorized_listener(&self) -> JoinHandle<()> {
        let app = self.clone();
        let mut rx = self.inner.events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AuthEvent::Unauthorized) => {
                        tracing::warn!("Unauthorized response observed; forcing logout");
                        app.logout();
                        app.inner.router.navigate(LOGIN_PATH);
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => {}
                }
            }
        })
    }

    // =========================================================================
    // Session flows
    // =========================================================================

    /// Sign in and persist the resulting state.
    ///
    /// # Errors
    ///
    /// Returns the user-facing auth error; prior state is untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let credentials = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let user = self.inner.session.login(&credentials).await?;
        self.persist_or_warn();
        Ok(user)
    }

    /// Create an account. The caller signs in afterwards.
    ///
    /// # Errors
    ///
    /// Returns the user-facing auth error.
    pub async fn register(&self, data: &RegisterRequest) -> Result<(), AuthError> {
        self.inner.session.register(data).await
    }

    /// Push a profile update and persist the merged session.
    ///
    /// # Errors
    ///
    /// Returns the user-facing auth error.
    pub async fn update_profile(&self, patch: &ProfileUpdate) -> Result<User, AuthError> {
        let user = self.inner.session.update_profile(patch).await?;
        self.persist_or_warn();
        Ok(user)
    }

    /// Sign out: clears the session, the cart, the enrollment mirror, and
    /// the entire persisted blob. Checkout state is unaffected (it is never
    /// persisted and an in-flight attempt owns its own lifecycle).
    pub fn logout(&self) {
        self.inner.session.logout();
        self.inner.cart.clear();
        self.inner.enrollment.clear();
        if let Err(e) = self.inner.vault.purge() {
            tracing::warn!(error = %e, "Failed to purge persisted state on logout");
        }
    }

    // =========================================================================
    // Purchase flows
    // =========================================================================

    /// Run a checkout attempt for the signed-in user.
    ///
    /// On settle the router is moved to the confirmation view and the
    /// post-purchase state is persisted.
    pub async fn checkout<P: PaymentProvider>(&self, provider: &P) -> CheckoutOutcome {
        let Some(user) = self.inner.session.current_user() else {
            return CheckoutOutcome::Failed(crate::checkout::PaymentError::NotSignedIn);
        };

        let outcome = self.inner.checkout.checkout(&user, provider).await;

        if let CheckoutOutcome::Settled { redirect, .. } = &outcome {
            self.inner.router.navigate(redirect);
            self.persist_or_warn();
        }
        outcome
    }

    /// Enroll the signed-in user in a free course and persist the mirror.
    ///
    /// # Errors
    ///
    /// Returns the enrollment error; the mirror is untouched on failure.
    pub async fn enroll_free(&self, course_id: &CourseId) -> Result<Course, EnrollmentError> {
        let user = self
            .inner
            .session
            .current_user()
            .ok_or_else(|| EnrollmentError::Rejected("Please sign in to enroll".to_owned()))?;

        let course = self
            .inner
            .enrollment
            .enroll_free(&user.id, course_id)
            .await?;
        self.persist_or_warn();
        Ok(course)
    }

    /// Persist, degrading to a warning: a failed save must not fail the
    /// user-visible operation that triggered it.
    fn persist_or_warn(&self) {
        if let Err(e) = self.persist() {
            tracing::warn!(error = %e, "Failed to persist client state");
        }
    }
}
