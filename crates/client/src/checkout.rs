//! Checkout orchestration.
//!
//! Drives a single checkout attempt through its phases:
//!
//! ```text
//! Idle -> KeyFetch -> OrderCreation -> ProviderUi -> Verification
//!                                                      |-> Settled
//!                                                      |-> Failed(reason)
//! ```
//!
//! The external payment widget sits behind the [`PaymentProvider`] trait, so
//! the orchestrator itself is runtime-agnostic and testable. Only one
//! attempt may be in flight; UIs disable the checkout control while
//! [`PaymentOrchestrator::is_processing`] is true.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{instrument, warn};

use coursedeck_core::PaymentId;

use crate::api::types::{CheckoutRequest, Order, PaymentConfirmation, User};
use crate::api::ApiClient;
use crate::enrollment::EnrollmentReconciler;
use crate::routes::PAYMENT_SUCCESS_PATH;
use crate::store::cart::CartStore;

/// Business name shown in the provider widget.
const BUSINESS_NAME: &str = "Coursedeck";
/// Line-item description shown in the provider widget.
const ORDER_DESCRIPTION: &str = "Course purchase";
/// Widget accent color.
const THEME_COLOR: &str = "#2563eb";

/// Failures terminating a checkout attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// The provider key could not be obtained.
    #[error("missing payment configuration")]
    MissingConfiguration,

    /// The server could not create a provider order.
    #[error("order creation failed")]
    OrderCreation,

    /// The provider widget never became usable.
    #[error("provider SDK failed to load")]
    ProviderLoad,

    /// No payment id in the callback and verification did not pass.
    #[error("payment verification failed")]
    VerificationFailed,

    /// A checkout attempt is already in flight.
    #[error("checkout already in progress")]
    AlreadyInProgress,

    /// Checkout requires a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// Nothing to purchase.
    #[error("cart is empty")]
    EmptyCart,
}

/// Phase of the current (or last) checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPhase {
    Idle,
    KeyFetch,
    OrderCreation,
    ProviderUi,
    Verification,
    Settled,
    Failed,
}

/// Everything the provider widget needs to open its hosted payment UI.
#[derive(Debug, Clone)]
pub struct CheckoutPrompt {
    /// Provider publishable key.
    pub key: String,
    /// The order this attempt pays for.
    pub order: Order,
    pub business_name: &'static str,
    pub description: &'static str,
    /// Prefill for the widget's contact form.
    pub customer_name: String,
    pub customer_email: String,
    pub theme_color: &'static str,
}

/// What came back from the provider widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// The user completed payment; the widget invoked its callback.
    Completed(PaymentConfirmation),
    /// The user dismissed the widget without paying.
    Dismissed,
    /// The widget script never loaded.
    LoadFailed,
}

/// The external payment widget, as seen by the orchestrator.
///
/// Implementations bridge to the environment's widget (an injected browser
/// script, a native SDK); tests substitute a scripted double.
pub trait PaymentProvider: Send + Sync {
    /// Open the hosted payment UI and wait for the user to finish with it.
    fn collect(
        &self,
        prompt: CheckoutPrompt,
    ) -> impl std::future::Future<Output = ProviderOutcome> + Send;
}

/// Result of one checkout attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Payment went through; the cart was cleared and enrollments
    /// reconciled. `redirect` is the confirmation view carrying the payment
    /// reference.
    Settled { reference: PaymentId, redirect: String },
    /// The user closed the widget; the orchestrator is back at `Idle` and
    /// the checkout control may be re-enabled.
    Dismissed,
    /// The attempt failed; the cart is untouched.
    Failed(PaymentError),
}

// =============================================================================
// PaymentOrchestrator
// =============================================================================

/// Drives checkout attempts. One instance per application.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    inner: Arc<PaymentOrchestratorInner>,
}

struct PaymentOrchestratorInner {
    api: ApiClient,
    cart: CartStore,
    reconciler: EnrollmentReconciler,
    phase: RwLock<CheckoutPhase>,
    /// Provider key survives attempts and `reset()`; it changes only with
    /// server configuration.
    provider_key: RwLock<Option<String>>,
    in_flight: AtomicBool,
}

impl PaymentOrchestrator {
    /// Create an idle orchestrator.
    #[must_use]
    pub fn new(api: ApiClient, cart: CartStore, reconciler: EnrollmentReconciler) -> Self {
        Self {
            inner: Arc::new(PaymentOrchestratorInner {
                api,
                cart,
                reconciler,
                phase: RwLock::new(CheckoutPhase::Idle),
                provider_key: RwLock::new(None),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// Phase of the current (or last) attempt.
    #[must_use]
    pub fn phase(&self) -> CheckoutPhase {
        *self
            .inner
            .phase
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Whether an attempt is in flight. UIs keep the checkout control
    /// disabled while this is true.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Return to `Idle`, discarding any terminal phase. The cached provider
    /// key is kept.
    pub fn reset(&self) {
        if !self.is_processing() {
            self.set_phase(CheckoutPhase::Idle);
        }
    }

    /// Run one checkout attempt for the signed-in user.
    ///
    /// The attempt pays for the current cart contents. On settle the cart
    /// is cleared and the enrollment mirror reconciled; on dismissal the
    /// orchestrator returns to `Idle`; on failure the cart is untouched.
    #[instrument(skip(self, user, provider), fields(user_id = %user.id))]
    pub async fn checkout<P: PaymentProvider>(
        &self,
        user: &User,
        provider: &P,
    ) -> CheckoutOutcome {
        // Single attempt in flight: losers of this race fail fast and the
        // UI keeps the control disabled.
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return CheckoutOutcome::Failed(PaymentError::AlreadyInProgress);
        }
        let _flight = FlightGuard(&self.inner.in_flight);

        let items = self.inner.cart.items();
        if items.is_empty() {
            return self.fail(PaymentError::EmptyCart);
        }

        // KeyFetch: skipped when a key is already cached.
        self.set_phase(CheckoutPhase::KeyFetch);
        let key = match self.provider_key().await {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Provider key fetch failed");
                return self.fail(PaymentError::MissingConfiguration);
            }
        };

        // OrderCreation
        self.set_phase(CheckoutPhase::OrderCreation);
        let request = CheckoutRequest {
            amount: self.inner.cart.total(),
            course_ids: items.iter().map(|i| i.course_id.clone()).collect(),
            user_id: user.id.clone(),
        };
        let order = match self.inner.api.create_order(&request).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Order creation failed");
                return self.fail(PaymentError::OrderCreation);
            }
        };

        // ProviderUi: the one cancellable phase.
        self.set_phase(CheckoutPhase::ProviderUi);
        let prompt = CheckoutPrompt {
            key,
            order,
            business_name: BUSINESS_NAME,
            description: ORDER_DESCRIPTION,
            customer_name: user.full_name(),
            customer_email: user.email.clone(),
            theme_color: THEME_COLOR,
        };
        let confirmation = match provider.collect(prompt).await {
            ProviderOutcome::Completed(confirmation) => confirmation,
            ProviderOutcome::Dismissed => {
                self.set_phase(CheckoutPhase::Idle);
                return CheckoutOutcome::Dismissed;
            }
            ProviderOutcome::LoadFailed => {
                return self.fail(PaymentError::ProviderLoad);
            }
        };

        // Verification. Both the success path and the error path of the
        // verification call funnel into the same has-payment-id check: a
        // non-empty payment id settles the attempt regardless of what the
        // verification endpoint returned.
        self.set_phase(CheckoutPhase::Verification);
        if let Err(e) = self.inner.api.verify_payment(&confirmation).await {
            warn!(error = %e, "Payment verification call failed");
        }

        if confirmation.payment_id.as_str().is_empty() {
            return self.fail(PaymentError::VerificationFailed);
        }

        self.settle(user, confirmation.payment_id).await
    }

    /// Settle the attempt: clear the cart, reconcile enrollments, and hand
    /// back the confirmation view target.
    async fn settle(&self, user: &User, reference: PaymentId) -> CheckoutOutcome {
        self.inner.cart.clear();

        if let Err(e) = self
            .inner
            .reconciler
            .reconcile_after_purchase(&user.id)
            .await
        {
            warn!(error = %e, "Post-payment enrollment reconciliation failed");
        }

        self.set_phase(CheckoutPhase::Settled);
        let redirect = format!("{PAYMENT_SUCCESS_PATH}?reference={reference}");
        CheckoutOutcome::Settled {
            reference,
            redirect,
        }
    }

    /// Cached provider key, fetching it on first use.
    async fn provider_key(&self) -> Result<String, crate::api::ApiError> {
        if let Some(key) = self
            .inner
            .provider_key
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
        {
            return Ok(key);
        }

        let key = self.inner.api.fetch_provider_key().await?;
        *self
            .inner
            .provider_key
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(key.clone());
        Ok(key)
    }

    fn fail(&self, error: PaymentError) -> CheckoutOutcome {
        self.set_phase(CheckoutPhase::Failed);
        CheckoutOutcome::Failed(error)
    }

    fn set_phase(&self, phase: CheckoutPhase) {
        *self
            .inner
            .phase
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = phase;
    }
}

/// Releases the in-flight flag on every exit path.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
