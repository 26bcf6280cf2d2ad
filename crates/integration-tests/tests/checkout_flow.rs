//! Checkout state machine scenarios against the stub API.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::Notify;

use coursedeck_client::AppState;
use coursedeck_client::checkout::{CheckoutOutcome, CheckoutPhase, PaymentError};
use coursedeck_client::store::cart::CartItem;
use coursedeck_core::{CourseId, PaymentId};
use coursedeck_integration_tests::{
    ProviderScript, STUB_PROVIDER_KEY, ScriptedProvider, StubApi,
};

async fn signed_in_app(stub: &StubApi) -> (AppState, String) {
    let user_id = stub.seed_user("ada@example.com", "hunter2", "student");
    let app = AppState::in_memory(stub.client_config()).expect("Failed to build app state");
    app.hydrate();
    app.login("ada@example.com", "hunter2")
        .await
        .expect("Login failed");
    (app, user_id)
}

fn cart_item(id: &str, price: i64) -> CartItem {
    CartItem {
        course_id: CourseId::new(id),
        title: format!("Course {id}"),
        price: Decimal::from(price),
        thumbnail: None,
        instructor_name: None,
    }
}

fn fill_cart(app: &AppState) {
    app.cart().add_item(cart_item("c-a", 100));
    app.cart().add_item(cart_item("c-b", 200));
}

#[tokio::test]
async fn test_settles_when_verification_call_fails_but_payment_id_present() {
    let stub = StubApi::spawn().await;
    stub.seed_course("c-a", "Course A", 100.0);
    stub.seed_course("c-b", "Course B", 200.0);
    let (app, _user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    // Verification endpoint blows up, but the callback carried a payment id.
    stub.state.fail_verification.store(true, Ordering::Relaxed);

    let provider = ScriptedProvider::new(ProviderScript::Complete {
        payment_id: "pay_123".to_owned(),
    });
    let outcome = app.checkout(&provider).await;

    assert_eq!(
        outcome,
        CheckoutOutcome::Settled {
            reference: PaymentId::new("pay_123"),
            redirect: "/paymentsuccess?reference=pay_123".to_owned(),
        }
    );
    assert!(app.cart().is_empty());
    assert_eq!(app.router().current(), "/paymentsuccess?reference=pay_123");
    assert_eq!(app.checkout_orchestrator().phase(), CheckoutPhase::Settled);
    assert_eq!(stub.state.verification_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_settled_checkout_reconciles_enrollment_and_progress() {
    let stub = StubApi::spawn().await;
    stub.seed_course("c-a", "Course A", 100.0);
    stub.seed_course("c-b", "Course B", 200.0);
    let (app, user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    let provider = ScriptedProvider::new(ProviderScript::Complete {
        payment_id: "pay_777".to_owned(),
    });
    let outcome = app.checkout(&provider).await;

    assert!(matches!(outcome, CheckoutOutcome::Settled { .. }));
    assert_eq!(stub.enrolled_ids(&user_id).len(), 2);
    assert!(app.enrollment().is_enrolled(&CourseId::new("c-a")));
    assert!(app.enrollment().is_enrolled(&CourseId::new("c-b")));

    // No progress documents exist yet; the mirror holds zeroed records.
    let progress = app
        .enrollment()
        .progress(&CourseId::new("c-a"))
        .expect("Progress missing from mirror");
    assert_eq!(progress.completed_lessons_count, 0);
    assert_eq!(progress.completed_videos_count, 0);
    assert_eq!(progress.total_lessons_count, 0);
    assert_eq!(progress.total_videos_count, 0);
    assert!(progress.completed_lessons.is_empty());
    assert!(progress.completed_videos.is_empty());
    assert!((progress.course_completion_percentage - 0.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_empty_payment_id_fails_verification_and_keeps_cart() {
    let stub = StubApi::spawn().await;
    stub.seed_course("c-a", "Course A", 100.0);
    stub.seed_course("c-b", "Course B", 200.0);
    let (app, _user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    stub.state.fail_verification.store(true, Ordering::Relaxed);

    let provider = ScriptedProvider::new(ProviderScript::CompleteWithEmptyId);
    let outcome = app.checkout(&provider).await;

    assert_eq!(
        outcome,
        CheckoutOutcome::Failed(PaymentError::VerificationFailed)
    );
    assert_eq!(app.cart().len(), 2);
    assert_eq!(app.cart().total(), Decimal::from(300));
    assert_eq!(app.checkout_orchestrator().phase(), CheckoutPhase::Failed);
}

#[tokio::test]
async fn test_empty_payment_id_fails_even_when_verification_call_succeeds() {
    let stub = StubApi::spawn().await;
    stub.seed_course("c-a", "Course A", 100.0);
    let (app, _user_id) = signed_in_app(&stub).await;
    app.cart().add_item(cart_item("c-a", 100));

    let provider = ScriptedProvider::new(ProviderScript::CompleteWithEmptyId);
    let outcome = app.checkout(&provider).await;

    assert_eq!(
        outcome,
        CheckoutOutcome::Failed(PaymentError::VerificationFailed)
    );
    assert_eq!(app.cart().len(), 1);
}

#[tokio::test]
async fn test_dismissal_returns_to_idle_and_keeps_cart() {
    let stub = StubApi::spawn().await;
    let (app, _user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    let provider = ScriptedProvider::new(ProviderScript::Dismiss);
    let outcome = app.checkout(&provider).await;

    assert_eq!(outcome, CheckoutOutcome::Dismissed);
    assert_eq!(app.checkout_orchestrator().phase(), CheckoutPhase::Idle);
    assert!(!app.checkout_orchestrator().is_processing());
    assert_eq!(app.cart().len(), 2);
}

#[tokio::test]
async fn test_key_fetch_failure_fails_before_opening_widget() {
    let stub = StubApi::spawn().await;
    let (app, _user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    stub.state.fail_key_fetch.store(true, Ordering::Relaxed);

    let provider = ScriptedProvider::new(ProviderScript::Dismiss);
    let outcome = app.checkout(&provider).await;

    assert_eq!(
        outcome,
        CheckoutOutcome::Failed(PaymentError::MissingConfiguration)
    );
    assert!(provider.prompts.lock().expect("prompts lock").is_empty());
    assert_eq!(app.cart().len(), 2);
}

#[tokio::test]
async fn test_order_creation_failure() {
    let stub = StubApi::spawn().await;
    let (app, _user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    stub.state.fail_checkout.store(true, Ordering::Relaxed);

    let provider = ScriptedProvider::new(ProviderScript::Dismiss);
    let outcome = app.checkout(&provider).await;

    assert_eq!(outcome, CheckoutOutcome::Failed(PaymentError::OrderCreation));
    assert!(provider.prompts.lock().expect("prompts lock").is_empty());
}

#[tokio::test]
async fn test_provider_load_failure() {
    let stub = StubApi::spawn().await;
    let (app, _user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    let provider = ScriptedProvider::new(ProviderScript::FailLoad);
    let outcome = app.checkout(&provider).await;

    assert_eq!(outcome, CheckoutOutcome::Failed(PaymentError::ProviderLoad));
    assert_eq!(app.cart().len(), 2);
}

#[tokio::test]
async fn test_provider_key_cached_across_attempts() {
    let stub = StubApi::spawn().await;
    stub.seed_course("c-a", "Course A", 100.0);
    stub.seed_course("c-b", "Course B", 200.0);
    let (app, _user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    // First attempt fetches and caches the key, then the user backs out.
    let dismiss = ScriptedProvider::new(ProviderScript::Dismiss);
    assert_eq!(app.checkout(&dismiss).await, CheckoutOutcome::Dismissed);

    // Key endpoint goes down; the cached key keeps checkout working.
    stub.state.fail_key_fetch.store(true, Ordering::Relaxed);

    let provider = ScriptedProvider::new(ProviderScript::Complete {
        payment_id: "pay_9".to_owned(),
    });
    let outcome = app.checkout(&provider).await;
    assert!(matches!(outcome, CheckoutOutcome::Settled { .. }));
}

#[tokio::test]
async fn test_prompt_carries_key_order_and_prefill() {
    let stub = StubApi::spawn().await;
    let (app, user_id) = signed_in_app(&stub).await;
    fill_cart(&app);

    let provider = ScriptedProvider::new(ProviderScript::Dismiss);
    app.checkout(&provider).await;

    let prompts = provider.prompts.lock().expect("prompts lock");
    let prompt = prompts.first().expect("Widget never opened");
    assert_eq!(prompt.key, STUB_PROVIDER_KEY);
    assert_eq!(prompt.order.amount, Decimal::from(300));
    assert_eq!(prompt.order.currency, "INR");
    assert_eq!(prompt.customer_name, "Ada Lovelace");
    assert_eq!(prompt.customer_email, "ada@example.com");

    // The order was created from the cart contents and the signed-in user.
    let checkout_body = stub.last_checkout().expect("No checkout request seen");
    assert_eq!(checkout_body["userId"], user_id.as_str());
    assert_eq!(checkout_body["courseIds"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_only_one_attempt_in_flight() {
    let stub = StubApi::spawn().await;
    stub.seed_course("c-a", "Course A", 100.0);
    let (app, _user_id) = signed_in_app(&stub).await;
    app.cart().add_item(cart_item("c-a", 100));

    let gate = Arc::new(Notify::new());
    let provider = Arc::new(ScriptedProvider::gated(
        ProviderScript::Complete {
            payment_id: "pay_1".to_owned(),
        },
        gate.clone(),
    ));

    let background_app = app.clone();
    let background_provider = provider.clone();
    let first =
        tokio::spawn(async move { background_app.checkout(background_provider.as_ref()).await });

    // Wait for the first attempt to reach the provider widget.
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.checkout_orchestrator().phase() != CheckoutPhase::ProviderUi {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("First attempt never reached the widget");

    assert!(app.checkout_orchestrator().is_processing());

    let second = app
        .checkout(&ScriptedProvider::new(ProviderScript::Dismiss))
        .await;
    assert_eq!(
        second,
        CheckoutOutcome::Failed(PaymentError::AlreadyInProgress)
    );

    gate.notify_one();
    let outcome = first.await.expect("Checkout task panicked");
    assert!(matches!(outcome, CheckoutOutcome::Settled { .. }));
    assert!(!app.checkout_orchestrator().is_processing());
}

#[tokio::test]
async fn test_checkout_requires_items() {
    let stub = StubApi::spawn().await;
    let (app, _user_id) = signed_in_app(&stub).await;

    let provider = ScriptedProvider::new(ProviderScript::Dismiss);
    let outcome = app.checkout(&provider).await;
    assert_eq!(outcome, CheckoutOutcome::Failed(PaymentError::EmptyCart));
}

#[tokio::test]
async fn test_checkout_requires_session() {
    let stub = StubApi::spawn().await;
    let app = AppState::in_memory(stub.client_config()).expect("Failed to build app state");
    app.hydrate();
    app.cart().add_item(cart_item("c-a", 100));

    let provider = ScriptedProvider::new(ProviderScript::Dismiss);
    let outcome = app.checkout(&provider).await;
    assert_eq!(outcome, CheckoutOutcome::Failed(PaymentError::NotSignedIn));
}
