//! Integration tests for Coursedeck.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p coursedeck-integration-tests
//! ```
//!
//! The harness spins up an in-process stub of the marketplace REST API on an
//! ephemeral port and points the real `ApiClient` at it, so the scenarios
//! exercise the full client stack: request interception, stores, checkout
//! orchestration, and persistence.
//!
//! # Test Categories
//!
//! - `checkout_flow` - checkout state machine, verification leniency
//! - `auth_session` - login/logout, forced logout on 401, persistence
//! - `enrollment_progress` - free enrollment, progress normalization
//! - `catalog` - catalog reads and cache invalidation

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::sync::Notify;
use url::Url;

use coursedeck_client::ClientConfig;
use coursedeck_client::api::types::PaymentConfirmation;
use coursedeck_client::checkout::{CheckoutPrompt, PaymentProvider, ProviderOutcome};
use coursedeck_core::{OrderId, PaymentId};

const TOKEN_HEADER: &str = "x-access-token";

/// Provider key handed out by the stub.
pub const STUB_PROVIDER_KEY: &str = "rzp_test_stub";

type HandlerResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Install a test subscriber once; later calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Stub state
// =============================================================================

struct StubUser {
    password: String,
    user: Value,
}

/// Mutable state behind the stub API.
#[derive(Default)]
pub struct StubState {
    users: Mutex<HashMap<String, StubUser>>,
    valid_tokens: Mutex<Vec<String>>,
    courses: Mutex<Vec<Value>>,
    categories: Mutex<Vec<Value>>,
    enrolled: Mutex<HashMap<String, Vec<Value>>>,
    progress: Mutex<HashMap<(String, String), Value>>,
    last_checkout: Mutex<Option<Value>>,
    order_seq: AtomicUsize,
    /// Failure switches for exercising the orchestrator's error paths.
    pub fail_key_fetch: AtomicBool,
    pub fail_checkout: AtomicBool,
    pub fail_verification: AtomicBool,
    /// Request counters.
    pub listing_calls: AtomicUsize,
    pub verification_calls: AtomicUsize,
}

impl StubState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let presented = headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        self.valid_tokens
            .lock()
            .expect("tokens lock")
            .iter()
            .any(|token| token == presented)
    }

    fn find_course(&self, course_id: &str) -> Option<Value> {
        self.courses
            .lock()
            .expect("courses lock")
            .iter()
            .find(|course| course["_id"] == course_id)
            .cloned()
    }

    fn enroll_user(&self, user_id: &str, course: Value) {
        let mut enrolled = self.enrolled.lock().expect("enrolled lock");
        let list = enrolled.entry(user_id.to_owned()).or_default();
        if !list.iter().any(|c| c["_id"] == course["_id"]) {
            list.push(course);
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

/// An in-process stub of the marketplace API.
pub struct StubApi {
    pub addr: SocketAddr,
    pub state: Arc<StubState>,
    handle: tokio::task::JoinHandle<()>,
}

impl StubApi {
    /// Bind an ephemeral port and start serving.
    pub async fn spawn() -> Self {
        init_tracing();

        let state = Arc::new(StubState::default());
        let router = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub listener");
        let addr = listener.local_addr().expect("Failed to read stub address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Client configuration pointing at this stub.
    pub fn client_config(&self) -> ClientConfig {
        let url = Url::parse(&format!("http://{}", self.addr)).expect("stub url");
        ClientConfig::new(url)
    }

    /// Seed a user; returns the generated user id.
    pub fn seed_user(&self, email: &str, password: &str, role: &str) -> String {
        let user_id = format!("u-{}", uuid::Uuid::new_v4());
        let user = json!({
            "_id": user_id,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": email,
            "role": role,
        });
        self.state.users.lock().expect("users lock").insert(
            email.to_owned(),
            StubUser {
                password: password.to_owned(),
                user,
            },
        );
        user_id
    }

    /// Seed a catalog course.
    pub fn seed_course(&self, course_id: &str, title: &str, price: f64) {
        self.state.courses.lock().expect("courses lock").push(json!({
            "_id": course_id,
            "title": title,
            "price": price,
            "instructorName": "Grace Hopper",
        }));
    }

    /// Seed a catalog course with category and instructor attribution.
    pub fn seed_course_detail(
        &self,
        course_id: &str,
        title: &str,
        price: f64,
        category_id: &str,
        instructor_id: &str,
    ) {
        self.state.courses.lock().expect("courses lock").push(json!({
            "_id": course_id,
            "title": title,
            "price": price,
            "category": category_id,
            "instructor": instructor_id,
            "instructorName": "Grace Hopper",
        }));
    }

    /// Seed a course category.
    pub fn seed_category(&self, category_id: &str, name: &str) {
        self.state
            .categories
            .lock()
            .expect("categories lock")
            .push(json!({ "_id": category_id, "name": name }));
    }

    /// Seed a progress document for one user/course pair.
    pub fn seed_progress(&self, user_id: &str, course_id: &str, progress: Value) {
        self.state
            .progress
            .lock()
            .expect("progress lock")
            .insert((user_id.to_owned(), course_id.to_owned()), progress);
    }

    /// Invalidate every issued token; subsequent authenticated calls 401.
    pub fn revoke_tokens(&self) {
        self.state.valid_tokens.lock().expect("tokens lock").clear();
    }

    /// Course ids the stub considers the user enrolled in.
    pub fn enrolled_ids(&self, user_id: &str) -> Vec<String> {
        self.state
            .enrolled
            .lock()
            .expect("enrolled lock")
            .get(user_id)
            .map(|courses| {
                courses
                    .iter()
                    .filter_map(|c| c["_id"].as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Body of the last `POST /checkout`, if any.
    pub fn last_checkout(&self) -> Option<Value> {
        self.state
            .last_checkout
            .lock()
            .expect("checkout lock")
            .clone()
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

fn build_router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/getkey", get(get_key))
        .route("/checkout", post(checkout))
        .route("/paymentVerification", post(payment_verification))
        .route("/courses", get(list_courses))
        .route("/course/create", post(create_course))
        .route("/course/filter/category", get(filter_by_category))
        .route("/course/filter/instructor", get(filter_by_instructor))
        .route("/course/{id}", get(get_course))
        .route("/categories", get(list_categories))
        .route("/instructors", get(list_instructors))
        .route("/user/{id}", get(get_user))
        .route("/user/edit/{id}", post(edit_user))
        .route("/user/enroll/{user_id}", post(enroll))
        .route("/user/enrolled-courses/{user_id}", get(enrolled_courses))
        .route("/progress/{user_id}/{course_id}", get(get_progress))
        .with_state(state)
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message })))
}

fn require_auth(state: &StubState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    if state.authorized(headers) {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "Invalid token"))
    }
}

async fn login(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> HandlerResult {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let users = state.users.lock().expect("users lock");
    let Some(stub_user) = users.get(email).filter(|u| u.password == password) else {
        return Err(error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    };

    let token = format!("tok-{}", uuid::Uuid::new_v4());
    let user = stub_user.user.clone();
    drop(users);

    state
        .valid_tokens
        .lock()
        .expect("tokens lock")
        .push(token.clone());

    Ok(Json(json!({ "data": user, "token": token })))
}

async fn register(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> HandlerResult {
    let email = body["email"].as_str().unwrap_or_default().to_owned();
    if state.users.lock().expect("users lock").contains_key(&email) {
        return Err(error(StatusCode::BAD_REQUEST, "Email already registered"));
    }

    let user_id = format!("u-{}", uuid::Uuid::new_v4());
    let user = json!({
        "_id": user_id,
        "first_name": body["first_name"],
        "last_name": body["last_name"],
        "email": email,
        "role": body["role"],
    });
    state.users.lock().expect("users lock").insert(
        email,
        StubUser {
            password: body["password"].as_str().unwrap_or_default().to_owned(),
            user: user.clone(),
        },
    );

    let token = format!("tok-{}", uuid::Uuid::new_v4());
    Ok(Json(json!({ "data": user, "token": token })))
}

async fn get_key(State(state): State<Arc<StubState>>) -> HandlerResult {
    if state.fail_key_fetch.load(Ordering::Relaxed) {
        return Err(error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Payment configuration unavailable",
        ));
    }
    Ok(Json(json!({ "key": STUB_PROVIDER_KEY })))
}

async fn checkout(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    if state.fail_checkout.load(Ordering::Relaxed) {
        return Err(error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not create order",
        ));
    }

    *state.last_checkout.lock().expect("checkout lock") = Some(body.clone());

    let sequence = state.order_seq.fetch_add(1, Ordering::Relaxed) + 1;
    Ok(Json(json!({
        "order": {
            "id": format!("order_{sequence}"),
            "amount": body["amount"],
            "currency": "INR",
        }
    })))
}

async fn payment_verification(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> HandlerResult {
    require_auth(&state, &headers)?;
    state.verification_calls.fetch_add(1, Ordering::Relaxed);

    if state.fail_verification.load(Ordering::Relaxed) {
        return Err(error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Signature mismatch",
        ));
    }

    // A real backend records the enrollment during verification; mirror
    // that using the most recent order.
    if let Some(checkout_body) = state.last_checkout.lock().expect("checkout lock").clone() {
        let user_id = checkout_body["userId"].as_str().unwrap_or_default();
        if let Some(course_ids) = checkout_body["courseIds"].as_array() {
            for course_id in course_ids {
                if let Some(course) =
                    course_id.as_str().and_then(|id| state.find_course(id))
                {
                    state.enroll_user(user_id, course);
                }
            }
        }
    }

    Ok(Json(json!({ "success": true })))
}

async fn list_courses(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> HandlerResult {
    require_auth(&state, &headers)?;
    state.listing_calls.fetch_add(1, Ordering::Relaxed);

    let courses = state.courses.lock().expect("courses lock").clone();
    let total = courses.len();
    Ok(Json(json!({ "courses": courses, "total": total })))
}

async fn get_course(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(course_id): Path<String>,
) -> HandlerResult {
    require_auth(&state, &headers)?;
    state
        .find_course(&course_id)
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Course not found"))
}

async fn create_course(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    let course = json!({
        "_id": format!("c-{}", uuid::Uuid::new_v4()),
        "title": body["title"],
        "price": body["price"],
        "description": body["description"],
    });
    state
        .courses
        .lock()
        .expect("courses lock")
        .push(course.clone());
    Ok(Json(course))
}

async fn filter_by_category(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    let wanted: Vec<&str> = params
        .get("category")
        .map(|raw| raw.split(',').collect())
        .unwrap_or_default();
    let data: Vec<Value> = state
        .courses
        .lock()
        .expect("courses lock")
        .iter()
        .filter(|course| {
            course["category"]
                .as_str()
                .is_some_and(|category| wanted.contains(&category))
        })
        .cloned()
        .collect();
    let total_count = data.len();
    Ok(Json(json!({ "data": data, "totalCount": total_count })))
}

async fn filter_by_instructor(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    let wanted = params.get("instructor").cloned().unwrap_or_default();
    let data: Vec<Value> = state
        .courses
        .lock()
        .expect("courses lock")
        .iter()
        .filter(|course| course["instructor"] == wanted.as_str())
        .cloned()
        .collect();
    let total_count = data.len();
    Ok(Json(json!({ "data": data, "totalCount": total_count })))
}

async fn list_categories(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    let categories = state.categories.lock().expect("categories lock").clone();
    Ok(Json(json!({ "categories": categories })))
}

async fn list_instructors(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    let instructors: Vec<Value> = state
        .users
        .lock()
        .expect("users lock")
        .values()
        .map(|stub_user| stub_user.user.clone())
        .filter(|user| user["role"] == "instructor")
        .collect();
    Ok(Json(json!({ "instructors": instructors })))
}

async fn get_user(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    state
        .users
        .lock()
        .expect("users lock")
        .values()
        .find(|stub_user| stub_user.user["_id"] == user_id.as_str())
        .map(|stub_user| Json(json!({ "data": stub_user.user })))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "User not found"))
}

async fn edit_user(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    let mut users = state.users.lock().expect("users lock");
    let Some(stub_user) = users
        .values_mut()
        .find(|stub_user| stub_user.user["_id"] == user_id.as_str())
    else {
        return Err(error(StatusCode::NOT_FOUND, "User not found"));
    };

    if let Some(patch) = body.as_object() {
        for (key, value) in patch {
            stub_user.user[key] = value.clone();
        }
    }
    Ok(Json(json!({ "data": stub_user.user })))
}

async fn enroll(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    let course_id = body["courseId"].as_str().unwrap_or_default();
    let Some(course) = state.find_course(course_id) else {
        return Err(error(StatusCode::NOT_FOUND, "Course not found"));
    };

    state.enroll_user(&user_id, course.clone());
    Ok(Json(json!({ "course": course })))
}

async fn enrolled_courses(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    let enrolled = state
        .enrolled
        .lock()
        .expect("enrolled lock")
        .get(&user_id)
        .cloned()
        .unwrap_or_default();
    Ok(Json(json!({
        "courses": { "enrolledCourseDetails": enrolled }
    })))
}

async fn get_progress(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path((user_id, course_id)): Path<(String, String)>,
) -> HandlerResult {
    require_auth(&state, &headers)?;

    state
        .progress
        .lock()
        .expect("progress lock")
        .get(&(user_id, course_id))
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Progress not found"))
}

// =============================================================================
// Payment provider doubles
// =============================================================================

/// How a [`ScriptedProvider`] resolves the widget interaction.
#[derive(Debug, Clone)]
pub enum ProviderScript {
    /// Complete payment with the given payment id.
    Complete { payment_id: String },
    /// Invoke the callback with an empty payment id.
    CompleteWithEmptyId,
    /// Dismiss the widget without paying.
    Dismiss,
    /// The widget script fails to load.
    FailLoad,
}

/// A scripted stand-in for the hosted payment widget.
///
/// Records every prompt it is shown so tests can assert on key, order, and
/// prefill data.
pub struct ScriptedProvider {
    script: ProviderScript,
    pub prompts: Mutex<Vec<CheckoutPrompt>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedProvider {
    pub fn new(script: ProviderScript) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// A provider that waits on `gate` inside the widget before resolving,
    /// keeping the attempt in flight until the test releases it.
    pub fn gated(script: ProviderScript, gate: Arc<Notify>) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
            gate: Some(gate),
        }
    }

    fn outcome_for(&self, order_id: OrderId) -> ProviderOutcome {
        match &self.script {
            ProviderScript::Complete { payment_id } => {
                ProviderOutcome::Completed(PaymentConfirmation {
                    payment_id: PaymentId::new(payment_id.clone()),
                    order_id,
                    signature: "sig-stub".to_owned(),
                })
            }
            ProviderScript::CompleteWithEmptyId => {
                ProviderOutcome::Completed(PaymentConfirmation {
                    payment_id: PaymentId::new(""),
                    order_id,
                    signature: "sig-stub".to_owned(),
                })
            }
            ProviderScript::Dismiss => ProviderOutcome::Dismissed,
            ProviderScript::FailLoad => ProviderOutcome::LoadFailed,
        }
    }
}

impl PaymentProvider for ScriptedProvider {
    async fn collect(&self, prompt: CheckoutPrompt) -> ProviderOutcome {
        let order_id = prompt.order.id.clone();
        self.prompts.lock().expect("prompts lock").push(prompt);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.outcome_for(order_id)
    }
}
