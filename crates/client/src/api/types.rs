//! Wire types for the marketplace REST API.
//!
//! Field names follow the server's JSON exactly (`_id`, `profilePicture`,
//! `courseIds`, `razorpay_payment_id`, ...); the Rust side stays snake_case
//! through explicit renames.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use coursedeck_core::{CategoryId, CourseId, OrderId, PaymentId, Role, UserId};

// =============================================================================
// Users & Auth
// =============================================================================

/// A marketplace user (student or instructor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    /// Absolute URL after normalization; the server may return a relative,
    /// backslash-separated upload path.
    #[serde(rename = "profilePicture", default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl User {
    /// Display name used for payment prefill.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Credentials for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Response of `POST /login` and `POST /register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub data: User,
    pub token: String,
}

/// Partial profile update for `POST /user/edit/:id`.
///
/// Absent fields are left unchanged by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Envelope for single-user responses (`GET /user/:id`, `POST /user/edit/:id`).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserEnvelope {
    pub data: User,
}

/// Response of `GET /instructors`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InstructorsResponse {
    pub instructors: Vec<User>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A published course as returned by the catalog endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(rename = "instructorName", default, skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A course category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
}

/// Response of `GET /categories`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CategoriesResponse {
    pub categories: Vec<Category>,
}

/// A page of catalog results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseList {
    pub courses: Vec<Course>,
    pub total: u64,
}

/// Response shape of the filter endpoints (`data` / `totalCount` instead of
/// `courses` / `total`).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FilteredCourses {
    pub data: Vec<Course>,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

impl From<FilteredCourses> for CourseList {
    fn from(filtered: FilteredCourses) -> Self {
        Self {
            courses: filtered.data,
            total: filtered.total_count,
        }
    }
}

/// Payload for `POST /course/create`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

// =============================================================================
// Enrollment & Progress
// =============================================================================

/// Payload for `POST /user/enroll/:userId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EnrollRequest {
    #[serde(rename = "courseId")]
    pub course_id: CourseId,
}

/// Response of `POST /user/enroll/:userId`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnrollResponse {
    pub course: Course,
}

/// Response of `GET /user/enrolled-courses/:userId`.
///
/// The server nests the list one level deeper than the other endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnrolledCoursesResponse {
    pub courses: EnrolledCourseSet,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnrolledCourseSet {
    #[serde(rename = "enrolledCourseDetails", default)]
    pub enrolled_course_details: Vec<Course>,
}

// =============================================================================
// Payment
// =============================================================================

/// Response of `GET /getkey`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProviderKeyResponse {
    pub key: String,
}

/// Payload for `POST /checkout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "courseIds")]
    pub course_ids: Vec<CourseId>,
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

/// Response of `POST /checkout`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CheckoutResponse {
    pub order: Order,
}

/// A payment-provider order, created per checkout attempt.
///
/// Ephemeral: discarded when the attempt settles or is reset, never
/// persisted across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Amount in the provider's smallest currency unit.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
}

/// The payment-provider callback payload, consumed exactly once per attempt.
///
/// Wire names are the provider's (`razorpay_*`), both in the callback and in
/// the verification request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(rename = "razorpay_payment_id")]
    pub payment_id: PaymentId,
    #[serde(rename = "razorpay_order_id")]
    pub order_id: OrderId,
    #[serde(rename = "razorpay_signature")]
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_wire_names() {
        let json = serde_json::json!({
            "_id": "u-1",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "role": "Student",
            "profilePicture": "uploads\\ada.jpg"
        });
        let user: User = serde_json::from_value(json).expect("deserialize");
        assert_eq!(user.id, UserId::new("u-1"));
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_course_price_from_number() {
        let json = serde_json::json!({
            "_id": "c-1",
            "title": "Rust for Web",
            "price": 499.0,
            "instructorName": "Grace Hopper"
        });
        let course: Course = serde_json::from_value(json).expect("deserialize");
        assert_eq!(course.price, Decimal::from(499));
        assert_eq!(course.instructor_name.as_deref(), Some("Grace Hopper"));
        assert!(course.created_at.is_none());
    }

    #[test]
    fn test_checkout_request_wire_names() {
        let request = CheckoutRequest {
            amount: Decimal::from(300),
            course_ids: vec![CourseId::new("a"), CourseId::new("b")],
            user_id: UserId::new("u-1"),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["amount"], 300.0);
        assert_eq!(json["courseIds"][0], "a");
        assert_eq!(json["userId"], "u-1");
    }

    #[test]
    fn test_payment_confirmation_wire_names() {
        let confirmation = PaymentConfirmation {
            payment_id: PaymentId::new("pay_123"),
            order_id: OrderId::new("order_456"),
            signature: "sig".to_string(),
        };
        let json = serde_json::to_value(&confirmation).expect("serialize");
        assert_eq!(json["razorpay_payment_id"], "pay_123");
        assert_eq!(json["razorpay_order_id"], "order_456");
        assert_eq!(json["razorpay_signature"], "sig");
    }

    #[test]
    fn test_enrolled_courses_nested_shape() {
        let json = serde_json::json!({
            "courses": {
                "enrolledCourseDetails": [
                    {"_id": "c-1", "title": "Intro", "price": 0.0}
                ]
            }
        });
        let response: EnrolledCoursesResponse =
            serde_json::from_value(json).expect("deserialize");
        assert_eq!(response.courses.enrolled_course_details.len(), 1);
    }
}
