//! Free enrollment and progress normalization scenarios.

use serde_json::json;

use coursedeck_client::AppState;
use coursedeck_client::api::ApiError;
use coursedeck_client::enrollment::EnrollmentError;
use coursedeck_core::{CourseId, CourseProgress, UserId};
use coursedeck_integration_tests::StubApi;

async fn signed_in_app(stub: &StubApi) -> (AppState, String) {
    let user_id = stub.seed_user("ada@example.com", "hunter2", "student");
    let app = AppState::in_memory(stub.client_config()).expect("Failed to build app state");
    app.hydrate();
    app.login("ada@example.com", "hunter2")
        .await
        .expect("Login failed");
    (app, user_id)
}

#[tokio::test]
async fn test_free_enroll_appends_course_and_zeroes_missing_progress() {
    let stub = StubApi::spawn().await;
    stub.seed_course("c-free", "Open Course", 0.0);
    let (app, user_id) = signed_in_app(&stub).await;

    let course = app
        .enroll_free(&CourseId::new("c-free"))
        .await
        .expect("Enrollment failed");
    assert_eq!(course.id, CourseId::new("c-free"));
    assert!(app.enrollment().is_enrolled(&CourseId::new("c-free")));
    assert_eq!(stub.enrolled_ids(&user_id), vec!["c-free".to_owned()]);

    // No progress document exists: the mirror gets the zeroed record, not
    // an error.
    let progress = app
        .enrollment()
        .progress(&CourseId::new("c-free"))
        .expect("Progress missing from mirror");
    assert_eq!(
        progress,
        CourseProgress::zeroed(UserId::new(user_id), CourseId::new("c-free"))
    );
}

#[tokio::test]
async fn test_existing_progress_document_is_mirrored() {
    let stub = StubApi::spawn().await;
    stub.seed_course("c-1", "Course One", 250.0);
    let (app, user_id) = signed_in_app(&stub).await;

    stub.seed_progress(
        &user_id,
        "c-1",
        json!({
            "courseId": "c-1",
            "userId": user_id,
            "completedLessonsCount": 2,
            "completedVideosCount": 1,
            "totalLessonsCount": 4,
            "totalVideosCount": 2,
            "completedLessons": ["l-1", "l-2"],
            "completedVideos": ["v-1"],
            "courseCompletionPercentage": 50.0
        }),
    );

    app.enroll_free(&CourseId::new("c-1"))
        .await
        .expect("Enrollment failed");

    let progress = app
        .enrollment()
        .progress(&CourseId::new("c-1"))
        .expect("Progress missing from mirror");
    assert_eq!(progress.completed_lessons_count, 2);
    assert_eq!(progress.total_lessons_count, 4);
    assert_eq!(progress.completed_lessons.len(), 2);
    assert!((progress.course_completion_percentage - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_enroll_failure_leaves_mirror_untouched() {
    let stub = StubApi::spawn().await;
    let (app, _user_id) = signed_in_app(&stub).await;

    let result = app.enroll_free(&CourseId::new("c-missing")).await;
    match result {
        Err(EnrollmentError::Rejected(message)) => {
            assert_eq!(message, "Course not found");
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }
    assert!(app.enrollment().enrolled_courses().is_empty());
    assert!(
        app.enrollment()
            .progress(&CourseId::new("c-missing"))
            .is_none()
    );
}

#[tokio::test]
async fn test_missing_progress_surfaces_as_not_found_at_the_api() {
    let stub = StubApi::spawn().await;
    let (app, user_id) = signed_in_app(&stub).await;

    let result = app
        .api()
        .fetch_progress(&UserId::new(user_id), &CourseId::new("c-unseen"))
        .await;
    match result {
        Err(ApiError::NotFound(message)) => assert_eq!(message, "Progress not found"),
        other => panic!("Expected NotFound, got {other:?}"),
    }
}
