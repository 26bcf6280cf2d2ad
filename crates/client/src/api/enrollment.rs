//! Enrollment and progress endpoints.

use tracing::instrument;

use coursedeck_core::{CourseId, CourseProgress, UserId};

use super::types::{Course, EnrollRequest, EnrollResponse, EnrolledCoursesResponse};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Enroll a user in a course (free enrollment or post-payment).
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is rejected or the request fails.
    #[instrument(skip(self), fields(user_id = %user_id, course_id = %course_id))]
    pub async fn enroll(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Course, ApiError> {
        let request = EnrollRequest {
            course_id: course_id.clone(),
        };
        let response: EnrollResponse = self
            .post_json(&format!("/user/enroll/{user_id}"), &request)
            .await?;

        let mut course = response.course;
        self.normalize_course(&mut course);
        Ok(course)
    }

    /// Fetch the user's enrolled courses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn fetch_enrolled_courses(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Course>, ApiError> {
        let response: EnrolledCoursesResponse = self
            .get_json(&format!("/user/enrolled-courses/{user_id}"))
            .await?;

        let mut courses = response.courses.enrolled_course_details;
        for course in &mut courses {
            self.normalize_course(course);
        }
        Ok(courses)
    }

    /// Fetch one course's progress record for a user.
    ///
    /// A course the user has never opened has no progress document; the
    /// server answers 404 with the message `Progress not found`, surfaced
    /// here as [`ApiError::NotFound`]. The enrollment reconciler normalizes
    /// that case into a zeroed record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is absent or the request fails.
    #[instrument(skip(self), fields(user_id = %user_id, course_id = %course_id))]
    pub async fn fetch_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<CourseProgress, ApiError> {
        self.get_json(&format!("/progress/{user_id}/{course_id}"))
            .await
    }
}
