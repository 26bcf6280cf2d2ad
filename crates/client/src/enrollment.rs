//! Enrollment reconciler: local mirror of the server-owned enrollment set.
//!
//! Enrollment records are owned by the server; this container mirrors the
//! signed-in user's enrolled courses and their progress records, and keeps
//! the mirror consistent after free enrollments and settled checkouts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::instrument;

use coursedeck_core::{CourseId, CourseProgress, UserId};

use crate::api::types::Course;
use crate::api::{ApiClient, ApiError};
use crate::store::vault::EnrollmentSnapshot;

/// Server message identifying the absent-progress-document case.
const PROGRESS_NOT_FOUND: &str = "Progress not found";

/// Errors from enrollment operations.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// The server rejected the enrollment; carries its message.
    #[error("{0}")]
    Rejected(String),

    /// Transport or protocol failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Default)]
struct EnrollmentState {
    courses: Vec<Course>,
    progress: HashMap<CourseId, CourseProgress>,
}

/// The enrollment mirror and its reconciliation operations.
#[derive(Clone)]
pub struct EnrollmentReconciler {
    inner: Arc<EnrollmentReconcilerInner>,
}

struct EnrollmentReconcilerInner {
    api: ApiClient,
    state: RwLock<EnrollmentState>,
}

impl EnrollmentReconciler {
    /// Create an empty mirror.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(EnrollmentReconcilerInner {
                api,
                state: RwLock::new(EnrollmentState::default()),
            }),
        }
    }

    /// The mirrored enrolled courses.
    #[must_use]
    pub fn enrolled_courses(&self) -> Vec<Course> {
        self.read().courses.clone()
    }

    /// Whether the user is enrolled in a course, per the mirror.
    #[must_use]
    pub fn is_enrolled(&self, course_id: &CourseId) -> bool {
        self.read().courses.iter().any(|c| &c.id == course_id)
    }

    /// The mirrored progress record for a course, if fetched.
    #[must_use]
    pub fn progress(&self, course_id: &CourseId) -> Option<CourseProgress> {
        self.read().progress.get(course_id).cloned()
    }

    /// Enroll in a free course and merge it into the mirror.
    ///
    /// On failure nothing is mutated - the mirror never holds a course the
    /// server did not confirm.
    ///
    /// # Errors
    ///
    /// Returns [`EnrollmentError::Rejected`] with the server's message, or
    /// [`EnrollmentError::Api`] for transport failures.
    #[instrument(skip(self), fields(user_id = %user_id, course_id = %course_id))]
    pub async fn enroll_free(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Course, EnrollmentError> {
        let course = self
            .inner
            .api
            .enroll(user_id, course_id)
            .await
            .map_err(reject_message)?;

        {
            let mut state = self.write();
            if !state.courses.iter().any(|c| c.id == course.id) {
                state.courses.push(course.clone());
            }
        }

        self.refresh_progress(user_id).await;

        Ok(course)
    }

    /// Reconcile after a settled checkout: refetch the enrolled set, then
    /// refresh progress for every enrolled course.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrolled-course fetch fails; the previous
    /// mirror is kept in that case.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn reconcile_after_purchase(&self, user_id: &UserId) -> Result<(), EnrollmentError> {
        let courses = self.inner.api.fetch_enrolled_courses(user_id).await?;
        self.write().courses = courses;

        self.refresh_progress(user_id).await;
        Ok(())
    }

    /// (Re)fetch progress for every mirrored course.
    ///
    /// A 404 `Progress not found` answer is a normal case - the user has
    /// not opened the course yet - and is normalized into a zeroed record.
    /// Other failures degrade to a warning and leave that course's previous
    /// record in place.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn refresh_progress(&self, user_id: &UserId) {
        let course_ids: Vec<CourseId> =
            self.read().courses.iter().map(|c| c.id.clone()).collect();

        for course_id in course_ids {
            match self.fetch_progress_normalized(user_id, &course_id).await {
                Ok(progress) => {
                    self.write().progress.insert(course_id, progress);
                }
                Err(e) => {
                    tracing::warn!(
                        course_id = %course_id,
                        error = %e,
                        "Failed to refresh course progress"
                    );
                }
            }
        }
    }

    /// Fetch one progress record, normalizing the absent-document case.
    async fn fetch_progress_normalized(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<CourseProgress, ApiError> {
        match self.inner.api.fetch_progress(user_id, course_id).await {
            Ok(progress) => Ok(progress),
            Err(ApiError::NotFound(message)) if message == PROGRESS_NOT_FOUND => Ok(
                CourseProgress::zeroed(user_id.clone(), course_id.clone()),
            ),
            Err(e) => Err(e),
        }
    }

    /// Reset the mirror. Called on logout.
    pub fn clear(&self) {
        let mut state = self.write();
        state.courses.clear();
        state.progress.clear();
    }

    /// Snapshot for the persistence vault.
    pub(crate) fn snapshot(&self) -> EnrollmentSnapshot {
        let state = self.read();
        EnrollmentSnapshot {
            courses: state.courses.clone(),
            progress: state.progress.clone(),
        }
    }

    /// Restore from a persisted snapshot.
    pub(crate) fn restore(&self, snapshot: EnrollmentSnapshot) {
        let mut state = self.write();
        state.courses = snapshot.courses;
        state.progress = snapshot.progress;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, EnrollmentState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, EnrollmentState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Enrollment rejections surface the server message; transport failures
/// stay typed.
fn reject_message(error: ApiError) -> EnrollmentError {
    match error {
        ApiError::Api { message, .. } | ApiError::NotFound(message) if !message.is_empty() => {
            EnrollmentError::Rejected(message)
        }
        other => EnrollmentError::Api(other),
    }
}
