//! Per-user-per-course progress counters.

use serde::{Deserialize, Serialize};

use crate::types::id::{CourseId, LessonId, UserId, VideoId};

/// Completion counters for one user in one course.
///
/// Mirrors the progress document returned by `GET /progress/:userId/:courseId`.
/// A course the user has never opened has no progress document on the server;
/// that case is represented by [`CourseProgress::zeroed`], not by an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub completed_lessons_count: u32,
    pub completed_videos_count: u32,
    pub total_lessons_count: u32,
    pub total_videos_count: u32,
    #[serde(default)]
    pub completed_lessons: Vec<LessonId>,
    #[serde(default)]
    pub completed_videos: Vec<VideoId>,
    pub course_completion_percentage: f64,
}

impl CourseProgress {
    /// Progress record for a course with no server-side progress document.
    ///
    /// All counters are zero and the completion lists are empty.
    #[must_use]
    pub const fn zeroed(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            course_id,
            user_id,
            completed_lessons_count: 0,
            completed_videos_count: 0,
            total_lessons_count: 0,
            total_videos_count: 0,
            completed_lessons: Vec::new(),
            completed_videos: Vec::new(),
            course_completion_percentage: 0.0,
        }
    }

    /// Whether every lesson and video in the course is complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        (self.course_completion_percentage - 100.0).abs() < f64::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_progress() {
        let progress = CourseProgress::zeroed(UserId::new("u-1"), CourseId::new("c-1"));
        assert_eq!(progress.completed_lessons_count, 0);
        assert_eq!(progress.total_videos_count, 0);
        assert!(progress.completed_lessons.is_empty());
        assert!((progress.course_completion_percentage - 0.0).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_progress_wire_names() {
        let json = serde_json::json!({
            "courseId": "c-9",
            "userId": "u-2",
            "completedLessonsCount": 2,
            "completedVideosCount": 1,
            "totalLessonsCount": 4,
            "totalVideosCount": 3,
            "completedLessons": ["l-1", "l-2"],
            "completedVideos": ["v-1"],
            "courseCompletionPercentage": 50.0
        });
        let progress: CourseProgress = serde_json::from_value(json).expect("deserialize");
        assert_eq!(progress.course_id, CourseId::new("c-9"));
        assert_eq!(progress.completed_lessons.len(), 2);
        assert!((progress.course_completion_percentage - 50.0).abs() < f64::EPSILON);
    }
}
