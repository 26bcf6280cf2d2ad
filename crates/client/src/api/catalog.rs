//! Course catalog endpoints.
//!
//! Listing and detail reads are cached (5 minute TTL); the filter endpoints
//! are not, matching their ad-hoc query parameters.

use tracing::{debug, instrument};

use coursedeck_core::{CategoryId, CourseId, UserId};

use super::types::{
    CategoriesResponse, Category, Course, CourseList, FilteredCourses, InstructorsResponse,
    NewCourse, User,
};
use super::{ApiClient, ApiError, CacheValue};

impl ApiClient {
    /// Fetch the course listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_courses(&self) -> Result<CourseList, ApiError> {
        // Check cache
        if let Some(CacheValue::Courses(listing)) = self.cache_get("courses").await {
            debug!("Cache hit for course listing");
            return Ok(listing);
        }

        let mut listing: CourseList = self.get_json("/courses").await?;
        for course in &mut listing.courses {
            self.normalize_course(course);
        }

        self.cache_insert("courses".to_owned(), CacheValue::Courses(listing.clone()))
            .await;

        Ok(listing)
    }

    /// Fetch a single course by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the course is not found or the request fails.
    #[instrument(skip(self), fields(course_id = %course_id))]
    pub async fn fetch_course(&self, course_id: &CourseId) -> Result<Course, ApiError> {
        let cache_key = format!("course:{course_id}");

        if let Some(CacheValue::Course(course)) = self.cache_get(&cache_key).await {
            debug!("Cache hit for course");
            return Ok(*course);
        }

        let mut course: Course = self.get_json(&format!("/course/{course_id}")).await?;
        self.normalize_course(&mut course);

        self.cache_insert(cache_key, CacheValue::Course(Box::new(course.clone())))
            .await;

        Ok(course)
    }

    /// Publish a new course and invalidate the cached listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the course is rejected or the request fails.
    #[instrument(skip(self, course), fields(title = %course.title))]
    pub async fn create_course(&self, course: &NewCourse) -> Result<Course, ApiError> {
        let mut created: Course = self.post_json("/course/create", course).await?;
        self.normalize_course(&mut created);

        self.invalidate_course_listing().await;

        Ok(created)
    }

    /// Fetch courses in any of the given categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, categories))]
    pub async fn filter_by_category(
        &self,
        categories: &[CategoryId],
    ) -> Result<CourseList, ApiError> {
        let joined = categories
            .iter()
            .map(CategoryId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let filtered: FilteredCourses = self
            .get_json(&format!("/course/filter/category?category={joined}"))
            .await?;

        let mut listing = CourseList::from(filtered);
        for course in &mut listing.courses {
            self.normalize_course(course);
        }
        Ok(listing)
    }

    /// Fetch courses taught by one instructor.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(instructor_id = %instructor_id))]
    pub async fn filter_by_instructor(
        &self,
        instructor_id: &UserId,
    ) -> Result<CourseList, ApiError> {
        let filtered: FilteredCourses = self
            .get_json(&format!(
                "/course/filter/instructor?instructor={instructor_id}"
            ))
            .await?;

        let mut listing = CourseList::from(filtered);
        for course in &mut listing.courses {
            self.normalize_course(course);
        }
        Ok(listing)
    }

    /// Fetch the course categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) = self.cache_get("categories").await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let response: CategoriesResponse = self.get_json("/categories").await?;

        self.cache_insert(
            "categories".to_owned(),
            CacheValue::Categories(response.categories.clone()),
        )
        .await;

        Ok(response.categories)
    }

    /// Fetch all instructors.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_instructors(&self) -> Result<Vec<User>, ApiError> {
        if let Some(CacheValue::Instructors(instructors)) = self.cache_get("instructors").await {
            debug!("Cache hit for instructors");
            return Ok(instructors);
        }

        let response: InstructorsResponse = self.get_json("/instructors").await?;
        let mut instructors = response.instructors;
        for instructor in &mut instructors {
            self.normalize_user(instructor);
        }

        self.cache_insert(
            "instructors".to_owned(),
            CacheValue::Instructors(instructors.clone()),
        )
        .await;

        Ok(instructors)
    }
}
