//! Library repository trait: resources, lessons, and the edges between them.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{LessonId, ResourceId, UserId};
use crate::models::{Lesson, NewLesson, NewResource, Resource, ResourceType, Visibility};

/// Repository trait for the teaching library.
///
/// Lesson and resource share an unowned many-to-many: deleting either side
/// detaches the edges without touching the other side's rows.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    // ==================== Resources ====================

    /// Create a resource.
    async fn create_resource(&self, resource: &NewResource) -> RepositoryResult<Resource>;

    /// Retrieve a resource by ID.
    async fn get_resource(&self, resource_id: ResourceId) -> RepositoryResult<Resource>;

    /// List a user's resources, newest first.
    async fn list_resources_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<Resource>>;

    /// Replace a resource's editable fields.
    async fn update_resource(
        &self,
        resource_id: ResourceId,
        title: &str,
        description: Option<&str>,
        url: Option<&str>,
        resource_type: ResourceType,
        visibility: Visibility,
    ) -> RepositoryResult<Resource>;

    /// Delete a resource, detaching it from any lessons.
    async fn delete_resource(&self, resource_id: ResourceId) -> RepositoryResult<()>;

    // ==================== Lessons ====================

    /// Create a lesson.
    async fn create_lesson(&self, lesson: &NewLesson) -> RepositoryResult<Lesson>;

    /// Retrieve a lesson by ID.
    async fn get_lesson(&self, lesson_id: LessonId) -> RepositoryResult<Lesson>;

    /// All lessons, newest first.
    async fn list_lessons(&self) -> RepositoryResult<Vec<Lesson>>;

    /// Delete a lesson. Detaches its resource edges and clears the lesson
    /// link on any planner item that referenced it; neither the resources
    /// nor the planner items themselves are deleted.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of resource edges detached
    async fn delete_lesson(&self, lesson_id: LessonId) -> RepositoryResult<usize>;

    // ==================== Lesson/Resource Edges ====================

    /// Attach a resource to a lesson.
    ///
    /// # Returns
    /// * `Ok(true)` - The edge was created
    /// * `Ok(false)` - The edge already existed; not an error
    async fn attach_resource(
        &self,
        lesson_id: LessonId,
        resource_id: ResourceId,
    ) -> RepositoryResult<bool>;

    /// Detach a resource from a lesson.
    ///
    /// # Returns
    /// * `Ok(true)` - The edge was removed
    /// * `Ok(false)` - No such edge; not an error
    async fn detach_resource(
        &self,
        lesson_id: LessonId,
        resource_id: ResourceId,
    ) -> RepositoryResult<bool>;

    /// Resources attached to a lesson.
    async fn resources_for_lesson(&self, lesson_id: LessonId) -> RepositoryResult<Vec<Resource>>;

    /// Lessons a resource is attached to.
    async fn lessons_for_resource(&self, resource_id: ResourceId) -> RepositoryResult<Vec<Lesson>>;
}
