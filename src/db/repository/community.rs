//! Community repository trait: posts, comments, and the engagement ledger.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{CommentId, PostEngagement, PostId, PostInfo, UserId};
use crate::models::{Comment, CommunityPost, Like, LikeTarget, NewComment, NewPost};

/// Repository trait for community content and likes.
///
/// The like operations take a [`LikeTarget`] so the polymorphic column shape
/// is built in exactly one place. A `(user, target)` pair is either liked or
/// not; `like` and `unlike` are idempotent transitions between those two
/// states and never fail on repetition.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait CommunityRepository: Send + Sync {
    // ==================== Post Operations ====================

    /// Create a post.
    async fn create_post(&self, post: &NewPost) -> RepositoryResult<CommunityPost>;

    /// Retrieve a post by ID.
    async fn get_post(&self, post_id: PostId) -> RepositoryResult<CommunityPost>;

    /// The community feed with engagement counts, newest first.
    async fn list_posts(&self) -> RepositoryResult<Vec<PostInfo>>;

    /// Delete a post, cascading to its comments and every like attached to
    /// the post or those comments.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of comments and likes removed with the post
    async fn delete_post(&self, post_id: PostId) -> RepositoryResult<usize>;

    // ==================== Comment Operations ====================

    /// Add a comment to a post.
    async fn add_comment(&self, comment: &NewComment) -> RepositoryResult<Comment>;

    /// Retrieve a comment by ID.
    async fn get_comment(&self, comment_id: CommentId) -> RepositoryResult<Comment>;

    /// All comments of a post, oldest first.
    async fn list_comments_for_post(&self, post_id: PostId) -> RepositoryResult<Vec<Comment>>;

    /// Delete a comment and its likes.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of likes removed with the comment
    async fn delete_comment(&self, comment_id: CommentId) -> RepositoryResult<usize>;

    // ==================== Engagement Ledger ====================

    /// Record that `user_id` likes `target`.
    ///
    /// Idempotent: if the like already exists the stored record is returned
    /// unchanged. The target must exist (`NotFound` otherwise), checked in
    /// the same transaction as the write so a concurrent target deletion
    /// cannot leave a dangling like.
    async fn like(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<Like>;

    /// Remove `user_id`'s like of `target` if present.
    ///
    /// # Returns
    /// * `Ok(true)` - A like was removed
    /// * `Ok(false)` - No like existed; not an error
    async fn unlike(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<bool>;

    /// Whether `user_id` currently likes `target`.
    async fn has_liked(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<bool>;

    /// Live like count for `target`.
    async fn like_count(&self, target: LikeTarget) -> RepositoryResult<i64>;

    /// Comment and like totals for one post.
    async fn post_engagement(&self, post_id: PostId) -> RepositoryResult<PostEngagement>;
}
