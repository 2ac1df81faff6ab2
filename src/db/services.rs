//! High-level database service layer.
//!
//! This module provides repository-agnostic database operations that work with
//! any implementation of the repository traits. These functions contain
//! business logic such as visibility gating, verification-token expiry, and
//! cross-cutting logging that should be consistent regardless of the storage
//! backend.
//!
//! # Architecture
//!
//! The database module follows a layered architecture:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (REST API, background jobs, etc.)    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs) - Business Logic           │
//! │  - Visibility gating                                     │
//! │  - Token expiry handling                                 │
//! │  - Cross-cutting concerns                                │
//! └───────────────────┬─────────────────────────────────────┘
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface    │
//! │  - BoardRepository (boards + ordered items)              │
//! │  - PlannerRepository (planners + dated items)            │
//! │  - CommunityRepository (posts, comments, likes)          │
//! │  - IdentityRepository (users, accounts, sessions)        │
//! │  - LibraryRepository (resources, lessons)                │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                 │
//! ┌───▼──────────────┐     ┌──────────▼──────────────┐
//! │ Postgres         │     │ Local Repository        │
//! │ (Diesel + r2d2)  │     │ (in-memory)             │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use classboard::db::{services, repositories::LocalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!
//!     let posts = services::list_posts(&repo).await?;
//!     println!("Found {} posts", posts.len());
//!
//!     Ok(())
//! }
//! ```

use chrono::Utc;
use log::{info, warn};

use super::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::api::{
    Account, Actor, Board, BoardId, BoardInfo, BoardItem, BoardItemId, BoardStatus, Comment,
    CommentId, CommunityPost, ItemStatus, Lesson, LessonId, Like, LikeTarget, NewAccount,
    NewBoard, NewBoardItem, NewComment, NewLesson, NewPlanner, NewPlannerItem, NewPost,
    NewResource, NewSession, NewUser, Planner, PlannerId, PlannerInfo, PlannerItem, PlannerItemId,
    PostEngagement, PostId, PostInfo, Resource, ResourceId, Session, User, UserId,
    VerificationToken,
};
use crate::services::policy;

// ==================== Health & Connection ====================

/// Check if the database connection is healthy.
///
/// This is a simple pass-through to the repository's health check.
///
/// # Arguments
/// * `repo` - Repository implementation
///
/// # Returns
/// * `Ok(true)` if connection is healthy
/// * `Err` if check fails
pub async fn health_check<R: FullRepository>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Board Operations ====================

/// Create a board owned by a user.
pub async fn create_board<R: FullRepository>(
    repo: &R,
    board: &NewBoard,
) -> RepositoryResult<Board> {
    info!(
        "Service layer: creating board '{}' for user {}",
        board.title, board.owner_id
    );
    repo.create_board(board).await
}

/// Fetch a board on behalf of an actor, enforcing the visibility policy.
///
/// `is_collaborator` is resolved by the caller; sharing grants live outside
/// this crate.
///
/// # Returns
/// * `Ok(Board)` when the actor may view it
/// * `Err(PolicyError)` when visibility denies the read
pub async fn get_board_for<R: FullRepository>(
    repo: &R,
    actor: &Actor,
    board_id: BoardId,
    is_collaborator: bool,
) -> RepositoryResult<Board> {
    let board = repo.get_board(board_id).await?;
    let is_owner = board.owner_id == actor.user_id;
    if !policy::can_view(actor, board.visibility, is_owner, is_collaborator) {
        return Err(RepositoryError::policy(format!(
            "User {} may not view board {}",
            actor.user_id, board_id
        )));
    }
    Ok(board)
}

/// List a user's boards with item counts.
pub async fn list_boards_for_user<R: FullRepository>(
    repo: &R,
    owner_id: UserId,
) -> RepositoryResult<Vec<BoardInfo>> {
    repo.list_boards_for_user(owner_id).await
}

/// Archive a board. Archived boards keep serving reads but reject item
/// writes.
pub async fn archive_board<R: FullRepository>(
    repo: &R,
    board_id: BoardId,
) -> RepositoryResult<Board> {
    info!("Service layer: archiving board {}", board_id);
    repo.set_board_status(board_id, BoardStatus::Archived).await
}

/// Restore an archived board to active.
pub async fn restore_board<R: FullRepository>(
    repo: &R,
    board_id: BoardId,
) -> RepositoryResult<Board> {
    info!("Service layer: restoring board {}", board_id);
    repo.set_board_status(board_id, BoardStatus::Active).await
}

/// Delete a board and everything on it.
///
/// # Returns
/// * `Ok(usize)` - Number of items removed along with the board
pub async fn delete_board<R: FullRepository>(
    repo: &R,
    board_id: BoardId,
) -> RepositoryResult<usize> {
    let removed = repo.delete_board(board_id).await?;
    info!(
        "Service layer: deleted board {} and {} items",
        board_id, removed
    );
    Ok(removed)
}

// ==================== Board Item Ordering ====================

/// Append an item to the end of a board.
pub async fn append_board_item<R: FullRepository>(
    repo: &R,
    board_id: BoardId,
    item: &NewBoardItem,
) -> RepositoryResult<BoardItem> {
    info!(
        "Service layer: appending item '{}' to board {}",
        item.title, board_id
    );
    repo.append_item(board_id, item).await
}

/// Insert an item at a display index. Out-of-range indexes clamp to the
/// nearest end.
pub async fn insert_board_item_at<R: FullRepository>(
    repo: &R,
    board_id: BoardId,
    item: &NewBoardItem,
    index: usize,
) -> RepositoryResult<BoardItem> {
    info!(
        "Service layer: inserting item '{}' into board {} at index {}",
        item.title, board_id, index
    );
    repo.insert_item_at(board_id, item, index).await
}

/// Move an item to a new display index on its own board.
pub async fn move_board_item<R: FullRepository>(
    repo: &R,
    item_id: BoardItemId,
    index: usize,
) -> RepositoryResult<BoardItem> {
    info!(
        "Service layer: moving item {} to index {}",
        item_id, index
    );
    repo.move_item(item_id, index).await
}

/// Move an item onto another board, landing at `index` (or the end).
pub async fn move_item_to_board<R: FullRepository>(
    repo: &R,
    item_id: BoardItemId,
    target_board_id: BoardId,
    index: Option<usize>,
) -> RepositoryResult<BoardItem> {
    info!(
        "Service layer: moving item {} to board {}",
        item_id, target_board_id
    );
    repo.move_item_to_board(item_id, target_board_id, index)
        .await
}

/// List a board's items in display order.
pub async fn list_board_items<R: FullRepository>(
    repo: &R,
    board_id: BoardId,
) -> RepositoryResult<Vec<BoardItem>> {
    repo.list_board_items(board_id).await
}

/// Rewrite a board's positions to evenly spaced values.
///
/// # Returns
/// * `Ok(usize)` - Number of items renumbered
pub async fn reorder_board<R: FullRepository>(
    repo: &R,
    board_id: BoardId,
) -> RepositoryResult<usize> {
    let count = repo.reorder_board(board_id).await?;
    info!(
        "Service layer: renumbered {} items on board {}",
        count, board_id
    );
    Ok(count)
}

/// Advance a board item's workflow status.
pub async fn set_board_item_status<R: FullRepository>(
    repo: &R,
    item_id: BoardItemId,
    status: ItemStatus,
) -> RepositoryResult<BoardItem> {
    repo.set_board_item_status(item_id, status).await
}

/// Reopen a completed board item back to in-progress.
pub async fn reopen_board_item<R: FullRepository>(
    repo: &R,
    item_id: BoardItemId,
) -> RepositoryResult<BoardItem> {
    info!("Service layer: reopening board item {}", item_id);
    repo.reopen_board_item(item_id).await
}

/// Remove an item from its board. Remaining positions are untouched.
pub async fn delete_board_item<R: FullRepository>(
    repo: &R,
    item_id: BoardItemId,
) -> RepositoryResult<()> {
    repo.delete_board_item(item_id).await
}

// ==================== Planner Operations ====================

/// Create a planner. The date window is validated before the write.
pub async fn create_planner<R: FullRepository>(
    repo: &R,
    planner: &NewPlanner,
) -> RepositoryResult<Planner> {
    info!(
        "Service layer: creating planner '{}' ({} to {})",
        planner.title, planner.start_date, planner.end_date
    );
    repo.create_planner(planner).await
}

/// Retrieve a planner by ID.
pub async fn get_planner<R: FullRepository>(
    repo: &R,
    planner_id: PlannerId,
) -> RepositoryResult<Planner> {
    repo.get_planner(planner_id).await
}

/// List a user's planners with item counts.
pub async fn list_planners_for_user<R: FullRepository>(
    repo: &R,
    owner_id: UserId,
) -> RepositoryResult<Vec<PlannerInfo>> {
    repo.list_planners_for_user(owner_id).await
}

/// Delete a planner and its items.
///
/// # Returns
/// * `Ok(usize)` - Number of items removed along with the planner
pub async fn delete_planner<R: FullRepository>(
    repo: &R,
    planner_id: PlannerId,
) -> RepositoryResult<usize> {
    let removed = repo.delete_planner(planner_id).await?;
    info!(
        "Service layer: deleted planner {} and {} items",
        planner_id, removed
    );
    Ok(removed)
}

/// Schedule an item on a planner. The date must fall inside the planner
/// window and the time range must be ordered.
pub async fn add_planner_item<R: FullRepository>(
    repo: &R,
    planner_id: PlannerId,
    item: &NewPlannerItem,
) -> RepositoryResult<PlannerItem> {
    info!(
        "Service layer: adding item '{}' to planner {} on {}",
        item.title, planner_id, item.date
    );
    repo.add_planner_item(planner_id, item).await
}

/// List a planner's items in chronological order.
pub async fn list_planner_items<R: FullRepository>(
    repo: &R,
    planner_id: PlannerId,
) -> RepositoryResult<Vec<PlannerItem>> {
    repo.list_planner_items(planner_id).await
}

/// Advance a planner item's workflow status.
pub async fn set_planner_item_status<R: FullRepository>(
    repo: &R,
    item_id: PlannerItemId,
    status: ItemStatus,
) -> RepositoryResult<PlannerItem> {
    repo.set_planner_item_status(item_id, status).await
}

/// Reopen a completed planner item back to in-progress.
pub async fn reopen_planner_item<R: FullRepository>(
    repo: &R,
    item_id: PlannerItemId,
) -> RepositoryResult<PlannerItem> {
    info!("Service layer: reopening planner item {}", item_id);
    repo.reopen_planner_item(item_id).await
}

// ==================== Community Operations ====================

/// Publish a community post.
pub async fn create_post<R: FullRepository>(
    repo: &R,
    post: &NewPost,
) -> RepositoryResult<CommunityPost> {
    info!(
        "Service layer: creating post '{}' by user {}",
        post.title, post.author_id
    );
    repo.create_post(post).await
}

/// Fetch a post on behalf of an actor, enforcing the visibility policy.
pub async fn get_post_for<R: FullRepository>(
    repo: &R,
    actor: &Actor,
    post_id: PostId,
    is_collaborator: bool,
) -> RepositoryResult<CommunityPost> {
    let post = repo.get_post(post_id).await?;
    let is_owner = post.author_id == actor.user_id;
    if !policy::can_view(actor, post.visibility, is_owner, is_collaborator) {
        return Err(RepositoryError::policy(format!(
            "User {} may not view post {}",
            actor.user_id, post_id
        )));
    }
    Ok(post)
}

/// The community feed, newest first, with engagement counts.
pub async fn list_posts<R: FullRepository>(repo: &R) -> RepositoryResult<Vec<PostInfo>> {
    repo.list_posts().await
}

/// Delete a post with its comments and every like touching either.
///
/// # Returns
/// * `Ok(usize)` - Number of dependent rows removed
pub async fn delete_post<R: FullRepository>(
    repo: &R,
    post_id: PostId,
) -> RepositoryResult<usize> {
    let removed = repo.delete_post(post_id).await?;
    info!(
        "Service layer: deleted post {} and {} dependent rows",
        post_id, removed
    );
    Ok(removed)
}

/// Comment on a post.
pub async fn add_comment<R: FullRepository>(
    repo: &R,
    comment: &NewComment,
) -> RepositoryResult<Comment> {
    repo.add_comment(comment).await
}

/// List a post's comments, oldest first.
pub async fn list_comments_for_post<R: FullRepository>(
    repo: &R,
    post_id: PostId,
) -> RepositoryResult<Vec<Comment>> {
    repo.list_comments_for_post(post_id).await
}

/// Delete a comment and the likes pointing at it.
///
/// # Returns
/// * `Ok(usize)` - Number of likes removed with the comment
pub async fn delete_comment<R: FullRepository>(
    repo: &R,
    comment_id: CommentId,
) -> RepositoryResult<usize> {
    repo.delete_comment(comment_id).await
}

/// Like a post or comment. Repeating the operation returns the stored like.
pub async fn like_content<R: FullRepository>(
    repo: &R,
    user_id: UserId,
    target: LikeTarget,
) -> RepositoryResult<Like> {
    info!(
        "Service layer: user {} likes {} {}",
        user_id,
        target.content_type(),
        target.content_id()
    );
    repo.like(user_id, target).await
}

/// Remove a like. Absent likes are a successful no-op.
///
/// # Returns
/// * `Ok(true)` - A like was removed
/// * `Ok(false)` - Nothing to remove
pub async fn unlike_content<R: FullRepository>(
    repo: &R,
    user_id: UserId,
    target: LikeTarget,
) -> RepositoryResult<bool> {
    repo.unlike(user_id, target).await
}

/// Whether a user currently likes a target.
pub async fn has_liked<R: FullRepository>(
    repo: &R,
    user_id: UserId,
    target: LikeTarget,
) -> RepositoryResult<bool> {
    repo.has_liked(user_id, target).await
}

/// Live like count for a target.
pub async fn like_count<R: FullRepository>(
    repo: &R,
    target: LikeTarget,
) -> RepositoryResult<i64> {
    repo.like_count(target).await
}

/// Comment and like counts for a post.
pub async fn post_engagement<R: FullRepository>(
    repo: &R,
    post_id: PostId,
) -> RepositoryResult<PostEngagement> {
    repo.post_engagement(post_id).await
}

// ==================== Library Operations ====================

/// Add a resource to a user's library.
pub async fn create_resource<R: FullRepository>(
    repo: &R,
    resource: &NewResource,
) -> RepositoryResult<Resource> {
    info!(
        "Service layer: creating resource '{}' for user {}",
        resource.title, resource.owner_id
    );
    repo.create_resource(resource).await
}

/// Fetch a resource on behalf of an actor, enforcing the visibility policy.
pub async fn get_resource_for<R: FullRepository>(
    repo: &R,
    actor: &Actor,
    resource_id: ResourceId,
    is_collaborator: bool,
) -> RepositoryResult<Resource> {
    let resource = repo.get_resource(resource_id).await?;
    let is_owner = resource.owner_id == actor.user_id;
    if !policy::can_view(actor, resource.visibility, is_owner, is_collaborator) {
        return Err(RepositoryError::policy(format!(
            "User {} may not view resource {}",
            actor.user_id, resource_id
        )));
    }
    Ok(resource)
}

/// Create a lesson.
pub async fn create_lesson<R: FullRepository>(
    repo: &R,
    lesson: &NewLesson,
) -> RepositoryResult<Lesson> {
    info!("Service layer: creating lesson '{}'", lesson.title);
    repo.create_lesson(lesson).await
}

/// Attach a resource to a lesson.
///
/// # Returns
/// * `Ok(true)` - A new edge was created
/// * `Ok(false)` - The pair was already attached
pub async fn attach_resource_to_lesson<R: FullRepository>(
    repo: &R,
    lesson_id: LessonId,
    resource_id: ResourceId,
) -> RepositoryResult<bool> {
    info!(
        "Service layer: attaching resource {} to lesson {}",
        resource_id, lesson_id
    );
    repo.attach_resource(lesson_id, resource_id).await
}

/// Detach a resource from a lesson.
///
/// # Returns
/// * `Ok(true)` - An edge was removed
/// * `Ok(false)` - The pair was not attached
pub async fn detach_resource_from_lesson<R: FullRepository>(
    repo: &R,
    lesson_id: LessonId,
    resource_id: ResourceId,
) -> RepositoryResult<bool> {
    repo.detach_resource(lesson_id, resource_id).await
}

/// Delete a lesson, detaching its resource edges and unlinking planner
/// items that referenced it.
///
/// # Returns
/// * `Ok(usize)` - Number of resource edges detached
pub async fn delete_lesson<R: FullRepository>(
    repo: &R,
    lesson_id: LessonId,
) -> RepositoryResult<usize> {
    let detached = repo.delete_lesson(lesson_id).await?;
    info!(
        "Service layer: deleted lesson {} and detached {} resource edges",
        lesson_id, detached
    );
    Ok(detached)
}

/// Resources attached to a lesson, in attach order.
pub async fn resources_for_lesson<R: FullRepository>(
    repo: &R,
    lesson_id: LessonId,
) -> RepositoryResult<Vec<Resource>> {
    repo.resources_for_lesson(lesson_id).await
}

/// Lessons using a resource.
pub async fn lessons_for_resource<R: FullRepository>(
    repo: &R,
    resource_id: ResourceId,
) -> RepositoryResult<Vec<Lesson>> {
    repo.lessons_for_resource(resource_id).await
}

// ==================== Identity Operations ====================

/// Register a user.
pub async fn create_user<R: FullRepository>(repo: &R, user: &NewUser) -> RepositoryResult<User> {
    info!(
        "Service layer: creating user ({})",
        user.email.as_deref().unwrap_or("no email")
    );
    repo.create_user(user).await
}

/// Link a provider account to a user, refreshing tokens on repeat sign-in.
pub async fn upsert_account<R: FullRepository>(
    repo: &R,
    account: &NewAccount,
) -> RepositoryResult<Account> {
    info!(
        "Service layer: upserting {} account for user {}",
        account.provider, account.user_id
    );
    repo.upsert_account(account).await
}

/// Open a session for a user.
pub async fn create_session<R: FullRepository>(
    repo: &R,
    session: &NewSession,
) -> RepositoryResult<Session> {
    repo.create_session(session).await
}

/// Sweep sessions that have expired as of now.
///
/// # Returns
/// * `Ok(usize)` - Number of sessions removed
pub async fn sweep_expired_sessions<R: FullRepository>(repo: &R) -> RepositoryResult<usize> {
    let removed = repo.delete_expired_sessions(Utc::now()).await?;
    if removed > 0 {
        info!("Service layer: swept {} expired sessions", removed);
    }
    Ok(removed)
}

/// Consume a verification token.
///
/// The token is removed whether or not it is still valid, so a token can
/// never be replayed. An expired token is reported as a validation error
/// after removal.
///
/// # Returns
/// * `Ok(VerificationToken)` - The token was valid and has been consumed
/// * `Err(NotFound)` - No such token
/// * `Err(ValidationError)` - The token existed but had expired
pub async fn consume_verification_token<R: FullRepository>(
    repo: &R,
    identifier: &str,
    token: &str,
) -> RepositoryResult<VerificationToken> {
    let stored = repo
        .consume_verification_token(identifier, token)
        .await?
        .ok_or_else(|| {
            RepositoryError::not_found(format!(
                "Verification token for {} not found",
                identifier
            ))
        })?;

    if stored.is_expired(Utc::now()) {
        warn!(
            "Service layer: verification token for {} expired at {}",
            identifier, stored.expires
        );
        return Err(RepositoryError::validation(format!(
            "Verification token for {} expired at {}",
            identifier, stored.expires
        )));
    }

    Ok(stored)
}
