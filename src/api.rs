//! Public API surface for the data-access core.
//!
//! This file consolidates the ID newtypes, the acting-user context, and the
//! listing DTOs, and re-exports the entity model so callers reach the whole
//! surface through one module.
//! All types derive Serialize/Deserialize for JSON serialization.

pub use crate::models::board::{Board, BoardItem, NewBoard, NewBoardItem};
pub use crate::models::community::{
    Comment, CommunityPost, Like, LikeTarget, NewComment, NewPost,
};
pub use crate::models::enums::{
    BoardStatus, ContentType, ItemStatus, ItemType, ResourceType, Role, Visibility,
};
pub use crate::models::identity::{
    Account, NewAccount, NewSession, NewUser, Session, User, VerificationToken,
};
pub use crate::models::library::{Lesson, NewLesson, NewResource, Resource};
pub use crate::models::planner::{NewPlanner, NewPlannerItem, Planner, PlannerItem};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

crate::define_id_type!(i64, UserId);
crate::define_id_type!(i64, AccountId);
crate::define_id_type!(i64, SessionId);
crate::define_id_type!(i64, BoardId);
crate::define_id_type!(i64, BoardItemId);
crate::define_id_type!(i64, PlannerId);
crate::define_id_type!(i64, PlannerItemId);
crate::define_id_type!(i64, ResourceId);
crate::define_id_type!(i64, LessonId);
crate::define_id_type!(i64, PostId);
crate::define_id_type!(i64, CommentId);
crate::define_id_type!(i64, LikeId);

/// The user an operation runs on behalf of.
///
/// Carries just enough for the policy checks: who they are and their role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Listing row for a user's boards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInfo {
    pub board_id: BoardId,
    pub title: String,
    pub status: BoardStatus,
    pub visibility: Visibility,
    pub item_count: i64,
}

/// Listing row for a user's planners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerInfo {
    pub planner_id: PlannerId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub item_count: i64,
}

/// Listing row for the community feed, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostInfo {
    pub post_id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub visibility: Visibility,
    pub comment_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Comment and like totals for a single post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEngagement {
    pub post_id: PostId,
    pub comment_count: i64,
    pub like_count: i64,
}
