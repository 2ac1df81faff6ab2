//! Community content: posts, their comments, and the polymorphic like ledger.

use crate::api::{CommentId, LikeId, PostId, UserId};
use crate::models::{ContentType, Visibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post in the community feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityPost {
    /// Database ID
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub body: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub author_id: UserId,
    pub title: String,
    pub body: String,
    pub visibility: Visibility,
}

impl NewPost {
    pub fn new(author_id: UserId, title: String, body: String, visibility: Visibility) -> Self {
        Self {
            author_id,
            title,
            body,
            visibility,
        }
    }
}

/// A comment on a post. Deleting the post deletes its comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Database ID
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub author_id: UserId,
    pub body: String,
}

impl NewComment {
    pub fn new(post_id: PostId, author_id: UserId, body: String) -> Self {
        Self {
            post_id,
            author_id,
            body,
        }
    }
}

/// What a like points at.
///
/// This enum is the single place where the variant set maps onto the stored
/// column layout (`content_type`, `content_id`, plus the typed reference
/// columns). Adding a likeable kind means adding a variant here and letting
/// the compiler walk through every match.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LikeTarget {
    Post(PostId),
    Comment(CommentId),
}

impl LikeTarget {
    /// Stored discriminator for this target.
    pub fn content_type(&self) -> ContentType {
        match self {
            LikeTarget::Post(_) => ContentType::Post,
            LikeTarget::Comment(_) => ContentType::Comment,
        }
    }

    /// Raw ID of the liked row, interpreted via [`Self::content_type`].
    pub fn content_id(&self) -> i64 {
        match self {
            LikeTarget::Post(id) => id.value(),
            LikeTarget::Comment(id) => id.value(),
        }
    }

    /// Typed reference columns backing the discriminator pair. Exactly one
    /// side is `Some`, matching the storage CHECK constraint.
    pub fn reference_columns(&self) -> (Option<PostId>, Option<CommentId>) {
        match self {
            LikeTarget::Post(id) => (Some(*id), None),
            LikeTarget::Comment(id) => (None, Some(*id)),
        }
    }

    /// Rebuild a target from stored columns, rejecting rows whose typed
    /// reference disagrees with the discriminator pair.
    pub fn from_columns(
        content_type: ContentType,
        content_id: i64,
        post_id: Option<PostId>,
        comment_id: Option<CommentId>,
    ) -> Result<Self, String> {
        match (content_type, post_id, comment_id) {
            (ContentType::Post, Some(pid), None) if pid.value() == content_id => {
                Ok(LikeTarget::Post(pid))
            }
            (ContentType::Comment, None, Some(cid)) if cid.value() == content_id => {
                Ok(LikeTarget::Comment(cid))
            }
            _ => Err(format!(
                "Inconsistent like shape: content_type={} content_id={} post_id={:?} comment_id={:?}",
                content_type, content_id, post_id, comment_id
            )),
        }
    }
}

/// One user's like of one piece of content.
///
/// Uniqueness of `(user_id, content_type, content_id)` makes like/unlike
/// idempotent per user and target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    /// Database ID
    pub id: LikeId,
    pub user_id: UserId,
    pub content_type: ContentType,
    pub content_id: i64,
    /// Set iff `content_type` is `POST`
    pub post_id: Option<PostId>,
    /// Set iff `content_type` is `COMMENT`
    pub comment_id: Option<CommentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Like {
    /// The typed target of this like, or an error if the stored shape is
    /// inconsistent.
    pub fn target(&self) -> Result<LikeTarget, String> {
        LikeTarget::from_columns(
            self.content_type,
            self.content_id,
            self.post_id,
            self.comment_id,
        )
    }
}
