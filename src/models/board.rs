//! Board aggregate: a board and its explicitly ordered items.

use crate::api::{BoardId, BoardItemId, UserId};
use crate::models::{BoardStatus, ItemStatus, ItemType, Visibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A kanban-style board owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    /// Database ID
    pub id: BoardId,
    /// Owning user
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    /// Archived boards reject item mutations
    pub status: BoardStatus,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a board. New boards start `ACTIVE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBoard {
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: Visibility,
}

impl NewBoard {
    pub fn new(
        owner_id: UserId,
        title: String,
        description: Option<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            owner_id,
            title,
            description,
            visibility,
        }
    }
}

/// A single card on a board.
///
/// `position` is the sparse sort key managed by the ordering service. It is
/// readable through [`BoardItem::position`] but only storage code may assign
/// it; every reposition goes through the repository's ordering operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardItem {
    /// Database ID
    pub id: BoardItemId,
    /// Owning board
    pub board_id: BoardId,
    /// User who created the item
    pub author_id: UserId,
    pub title: String,
    pub content: Option<String>,
    pub item_type: ItemType,
    pub(crate) position: i64,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoardItem {
    /// Sort key within the owning board. Larger sorts later.
    pub fn position(&self) -> i64 {
        self.position
    }
}

/// Input for creating a board item. New items start `TODO`; the board and
/// the position are supplied by the repository operation that places them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBoardItem {
    pub author_id: UserId,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub item_type: ItemType,
}

impl NewBoardItem {
    pub fn new(
        author_id: UserId,
        title: String,
        content: Option<String>,
        item_type: ItemType,
    ) -> Self {
        Self {
            author_id,
            title,
            content,
            item_type,
        }
    }
}
