//! Core board repository trait: board CRUD plus the ordered item operations.
//!
//! Boards are the one scope with an explicit position key, so every
//! operation that could change relative order lives here and nowhere else.
//! Implementations keep each ordering operation atomic with respect to
//! concurrent operations on the same board.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{BoardId, BoardInfo, BoardItemId, UserId};
use crate::models::{Board, BoardItem, BoardStatus, ItemStatus, ItemType, NewBoard, NewBoardItem, Visibility};

/// Repository trait for boards and their ordered items.
///
/// Position values never appear in this interface: callers speak in indexes
/// (`0 = first`), and the implementation translates them into sparse position
/// keys via the ordering service. That keeps every stored position consistent
/// with the one allocation algorithm.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait BoardRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the storage backend is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if the backend is reachable
    /// - `Ok(false)` if unreachable but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Board Operations ====================

    /// Create a board. New boards start `ACTIVE`.
    async fn create_board(&self, board: &NewBoard) -> RepositoryResult<Board>;

    /// Retrieve a board by ID.
    ///
    /// # Returns
    /// * `Ok(Board)` - The board
    /// * `Err(RepositoryError::NotFound)` - If the board doesn't exist
    async fn get_board(&self, board_id: BoardId) -> RepositoryResult<Board>;

    /// List a user's boards with item counts, newest first.
    async fn list_boards_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<BoardInfo>>;

    /// Replace a board's editable fields.
    async fn update_board(
        &self,
        board_id: BoardId,
        title: &str,
        description: Option<&str>,
        visibility: Visibility,
    ) -> RepositoryResult<Board>;

    /// Set a board's lifecycle status (archive / restore).
    async fn set_board_status(
        &self,
        board_id: BoardId,
        status: BoardStatus,
    ) -> RepositoryResult<Board>;

    /// Delete a board and cascade-delete its items.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of items deleted along with the board
    /// * `Err(RepositoryError::NotFound)` - If the board doesn't exist
    async fn delete_board(&self, board_id: BoardId) -> RepositoryResult<usize>;

    // ==================== Item Operations ====================

    /// Retrieve a single item by ID.
    async fn get_board_item(&self, item_id: BoardItemId) -> RepositoryResult<BoardItem>;

    /// All items of a board in their effective order (ascending position).
    async fn list_board_items(&self, board_id: BoardId) -> RepositoryResult<Vec<BoardItem>>;

    /// Append an item at the end of the board.
    ///
    /// The new item is guaranteed to sort last. Rejected with
    /// `PolicyError` when the board is archived.
    async fn append_item(
        &self,
        board_id: BoardId,
        item: &NewBoardItem,
    ) -> RepositoryResult<BoardItem>;

    /// Insert an item so it lands at `index` in the board's order.
    ///
    /// Out-of-range indexes clamp to the nearest end; this never errors on
    /// index. At most one row is written unless the surrounding position gap
    /// is exhausted, in which case the whole board is renumbered in the same
    /// transaction.
    async fn insert_item_at(
        &self,
        board_id: BoardId,
        item: &NewBoardItem,
        index: usize,
    ) -> RepositoryResult<BoardItem>;

    /// Move an existing item so it ends up at `index` on its own board.
    ///
    /// Moving an item to its current index is a no-op (no write). Atomic
    /// with respect to concurrent moves on the same board.
    async fn move_item(&self, item_id: BoardItemId, index: usize) -> RepositoryResult<BoardItem>;

    /// Reparent an item onto another board.
    ///
    /// Treated as delete-from-source plus insert-into-target; the source
    /// position is never carried over. `index = None` appends.
    async fn move_item_to_board(
        &self,
        item_id: BoardItemId,
        target_board_id: BoardId,
        index: Option<usize>,
    ) -> RepositoryResult<BoardItem>;

    /// Renumber every item of the board to evenly spaced positions.
    ///
    /// Used for compaction or external data repair; relative order is
    /// preserved.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of items renumbered
    async fn reorder_board(&self, board_id: BoardId) -> RepositoryResult<usize>;

    /// Replace an item's editable fields. Never touches position or status.
    async fn update_board_item(
        &self,
        item_id: BoardItemId,
        title: &str,
        content: Option<&str>,
        item_type: ItemType,
    ) -> RepositoryResult<BoardItem>;

    /// Advance an item's workflow status.
    ///
    /// Same-status writes are idempotent no-ops. Backward writes are
    /// rejected with `PolicyError`; use [`Self::reopen_board_item`] to pull
    /// a completed item back into progress.
    async fn set_board_item_status(
        &self,
        item_id: BoardItemId,
        status: ItemStatus,
    ) -> RepositoryResult<BoardItem>;

    /// Explicitly reopen a completed item (`COMPLETED -> IN_PROGRESS`).
    async fn reopen_board_item(&self, item_id: BoardItemId) -> RepositoryResult<BoardItem>;

    /// Delete an item. Leaves the remaining positions untouched (gaps are
    /// fine; only insertion can trigger renumbering).
    async fn delete_board_item(&self, item_id: BoardItemId) -> RepositoryResult<()>;
}
