//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory using HashMap and Vec structures, providing fast, deterministic,
//! and isolated execution.
//!
//! Writes take the single data lock for their whole duration, which gives
//! every operation the same atomicity the Postgres backend gets from a
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::api::*;
use crate::db::repository::*;
use crate::services::{ordering, policy, validation};

/// In-memory local repository.
///
/// This implementation stores all data in memory using HashMaps and Vecs,
/// making it ideal for unit tests and local development that need isolation
/// and speed.
///
/// # Example
/// ```ignore
/// let repo = LocalRepository::new();
/// let board = repo.create_board(&new_board).await?;
/// let item = repo.append_item(board.id, &new_item).await?;
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    users: HashMap<UserId, User>,
    accounts: HashMap<AccountId, Account>,
    sessions: HashMap<SessionId, Session>,
    verification_tokens: HashMap<(String, String), VerificationToken>,

    boards: HashMap<BoardId, Board>,
    board_items: HashMap<BoardItemId, BoardItem>,

    planners: HashMap<PlannerId, Planner>,
    planner_items: HashMap<PlannerItemId, PlannerItem>,

    resources: HashMap<ResourceId, Resource>,
    lessons: HashMap<LessonId, Lesson>,
    // Attach order is preserved for the listing queries.
    lesson_resources: Vec<(LessonId, ResourceId)>,

    posts: HashMap<PostId, CommunityPost>,
    comments: HashMap<CommentId, Comment>,
    likes: HashMap<LikeId, Like>,

    // One shared sequence for all entity IDs.
    next_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            accounts: HashMap::new(),
            sessions: HashMap::new(),
            verification_tokens: HashMap::new(),
            boards: HashMap::new(),
            board_items: HashMap::new(),
            planners: HashMap::new(),
            planner_items: HashMap::new(),
            resources: HashMap::new(),
            lessons: HashMap::new(),
            lesson_resources: Vec::new(),
            posts: HashMap::new(),
            comments: HashMap::new(),
            likes: HashMap::new(),
            next_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Item IDs of a board sorted by position (the effective order).
    fn board_order(&self, board_id: BoardId) -> Vec<(BoardItemId, i64)> {
        let mut order: Vec<(BoardItemId, i64)> = self
            .board_items
            .values()
            .filter(|item| item.board_id == board_id)
            .map(|item| (item.id, item.position))
            .collect();
        order.sort_by_key(|(_, position)| *position);
        order
    }

    /// Renumber a board in place to evenly spaced positions.
    fn renumber_board(&mut self, board_id: BoardId, now: DateTime<Utc>) -> usize {
        let order = self.board_order(board_id);
        let fresh = ordering::renumbered_positions(order.len());
        for ((item_id, old_position), position) in order.iter().zip(fresh) {
            if *old_position == position {
                continue;
            }
            if let Some(item) = self.board_items.get_mut(item_id) {
                item.position = position;
                item.updated_at = now;
            }
        }
        order.len()
    }

    /// Allocate a position for a new row landing at `index`, renumbering the
    /// board first if the surrounding gap is exhausted.
    fn allocate_position(
        &mut self,
        board_id: BoardId,
        index: usize,
        now: DateTime<Utc>,
    ) -> RepositoryResult<i64> {
        let positions: Vec<i64> = self
            .board_order(board_id)
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        match ordering::plan_insertion(&positions, index) {
            ordering::Placement::At(position) => Ok(position),
            ordering::Placement::RenumberRequired => {
                self.renumber_board(board_id, now);
                let positions: Vec<i64> = self
                    .board_order(board_id)
                    .into_iter()
                    .map(|(_, p)| p)
                    .collect();
                match ordering::plan_insertion(&positions, index) {
                    ordering::Placement::At(position) => Ok(position),
                    ordering::Placement::RenumberRequired => Err(RepositoryError::internal(
                        "Renumbering did not open a position gap",
                    )),
                }
            }
        }
    }

    /// Move an item within its own board. Shared by the in-board and
    /// cross-board move operations, which already hold the write lock.
    fn move_item_impl(
        &mut self,
        item_id: BoardItemId,
        index: usize,
        now: DateTime<Utc>,
    ) -> RepositoryResult<BoardItem> {
        let item = self.board_items.get(&item_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Board item {} not found", item_id))
        })?;

        let order = self.board_order(item.board_id);
        let positions: Vec<i64> = order.iter().map(|(_, p)| *p).collect();
        let from = order
            .iter()
            .position(|(id, _)| *id == item_id)
            .ok_or_else(|| RepositoryError::internal("Item missing from its own board order"))?;
        let target = ordering::clamp_index(index, order.len().saturating_sub(1));

        match ordering::plan_move(&positions, from, target) {
            // Already at the target index: no write at all.
            None => Ok(item),
            Some(ordering::Placement::At(position)) => {
                let stored = self.board_items.get_mut(&item_id).ok_or_else(|| {
                    RepositoryError::not_found(format!("Board item {} not found", item_id))
                })?;
                stored.position = position;
                stored.updated_at = now;
                Ok(stored.clone())
            }
            Some(ordering::Placement::RenumberRequired) => {
                let mut ids: Vec<BoardItemId> = order.iter().map(|(id, _)| *id).collect();
                ids.remove(from);
                ids.insert(target, item_id);
                for (id, position) in ids.iter().zip(ordering::renumbered_positions(ids.len())) {
                    if let Some(stored) = self.board_items.get_mut(id) {
                        if stored.position != position {
                            stored.position = position;
                            stored.updated_at = now;
                        }
                    }
                }
                self.board_items.get(&item_id).cloned().ok_or_else(|| {
                    RepositoryError::not_found(format!("Board item {} not found", item_id))
                })
            }
        }
    }

    fn find_like(&self, user_id: UserId, target: &LikeTarget) -> Option<&Like> {
        self.likes.values().find(|like| {
            like.user_id == user_id
                && like.content_type == target.content_type()
                && like.content_id == target.content_id()
        })
    }

    fn target_exists(&self, target: &LikeTarget) -> bool {
        match target {
            LikeTarget::Post(post_id) => self.posts.contains_key(post_id),
            LikeTarget::Comment(comment_id) => self.comments.contains_key(comment_id),
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        let mut data = self.data.write().unwrap();
        data.is_healthy = healthy;
    }

    /// Clear all data from the repository, keeping the health flag.
    pub fn clear(&self) {
        let mut data = self.data.write().unwrap();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Number of boards stored.
    pub fn board_count(&self) -> usize {
        self.data.read().unwrap().boards.len()
    }

    /// Check if a board exists.
    pub fn has_board(&self, board_id: BoardId) -> bool {
        self.data.read().unwrap().boards.contains_key(&board_id)
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        let data = self.data.read().unwrap();
        if !data.is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up a board and fail with `PolicyError` unless it accepts item writes.
fn writable_board(data: &LocalData, board_id: BoardId) -> RepositoryResult<Board> {
    let board = data
        .boards
        .get(&board_id)
        .cloned()
        .ok_or_else(|| RepositoryError::not_found(format!("Board {} not found", board_id)))?;
    if !policy::board_accepts_item_writes(board.status) {
        return Err(RepositoryError::policy(format!(
            "Board {} is archived and rejects item writes",
            board_id
        )));
    }
    Ok(board)
}

fn status_change(
    current: ItemStatus,
    requested: ItemStatus,
    entity: &str,
    id: i64,
) -> RepositoryResult<bool> {
    if current == requested {
        return Ok(false);
    }
    if !policy::can_transition(current, requested) {
        return Err(RepositoryError::policy(format!(
            "{} {} cannot move from {} to {}",
            entity, id, current, requested
        )));
    }
    Ok(true)
}

#[async_trait]
impl BoardRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let data = self.data.read().unwrap();
        Ok(data.is_healthy)
    }

    async fn create_board(&self, board: &NewBoard) -> RepositoryResult<Board> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.users.contains_key(&board.owner_id) {
            return Err(RepositoryError::not_found(format!(
                "User {} not found",
                board.owner_id
            )));
        }

        let now = Utc::now();
        let stored = Board {
            id: BoardId::new(data.next_id()),
            owner_id: board.owner_id,
            title: board.title.clone(),
            description: board.description.clone(),
            status: BoardStatus::Active,
            visibility: board.visibility,
            created_at: now,
            updated_at: now,
        };
        data.boards.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_board(&self, board_id: BoardId) -> RepositoryResult<Board> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.boards
            .get(&board_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Board {} not found", board_id)))
    }

    async fn list_boards_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<BoardInfo>> {
        self.check_health()?;
        let data = self.data.read().unwrap();

        let mut boards: Vec<BoardInfo> = data
            .boards
            .values()
            .filter(|board| board.owner_id == owner_id)
            .map(|board| BoardInfo {
                board_id: board.id,
                title: board.title.clone(),
                status: board.status,
                visibility: board.visibility,
                item_count: data
                    .board_items
                    .values()
                    .filter(|item| item.board_id == board.id)
                    .count() as i64,
            })
            .collect();

        boards.sort_by(|a, b| b.board_id.cmp(&a.board_id));
        Ok(boards)
    }

    async fn update_board(
        &self,
        board_id: BoardId,
        title: &str,
        description: Option<&str>,
        visibility: Visibility,
    ) -> RepositoryResult<Board> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let board = data
            .boards
            .get_mut(&board_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Board {} not found", board_id)))?;

        board.title = title.to_string();
        board.description = description.map(|d| d.to_string());
        board.visibility = visibility;
        board.updated_at = Utc::now();
        Ok(board.clone())
    }

    async fn set_board_status(
        &self,
        board_id: BoardId,
        status: BoardStatus,
    ) -> RepositoryResult<Board> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let board = data
            .boards
            .get_mut(&board_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Board {} not found", board_id)))?;

        if board.status != status {
            board.status = status;
            board.updated_at = Utc::now();
        }
        Ok(board.clone())
    }

    async fn delete_board(&self, board_id: BoardId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.boards.remove(&board_id).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Board {} not found",
                board_id
            )));
        }
        let before = data.board_items.len();
        data.board_items.retain(|_, item| item.board_id != board_id);
        Ok(before - data.board_items.len())
    }

    async fn get_board_item(&self, item_id: BoardItemId) -> RepositoryResult<BoardItem> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.board_items
            .get(&item_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Board item {} not found", item_id)))
    }

    async fn list_board_items(&self, board_id: BoardId) -> RepositoryResult<Vec<BoardItem>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        if !data.boards.contains_key(&board_id) {
            return Err(RepositoryError::not_found(format!(
                "Board {} not found",
                board_id
            )));
        }

        let mut items: Vec<BoardItem> = data
            .board_items
            .values()
            .filter(|item| item.board_id == board_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.position);
        Ok(items)
    }

    async fn append_item(
        &self,
        board_id: BoardId,
        item: &NewBoardItem,
    ) -> RepositoryResult<BoardItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        writable_board(&data, board_id)?;

        let now = Utc::now();
        let index = data.board_order(board_id).len();
        let position = data.allocate_position(board_id, index, now)?;
        let stored = BoardItem {
            id: BoardItemId::new(data.next_id()),
            board_id,
            author_id: item.author_id,
            title: item.title.clone(),
            content: item.content.clone(),
            item_type: item.item_type,
            position,
            status: ItemStatus::Todo,
            created_at: now,
            updated_at: now,
        };
        data.board_items.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_item_at(
        &self,
        board_id: BoardId,
        item: &NewBoardItem,
        index: usize,
    ) -> RepositoryResult<BoardItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        writable_board(&data, board_id)?;

        let now = Utc::now();
        let position = data.allocate_position(board_id, index, now)?;
        let stored = BoardItem {
            id: BoardItemId::new(data.next_id()),
            board_id,
            author_id: item.author_id,
            title: item.title.clone(),
            content: item.content.clone(),
            item_type: item.item_type,
            position,
            status: ItemStatus::Todo,
            created_at: now,
            updated_at: now,
        };
        data.board_items.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn move_item(&self, item_id: BoardItemId, index: usize) -> RepositoryResult<BoardItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let board_id = data
            .board_items
            .get(&item_id)
            .map(|item| item.board_id)
            .ok_or_else(|| {
                RepositoryError::not_found(format!("Board item {} not found", item_id))
            })?;
        writable_board(&data, board_id)?;

        let now = Utc::now();
        data.move_item_impl(item_id, index, now)
    }

    async fn move_item_to_board(
        &self,
        item_id: BoardItemId,
        target_board_id: BoardId,
        index: Option<usize>,
    ) -> RepositoryResult<BoardItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let item = data.board_items.get(&item_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Board item {} not found", item_id))
        })?;
        if item.board_id == target_board_id {
            writable_board(&data, item.board_id)?;
            return match index {
                Some(index) => {
                    let now = Utc::now();
                    data.move_item_impl(item_id, index, now)
                }
                None => Ok(item),
            };
        }

        // Removing from the source and inserting into the target are both
        // item writes, so both boards must accept them.
        writable_board(&data, item.board_id)?;
        writable_board(&data, target_board_id)?;

        let now = Utc::now();
        let target_len = data.board_order(target_board_id).len();
        let index = index.unwrap_or(target_len);
        let position = data.allocate_position(target_board_id, index, now)?;

        let stored = data.board_items.get_mut(&item_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Board item {} not found", item_id))
        })?;
        stored.board_id = target_board_id;
        stored.position = position;
        stored.updated_at = now;
        Ok(stored.clone())
    }

    async fn reorder_board(&self, board_id: BoardId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        writable_board(&data, board_id)?;
        let now = Utc::now();
        Ok(data.renumber_board(board_id, now))
    }

    async fn update_board_item(
        &self,
        item_id: BoardItemId,
        title: &str,
        content: Option<&str>,
        item_type: ItemType,
    ) -> RepositoryResult<BoardItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let board_id = data
            .board_items
            .get(&item_id)
            .map(|item| item.board_id)
            .ok_or_else(|| {
                RepositoryError::not_found(format!("Board item {} not found", item_id))
            })?;
        writable_board(&data, board_id)?;

        let item = data.board_items.get_mut(&item_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Board item {} not found", item_id))
        })?;
        item.title = title.to_string();
        item.content = content.map(|c| c.to_string());
        item.item_type = item_type;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn set_board_item_status(
        &self,
        item_id: BoardItemId,
        status: ItemStatus,
    ) -> RepositoryResult<BoardItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let item = data.board_items.get(&item_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Board item {} not found", item_id))
        })?;
        writable_board(&data, item.board_id)?;

        if !status_change(item.status, status, "Board item", item_id.value())? {
            return Ok(item);
        }

        let stored = data.board_items.get_mut(&item_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Board item {} not found", item_id))
        })?;
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn reopen_board_item(&self, item_id: BoardItemId) -> RepositoryResult<BoardItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let item = data.board_items.get(&item_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Board item {} not found", item_id))
        })?;
        writable_board(&data, item.board_id)?;

        if !policy::can_reopen(item.status, ItemStatus::InProgress) {
            return Err(RepositoryError::policy(format!(
                "Board item {} is {} and cannot be reopened",
                item_id, item.status
            )));
        }

        let stored = data.board_items.get_mut(&item_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Board item {} not found", item_id))
        })?;
        stored.status = ItemStatus::InProgress;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_board_item(&self, item_id: BoardItemId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let board_id = data
            .board_items
            .get(&item_id)
            .map(|item| item.board_id)
            .ok_or_else(|| {
                RepositoryError::not_found(format!("Board item {} not found", item_id))
            })?;
        writable_board(&data, board_id)?;

        // Deletion leaves a gap; only insertion closes gaps.
        data.board_items.remove(&item_id);
        Ok(())
    }
}

#[async_trait]
impl PlannerRepository for LocalRepository {
    async fn create_planner(&self, planner: &NewPlanner) -> RepositoryResult<Planner> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.users.contains_key(&planner.owner_id) {
            return Err(RepositoryError::not_found(format!(
                "User {} not found",
                planner.owner_id
            )));
        }
        validation::validate_planner_window(planner.start_date, planner.end_date)
            .map_err(RepositoryError::validation)?;

        let now = Utc::now();
        let stored = Planner {
            id: PlannerId::new(data.next_id()),
            owner_id: planner.owner_id,
            title: planner.title.clone(),
            start_date: planner.start_date,
            end_date: planner.end_date,
            created_at: now,
            updated_at: now,
        };
        data.planners.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_planner(&self, planner_id: PlannerId) -> RepositoryResult<Planner> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.planners
            .get(&planner_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Planner {} not found", planner_id)))
    }

    async fn list_planners_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<PlannerInfo>> {
        self.check_health()?;
        let data = self.data.read().unwrap();

        let mut planners: Vec<PlannerInfo> = data
            .planners
            .values()
            .filter(|planner| planner.owner_id == owner_id)
            .map(|planner| PlannerInfo {
                planner_id: planner.id,
                title: planner.title.clone(),
                start_date: planner.start_date,
                end_date: planner.end_date,
                item_count: data
                    .planner_items
                    .values()
                    .filter(|item| item.planner_id == planner.id)
                    .count() as i64,
            })
            .collect();

        planners.sort_by(|a, b| b.planner_id.cmp(&a.planner_id));
        Ok(planners)
    }

    async fn update_planner(
        &self,
        planner_id: PlannerId,
        title: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Planner> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        validation::validate_planner_window(start_date, end_date)
            .map_err(RepositoryError::validation)?;

        let planner = data.planners.get_mut(&planner_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Planner {} not found", planner_id))
        })?;
        planner.title = title.to_string();
        planner.start_date = start_date;
        planner.end_date = end_date;
        planner.updated_at = Utc::now();
        Ok(planner.clone())
    }

    async fn delete_planner(&self, planner_id: PlannerId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.planners.remove(&planner_id).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Planner {} not found",
                planner_id
            )));
        }
        let before = data.planner_items.len();
        data.planner_items
            .retain(|_, item| item.planner_id != planner_id);
        Ok(before - data.planner_items.len())
    }

    async fn add_planner_item(
        &self,
        planner_id: PlannerId,
        item: &NewPlannerItem,
    ) -> RepositoryResult<PlannerItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let planner = data.planners.get(&planner_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Planner {} not found", planner_id))
        })?;
        if let Some(lesson_id) = item.lesson_id {
            if !data.lessons.contains_key(&lesson_id) {
                return Err(RepositoryError::not_found(format!(
                    "Lesson {} not found",
                    lesson_id
                )));
            }
        }
        validation::validate_planner_item(item, &planner).map_err(RepositoryError::validation)?;

        let now = Utc::now();
        let stored = PlannerItem {
            id: PlannerItemId::new(data.next_id()),
            planner_id,
            author_id: item.author_id,
            lesson_id: item.lesson_id,
            title: item.title.clone(),
            date: item.date,
            start_time: item.start_time,
            end_time: item.end_time,
            status: ItemStatus::Planned,
            created_at: now,
            updated_at: now,
        };
        data.planner_items.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<PlannerItem> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.planner_items.get(&item_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Planner item {} not found", item_id))
        })
    }

    async fn list_planner_items(
        &self,
        planner_id: PlannerId,
    ) -> RepositoryResult<Vec<PlannerItem>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        if !data.planners.contains_key(&planner_id) {
            return Err(RepositoryError::not_found(format!(
                "Planner {} not found",
                planner_id
            )));
        }

        let mut items: Vec<PlannerItem> = data
            .planner_items
            .values()
            .filter(|item| item.planner_id == planner_id)
            .cloned()
            .collect();
        // Untimed items sort before timed ones on the same date.
        items.sort_by_key(|item| (item.date, item.start_time, item.id));
        Ok(items)
    }

    async fn update_planner_item(
        &self,
        item_id: PlannerItemId,
        title: &str,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> RepositoryResult<PlannerItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let planner_id = data
            .planner_items
            .get(&item_id)
            .map(|item| item.planner_id)
            .ok_or_else(|| {
                RepositoryError::not_found(format!("Planner item {} not found", item_id))
            })?;
        let planner = data.planners.get(&planner_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Planner {} not found", planner_id))
        })?;

        validation::validate_item_date(date, &planner).map_err(RepositoryError::validation)?;
        validation::validate_item_times(start_time, end_time)
            .map_err(RepositoryError::validation)?;

        let item = data.planner_items.get_mut(&item_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Planner item {} not found", item_id))
        })?;
        item.title = title.to_string();
        item.date = date;
        item.start_time = start_time;
        item.end_time = end_time;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn set_planner_item_status(
        &self,
        item_id: PlannerItemId,
        status: ItemStatus,
    ) -> RepositoryResult<PlannerItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let item = data.planner_items.get(&item_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Planner item {} not found", item_id))
        })?;
        if !status_change(item.status, status, "Planner item", item_id.value())? {
            return Ok(item);
        }

        let stored = data.planner_items.get_mut(&item_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Planner item {} not found", item_id))
        })?;
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn reopen_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<PlannerItem> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let item = data.planner_items.get(&item_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Planner item {} not found", item_id))
        })?;
        if !policy::can_reopen(item.status, ItemStatus::InProgress) {
            return Err(RepositoryError::policy(format!(
                "Planner item {} is {} and cannot be reopened",
                item_id, item.status
            )));
        }

        let stored = data.planner_items.get_mut(&item_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Planner item {} not found", item_id))
        })?;
        stored.status = ItemStatus::InProgress;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.planner_items.remove(&item_id).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Planner item {} not found",
                item_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CommunityRepository for LocalRepository {
    async fn create_post(&self, post: &NewPost) -> RepositoryResult<CommunityPost> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.users.contains_key(&post.author_id) {
            return Err(RepositoryError::not_found(format!(
                "User {} not found",
                post.author_id
            )));
        }

        let now = Utc::now();
        let stored = CommunityPost {
            id: PostId::new(data.next_id()),
            author_id: post.author_id,
            title: post.title.clone(),
            body: post.body.clone(),
            visibility: post.visibility,
            created_at: now,
            updated_at: now,
        };
        data.posts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_post(&self, post_id: PostId) -> RepositoryResult<CommunityPost> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.posts
            .get(&post_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Post {} not found", post_id)))
    }

    async fn list_posts(&self) -> RepositoryResult<Vec<PostInfo>> {
        self.check_health()?;
        let data = self.data.read().unwrap();

        let mut posts: Vec<PostInfo> = data
            .posts
            .values()
            .map(|post| PostInfo {
                post_id: post.id,
                author_id: post.author_id,
                title: post.title.clone(),
                visibility: post.visibility,
                comment_count: data
                    .comments
                    .values()
                    .filter(|comment| comment.post_id == post.id)
                    .count() as i64,
                like_count: data
                    .likes
                    .values()
                    .filter(|like| {
                        like.content_type == ContentType::Post && like.content_id == post.id.value()
                    })
                    .count() as i64,
                created_at: post.created_at,
            })
            .collect();

        posts.sort_by(|a, b| b.post_id.cmp(&a.post_id));
        Ok(posts)
    }

    async fn delete_post(&self, post_id: PostId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.posts.remove(&post_id).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Post {} not found",
                post_id
            )));
        }

        let comment_ids: Vec<CommentId> = data
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| comment.id)
            .collect();
        data.comments.retain(|_, comment| comment.post_id != post_id);

        let before = data.likes.len();
        data.likes.retain(|_, like| {
            let on_post =
                like.content_type == ContentType::Post && like.content_id == post_id.value();
            let on_comment = like.comment_id.is_some_and(|id| comment_ids.contains(&id));
            !(on_post || on_comment)
        });
        let likes_removed = before - data.likes.len();

        Ok(comment_ids.len() + likes_removed)
    }

    async fn add_comment(&self, comment: &NewComment) -> RepositoryResult<Comment> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.posts.contains_key(&comment.post_id) {
            return Err(RepositoryError::not_found(format!(
                "Post {} not found",
                comment.post_id
            )));
        }
        if !data.users.contains_key(&comment.author_id) {
            return Err(RepositoryError::not_found(format!(
                "User {} not found",
                comment.author_id
            )));
        }

        let now = Utc::now();
        let stored = Comment {
            id: CommentId::new(data.next_id()),
            post_id: comment.post_id,
            author_id: comment.author_id,
            body: comment.body.clone(),
            created_at: now,
            updated_at: now,
        };
        data.comments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_comment(&self, comment_id: CommentId) -> RepositoryResult<Comment> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.comments
            .get(&comment_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Comment {} not found", comment_id)))
    }

    async fn list_comments_for_post(&self, post_id: PostId) -> RepositoryResult<Vec<Comment>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        if !data.posts.contains_key(&post_id) {
            return Err(RepositoryError::not_found(format!(
                "Post {} not found",
                post_id
            )));
        }

        let mut comments: Vec<Comment> = data
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|comment| comment.id);
        Ok(comments)
    }

    async fn delete_comment(&self, comment_id: CommentId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.comments.remove(&comment_id).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Comment {} not found",
                comment_id
            )));
        }

        let before = data.likes.len();
        data.likes.retain(|_, like| {
            !(like.content_type == ContentType::Comment
                && like.content_id == comment_id.value())
        });
        Ok(before - data.likes.len())
    }

    async fn like(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<Like> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.users.contains_key(&user_id) {
            return Err(RepositoryError::not_found(format!(
                "User {} not found",
                user_id
            )));
        }
        if !data.target_exists(&target) {
            return Err(RepositoryError::not_found(format!(
                "{} {} not found",
                target.content_type(),
                target.content_id()
            )));
        }

        // Liked is liked: repeating the operation returns the stored row.
        if let Some(existing) = data.find_like(user_id, &target) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let (post_id, comment_id) = target.reference_columns();
        let stored = Like {
            id: LikeId::new(data.next_id()),
            user_id,
            content_type: target.content_type(),
            content_id: target.content_id(),
            post_id,
            comment_id,
            created_at: now,
            updated_at: now,
        };
        data.likes.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn unlike(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let existing = data.find_like(user_id, &target).map(|like| like.id);
        match existing {
            Some(like_id) => {
                data.likes.remove(&like_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn has_liked(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<bool> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        Ok(data.find_like(user_id, &target).is_some())
    }

    async fn like_count(&self, target: LikeTarget) -> RepositoryResult<i64> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        Ok(data
            .likes
            .values()
            .filter(|like| {
                like.content_type == target.content_type()
                    && like.content_id == target.content_id()
            })
            .count() as i64)
    }

    async fn post_engagement(&self, post_id: PostId) -> RepositoryResult<PostEngagement> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        if !data.posts.contains_key(&post_id) {
            return Err(RepositoryError::not_found(format!(
                "Post {} not found",
                post_id
            )));
        }

        Ok(PostEngagement {
            post_id,
            comment_count: data
                .comments
                .values()
                .filter(|comment| comment.post_id == post_id)
                .count() as i64,
            like_count: data
                .likes
                .values()
                .filter(|like| {
                    like.content_type == ContentType::Post && like.content_id == post_id.value()
                })
                .count() as i64,
        })
    }
}

#[async_trait]
impl IdentityRepository for LocalRepository {
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if let Some(ref email) = user.email {
            let taken = data
                .users
                .values()
                .any(|existing| existing.email.as_deref() == Some(email.as_str()));
            if taken {
                return Err(RepositoryError::conflict(format!(
                    "Email {} is already registered",
                    email
                )));
            }
        }

        let now = Utc::now();
        let stored = User {
            id: UserId::new(data.next_id()),
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified: None,
            image: user.image.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        data.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        Ok(data
            .users
            .values()
            .find(|user| user.email.as_deref() == Some(email))
            .cloned())
    }

    async fn set_user_role(&self, user_id: UserId, role: Role) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let user = data
            .users
            .get_mut(&user_id)
            .ok_or_else(|| RepositoryError::not_found(format!("User {} not found", user_id)))?;
        if user.role != role {
            user.role = role;
            user.updated_at = Utc::now();
        }
        Ok(user.clone())
    }

    async fn upsert_account(&self, account: &NewAccount) -> RepositoryResult<Account> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.users.contains_key(&account.user_id) {
            return Err(RepositoryError::not_found(format!(
                "User {} not found",
                account.user_id
            )));
        }

        let now = Utc::now();
        let existing_id = data
            .accounts
            .values()
            .find(|stored| {
                stored.provider == account.provider
                    && stored.provider_account_id == account.provider_account_id
            })
            .map(|stored| stored.id);

        if let Some(account_id) = existing_id {
            let stored = data.accounts.get_mut(&account_id).ok_or_else(|| {
                RepositoryError::not_found(format!("Account {} not found", account_id))
            })?;
            stored.refresh_token = account.refresh_token.clone();
            stored.access_token = account.access_token.clone();
            stored.expires_at = account.expires_at;
            stored.token_type = account.token_type.clone();
            stored.scope = account.scope.clone();
            stored.id_token = account.id_token.clone();
            stored.session_state = account.session_state.clone();
            stored.updated_at = now;
            return Ok(stored.clone());
        }

        let stored = Account {
            id: AccountId::new(data.next_id()),
            user_id: account.user_id,
            account_type: account.account_type.clone(),
            provider: account.provider.clone(),
            provider_account_id: account.provider_account_id.clone(),
            refresh_token: account.refresh_token.clone(),
            access_token: account.access_token.clone(),
            expires_at: account.expires_at,
            token_type: account.token_type.clone(),
            scope: account.scope.clone(),
            id_token: account.id_token.clone(),
            session_state: account.session_state.clone(),
            created_at: now,
            updated_at: now,
        };
        data.accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn accounts_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Account>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut accounts: Vec<Account> = data
            .accounts
            .values()
            .filter(|account| account.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }

    async fn create_session(&self, session: &NewSession) -> RepositoryResult<Session> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.users.contains_key(&session.user_id) {
            return Err(RepositoryError::not_found(format!(
                "User {} not found",
                session.user_id
            )));
        }
        let taken = data
            .sessions
            .values()
            .any(|stored| stored.session_token == session.session_token);
        if taken {
            return Err(RepositoryError::conflict(
                "Session token is already in use",
            ));
        }

        let now = Utc::now();
        let stored = Session {
            id: SessionId::new(data.next_id()),
            session_token: session.session_token.clone(),
            user_id: session.user_id,
            expires: session.expires,
            created_at: now,
            updated_at: now,
        };
        data.sessions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_session_by_token(&self, token: &str) -> RepositoryResult<Option<Session>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        Ok(data
            .sessions
            .values()
            .find(|session| session.session_token == token)
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let session_id = data
            .sessions
            .values()
            .find(|session| session.session_token == token)
            .map(|session| session.id);
        match session_id {
            Some(session_id) => {
                data.sessions.remove(&session_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let before = data.sessions.len();
        data.sessions.retain(|_, session| session.expires > now);
        Ok(before - data.sessions.len())
    }

    async fn create_verification_token(
        &self,
        identifier: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> RepositoryResult<VerificationToken> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let key = (identifier.to_string(), token.to_string());
        if data.verification_tokens.contains_key(&key) {
            return Err(RepositoryError::conflict(format!(
                "Verification token for {} already exists",
                identifier
            )));
        }

        let stored = VerificationToken {
            identifier: identifier.to_string(),
            token: token.to_string(),
            expires,
            created_at: Utc::now(),
        };
        data.verification_tokens.insert(key, stored.clone());
        Ok(stored)
    }

    async fn consume_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> RepositoryResult<Option<VerificationToken>> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let key = (identifier.to_string(), token.to_string());
        Ok(data.verification_tokens.remove(&key))
    }
}

#[async_trait]
impl LibraryRepository for LocalRepository {
    async fn create_resource(&self, resource: &NewResource) -> RepositoryResult<Resource> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.users.contains_key(&resource.owner_id) {
            return Err(RepositoryError::not_found(format!(
                "User {} not found",
                resource.owner_id
            )));
        }

        let now = Utc::now();
        let stored = Resource {
            id: ResourceId::new(data.next_id()),
            owner_id: resource.owner_id,
            title: resource.title.clone(),
            description: resource.description.clone(),
            url: resource.url.clone(),
            resource_type: resource.resource_type,
            visibility: resource.visibility,
            created_at: now,
            updated_at: now,
        };
        data.resources.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_resource(&self, resource_id: ResourceId) -> RepositoryResult<Resource> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.resources.get(&resource_id).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("Resource {} not found", resource_id))
        })
    }

    async fn list_resources_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<Resource>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut resources: Vec<Resource> = data
            .resources
            .values()
            .filter(|resource| resource.owner_id == owner_id)
            .cloned()
            .collect();
        resources.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(resources)
    }

    async fn update_resource(
        &self,
        resource_id: ResourceId,
        title: &str,
        description: Option<&str>,
        url: Option<&str>,
        resource_type: ResourceType,
        visibility: Visibility,
    ) -> RepositoryResult<Resource> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let resource = data.resources.get_mut(&resource_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Resource {} not found", resource_id))
        })?;

        resource.title = title.to_string();
        resource.description = description.map(|d| d.to_string());
        resource.url = url.map(|u| u.to_string());
        resource.resource_type = resource_type;
        resource.visibility = visibility;
        resource.updated_at = Utc::now();
        Ok(resource.clone())
    }

    async fn delete_resource(&self, resource_id: ResourceId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.resources.remove(&resource_id).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Resource {} not found",
                resource_id
            )));
        }
        data.lesson_resources.retain(|(_, rid)| *rid != resource_id);
        Ok(())
    }

    async fn create_lesson(&self, lesson: &NewLesson) -> RepositoryResult<Lesson> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        let now = Utc::now();
        let stored = Lesson {
            id: LessonId::new(data.next_id()),
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            created_at: now,
            updated_at: now,
        };
        data.lessons.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_lesson(&self, lesson_id: LessonId) -> RepositoryResult<Lesson> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.lessons
            .get(&lesson_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Lesson {} not found", lesson_id)))
    }

    async fn list_lessons(&self) -> RepositoryResult<Vec<Lesson>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut lessons: Vec<Lesson> = data.lessons.values().cloned().collect();
        lessons.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(lessons)
    }

    async fn delete_lesson(&self, lesson_id: LessonId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.lessons.remove(&lesson_id).is_none() {
            return Err(RepositoryError::not_found(format!(
                "Lesson {} not found",
                lesson_id
            )));
        }

        let before = data.lesson_resources.len();
        data.lesson_resources.retain(|(lid, _)| *lid != lesson_id);
        let detached = before - data.lesson_resources.len();

        // Planner items that pointed at the lesson keep living, unlinked.
        let now = Utc::now();
        for item in data.planner_items.values_mut() {
            if item.lesson_id == Some(lesson_id) {
                item.lesson_id = None;
                item.updated_at = now;
            }
        }
        Ok(detached)
    }

    async fn attach_resource(
        &self,
        lesson_id: LessonId,
        resource_id: ResourceId,
    ) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();

        if !data.lessons.contains_key(&lesson_id) {
            return Err(RepositoryError::not_found(format!(
                "Lesson {} not found",
                lesson_id
            )));
        }
        if !data.resources.contains_key(&resource_id) {
            return Err(RepositoryError::not_found(format!(
                "Resource {} not found",
                resource_id
            )));
        }

        let edge = (lesson_id, resource_id);
        if data.lesson_resources.contains(&edge) {
            return Ok(false);
        }
        data.lesson_resources.push(edge);
        Ok(true)
    }

    async fn detach_resource(
        &self,
        lesson_id: LessonId,
        resource_id: ResourceId,
    ) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let before = data.lesson_resources.len();
        data.lesson_resources
            .retain(|edge| *edge != (lesson_id, resource_id));
        Ok(data.lesson_resources.len() < before)
    }

    async fn resources_for_lesson(&self, lesson_id: LessonId) -> RepositoryResult<Vec<Resource>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        if !data.lessons.contains_key(&lesson_id) {
            return Err(RepositoryError::not_found(format!(
                "Lesson {} not found",
                lesson_id
            )));
        }

        Ok(data
            .lesson_resources
            .iter()
            .filter(|(lid, _)| *lid == lesson_id)
            .filter_map(|(_, rid)| data.resources.get(rid).cloned())
            .collect())
    }

    async fn lessons_for_resource(&self, resource_id: ResourceId) -> RepositoryResult<Vec<Lesson>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        if !data.resources.contains_key(&resource_id) {
            return Err(RepositoryError::not_found(format!(
                "Resource {} not found",
                resource_id
            )));
        }

        Ok(data
            .lesson_resources
            .iter()
            .filter(|(_, rid)| *rid == resource_id)
            .filter_map(|(lid, _)| data.lessons.get(lid).cloned())
            .collect())
    }
}
