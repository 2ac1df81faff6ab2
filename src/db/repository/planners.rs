//! Planner repository trait.
//!
//! Planner items carry no stored position; their order is derived from
//! `(date, start_time, id)` at read time. The date and time invariants are
//! enforced here at write time because the schema does not.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{PlannerId, PlannerInfo, PlannerItemId, UserId};
use crate::models::{ItemStatus, NewPlanner, NewPlannerItem, Planner, PlannerItem};
use chrono::{NaiveDate, NaiveTime};

/// Repository trait for planners and their dated items.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait PlannerRepository: Send + Sync {
    // ==================== Planner Operations ====================

    /// Create a planner. Fails with `ValidationError` when
    /// `start_date > end_date`.
    async fn create_planner(&self, planner: &NewPlanner) -> RepositoryResult<Planner>;

    /// Retrieve a planner by ID.
    async fn get_planner(&self, planner_id: PlannerId) -> RepositoryResult<Planner>;

    /// List a user's planners with item counts, newest first.
    async fn list_planners_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<PlannerInfo>>;

    /// Replace a planner's title and window. The window invariant is
    /// re-checked; existing items are not revalidated against the new window.
    async fn update_planner(
        &self,
        planner_id: PlannerId,
        title: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Planner>;

    /// Delete a planner and cascade-delete its items.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of items deleted along with the planner
    async fn delete_planner(&self, planner_id: PlannerId) -> RepositoryResult<usize>;

    // ==================== Item Operations ====================

    /// Add an item to a planner. New items start `PLANNED`.
    ///
    /// Fails with `ValidationError` when the date falls outside the planner
    /// window or `start_time > end_time`, and with `NotFound` when a linked
    /// lesson does not exist.
    async fn add_planner_item(
        &self,
        planner_id: PlannerId,
        item: &NewPlannerItem,
    ) -> RepositoryResult<PlannerItem>;

    /// Retrieve a single planner item by ID.
    async fn get_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<PlannerItem>;

    /// All items of a planner ordered by `(date, start_time, id)`.
    /// Items without a start time sort before timed items on the same date.
    async fn list_planner_items(&self, planner_id: PlannerId)
        -> RepositoryResult<Vec<PlannerItem>>;

    /// Replace an item's editable fields, re-running the date and time
    /// checks against the owning planner.
    async fn update_planner_item(
        &self,
        item_id: PlannerItemId,
        title: &str,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> RepositoryResult<PlannerItem>;

    /// Advance an item's workflow status. Same rules as board items:
    /// idempotent on same-status, `PolicyError` on backward writes.
    async fn set_planner_item_status(
        &self,
        item_id: PlannerItemId,
        status: ItemStatus,
    ) -> RepositoryResult<PlannerItem>;

    /// Explicitly reopen a completed item (`COMPLETED -> IN_PROGRESS`).
    async fn reopen_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<PlannerItem>;

    /// Delete a planner item.
    async fn delete_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<()>;
}
