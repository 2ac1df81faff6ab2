//! Planner aggregate: a date-bounded container of dated entries.
//!
//! Unlike board items, planner items carry no stored sort key. Their ordering
//! is derived from `(date, start_time, id)` at read time.

use crate::api::{LessonId, PlannerId, PlannerItemId, UserId};
use crate::models::ItemStatus;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A date-bounded planner owned by a single user.
///
/// Invariant: `start_date <= end_date`, checked on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Planner {
    /// Database ID
    pub id: PlannerId,
    pub owner_id: UserId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Planner {
    /// Whether `date` falls inside the planner window (inclusive bounds).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Input for creating a planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlanner {
    pub owner_id: UserId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewPlanner {
    pub fn new(owner_id: UserId, title: String, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            owner_id,
            title,
            start_date,
            end_date,
        }
    }
}

/// A dated entry in a planner, optionally linked to a library lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerItem {
    /// Database ID
    pub id: PlannerItemId,
    pub planner_id: PlannerId,
    pub author_id: UserId,
    /// Linked lesson, cleared when the lesson is deleted
    pub lesson_id: Option<LessonId>,
    pub title: String,
    /// Required; must fall inside the owning planner's window
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a planner item. New entries start `PLANNED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlannerItem {
    pub author_id: UserId,
    #[serde(default)]
    pub lesson_id: Option<LessonId>,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
}

impl NewPlannerItem {
    pub fn new(author_id: UserId, title: String, date: NaiveDate) -> Self {
        Self {
            author_id,
            lesson_id: None,
            title,
            date,
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_times(mut self, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }

    pub fn with_lesson(mut self, lesson_id: LessonId) -> Self {
        self.lesson_id = Some(lesson_id);
        self
    }
}
