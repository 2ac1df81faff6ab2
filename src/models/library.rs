//! Library content: teaching resources and the lessons they attach to.

use crate::api::{LessonId, ResourceId, UserId};
use crate::models::{ResourceType, Visibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A teaching resource owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Database ID
    pub id: ResourceId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    /// External location for LINK / VIDEO resources
    pub url: Option<String>,
    pub resource_type: ResourceType,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResource {
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub resource_type: ResourceType,
    pub visibility: Visibility,
}

impl NewResource {
    pub fn new(
        owner_id: UserId,
        title: String,
        resource_type: ResourceType,
        visibility: Visibility,
    ) -> Self {
        Self {
            owner_id,
            title,
            description: None,
            url: None,
            resource_type,
            visibility,
        }
    }
}

/// A lesson that resources attach to (many-to-many) and planner items may
/// reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    /// Database ID
    pub id: LessonId,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLesson {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewLesson {
    pub fn new(title: String, description: Option<String>) -> Self {
        Self { title, description }
    }
}
