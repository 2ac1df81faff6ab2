//! Closed enumerations shared across the data model.
//!
//! Every enum serializes to its SCREAMING_SNAKE_CASE wire form, both through
//! serde and through `as_str`/`FromStr`, so values round-trip unchanged
//! between the API surface and persistent storage. Parsing is strict: any
//! string outside the declared set is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account-level role of a user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Parent,
    Student,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Parent => "PARENT",
            Role::Student => "STUDENT",
            Role::User => "USER",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "PARENT" => Ok(Role::Parent),
            "STUDENT" => Ok(Role::Student),
            "USER" => Ok(Role::User),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a board. Archived boards reject item mutations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardStatus {
    Active,
    Archived,
}

impl BoardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardStatus::Active => "ACTIVE",
            BoardStatus::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for BoardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(BoardStatus::Active),
            "ARCHIVED" => Ok(BoardStatus::Archived),
            other => Err(format!("Unknown board status: {}", other)),
        }
    }
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow state of a board or planner item.
///
/// `Planned` is the initial state for planner entries; board items start at
/// `Todo`. Forward movement is governed by the policy module.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Planned,
    Todo,
    InProgress,
    Completed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Planned => "PLANNED",
            ItemStatus::Todo => "TODO",
            ItemStatus::InProgress => "IN_PROGRESS",
            ItemStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLANNED" => Ok(ItemStatus::Planned),
            "TODO" => Ok(ItemStatus::Todo),
            "IN_PROGRESS" => Ok(ItemStatus::InProgress),
            "COMPLETED" => Ok(ItemStatus::Completed),
            other => Err(format!("Unknown item status: {}", other)),
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of content a board item carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Note,
    Task,
    Link,
    File,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Note => "NOTE",
            ItemType::Task => "TASK",
            ItemType::Link => "LINK",
            ItemType::File => "FILE",
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOTE" => Ok(ItemType::Note),
            "TASK" => Ok(ItemType::Task),
            "LINK" => Ok(ItemType::Link),
            "FILE" => Ok(ItemType::File),
            other => Err(format!("Unknown item type: {}", other)),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of a library resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Document,
    Video,
    Link,
    Image,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Document => "DOCUMENT",
            ResourceType::Video => "VIDEO",
            ResourceType::Link => "LINK",
            ResourceType::Image => "IMAGE",
            ResourceType::Other => "OTHER",
        }
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOCUMENT" => Ok(ResourceType::Document),
            "VIDEO" => Ok(ResourceType::Video),
            "LINK" => Ok(ResourceType::Link),
            "IMAGE" => Ok(ResourceType::Image),
            "OTHER" => Ok(ResourceType::Other),
            other => Err(format!("Unknown resource type: {}", other)),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who may read a piece of content.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Private,
    Shared,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "PRIVATE",
            Visibility::Shared => "SHARED",
            Visibility::Public => "PUBLIC",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRIVATE" => Ok(Visibility::Private),
            "SHARED" => Ok(Visibility::Shared),
            "PUBLIC" => Ok(Visibility::Public),
            other => Err(format!("Unknown visibility: {}", other)),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discriminator for the polymorphic like target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Post,
    Comment,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "POST",
            ContentType::Comment => "COMMENT",
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POST" => Ok(ContentType::Post),
            "COMMENT" => Ok(ContentType::Comment),
            other => Err(format!("Unknown content type: {}", other)),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_status_round_trip() {
        for status in [
            ItemStatus::Planned,
            ItemStatus::Todo,
            ItemStatus::InProgress,
            ItemStatus::Completed,
        ] {
            let parsed: ItemStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_item_status_wire_form() {
        assert_eq!(ItemStatus::InProgress.as_str(), "IN_PROGRESS");
        let json = serde_json::to_string(&ItemStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let back: ItemStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ItemStatus::InProgress);
    }

    #[test]
    fn test_unknown_values_rejected() {
        assert!("DONE".parse::<ItemStatus>().is_err());
        assert!("public".parse::<Visibility>().is_err());
        assert!("".parse::<Role>().is_err());
        assert!("WORKSHEET".parse::<ResourceType>().is_err());
        assert!("ATTACHMENT".parse::<ItemType>().is_err());
        assert!(serde_json::from_str::<ContentType>("\"REPLY\"").is_err());
    }

    #[test]
    fn test_item_and_resource_type_round_trip() {
        for ty in [ItemType::Note, ItemType::Task, ItemType::Link, ItemType::File] {
            let parsed: ItemType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
        for ty in [
            ResourceType::Document,
            ResourceType::Video,
            ResourceType::Link,
            ResourceType::Image,
            ResourceType::Other,
        ] {
            let parsed: ResourceType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn test_serde_matches_as_str() {
        let all_visibilities = [Visibility::Private, Visibility::Shared, Visibility::Public];
        for v in all_visibilities {
            let json = serde_json::to_string(&v).unwrap();
            assert_eq!(json, format!("\"{}\"", v.as_str()));
        }
        for r in [Role::Admin, Role::Parent, Role::Student, Role::User] {
            let json = serde_json::to_string(&r).unwrap();
            assert_eq!(json, format!("\"{}\"", r.as_str()));
        }
        for c in [ContentType::Post, ContentType::Comment] {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.as_str()));
        }
    }

    #[test]
    fn test_board_status_round_trip() {
        for status in [BoardStatus::Active, BoardStatus::Archived] {
            let parsed: BoardStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
