//! Database module for classroom data storage.
//!
//! This module provides abstractions for database operations via the Repository pattern,
//! allowing different storage backends to be swapped easily.
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
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface    │
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
//! # Repository Pattern
//! The module includes:
//! - `services`: High-level business logic functions (use these in your application!)
//! - `repository`: Trait definitions for database operations
//! - `repositories::postgres`: Postgres implementation with Diesel ORM
//! - `repositories::local`: In-memory implementation for unit testing and local development
//! - `factory`: Factory for creating repository instances
//!
//! # Recommended Usage
//!
//! **For new code, use the service layer:**
//! ```ignore
//! use classboard::db::{services, factory, PostgresConfig, RepositoryType};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PostgresConfig::from_env()?;
//!     let repo = factory::RepositoryFactory::create(RepositoryType::Postgres, Some(&config)).await?;
//!
//!     // Use service layer functions
//!     let posts = services::list_posts(repo.as_ref()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Postgres Implementation
//! PostgreSQL-specific code is in `repositories::postgres`.

// Feature flag priority: postgres > local
// When multiple features are enabled (e.g., --all-features), postgres takes precedence.
#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

#[cfg(test)]
#[path = "services_tests.rs"]
mod services_tests;
// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

// ==================== Service Layer (Recommended for new code) ====================
// Use these high-level functions that work with any repository implementation

pub use services::{
    add_comment, add_planner_item, append_board_item, archive_board,
    attach_resource_to_lesson, consume_verification_token, create_board, create_lesson,
    create_planner, create_post, create_resource, create_session, create_user, delete_board,
    delete_board_item, delete_comment, delete_lesson, delete_planner, delete_post,
    detach_resource_from_lesson, get_board_for, get_planner, get_post_for, get_resource_for,
    has_liked, health_check, insert_board_item_at, lessons_for_resource, like_content,
    like_count, list_board_items, list_boards_for_user, list_comments_for_post,
    list_planner_items, list_planners_for_user, list_posts, move_board_item,
    move_item_to_board, post_engagement, reopen_board_item, reopen_planner_item,
    reorder_board, resources_for_lesson, restore_board, set_board_item_status,
    set_planner_item_status, sweep_expired_sessions, unlike_content, upsert_account,
};

// ==================== Repository Pattern Exports ====================

pub use repo_config::RepositoryConfig;

// Repository trait and implementations
pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    BoardRepository, CommunityRepository, ErrorContext, FullRepository, IdentityRepository,
    LibraryRepository, PlannerRepository, RepositoryError, RepositoryResult,
};

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};
#[cfg(feature = "postgres-repo")]
use tokio::runtime::Runtime;

/// Global repository instance initialized once per process.
static REPOSITORY: OnceLock<Arc<dyn FullRepository>> = OnceLock::new();

// Priority: postgres > local (when --all-features is used)
#[cfg(feature = "postgres-repo")]
async fn create_selected_repository() -> RepositoryResult<Arc<dyn FullRepository>> {
    let config = PostgresConfig::from_env().map_err(RepositoryError::configuration)?;
    let repo = RepositoryFactory::create_postgres(&config).await?;
    Ok(repo as Arc<dyn FullRepository>)
}

#[cfg(all(feature = "local-repo", not(feature = "postgres-repo")))]
fn create_selected_repository() -> RepositoryResult<Arc<dyn FullRepository>> {
    Ok(RepositoryFactory::create_local())
}

/// Initialize the global repository singleton for the selected backend.
#[cfg(feature = "postgres-repo")]
pub fn init_repository() -> Result<()> {
    if REPOSITORY.get().is_some() {
        return Ok(());
    }

    let runtime = Runtime::new().context("Failed to create async runtime for repository init")?;
    let repo = runtime
        .block_on(create_selected_repository())
        .map_err(|e| anyhow::Error::msg(e.to_string()))?;
    let _ = REPOSITORY.set(repo);
    Ok(())
}

/// Initialize the global repository singleton for the selected backend.
#[cfg(all(feature = "local-repo", not(feature = "postgres-repo")))]
pub fn init_repository() -> Result<()> {
    if REPOSITORY.get().is_some() {
        return Ok(());
    }

    let repo = create_selected_repository().map_err(|e| anyhow::Error::msg(e.to_string()))?;
    let _ = REPOSITORY.set(repo);
    Ok(())
}

/// Get a reference to the global repository instance.
pub fn get_repository() -> Result<&'static Arc<dyn FullRepository>> {
    if REPOSITORY.get().is_none() {
        let _ = init_repository();
    }

    REPOSITORY
        .get()
        .context("Database not initialized. Call init_repository() first.")
}
