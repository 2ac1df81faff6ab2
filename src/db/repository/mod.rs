//! Repository trait definitions for database operations.
//!
//! This module provides a collection of focused repository traits that abstract
//! database operations. By splitting responsibilities across multiple traits,
//! implementations can be more focused and testable.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`boards`]: Board CRUD and the ordered item operations
//! - [`planners`]: Planner CRUD and dated planner items
//! - [`community`]: Posts, comments, and the engagement ledger
//! - [`identity`]: Users, provider accounts, sessions, verification tokens
//! - [`library`]: Resources, lessons, and their shared edges
//!
//! # Trait Composition
//!
//! A complete repository implementation typically implements all traits:
//!
//! ```ignore
//! impl BoardRepository for MyRepo { ... }
//! impl PlannerRepository for MyRepo { ... }
//! impl CommunityRepository for MyRepo { ... }
//! impl IdentityRepository for MyRepo { ... }
//! impl LibraryRepository for MyRepo { ... }
//! ```
//!
//! # Convenience Trait Bound
//!
//! For functions that need all repository capabilities, use the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn my_service<R: FullRepository>(repo: &R) -> RepositoryResult<()> {
//!     // Can use any repository method
//!     let board = repo.create_board(&new_board).await?;
//!     repo.append_item(board.id, &new_item).await?;
//!     Ok(())
//! }
//! ```

pub mod boards;
pub mod community;
pub mod error;
pub mod identity;
pub mod library;
pub mod planners;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use boards::BoardRepository;
pub use community::CommunityRepository;
pub use identity::IdentityRepository;
pub use library::LibraryRepository;
pub use planners::PlannerRepository;

/// Composite trait bound for a complete repository implementation.
///
/// This trait is automatically implemented for any type that implements
/// all five repository traits. Use this as a convenient bound when you
/// need access to the whole surface.
///
/// # Example
///
/// ```ignore
/// async fn engagement_sweep<R: FullRepository>(
///     repo: &R,
///     post_id: PostId,
/// ) -> RepositoryResult<PostEngagement> {
///     repo.post_engagement(post_id).await
/// }
/// ```
pub trait FullRepository:
    BoardRepository + PlannerRepository + CommunityRepository + IdentityRepository + LibraryRepository
{
}

// Blanket implementation: any type implementing all five traits automatically implements FullRepository
impl<T> FullRepository for T where
    T: BoardRepository
        + PlannerRepository
        + CommunityRepository
        + IdentityRepository
        + LibraryRepository
{
}

impl std::fmt::Debug for dyn FullRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FullRepository")
    }
}
