//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres database.
//! The schema lives in the embedded migrations next to this module.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
//!
//! ## Concurrency
//!
//! Every operation that reads or rewrites the position column of a board's
//! items first takes a `FOR UPDATE` row lock on the board itself, so
//! concurrent ordering operations on the same board serialize while other
//! boards proceed untouched. The unique index on `(board_id, position)` is
//! deferred to the end of the transaction, which lets a renumbering pass move
//! rows through colliding positions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task;

use crate::api::{
    Account, AccountId, Board, BoardId, BoardInfo, BoardItem, BoardItemId, BoardStatus, Comment,
    CommentId, CommunityPost, ContentType, ItemStatus, ItemType, Lesson, LessonId, Like, LikeId,
    LikeTarget, NewAccount, NewBoard, NewBoardItem, NewComment, NewLesson, NewPlanner,
    NewPlannerItem, NewPost, NewResource, NewSession, NewUser, Planner, PlannerId, PlannerInfo,
    PlannerItem, PlannerItemId, PostEngagement, PostId, PostInfo, Resource, ResourceId,
    ResourceType, Role, Session, SessionId, User, UserId, VerificationToken, Visibility,
};
use crate::db::repository::{
    BoardRepository, CommunityRepository, ErrorContext, IdentityRepository, LibraryRepository,
    PlannerRepository, RepositoryError, RepositoryResult,
};
use crate::services::{ordering, policy, validation};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
    /// - `PG_POOL_MAX`: Maximum pool size (default: 10)
    /// - `PG_POOL_MIN`: Minimum pool size (default: 1)
    /// - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
    /// - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
    /// - `PG_MAX_RETRIES`: Maximum retry attempts (default: 3)
    /// - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
///
/// This repository implementation provides:
/// - Connection pooling with configurable limits
/// - Automatic retry for transient failures
/// - Health monitoring and statistics
/// - Automatic schema migrations
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Arguments
    /// * `config` - Database configuration
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: std::sync::Arc::new(AtomicU64::new(0)),
            failed_queries: std::sync::Arc::new(AtomicU64::new(0)),
            retried_operations: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// This method will retry the operation up to `max_retries` times if a
    /// retryable error occurs (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                // Get connection
                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                // Execute the operation
                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    ///
    /// Returns current pool state and query statistics for monitoring.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    ///
    /// Performs a simple query to verify connectivity.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

/// Decode a stored enum column. A value that does not parse means the row
/// was written outside this crate, which is corruption, not caller error.
fn parse_enum<T>(value: &str, column: &str) -> RepositoryResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse::<T>().map_err(|message| {
        RepositoryError::internal_with_context(
            message,
            ErrorContext::new("decode_row").with_details(format!("column={}", column)),
        )
    })
}

// ==================== Row Conversions ====================

fn row_to_user(row: UserRow) -> RepositoryResult<User> {
    Ok(User {
        id: UserId::new(row.id),
        name: row.name,
        email: row.email,
        email_verified: row.email_verified,
        image: row.image,
        role: parse_enum::<Role>(&row.role, "users.role")?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_account(row: AccountRow) -> Account {
    Account {
        id: AccountId::new(row.id),
        user_id: UserId::new(row.user_id),
        account_type: row.account_type,
        provider: row.provider,
        provider_account_id: row.provider_account_id,
        refresh_token: row.refresh_token,
        access_token: row.access_token,
        expires_at: row.expires_at,
        token_type: row.token_type,
        scope: row.scope,
        id_token: row.id_token,
        session_state: row.session_state,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_session(row: SessionRow) -> Session {
    Session {
        id: SessionId::new(row.id),
        session_token: row.session_token,
        user_id: UserId::new(row.user_id),
        expires: row.expires,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_verification_token(row: VerificationTokenRow) -> VerificationToken {
    VerificationToken {
        identifier: row.identifier,
        token: row.token,
        expires: row.expires,
        created_at: row.created_at,
    }
}

fn row_to_board(row: BoardRow) -> RepositoryResult<Board> {
    Ok(Board {
        id: BoardId::new(row.id),
        owner_id: UserId::new(row.owner_id),
        title: row.title,
        description: row.description,
        status: parse_enum::<BoardStatus>(&row.status, "boards.status")?,
        visibility: parse_enum::<Visibility>(&row.visibility, "boards.visibility")?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_board_item(row: BoardItemRow) -> RepositoryResult<BoardItem> {
    Ok(BoardItem {
        id: BoardItemId::new(row.id),
        board_id: BoardId::new(row.board_id),
        author_id: UserId::new(row.author_id),
        title: row.title,
        content: row.content,
        item_type: parse_enum::<ItemType>(&row.item_type, "board_items.item_type")?,
        position: row.position,
        status: parse_enum::<ItemStatus>(&row.status, "board_items.status")?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_planner(row: PlannerRow) -> Planner {
    Planner {
        id: PlannerId::new(row.id),
        owner_id: UserId::new(row.owner_id),
        title: row.title,
        start_date: row.start_date,
        end_date: row.end_date,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_planner_item(row: PlannerItemRow) -> RepositoryResult<PlannerItem> {
    Ok(PlannerItem {
        id: PlannerItemId::new(row.id),
        planner_id: PlannerId::new(row.planner_id),
        author_id: UserId::new(row.author_id),
        lesson_id: row.lesson_id.map(LessonId::new),
        title: row.title,
        date: row.date,
        start_time: row.start_time,
        end_time: row.end_time,
        status: parse_enum::<ItemStatus>(&row.status, "planner_items.status")?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_resource(row: ResourceRow) -> RepositoryResult<Resource> {
    Ok(Resource {
        id: ResourceId::new(row.id),
        owner_id: UserId::new(row.owner_id),
        title: row.title,
        description: row.description,
        url: row.url,
        resource_type: parse_enum::<ResourceType>(&row.resource_type, "resources.resource_type")?,
        visibility: parse_enum::<Visibility>(&row.visibility, "resources.visibility")?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_lesson(row: LessonRow) -> Lesson {
    Lesson {
        id: LessonId::new(row.id),
        title: row.title,
        description: row.description,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_post(row: PostRow) -> RepositoryResult<CommunityPost> {
    Ok(CommunityPost {
        id: PostId::new(row.id),
        author_id: UserId::new(row.author_id),
        title: row.title,
        body: row.body,
        visibility: parse_enum::<Visibility>(&row.visibility, "community_posts.visibility")?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_comment(row: CommentRow) -> Comment {
    Comment {
        id: CommentId::new(row.id),
        post_id: PostId::new(row.post_id),
        author_id: UserId::new(row.author_id),
        body: row.body,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn row_to_like(row: LikeRow) -> RepositoryResult<Like> {
    let like = Like {
        id: LikeId::new(row.id),
        user_id: UserId::new(row.user_id),
        content_type: parse_enum::<ContentType>(&row.content_type, "likes.content_type")?,
        content_id: row.content_id,
        post_id: row.post_id.map(PostId::new),
        comment_id: row.comment_id.map(CommentId::new),
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    validation::validate_like_shape(&like).map_err(RepositoryError::validation)?;
    Ok(like)
}

// ==================== Transaction Helpers ====================

/// Fetch a board inside a transaction, taking a `FOR UPDATE` row lock so
/// concurrent item writes on the same board serialize.
fn lock_board(tx: &mut PgConnection, board_id: BoardId) -> RepositoryResult<BoardRow> {
    boards::table
        .filter(boards::id.eq(board_id.value()))
        .for_update()
        .select(BoardRow::as_select())
        .first::<BoardRow>(tx)
        .optional()
        .map_err(map_diesel_error)?
        .ok_or_else(|| RepositoryError::not_found(format!("Board {} not found", board_id)))
}

fn ensure_board_writable(row: &BoardRow) -> RepositoryResult<()> {
    let status = parse_enum::<BoardStatus>(&row.status, "boards.status")?;
    if !policy::board_accepts_item_writes(status) {
        return Err(RepositoryError::policy(format!(
            "Board {} is archived and rejects item writes",
            row.id
        )));
    }
    Ok(())
}

fn lock_writable_board(tx: &mut PgConnection, board_id: BoardId) -> RepositoryResult<BoardRow> {
    let row = lock_board(tx, board_id)?;
    ensure_board_writable(&row)?;
    Ok(row)
}

fn get_board_item_tx(tx: &mut PgConnection, item_id: BoardItemId) -> RepositoryResult<BoardItemRow> {
    board_items::table
        .find(item_id.value())
        .select(BoardItemRow::as_select())
        .first::<BoardItemRow>(tx)
        .optional()
        .map_err(map_diesel_error)?
        .ok_or_else(|| RepositoryError::not_found(format!("Board item {} not found", item_id)))
}

/// `(id, position)` of every item on the board, in effective order.
fn board_order_tx(tx: &mut PgConnection, board_id: BoardId) -> RepositoryResult<Vec<(i64, i64)>> {
    board_items::table
        .filter(board_items::board_id.eq(board_id.value()))
        .order(board_items::position.asc())
        .select((board_items::id, board_items::position))
        .load::<(i64, i64)>(tx)
        .map_err(map_diesel_error)
}

/// Rewrite the board to evenly spaced positions. Relative order is kept.
fn renumber_board_tx(tx: &mut PgConnection, board_id: BoardId) -> RepositoryResult<usize> {
    let order = board_order_tx(tx, board_id)?;
    for ((item_id, old), fresh) in order
        .iter()
        .zip(ordering::renumbered_positions(order.len()))
    {
        if *old == fresh {
            continue;
        }
        diesel::update(board_items::table.find(*item_id))
            .set(board_items::position.eq(fresh))
            .execute(tx)
            .map_err(map_diesel_error)?;
    }
    Ok(order.len())
}

/// Allocate a position for a row landing at `index` (`None` appends),
/// renumbering the board first if the surrounding gap is exhausted.
fn allocate_position_tx(
    tx: &mut PgConnection,
    board_id: BoardId,
    index: Option<usize>,
) -> RepositoryResult<i64> {
    let positions: Vec<i64> = board_order_tx(tx, board_id)?
        .into_iter()
        .map(|(_, p)| p)
        .collect();
    let index = index.unwrap_or(positions.len());
    match ordering::plan_insertion(&positions, index) {
        ordering::Placement::At(position) => Ok(position),
        ordering::Placement::RenumberRequired => {
            renumber_board_tx(tx, board_id)?;
            let positions: Vec<i64> = board_order_tx(tx, board_id)?
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

fn insert_board_item_tx(
    tx: &mut PgConnection,
    board_id: BoardId,
    item: &NewBoardItem,
    index: Option<usize>,
) -> RepositoryResult<BoardItem> {
    let position = allocate_position_tx(tx, board_id, index)?;
    let row = NewBoardItemRow {
        board_id: board_id.value(),
        author_id: item.author_id.value(),
        title: item.title.clone(),
        content: item.content.clone(),
        item_type: item.item_type.as_str().to_string(),
        position,
        status: ItemStatus::Todo.as_str().to_string(),
    };
    let inserted: BoardItemRow = diesel::insert_into(board_items::table)
        .values(&row)
        .returning(BoardItemRow::as_returning())
        .get_result(tx)
        .map_err(map_diesel_error)?;
    row_to_board_item(inserted)
}

/// Move an item within its own board. The caller holds the board lock.
fn move_within_board_tx(
    tx: &mut PgConnection,
    item: BoardItemRow,
    index: usize,
) -> RepositoryResult<BoardItem> {
    let board_id = BoardId::new(item.board_id);
    let order = board_order_tx(tx, board_id)?;
    let positions: Vec<i64> = order.iter().map(|(_, p)| *p).collect();
    let from = order
        .iter()
        .position(|(id, _)| *id == item.id)
        .ok_or_else(|| RepositoryError::internal("Item missing from its own board order"))?;
    let target = ordering::clamp_index(index, order.len().saturating_sub(1));

    match ordering::plan_move(&positions, from, target) {
        // Already at the target index: no write at all.
        None => row_to_board_item(item),
        Some(ordering::Placement::At(position)) => {
            let updated: BoardItemRow = diesel::update(board_items::table.find(item.id))
                .set(board_items::position.eq(position))
                .returning(BoardItemRow::as_returning())
                .get_result(tx)
                .map_err(map_diesel_error)?;
            row_to_board_item(updated)
        }
        Some(ordering::Placement::RenumberRequired) => {
            let mut ids: Vec<i64> = order.iter().map(|(id, _)| *id).collect();
            ids.remove(from);
            ids.insert(target, item.id);
            for (id, position) in ids.iter().zip(ordering::renumbered_positions(ids.len())) {
                diesel::update(board_items::table.find(*id))
                    .set(board_items::position.eq(position))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
            }
            let row: BoardItemRow = board_items::table
                .find(item.id)
                .select(BoardItemRow::as_select())
                .first(tx)
                .map_err(map_diesel_error)?;
            row_to_board_item(row)
        }
    }
}

fn item_transition_gate(
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
impl BoardRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_board(&self, board: &NewBoard) -> RepositoryResult<Board> {
        let board = board.clone();
        self.with_conn(move |conn| {
            let row = NewBoardRow {
                owner_id: board.owner_id.value(),
                title: board.title.clone(),
                description: board.description.clone(),
                status: BoardStatus::Active.as_str().to_string(),
                visibility: board.visibility.as_str().to_string(),
            };
            let inserted: BoardRow = diesel::insert_into(boards::table)
                .values(&row)
                .returning(BoardRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            row_to_board(inserted)
        })
        .await
    }

    async fn get_board(&self, board_id: BoardId) -> RepositoryResult<Board> {
        self.with_conn(move |conn| {
            let row = boards::table
                .find(board_id.value())
                .select(BoardRow::as_select())
                .first::<BoardRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Board {} not found", board_id))
                })?;
            row_to_board(row)
        })
        .await
    }

    async fn list_boards_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<BoardInfo>> {
        self.with_conn(move |conn| {
            let rows: Vec<BoardRow> = boards::table
                .filter(boards::owner_id.eq(owner_id.value()))
                .order(boards::id.desc())
                .select(BoardRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;

            let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
            let counts: HashMap<i64, i64> = board_items::table
                .filter(board_items::board_id.eq_any(&ids))
                .group_by(board_items::board_id)
                .select((board_items::board_id, count_star()))
                .load::<(i64, i64)>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .collect();

            rows.into_iter()
                .map(|row| {
                    Ok(BoardInfo {
                        board_id: BoardId::new(row.id),
                        title: row.title,
                        status: parse_enum::<BoardStatus>(&row.status, "boards.status")?,
                        visibility: parse_enum::<Visibility>(
                            &row.visibility,
                            "boards.visibility",
                        )?,
                        item_count: counts.get(&row.id).copied().unwrap_or(0),
                    })
                })
                .collect()
        })
        .await
    }

    async fn update_board(
        &self,
        board_id: BoardId,
        title: &str,
        description: Option<&str>,
        visibility: Visibility,
    ) -> RepositoryResult<Board> {
        let title = title.to_string();
        let description = description.map(|d| d.to_string());
        self.with_conn(move |conn| {
            let updated = diesel::update(boards::table.find(board_id.value()))
                .set((
                    boards::title.eq(title.clone()),
                    boards::description.eq(description.clone()),
                    boards::visibility.eq(visibility.as_str()),
                ))
                .returning(BoardRow::as_returning())
                .get_result::<BoardRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Board {} not found", board_id))
                })?;
            row_to_board(updated)
        })
        .await
    }

    async fn set_board_status(
        &self,
        board_id: BoardId,
        status: BoardStatus,
    ) -> RepositoryResult<Board> {
        self.with_conn(move |conn| {
            let updated = diesel::update(boards::table.find(board_id.value()))
                .set(boards::status.eq(status.as_str()))
                .returning(BoardRow::as_returning())
                .get_result::<BoardRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Board {} not found", board_id))
                })?;
            row_to_board(updated)
        })
        .await
    }

    async fn delete_board(&self, board_id: BoardId) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let item_count: i64 = board_items::table
                    .filter(board_items::board_id.eq(board_id.value()))
                    .select(count_star())
                    .first(tx)
                    .map_err(map_diesel_error)?;

                // Items go with the board via `ON DELETE CASCADE`.
                let deleted = diesel::delete(boards::table.find(board_id.value()))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                if deleted == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "Board {} not found",
                        board_id
                    )));
                }
                Ok(item_count as usize)
            })
        })
        .await
    }

    async fn get_board_item(&self, item_id: BoardItemId) -> RepositoryResult<BoardItem> {
        self.with_conn(move |conn| {
            let row = get_board_item_tx(conn, item_id)?;
            row_to_board_item(row)
        })
        .await
    }

    async fn list_board_items(&self, board_id: BoardId) -> RepositoryResult<Vec<BoardItem>> {
        self.with_conn(move |conn| {
            let known: i64 = boards::table
                .filter(boards::id.eq(board_id.value()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;
            if known == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Board {} not found",
                    board_id
                )));
            }

            let rows: Vec<BoardItemRow> = board_items::table
                .filter(board_items::board_id.eq(board_id.value()))
                .order(board_items::position.asc())
                .select(BoardItemRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(row_to_board_item).collect()
        })
        .await
    }

    async fn append_item(
        &self,
        board_id: BoardId,
        item: &NewBoardItem,
    ) -> RepositoryResult<BoardItem> {
        let item = item.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                lock_writable_board(tx, board_id)?;
                insert_board_item_tx(tx, board_id, &item, None)
            })
        })
        .await
    }

    async fn insert_item_at(
        &self,
        board_id: BoardId,
        item: &NewBoardItem,
        index: usize,
    ) -> RepositoryResult<BoardItem> {
        let item = item.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                lock_writable_board(tx, board_id)?;
                insert_board_item_tx(tx, board_id, &item, Some(index))
            })
        })
        .await
    }

    async fn move_item(&self, item_id: BoardItemId, index: usize) -> RepositoryResult<BoardItem> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = get_board_item_tx(tx, item_id)?;
                lock_writable_board(tx, BoardId::new(row.board_id))?;
                // Reload under the lock; a concurrent move may have shifted it.
                let row = get_board_item_tx(tx, item_id)?;
                move_within_board_tx(tx, row, index)
            })
        })
        .await
    }

    async fn move_item_to_board(
        &self,
        item_id: BoardItemId,
        target_board_id: BoardId,
        index: Option<usize>,
    ) -> RepositoryResult<BoardItem> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = get_board_item_tx(tx, item_id)?;
                let source_board_id = BoardId::new(row.board_id);

                if source_board_id == target_board_id {
                    lock_writable_board(tx, source_board_id)?;
                    let row = get_board_item_tx(tx, item_id)?;
                    return match index {
                        Some(index) => move_within_board_tx(tx, row, index),
                        None => row_to_board_item(row),
                    };
                }

                // Lock both boards in id order so concurrent cross-board
                // moves in opposite directions cannot deadlock.
                let locked: Vec<BoardRow> = boards::table
                    .filter(boards::id.eq_any([source_board_id.value(), target_board_id.value()]))
                    .order(boards::id.asc())
                    .for_update()
                    .select(BoardRow::as_select())
                    .load(tx)
                    .map_err(map_diesel_error)?;
                for board_id in [source_board_id, target_board_id] {
                    let board = locked
                        .iter()
                        .find(|b| b.id == board_id.value())
                        .ok_or_else(|| {
                            RepositoryError::not_found(format!("Board {} not found", board_id))
                        })?;
                    ensure_board_writable(board)?;
                }

                // The source position is never carried over.
                let position = allocate_position_tx(tx, target_board_id, index)?;
                let updated: BoardItemRow =
                    diesel::update(board_items::table.find(item_id.value()))
                        .set((
                            board_items::board_id.eq(target_board_id.value()),
                            board_items::position.eq(position),
                        ))
                        .returning(BoardItemRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                row_to_board_item(updated)
            })
        })
        .await
    }

    async fn reorder_board(&self, board_id: BoardId) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                lock_writable_board(tx, board_id)?;
                renumber_board_tx(tx, board_id)
            })
        })
        .await
    }

    async fn update_board_item(
        &self,
        item_id: BoardItemId,
        title: &str,
        content: Option<&str>,
        item_type: ItemType,
    ) -> RepositoryResult<BoardItem> {
        let title = title.to_string();
        let content = content.map(|c| c.to_string());
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = get_board_item_tx(tx, item_id)?;
                lock_writable_board(tx, BoardId::new(row.board_id))?;

                let updated: BoardItemRow =
                    diesel::update(board_items::table.find(item_id.value()))
                        .set((
                            board_items::title.eq(title.clone()),
                            board_items::content.eq(content.clone()),
                            board_items::item_type.eq(item_type.as_str()),
                        ))
                        .returning(BoardItemRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                row_to_board_item(updated)
            })
        })
        .await
    }

    async fn set_board_item_status(
        &self,
        item_id: BoardItemId,
        status: ItemStatus,
    ) -> RepositoryResult<BoardItem> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = get_board_item_tx(tx, item_id)?;
                lock_writable_board(tx, BoardId::new(row.board_id))?;
                let row = get_board_item_tx(tx, item_id)?;

                let current = parse_enum::<ItemStatus>(&row.status, "board_items.status")?;
                if !item_transition_gate(current, status, "Board item", row.id)? {
                    return row_to_board_item(row);
                }

                let updated: BoardItemRow =
                    diesel::update(board_items::table.find(item_id.value()))
                        .set(board_items::status.eq(status.as_str()))
                        .returning(BoardItemRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                row_to_board_item(updated)
            })
        })
        .await
    }

    async fn reopen_board_item(&self, item_id: BoardItemId) -> RepositoryResult<BoardItem> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = get_board_item_tx(tx, item_id)?;
                lock_writable_board(tx, BoardId::new(row.board_id))?;
                let row = get_board_item_tx(tx, item_id)?;

                let current = parse_enum::<ItemStatus>(&row.status, "board_items.status")?;
                if !policy::can_reopen(current, ItemStatus::InProgress) {
                    return Err(RepositoryError::policy(format!(
                        "Board item {} is {} and cannot be reopened",
                        item_id, current
                    )));
                }

                let updated: BoardItemRow =
                    diesel::update(board_items::table.find(item_id.value()))
                        .set(board_items::status.eq(ItemStatus::InProgress.as_str()))
                        .returning(BoardItemRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                row_to_board_item(updated)
            })
        })
        .await
    }

    async fn delete_board_item(&self, item_id: BoardItemId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = get_board_item_tx(tx, item_id)?;
                lock_writable_board(tx, BoardId::new(row.board_id))?;

                // Deletion leaves a gap; only insertion closes gaps.
                diesel::delete(board_items::table.find(item_id.value()))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                Ok(())
            })
        })
        .await
    }
}

#[async_trait]
impl PlannerRepository for PostgresRepository {
    async fn create_planner(&self, planner: &NewPlanner) -> RepositoryResult<Planner> {
        validation::validate_planner_window(planner.start_date, planner.end_date)
            .map_err(RepositoryError::validation)?;

        let planner = planner.clone();
        self.with_conn(move |conn| {
            let row = NewPlannerRow {
                owner_id: planner.owner_id.value(),
                title: planner.title.clone(),
                start_date: planner.start_date,
                end_date: planner.end_date,
            };
            let inserted: PlannerRow = diesel::insert_into(planners::table)
                .values(&row)
                .returning(PlannerRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(row_to_planner(inserted))
        })
        .await
    }

    async fn get_planner(&self, planner_id: PlannerId) -> RepositoryResult<Planner> {
        self.with_conn(move |conn| {
            let row = planners::table
                .find(planner_id.value())
                .select(PlannerRow::as_select())
                .first::<PlannerRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Planner {} not found", planner_id))
                })?;
            Ok(row_to_planner(row))
        })
        .await
    }

    async fn list_planners_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<PlannerInfo>> {
        self.with_conn(move |conn| {
            let rows: Vec<PlannerRow> = planners::table
                .filter(planners::owner_id.eq(owner_id.value()))
                .order(planners::id.desc())
                .select(PlannerRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;

            let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
            let counts: HashMap<i64, i64> = planner_items::table
                .filter(planner_items::planner_id.eq_any(&ids))
                .group_by(planner_items::planner_id)
                .select((planner_items::planner_id, count_star()))
                .load::<(i64, i64)>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .collect();

            Ok(rows
                .into_iter()
                .map(|row| PlannerInfo {
                    planner_id: PlannerId::new(row.id),
                    title: row.title,
                    start_date: row.start_date,
                    end_date: row.end_date,
                    item_count: counts.get(&row.id).copied().unwrap_or(0),
                })
                .collect())
        })
        .await
    }

    async fn update_planner(
        &self,
        planner_id: PlannerId,
        title: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RepositoryResult<Planner> {
        validation::validate_planner_window(start_date, end_date)
            .map_err(RepositoryError::validation)?;

        let title = title.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(planners::table.find(planner_id.value()))
                .set((
                    planners::title.eq(title.clone()),
                    planners::start_date.eq(start_date),
                    planners::end_date.eq(end_date),
                ))
                .returning(PlannerRow::as_returning())
                .get_result::<PlannerRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Planner {} not found", planner_id))
                })?;
            Ok(row_to_planner(updated))
        })
        .await
    }

    async fn delete_planner(&self, planner_id: PlannerId) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let item_count: i64 = planner_items::table
                    .filter(planner_items::planner_id.eq(planner_id.value()))
                    .select(count_star())
                    .first(tx)
                    .map_err(map_diesel_error)?;

                let deleted = diesel::delete(planners::table.find(planner_id.value()))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                if deleted == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "Planner {} not found",
                        planner_id
                    )));
                }
                Ok(item_count as usize)
            })
        })
        .await
    }

    async fn add_planner_item(
        &self,
        planner_id: PlannerId,
        item: &NewPlannerItem,
    ) -> RepositoryResult<PlannerItem> {
        let item = item.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let planner_row = planners::table
                    .find(planner_id.value())
                    .select(PlannerRow::as_select())
                    .first::<PlannerRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::not_found(format!("Planner {} not found", planner_id))
                    })?;
                let planner = row_to_planner(planner_row);
                validation::validate_planner_item(&item, &planner)
                    .map_err(RepositoryError::validation)?;

                // A dangling lesson link trips the foreign key, which maps
                // to NotFound.
                let row = NewPlannerItemRow {
                    planner_id: planner_id.value(),
                    author_id: item.author_id.value(),
                    lesson_id: item.lesson_id.map(|id| id.value()),
                    title: item.title.clone(),
                    date: item.date,
                    start_time: item.start_time,
                    end_time: item.end_time,
                    status: ItemStatus::Planned.as_str().to_string(),
                };
                let inserted: PlannerItemRow = diesel::insert_into(planner_items::table)
                    .values(&row)
                    .returning(PlannerItemRow::as_returning())
                    .get_result(tx)
                    .map_err(map_diesel_error)?;
                row_to_planner_item(inserted)
            })
        })
        .await
    }

    async fn get_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<PlannerItem> {
        self.with_conn(move |conn| {
            let row = planner_items::table
                .find(item_id.value())
                .select(PlannerItemRow::as_select())
                .first::<PlannerItemRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Planner item {} not found", item_id))
                })?;
            row_to_planner_item(row)
        })
        .await
    }

    async fn list_planner_items(
        &self,
        planner_id: PlannerId,
    ) -> RepositoryResult<Vec<PlannerItem>> {
        self.with_conn(move |conn| {
            let known: i64 = planners::table
                .filter(planners::id.eq(planner_id.value()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;
            if known == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Planner {} not found",
                    planner_id
                )));
            }

            // Untimed items sort before timed ones on the same date.
            let rows: Vec<PlannerItemRow> = planner_items::table
                .filter(planner_items::planner_id.eq(planner_id.value()))
                .order((
                    planner_items::date.asc(),
                    planner_items::start_time.asc().nulls_first(),
                    planner_items::id.asc(),
                ))
                .select(PlannerItemRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(row_to_planner_item).collect()
        })
        .await
    }

    async fn update_planner_item(
        &self,
        item_id: PlannerItemId,
        title: &str,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> RepositoryResult<PlannerItem> {
        let title = title.to_string();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = planner_items::table
                    .find(item_id.value())
                    .select(PlannerItemRow::as_select())
                    .first::<PlannerItemRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::not_found(format!("Planner item {} not found", item_id))
                    })?;
                let planner_row = planners::table
                    .find(row.planner_id)
                    .select(PlannerRow::as_select())
                    .first::<PlannerRow>(tx)
                    .map_err(map_diesel_error)?;
                let planner = row_to_planner(planner_row);

                validation::validate_item_date(date, &planner)
                    .map_err(RepositoryError::validation)?;
                validation::validate_item_times(start_time, end_time)
                    .map_err(RepositoryError::validation)?;

                let updated: PlannerItemRow =
                    diesel::update(planner_items::table.find(item_id.value()))
                        .set((
                            planner_items::title.eq(title.clone()),
                            planner_items::date.eq(date),
                            planner_items::start_time.eq(start_time),
                            planner_items::end_time.eq(end_time),
                        ))
                        .returning(PlannerItemRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                row_to_planner_item(updated)
            })
        })
        .await
    }

    async fn set_planner_item_status(
        &self,
        item_id: PlannerItemId,
        status: ItemStatus,
    ) -> RepositoryResult<PlannerItem> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = planner_items::table
                    .find(item_id.value())
                    .for_update()
                    .select(PlannerItemRow::as_select())
                    .first::<PlannerItemRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::not_found(format!("Planner item {} not found", item_id))
                    })?;

                let current = parse_enum::<ItemStatus>(&row.status, "planner_items.status")?;
                if !item_transition_gate(current, status, "Planner item", row.id)? {
                    return row_to_planner_item(row);
                }

                let updated: PlannerItemRow =
                    diesel::update(planner_items::table.find(item_id.value()))
                        .set(planner_items::status.eq(status.as_str()))
                        .returning(PlannerItemRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                row_to_planner_item(updated)
            })
        })
        .await
    }

    async fn reopen_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<PlannerItem> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row = planner_items::table
                    .find(item_id.value())
                    .for_update()
                    .select(PlannerItemRow::as_select())
                    .first::<PlannerItemRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::not_found(format!("Planner item {} not found", item_id))
                    })?;

                let current = parse_enum::<ItemStatus>(&row.status, "planner_items.status")?;
                if !policy::can_reopen(current, ItemStatus::InProgress) {
                    return Err(RepositoryError::policy(format!(
                        "Planner item {} is {} and cannot be reopened",
                        item_id, current
                    )));
                }

                let updated: PlannerItemRow =
                    diesel::update(planner_items::table.find(item_id.value()))
                        .set(planner_items::status.eq(ItemStatus::InProgress.as_str()))
                        .returning(PlannerItemRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                row_to_planner_item(updated)
            })
        })
        .await
    }

    async fn delete_planner_item(&self, item_id: PlannerItemId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(planner_items::table.find(item_id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Planner item {} not found",
                    item_id
                )));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl CommunityRepository for PostgresRepository {
    async fn create_post(&self, post: &NewPost) -> RepositoryResult<CommunityPost> {
        let post = post.clone();
        self.with_conn(move |conn| {
            let row = NewPostRow {
                author_id: post.author_id.value(),
                title: post.title.clone(),
                body: post.body.clone(),
                visibility: post.visibility.as_str().to_string(),
            };
            let inserted: PostRow = diesel::insert_into(community_posts::table)
                .values(&row)
                .returning(PostRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            row_to_post(inserted)
        })
        .await
    }

    async fn get_post(&self, post_id: PostId) -> RepositoryResult<CommunityPost> {
        self.with_conn(move |conn| {
            let row = community_posts::table
                .find(post_id.value())
                .select(PostRow::as_select())
                .first::<PostRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::not_found(format!("Post {} not found", post_id)))?;
            row_to_post(row)
        })
        .await
    }

    async fn list_posts(&self) -> RepositoryResult<Vec<PostInfo>> {
        self.with_conn(|conn| {
            let rows: Vec<PostRow> = community_posts::table
                .order(community_posts::id.desc())
                .select(PostRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;

            let comment_counts: HashMap<i64, i64> = comments::table
                .group_by(comments::post_id)
                .select((comments::post_id, count_star()))
                .load::<(i64, i64)>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .collect();
            let like_counts: HashMap<i64, i64> = likes::table
                .filter(likes::content_type.eq(ContentType::Post.as_str()))
                .group_by(likes::content_id)
                .select((likes::content_id, count_star()))
                .load::<(i64, i64)>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .collect();

            rows.into_iter()
                .map(|row| {
                    Ok(PostInfo {
                        post_id: PostId::new(row.id),
                        author_id: UserId::new(row.author_id),
                        title: row.title,
                        visibility: parse_enum::<Visibility>(
                            &row.visibility,
                            "community_posts.visibility",
                        )?,
                        comment_count: comment_counts.get(&row.id).copied().unwrap_or(0),
                        like_count: like_counts.get(&row.id).copied().unwrap_or(0),
                        created_at: row.created_at,
                    })
                })
                .collect()
        })
        .await
    }

    async fn delete_post(&self, post_id: PostId) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let comment_ids: Vec<i64> = comments::table
                    .filter(comments::post_id.eq(post_id.value()))
                    .select(comments::id)
                    .load(tx)
                    .map_err(map_diesel_error)?;

                let post_likes: i64 = likes::table
                    .filter(likes::content_type.eq(ContentType::Post.as_str()))
                    .filter(likes::content_id.eq(post_id.value()))
                    .select(count_star())
                    .first(tx)
                    .map_err(map_diesel_error)?;
                let comment_likes: i64 = if comment_ids.is_empty() {
                    0
                } else {
                    likes::table
                        .filter(likes::content_type.eq(ContentType::Comment.as_str()))
                        .filter(likes::content_id.eq_any(&comment_ids))
                        .select(count_star())
                        .first(tx)
                        .map_err(map_diesel_error)?
                };

                // Comments and likes go with the post via `ON DELETE CASCADE`.
                let deleted = diesel::delete(community_posts::table.find(post_id.value()))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                if deleted == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "Post {} not found",
                        post_id
                    )));
                }
                Ok(comment_ids.len() + post_likes as usize + comment_likes as usize)
            })
        })
        .await
    }

    async fn add_comment(&self, comment: &NewComment) -> RepositoryResult<Comment> {
        let comment = comment.clone();
        self.with_conn(move |conn| {
            let row = NewCommentRow {
                post_id: comment.post_id.value(),
                author_id: comment.author_id.value(),
                body: comment.body.clone(),
            };
            let inserted: CommentRow = diesel::insert_into(comments::table)
                .values(&row)
                .returning(CommentRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(row_to_comment(inserted))
        })
        .await
    }

    async fn get_comment(&self, comment_id: CommentId) -> RepositoryResult<Comment> {
        self.with_conn(move |conn| {
            let row = comments::table
                .find(comment_id.value())
                .select(CommentRow::as_select())
                .first::<CommentRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Comment {} not found", comment_id))
                })?;
            Ok(row_to_comment(row))
        })
        .await
    }

    async fn list_comments_for_post(&self, post_id: PostId) -> RepositoryResult<Vec<Comment>> {
        self.with_conn(move |conn| {
            let known: i64 = community_posts::table
                .filter(community_posts::id.eq(post_id.value()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;
            if known == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Post {} not found",
                    post_id
                )));
            }

            let rows: Vec<CommentRow> = comments::table
                .filter(comments::post_id.eq(post_id.value()))
                .order(comments::id.asc())
                .select(CommentRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(row_to_comment).collect())
        })
        .await
    }

    async fn delete_comment(&self, comment_id: CommentId) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let like_count: i64 = likes::table
                    .filter(likes::content_type.eq(ContentType::Comment.as_str()))
                    .filter(likes::content_id.eq(comment_id.value()))
                    .select(count_star())
                    .first(tx)
                    .map_err(map_diesel_error)?;

                let deleted = diesel::delete(comments::table.find(comment_id.value()))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                if deleted == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "Comment {} not found",
                        comment_id
                    )));
                }
                Ok(like_count as usize)
            })
        })
        .await
    }

    async fn like(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<Like> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                // Check the target in the same transaction as the write so a
                // concurrent deletion cannot leave a dangling like.
                let known: i64 = match target {
                    LikeTarget::Post(post_id) => community_posts::table
                        .filter(community_posts::id.eq(post_id.value()))
                        .select(count_star())
                        .first(tx)
                        .map_err(map_diesel_error)?,
                    LikeTarget::Comment(comment_id) => comments::table
                        .filter(comments::id.eq(comment_id.value()))
                        .select(count_star())
                        .first(tx)
                        .map_err(map_diesel_error)?,
                };
                if known == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "{} {} not found",
                        target.content_type(),
                        target.content_id()
                    )));
                }

                let (post_ref, comment_ref) = target.reference_columns();
                let row = NewLikeRow {
                    user_id: user_id.value(),
                    content_type: target.content_type().as_str().to_string(),
                    content_id: target.content_id(),
                    post_id: post_ref.map(|id| id.value()),
                    comment_id: comment_ref.map(|id| id.value()),
                };
                // Liked is liked: a second like resolves to the stored row.
                diesel::insert_into(likes::table)
                    .values(&row)
                    .on_conflict((likes::user_id, likes::content_type, likes::content_id))
                    .do_nothing()
                    .execute(tx)
                    .map_err(map_diesel_error)?;

                let stored: LikeRow = likes::table
                    .filter(likes::user_id.eq(user_id.value()))
                    .filter(likes::content_type.eq(target.content_type().as_str()))
                    .filter(likes::content_id.eq(target.content_id()))
                    .select(LikeRow::as_select())
                    .first(tx)
                    .map_err(map_diesel_error)?;
                row_to_like(stored)
            })
        })
        .await
    }

    async fn unlike(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(
                likes::table
                    .filter(likes::user_id.eq(user_id.value()))
                    .filter(likes::content_type.eq(target.content_type().as_str()))
                    .filter(likes::content_id.eq(target.content_id())),
            )
            .execute(conn)
            .map_err(map_diesel_error)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn has_liked(&self, user_id: UserId, target: LikeTarget) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let count: i64 = likes::table
                .filter(likes::user_id.eq(user_id.value()))
                .filter(likes::content_type.eq(target.content_type().as_str()))
                .filter(likes::content_id.eq(target.content_id()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;
            Ok(count > 0)
        })
        .await
    }

    async fn like_count(&self, target: LikeTarget) -> RepositoryResult<i64> {
        self.with_conn(move |conn| {
            likes::table
                .filter(likes::content_type.eq(target.content_type().as_str()))
                .filter(likes::content_id.eq(target.content_id()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn post_engagement(&self, post_id: PostId) -> RepositoryResult<PostEngagement> {
        self.with_conn(move |conn| {
            let known: i64 = community_posts::table
                .filter(community_posts::id.eq(post_id.value()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;
            if known == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Post {} not found",
                    post_id
                )));
            }

            let comment_count: i64 = comments::table
                .filter(comments::post_id.eq(post_id.value()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;
            let like_count: i64 = likes::table
                .filter(likes::content_type.eq(ContentType::Post.as_str()))
                .filter(likes::content_id.eq(post_id.value()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;

            Ok(PostEngagement {
                post_id,
                comment_count,
                like_count,
            })
        })
        .await
    }
}

#[async_trait]
impl IdentityRepository for PostgresRepository {
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let user = user.clone();
        self.with_conn(move |conn| {
            let row = NewUserRow {
                name: user.name.clone(),
                email: user.email.clone(),
                image: user.image.clone(),
                role: user.role.as_str().to_string(),
            };
            // A duplicate email trips the unique index, which maps to
            // ConflictError.
            let inserted: UserRow = diesel::insert_into(users::table)
                .values(&row)
                .returning(UserRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            row_to_user(inserted)
        })
        .await
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.with_conn(move |conn| {
            let row = users::table
                .find(user_id.value())
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::not_found(format!("User {} not found", user_id)))?;
            row_to_user(row)
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            users::table
                .filter(users::email.eq(email.clone()))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(row_to_user)
                .transpose()
        })
        .await
    }

    async fn set_user_role(&self, user_id: UserId, role: Role) -> RepositoryResult<User> {
        self.with_conn(move |conn| {
            let updated = diesel::update(users::table.find(user_id.value()))
                .set(users::role.eq(role.as_str()))
                .returning(UserRow::as_returning())
                .get_result::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::not_found(format!("User {} not found", user_id)))?;
            row_to_user(updated)
        })
        .await
    }

    async fn upsert_account(&self, account: &NewAccount) -> RepositoryResult<Account> {
        let account = account.clone();
        self.with_conn(move |conn| {
            let row = NewAccountRow {
                user_id: account.user_id.value(),
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
            };
            let stored: AccountRow = diesel::insert_into(accounts::table)
                .values(&row)
                .on_conflict((accounts::provider, accounts::provider_account_id))
                .do_update()
                .set((
                    accounts::refresh_token.eq(excluded(accounts::refresh_token)),
                    accounts::access_token.eq(excluded(accounts::access_token)),
                    accounts::expires_at.eq(excluded(accounts::expires_at)),
                    accounts::token_type.eq(excluded(accounts::token_type)),
                    accounts::scope.eq(excluded(accounts::scope)),
                    accounts::id_token.eq(excluded(accounts::id_token)),
                    accounts::session_state.eq(excluded(accounts::session_state)),
                ))
                .returning(AccountRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(row_to_account(stored))
        })
        .await
    }

    async fn accounts_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<Account>> {
        self.with_conn(move |conn| {
            let rows: Vec<AccountRow> = accounts::table
                .filter(accounts::user_id.eq(user_id.value()))
                .order(accounts::id.asc())
                .select(AccountRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(row_to_account).collect())
        })
        .await
    }

    async fn create_session(&self, session: &NewSession) -> RepositoryResult<Session> {
        let session = session.clone();
        self.with_conn(move |conn| {
            let row = NewSessionRow {
                session_token: session.session_token.clone(),
                user_id: session.user_id.value(),
                expires: session.expires,
            };
            let inserted: SessionRow = diesel::insert_into(sessions::table)
                .values(&row)
                .returning(SessionRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(row_to_session(inserted))
        })
        .await
    }

    async fn get_session_by_token(&self, token: &str) -> RepositoryResult<Option<Session>> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            Ok(sessions::table
                .filter(sessions::session_token.eq(token.clone()))
                .select(SessionRow::as_select())
                .first::<SessionRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(row_to_session))
        })
        .await
    }

    async fn delete_session(&self, token: &str) -> RepositoryResult<bool> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            let deleted =
                diesel::delete(sessions::table.filter(sessions::session_token.eq(token.clone())))
                    .execute(conn)
                    .map_err(map_diesel_error)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            diesel::delete(sessions::table.filter(sessions::expires.le(now)))
                .execute(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_verification_token(
        &self,
        identifier: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> RepositoryResult<VerificationToken> {
        let identifier = identifier.to_string();
        let token = token.to_string();
        self.with_conn(move |conn| {
            let row = NewVerificationTokenRow {
                identifier: identifier.clone(),
                token: token.clone(),
                expires,
            };
            let inserted: VerificationTokenRow =
                diesel::insert_into(verification_tokens::table)
                    .values(&row)
                    .returning(VerificationTokenRow::as_returning())
                    .get_result(conn)
                    .map_err(map_diesel_error)?;
            Ok(row_to_verification_token(inserted))
        })
        .await
    }

    async fn consume_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> RepositoryResult<Option<VerificationToken>> {
        let identifier = identifier.to_string();
        let token = token.to_string();
        self.with_conn(move |conn| {
            // Fetch-and-delete in one statement; two racing consumers cannot
            // both see the token.
            Ok(diesel::delete(
                verification_tokens::table
                    .filter(verification_tokens::identifier.eq(identifier.clone()))
                    .filter(verification_tokens::token.eq(token.clone())),
            )
            .returning(VerificationTokenRow::as_returning())
            .get_result::<VerificationTokenRow>(conn)
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_verification_token))
        })
        .await
    }
}

#[async_trait]
impl LibraryRepository for PostgresRepository {
    async fn create_resource(&self, resource: &NewResource) -> RepositoryResult<Resource> {
        let resource = resource.clone();
        self.with_conn(move |conn| {
            let row = NewResourceRow {
                owner_id: resource.owner_id.value(),
                title: resource.title.clone(),
                description: resource.description.clone(),
                url: resource.url.clone(),
                resource_type: resource.resource_type.as_str().to_string(),
                visibility: resource.visibility.as_str().to_string(),
            };
            let inserted: ResourceRow = diesel::insert_into(resources::table)
                .values(&row)
                .returning(ResourceRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            row_to_resource(inserted)
        })
        .await
    }

    async fn get_resource(&self, resource_id: ResourceId) -> RepositoryResult<Resource> {
        self.with_conn(move |conn| {
            let row = resources::table
                .find(resource_id.value())
                .select(ResourceRow::as_select())
                .first::<ResourceRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Resource {} not found", resource_id))
                })?;
            row_to_resource(row)
        })
        .await
    }

    async fn list_resources_for_user(&self, owner_id: UserId) -> RepositoryResult<Vec<Resource>> {
        self.with_conn(move |conn| {
            let rows: Vec<ResourceRow> = resources::table
                .filter(resources::owner_id.eq(owner_id.value()))
                .order(resources::id.desc())
                .select(ResourceRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(row_to_resource).collect()
        })
        .await
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
        let title = title.to_string();
        let description = description.map(|d| d.to_string());
        let url = url.map(|u| u.to_string());
        self.with_conn(move |conn| {
            let updated = diesel::update(resources::table.find(resource_id.value()))
                .set((
                    resources::title.eq(title.clone()),
                    resources::description.eq(description.clone()),
                    resources::url.eq(url.clone()),
                    resources::resource_type.eq(resource_type.as_str()),
                    resources::visibility.eq(visibility.as_str()),
                ))
                .returning(ResourceRow::as_returning())
                .get_result::<ResourceRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Resource {} not found", resource_id))
                })?;
            row_to_resource(updated)
        })
        .await
    }

    async fn delete_resource(&self, resource_id: ResourceId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            // Lesson edges go with the resource via `ON DELETE CASCADE`.
            let deleted = diesel::delete(resources::table.find(resource_id.value()))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Resource {} not found",
                    resource_id
                )));
            }
            Ok(())
        })
        .await
    }

    async fn create_lesson(&self, lesson: &NewLesson) -> RepositoryResult<Lesson> {
        let lesson = lesson.clone();
        self.with_conn(move |conn| {
            let row = NewLessonRow {
                title: lesson.title.clone(),
                description: lesson.description.clone(),
            };
            let inserted: LessonRow = diesel::insert_into(lessons::table)
                .values(&row)
                .returning(LessonRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(row_to_lesson(inserted))
        })
        .await
    }

    async fn get_lesson(&self, lesson_id: LessonId) -> RepositoryResult<Lesson> {
        self.with_conn(move |conn| {
            let row = lessons::table
                .find(lesson_id.value())
                .select(LessonRow::as_select())
                .first::<LessonRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Lesson {} not found", lesson_id))
                })?;
            Ok(row_to_lesson(row))
        })
        .await
    }

    async fn list_lessons(&self) -> RepositoryResult<Vec<Lesson>> {
        self.with_conn(|conn| {
            let rows: Vec<LessonRow> = lessons::table
                .order(lessons::id.desc())
                .select(LessonRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(row_to_lesson).collect())
        })
        .await
    }

    async fn delete_lesson(&self, lesson_id: LessonId) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let edge_count: i64 = lesson_resources::table
                    .filter(lesson_resources::lesson_id.eq(lesson_id.value()))
                    .select(count_star())
                    .first(tx)
                    .map_err(map_diesel_error)?;

                // Edges cascade; planner items keep living with their lesson
                // link cleared (`ON DELETE SET NULL`).
                let deleted = diesel::delete(lessons::table.find(lesson_id.value()))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                if deleted == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "Lesson {} not found",
                        lesson_id
                    )));
                }
                Ok(edge_count as usize)
            })
        })
        .await
    }

    async fn attach_resource(
        &self,
        lesson_id: LessonId,
        resource_id: ResourceId,
    ) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let row = NewLessonResourceRow {
                lesson_id: lesson_id.value(),
                resource_id: resource_id.value(),
            };
            // A dangling lesson or resource trips the foreign key, which
            // maps to NotFound.
            let inserted = diesel::insert_into(lesson_resources::table)
                .values(&row)
                .on_conflict((lesson_resources::lesson_id, lesson_resources::resource_id))
                .do_nothing()
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn detach_resource(
        &self,
        lesson_id: LessonId,
        resource_id: ResourceId,
    ) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(
                lesson_resources::table
                    .filter(lesson_resources::lesson_id.eq(lesson_id.value()))
                    .filter(lesson_resources::resource_id.eq(resource_id.value())),
            )
            .execute(conn)
            .map_err(map_diesel_error)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn resources_for_lesson(&self, lesson_id: LessonId) -> RepositoryResult<Vec<Resource>> {
        self.with_conn(move |conn| {
            let known: i64 = lessons::table
                .filter(lessons::id.eq(lesson_id.value()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;
            if known == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Lesson {} not found",
                    lesson_id
                )));
            }

            let rows: Vec<ResourceRow> = lesson_resources::table
                .inner_join(resources::table)
                .filter(lesson_resources::lesson_id.eq(lesson_id.value()))
                .order(lesson_resources::created_at.asc())
                .select(ResourceRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(row_to_resource).collect()
        })
        .await
    }

    async fn lessons_for_resource(&self, resource_id: ResourceId) -> RepositoryResult<Vec<Lesson>> {
        self.with_conn(move |conn| {
            let known: i64 = resources::table
                .filter(resources::id.eq(resource_id.value()))
                .select(count_star())
                .first(conn)
                .map_err(map_diesel_error)?;
            if known == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Resource {} not found",
                    resource_id
                )));
            }

            let rows: Vec<LessonRow> = lesson_resources::table
                .inner_join(lessons::table)
                .filter(lesson_resources::resource_id.eq(resource_id.value()))
                .order(lesson_resources::created_at.asc())
                .select(LessonRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(row_to_lesson).collect())
        })
        .await
    }
}
