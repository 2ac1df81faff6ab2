//! Tests for database module exports and service layer functions.

use classboard::db;

#[test]
fn test_db_module_has_service_functions() {
    // Verify the service functions are exported
    // These are compile-time checks - if this compiles, the exports work
    let _: fn() = || {
        // Just verify these symbols exist
        let _ = db::health_check::<db::repositories::LocalRepository>;
        let _ = db::create_board::<db::repositories::LocalRepository>;
        let _ = db::list_boards_for_user::<db::repositories::LocalRepository>;
        let _ = db::move_board_item::<db::repositories::LocalRepository>;
        let _ = db::list_posts::<db::repositories::LocalRepository>;
        let _ = db::like_content::<db::repositories::LocalRepository>;
        let _ = db::consume_verification_token::<db::repositories::LocalRepository>;
    };
}

#[test]
fn test_db_module_exports_repository_traits() {
    // The five per-concern traits plus the combined one must all be reachable
    // through the db module
    fn assert_full_repository<T: db::FullRepository>() {}

    let _: fn() = assert_full_repository::<db::repositories::LocalRepository>;
}

#[test]
fn test_repository_config_can_be_created() {
    // Test that RepositoryConfig type is exported and is accessible
    use classboard::db::RepositoryConfig;

    let _: Option<RepositoryConfig> = None;
}

#[cfg(feature = "postgres-repo")]
#[test]
fn test_postgres_config_type_is_exported() {
    // Verify PostgresConfig is exported when feature is enabled
    use classboard::db::PostgresConfig;

    // This is a compile-time check
    let _: Option<PostgresConfig> = None;
}

#[cfg(feature = "postgres-repo")]
#[test]
fn test_pool_stats_type_is_exported() {
    // Verify PoolStats is exported when feature is enabled
    use classboard::db::PoolStats;

    // This is a compile-time check
    let _: Option<PoolStats> = None;
}

#[cfg(not(feature = "postgres-repo"))]
#[test]
fn test_postgres_config_fallback_exists() {
    // Verify PostgresConfig fallback type exists when feature is disabled
    use classboard::db::PostgresConfig;

    // This is a compile-time check
    let _: Option<PostgresConfig> = None;
}

#[cfg(not(feature = "postgres-repo"))]
#[test]
fn test_pool_stats_fallback_exists() {
    // Verify PoolStats fallback type exists when feature is disabled
    use classboard::db::PoolStats;

    let stats = PoolStats::default();
    // Just verify it can be created
    let _ = format!("{:?}", stats);
}

#[tokio::test]
async fn test_local_repository_through_db_exports() {
    use classboard::api::{NewUser, Role};
    use classboard::db::IdentityRepository;

    let repo = db::LocalRepository::new();
    let user = repo
        .create_user(&NewUser::new(
            Some("Export Check".to_string()),
            Some("export@example.com".to_string()),
            Role::User,
        ))
        .await
        .unwrap();

    let health = db::health_check(&repo).await.unwrap();
    assert!(health);
    assert!(user.id.value() > 0);
}
