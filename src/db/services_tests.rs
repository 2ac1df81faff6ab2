#[cfg(test)]
mod tests {
    use crate::api::{
        Actor, NewBoard, NewBoardItem, NewComment, NewPlanner, NewPlannerItem, NewPost,
        NewResource, NewSession, NewUser, UserId,
    };
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{IdentityRepository, RepositoryError};
    use crate::db::services;
    use crate::models::{ItemType, LikeTarget, ResourceType, Role, Visibility};
    use chrono::{Duration, NaiveDate, Utc};

    async fn repo_with_user(role: Role) -> (LocalRepository, UserId) {
        let repo = LocalRepository::new();
        let user = repo
            .create_user(&NewUser::new(
                Some("Test User".to_string()),
                Some("test@example.com".to_string()),
                role,
            ))
            .await
            .unwrap();
        (repo, user.id)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_passes_through() {
        let (repo, _) = repo_with_user(Role::User).await;
        assert!(services::health_check(&repo).await.unwrap());
    }

    #[tokio::test]
    async fn test_owner_reads_private_board() {
        let (repo, owner_id) = repo_with_user(Role::User).await;
        let board = services::create_board(
            &repo,
            &NewBoard::new(owner_id, "Mine".to_string(), None, Visibility::Private),
        )
        .await
        .unwrap();

        let actor = Actor::new(owner_id, Role::User);
        let fetched = services::get_board_for(&repo, &actor, board.id, false)
            .await
            .unwrap();
        assert_eq!(fetched.id, board.id);
    }

    #[tokio::test]
    async fn test_stranger_blocked_from_private_board() {
        let (repo, owner_id) = repo_with_user(Role::User).await;
        let board = services::create_board(
            &repo,
            &NewBoard::new(owner_id, "Mine".to_string(), None, Visibility::Private),
        )
        .await
        .unwrap();

        let stranger = Actor::new(UserId::new(999_999), Role::User);
        let result = services::get_board_for(&repo, &stranger, board.id, false).await;
        assert!(matches!(result, Err(RepositoryError::PolicyError { .. })));
    }

    #[tokio::test]
    async fn test_admin_reads_any_board() {
        let (repo, owner_id) = repo_with_user(Role::User).await;
        let board = services::create_board(
            &repo,
            &NewBoard::new(owner_id, "Mine".to_string(), None, Visibility::Private),
        )
        .await
        .unwrap();

        let admin = Actor::new(UserId::new(999_999), Role::Admin);
        assert!(services::get_board_for(&repo, &admin, board.id, false)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_collaborator_reads_shared_board() {
        let (repo, owner_id) = repo_with_user(Role::User).await;
        let board = services::create_board(
            &repo,
            &NewBoard::new(owner_id, "Shared".to_string(), None, Visibility::Shared),
        )
        .await
        .unwrap();

        let peer = Actor::new(UserId::new(999_999), Role::User);
        assert!(services::get_board_for(&repo, &peer, board.id, false)
            .await
            .is_err());
        assert!(services::get_board_for(&repo, &peer, board.id, true)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_archived_board_rejects_item_writes() {
        let (repo, owner_id) = repo_with_user(Role::User).await;
        let board = services::create_board(
            &repo,
            &NewBoard::new(owner_id, "Work".to_string(), None, Visibility::Private),
        )
        .await
        .unwrap();
        services::archive_board(&repo, board.id).await.unwrap();

        let item = NewBoardItem::new(owner_id, "Task".to_string(), None, ItemType::Task);
        let result = services::append_board_item(&repo, board.id, &item).await;
        assert!(matches!(result, Err(RepositoryError::PolicyError { .. })));

        services::restore_board(&repo, board.id).await.unwrap();
        assert!(services::append_board_item(&repo, board.id, &item)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_like_and_unlike_through_service_layer() {
        let (repo, user_id) = repo_with_user(Role::User).await;
        let post = services::create_post(
            &repo,
            &NewPost::new(
                user_id,
                "Hello".to_string(),
                "First".to_string(),
                Visibility::Public,
            ),
        )
        .await
        .unwrap();
        let target = LikeTarget::Post(post.id);

        let first = services::like_content(&repo, user_id, target).await.unwrap();
        let second = services::like_content(&repo, user_id, target).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(services::like_count(&repo, target).await.unwrap(), 1);

        assert!(services::unlike_content(&repo, user_id, target).await.unwrap());
        assert!(!services::unlike_content(&repo, user_id, target).await.unwrap());
        assert_eq!(services::like_count(&repo, target).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stranger_blocked_from_private_resource() {
        let (repo, owner_id) = repo_with_user(Role::User).await;
        let resource = services::create_resource(
            &repo,
            &NewResource::new(
                owner_id,
                "Fractions worksheet".to_string(),
                ResourceType::Document,
                Visibility::Private,
            ),
        )
        .await
        .unwrap();

        let stranger = Actor::new(UserId::new(999_999), Role::User);
        let result = services::get_resource_for(&repo, &stranger, resource.id, false).await;
        assert!(matches!(result, Err(RepositoryError::PolicyError { .. })));
    }

    #[tokio::test]
    async fn test_public_post_visible_to_anyone() {
        let (repo, author_id) = repo_with_user(Role::User).await;
        let post = services::create_post(
            &repo,
            &NewPost::new(
                author_id,
                "Open".to_string(),
                "Body".to_string(),
                Visibility::Public,
            ),
        )
        .await
        .unwrap();

        let stranger = Actor::new(UserId::new(999_999), Role::User);
        assert!(services::get_post_for(&repo, &stranger, post.id, false)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_consume_verification_token_is_single_use() {
        let (repo, _) = repo_with_user(Role::User).await;
        let expires = Utc::now() + Duration::hours(1);
        repo.create_verification_token("alice@example.com", "tok-1", expires)
            .await
            .unwrap();

        let consumed = services::consume_verification_token(&repo, "alice@example.com", "tok-1")
            .await
            .unwrap();
        assert_eq!(consumed.token, "tok-1");

        let again = services::consume_verification_token(&repo, "alice@example.com", "tok-1").await;
        assert!(matches!(again, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_expired_verification_token_consumed_but_rejected() {
        let (repo, _) = repo_with_user(Role::User).await;
        let expired = Utc::now() - Duration::minutes(5);
        repo.create_verification_token("bob@example.com", "tok-2", expired)
            .await
            .unwrap();

        let result = services::consume_verification_token(&repo, "bob@example.com", "tok-2").await;
        assert!(matches!(result, Err(RepositoryError::ValidationError { .. })));

        // Expired or not, consumption removes the token.
        let again = services::consume_verification_token(&repo, "bob@example.com", "tok-2").await;
        assert!(matches!(again, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_sweep_expired_sessions_leaves_live_ones() {
        let (repo, user_id) = repo_with_user(Role::User).await;
        repo.create_session(&NewSession::new(
            "live".to_string(),
            user_id,
            Utc::now() + Duration::hours(2),
        ))
        .await
        .unwrap();
        repo.create_session(&NewSession::new(
            "stale".to_string(),
            user_id,
            Utc::now() - Duration::hours(2),
        ))
        .await
        .unwrap();

        let removed = services::sweep_expired_sessions(&repo).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_session_by_token("live").await.unwrap().is_some());
        assert!(repo.get_session_by_token("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_post_reports_dependent_rows() {
        let (repo, user_id) = repo_with_user(Role::User).await;
        let post = services::create_post(
            &repo,
            &NewPost::new(
                user_id,
                "Busy".to_string(),
                "Body".to_string(),
                Visibility::Public,
            ),
        )
        .await
        .unwrap();
        let comment = services::add_comment(
            &repo,
            &NewComment::new(post.id, user_id, "Nice".to_string()),
        )
        .await
        .unwrap();
        services::like_content(&repo, user_id, LikeTarget::Post(post.id))
            .await
            .unwrap();
        services::like_content(&repo, user_id, LikeTarget::Comment(comment.id))
            .await
            .unwrap();

        // One comment, one post like, one comment like.
        let removed = services::delete_post(&repo, post.id).await.unwrap();
        assert_eq!(removed, 3);
    }

    #[tokio::test]
    async fn test_planner_item_flow_through_service_layer() {
        let (repo, owner_id) = repo_with_user(Role::User).await;
        let planner = services::create_planner(
            &repo,
            &NewPlanner::new(
                owner_id,
                "Term".to_string(),
                date(2025, 9, 1),
                date(2025, 12, 19),
            ),
        )
        .await
        .unwrap();

        let item = services::add_planner_item(
            &repo,
            planner.id,
            &NewPlannerItem::new(owner_id, "Intro".to_string(), date(2025, 9, 2)),
        )
        .await
        .unwrap();

        let listed = services::list_planner_items(&repo, planner.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, item.id);

        let outside = services::add_planner_item(
            &repo,
            planner.id,
            &NewPlannerItem::new(owner_id, "Too late".to_string(), date(2026, 1, 5)),
        )
        .await;
        assert!(matches!(
            outside,
            Err(RepositoryError::ValidationError { .. })
        ));
    }
}
