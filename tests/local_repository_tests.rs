//! Expanded tests for LocalRepository covering the ordered-board contract,
//! the engagement ledger, cascade rules, concurrent access patterns, and
//! error conditions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use classboard::api::{
    BoardId, BoardStatus, ContentType, ItemStatus, ItemType, LessonId, LikeTarget, NewAccount,
    NewBoard, NewBoardItem, NewComment, NewLesson, NewPlanner, NewPlannerItem, NewPost,
    NewResource, NewSession, NewUser, PostId, ResourceType, Role, UserId, Visibility,
};
use classboard::db::repositories::LocalRepository;
use classboard::db::repository::{
    BoardRepository, CommunityRepository, IdentityRepository, LibraryRepository,
    PlannerRepository, RepositoryError,
};

// ============================================================================
// Helpers
// ============================================================================

async fn seed_user(repo: &LocalRepository, email: &str) -> UserId {
    repo.create_user(&NewUser::new(
        Some("Test User".to_string()),
        Some(email.to_string()),
        Role::User,
    ))
    .await
    .expect("user should be created")
    .id
}

fn task(author_id: UserId, title: &str) -> NewBoardItem {
    NewBoardItem::new(author_id, title.to_string(), None, ItemType::Task)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn board_with_items(repo: &LocalRepository, owner_id: UserId, titles: &[&str]) -> BoardId {
    let board = repo
        .create_board(&NewBoard::new(
            owner_id,
            "Test Board".to_string(),
            None,
            Visibility::Private,
        ))
        .await
        .expect("board should be created");
    for title in titles {
        repo.append_item(board.id, &task(owner_id, title))
            .await
            .expect("item should be appended");
    }
    board.id
}

async fn titles_in_order(repo: &LocalRepository, board_id: BoardId) -> Vec<String> {
    repo.list_board_items(board_id)
        .await
        .expect("board should be listable")
        .into_iter()
        .map(|item| item.title)
        .collect()
}

// ============================================================================
// Ordered Board Contract
// ============================================================================

#[tokio::test]
async fn test_append_assigns_increasing_positions() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "append@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b", "c"]).await;

    let items = repo.list_board_items(board_id).await.unwrap();
    assert_eq!(titles_in_order(&repo, board_id).await, vec!["a", "b", "c"]);
    assert!(items[0].position() < items[1].position());
    assert!(items[1].position() < items[2].position());
}

#[tokio::test]
async fn test_insert_at_head_lands_first() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "head@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b"]).await;

    let first = repo
        .insert_item_at(board_id, &task(owner, "first"), 0)
        .await
        .unwrap();

    let items = repo.list_board_items(board_id).await.unwrap();
    assert_eq!(
        titles_in_order(&repo, board_id).await,
        vec!["first", "a", "b"]
    );
    assert!(first.position() < items[1].position());
}

#[tokio::test]
async fn test_move_to_head_then_insert_between() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "between@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b", "c"]).await;

    let items = repo.list_board_items(board_id).await.unwrap();
    let item_c = items[2].clone();

    // Drag C to the front, then drop D between C and A.
    repo.move_item(item_c.id, 0).await.unwrap();
    assert_eq!(titles_in_order(&repo, board_id).await, vec!["c", "a", "b"]);

    let item_d = repo
        .insert_item_at(board_id, &task(owner, "d"), 1)
        .await
        .unwrap();
    assert_eq!(
        titles_in_order(&repo, board_id).await,
        vec!["c", "d", "a", "b"]
    );

    let items = repo.list_board_items(board_id).await.unwrap();
    assert!(items[0].position() < item_d.position());
    assert!(item_d.position() < items[2].position());
}

#[tokio::test]
async fn test_move_to_current_index_is_a_no_op() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "noop@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b", "c"]).await;

    let before = repo.list_board_items(board_id).await.unwrap();
    let moved = repo.move_item(before[1].id, 1).await.unwrap();

    assert_eq!(moved.position(), before[1].position());
    assert_eq!(titles_in_order(&repo, board_id).await, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_out_of_range_indices_clamp_to_the_tail() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "clamp@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b", "c"]).await;

    let items = repo.list_board_items(board_id).await.unwrap();
    repo.move_item(items[0].id, 999).await.unwrap();
    assert_eq!(titles_in_order(&repo, board_id).await, vec!["b", "c", "a"]);

    repo.insert_item_at(board_id, &task(owner, "tail"), 999)
        .await
        .unwrap();
    assert_eq!(
        titles_in_order(&repo, board_id).await,
        vec!["b", "c", "a", "tail"]
    );
}

#[tokio::test]
async fn test_repeated_head_insertion_never_collides() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "stress@test.com").await;
    let board_id = board_with_items(&repo, owner, &[]).await;

    // Halving the head gap runs out after ~10 insertions; from then on every
    // insert renumbers first. Positions must stay unique throughout.
    for i in 0..1000 {
        repo.insert_item_at(board_id, &task(owner, &format!("item_{}", i)), 0)
            .await
            .expect("head insertion should always find a position");
    }

    let items = repo.list_board_items(board_id).await.unwrap();
    assert_eq!(items.len(), 1000);
    assert_eq!(items[0].title, "item_999");
    assert_eq!(items[999].title, "item_0");

    let positions: HashSet<i64> = items.iter().map(|item| item.position()).collect();
    assert_eq!(positions.len(), 1000);
    for pair in items.windows(2) {
        assert!(pair[0].position() < pair[1].position());
    }
}

#[tokio::test]
async fn test_deleting_an_item_leaves_neighbors_untouched() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "gaps@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b", "c"]).await;

    let before = repo.list_board_items(board_id).await.unwrap();
    repo.delete_board_item(before[1].id).await.unwrap();

    let after = repo.list_board_items(board_id).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].position(), before[0].position());
    assert_eq!(after[1].position(), before[2].position());
}

#[tokio::test]
async fn test_reorder_board_compacts_positions() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "compact@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b", "c", "d"]).await;

    let items = repo.list_board_items(board_id).await.unwrap();
    repo.delete_board_item(items[1].id).await.unwrap();
    repo.delete_board_item(items[3].id).await.unwrap();

    let renumbered = repo.reorder_board(board_id).await.unwrap();
    assert_eq!(renumbered, 2);

    let after = repo.list_board_items(board_id).await.unwrap();
    assert_eq!(titles_in_order(&repo, board_id).await, vec!["a", "c"]);
    assert_eq!(after[1].position() - after[0].position(), 1024);
}

#[tokio::test]
async fn test_move_item_across_boards_appends_by_default() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "cross@test.com").await;
    let source_id = board_with_items(&repo, owner, &["a", "b", "c"]).await;
    let target_id = board_with_items(&repo, owner, &["x", "y"]).await;

    let source_items = repo.list_board_items(source_id).await.unwrap();
    let moved = repo
        .move_item_to_board(source_items[1].id, target_id, None)
        .await
        .unwrap();

    assert_eq!(moved.board_id, target_id);
    assert_eq!(titles_in_order(&repo, source_id).await, vec!["a", "c"]);
    assert_eq!(titles_in_order(&repo, target_id).await, vec!["x", "y", "b"]);
}

#[tokio::test]
async fn test_move_item_across_boards_at_an_index() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "crossidx@test.com").await;
    let source_id = board_with_items(&repo, owner, &["a", "b"]).await;
    let target_id = board_with_items(&repo, owner, &["x", "y"]).await;

    let source_items = repo.list_board_items(source_id).await.unwrap();
    repo.move_item_to_board(source_items[0].id, target_id, Some(0))
        .await
        .unwrap();

    assert_eq!(titles_in_order(&repo, source_id).await, vec!["b"]);
    assert_eq!(titles_in_order(&repo, target_id).await, vec!["a", "x", "y"]);
}

#[tokio::test]
async fn test_archived_board_rejects_item_writes() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "archived@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a"]).await;
    let items = repo.list_board_items(board_id).await.unwrap();

    repo.set_board_status(board_id, BoardStatus::Archived)
        .await
        .unwrap();

    let append = repo.append_item(board_id, &task(owner, "b")).await;
    assert!(matches!(append, Err(RepositoryError::PolicyError { .. })));
    let moved = repo.move_item(items[0].id, 0).await;
    assert!(matches!(moved, Err(RepositoryError::PolicyError { .. })));

    // Reads still work on an archived board.
    assert_eq!(repo.list_board_items(board_id).await.unwrap().len(), 1);

    repo.set_board_status(board_id, BoardStatus::Active)
        .await
        .unwrap();
    repo.append_item(board_id, &task(owner, "b")).await.unwrap();
}

#[tokio::test]
async fn test_item_status_moves_forward_only() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "status@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a"]).await;
    let item = repo.list_board_items(board_id).await.unwrap()[0].clone();
    assert_eq!(item.status, ItemStatus::Todo);

    let item = repo
        .set_board_item_status(item.id, ItemStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(item.status, ItemStatus::InProgress);

    // Repeating the current status is a no-op, not an error.
    let item = repo
        .set_board_item_status(item.id, ItemStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(item.status, ItemStatus::InProgress);

    let item = repo
        .set_board_item_status(item.id, ItemStatus::Completed)
        .await
        .unwrap();
    assert_eq!(item.status, ItemStatus::Completed);

    let backward = repo.set_board_item_status(item.id, ItemStatus::Todo).await;
    assert!(matches!(
        backward,
        Err(RepositoryError::PolicyError { .. })
    ));
}

#[tokio::test]
async fn test_reopen_only_applies_to_completed_items() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "reopen@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a"]).await;
    let item = repo.list_board_items(board_id).await.unwrap()[0].clone();

    let premature = repo.reopen_board_item(item.id).await;
    assert!(matches!(
        premature,
        Err(RepositoryError::PolicyError { .. })
    ));

    repo.set_board_item_status(item.id, ItemStatus::InProgress)
        .await
        .unwrap();
    repo.set_board_item_status(item.id, ItemStatus::Completed)
        .await
        .unwrap();

    let reopened = repo.reopen_board_item(item.id).await.unwrap();
    assert_eq!(reopened.status, ItemStatus::InProgress);
}

#[tokio::test]
async fn test_delete_board_removes_its_items() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "delboard@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b", "c"]).await;
    let items = repo.list_board_items(board_id).await.unwrap();

    let removed = repo.delete_board(board_id).await.unwrap();
    assert_eq!(removed, 3);
    assert!(!repo.has_board(board_id));

    let orphan = repo.get_board_item(items[0].id).await;
    assert!(matches!(orphan, Err(RepositoryError::NotFound { .. })));
}

// ============================================================================
// Engagement Ledger
// ============================================================================

#[tokio::test]
async fn test_liking_twice_keeps_a_single_row() {
    let repo = LocalRepository::new();
    let author = seed_user(&repo, "author@test.com").await;
    let fan = seed_user(&repo, "fan@test.com").await;
    let post = repo
        .create_post(&NewPost::new(
            author,
            "Hello".to_string(),
            "First post".to_string(),
            Visibility::Public,
        ))
        .await
        .unwrap();

    let first = repo.like(fan, LikeTarget::Post(post.id)).await.unwrap();
    let second = repo.like(fan, LikeTarget::Post(post.id)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(
        repo.like_count(LikeTarget::Post(post.id)).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_unlike_without_a_like_is_a_no_op() {
    let repo = LocalRepository::new();
    let author = seed_user(&repo, "uauthor@test.com").await;
    let fan = seed_user(&repo, "ufan@test.com").await;
    let post = repo
        .create_post(&NewPost::new(
            author,
            "Hello".to_string(),
            "Body".to_string(),
            Visibility::Public,
        ))
        .await
        .unwrap();

    assert!(!repo.unlike(fan, LikeTarget::Post(post.id)).await.unwrap());

    repo.like(fan, LikeTarget::Post(post.id)).await.unwrap();
    assert!(repo.unlike(fan, LikeTarget::Post(post.id)).await.unwrap());
    assert!(!repo.unlike(fan, LikeTarget::Post(post.id)).await.unwrap());
    assert!(!repo.has_liked(fan, LikeTarget::Post(post.id)).await.unwrap());
}

#[tokio::test]
async fn test_like_rows_mirror_their_target() {
    let repo = LocalRepository::new();
    let author = seed_user(&repo, "mirror@test.com").await;
    let fan = seed_user(&repo, "mfan@test.com").await;
    let post = repo
        .create_post(&NewPost::new(
            author,
            "Hello".to_string(),
            "Body".to_string(),
            Visibility::Public,
        ))
        .await
        .unwrap();
    let comment = repo
        .add_comment(&NewComment::new(post.id, fan, "Nice".to_string()))
        .await
        .unwrap();

    let post_like = repo.like(fan, LikeTarget::Post(post.id)).await.unwrap();
    assert_eq!(post_like.content_type, ContentType::Post);
    assert_eq!(post_like.content_id, post.id.value());
    assert_eq!(post_like.post_id, Some(post.id));
    assert_eq!(post_like.comment_id, None);
    assert_eq!(post_like.target(), Ok(LikeTarget::Post(post.id)));

    let comment_like = repo
        .like(author, LikeTarget::Comment(comment.id))
        .await
        .unwrap();
    assert_eq!(comment_like.content_type, ContentType::Comment);
    assert_eq!(comment_like.content_id, comment.id.value());
    assert_eq!(comment_like.post_id, None);
    assert_eq!(comment_like.comment_id, Some(comment.id));
    assert_eq!(comment_like.target(), Ok(LikeTarget::Comment(comment.id)));
}

#[tokio::test]
async fn test_post_and_comment_likes_are_tracked_separately() {
    let repo = LocalRepository::new();
    let author = seed_user(&repo, "sep@test.com").await;
    let fan = seed_user(&repo, "sfan@test.com").await;
    let post = repo
        .create_post(&NewPost::new(
            author,
            "Hello".to_string(),
            "Body".to_string(),
            Visibility::Public,
        ))
        .await
        .unwrap();
    let comment = repo
        .add_comment(&NewComment::new(post.id, author, "Reply".to_string()))
        .await
        .unwrap();

    repo.like(fan, LikeTarget::Post(post.id)).await.unwrap();
    repo.like(fan, LikeTarget::Comment(comment.id)).await.unwrap();

    assert_eq!(repo.like_count(LikeTarget::Post(post.id)).await.unwrap(), 1);
    assert_eq!(
        repo.like_count(LikeTarget::Comment(comment.id))
            .await
            .unwrap(),
        1
    );

    repo.unlike(fan, LikeTarget::Post(post.id)).await.unwrap();
    assert_eq!(repo.like_count(LikeTarget::Post(post.id)).await.unwrap(), 0);
    assert_eq!(
        repo.like_count(LikeTarget::Comment(comment.id))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_liking_a_missing_target_is_not_found() {
    let repo = LocalRepository::new();
    let fan = seed_user(&repo, "ghost@test.com").await;

    let result = repo.like(fan, LikeTarget::Post(PostId::new(999_999))).await;
    assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
}

#[tokio::test]
async fn test_post_engagement_counts_comments_and_likes() {
    let repo = LocalRepository::new();
    let author = seed_user(&repo, "eng@test.com").await;
    let fan = seed_user(&repo, "efan@test.com").await;
    let post = repo
        .create_post(&NewPost::new(
            author,
            "Hello".to_string(),
            "Body".to_string(),
            Visibility::Public,
        ))
        .await
        .unwrap();

    repo.add_comment(&NewComment::new(post.id, fan, "One".to_string()))
        .await
        .unwrap();
    repo.add_comment(&NewComment::new(post.id, author, "Two".to_string()))
        .await
        .unwrap();
    repo.like(fan, LikeTarget::Post(post.id)).await.unwrap();

    let engagement = repo.post_engagement(post.id).await.unwrap();
    assert_eq!(engagement.post_id, post.id);
    assert_eq!(engagement.comment_count, 2);
    assert_eq!(engagement.like_count, 1);
}

// ============================================================================
// Cascade Integrity
// ============================================================================

#[tokio::test]
async fn test_delete_post_cascades_comments_and_all_likes() {
    let repo = LocalRepository::new();
    let author = seed_user(&repo, "cascade@test.com").await;
    let fan_a = seed_user(&repo, "cfan_a@test.com").await;
    let fan_b = seed_user(&repo, "cfan_b@test.com").await;
    let post = repo
        .create_post(&NewPost::new(
            author,
            "Hello".to_string(),
            "Body".to_string(),
            Visibility::Public,
        ))
        .await
        .unwrap();

    let mut comments = Vec::new();
    for body in ["one", "two", "three"] {
        comments.push(
            repo.add_comment(&NewComment::new(post.id, fan_a, body.to_string()))
                .await
                .unwrap(),
        );
    }

    // Five likes spread over the post and its comments.
    repo.like(fan_a, LikeTarget::Post(post.id)).await.unwrap();
    repo.like(fan_b, LikeTarget::Post(post.id)).await.unwrap();
    repo.like(fan_a, LikeTarget::Comment(comments[0].id))
        .await
        .unwrap();
    repo.like(fan_b, LikeTarget::Comment(comments[1].id))
        .await
        .unwrap();
    repo.like(author, LikeTarget::Comment(comments[2].id))
        .await
        .unwrap();

    let removed = repo.delete_post(post.id).await.unwrap();
    assert_eq!(removed, 8);

    assert!(matches!(
        repo.get_post(post.id).await,
        Err(RepositoryError::NotFound { .. })
    ));
    for comment in &comments {
        assert!(matches!(
            repo.get_comment(comment.id).await,
            Err(RepositoryError::NotFound { .. })
        ));
        assert_eq!(
            repo.like_count(LikeTarget::Comment(comment.id))
                .await
                .unwrap(),
            0
        );
    }
    assert_eq!(repo.like_count(LikeTarget::Post(post.id)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_comment_cascades_only_its_likes() {
    let repo = LocalRepository::new();
    let author = seed_user(&repo, "ccomment@test.com").await;
    let fan_a = seed_user(&repo, "ccfan_a@test.com").await;
    let fan_b = seed_user(&repo, "ccfan_b@test.com").await;
    let post = repo
        .create_post(&NewPost::new(
            author,
            "Hello".to_string(),
            "Body".to_string(),
            Visibility::Public,
        ))
        .await
        .unwrap();
    let comment = repo
        .add_comment(&NewComment::new(post.id, fan_a, "Reply".to_string()))
        .await
        .unwrap();

    repo.like(author, LikeTarget::Post(post.id)).await.unwrap();
    repo.like(fan_a, LikeTarget::Comment(comment.id)).await.unwrap();
    repo.like(fan_b, LikeTarget::Comment(comment.id)).await.unwrap();

    let removed = repo.delete_comment(comment.id).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(repo.like_count(LikeTarget::Post(post.id)).await.unwrap(), 1);
    assert_eq!(
        repo.list_comments_for_post(post.id).await.unwrap().len(),
        0
    );
}

#[tokio::test]
async fn test_delete_planner_removes_its_items() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "delplan@test.com").await;
    let planner = repo
        .create_planner(&NewPlanner::new(
            owner,
            "Term 1".to_string(),
            date(2025, 9, 1),
            date(2025, 12, 19),
        ))
        .await
        .unwrap();
    for day in 1..=3 {
        repo.add_planner_item(
            planner.id,
            &NewPlannerItem::new(owner, format!("Day {}", day), date(2025, 9, day)),
        )
        .await
        .unwrap();
    }

    let removed = repo.delete_planner(planner.id).await.unwrap();
    assert_eq!(removed, 3);
    assert!(matches!(
        repo.get_planner(planner.id).await,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_lesson_detaches_without_deleting() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "lesson@test.com").await;
    let lesson = repo
        .create_lesson(&NewLesson::new("Fractions".to_string(), None))
        .await
        .unwrap();
    let resource = repo
        .create_resource(&NewResource::new(
            owner,
            "Worksheet".to_string(),
            ResourceType::Document,
            Visibility::Private,
        ))
        .await
        .unwrap();
    repo.attach_resource(lesson.id, resource.id).await.unwrap();

    let planner = repo
        .create_planner(&NewPlanner::new(
            owner,
            "Term".to_string(),
            date(2025, 9, 1),
            date(2025, 9, 30),
        ))
        .await
        .unwrap();
    let item = repo
        .add_planner_item(
            planner.id,
            &NewPlannerItem::new(owner, "Intro".to_string(), date(2025, 9, 2))
                .with_lesson(lesson.id),
        )
        .await
        .unwrap();
    assert_eq!(item.lesson_id, Some(lesson.id));

    let detached = repo.delete_lesson(lesson.id).await.unwrap();
    assert_eq!(detached, 1);

    // The resource and the planner item survive; only the references go.
    assert!(repo.get_resource(resource.id).await.is_ok());
    assert_eq!(
        repo.lessons_for_resource(resource.id).await.unwrap().len(),
        0
    );
    let item = repo.get_planner_item(item.id).await.unwrap();
    assert_eq!(item.lesson_id, None);
}

// ============================================================================
// Planner Ordering & Validation
// ============================================================================

#[tokio::test]
async fn test_planner_items_sort_by_date_with_untimed_first() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "plansort@test.com").await;
    let planner = repo
        .create_planner(&NewPlanner::new(
            owner,
            "Term".to_string(),
            date(2025, 9, 1),
            date(2025, 9, 30),
        ))
        .await
        .unwrap();

    repo.add_planner_item(
        planner.id,
        &NewPlannerItem::new(owner, "next day".to_string(), date(2025, 9, 3))
            .with_times(time(10, 0), time(11, 0)),
    )
    .await
    .unwrap();
    repo.add_planner_item(
        planner.id,
        &NewPlannerItem::new(owner, "all day".to_string(), date(2025, 9, 2)),
    )
    .await
    .unwrap();
    repo.add_planner_item(
        planner.id,
        &NewPlannerItem::new(owner, "afternoon".to_string(), date(2025, 9, 2))
            .with_times(time(14, 0), time(15, 0)),
    )
    .await
    .unwrap();
    repo.add_planner_item(
        planner.id,
        &NewPlannerItem::new(owner, "morning".to_string(), date(2025, 9, 2))
            .with_times(time(9, 0), time(10, 0)),
    )
    .await
    .unwrap();

    let titles: Vec<String> = repo
        .list_planner_items(planner.id)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect();
    assert_eq!(titles, vec!["all day", "morning", "afternoon", "next day"]);
}

#[tokio::test]
async fn test_planner_rejects_items_outside_its_window() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "window@test.com").await;
    let planner = repo
        .create_planner(&NewPlanner::new(
            owner,
            "September".to_string(),
            date(2025, 9, 1),
            date(2025, 9, 30),
        ))
        .await
        .unwrap();

    let outside = repo
        .add_planner_item(
            planner.id,
            &NewPlannerItem::new(owner, "stray".to_string(), date(2025, 10, 5)),
        )
        .await;
    assert!(matches!(
        outside,
        Err(RepositoryError::ValidationError { .. })
    ));

    let inverted = repo
        .create_planner(&NewPlanner::new(
            owner,
            "Backwards".to_string(),
            date(2025, 9, 30),
            date(2025, 9, 1),
        ))
        .await;
    assert!(matches!(
        inverted,
        Err(RepositoryError::ValidationError { .. })
    ));
}

#[tokio::test]
async fn test_planner_item_times_must_be_ordered() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "times@test.com").await;
    let planner = repo
        .create_planner(&NewPlanner::new(
            owner,
            "Term".to_string(),
            date(2025, 9, 1),
            date(2025, 9, 30),
        ))
        .await
        .unwrap();

    let inverted = repo
        .add_planner_item(
            planner.id,
            &NewPlannerItem::new(owner, "bad".to_string(), date(2025, 9, 2))
                .with_times(time(14, 0), time(13, 0)),
        )
        .await;
    assert!(matches!(
        inverted,
        Err(RepositoryError::ValidationError { .. })
    ));

    // A zero-length slot is allowed.
    repo.add_planner_item(
        planner.id,
        &NewPlannerItem::new(owner, "instant".to_string(), date(2025, 9, 2))
            .with_times(time(14, 0), time(14, 0)),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_planner_item_lesson_link_must_exist() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "link@test.com").await;
    let planner = repo
        .create_planner(&NewPlanner::new(
            owner,
            "Term".to_string(),
            date(2025, 9, 1),
            date(2025, 9, 30),
        ))
        .await
        .unwrap();

    let result = repo
        .add_planner_item(
            planner.id,
            &NewPlannerItem::new(owner, "dangling".to_string(), date(2025, 9, 2))
                .with_lesson(LessonId::new(424_242)),
        )
        .await;
    assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
}

// ============================================================================
// Identity Records
// ============================================================================

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() {
    let repo = LocalRepository::new();
    seed_user(&repo, "taken@test.com").await;

    let duplicate = repo
        .create_user(&NewUser::new(
            Some("Other".to_string()),
            Some("taken@test.com".to_string()),
            Role::User,
        ))
        .await;
    assert!(matches!(
        duplicate,
        Err(RepositoryError::ConflictError { .. })
    ));

    // Users without an email never conflict with each other.
    repo.create_user(&NewUser::new(None, None, Role::User))
        .await
        .unwrap();
    repo.create_user(&NewUser::new(None, None, Role::User))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_duplicate_session_token_is_a_conflict() {
    let repo = LocalRepository::new();
    let user = seed_user(&repo, "session@test.com").await;
    let expires = Utc::now() + Duration::days(7);

    repo.create_session(&NewSession::new("token-1".to_string(), user, expires))
        .await
        .unwrap();
    let duplicate = repo
        .create_session(&NewSession::new("token-1".to_string(), user, expires))
        .await;
    assert!(matches!(
        duplicate,
        Err(RepositoryError::ConflictError { .. })
    ));

    assert!(repo.delete_session("token-1").await.unwrap());
    assert!(!repo.delete_session("token-1").await.unwrap());
}

#[tokio::test]
async fn test_upsert_account_refreshes_tokens_in_place() {
    let repo = LocalRepository::new();
    let user = seed_user(&repo, "oauth@test.com").await;

    let mut account = NewAccount::new(
        user,
        "oauth".to_string(),
        "google".to_string(),
        "google-uid-1".to_string(),
    );
    account.access_token = Some("old-token".to_string());

    let first = repo.upsert_account(&account).await.unwrap();
    assert_eq!(first.access_token.as_deref(), Some("old-token"));

    account.access_token = Some("new-token".to_string());
    let second = repo.upsert_account(&account).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.access_token.as_deref(), Some("new-token"));
    assert_eq!(repo.accounts_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let repo = LocalRepository::new();
    let expires = Utc::now() + Duration::hours(1);

    repo.create_verification_token("user@test.com", "magic-123", expires)
        .await
        .unwrap();

    let consumed = repo
        .consume_verification_token("user@test.com", "magic-123")
        .await
        .unwrap();
    assert!(consumed.is_some());

    let again = repo
        .consume_verification_token("user@test.com", "magic-123")
        .await
        .unwrap();
    assert!(again.is_none());
}

// ============================================================================
// Lesson/Resource Edges
// ============================================================================

#[tokio::test]
async fn test_attach_resource_is_symmetric_and_idempotent() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "edges@test.com").await;
    let lesson = repo
        .create_lesson(&NewLesson::new("Geometry".to_string(), None))
        .await
        .unwrap();
    let resource = repo
        .create_resource(&NewResource::new(
            owner,
            "Slides".to_string(),
            ResourceType::Document,
            Visibility::Private,
        ))
        .await
        .unwrap();

    assert!(repo.attach_resource(lesson.id, resource.id).await.unwrap());
    assert!(!repo.attach_resource(lesson.id, resource.id).await.unwrap());

    let resources = repo.resources_for_lesson(lesson.id).await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].id, resource.id);
    let lessons = repo.lessons_for_resource(resource.id).await.unwrap();
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].id, lesson.id);

    assert!(repo.detach_resource(lesson.id, resource.id).await.unwrap());
    assert!(!repo.detach_resource(lesson.id, resource.id).await.unwrap());
    assert_eq!(repo.resources_for_lesson(lesson.id).await.unwrap().len(), 0);
}

// ============================================================================
// Concurrent Access Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_appends_yield_unique_positions() {
    let repo = Arc::new(LocalRepository::new());
    let owner = seed_user(&repo, "conc@test.com").await;
    let board_id = board_with_items(&repo, owner, &[]).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let repo_clone = Arc::clone(&repo);
        let handle = tokio::spawn(async move {
            repo_clone
                .append_item(board_id, &task(owner, &format!("item_{}", i)))
                .await
        });
        handles.push(handle);
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let items = repo.list_board_items(board_id).await.unwrap();
    assert_eq!(items.len(), 10);
    let positions: HashSet<i64> = items.iter().map(|item| item.position()).collect();
    assert_eq!(positions.len(), 10);
}

#[tokio::test]
async fn test_concurrent_head_inserts_stay_ordered() {
    let repo = Arc::new(LocalRepository::new());
    let owner = seed_user(&repo, "chead@test.com").await;
    let board_id = board_with_items(&repo, owner, &[]).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let repo_clone = Arc::clone(&repo);
        let handle = tokio::spawn(async move {
            repo_clone
                .insert_item_at(board_id, &task(owner, &format!("item_{}", i)), 0)
                .await
        });
        handles.push(handle);
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let items = repo.list_board_items(board_id).await.unwrap();
    assert_eq!(items.len(), 10);
    for pair in items.windows(2) {
        assert!(pair[0].position() < pair[1].position());
    }
}

#[tokio::test]
async fn test_concurrent_likes_resolve_to_one_row() {
    let repo = Arc::new(LocalRepository::new());
    let author = seed_user(&repo, "clike@test.com").await;
    let fan = seed_user(&repo, "clfan@test.com").await;
    let post = repo
        .create_post(&NewPost::new(
            author,
            "Hello".to_string(),
            "Body".to_string(),
            Visibility::Public,
        ))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let repo_clone = Arc::clone(&repo);
        let post_id = post.id;
        let handle =
            tokio::spawn(async move { repo_clone.like(fan, LikeTarget::Post(post_id)).await });
        handles.push(handle);
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(repo.like_count(LikeTarget::Post(post.id)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_cloned_repository_shares_state() {
    let repo = LocalRepository::new();
    let clone = repo.clone();

    let owner = seed_user(&repo, "clone@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a"]).await;

    assert!(clone.has_board(board_id));
    assert_eq!(clone.board_count(), 1);

    clone.append_item(board_id, &task(owner, "b")).await.unwrap();
    assert_eq!(repo.list_board_items(board_id).await.unwrap().len(), 2);
}

// ============================================================================
// Error Conditions & Health
// ============================================================================

#[tokio::test]
async fn test_unhealthy_repository_rejects_operations() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "health@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a"]).await;

    repo.set_healthy(false);
    assert!(!repo.health_check().await.unwrap());
    assert!(repo.list_board_items(board_id).await.is_err());
    assert!(repo.append_item(board_id, &task(owner, "b")).await.is_err());

    repo.set_healthy(true);
    assert!(repo.health_check().await.unwrap());
    assert!(repo.list_board_items(board_id).await.is_ok());
}

#[tokio::test]
async fn test_operations_on_missing_rows_are_not_found() {
    let repo = LocalRepository::new();

    let missing_board = repo.get_board(BoardId::new(777)).await;
    assert!(matches!(
        missing_board,
        Err(RepositoryError::NotFound { .. })
    ));

    let orphan_board = repo
        .create_board(&NewBoard::new(
            UserId::new(777),
            "Orphan".to_string(),
            None,
            Visibility::Private,
        ))
        .await;
    assert!(matches!(
        orphan_board,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_clear_resets_all_data() {
    let repo = LocalRepository::new();
    let owner = seed_user(&repo, "clear@test.com").await;
    let board_id = board_with_items(&repo, owner, &["a", "b"]).await;
    assert_eq!(repo.board_count(), 1);

    repo.clear();

    assert_eq!(repo.board_count(), 0);
    assert!(!repo.has_board(board_id));
    assert!(repo.health_check().await.unwrap());
    assert!(matches!(
        repo.get_user(owner).await,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[test]
fn test_default_matches_new() {
    let from_new = LocalRepository::new();
    let from_default = LocalRepository::default();
    assert_eq!(from_new.board_count(), 0);
    assert_eq!(from_default.board_count(), 0);
}
