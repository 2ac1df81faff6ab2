use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;

use super::schema::{
    accounts, board_items, boards, comments, community_posts, lesson_resources, lessons, likes,
    planner_items, planners, resources, sessions, users, verification_tokens,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountRow {
    pub id: i64,
    pub user_id: i64,
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub session_state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccountRow {
    pub user_id: i64,
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub session_state: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionRow {
    pub id: i64,
    pub session_token: String,
    pub user_id: i64,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSessionRow {
    pub session_token: String,
    pub user_id: i64,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = verification_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VerificationTokenRow {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = verification_tokens)]
pub struct NewVerificationTokenRow {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = boards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BoardRow {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = boards)]
pub struct NewBoardRow {
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub visibility: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = board_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BoardItemRow {
    pub id: i64,
    pub board_id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: Option<String>,
    pub item_type: String,
    pub position: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = board_items)]
pub struct NewBoardItemRow {
    pub board_id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: Option<String>,
    pub item_type: String,
    pub position: i64,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = planners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlannerRow {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = planners)]
pub struct NewPlannerRow {
    pub owner_id: i64,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = planner_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlannerItemRow {
    pub id: i64,
    pub planner_id: i64,
    pub author_id: i64,
    pub lesson_id: Option<i64>,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = planner_items)]
pub struct NewPlannerItemRow {
    pub planner_id: i64,
    pub author_id: i64,
    pub lesson_id: Option<i64>,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = resources)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ResourceRow {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub resource_type: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = resources)]
pub struct NewResourceRow {
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub resource_type: String,
    pub visibility: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lessons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LessonRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lessons)]
pub struct NewLessonRow {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lesson_resources)]
pub struct NewLessonResourceRow {
    pub lesson_id: i64,
    pub resource_id: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = community_posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = community_posts)]
pub struct NewPostRow {
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub visibility: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub struct NewCommentRow {
    pub post_id: i64,
    pub author_id: i64,
    pub body: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LikeRow {
    pub id: i64,
    pub user_id: i64,
    pub content_type: String,
    pub content_id: i64,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLikeRow {
    pub user_id: i64,
    pub content_type: String,
    pub content_id: i64,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
}
