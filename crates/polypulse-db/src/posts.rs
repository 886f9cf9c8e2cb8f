//! Database operations for the `posts` table.
//!
//! Reads always join the authoring account so callers get a fully-resolved
//! [`PostWithAccount`].

use chrono::{DateTime, Utc};
use polypulse_core::{Account, PostRecord, PostWithAccount};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A `posts` row joined with its `accounts` row. Account columns are
/// prefixed `account_`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostWithAccountRow {
    pub id: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub url: String,
    pub uri: String,
    pub language: Option<String>,
    pub visibility: String,
    pub sensitive: bool,
    pub spoiler_text: String,
    pub in_reply_to_id: Option<String>,
    pub quote_id: Option<String>,
    pub replies_count: i64,
    pub reblogs_count: i64,
    pub favourites_count: i64,
    pub upvotes_count: i64,
    pub downvotes_count: i64,
    pub media_attachments: Value,
    pub is_subject_post: bool,
    pub processed_at: DateTime<Utc>,
    pub account_username: String,
    pub account_acct: String,
    pub account_display_name: String,
    pub account_note: String,
    pub account_url: String,
    pub account_avatar: String,
    pub account_locked: bool,
    pub account_bot: bool,
    pub account_verified: bool,
    pub account_followers_count: i64,
    pub account_following_count: i64,
    pub account_statuses_count: i64,
    pub account_created_at: Option<DateTime<Utc>>,
    pub account_last_status_at: Option<String>,
}

impl From<PostWithAccountRow> for PostWithAccount {
    fn from(row: PostWithAccountRow) -> Self {
        let account = Account {
            id: row.account_id.clone(),
            username: row.account_username,
            acct: row.account_acct,
            display_name: row.account_display_name,
            note: row.account_note,
            url: row.account_url,
            avatar: row.account_avatar,
            locked: row.account_locked,
            bot: row.account_bot,
            verified: row.account_verified,
            followers_count: row.account_followers_count,
            following_count: row.account_following_count,
            statuses_count: row.account_statuses_count,
            created_at: row.account_created_at,
            last_status_at: row.account_last_status_at,
        };
        let post = PostRecord {
            id: row.id,
            account_id: row.account_id,
            created_at: row.created_at,
            content: row.content,
            url: row.url,
            uri: row.uri,
            language: row.language,
            visibility: row.visibility,
            sensitive: row.sensitive,
            spoiler_text: row.spoiler_text,
            in_reply_to_id: row.in_reply_to_id,
            quote_id: row.quote_id,
            replies_count: row.replies_count,
            reblogs_count: row.reblogs_count,
            favourites_count: row.favourites_count,
            upvotes_count: row.upvotes_count,
            downvotes_count: row.downvotes_count,
            media_attachments: row.media_attachments,
            is_subject_post: row.is_subject_post,
            processed_at: row.processed_at,
        };
        Self { post, account }
    }
}

/// Counters shown on the dashboard statistics panel.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostStatistics {
    pub total_posts: i64,
    pub subject_posts: i64,
    pub total_accounts: i64,
    /// `NULL` until the first post is stored.
    pub latest_post_at: Option<DateTime<Utc>>,
}

const POST_WITH_ACCOUNT_SELECT: &str = "\
    SELECT p.id, p.account_id, p.created_at, p.content, p.url, p.uri, p.language, \
           p.visibility, p.sensitive, p.spoiler_text, p.in_reply_to_id, p.quote_id, \
           p.replies_count, p.reblogs_count, p.favourites_count, p.upvotes_count, \
           p.downvotes_count, p.media_attachments, p.is_subject_post, p.processed_at, \
           a.username AS account_username, a.acct AS account_acct, \
           a.display_name AS account_display_name, a.note AS account_note, \
           a.url AS account_url, a.avatar AS account_avatar, a.locked AS account_locked, \
           a.bot AS account_bot, a.verified AS account_verified, \
           a.followers_count AS account_followers_count, \
           a.following_count AS account_following_count, \
           a.statuses_count AS account_statuses_count, \
           a.created_at AS account_created_at, a.last_status_at AS account_last_status_at \
    FROM posts p \
    JOIN accounts a ON a.id = p.account_id";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a post unless one with the same id already exists.
///
/// Returns `true` if this call inserted the row. The primary key makes the
/// check-and-insert atomic, so concurrent callers racing on one id see
/// exactly one `true`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any reason other than
/// the id conflict (for example a missing `accounts` row).
pub async fn insert_post_if_absent(pool: &PgPool, post: &PostRecord) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO posts \
             (id, account_id, created_at, content, url, uri, language, visibility, sensitive, \
              spoiler_text, in_reply_to_id, quote_id, replies_count, reblogs_count, \
              favourites_count, upvotes_count, downvotes_count, media_attachments, \
              is_subject_post, processed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                 $18, $19, $20) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(&post.id)
    .bind(&post.account_id)
    .bind(post.created_at)
    .bind(&post.content)
    .bind(&post.url)
    .bind(&post.uri)
    .bind(&post.language)
    .bind(&post.visibility)
    .bind(post.sensitive)
    .bind(&post.spoiler_text)
    .bind(&post.in_reply_to_id)
    .bind(&post.quote_id)
    .bind(post.replies_count)
    .bind(post.reblogs_count)
    .bind(post.favourites_count)
    .bind(post.upvotes_count)
    .bind(post.downvotes_count)
    .bind(&post.media_attachments)
    .bind(post.is_subject_post)
    .bind(post.processed_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches one post and its author, or `None` if the id is unknown.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_post_with_account(
    pool: &PgPool,
    id: &str,
) -> Result<Option<PostWithAccountRow>, DbError> {
    let sql = format!("{POST_WITH_ACCOUNT_SELECT} WHERE p.id = $1");
    let row = sqlx::query_as::<_, PostWithAccountRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Lists posts newest-first, optionally restricted to one author username.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts(
    pool: &PgPool,
    limit: i64,
    skip: i64,
    username: Option<&str>,
) -> Result<Vec<PostWithAccountRow>, DbError> {
    let sql = format!(
        "{POST_WITH_ACCOUNT_SELECT} \
         WHERE ($3::text IS NULL OR a.username = $3) \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, PostWithAccountRow>(&sql)
        .bind(limit)
        .bind(skip)
        .bind(username)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Lists posts authored by the tracked subject account, newest-first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_subject_posts(
    pool: &PgPool,
    limit: i64,
    skip: i64,
) -> Result<Vec<PostWithAccountRow>, DbError> {
    let sql = format!(
        "{POST_WITH_ACCOUNT_SELECT} \
         WHERE p.is_subject_post \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, PostWithAccountRow>(&sql)
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns post and account totals plus the newest post timestamp.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn post_statistics(pool: &PgPool) -> Result<PostStatistics, DbError> {
    let stats = sqlx::query_as::<_, PostStatistics>(
        "SELECT \
             (SELECT COUNT(*) FROM posts) AS total_posts, \
             (SELECT COUNT(*) FROM posts WHERE is_subject_post) AS subject_posts, \
             (SELECT COUNT(*) FROM accounts) AS total_accounts, \
             (SELECT MAX(created_at) FROM posts) AS latest_post_at",
    )
    .fetch_one(pool)
    .await?;

    Ok(stats)
}
