//! Database operations for the `accounts` table.

use chrono::{DateTime, Utc};
use polypulse_core::Account;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `accounts` table.
///
/// `created_at` is the upstream profile creation time; `first_seen_at` and
/// `updated_at` track when this service first and last saw the account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub acct: String,
    pub display_name: String,
    pub note: String,
    pub url: String,
    pub avatar: String,
    pub locked: bool,
    pub bot: bool,
    pub verified: bool,
    pub followers_count: i64,
    pub following_count: i64,
    pub statuses_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub last_status_at: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            acct: row.acct,
            display_name: row.display_name,
            note: row.note,
            url: row.url,
            avatar: row.avatar,
            locked: row.locked,
            bot: row.bot,
            verified: row.verified,
            followers_count: row.followers_count,
            following_count: row.following_count,
            statuses_count: row.statuses_count,
            created_at: row.created_at,
            last_status_at: row.last_status_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts the account, or overwrites every mirrored field when the id exists.
///
/// `first_seen_at` is preserved across updates.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_account(pool: &PgPool, account: &Account) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO accounts \
             (id, username, acct, display_name, note, url, avatar, locked, bot, verified, \
              followers_count, following_count, statuses_count, created_at, last_status_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         ON CONFLICT (id) DO UPDATE SET \
             username        = EXCLUDED.username, \
             acct            = EXCLUDED.acct, \
             display_name    = EXCLUDED.display_name, \
             note            = EXCLUDED.note, \
             url             = EXCLUDED.url, \
             avatar          = EXCLUDED.avatar, \
             locked          = EXCLUDED.locked, \
             bot             = EXCLUDED.bot, \
             verified        = EXCLUDED.verified, \
             followers_count = EXCLUDED.followers_count, \
             following_count = EXCLUDED.following_count, \
             statuses_count  = EXCLUDED.statuses_count, \
             created_at      = EXCLUDED.created_at, \
             last_status_at  = EXCLUDED.last_status_at, \
             updated_at      = NOW()",
    )
    .bind(&account.id)
    .bind(&account.username)
    .bind(&account.acct)
    .bind(&account.display_name)
    .bind(&account.note)
    .bind(&account.url)
    .bind(&account.avatar)
    .bind(account.locked)
    .bind(account.bot)
    .bind(account.verified)
    .bind(account.followers_count)
    .bind(account.following_count)
    .bind(account.statuses_count)
    .bind(account.created_at)
    .bind(&account.last_status_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches a single account by its upstream id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_account(pool: &PgPool, id: &str) -> Result<Option<AccountRow>, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, username, acct, display_name, note, url, avatar, locked, bot, verified, \
                followers_count, following_count, statuses_count, created_at, last_status_at, \
                first_seen_at, updated_at \
         FROM accounts \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the number of distinct accounts seen.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_accounts(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
