//! Live integration tests for polypulse-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. `"../../migrations"` is relative to `crates/polypulse-db/`.

use chrono::{DateTime, Duration, Utc};
use polypulse_core::{
    Account, BatchCounts, FeedStore, NewFeedingEvent, PostPayload, PostRecord, StoreError,
};
use polypulse_db::{
    count_accounts, get_account, get_post_with_account, insert_feeding_event,
    insert_post_if_absent, list_feeding_events_in_range, list_posts, list_subject_posts,
    post_statistics, upsert_account, PgFeedStore,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000 + secs, 0).expect("valid timestamp")
}

fn make_account(id: &str, username: &str, display_name: &str) -> Account {
    Account {
        id: id.to_string(),
        username: username.to_string(),
        acct: username.to_string(),
        display_name: display_name.to_string(),
        note: String::new(),
        url: format!("https://truthsocial.com/@{username}"),
        avatar: String::new(),
        locked: false,
        bot: false,
        verified: false,
        followers_count: 1,
        following_count: 2,
        statuses_count: 3,
        created_at: None,
        last_status_at: None,
    }
}

fn make_post(id: &str, account: &Account, created_secs: i64) -> PostRecord {
    let payload = PostPayload {
        id: id.to_string(),
        created_at: at(created_secs),
        content: format!("<p>post {id}</p>"),
        url: String::new(),
        uri: String::new(),
        language: Some("en".to_string()),
        visibility: "public".to_string(),
        sensitive: false,
        spoiler_text: String::new(),
        in_reply_to_id: None,
        quote_id: None,
        replies_count: 1,
        reblogs_count: 2,
        favourites_count: 3,
        upvotes_count: 4,
        downvotes_count: 0,
        media_attachments: serde_json::json!([]),
        account: account.clone(),
    };
    PostRecord::from_payload(&payload, "realDonaldTrump", Utc::now())
}

fn make_event(feed_count: i64, received_at: DateTime<Utc>) -> NewFeedingEvent {
    NewFeedingEvent::from_batch(
        received_at,
        feed_count,
        BatchCounts {
            received: 2,
            saved: 1,
            skipped: 1,
            errors: 0,
        },
        15,
    )
}

// ---------------------------------------------------------------------------
// Section 1: Accounts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_account_overwrites_with_latest_fields(pool: sqlx::PgPool) {
    upsert_account(&pool, &make_account("a-1", "someone", "First Name"))
        .await
        .expect("first upsert");
    upsert_account(&pool, &make_account("a-1", "someone", "Second Name"))
        .await
        .expect("second upsert");

    assert_eq!(count_accounts(&pool).await.expect("count"), 1);
    let row = get_account(&pool, "a-1")
        .await
        .expect("get_account")
        .expect("account exists");
    assert_eq!(row.display_name, "Second Name");
    assert!(row.updated_at >= row.first_seen_at);
}

// ---------------------------------------------------------------------------
// Section 2: Posts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_post_if_absent_dedups_by_id(pool: sqlx::PgPool) {
    let account = make_account("a-1", "someone", "Someone");
    upsert_account(&pool, &account).await.expect("upsert");
    let post = make_post("p-1", &account, 0);

    assert!(insert_post_if_absent(&pool, &post).await.expect("first insert"));
    assert!(!insert_post_if_absent(&pool, &post).await.expect("second insert"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = 'p-1'")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_post_without_account_fails(pool: sqlx::PgPool) {
    let account = make_account("missing", "ghost", "Ghost");
    let result = insert_post_if_absent(&pool, &make_post("p-9", &account, 0)).await;
    assert!(result.is_err(), "foreign key should reject orphan post");
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_post_with_account_joins_author(pool: sqlx::PgPool) {
    let account = make_account("a-1", "realDonaldTrump", "Donald J. Trump");
    upsert_account(&pool, &account).await.expect("upsert");
    insert_post_if_absent(&pool, &make_post("p-1", &account, 0))
        .await
        .expect("insert");

    let row = get_post_with_account(&pool, "p-1")
        .await
        .expect("query")
        .expect("post exists");
    assert_eq!(row.account_username, "realDonaldTrump");
    assert!(row.is_subject_post);

    assert!(get_post_with_account(&pool, "nope")
        .await
        .expect("query")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_posts_orders_newest_first_and_filters(pool: sqlx::PgPool) {
    let subject = make_account("a-1", "realDonaldTrump", "Subject");
    let other = make_account("a-2", "someone", "Other");
    upsert_account(&pool, &subject).await.expect("upsert subject");
    upsert_account(&pool, &other).await.expect("upsert other");

    insert_post_if_absent(&pool, &make_post("p-1", &subject, 10))
        .await
        .expect("insert p-1");
    insert_post_if_absent(&pool, &make_post("p-2", &other, 20))
        .await
        .expect("insert p-2");
    insert_post_if_absent(&pool, &make_post("p-3", &subject, 30))
        .await
        .expect("insert p-3");

    let all = list_posts(&pool, 50, 0, None).await.expect("list all");
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["p-3", "p-2", "p-1"]);

    let paged = list_posts(&pool, 1, 1, None).await.expect("list paged");
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].id, "p-2");

    let by_user = list_posts(&pool, 50, 0, Some("someone"))
        .await
        .expect("list by user");
    assert_eq!(by_user.len(), 1);
    assert_eq!(by_user[0].id, "p-2");

    let subject_posts = list_subject_posts(&pool, 50, 0).await.expect("subject");
    let subject_ids: Vec<&str> = subject_posts.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(subject_ids, vec!["p-3", "p-1"]);

    let stats = post_statistics(&pool).await.expect("stats");
    assert_eq!(stats.total_posts, 3);
    assert_eq!(stats.subject_posts, 2);
    assert_eq!(stats.total_accounts, 2);
    assert_eq!(stats.latest_post_at, Some(at(30)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn post_statistics_on_empty_database(pool: sqlx::PgPool) {
    let stats = post_statistics(&pool).await.expect("stats");
    assert_eq!(stats.total_posts, 0);
    assert_eq!(stats.subject_posts, 0);
    assert_eq!(stats.total_accounts, 0);
    assert!(stats.latest_post_at.is_none());
}

// ---------------------------------------------------------------------------
// Section 3: Feeding events
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn feeding_event_range_is_inclusive_and_newest_first(pool: sqlx::PgPool) {
    for (count, secs) in [(1, 0), (2, 15), (3, 30), (4, 45)] {
        insert_feeding_event(&pool, &make_event(count, at(secs)))
            .await
            .expect("insert event");
    }

    let rows = list_feeding_events_in_range(&pool, at(15), at(45), None)
        .await
        .expect("range");
    let counts: Vec<i64> = rows.iter().map(|r| r.feed_count).collect();
    assert_eq!(counts, vec![4, 3, 2]);

    let limited = list_feeding_events_in_range(&pool, at(0), at(45), Some(2))
        .await
        .expect("limited");
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].feed_count, 4);

    let empty = list_feeding_events_in_range(&pool, at(100), at(200), None)
        .await
        .expect("empty");
    assert!(empty.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn rejected_feeding_event_round_trips(pool: sqlx::PgPool) {
    let row = insert_feeding_event(
        &pool,
        &NewFeedingEvent::rejected(at(0), 9, 3, "feed must be an array"),
    )
    .await
    .expect("insert");

    assert!(!row.is_successful);
    assert_eq!(row.posts_received, 0);
    assert_eq!(row.error_message.as_deref(), Some("feed must be an array"));
}

// ---------------------------------------------------------------------------
// Section 4: PgFeedStore
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_inserts_of_one_post_have_a_single_winner(pool: sqlx::PgPool) {
    let store = PgFeedStore::new(pool);
    let account = make_account("a-1", "someone", "Someone");
    store.upsert_account(&account).await.expect("upsert");
    let post = make_post("p-race", &account, 0);

    let (first, second) = tokio::join!(
        store.insert_post_if_absent(&post),
        store.insert_post_if_absent(&post)
    );
    let winners = [first.expect("first"), second.expect("second")]
        .iter()
        .filter(|inserted| **inserted)
        .count();
    assert_eq!(winners, 1);

    let found = store
        .find_post("p-race")
        .await
        .expect("find")
        .expect("post exists");
    assert_eq!(found.account.username, "someone");
}

#[sqlx::test(migrations = "../../migrations")]
async fn closed_pool_reports_store_unavailable(pool: sqlx::PgPool) {
    let store = PgFeedStore::new(pool.clone());
    pool.close().await;

    let err = store.find_post("p-1").await.expect_err("pool is closed");
    assert!(
        matches!(err, StoreError::Unavailable(_)),
        "expected Unavailable, got {err:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_range_query_converts_rows(pool: sqlx::PgPool) {
    let store = PgFeedStore::new(pool);
    let stored = store
        .insert_feeding_event(&make_event(1, at(0)))
        .await
        .expect("insert");
    assert_eq!(stored.timestamp, at(0));

    let events = store
        .feeding_events_in_range(at(0) - Duration::seconds(1), at(0), Some(10))
        .await
        .expect("range");
    assert_eq!(events, vec![stored]);
}
