//! A [`FeedStore`] held entirely in process memory.
//!
//! Used by tests and by local runs without Postgres. Writes can be made to
//! fail per id, or the whole store marked unavailable, to exercise the
//! processor's error paths.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use polypulse_core::{
    Account, FeedStore, FeedingEvent, NewFeedingEvent, PostRecord, PostWithAccount, StoreError,
};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    posts: HashMap<String, PostRecord>,
    events: Vec<FeedingEvent>,
    failing_posts: HashSet<String>,
    failing_accounts: HashSet<String>,
    unavailable: bool,
}

impl MemoryState {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("in-memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFeedStore {
    state: RwLock<MemoryState>,
}

impl InMemoryFeedStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later post write for `post_id` fail with a query error.
    pub async fn fail_post_writes(&self, post_id: &str) {
        self.state.write().await.failing_posts.insert(post_id.to_string());
    }

    /// Make every later upsert of `account_id` fail with a query error.
    pub async fn fail_account_writes(&self, account_id: &str) {
        self.state
            .write()
            .await
            .failing_accounts
            .insert(account_id.to_string());
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    pub async fn account(&self, id: &str) -> Option<Account> {
        self.state.read().await.accounts.get(id).cloned()
    }

    pub async fn post_count(&self) -> usize {
        self.state.read().await.posts.len()
    }

    pub async fn account_count(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    /// Every stored event, oldest first.
    pub async fn events(&self) -> Vec<FeedingEvent> {
        self.state.read().await.events.clone()
    }
}

#[async_trait]
impl FeedStore for InMemoryFeedStore {
    async fn find_post(&self, id: &str) -> Result<Option<PostWithAccount>, StoreError> {
        let state = self.state.read().await;
        state.check_available()?;

        Ok(state.posts.get(id).and_then(|post| {
            state.accounts.get(&post.account_id).map(|account| PostWithAccount {
                post: post.clone(),
                account: account.clone(),
            })
        }))
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_available()?;
        if state.failing_accounts.contains(&account.id) {
            return Err(StoreError::Query(format!(
                "account {} rejected by store",
                account.id
            )));
        }

        state.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn insert_post_if_absent(&self, post: &PostRecord) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        state.check_available()?;
        if state.failing_posts.contains(&post.id) {
            return Err(StoreError::Query(format!("post {} rejected by store", post.id)));
        }
        if !state.accounts.contains_key(&post.account_id) {
            return Err(StoreError::Query(format!(
                "post {} references unknown account {}",
                post.id, post.account_id
            )));
        }
        if state.posts.contains_key(&post.id) {
            return Ok(false);
        }

        state.posts.insert(post.id.clone(), post.clone());
        Ok(true)
    }

    async fn insert_feeding_event(
        &self,
        event: &NewFeedingEvent,
    ) -> Result<FeedingEvent, StoreError> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let id = i64::try_from(state.events.len()).unwrap_or(i64::MAX) + 1;
        let stored = FeedingEvent::from_new(id, event.clone());
        state.events.push(stored.clone());
        Ok(stored)
    }

    async fn feeding_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<FeedingEvent>, StoreError> {
        let state = self.state.read().await;
        state.check_available()?;

        let mut events: Vec<FeedingEvent> = state
            .events
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            events.truncate(limit);
        }
        Ok(events)
    }
}
