//! Engagement totals over the well-formed posts of one batch.

use std::collections::HashSet;

use serde::Serialize;

use crate::processor::BatchItem;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedSummary {
    pub total_posts: usize,
    pub total_upvotes: i64,
    pub total_replies: i64,
    pub total_reblogs: i64,
    /// Distinct author usernames.
    pub unique_users: usize,
}

impl FeedSummary {
    #[must_use]
    pub fn from_items(items: &[BatchItem]) -> Self {
        let mut summary = Self::default();
        let mut users = HashSet::new();

        for item in items {
            let BatchItem::Post(post) = item else {
                continue;
            };
            summary.total_posts += 1;
            summary.total_upvotes += post.upvotes_count;
            summary.total_replies += post.replies_count;
            summary.total_reblogs += post.reblogs_count;
            users.insert(post.account.username.as_str());
        }

        summary.unique_users = users.len();
        summary
    }
}
