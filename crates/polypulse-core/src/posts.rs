//! Social-feed records: authoring accounts and posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An authoring account as mirrored from the upstream profile.
///
/// Upserted on every sighting: the latest payload wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub statuses_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Upstream sends a bare date (`"2025-06-01"`), kept verbatim.
    #[serde(default)]
    pub last_status_at: Option<String>,
}

/// A post exactly as the upstream pusher delivers it, account embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPayload {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub spoiler_text: String,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    #[serde(default)]
    pub quote_id: Option<String>,
    #[serde(default)]
    pub replies_count: i64,
    #[serde(default)]
    pub reblogs_count: i64,
    #[serde(default)]
    pub favourites_count: i64,
    #[serde(default)]
    pub upvotes_count: i64,
    #[serde(default)]
    pub downvotes_count: i64,
    #[serde(default = "empty_array")]
    pub media_attachments: Value,
    pub account: Account,
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

/// A persisted post. The author is referenced by `account_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
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
    /// `true` when the author's username matches the tracked subject.
    pub is_subject_post: bool,
    pub processed_at: DateTime<Utc>,
}

impl PostRecord {
    /// Build the record to persist for `payload`, deriving the subject flag.
    #[must_use]
    pub fn from_payload(
        payload: &PostPayload,
        subject_username: &str,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: payload.id.clone(),
            account_id: payload.account.id.clone(),
            created_at: payload.created_at,
            content: payload.content.clone(),
            url: payload.url.clone(),
            uri: payload.uri.clone(),
            language: payload.language.clone(),
            visibility: payload.visibility.clone(),
            sensitive: payload.sensitive,
            spoiler_text: payload.spoiler_text.clone(),
            in_reply_to_id: payload.in_reply_to_id.clone(),
            quote_id: payload.quote_id.clone(),
            replies_count: payload.replies_count,
            reblogs_count: payload.reblogs_count,
            favourites_count: payload.favourites_count,
            upvotes_count: payload.upvotes_count,
            downvotes_count: payload.downvotes_count,
            media_attachments: payload.media_attachments.clone(),
            is_subject_post: payload.account.username == subject_username,
            processed_at,
        }
    }
}

/// A post resolved together with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostWithAccount {
    #[serde(flatten)]
    pub post: PostRecord,
    pub account: Account,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_json(username: &str) -> Value {
        serde_json::json!({
            "id": "114000000000000001",
            "created_at": "2025-06-01T12:00:00.000Z",
            "content": "<p>Hello</p>",
            "upvotes_count": 12,
            "replies_count": 3,
            "reblogs_count": 4,
            "account": {
                "id": "107780257626128497",
                "username": username,
                "display_name": "Display"
            }
        })
    }

    #[test]
    fn payload_tolerates_missing_optional_fields() {
        let payload: PostPayload =
            serde_json::from_value(payload_json("someone")).expect("deserialize payload");
        assert_eq!(payload.id, "114000000000000001");
        assert_eq!(payload.upvotes_count, 12);
        assert_eq!(payload.favourites_count, 0);
        assert!(payload.media_attachments.as_array().is_some_and(Vec::is_empty));
        assert_eq!(payload.account.followers_count, 0);
        assert!(payload.account.last_status_at.is_none());
    }

    #[test]
    fn payload_without_account_is_rejected() {
        let result = serde_json::from_value::<PostPayload>(serde_json::json!({
            "id": "1",
            "created_at": "2025-06-01T12:00:00Z"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn record_flags_subject_author() {
        let payload: PostPayload =
            serde_json::from_value(payload_json("realDonaldTrump")).expect("payload");
        let record = PostRecord::from_payload(&payload, "realDonaldTrump", Utc::now());
        assert!(record.is_subject_post);
        assert_eq!(record.account_id, "107780257626128497");
    }

    #[test]
    fn record_subject_match_is_case_sensitive() {
        let payload: PostPayload =
            serde_json::from_value(payload_json("realdonaldtrump")).expect("payload");
        let record = PostRecord::from_payload(&payload, "realDonaldTrump", Utc::now());
        assert!(!record.is_subject_post);
    }

    #[test]
    fn post_with_account_flattens_post_fields() {
        let payload: PostPayload =
            serde_json::from_value(payload_json("someone")).expect("payload");
        let joined = PostWithAccount {
            post: PostRecord::from_payload(&payload, "realDonaldTrump", Utc::now()),
            account: payload.account.clone(),
        };
        let json = serde_json::to_value(&joined).expect("serialize");
        assert_eq!(json["id"], "114000000000000001");
        assert_eq!(json["account"]["username"], "someone");
        assert_eq!(json["is_subject_post"], false);
    }
}
