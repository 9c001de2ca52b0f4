//! Declarations of the Reddit JSON API types. Only the fields the bot uses are
//! declared. See the [API docs] for the full shape of the objects.
//!
//! [API docs]: https://www.reddit.com/dev/api
use crate::reddit::{RecordKind, RedditRecord, Removal, UserProfile};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{serde_as, TimestampSecondsWithFrac};

/// Response of the app-only OAuth token endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,

    /// Seconds until the token expires
    pub(crate) expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub(crate) data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    /// Cursor of the next page, absent on the last page
    pub(crate) after: Option<String>,
    pub(crate) children: Vec<Thing<T>>,
}

/// Reddit wraps every object into `{ "kind": "t3", "data": { ... } }`
#[derive(Debug, Deserialize)]
pub(crate) struct Thing<T> {
    pub(crate) data: T,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(crate) struct RawPost {
    author: String,
    subreddit: String,
    title: String,

    #[serde(default)]
    selftext: String,
    score: i64,

    #[serde_as(as = "TimestampSecondsWithFrac<f64>")]
    created_utc: DateTime<Utc>,
    permalink: String,
    num_comments: u64,
    removed_by_category: Option<Removal>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(crate) struct RawComment {
    author: String,
    subreddit: String,

    #[serde(default)]
    link_title: String,
    body: String,
    score: i64,

    #[serde_as(as = "TimestampSecondsWithFrac<f64>")]
    created_utc: DateTime<Utc>,
    permalink: String,
}

/// Suspended accounts only have `name` and `is_suspended`
#[serde_as]
#[derive(Debug, Deserialize)]
pub(crate) struct RawUser {
    name: String,

    #[serde(default)]
    is_suspended: bool,

    #[serde_as(as = "Option<TimestampSecondsWithFrac<f64>>")]
    created_utc: Option<DateTime<Utc>>,

    #[serde(default)]
    link_karma: i64,

    #[serde(default)]
    comment_karma: i64,
}

impl RawPost {
    pub(crate) fn into_record(self, kind: RecordKind) -> RedditRecord {
        RedditRecord {
            kind,
            author: self.author,
            subreddit: self.subreddit,
            title: self.title,
            body: self.selftext,
            score: self.score,
            created: self.created_utc,
            permalink: self.permalink,
            num_comments: Some(self.num_comments),
            removal: self.removed_by_category,
        }
    }
}

impl From<RawComment> for RedditRecord {
    fn from(comment: RawComment) -> Self {
        Self {
            kind: RecordKind::Comment,
            author: comment.author,
            subreddit: comment.subreddit,
            title: comment.link_title,
            body: comment.body,
            score: comment.score,
            created: comment.created_utc,
            permalink: comment.permalink,
            num_comments: None,
            removal: None,
        }
    }
}

impl From<RawUser> for UserProfile {
    fn from(user: RawUser) -> Self {
        Self {
            name: user.name,
            created: user.created_utc,
            link_karma: user.link_karma,
            comment_karma: user.comment_karma,
            is_suspended: user.is_suspended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn post_listing() {
        let json = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_abc",
                "dist": 2,
                "children": [
                    {
                        "kind": "t3",
                        "data": {
                            "author": "ferris",
                            "subreddit": "rust",
                            "title": "Announcing Rust 1.70",
                            "selftext": "",
                            "score": 1234,
                            "created_utc": 1685577600.0,
                            "permalink": "/r/rust/comments/abc/announcing_rust_170/",
                            "num_comments": 321,
                            "removed_by_category": null
                        }
                    },
                    {
                        "kind": "t3",
                        "data": {
                            "author": "[deleted]",
                            "subreddit": "rust",
                            "title": "Spammy",
                            "score": -3,
                            "created_utc": 1685577601.5,
                            "permalink": "/r/rust/comments/def/spammy/",
                            "num_comments": 0,
                            "removed_by_category": "anti_evil_ops"
                        }
                    }
                ]
            }
        }"#;

        let listing: Listing<RawPost> = serde_json::from_str(json).unwrap();

        assert_eq!(listing.data.after.as_deref(), Some("t3_abc"));

        let records: Vec<_> = listing
            .data
            .children
            .into_iter()
            .map(|thing| thing.data.into_record(RecordKind::ListingEntry))
            .collect();

        expect!["2023-06-01 00:00:00 UTC"].assert_eq(&records[0].created.to_string());
        assert_eq!(records[0].num_comments, Some(321));
        assert_eq!(records[0].removal, None);
        assert_eq!(records[1].removal, Some(Removal::Other));
        assert_eq!(records[1].body, "");
    }

    #[test]
    fn removal_categories() {
        let parse = |json: &str| serde_json::from_str::<Removal>(json).unwrap();
        assert_eq!(parse(r#""moderator""#), Removal::Moderator);
        assert_eq!(parse(r#""spam""#), Removal::Spam);
        assert_eq!(parse(r#""subreddit""#), Removal::SubredditRules);
        assert_eq!(parse(r#""author""#), Removal::Deleted);
        assert_eq!(parse(r#""deleted""#), Removal::Deleted);
        assert_eq!(parse(r#""copyright_takedown""#), Removal::Other);
    }

    #[test]
    fn comment_keeps_submission_title() {
        let json = r#"{
            "kind": "t1",
            "data": {
                "author": "ferris",
                "subreddit": "rust",
                "link_title": "What's your favorite crate?",
                "body": "serde, obviously",
                "score": 42,
                "created_utc": 1685577600,
                "permalink": "/r/rust/comments/abc/whats_your_favorite_crate/jk1/"
            }
        }"#;

        let comment: Thing<RawComment> = serde_json::from_str(json).unwrap();
        let record = RedditRecord::from(comment.data);

        assert_eq!(record.kind, RecordKind::Comment);
        assert_eq!(record.title, "What's your favorite crate?");
        assert_eq!(record.body, "serde, obviously");
        assert_eq!(record.num_comments, None);
    }

    #[test]
    fn suspended_user() {
        let json = r#"{"kind": "t2", "data": {"is_suspended": true, "name": "banned_one"}}"#;

        let user: Thing<RawUser> = serde_json::from_str(json).unwrap();
        let profile = UserProfile::from(user.data);

        assert!(profile.is_suspended);
        assert_eq!(profile.created, None);
        assert_eq!(profile.link_karma, 0);
    }

    #[test]
    fn active_user() {
        let json = r#"{
            "kind": "t2",
            "data": {
                "name": "ferris",
                "created_utc": 1420070400.0,
                "link_karma": 100,
                "comment_karma": 2500,
                "is_suspended": false
            }
        }"#;

        let user: Thing<RawUser> = serde_json::from_str(json).unwrap();
        let profile = UserProfile::from(user.data);

        expect![[r#"
            UserProfile {
                name: "ferris",
                created: Some(
                    2015-01-01T00:00:00Z,
                ),
                link_karma: 100,
                comment_karma: 2500,
                is_suspended: false,
            }
        "#]]
        .assert_debug_eq(&profile);
    }
}
