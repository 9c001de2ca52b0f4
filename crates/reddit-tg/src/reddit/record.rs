use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A comment, a submission or a subreddit listing entry in a common shape
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RedditRecord {
    pub(crate) kind: RecordKind,
    pub(crate) author: String,
    pub(crate) subreddit: String,

    /// For comments this is the title of the submission they were left under
    pub(crate) title: String,

    /// Self-text of a submission or the text of a comment
    pub(crate) body: String,

    /// The number of upvotes minus the number of downvotes
    pub(crate) score: i64,
    pub(crate) created: DateTime<Utc>,

    /// Path relative to `https://www.reddit.com`
    pub(crate) permalink: String,

    /// Only known for submissions
    pub(crate) num_comments: Option<u64>,

    /// Only known for submissions
    pub(crate) removal: Option<Removal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordKind {
    /// Comment from a user's history
    Comment,

    /// Submission from a user's history or a user's top
    Submission,

    /// Entry of a subreddit listing
    ListingEntry,
}

/// The reason a submission is no longer visible to others
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum::EnumIter, strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Removal {
    #[strum(serialize = "mods")]
    Moderator,

    #[strum(serialize = "spam")]
    Spam,

    #[serde(rename = "subreddit")]
    #[strum(serialize = "rules")]
    SubredditRules,

    #[serde(alias = "author")]
    #[strum(serialize = "deleted")]
    Deleted,

    #[serde(other)]
    #[strum(serialize = "other")]
    Other,
}

impl Removal {
    pub(crate) fn label(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UserProfile {
    pub(crate) name: String,

    /// Not exposed for suspended accounts
    pub(crate) created: Option<DateTime<Utc>>,
    pub(crate) link_karma: i64,
    pub(crate) comment_karma: i64,
    pub(crate) is_suspended: bool,
}
