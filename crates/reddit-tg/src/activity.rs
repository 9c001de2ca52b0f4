use crate::query::Days;
use crate::reddit::{RecordKind, RedditRecord, Removal, UserProfile};
use chrono::{DateTime, Utc};
use itertools::Itertools;

/// How many of the best posts are shown in the summary
const TOP_POSTS: usize = 5;

/// Summary of what the user did within the last `days` days
#[derive(Debug, Clone)]
pub(crate) struct UserActivity {
    pub(crate) profile: UserProfile,
    pub(crate) days: Days,
    pub(crate) now: DateTime<Utc>,

    pub(crate) posts_submitted: u64,
    pub(crate) comments_written: u64,

    /// Sum of the scores of the submitted posts
    pub(crate) upvotes_received: i64,

    /// Sum of the comment counts of the submitted posts
    pub(crate) comments_received: u64,

    /// Best posts by score, highest first
    pub(crate) top_posts: Vec<RedditRecord>,

    /// Removed posts, newest first
    pub(crate) removed_posts: Vec<RedditRecord>,
}

impl UserActivity {
    /// Records created before the window are ignored
    pub(crate) fn summarize(
        profile: UserProfile,
        days: Days,
        now: DateTime<Utc>,
        records: impl IntoIterator<Item = RedditRecord>,
    ) -> Self {
        let cutoff = now - days.to_duration();

        let (comments, posts): (Vec<_>, Vec<_>) = records
            .into_iter()
            .filter(|record| record.created >= cutoff)
            .partition(|record| record.kind == RecordKind::Comment);

        let removed_posts = posts
            .iter()
            .filter(|post| post.removal.is_some())
            .sorted_by(|a, b| b.created.cmp(&a.created))
            .cloned()
            .collect();

        let top_posts = posts
            .iter()
            .sorted_by(|a, b| b.score.cmp(&a.score))
            .take(TOP_POSTS)
            .cloned()
            .collect();

        Self {
            profile,
            days,
            now,
            posts_submitted: posts.len() as u64,
            comments_written: comments.len() as u64,
            upvotes_received: posts.iter().map(|post| post.score).sum(),
            comments_received: posts.iter().filter_map(|post| post.num_comments).sum(),
            top_posts,
            removed_posts,
        }
    }

    pub(crate) fn removed_count(&self, removal: Removal) -> usize {
        self.removed_posts
            .iter()
            .filter(|post| post.removal == Some(removal))
            .count()
    }
}
