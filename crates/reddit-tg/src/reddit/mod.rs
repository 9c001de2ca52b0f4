//! Read-only access to Reddit listings and user profiles.

mod api;
mod record;

#[cfg(test)]
pub(crate) mod fake;

use crate::query::{Days, SubredditName, Username};
use crate::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use std::time::Duration;

pub(crate) use api::Client;
pub(crate) use record::*;

/// Lazy, finite and non-restartable sequence of records
pub(crate) type RecordStream<'a> = BoxStream<'a, Result<RedditRecord>>;

#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,

    /// Reddit asks for a unique and descriptive user agent, e.g.
    /// `linux:reddit-tg:v0.1.0 (by /u/someone)`
    pub(crate) user_agent: String,

    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Config {
    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Source of Reddit data. Every stream yields at most the requested number
/// of records.
#[async_trait]
pub(crate) trait RedditSource: Send + Sync {
    async fn fetch_user_profile(&self, username: &Username) -> Result<UserProfile>;

    /// Submissions and then comments of the user created within the last
    /// `days` days, each newest first.
    fn fetch_user_history(&self, username: &Username, days: Days) -> RecordStream<'_>;

    /// All-time top submissions of the user
    fn fetch_user_top(&self, username: &Username, limit: usize) -> RecordStream<'_>;

    fn fetch_subreddit_hot(&self, name: &SubredditName, limit: usize) -> RecordStream<'_>;

    /// All-time top submissions of the subreddit
    fn fetch_subreddit_top(&self, name: &SubredditName, limit: usize) -> RecordStream<'_>;
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RedditError {
    #[error("{target} doesn't exist or is not accessible")]
    NotFound { target: String },

    #[error("Reddit rate limit was exceeded")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Reddit is temporarily unavailable")]
    Transient { source: crate::Error },
}

impl RedditError {
    /// Missing targets and rate limits are expected, they don't indicate
    /// a problem with the bot.
    pub(crate) fn is_user_error(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::RateLimited { .. } => true,
            Self::Transient { .. } => false,
        }
    }
}
