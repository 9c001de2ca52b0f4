//! In-memory [`RedditSource`] for tests

use crate::query::{Days, SubredditName, Username};
use crate::reddit::{
    RecordKind, RecordStream, RedditError, RedditRecord, RedditSource, UserProfile,
};
use crate::{err, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::prelude::*;
use parking_lot::Mutex;

/// Creates a fresh listing entry with the given title
pub(crate) fn record(title: &str) -> RedditRecord {
    RedditRecord {
        kind: RecordKind::ListingEntry,
        author: "ferris".to_owned(),
        subreddit: "rust".to_owned(),
        title: title.to_owned(),
        body: String::new(),
        score: 1,
        created: Utc::now() - Duration::hours(1),
        permalink: format!("/r/rust/comments/{}/", title.len()),
        num_comments: Some(0),
        removal: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    UserProfile(String),
    UserHistory(String, u16),
    UserTop(String, usize),
    SubredditHot(String, usize),
    SubredditTop(String, usize),
}

/// Returns the same records for every query. Targets named `ghost_*` don't
/// exist.
#[derive(Default)]
pub(crate) struct FakeReddit {
    pub(crate) records: Vec<RedditRecord>,
    pub(crate) profile: Option<UserProfile>,
    pub(crate) calls: Mutex<Vec<Call>>,
}

impl FakeReddit {
    pub(crate) fn with_records(records: Vec<RedditRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn stream(&self, target: &str, limit: usize) -> RecordStream<'_> {
        if target.contains("ghost_") {
            let err = err!(RedditError::NotFound {
                target: target.to_owned()
            });
            return stream::once(future::err(err)).boxed();
        }
        stream::iter(self.records.iter().take(limit).cloned().map(Ok)).boxed()
    }
}

#[async_trait]
impl RedditSource for FakeReddit {
    async fn fetch_user_profile(&self, username: &Username) -> Result<UserProfile> {
        self.calls
            .lock()
            .push(Call::UserProfile(username.as_str().to_owned()));

        if username.as_str().starts_with("ghost_") {
            return Err(err!(RedditError::NotFound {
                target: username.to_string()
            }));
        }

        Ok(self.profile.clone().unwrap_or_else(|| UserProfile {
            name: username.as_str().to_owned(),
            created: Some(Utc::now() - Duration::days(800)),
            link_karma: 10,
            comment_karma: 20,
            is_suspended: false,
        }))
    }

    fn fetch_user_history(&self, username: &Username, days: Days) -> RecordStream<'_> {
        self.calls
            .lock()
            .push(Call::UserHistory(username.as_str().to_owned(), days.get()));
        self.stream(&username.to_string(), usize::MAX)
    }

    fn fetch_user_top(&self, username: &Username, limit: usize) -> RecordStream<'_> {
        self.calls
            .lock()
            .push(Call::UserTop(username.as_str().to_owned(), limit));
        self.stream(&username.to_string(), limit)
    }

    fn fetch_subreddit_hot(&self, name: &SubredditName, limit: usize) -> RecordStream<'_> {
        self.calls
            .lock()
            .push(Call::SubredditHot(name.as_str().to_owned(), limit));
        self.stream(&name.to_string(), limit)
    }

    fn fetch_subreddit_top(&self, name: &SubredditName, limit: usize) -> RecordStream<'_> {
        self.calls
            .lock()
            .push(Call::SubredditTop(name.as_str().to_owned(), limit));
        self.stream(&name.to_string(), limit)
    }
}
