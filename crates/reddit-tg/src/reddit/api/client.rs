use crate::error::ErrorKind;
use crate::http::{self, HttpClientError};
use crate::prelude::*;
use crate::query::{Days, SubredditName, Username};
use crate::reddit::api::model::*;
use crate::reddit::{
    Config, RecordKind, RecordStream, RedditError, RedditRecord, RedditSource, UserProfile,
};
use crate::{err, util, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::prelude::*;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

util::def_url_base!(oauth_api, "https://oauth.reddit.com");

const ACCESS_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Reddit doesn't return more than this many records per page
const MAX_PAGE_SIZE: usize = 100;

/// Listings of a user are cut by Reddit at around a thousand records anyway
const MAX_HISTORY_RECORDS: usize = 1000;

/// The token is refreshed this long before it actually expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Client of the Reddit OAuth API that uses application-only authentication.
pub(crate) struct Client {
    http: http::Client,
    cfg: Config,
    token: tokio::sync::Mutex<Option<AccessToken>>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Everything needed to request the next page of a listing
struct ListingRequest {
    path: Vec<String>,
    query: Vec<(&'static str, String)>,
    target: String,
    after: Option<String>,
    remaining: usize,
}

impl ListingRequest {
    fn page_query(&self) -> Vec<(&'static str, String)> {
        let mut query = self.query.clone();
        query.push(("limit", self.remaining.min(MAX_PAGE_SIZE).to_string()));
        if let Some(after) = &self.after {
            query.push(("after", after.clone()));
        }
        query
    }

    /// State for the page that follows the one that brought `received`
    /// items. The listing ends on an empty page, on a missing cursor or
    /// when the limit is reached.
    fn next_page(mut self, received: usize, after: Option<String>) -> Option<Self> {
        self.remaining = self.remaining.saturating_sub(received);
        self.after = after;

        let more = received > 0 && self.after.is_some() && self.remaining > 0;
        more.then_some(self)
    }
}

impl Client {
    pub(crate) fn new(cfg: Config, http: http::Client) -> Self {
        Self {
            http,
            cfg,
            token: Default::default(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if let Some(token) = &*token {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let fresh = self
            .request_token()
            .await
            .map_err(|err| classify(err, None))?;
        let value = fresh.value.clone();
        *token = Some(fresh);

        Ok(value)
    }

    /// Forgets the token unless some other task has already replaced it
    async fn invalidate_token(&self, stale: &str) {
        let mut token = self.token.lock().await;
        if token.as_ref().is_some_and(|token| token.value == stale) {
            *token = None;
        }
    }

    async fn request_token(&self) -> Result<AccessToken> {
        debug!("Requesting a new Reddit access token");

        let response: TokenResponse = self
            .http
            .post(ACCESS_TOKEN_URL)
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .read_json()
            .await?;

        let lifetime =
            Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);

        Ok(AccessToken {
            value: response.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }

    /// Sends an authorized GET request. A rejected token is refreshed and the
    /// request is repeated once.
    async fn get_json<T>(
        &self,
        path: &[String],
        query: &[(&str, String)],
        target: &str,
    ) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let url = oauth_api(path);

        let token = self.access_token().await?;

        let send = |token: String| {
            self.http
                .get(url.clone())
                .bearer_auth(token)
                .query(&[("raw_json", "1")])
                .query(query)
                .read_json::<T>()
        };

        let result = match send(token.clone()).await {
            Err(err) if is_unauthorized(&err) => {
                warn!("Reddit rejected the access token, refreshing it");
                self.invalidate_token(&token).await;
                send(self.access_token().await?).await
            }
            result => result,
        };

        result.map_err(|err| classify(err, Some(target)))
    }

    /// Pages through a listing until `limit` items are read or the listing ends
    fn listing<T>(
        &self,
        path: Vec<String>,
        query: Vec<(&'static str, String)>,
        target: String,
        limit: usize,
    ) -> impl Stream<Item = Result<T>> + Send + '_
    where
        T: DeserializeOwned + Send + 'static,
    {
        let request = ListingRequest {
            path,
            query,
            target,
            after: None,
            remaining: limit,
        };

        stream::try_unfold(Some(request), move |request| async move {
            let Some(request) = request.filter(|request| request.remaining > 0) else {
                return Ok(None);
            };

            let listing: Listing<T> = self
                .get_json(&request.path, &request.page_query(), &request.target)
                .await?;

            let items: Vec<_> = listing
                .data
                .children
                .into_iter()
                .take(request.remaining)
                .map(|thing| thing.data)
                .collect();

            let next = request.next_page(items.len(), listing.data.after);

            Ok::<_, Error>(Some((stream::iter(items.into_iter().map(Ok::<T, Error>)), next)))
        })
        .try_flatten()
    }

    fn user_posts(
        &self,
        username: &Username,
        query: Vec<(&'static str, String)>,
        limit: usize,
    ) -> impl Stream<Item = Result<RawPost>> + Send + '_ {
        let path = user_path(username, "submitted");
        self.listing(path, query, username.to_string(), limit)
    }
}

#[async_trait]
impl RedditSource for Client {
    async fn fetch_user_profile(&self, username: &Username) -> Result<UserProfile> {
        let user: Thing<RawUser> = self
            .get_json(&user_path(username, "about"), &[], &username.to_string())
            .await?;

        Ok(user.data.into())
    }

    fn fetch_user_history(&self, username: &Username, days: Days) -> RecordStream<'_> {
        let cutoff = Utc::now() - days.to_duration();
        let newest_first = || vec![("sort", "new".to_owned())];

        let submissions = self
            .user_posts(username, newest_first(), MAX_HISTORY_RECORDS)
            .map_ok(|post| post.into_record(RecordKind::Submission));

        let comments = self
            .listing::<RawComment>(
                user_path(username, "comments"),
                newest_first(),
                username.to_string(),
                MAX_HISTORY_RECORDS,
            )
            .map_ok(RedditRecord::from);

        within_window(submissions, cutoff)
            .chain(within_window(comments, cutoff))
            .boxed()
    }

    fn fetch_user_top(&self, username: &Username, limit: usize) -> RecordStream<'_> {
        let query = vec![("sort", "top".to_owned()), ("t", "all".to_owned())];

        self.user_posts(username, query, limit)
            .map_ok(|post| post.into_record(RecordKind::Submission))
            .boxed()
    }

    fn fetch_subreddit_hot(&self, name: &SubredditName, limit: usize) -> RecordStream<'_> {
        self.listing::<RawPost>(subreddit_path(name, "hot"), vec![], name.to_string(), limit)
            .map_ok(|post| post.into_record(RecordKind::ListingEntry))
            .boxed()
    }

    fn fetch_subreddit_top(&self, name: &SubredditName, limit: usize) -> RecordStream<'_> {
        let query = vec![("t", "all".to_owned())];

        self.listing::<RawPost>(subreddit_path(name, "top"), query, name.to_string(), limit)
            .map_ok(|post| post.into_record(RecordKind::ListingEntry))
            .boxed()
    }
}

/// Cuts a newest-first stream at the first record created before `cutoff`.
/// Nothing past that record is requested.
fn within_window<'a>(
    records: impl Stream<Item = Result<RedditRecord>> + Send + 'a,
    cutoff: DateTime<Utc>,
) -> impl Stream<Item = Result<RedditRecord>> + Send + 'a {
    records.try_take_while(move |record| future::ok(record.created >= cutoff))
}

fn user_path(username: &Username, endpoint: &str) -> Vec<String> {
    ["user", username.as_str(), endpoint].map(str::to_owned).into()
}

fn subreddit_path(name: &SubredditName, endpoint: &str) -> Vec<String> {
    ["r", name.as_str(), endpoint].map(str::to_owned).into()
}

fn is_unauthorized(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::HttpClient {
            source: HttpClientError::BadResponseStatusCode {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        }
    )
}

/// Translates HTTP level failures into the ones the bot reports to the users.
/// Failures that point to a bug (unexpected statuses, bad JSON) are kept as is.
///
/// `target` is the user or subreddit the request is about. Requests to the
/// token endpoint have none, so a 4xx there (other than 429) means the
/// credentials are misconfigured.
fn classify(err: Error, target: Option<&str>) -> Error {
    let ErrorKind::HttpClient { source } = err.kind() else {
        return err;
    };

    let transient = || RedditError::Transient {
        source: err.clone(),
    };

    let not_found = || {
        target.map(|target| RedditError::NotFound {
            target: target.to_owned(),
        })
    };

    let reddit_err = match source {
        HttpClientError::BadResponseStatusCode {
            status,
            retry_after,
            ..
        } => match *status {
            // Reddit redirects to the search page when a subreddit doesn't exist.
            // Private, quarantined and suspended targets respond with 403.
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => not_found(),
            status if status.is_redirection() => not_found(),
            StatusCode::TOO_MANY_REQUESTS => Some(RedditError::RateLimited {
                retry_after: *retry_after,
            }),
            StatusCode::UNAUTHORIZED => target.map(|_| transient()),
            status if status.is_server_error() => Some(transient()),
            _ => None,
        },
        HttpClientError::SendRequest { .. } | HttpClientError::ReadResponse { .. } => {
            Some(transient())
        }
        HttpClientError::UnexpectedResponseJsonShape { .. } => None,
    };

    let Some(reddit_err) = reddit_err else {
        return err;
    };

    err!(ErrorKind::Reddit { source: reddit_err })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::fatal;
    use crate::reddit::fake::record;
    use assert_matches::assert_matches;
    use expect_test::expect;

    fn status_err(status: StatusCode) -> Error {
        err!(HttpClientError::BadResponseStatusCode {
            status,
            retry_after: Some(Duration::from_secs(30)),
            body: String::new(),
        })
    }

    fn reddit_err(err: &Error) -> &RedditError {
        match err.kind() {
            ErrorKind::Reddit { source } => source,
            kind => panic!("Expected a reddit error, got {kind:?}"),
        }
    }

    #[test]
    fn missing_targets() {
        for status in [
            StatusCode::NOT_FOUND,
            StatusCode::FORBIDDEN,
            StatusCode::FOUND,
            StatusCode::MOVED_PERMANENTLY,
        ] {
            let err = classify(status_err(status), Some("r/ghost"));
            assert_matches!(
                reddit_err(&err),
                RedditError::NotFound { target } if target == "r/ghost",
                "{status}"
            );
            assert!(err.is_user_error());
        }
    }

    #[test]
    fn rate_limit_keeps_the_delay() {
        let err = classify(status_err(StatusCode::TOO_MANY_REQUESTS), Some("u/spez"));
        assert_matches!(
            reddit_err(&err),
            RedditError::RateLimited { retry_after: Some(delay) } if delay.as_secs() == 30
        );
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::UNAUTHORIZED,
        ] {
            let err = classify(status_err(status), Some("u/spez"));
            assert_matches!(reddit_err(&err), RedditError::Transient { .. }, "{status}");
            assert!(!err.is_user_error());
        }
    }

    #[test]
    fn unexpected_statuses_are_kept() {
        let err = classify(status_err(StatusCode::BAD_REQUEST), Some("u/spez"));
        assert_matches!(err.kind(), ErrorKind::HttpClient { .. });
    }

    #[test]
    fn token_endpoint_failures() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let send_err = err!(HttpClientError::SendRequest {
            source: reqwest_middleware::Error::middleware(io_err),
        });

        let err = classify(send_err, None);
        assert_matches!(reddit_err(&err), RedditError::Transient { .. });

        let err = classify(status_err(StatusCode::SERVICE_UNAVAILABLE), None);
        assert_matches!(reddit_err(&err), RedditError::Transient { .. });

        let err = classify(status_err(StatusCode::TOO_MANY_REQUESTS), None);
        assert_matches!(
            reddit_err(&err),
            RedditError::RateLimited { retry_after: Some(delay) } if delay.as_secs() == 30
        );
        assert!(err.is_user_error());

        // Bad credentials are not something the user can wait out
        for status in [StatusCode::UNAUTHORIZED, StatusCode::NOT_FOUND] {
            let err = classify(status_err(status), None);
            assert_matches!(err.kind(), ErrorKind::HttpClient { .. }, "{status}");
        }
    }

    fn listing_request(remaining: usize) -> ListingRequest {
        ListingRequest {
            path: vec!["r".to_owned(), "rust".to_owned(), "hot".to_owned()],
            query: vec![("t", "all".to_owned())],
            target: "r/rust".to_owned(),
            after: None,
            remaining,
        }
    }

    #[test]
    fn pagination_is_capped_by_the_limit() {
        let request = listing_request(250);
        expect![[r#"[("t", "all"), ("limit", "100")]"#]]
            .assert_eq(&format!("{:?}", request.page_query()));

        let request = request.next_page(100, Some("t3_a".to_owned())).unwrap();
        assert_eq!(request.remaining, 150);
        expect![[r#"[("t", "all"), ("limit", "100"), ("after", "t3_a")]"#]]
            .assert_eq(&format!("{:?}", request.page_query()));

        let request = request.next_page(100, Some("t3_b".to_owned())).unwrap();
        expect![[r#"[("t", "all"), ("limit", "50"), ("after", "t3_b")]"#]]
            .assert_eq(&format!("{:?}", request.page_query()));

        assert!(request.next_page(50, Some("t3_c".to_owned())).is_none());
    }

    #[test]
    fn pagination_stops_when_the_listing_ends() {
        // A short page with a cursor still continues
        let request = listing_request(250)
            .next_page(37, Some("t3_a".to_owned()))
            .unwrap();
        assert_eq!(request.remaining, 213);
        assert_eq!(request.after.as_deref(), Some("t3_a"));

        assert!(listing_request(250).next_page(37, None).is_none());
        assert!(listing_request(250).next_page(0, Some("t3_a".to_owned())).is_none());
    }

    #[tokio::test]
    async fn window_cuts_at_the_first_old_record() {
        let now = Utc::now();
        let dated = |title: &str, age_days: i64| RedditRecord {
            created: now - chrono::Duration::days(age_days),
            ..record(title)
        };

        let records = vec![
            Ok(dated("today", 0)),
            Ok(dated("last week", 7)),
            Ok(dated("last month", 30)),
            Ok(dated("reposted yesterday", 1)),
            Err(fatal!("the stream must not be polled this far")),
        ];

        let cutoff = now - chrono::Duration::days(10);
        let records: Vec<_> = within_window(stream::iter(records), cutoff)
            .try_collect()
            .await
            .unwrap();

        let titles: Vec<_> = records.iter().map(|record| record.title.as_str()).collect();
        assert_eq!(titles, ["today", "last week"]);
    }

    #[test]
    fn urls() {
        let username: Username = "u/spez".parse().unwrap();
        let url = oauth_api(user_path(&username, "submitted"));
        assert_eq!(url.as_str(), "https://oauth.reddit.com/user/spez/submitted");

        let name: SubredditName = "rust".parse().unwrap();
        let url = oauth_api(subreddit_path(&name, "hot"));
        assert_eq!(url.as_str(), "https://oauth.reddit.com/r/rust/hot");
    }

    #[test_log::test(tokio::test)]
    #[ignore]
    async fn manual_sandbox() {
        let _ = dotenvy::dotenv();

        let cfg: Config = crate::config::from_env("REDDIT_").unwrap();
        let http = crate::http::create_client(&cfg).unwrap();
        let client = Client::new(cfg, http);

        let name: SubredditName = "rust".parse().unwrap();
        let records: Vec<_> = client.fetch_subreddit_hot(&name, 3).try_collect().await.unwrap();

        eprintln!("{records:#?}");
    }
}
