use crate::observability::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION};
use crate::prelude::*;
use crate::{err, err_ctx, reddit, Result};
use async_trait::async_trait;
use easy_ext::ext;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use reqwest_middleware::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub(crate) mod prelude {
    pub(crate) use super::RequestBuilderExt as _;
}

pub(crate) type Client = reqwest_middleware::ClientWithMiddleware;

/// Creates the HTTP client used to talk to Reddit. Every request made with it
/// carries the configured `User-Agent` and has a bounded timeout. Redirects are
/// not followed: Reddit answers with a redirect to the search page for
/// nonexistent subreddits.
pub(crate) fn create_client(cfg: &reddit::Config) -> Result<Client> {
    let client = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(cfg.request_timeout())
        .connect_timeout(cfg.request_timeout())
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .fatal_ctx(|| "Failed to build the HTTP client")?;

    Ok(reqwest_middleware::ClientBuilder::new(client)
        .with(ObservingMiddleware)
        .build())
}

struct ObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for ObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut task_local_extensions::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let host = request.url().host_str().unwrap_or("{unknown}").to_owned();

        let span = info_span!(
            "request",
            version = ?request.version(),
            method = %request.method(),
            // Query strings are left out, they may be long and are not interesting
            url = %format_args!("{}{}", host, request.url().path()),
        );

        async move {
            let (result, duration) = next.run(request, extensions).with_duration().await;

            let status = match &result {
                Ok(response) => response.status().as_u16().to_string(),
                Err(_) => "{fatal}".to_owned(),
            };

            let labels = [("host", host), ("status", status)];
            metrics::register_counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);
            metrics::register_histogram!(HTTP_REQUEST_DURATION, &labels).record(duration);

            let duration = tracing_duration(duration);

            match &result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!(duration, %status, "Network request succeeded");
                    } else {
                        warn!(duration, %status, "Network request failed (error status)");
                    }
                }
                Err(err) => {
                    error!(duration, err = tracing_err(err), "Network request failed");
                }
            };

            result
        }
        .instrument(span)
        .await
    }
}

#[ext(RequestBuilderExt)]
#[async_trait]
pub(crate) impl RequestBuilder {
    async fn read_json<Res: DeserializeOwned>(self) -> Result<Res> {
        let bytes = self
            .try_send()
            .await?
            .bytes()
            .await
            .map_err(err_ctx!(HttpClientError::ReadResponse))?;

        serde_json::from_slice(&bytes).map_err(|err| {
            match std::str::from_utf8(&bytes) {
                Ok(response_body) => warn!(
                    response_body = truncate_body(response_body),
                    "Bad JSON response"
                ),
                Err(utf8_decode_err) => warn!(
                    response_len = bytes.len(),
                    ?utf8_decode_err,
                    "Bad JSON response"
                ),
            };
            err!(HttpClientError::UnexpectedResponseJsonShape { source: err })
        })
    }

    /// Better version of [`RequestBuilder::send`] that returns an error
    /// if the response status code is not successful.
    async fn try_send(self) -> Result<Response> {
        let response = self
            .send()
            .await
            .map_err(err_ctx!(HttpClientError::SendRequest))?;

        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = retry_after(response.headers());

        let body = match response.text().await {
            Ok(body) => truncate_body(&body),
            Err(err) => format!(
                "Could not collect the error response body text: {}",
                err.display_chain()
            ),
        };

        Err(err!(HttpClientError::BadResponseStatusCode {
            status,
            retry_after,
            body,
        }))
    }
}

/// Reads the delay the server asks us to wait for. The standard `Retry-After`
/// header is preferred, then Reddit's `x-ratelimit-reset`. Both are in seconds.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    [RETRY_AFTER.as_str(), "x-ratelimit-reset"]
        .into_iter()
        .find_map(|name| headers.get(name)?.to_str().ok()?.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Error bodies may be whole HTML pages
fn truncate_body(body: &str) -> String {
    body.truncate_chars(500)
}

/// Errors at the layer of the HTTP API
#[derive(Debug, thiserror::Error)]
pub(crate) enum HttpClientError {
    #[error("Failed to send an http request")]
    SendRequest { source: reqwest_middleware::Error },

    #[error("Failed to read http response")]
    ReadResponse { source: reqwest::Error },

    #[error("HTTP request has failed (http status code: {status}):\n{body}")]
    BadResponseStatusCode {
        status: StatusCode,
        retry_after: Option<Duration>,
        body: String,
    },

    #[error("Received an unexpected response JSON object")]
    UnexpectedResponseJsonShape { source: serde_json::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(name, value)| {
                (
                    reqwest::header::HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                )
            })
            .collect()
    }

    #[test]
    fn retry_after_prefers_standard_header() {
        let actual = retry_after(&headers(&[
            ("retry-after", "7"),
            ("x-ratelimit-reset", "300"),
        ]));
        assert_eq!(actual, Some(Duration::from_secs(7)));
    }

    #[test]
    fn retry_after_falls_back_to_reddit_header() {
        let actual = retry_after(&headers(&[("x-ratelimit-reset", "42")]));
        assert_eq!(actual, Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_ignores_garbage() {
        assert_eq!(retry_after(&headers(&[("retry-after", "soon")])), None);
        assert_eq!(retry_after(&headers(&[("retry-after", "-1")])), None);
        assert_eq!(retry_after(&HeaderMap::new()), None);
    }
}
