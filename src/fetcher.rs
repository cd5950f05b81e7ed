//! HTTP JSON fetching with connection pooling, retry logic and status mapping

use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, USER_AGENT,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::constants::{HTTP_POOL_MAX_IDLE_PER_HOST, http, retry};
use crate::error::AppError;

/// Headers sent with every request. Some sports APIs reject clients that
/// do not look like a browser.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(USER_AGENT, HeaderValue::from_static(http::BROWSER_USER_AGENT));
    headers
}

/// Creates an HTTP client with connection pooling, browser-like default
/// headers and the given request timeout.
///
/// # Returns
/// * `Result<Client, reqwest::Error>` - A configured reqwest HTTP client or error
pub fn create_http_client_with_timeout(timeout_seconds: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE_PER_HOST)
        .default_headers(browser_headers())
        .build()
}

/// How many times to retry a transient failure, and how long to wait at first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry::MAX_RETRIES,
            initial_backoff: Duration::from_millis(retry::INITIAL_BACKOFF_MS),
        }
    }
}

/// Fetches `url` and parses the body as JSON using the default retry policy.
pub async fn fetch_json(client: &Client, url: &str) -> Result<Value, AppError> {
    fetch_json_with_policy(client, url, RetryPolicy::default()).await
}

/// Fetches `url` and parses the body as JSON.
///
/// Retries 429 and 5xx responses as well as timeouts and connection errors,
/// doubling the backoff each attempt. A `Retry-After` header (in seconds)
/// replaces the backoff for that attempt.
///
/// # Returns
/// * `Ok(Value)` - Parsed JSON body
/// * `Err(AppError)` - Status-specific API error, network error or malformed body
#[instrument(skip(client, policy))]
pub async fn fetch_json_with_policy(
    client: &Client,
    url: &str,
    policy: RetryPolicy,
) -> Result<Value, AppError> {
    info!("Fetching data from URL: {url}");

    let mut attempt = 0u32;
    let mut backoff = policy.initial_backoff;
    loop {
        let (error, retry_after) = match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("Response status: {status}");

                if status.is_success() {
                    let response_text = response.text().await.map_err(|e| {
                        error!("Failed to read response text from URL {}: {}", url, e);
                        AppError::ApiFetch(e)
                    })?;
                    debug!("Response length: {} bytes", response_text.len());
                    return parse_body(&response_text, url);
                }

                let status_code = status.as_u16();
                let reason = status.canonical_reason().unwrap_or("Unknown error");
                (map_status(status_code, reason, url), retry_after_header(&response))
            }
            Err(e) => (map_request_error(e, url), None),
        };

        if !error.is_retryable() || attempt >= policy.max_retries {
            error!("Request failed for URL {}: {}", url, error);
            return Err(error);
        }

        let wait = retry_after.unwrap_or(backoff);
        warn!(
            "{}. Retrying in {:?} (attempt {}/{})",
            error,
            wait,
            attempt + 1,
            policy.max_retries
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
        backoff = backoff.saturating_mul(2);
    }
}

/// Reads a `Retry-After` header given in seconds
fn retry_after_header(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn map_request_error(e: reqwest::Error, url: &str) -> AppError {
    if e.is_timeout() {
        AppError::network_timeout(url)
    } else if e.is_connect() {
        AppError::network_connection(url, e.to_string())
    } else {
        AppError::ApiFetch(e)
    }
}

/// Maps a non-success HTTP status to the matching `AppError` variant
fn map_status(status_code: u16, reason: &str, url: &str) -> AppError {
    match status_code {
        404 => AppError::api_not_found(url),
        429 => AppError::api_rate_limit(reason, url),
        400..=499 => AppError::api_client_error(status_code, reason, url),
        502 | 503 => AppError::api_service_unavailable(status_code, reason, url),
        _ => AppError::api_server_error(status_code, reason, url),
    }
}

fn parse_body(response_text: &str, url: &str) -> Result<Value, AppError> {
    let trimmed = response_text.trim_start();
    if trimmed.is_empty() {
        return Err(AppError::api_no_data("Response body is empty", url));
    }
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        return Err(AppError::api_malformed_json(
            "Response is not valid JSON",
            url,
        ));
    }

    serde_json::from_str::<Value>(response_text).map_err(|e| {
        error!("Failed to parse API response: {} (URL: {})", e, url);
        AppError::api_malformed_json(e.to_string(), url)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
        }
    }

    fn test_client() -> Client {
        create_http_client_with_timeout(5).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let url = "http://example.test/x";
        assert!(matches!(
            map_status(404, "Not Found", url),
            AppError::ApiNotFound { .. }
        ));
        assert!(matches!(
            map_status(429, "Too Many Requests", url),
            AppError::ApiRateLimit { .. }
        ));
        assert!(matches!(
            map_status(418, "I'm a teapot", url),
            AppError::ApiClientError { status: 418, .. }
        ));
        assert!(matches!(
            map_status(503, "Service Unavailable", url),
            AppError::ApiServiceUnavailable { status: 503, .. }
        ));
        assert!(matches!(
            map_status(500, "Internal Server Error", url),
            AppError::ApiServerError { status: 500, .. }
        ));
    }

    #[test]
    fn test_parse_body_errors() {
        let url = "http://example.test/x";
        assert!(matches!(parse_body("  ", url), Err(AppError::ApiNoData { .. })));
        assert!(matches!(
            parse_body("<html></html>", url),
            Err(AppError::ApiMalformedJson { .. })
        ));
        assert!(matches!(
            parse_body("{\"events\": [", url),
            Err(AppError::ApiMalformedJson { .. })
        ));
        assert_eq!(parse_body("[1, 2]", url).unwrap(), json!([1, 2]));
    }

    #[tokio::test]
    async fn test_fetch_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scoreboard"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"events": [{"isLive": true}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/scoreboard", server.uri());
        let value = fetch_json(&test_client(), &url).await.unwrap();
        assert_eq!(value["events"][0]["isLive"], json!(true));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let err = fetch_json_with_policy(&test_client(), &url, fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ApiNotFound { .. }));
    }

    #[tokio::test]
    async fn test_server_error_retried_then_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let url = format!("{}/flaky", server.uri());
        let err = fetch_json_with_policy(&test_client(), &url, fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ApiServerError { status: 500, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_retry_after_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/limited", server.uri());
        let value = fetch_json_with_policy(&test_client(), &url, fast_policy())
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/bad", server.uri());
        let err = fetch_json_with_policy(&test_client(), &url, fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ApiClientError { status: 400, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unavailable_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/warming"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/warming"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/warming", server.uri());
        let value = fetch_json_with_policy(&test_client(), &url, fast_policy())
            .await
            .unwrap();
        assert_eq!(value, json!([]));
    }

    #[tokio::test]
    async fn test_requests_carry_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/headers"))
            .and(header("cache-control", "no-cache"))
            .and(header("accept", "*/*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/headers", server.uri());
        let value = fetch_json(&test_client(), &url).await.unwrap();
        assert_eq!(value, json!({"ok": true}));

        let requests = server.received_requests().await.unwrap();
        let sent = &requests[0].headers;
        assert_eq!(sent.get("accept-language").unwrap(), "en-US,en;q=0.9");
        assert_eq!(sent.get("user-agent").unwrap(), http::BROWSER_USER_AGENT);
    }
}
