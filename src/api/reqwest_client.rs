//! Reqwest-based implementation of the [`GitHubApi`] trait.
//!
//! Thin adapter around `reqwest::Client`: it attaches the authentication and
//! media-type headers, maps failure statuses onto [`ApiError`], decodes bodies
//! into the typed schemas, and lifts the `Link` header into [`Page::last_page`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use http::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, LINK, RETRY_AFTER, USER_AGENT};
use http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::client::{ApiError, GitHubApi, ListQuery, RepositoryType, SearchQuery};
use super::types::{
    Commit, Event, Gist, IssueComment, IssueItem, Organization, Page, Release, Repository,
    SearchResults, StarredRepository, UserProfile, UserSummary, WorkflowRun, WorkflowRuns,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";
const ERROR_SNIPPET_LIMIT: usize = 200;

static API_VERSION_HEADER: HeaderName = HeaderName::from_static("x-github-api-version");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

static LAST_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="last""#).expect("invalid link regex"));

/// Reqwest-backed client for the GitHub REST and search APIs.
pub struct ReqwestGitHubClient {
    client: Client,
    base_url: Url,
}

impl ReqwestGitHubClient {
    /// Creates a client that authenticates every request with `token`.
    pub fn new(
        base_url: Url,
        token: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        headers.insert(API_VERSION_HEADER.clone(), HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|_| ApiError::Transport("invalid user-agent header".into()))?,
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::Transport("invalid authorization header".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Wrap an existing reqwest client. Authentication and default headers are
    /// the caller's responsibility.
    pub fn from_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("unusable base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        pairs: &[(&'static str, String)],
        accept: &'static str,
    ) -> Result<(T, Option<u32>), ApiError> {
        let url = self.endpoint(segments)?;
        log::debug!("-> GET {url}");

        let started = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .query(pairs)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        log::debug!(
            "<- GET {} -> {} ({:.2}s)",
            url,
            status.as_u16(),
            started.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            return Err(classify_failure(status, &headers, &body, url.path()));
        }

        let value = serde_json::from_slice(&body)
            .map_err(|err| ApiError::Decode(format!("{}: {err}", url.path())))?;
        Ok((value, last_page(&headers)))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        pairs: &[(&'static str, String)],
    ) -> Result<Page<T>, ApiError> {
        let (items, last) = self.get::<Vec<T>>(segments, pairs, JSON_MEDIA_TYPE).await?;
        Ok(Page::new(items).with_last_page(last))
    }
}

#[async_trait]
impl GitHubApi for ReqwestGitHubClient {
    async fn get_user(&self, username: &str) -> Result<UserProfile, ApiError> {
        let (user, _) = self.get(&["users", username], &[], JSON_MEDIA_TYPE).await?;
        Ok(user)
    }

    async fn list_user_repositories(
        &self,
        username: &str,
        kind: RepositoryType,
        query: &ListQuery,
    ) -> Result<Page<Repository>, ApiError> {
        let mut pairs = query.to_pairs();
        pairs.push(("type", kind.as_str().to_string()));
        self.get_page(&["users", username, "repos"], &pairs).await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        author: Option<&str>,
        query: &ListQuery,
    ) -> Result<Page<Commit>, ApiError> {
        let mut pairs = query.to_pairs();
        if let Some(author) = author {
            pairs.push(("author", author.to_string()));
        }
        self.get_page(&["repos", owner, repo, "commits"], &pairs).await
    }

    async fn search_issues(&self, query: &SearchQuery) -> Result<Page<IssueItem>, ApiError> {
        let (results, last) = self
            .get::<SearchResults<IssueItem>>(&["search", "issues"], &query.to_pairs(), JSON_MEDIA_TYPE)
            .await?;
        if results.incomplete_results {
            log::debug!("search '{}' returned incomplete results", query.q());
        }
        Ok(Page::new(results.items).with_last_page(last))
    }

    async fn list_gists(&self, username: &str, query: &ListQuery) -> Result<Page<Gist>, ApiError> {
        self.get_page(&["users", username, "gists"], &query.to_pairs())
            .await
    }

    async fn list_starred(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<StarredRepository>, ApiError> {
        let (items, last) = self
            .get::<Vec<StarredRepository>>(
                &["users", username, "starred"],
                &query.to_pairs(),
                STAR_MEDIA_TYPE,
            )
            .await?;
        Ok(Page::new(items).with_last_page(last))
    }

    async fn list_watched(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<Repository>, ApiError> {
        self.get_page(&["users", username, "subscriptions"], &query.to_pairs())
            .await
    }

    async fn list_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Page<WorkflowRun>, ApiError> {
        let (runs, last) = self
            .get::<WorkflowRuns>(
                &["repos", owner, repo, "actions", "runs"],
                &query.to_pairs(),
                JSON_MEDIA_TYPE,
            )
            .await?;
        Ok(Page::new(runs.workflow_runs).with_last_page(last))
    }

    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Page<Release>, ApiError> {
        self.get_page(&["repos", owner, repo, "releases"], &query.to_pairs())
            .await
    }

    async fn list_organizations(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<Organization>, ApiError> {
        self.get_page(&["users", username, "orgs"], &query.to_pairs())
            .await
    }

    async fn list_following(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<UserSummary>, ApiError> {
        self.get_page(&["users", username, "following"], &query.to_pairs())
            .await
    }

    async fn list_followers(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<UserSummary>, ApiError> {
        self.get_page(&["users", username, "followers"], &query.to_pairs())
            .await
    }

    async fn list_public_events(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<Event>, ApiError> {
        self.get_page(&["users", username, "events", "public"], &query.to_pairs())
            .await
    }

    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        query: &ListQuery,
    ) -> Result<Page<IssueComment>, ApiError> {
        let number = issue_number.to_string();
        self.get_page(&["repos", owner, repo, "issues", number.as_str(), "comments"], &query.to_pairs())
            .await
    }
}

/// Maps a non-success response onto the client error taxonomy.
fn classify_failure(status: StatusCode, headers: &HeaderMap, body: &[u8], resource: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(resource.to_string());
    }

    let quota_exhausted = headers
        .get(&RATELIMIT_REMAINING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0");

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (quota_exhausted || headers.contains_key(RETRY_AFTER)))
    {
        return ApiError::RateLimited {
            retry_after: retry_after(headers),
        };
    }

    ApiError::Status {
        status: status.as_u16(),
        message: error_message(body),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(seconds) = headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_secs(seconds));
    }

    let reset = headers
        .get(&RATELIMIT_RESET)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()?;
    Some(Duration::from_secs(
        reset.saturating_sub(Utc::now().timestamp()).max(0) as u64,
    ))
}

fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body)
        && let Some(message) = value.get("message").and_then(|m| m.as_str())
    {
        return message.to_string();
    }
    String::from_utf8_lossy(body)
        .chars()
        .take(ERROR_SNIPPET_LIMIT)
        .collect()
}

/// Page number of the `rel="last"` entry of a `Link` header.
fn last_page(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    let caps = LAST_LINK_RE.captures(link)?;
    let url = Url::parse(caps.get(1)?.as_str()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ReqwestGitHubClient {
        ReqwestGitHubClient::new(
            Url::parse(DEFAULT_API_URL).unwrap(),
            "token",
            "first-everything-tests",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn parses_last_page_from_link_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/repositories/1/commits?per_page=1&page=2>; rel=\"next\", \
                 <https://api.github.com/repositories/1/commits?per_page=1&page=417>; rel=\"last\"",
            ),
        );
        assert_eq!(last_page(&headers), Some(417));
    }

    #[test]
    fn missing_last_link_yields_none() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("<https://api.github.com/x?page=1>; rel=\"prev\""),
        );
        assert_eq!(last_page(&headers), None);
        assert_eq!(last_page(&HeaderMap::new()), None);
    }

    #[test]
    fn classifies_not_found() {
        let err = classify_failure(StatusCode::NOT_FOUND, &HeaderMap::new(), b"{}", "/users/ghost");
        assert!(matches!(err, ApiError::NotFound(resource) if resource == "/users/ghost"));
    }

    #[test]
    fn classifies_exhausted_quota_as_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from_static("0"));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("42"));
        let err = classify_failure(StatusCode::FORBIDDEN, &headers, b"{}", "/users/octo");
        assert!(matches!(
            err,
            ApiError::RateLimited { retry_after: Some(delay) } if delay == Duration::from_secs(42)
        ));
    }

    #[test]
    fn forbidden_without_quota_signal_is_a_status_error() {
        let err = classify_failure(
            StatusCode::FORBIDDEN,
            &HeaderMap::new(),
            br#"{"message":"Resource not accessible by integration"}"#,
            "/repos/octo/private/actions/runs",
        );
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Resource not accessible by integration");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn endpoint_escapes_segments() {
        let url = client().endpoint(&["repos", "octo", "my repo", "releases"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/octo/my%20repo/releases");
    }
}
