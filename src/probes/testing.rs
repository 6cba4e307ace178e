//! In-memory [`GitHubApi`] used by the probe unit tests.
//!
//! Responses are registered as JSON under a route key such as
//! `repos:octo` or `runs:octo/widgets:1` and decoded through the real schemas.
//! Unregistered listings answer with an empty page; an unregistered user lookup
//! answers with not-found.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::api::{
    ApiError, Commit, Event, Gist, GitHubApi, IssueComment, IssueItem, ListQuery, Organization,
    Page, Release, Repository, RepositoryType, SearchQuery, StarredRepository, UserProfile,
    UserSummary, WorkflowRun,
};
use crate::throttle::RateLimiter;

use super::{ProbeContext, ProbeSettings};

#[derive(Default)]
pub(crate) struct StubApi {
    responses: HashMap<String, Result<Value, ApiError>>,
    last_pages: HashMap<String, u32>,
    calls: Mutex<Vec<String>>,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, route: &str, body: Value) -> Self {
        self.responses.insert(route.to_string(), Ok(body));
        self
    }

    pub fn fail(mut self, route: &str, err: ApiError) -> Self {
        self.responses.insert(route.to_string(), Err(err));
        self
    }

    pub fn last_page(mut self, route: &str, last: u32) -> Self {
        self.last_pages.insert(route.to_string(), last);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn lookup<T: DeserializeOwned>(&self, route: String) -> Result<Option<T>, ApiError> {
        self.calls.lock().unwrap().push(route.clone());
        match self.responses.get(&route) {
            None => Ok(None),
            Some(Err(err)) => Err(err.clone()),
            Some(Ok(body)) => serde_json::from_value(body.clone())
                .map(Some)
                .map_err(|err| ApiError::Decode(err.to_string())),
        }
    }

    fn page<T: DeserializeOwned>(&self, route: String) -> Result<Page<T>, ApiError> {
        let last = self.last_pages.get(&route).copied();
        let items: Option<Vec<T>> = self.lookup(route)?;
        Ok(Page::new(items.unwrap_or_default()).with_last_page(last))
    }
}

#[async_trait]
impl GitHubApi for StubApi {
    async fn get_user(&self, username: &str) -> Result<UserProfile, ApiError> {
        let route = format!("user:{username}");
        self.lookup(route.clone())?.ok_or(ApiError::NotFound(route))
    }

    async fn list_user_repositories(
        &self,
        username: &str,
        _kind: RepositoryType,
        _query: &ListQuery,
    ) -> Result<Page<Repository>, ApiError> {
        self.page(format!("repos:{username}"))
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        _author: Option<&str>,
        query: &ListQuery,
    ) -> Result<Page<Commit>, ApiError> {
        self.page(format!("commits:{owner}/{repo}:{}", query.page))
    }

    async fn search_issues(&self, query: &SearchQuery) -> Result<Page<IssueItem>, ApiError> {
        self.page(format!("search:{}", query.q()))
    }

    async fn list_gists(&self, username: &str, _query: &ListQuery) -> Result<Page<Gist>, ApiError> {
        self.page(format!("gists:{username}"))
    }

    async fn list_starred(
        &self,
        username: &str,
        _query: &ListQuery,
    ) -> Result<Page<StarredRepository>, ApiError> {
        self.page(format!("starred:{username}"))
    }

    async fn list_watched(
        &self,
        username: &str,
        _query: &ListQuery,
    ) -> Result<Page<Repository>, ApiError> {
        self.page(format!("watched:{username}"))
    }

    async fn list_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Page<WorkflowRun>, ApiError> {
        self.page(format!("runs:{owner}/{repo}:{}", query.page))
    }

    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Page<Release>, ApiError> {
        self.page(format!("releases:{owner}/{repo}:{}", query.page))
    }

    async fn list_organizations(
        &self,
        username: &str,
        _query: &ListQuery,
    ) -> Result<Page<Organization>, ApiError> {
        self.page(format!("orgs:{username}"))
    }

    async fn list_following(
        &self,
        username: &str,
        _query: &ListQuery,
    ) -> Result<Page<UserSummary>, ApiError> {
        self.page(format!("following:{username}"))
    }

    async fn list_followers(
        &self,
        username: &str,
        _query: &ListQuery,
    ) -> Result<Page<UserSummary>, ApiError> {
        self.page(format!("followers:{username}"))
    }

    async fn list_public_events(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<Event>, ApiError> {
        self.page(format!("events:{username}:{}", query.page))
    }

    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        _query: &ListQuery,
    ) -> Result<Page<IssueComment>, ApiError> {
        self.page(format!("comments:{owner}/{repo}#{issue_number}"))
    }
}

/// Context for `username` over `api`, with no call spacing.
pub(crate) fn context(api: StubApi, username: &str) -> (ProbeContext, Arc<StubApi>) {
    let api = Arc::new(api);
    let ctx = ProbeContext::new(
        api.clone(),
        Arc::new(RateLimiter::unlimited()),
        username,
        ProbeSettings::default(),
    );
    (ctx, api)
}

pub(crate) fn repository(owner: &str, name: &str, created_at: &str, fork: bool) -> Value {
    json!({
        "id": 1,
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "owner": { "login": owner },
        "html_url": format!("https://github.com/{owner}/{name}"),
        "fork": fork,
        "created_at": created_at,
    })
}

pub(crate) fn issue(owner: &str, repo: &str, number: u64, created_at: &str) -> Value {
    json!({
        "number": number,
        "title": format!("Issue {number}"),
        "html_url": format!("https://github.com/{owner}/{repo}/issues/{number}"),
        "repository_url": format!("https://api.github.com/repos/{owner}/{repo}"),
        "created_at": created_at,
    })
}

pub(crate) fn event(id: &str, kind: &str, repo: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "type": kind,
        "repo": { "name": repo },
        "created_at": created_at,
    })
}
