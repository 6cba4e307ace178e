//! Capability contract the probes need from the hosted API.
//!
//! The probes only ever talk to [`GitHubApi`], which keeps the strategies
//! testable against in-memory stubs and leaves transport concerns (auth,
//! headers, status mapping) to the concrete client.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::types::{
    Commit, Event, Gist, IssueComment, IssueItem, Organization, Page, Release, Repository,
    StarredRepository, UserProfile, UserSummary, WorkflowRun,
};

/// Largest page size the platform accepts.
pub const MAX_PER_PAGE: u8 = 100;

/// Failures surfaced by a [`GitHubApi`] implementation.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Created,
    Updated,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Created => "created",
            SortKey::Updated => "updated",
        }
    }
}

/// Repository affiliation filter for user repository listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    All,
    Owner,
    Member,
}

impl RepositoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            RepositoryType::All => "all",
            RepositoryType::Owner => "owner",
            RepositoryType::Member => "member",
        }
    }
}

/// Pagination and ordering for list endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub per_page: u8,
    pub page: u32,
    pub sort: Option<SortKey>,
    pub direction: Option<Direction>,
}

impl ListQuery {
    pub fn new(per_page: u8) -> Self {
        Self {
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            page: 1,
            sort: None,
            direction: None,
        }
    }

    /// Oldest-first ordering by creation time.
    pub fn oldest_first(per_page: u8) -> Self {
        Self::new(per_page).sorted(SortKey::Created, Direction::Asc)
    }

    pub fn sorted(mut self, sort: SortKey, direction: Direction) -> Self {
        self.sort = Some(sort);
        self.direction = Some(direction);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
        ];
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_str().to_string()));
        }
        if let Some(direction) = self.direction {
            pairs.push(("direction", direction.as_str().to_string()));
        }
        pairs
    }
}

/// Issue/pull request search built from qualifiers such as `author:octo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub qualifiers: Vec<String>,
    pub sort: SortKey,
    pub order: Direction,
    pub per_page: u8,
    pub page: u32,
}

impl SearchQuery {
    /// Oldest-first search over the given qualifiers.
    pub fn oldest_first<I, S>(qualifiers: I, per_page: u8) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            qualifiers: qualifiers.into_iter().map(Into::into).collect(),
            sort: SortKey::Created,
            order: Direction::Asc,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            page: 1,
        }
    }

    pub fn q(&self) -> String {
        self.qualifiers.join(" ")
    }

    pub fn has_qualifier(&self, qualifier: &str) -> bool {
        self.qualifiers.iter().any(|q| q == qualifier)
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.q()),
            ("sort", self.sort.as_str().to_string()),
            ("order", self.order.as_str().to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}

/// Contract implemented by the hosted API client.
///
/// Every call may fail with not-found, rate-limit, or transport conditions.
/// Implementations must be shareable across the concurrently running probes.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn get_user(&self, username: &str) -> Result<UserProfile, ApiError>;

    async fn list_user_repositories(
        &self,
        username: &str,
        kind: RepositoryType,
        query: &ListQuery,
    ) -> Result<Page<Repository>, ApiError>;

    /// Commits of `owner/repo`, newest first, optionally restricted to one author.
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        author: Option<&str>,
        query: &ListQuery,
    ) -> Result<Page<Commit>, ApiError>;

    async fn search_issues(&self, query: &SearchQuery) -> Result<Page<IssueItem>, ApiError>;

    async fn list_gists(&self, username: &str, query: &ListQuery) -> Result<Page<Gist>, ApiError>;

    async fn list_starred(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<StarredRepository>, ApiError>;

    async fn list_watched(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<Repository>, ApiError>;

    async fn list_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Page<WorkflowRun>, ApiError>;

    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        query: &ListQuery,
    ) -> Result<Page<Release>, ApiError>;

    async fn list_organizations(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<Organization>, ApiError>;

    async fn list_following(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<UserSummary>, ApiError>;

    async fn list_followers(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<UserSummary>, ApiError>;

    /// Public events of a user, newest first, within the platform's retention window.
    async fn list_public_events(
        &self,
        username: &str,
        query: &ListQuery,
    ) -> Result<Page<Event>, ApiError>;

    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        query: &ListQuery,
    ) -> Result<Page<IssueComment>, ApiError>;
}
