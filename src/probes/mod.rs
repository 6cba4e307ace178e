//! Per-activity "first event" probes.
//!
//! Each probe maps a username and the [`GitHubApi`] capability onto an
//! optional record. Probes never decide what a failure means for the run:
//! they return a [`ProbeError`] and the orchestrator degrades the field.

mod activity;
mod fanout;
mod profile;
mod repositories;
mod search;
pub mod strategy;
#[cfg(test)]
pub(crate) mod testing;

pub use activity::{first_contribution, first_gist, first_public_event};
pub use fanout::{first_release, first_workflow_run};
pub use profile::{account_created, first_follower, first_following, first_organization};
pub use repositories::{first_commit, first_fork, first_repository, first_starred_repo, first_watch};
pub use search::{first_comment, first_issue, first_pull_request};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::api::{ApiError, Event, GitHubApi, ListQuery, MAX_PER_PAGE, Repository, RepositoryType};
use crate::throttle::RateLimiter;

/// Why a probe produced no record.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote error: {0}")]
    Remote(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<ApiError> for ProbeError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(resource) => ProbeError::NotFound(resource),
            ApiError::Decode(message) => ProbeError::MalformedResponse(message),
            other @ (ApiError::RateLimited { .. }
            | ApiError::Status { .. }
            | ApiError::Transport(_)) => ProbeError::Remote(other.to_string()),
        }
    }
}

/// Activity types resolved by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    AccountCreated,
    FirstRepository,
    FirstCommit,
    FirstIssue,
    FirstPullRequest,
    FirstGist,
    FirstStarredRepo,
    FirstWorkflowRun,
    FirstFork,
    FirstOrganization,
    FirstFollowing,
    FirstFollower,
    FirstPublicEvent,
    FirstRelease,
    FirstComment,
    FirstWatch,
    FirstContribution,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 17] = [
        ProbeKind::AccountCreated,
        ProbeKind::FirstRepository,
        ProbeKind::FirstCommit,
        ProbeKind::FirstIssue,
        ProbeKind::FirstPullRequest,
        ProbeKind::FirstGist,
        ProbeKind::FirstStarredRepo,
        ProbeKind::FirstWorkflowRun,
        ProbeKind::FirstFork,
        ProbeKind::FirstOrganization,
        ProbeKind::FirstFollowing,
        ProbeKind::FirstFollower,
        ProbeKind::FirstPublicEvent,
        ProbeKind::FirstRelease,
        ProbeKind::FirstComment,
        ProbeKind::FirstWatch,
        ProbeKind::FirstContribution,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProbeKind::AccountCreated => "account creation",
            ProbeKind::FirstRepository => "first repository",
            ProbeKind::FirstCommit => "first commit",
            ProbeKind::FirstIssue => "first issue",
            ProbeKind::FirstPullRequest => "first pull request",
            ProbeKind::FirstGist => "first gist",
            ProbeKind::FirstStarredRepo => "first starred repository",
            ProbeKind::FirstWorkflowRun => "first workflow run",
            ProbeKind::FirstFork => "first fork",
            ProbeKind::FirstOrganization => "first organization",
            ProbeKind::FirstFollowing => "first following",
            ProbeKind::FirstFollower => "first follower",
            ProbeKind::FirstPublicEvent => "first public event",
            ProbeKind::FirstRelease => "first release",
            ProbeKind::FirstComment => "first comment",
            ProbeKind::FirstWatch => "first watched repository",
            ProbeKind::FirstContribution => "first contribution",
        }
    }

    /// Probes that query a sub-resource once per candidate entity.
    pub fn is_fan_out(self) -> bool {
        matches!(
            self,
            ProbeKind::FirstWorkflowRun | ProbeKind::FirstRelease | ProbeKind::FirstComment
        )
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deadline budgets for the two probe shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    pub short: Duration,
    pub fan_out: Duration,
}

impl ProbeTimeouts {
    pub fn for_kind(&self, kind: ProbeKind) -> Duration {
        if kind.is_fan_out() {
            self.fan_out
        } else {
            self.short
        }
    }
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(15),
            fan_out: Duration::from_secs(30),
        }
    }
}

/// A probe and its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeDescriptor {
    pub kind: ProbeKind,
    pub timeout: Duration,
}

impl ProbeDescriptor {
    pub fn new(kind: ProbeKind, timeouts: &ProbeTimeouts) -> Self {
        Self {
            kind,
            timeout: timeouts.for_kind(kind),
        }
    }
}

/// Bounds applied by the individual strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Size of the oldest-first repository listing shared by the repository probes.
    pub repository_scan_size: u8,
    pub workflow_repository_limit: usize,
    pub release_repository_limit: usize,
    /// Page size used when locating the oldest page of a sub-resource.
    pub sub_resource_page_size: u8,
    pub gist_scan_size: u8,
    pub comment_candidates: u8,
    pub event_page_size: u8,
    pub max_event_pages: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            repository_scan_size: MAX_PER_PAGE,
            workflow_repository_limit: 10,
            release_repository_limit: 20,
            sub_resource_page_size: MAX_PER_PAGE,
            gist_scan_size: MAX_PER_PAGE,
            comment_candidates: 5,
            event_page_size: MAX_PER_PAGE,
            max_event_pages: 10,
        }
    }
}

/// Everything a probe needs for one run.
///
/// Dependencies used by several probes (the repository catalog and the public
/// event history) are resolved at most once per context, so every dependent
/// probe sees the same data.
pub struct ProbeContext {
    api: Arc<dyn GitHubApi>,
    limiter: Arc<RateLimiter>,
    username: String,
    settings: ProbeSettings,
    repositories: OnceCell<Result<Arc<Vec<Repository>>, ProbeError>>,
    events: OnceCell<Result<Arc<Vec<Event>>, ProbeError>>,
}

impl ProbeContext {
    pub fn new(
        api: Arc<dyn GitHubApi>,
        limiter: Arc<RateLimiter>,
        username: impl Into<String>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            api,
            limiter,
            username: username.into(),
            settings,
            repositories: OnceCell::new(),
            events: OnceCell::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    pub fn api(&self) -> &dyn GitHubApi {
        self.api.as_ref()
    }

    /// Waits for the rate limiter, then drives `request`.
    pub async fn call<T, F>(&self, request: F) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        self.limiter.wait().await;
        request.await.map_err(ProbeError::from)
    }

    /// Whether `owner` is the probed user (logins are case-insensitive).
    pub fn is_own(&self, owner: &str) -> bool {
        owner.eq_ignore_ascii_case(&self.username)
    }

    /// The user's repositories, oldest first.
    pub async fn repository_catalog(&self) -> Result<Arc<Vec<Repository>>, ProbeError> {
        self.repositories
            .get_or_init(|| async {
                let query = ListQuery::oldest_first(self.settings.repository_scan_size);
                self.call(self.api.list_user_repositories(
                    &self.username,
                    RepositoryType::Owner,
                    &query,
                ))
                .await
                .map(|page| Arc::new(page.items))
            })
            .await
            .clone()
    }

    /// Every public event reachable through pagination, newest first.
    pub async fn public_event_history(&self) -> Result<Arc<Vec<Event>>, ProbeError> {
        self.events
            .get_or_init(|| async {
                let page_size = self.settings.event_page_size;
                strategy::scan_until_short_page(page_size, self.settings.max_event_pages, move |page| async move {
                    let query = ListQuery::new(page_size).page(page);
                    self.call(self.api.list_public_events(&self.username, &query))
                        .await
                        .map(|listing| listing.items)
                })
                .await
                .map(Arc::new)
            })
            .await
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_api_errors_onto_probe_taxonomy() {
        assert!(matches!(
            ProbeError::from(ApiError::NotFound("/users/ghost".into())),
            ProbeError::NotFound(_)
        ));
        assert!(matches!(
            ProbeError::from(ApiError::RateLimited { retry_after: None }),
            ProbeError::Remote(_)
        ));
        assert!(matches!(
            ProbeError::from(ApiError::Decode("bad json".into())),
            ProbeError::MalformedResponse(_)
        ));
    }

    #[test]
    fn fan_out_probes_get_the_long_budget() {
        let timeouts = ProbeTimeouts::default();
        assert_eq!(
            ProbeDescriptor::new(ProbeKind::FirstRelease, &timeouts).timeout,
            Duration::from_secs(30)
        );
        assert_eq!(
            ProbeDescriptor::new(ProbeKind::FirstGist, &timeouts).timeout,
            Duration::from_secs(15)
        );
    }
}
