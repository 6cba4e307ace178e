//! Result aggregate handed to the reporting layer.
//!
//! Every field is independent and optional. Serialisation always emits every
//! key (absent fields become `null`) so consumers see a stable shape no matter
//! how many probes came back empty.

mod summary;

pub use summary::render_summary;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// When a record's time is known only indirectly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproximationBasis {
    /// The target repository's own creation time.
    RepositoryCreatedAt,
}

/// Timestamp tagged with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "precision", rename_all = "snake_case")]
pub enum Timestamp {
    Exact {
        at: DateTime<Utc>,
    },
    Approximate {
        at: DateTime<Utc>,
        basis: ApproximationBasis,
    },
}

impl Timestamp {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Timestamp::Exact { at } | Timestamp::Approximate { at, .. } => *at,
        }
    }

    pub fn is_approximate(&self) -> bool {
        matches!(self, Timestamp::Approximate { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub login: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub sha: String,
    pub repository: String,
    pub message: String,
    pub url: String,
    pub committed_at: DateTime<Utc>,
}

/// Issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    pub number: u64,
    pub title: String,
    pub repository: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GistRecord {
    pub id: String,
    pub description: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarredRepositoryRecord {
    pub full_name: String,
    pub url: String,
    pub starred_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedRepositoryRecord {
    pub full_name: String,
    pub url: String,
    pub watched_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunRecord {
    pub run_id: u64,
    pub name: String,
    pub repository: String,
    pub event: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRecord {
    pub login: String,
    pub description: Option<String>,
}

/// Followed or following account. The platform exposes no follow time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLinkRecord {
    pub login: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub event_type: String,
    pub repository: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub tag_name: String,
    pub name: Option<String>,
    pub repository: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub comment_id: u64,
    pub issue_number: u64,
    pub repository: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    Push,
    PullRequest,
    Issue,
    Fork,
}

impl ContributionKind {
    /// Maps a public event type onto a contribution kind.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "PushEvent" => Some(Self::Push),
            "PullRequestEvent" => Some(Self::PullRequest),
            "IssuesEvent" => Some(Self::Issue),
            "ForkEvent" => Some(Self::Fork),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Push => "Push",
            Self::PullRequest => "PR",
            Self::Issue => "Issue",
            Self::Fork => "Fork",
        }
    }
}

/// Where a contribution record was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionSource {
    PublicEvents,
    PullRequestSearch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRecord {
    pub kind: ContributionKind,
    pub repository: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub source: ContributionSource,
}

/// The merged "first everything" result for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstEverythingReport {
    pub username: String,
    pub account_created: Option<AccountRecord>,
    pub first_repository: Option<RepositoryRecord>,
    pub first_commit: Option<CommitRecord>,
    pub first_issue: Option<IssueRecord>,
    pub first_pull_request: Option<IssueRecord>,
    pub first_gist: Option<GistRecord>,
    pub first_starred_repo: Option<StarredRepositoryRecord>,
    pub first_workflow_run: Option<WorkflowRunRecord>,
    pub first_fork: Option<RepositoryRecord>,
    pub first_organization: Option<OrganizationRecord>,
    pub first_following: Option<AccountLinkRecord>,
    pub first_follower: Option<AccountLinkRecord>,
    pub first_public_event: Option<EventRecord>,
    pub first_release: Option<ReleaseRecord>,
    pub first_comment: Option<CommentRecord>,
    pub first_watch: Option<WatchedRepositoryRecord>,
    pub first_contribution: Option<ContributionRecord>,
}

impl FirstEverythingReport {
    /// Empty report for `username`.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            account_created: None,
            first_repository: None,
            first_commit: None,
            first_issue: None,
            first_pull_request: None,
            first_gist: None,
            first_starred_repo: None,
            first_workflow_run: None,
            first_fork: None,
            first_organization: None,
            first_following: None,
            first_follower: None,
            first_public_event: None,
            first_release: None,
            first_comment: None,
            first_watch: None,
            first_contribution: None,
        }
    }

    /// Number of populated fields, `username` excluded.
    pub fn found_count(&self) -> usize {
        [
            self.account_created.is_some(),
            self.first_repository.is_some(),
            self.first_commit.is_some(),
            self.first_issue.is_some(),
            self.first_pull_request.is_some(),
            self.first_gist.is_some(),
            self.first_starred_repo.is_some(),
            self.first_workflow_run.is_some(),
            self.first_fork.is_some(),
            self.first_organization.is_some(),
            self.first_following.is_some(),
            self.first_follower.is_some(),
            self.first_public_event.is_some(),
            self.first_release.is_some(),
            self.first_comment.is_some(),
            self.first_watch.is_some(),
            self.first_contribution.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
