//! Response schemas decoded at the client boundary.
//!
//! Only the fields the probes read are modelled. Anything the platform may
//! omit is an `Option`; everything else is required, so a shape mismatch fails
//! decoding instead of leaking half-populated values into the probes.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

/// One page of a listing plus the pagination hint from the `Link` header.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Page number advertised as `rel="last"`, when the listing spans more than one page.
    pub last_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            last_page: None,
        }
    }

    pub fn with_last_page(mut self, last_page: Option<u32>) -> Self {
        self.last_page = last_page;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            last_page: self.last_page,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub id: u64,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSummary {
    pub login: String,
    pub id: u64,
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub html_url: String,
    #[serde(default)]
    pub fork: bool,
    pub created_at: DateTime<Utc>,
}

/// Entry of the starred listing when requested with the star media type.
#[derive(Debug, Clone, Deserialize)]
pub struct StarredRepository {
    pub starred_at: Option<DateTime<Utc>>,
    pub repo: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitActor {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub author: Option<GitActor>,
    pub committer: Option<GitActor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub html_url: String,
    pub commit: CommitDetail,
}

impl Commit {
    /// Author date, falling back to the committer date.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.commit
            .author
            .as_ref()
            .and_then(|actor| actor.date)
            .or_else(|| self.commit.committer.as_ref().and_then(|actor| actor.date))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults<T> {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<T>,
}

/// Issue or pull request as returned by the issue search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub repository_url: String,
    pub created_at: DateTime<Utc>,
    pub pull_request: Option<serde_json::Value>,
}

impl IssueItem {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Splits `repository_url` (`<api>/repos/<owner>/<repo>`) into owner and name.
    pub fn repository_coordinates(&self) -> Option<(String, String)> {
        let url = Url::parse(&self.repository_url).ok()?;
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        let position = segments.iter().rposition(|segment| *segment == "repos")?;
        match &segments[position + 1..] {
            [owner, repo] => Some((owner.to_string(), repo.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
    pub id: String,
    pub html_url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRuns {
    pub total_count: u64,
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub name: Option<String>,
    pub event: String,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub name: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub login: String,
    pub id: u64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRepo {
    pub name: String,
}

impl EventRepo {
    /// Owner half of `owner/name`.
    pub fn owner(&self) -> &str {
        self.name.split('/').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub repo: EventRepo,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub html_url: String,
    pub user: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}
