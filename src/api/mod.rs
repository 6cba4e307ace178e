//! Hosted API boundary: capability trait, response schemas and the HTTP client.

mod client;
mod reqwest_client;
mod types;

pub use client::{
    ApiError, Direction, GitHubApi, ListQuery, MAX_PER_PAGE, RepositoryType, SearchQuery, SortKey,
};
pub use reqwest_client::{DEFAULT_API_URL, ReqwestGitHubClient};
pub use types::*;
