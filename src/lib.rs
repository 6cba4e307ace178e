//! # first-everything
//!
//! Reconstructs the earliest recorded instance of each kind of activity a
//! GitHub account has: account creation, first repository, first commit,
//! first issue and pull request, first star, first workflow run, and more.
//!
//! Every activity type is resolved by an independent probe. Probes run
//! concurrently behind a shared rate limiter, each under its own deadline, and
//! any probe that fails or finds nothing simply leaves its field empty.
//!
//! ## Example
//!
//! ```no_run
//! use first_everything::{FirstEverythingFetcher, render_summary};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = FirstEverythingFetcher::new(std::env::var("GITHUB_TOKEN")?)?;
//!     let report = fetcher.fetch_first_everything("octocat").await?;
//!     println!("{}", render_summary(&report));
//!     Ok(())
//! }
//! ```

mod fetcher;

pub mod api;
pub mod modules;
pub mod probes;
pub mod report;
pub mod throttle;
pub mod validation;

pub use crate::fetcher::{
    FetchError,
    FetchResult,
    FetcherConfig,
    FirstEverythingFetcher,
    FirstEverythingFetcherBuilder,
};

pub use crate::api::{ApiError, GitHubApi, Page, ReqwestGitHubClient};

pub use crate::modules::{
    EventDispatcher,
    EventHandler,
    FetchEvent,
    LoggingHandler,
    MetricsCollector,
    MetricsHandler,
    MetricsSnapshot,
    ProbeOutcome,
    ProbeStats,
};

pub use crate::probes::{ProbeError, ProbeKind, ProbeSettings, ProbeTimeouts};

pub use crate::report::{FirstEverythingReport, Timestamp, render_summary};

pub use crate::throttle::RateLimiter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
