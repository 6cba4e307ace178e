//! High level "first everything" orchestration.
//!
//! Wires the API client, the shared rate limiter, the probe set and the
//! event/metrics subsystems together behind a single
//! [`FirstEverythingFetcher::fetch_first_everything`] call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use crate::api::{ApiError, DEFAULT_API_URL, GitHubApi, ReqwestGitHubClient};
use crate::modules::events::{
    EventDispatcher, EventHandler, FetchEvent, LoggingHandler, MetricsHandler,
    ProbeCompletedEvent, ProbeFailedEvent, ProbeStartedEvent, RunCompletedEvent,
};
use crate::modules::metrics::{MetricsCollector, MetricsSnapshot};
use crate::probes::{self, ProbeContext, ProbeDescriptor, ProbeError, ProbeKind, ProbeSettings, ProbeTimeouts};
use crate::report::FirstEverythingReport;
use crate::throttle::{DEFAULT_MIN_INTERVAL, RateLimiter, with_deadline};
use crate::validation::{is_valid_username, normalize_token};

/// Result alias used across the orchestration layer.
pub type FetchResult<T> = Result<T, FetchError>;

/// Fatal conditions. Probe failures never surface here; they degrade the
/// affected field instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid username {0:?}: expected 1-39 alphanumerics or single inner hyphens")]
    InvalidUsername(String),
    #[error("an API token is required")]
    EmptyToken,
    #[error("api client error: {0}")]
    Client(#[from] ApiError),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub api_url: String,
    pub user_agent: String,
    /// Per-request HTTP timeout, independent of the probe deadlines.
    pub request_timeout: Duration,
    pub min_interval: Duration,
    pub timeouts: ProbeTimeouts,
    pub settings: ProbeSettings,
    pub enable_metrics: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: format!("first-everything/{}", crate::VERSION),
            request_timeout: Duration::from_secs(10),
            min_interval: DEFAULT_MIN_INTERVAL,
            timeouts: ProbeTimeouts::default(),
            settings: ProbeSettings::default(),
            enable_metrics: true,
        }
    }
}

/// Builder for [`FirstEverythingFetcher`].
pub struct FirstEverythingFetcherBuilder {
    config: FetcherConfig,
    token: Option<String>,
    api: Option<Arc<dyn GitHubApi>>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl FirstEverythingFetcherBuilder {
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
            token: None,
            api: None,
            handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: FetcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use `api` instead of building an HTTP client; no token is needed then.
    pub fn with_api(mut self, api: Arc<dyn GitHubApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.config.api_url = api_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.config.min_interval = interval;
        self
    }

    pub fn with_probe_timeouts(mut self, timeouts: ProbeTimeouts) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    pub fn with_probe_settings(mut self, settings: ProbeSettings) -> Self {
        self.config.settings = settings;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn disable_metrics(mut self) -> Self {
        self.config.enable_metrics = false;
        self
    }

    pub fn build(self) -> FetchResult<FirstEverythingFetcher> {
        let api = match self.api {
            Some(api) => api,
            None => {
                let token = self
                    .token
                    .as_deref()
                    .and_then(normalize_token)
                    .ok_or(FetchError::EmptyToken)?;
                let base_url = Url::parse(&self.config.api_url)?;
                Arc::new(ReqwestGitHubClient::new(
                    base_url,
                    token,
                    &self.config.user_agent,
                    self.config.request_timeout,
                )?)
            }
        };
        Ok(FirstEverythingFetcher::with_parts(self.config, api, self.handlers))
    }
}

impl Default for FirstEverythingFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the "first everything" report of a user.
pub struct FirstEverythingFetcher {
    config: FetcherConfig,
    api: Arc<dyn GitHubApi>,
    limiter: Arc<RateLimiter>,
    metrics: Option<MetricsCollector>,
    events: EventDispatcher,
}

impl FirstEverythingFetcher {
    /// Fetcher with default configuration talking to the public API.
    pub fn new(token: impl Into<String>) -> FetchResult<Self> {
        Self::builder().with_token(token).build()
    }

    pub fn builder() -> FirstEverythingFetcherBuilder {
        FirstEverythingFetcherBuilder::new()
    }

    fn with_parts(
        config: FetcherConfig,
        api: Arc<dyn GitHubApi>,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> Self {
        let metrics = config.enable_metrics.then(MetricsCollector::new);
        let mut events = EventDispatcher::new();
        events.register_handler(Arc::new(LoggingHandler));
        if let Some(collector) = &metrics {
            events.register_handler(Arc::new(MetricsHandler::new(collector.clone())));
        }
        for handler in handlers {
            events.register_handler(handler);
        }

        Self {
            limiter: Arc::new(RateLimiter::new(config.min_interval)),
            config,
            api,
            metrics,
            events,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Metrics accumulated over every run of this fetcher, if enabled.
    pub fn metrics_snapshot(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(MetricsCollector::snapshot)
    }

    /// Runs every probe for `username` and merges whatever they find.
    ///
    /// Only an invalid username is fatal. Probes run concurrently, each under
    /// its own deadline; a failing or slow probe leaves its field empty and
    /// never holds back the others.
    pub async fn fetch_first_everything(&self, username: &str) -> FetchResult<FirstEverythingReport> {
        if !is_valid_username(username) {
            return Err(FetchError::InvalidUsername(username.to_string()));
        }

        let started = Instant::now();
        let ctx = ProbeContext::new(
            self.api.clone(),
            self.limiter.clone(),
            username,
            self.config.settings.clone(),
        );
        let ctx = &ctx;

        let (
            account_created,
            first_repository,
            first_commit,
            first_issue,
            first_pull_request,
            first_gist,
            first_starred_repo,
            first_workflow_run,
            first_fork,
            first_organization,
            first_following,
            first_follower,
            first_public_event,
            first_release,
            first_comment,
            first_watch,
            first_contribution,
        ) = tokio::join!(
            self.settle(ctx, ProbeKind::AccountCreated, probes::account_created(ctx)),
            self.settle(ctx, ProbeKind::FirstRepository, probes::first_repository(ctx)),
            self.settle(ctx, ProbeKind::FirstCommit, probes::first_commit(ctx)),
            self.settle(ctx, ProbeKind::FirstIssue, probes::first_issue(ctx)),
            self.settle(ctx, ProbeKind::FirstPullRequest, probes::first_pull_request(ctx)),
            self.settle(ctx, ProbeKind::FirstGist, probes::first_gist(ctx)),
            self.settle(ctx, ProbeKind::FirstStarredRepo, probes::first_starred_repo(ctx)),
            self.settle(ctx, ProbeKind::FirstWorkflowRun, probes::first_workflow_run(ctx)),
            self.settle(ctx, ProbeKind::FirstFork, probes::first_fork(ctx)),
            self.settle(ctx, ProbeKind::FirstOrganization, probes::first_organization(ctx)),
            self.settle(ctx, ProbeKind::FirstFollowing, probes::first_following(ctx)),
            self.settle(ctx, ProbeKind::FirstFollower, probes::first_follower(ctx)),
            self.settle(ctx, ProbeKind::FirstPublicEvent, probes::first_public_event(ctx)),
            self.settle(ctx, ProbeKind::FirstRelease, probes::first_release(ctx)),
            self.settle(ctx, ProbeKind::FirstComment, probes::first_comment(ctx)),
            self.settle(ctx, ProbeKind::FirstWatch, probes::first_watch(ctx)),
            self.settle(ctx, ProbeKind::FirstContribution, probes::first_contribution(ctx)),
        );

        let report = FirstEverythingReport {
            username: username.to_string(),
            account_created,
            first_repository,
            first_commit,
            first_issue,
            first_pull_request,
            first_gist,
            first_starred_repo,
            first_workflow_run,
            first_fork,
            first_organization,
            first_following,
            first_follower,
            first_public_event,
            first_release,
            first_comment,
            first_watch,
            first_contribution,
        };

        self.events.dispatch(FetchEvent::RunCompleted(RunCompletedEvent {
            username: username.to_string(),
            found: report.found_count(),
            elapsed: started.elapsed(),
            timestamp: Utc::now(),
        }));
        Ok(report)
    }

    /// Races `probe` against its deadline and turns any failure into `None`.
    async fn settle<T, F>(&self, ctx: &ProbeContext, kind: ProbeKind, probe: F) -> Option<T>
    where
        F: Future<Output = Result<Option<T>, ProbeError>>,
    {
        let descriptor = ProbeDescriptor::new(kind, &self.config.timeouts);
        let username = ctx.username().to_string();
        self.events.dispatch(FetchEvent::ProbeStarted(ProbeStartedEvent {
            username: username.clone(),
            kind,
            timeout: descriptor.timeout,
            timestamp: Utc::now(),
        }));

        let started = Instant::now();
        match with_deadline(probe, descriptor.timeout).await {
            Ok(found) => {
                self.events.dispatch(FetchEvent::ProbeCompleted(ProbeCompletedEvent {
                    username,
                    kind,
                    found: found.is_some(),
                    latency: started.elapsed(),
                    timestamp: Utc::now(),
                }));
                found
            }
            Err(error) => {
                self.events.dispatch(FetchEvent::ProbeFailed(ProbeFailedEvent {
                    username,
                    kind,
                    error,
                    latency: started.elapsed(),
                    timestamp: Utc::now(),
                }));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_rejected_at_build() {
        let err = FirstEverythingFetcher::new("   ").err().unwrap();
        assert!(matches!(err, FetchError::EmptyToken));
        assert!(matches!(
            FirstEverythingFetcher::builder().build().err().unwrap(),
            FetchError::EmptyToken
        ));
    }

    #[test]
    fn bad_api_url_is_rejected_at_build() {
        let err = FirstEverythingFetcher::builder()
            .with_token("ghp_abc")
            .with_api_url("not a url")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::Url(_)));
    }

    #[test]
    fn defaults_follow_documented_budgets() {
        let config = FetcherConfig::default();
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.min_interval, Duration::from_millis(150));
        assert_eq!(config.timeouts.short, Duration::from_secs(15));
        assert_eq!(config.timeouts.fan_out, Duration::from_secs(30));
        assert_eq!(config.settings.max_event_pages, 10);
    }
}
