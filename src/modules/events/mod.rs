//! Event system for probe runs.
//!
//! Provides hooks for metrics, logging, and custom reactions around probe
//! activity.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::metrics::MetricsCollector;
use crate::probes::{ProbeError, ProbeKind};

/// A probe was launched with the given budget.
#[derive(Debug, Clone)]
pub struct ProbeStartedEvent {
    pub username: String,
    pub kind: ProbeKind,
    pub timeout: Duration,
    pub timestamp: DateTime<Utc>,
}

/// A probe settled successfully, with or without a record.
#[derive(Debug, Clone)]
pub struct ProbeCompletedEvent {
    pub username: String,
    pub kind: ProbeKind,
    pub found: bool,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

/// A probe failed or ran out of time; its field stays absent.
#[derive(Debug, Clone)]
pub struct ProbeFailedEvent {
    pub username: String,
    pub kind: ProbeKind,
    pub error: ProbeError,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

impl ProbeFailedEvent {
    pub fn timed_out(&self) -> bool {
        matches!(self.error, ProbeError::Timeout(_))
    }
}

/// Every probe of a run has settled.
#[derive(Debug, Clone)]
pub struct RunCompletedEvent {
    pub username: String,
    pub found: usize,
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum FetchEvent {
    ProbeStarted(ProbeStartedEvent),
    ProbeCompleted(ProbeCompletedEvent),
    ProbeFailed(ProbeFailedEvent),
    RunCompleted(RunCompletedEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &FetchEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: FetchEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &FetchEvent) {
        match event {
            FetchEvent::ProbeStarted(started) => {
                log::debug!(
                    "-> {} for @{} (budget {:.0}s)",
                    started.kind,
                    started.username,
                    started.timeout.as_secs_f64()
                );
            }
            FetchEvent::ProbeCompleted(done) => {
                log::info!(
                    "{} for @{}: {} ({:.2}s)",
                    done.kind,
                    done.username,
                    if done.found { "found" } else { "none" },
                    done.latency.as_secs_f64()
                );
            }
            FetchEvent::ProbeFailed(failed) if failed.timed_out() => {
                log::warn!("{} for @{} timed out: {}", failed.kind, failed.username, failed.error);
            }
            FetchEvent::ProbeFailed(failed) => {
                log::warn!("could not fetch {} for @{}: {}", failed.kind, failed.username, failed.error);
            }
            FetchEvent::RunCompleted(run) => {
                log::info!(
                    "finished @{}: {} fields found in {:.2}s",
                    run.username,
                    run.found,
                    run.elapsed.as_secs_f64()
                );
            }
        }
    }
}

/// Metrics handler that feeds the metrics collector.
#[derive(Clone, Debug)]
pub struct MetricsHandler {
    metrics: MetricsCollector,
}

impl MetricsHandler {
    pub fn new(metrics: MetricsCollector) -> Self {
        Self { metrics }
    }
}

impl EventHandler for MetricsHandler {
    fn handle(&self, event: &FetchEvent) {
        match event {
            FetchEvent::ProbeCompleted(done) => {
                self.metrics.record_completed(done.kind, done.found, done.latency);
            }
            FetchEvent::ProbeFailed(failed) => {
                self.metrics
                    .record_failed(failed.kind, failed.timed_out(), failed.latency);
            }
            FetchEvent::RunCompleted(_) => self.metrics.record_run(),
            FetchEvent::ProbeStarted(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler(std::sync::Mutex<usize>);

    impl EventHandler for CountingHandler {
        fn handle(&self, _event: &FetchEvent) {
            *self.0.lock().unwrap() += 1;
        }
    }

    fn failed(error: ProbeError) -> ProbeFailedEvent {
        ProbeFailedEvent {
            username: "octo".into(),
            kind: ProbeKind::FirstRelease,
            error,
            latency: Duration::from_secs(30),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn dispatches_to_handlers() {
        let mut dispatcher = EventDispatcher::new();
        let counter = Arc::new(CountingHandler(std::sync::Mutex::new(0)));
        dispatcher.register_handler(counter.clone());
        dispatcher.register_handler(Arc::new(LoggingHandler));
        dispatcher.dispatch(FetchEvent::ProbeFailed(failed(ProbeError::Remote(
            "503 Service Unavailable".into(),
        ))));
        assert_eq!(*counter.0.lock().unwrap(), 1);
    }

    #[test]
    fn metrics_handler_tracks_timeouts() {
        let metrics = MetricsCollector::new();
        let handler = MetricsHandler::new(metrics.clone());
        handler.handle(&FetchEvent::ProbeFailed(failed(ProbeError::Timeout(
            Duration::from_secs(30),
        ))));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.global.timeouts, 1);
        assert_eq!(snapshot.global.failures, 1);
    }
}
