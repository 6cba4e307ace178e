//! Metrics collection utilities.
//!
//! Aggregates per-probe outcomes and latency percentiles across runs.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::probes::ProbeKind;

/// How a probe settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    Empty,
    Failed,
    TimedOut,
}

/// Aggregated metrics across all probes.
#[derive(Debug, Clone)]
pub struct GlobalStats {
    pub started_at: DateTime<Utc>,
    pub runs: u64,
    pub total_probes: u64,
    pub found: u64,
    pub empty: u64,
    /// Failed probes, timeouts included.
    pub failures: u64,
    pub timeouts: u64,
    pub average_latency: Option<Duration>,
    pub p95_latency: Option<Duration>,
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            runs: 0,
            total_probes: 0,
            found: 0,
            empty: 0,
            failures: 0,
            timeouts: 0,
            average_latency: None,
            p95_latency: None,
        }
    }
}

/// Probe-scoped metrics snapshot.
#[derive(Debug, Clone)]
pub struct ProbeStats {
    pub kind: ProbeKind,
    pub total: u64,
    pub found: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub average_latency: Option<Duration>,
    pub p95_latency: Option<Duration>,
    pub last_outcome: Option<ProbeOutcome>,
}

impl ProbeStats {
    fn from_accumulator(kind: ProbeKind, acc: &ProbeAccumulator) -> Self {
        let (avg, p95) = latency_stats(acc.latencies.iter().copied());
        Self {
            kind,
            total: acc.total,
            found: acc.found,
            failures: acc.failures,
            timeouts: acc.timeouts,
            average_latency: avg,
            p95_latency: p95,
            last_outcome: acc.last_outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub global: GlobalStats,
    pub probes: Vec<ProbeStats>,
}

impl MetricsSnapshot {
    pub fn probe(&self, kind: ProbeKind) -> Option<&ProbeStats> {
        self.probes.iter().find(|stats| stats.kind == kind)
    }
}

fn latency_stats(samples: impl Iterator<Item = Duration>) -> (Option<Duration>, Option<Duration>) {
    let mut samples: Vec<_> = samples.collect();
    if samples.is_empty() {
        return (None, None);
    }
    samples.sort_unstable();
    let avg = samples.iter().map(|d| d.as_secs_f64()).sum::<f64>() / samples.len() as f64;
    let p95_index = ((samples.len() as f64 * 0.95).ceil() as usize).saturating_sub(1);
    (Some(Duration::from_secs_f64(avg)), Some(samples[p95_index]))
}

#[derive(Debug)]
struct ProbeAccumulator {
    total: u64,
    found: u64,
    failures: u64,
    timeouts: u64,
    latencies: VecDeque<Duration>,
    max_window: usize,
    last_outcome: Option<ProbeOutcome>,
}

impl ProbeAccumulator {
    fn new(max_window: usize) -> Self {
        Self {
            total: 0,
            found: 0,
            failures: 0,
            timeouts: 0,
            latencies: VecDeque::with_capacity(max_window),
            max_window,
            last_outcome: None,
        }
    }

    fn record(&mut self, outcome: ProbeOutcome, latency: Duration) {
        self.total += 1;
        self.last_outcome = Some(outcome);
        match outcome {
            ProbeOutcome::Found => self.found += 1,
            ProbeOutcome::Empty => {}
            ProbeOutcome::Failed => self.failures += 1,
            ProbeOutcome::TimedOut => {
                self.failures += 1;
                self.timeouts += 1;
            }
        }

        if self.latencies.len() == self.max_window {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency);
    }
}

#[derive(Debug)]
struct MetricsState {
    global: GlobalStats,
    max_window: usize,
    probes: HashMap<ProbeKind, ProbeAccumulator>,
}

impl MetricsState {
    fn new(max_window: usize) -> Self {
        Self {
            global: GlobalStats::default(),
            max_window,
            probes: HashMap::new(),
        }
    }

    fn record(&mut self, kind: ProbeKind, outcome: ProbeOutcome, latency: Duration) {
        self.global.total_probes += 1;
        match outcome {
            ProbeOutcome::Found => self.global.found += 1,
            ProbeOutcome::Empty => self.global.empty += 1,
            ProbeOutcome::Failed => self.global.failures += 1,
            ProbeOutcome::TimedOut => {
                self.global.failures += 1;
                self.global.timeouts += 1;
            }
        }

        let max_window = self.max_window;
        self.probes
            .entry(kind)
            .or_insert_with(|| ProbeAccumulator::new(max_window))
            .record(outcome, latency);

        let (avg, p95) = latency_stats(
            self.probes
                .values()
                .flat_map(|acc| acc.latencies.iter().copied()),
        );
        self.global.average_latency = avg;
        self.global.p95_latency = p95;
    }
}

/// Thread-safe metrics collector shared by the fetcher and its handlers.
#[derive(Clone, Debug)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_window(128)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState::new(window.max(16)))),
        }
    }

    pub fn record_completed(&self, kind: ProbeKind, found: bool, latency: Duration) {
        let outcome = if found {
            ProbeOutcome::Found
        } else {
            ProbeOutcome::Empty
        };
        let mut guard = self.inner.lock().expect("metrics lock poisoned");
        guard.record(kind, outcome, latency);
    }

    pub fn record_failed(&self, kind: ProbeKind, timed_out: bool, latency: Duration) {
        let outcome = if timed_out {
            ProbeOutcome::TimedOut
        } else {
            ProbeOutcome::Failed
        };
        let mut guard = self.inner.lock().expect("metrics lock poisoned");
        guard.record(kind, outcome, latency);
    }

    pub fn record_run(&self) {
        let mut guard = self.inner.lock().expect("metrics lock poisoned");
        guard.global.runs += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let guard = self.inner.lock().expect("metrics lock poisoned");
        let mut probes: Vec<_> = guard
            .probes
            .iter()
            .map(|(kind, acc)| ProbeStats::from_accumulator(*kind, acc))
            .collect();
        probes.sort_by_key(|stats| ProbeKind::ALL.iter().position(|kind| *kind == stats.kind));
        MetricsSnapshot {
            global: guard.global.clone(),
            probes,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
