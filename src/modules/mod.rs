//! Cross-cutting services module
//!
//! Observes probe runs through events and aggregates them into metrics.

pub mod events;
pub mod metrics;

// Re-export commonly used types
pub use events::{
    EventDispatcher, EventHandler, FetchEvent, LoggingHandler, MetricsHandler, ProbeCompletedEvent,
    ProbeFailedEvent, ProbeStartedEvent, RunCompletedEvent,
};
pub use metrics::{GlobalStats, MetricsCollector, MetricsSnapshot, ProbeOutcome, ProbeStats};
