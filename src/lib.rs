// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod consumer;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod signal;

// ---- Re-exports for stable public API ----
pub use crate::config::SlurperConfig;
pub use crate::consumer::{run_consumer, ConsumerCfg, ConsumerReport, StopReason};
pub use crate::ingest::{Event, EventKind, FetchAdapter, FetchError, SourceDescriptor};
pub use crate::notify::{ConsoleNotifier, Notifier, NotifierMux};
pub use crate::orchestrator::{Mode, RunOptions};
