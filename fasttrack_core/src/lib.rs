#![forbid(unsafe_code)]

//! Core domain model and business logic for the FastTrack tracker.
//!
//! This crate provides:
//! - Domain types (fasting sessions, weight and calorie records)
//! - Fasting stage classification
//! - The fasting session state machine and its history log
//! - Persistence (key-value store, CSV export)
//! - Weight and calorie logs, including Fitbit weight sync

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod clock;
pub mod store;
pub mod notify;
pub mod stage;
pub mod history;
pub mod machine;
pub mod weight;
pub mod calories;
pub mod fitbit;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use clock::{format_duration, Clock, ManualClock, SystemClock};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use notify::{ConsoleNotifier, Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use stage::{classify, progress_percent, FastingStage, FASTING_STAGES};
pub use history::HistoryLog;
pub use machine::{FastPhase, FastingMachine, StartOutcome, StopOutcome, TickSample};
pub use weight::{calculate_weight_changes, sync_weight, WeightLog};
pub use calories::CalorieLog;
pub use export::export_history_csv;
