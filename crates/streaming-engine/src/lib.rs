//! Streaming Engine (spec §4.H): per-content-type fetch loops, period
//! transitions, ABR switching, seek/rate handling and failure recovery.

pub mod config;
pub mod engine;
pub mod error;
pub mod failure;
pub mod fetch_loop;

pub use config::StreamingConfig;
pub use engine::StreamingEngine;
pub use error::{EngineError, Severity};
pub use failure::{classify, severity_for, RecoveryAction};
pub use fetch_loop::{FetchLoop, StepOutcome};
