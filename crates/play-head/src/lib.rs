//! Play Head Controller (spec §4.G): buffering-state hysteresis, effective
//! playback rate, and seek clamping/reseed detection.

mod config;
mod controller;

pub use config::{effective_buffering_goal, PlayHeadConfig};
pub use controller::{BufferingTransition, PlayHeadController, SeekOutcome};
