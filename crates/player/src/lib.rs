//! Player Orchestrator (spec §4.K): wires the Presentation Timeline,
//! Segment Index, Bandwidth Estimator, Variant Chooser, Media Source
//! Engine, DRM Engine, Play Head Controller, Streaming Engine, Manifest
//! Parser and Text Engine behind one public control surface.

pub mod config;
pub mod error;
pub mod events;
pub mod player;
pub mod stats;
pub mod tracks;

pub use config::PlayerConfig;
pub use error::PlayerError;
pub use events::{EventBus, PlayerEvent};
pub use player::Player;
pub use stats::PlayerStats;
pub use tracks::{TextTrack, VariantTrack};
