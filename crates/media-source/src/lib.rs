//! Media Source Engine (spec §4.E): a type-keyed append/remove façade over
//! a shared [`MediaSink`], with idempotent init-segment re-append and
//! append-window clipping.

mod buffered;
mod engine;
mod error;
mod sink;

pub use buffered::{buffer_start, buffered_ahead_of, BufferedRanges};
pub use engine::MediaSourceEngine;
pub use error::MediaError;
pub use sink::{clear, MediaSink};
