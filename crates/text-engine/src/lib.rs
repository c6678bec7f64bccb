//! Text Engine (spec §4.J): format-parser registry keyed by MIME, a
//! time-sorted cue buffer per text stream with append-window clipping, and
//! a displayer interface.

mod buffer;
mod cue;
mod displayer;
mod engine;
mod error;
mod parser;
mod vtt;

pub use buffer::CueBuffer;
pub use cue::Cue;
pub use displayer::{Displayer, NullDisplayer};
pub use engine::TextEngine;
pub use error::TextError;
pub use parser::{TextParser, TextParserRegistry};
pub use vtt::VttParser;
