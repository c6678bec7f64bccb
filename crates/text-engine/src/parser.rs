use std::collections::HashMap;

use crate::cue::Cue;
use crate::error::TextError;

/// Format-specific cue parser, chosen by MIME type (spec §4.J: "Wraps a
/// format-specific parser (chosen by MIME)").
pub trait TextParser: Send + Sync {
    fn parse(&self, bytes: &[u8], timestamp_offset: f64) -> Result<Vec<Cue>, TextError>;
}

/// Maps a MIME type to its registered [`TextParser`]. Unregistered types
/// surface `UNSUPPORTED_TEXT_FORMAT` rather than panicking, since
/// `spec.md` §1 explicitly keeps most text formats (SRT, TTML, LRC, SSA,
/// SAMI) out of scope for this engine and leaves them as extension points.
#[derive(Default)]
pub struct TextParserRegistry {
    parsers: HashMap<String, Box<dyn TextParser>>,
}

impl TextParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mime_type: impl Into<String>, parser: Box<dyn TextParser>) {
        self.parsers.insert(mime_type.into(), parser);
    }

    pub fn parse(&self, mime_type: &str, bytes: &[u8], timestamp_offset: f64) -> Result<Vec<Cue>, TextError> {
        let parser = self.parsers.get(mime_type).ok_or_else(|| TextError::UnsupportedTextFormat {
            mime_type: mime_type.to_string(),
        })?;
        parser.parse(bytes, timestamp_offset)
    }
}
