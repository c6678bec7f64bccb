use std::collections::HashMap;
use std::sync::Arc;

use manifest::StreamId;
use tracing::debug;

use crate::buffer::CueBuffer;
use crate::displayer::Displayer;
use crate::error::TextError;
use crate::parser::TextParserRegistry;

/// Coordinates parser selection, per-stream cue buffering and display
/// (spec §4.J).
pub struct TextEngine {
    registry: TextParserRegistry,
    displayer: Arc<dyn Displayer>,
    buffers: HashMap<StreamId, CueBuffer>,
    visible: bool,
}

impl TextEngine {
    pub fn new(registry: TextParserRegistry, displayer: Arc<dyn Displayer>) -> Self {
        Self {
            registry,
            displayer,
            buffers: HashMap::new(),
            visible: true,
        }
    }

    /// Parses `bytes` as `mime_type` and appends the resulting cues into
    /// `stream`'s buffer, clipped to `append_window`, then forwards each
    /// surviving cue to the displayer.
    pub fn append_segment(
        &mut self,
        stream: StreamId,
        mime_type: &str,
        bytes: &[u8],
        timestamp_offset: f64,
        append_window: (f64, f64),
    ) -> Result<usize, TextError> {
        let cues = self.registry.parse(mime_type, bytes, timestamp_offset)?;
        let buffer = self.buffers.entry(stream).or_default();
        let before = buffer.len();
        buffer.append(cues, append_window);
        let appended = buffer.len() - before;
        debug!(?stream, appended, "text engine appended cues");

        if self.visible {
            for cue in buffer.cues_active_at(append_window.0) {
                self.displayer.append(cue);
            }
        }
        Ok(appended)
    }

    pub fn remove(&mut self, stream: StreamId, start: f64, end: f64) {
        if let Some(buffer) = self.buffers.get_mut(&stream) {
            buffer.remove(start, end);
        }
        self.displayer.remove(start, end);
    }

    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
        self.displayer.set_visibility(visible);
    }

    pub fn cue_count(&self, stream: StreamId) -> usize {
        self.buffers.get(&stream).map(CueBuffer::len).unwrap_or(0)
    }

    pub fn destroy(&mut self) {
        self.buffers.clear();
        self.displayer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vtt::VttParser;

    fn stream_id() -> StreamId {
        StreamId(0)
    }

    #[test]
    fn append_segment_parses_and_buffers_cues() {
        let mut registry = TextParserRegistry::new();
        registry.register("text/vtt", Box::new(VttParser));
        let mut engine = TextEngine::new(registry, Arc::new(crate::displayer::NullDisplayer));

        let input = b"WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi\n";
        let stream = stream_id();
        let appended = engine.append_segment(stream, "text/vtt", input, 0.0, (0.0, 10.0)).unwrap();
        assert_eq!(appended, 1);
        assert_eq!(engine.cue_count(stream), 1);
    }

    #[test]
    fn unknown_mime_type_is_unsupported() {
        let engine_registry = TextParserRegistry::new();
        let mut engine = TextEngine::new(engine_registry, Arc::new(crate::displayer::NullDisplayer));
        let err = engine.append_segment(stream_id(), "application/ttml+xml", b"", 0.0, (0.0, 1.0)).unwrap_err();
        assert!(matches!(err, TextError::UnsupportedTextFormat { .. }));
    }
}
