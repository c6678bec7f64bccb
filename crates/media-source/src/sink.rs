use async_trait::async_trait;
use bytes::Bytes;
use manifest::ContentType;

use crate::buffered::BufferedRanges;
use crate::error::MediaError;

/// Abstract target for demuxed media bytes (spec §1, §4.E). An in-memory
/// fake backs the test suite; a host application supplies a real platform
/// binding (e.g. a Media Source Extensions buffer) behind the same trait.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Prepares the sink to accept data of `content_type` with the given
    /// MIME/codecs string. Must be called before any append for that type.
    async fn init(&self, content_type: ContentType, mime_codecs: &str) -> Result<(), MediaError>;

    /// Appends an initialization segment for `content_type`.
    async fn append_init(&self, content_type: ContentType, bytes: Bytes) -> Result<(), MediaError>;

    /// Appends media bytes for `content_type`, offset by `timestamp_offset`
    /// and clipped to `append_window` before reaching the underlying
    /// buffer.
    async fn append_buffer(
        &self,
        content_type: ContentType,
        bytes: Bytes,
        timestamp_offset: f64,
        append_window: (f64, f64),
    ) -> Result<(), MediaError>;

    /// Removes the half-open interval `[start, end)` from the buffer for
    /// `content_type`. Tolerant of ranges with nothing currently buffered.
    async fn remove(&self, content_type: ContentType, start: f64, end: f64) -> Result<(), MediaError>;

    /// Sets the presentation duration hint on the sink.
    async fn set_duration(&self, duration: f64) -> Result<(), MediaError>;

    /// Signals that no further segments will be appended for any type.
    async fn end_of_stream(&self) -> Result<(), MediaError>;

    /// Returns the current buffered ranges for `content_type`.
    async fn buffered_range(&self, content_type: ContentType) -> BufferedRanges;
}

/// `clear` is `remove(type, -inf, +inf)` (spec §4.E).
pub async fn clear(sink: &dyn MediaSink, content_type: ContentType) -> Result<(), MediaError> {
    sink.remove(content_type, f64::NEG_INFINITY, f64::INFINITY).await
}
