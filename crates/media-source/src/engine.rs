use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use manifest::ContentType;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::buffered::{buffer_start, buffered_ahead_of, BufferedRanges};
use crate::error::MediaError;
use crate::sink::MediaSink;

/// Per-type bookkeeping. The `Mutex` is the serialization point: holding
/// its guard across an append/remove is what gives each content type FIFO
/// ordering for its own operations (spec §4.E — "all append*/remove* are
/// serialized per type; cross-type ordering is not enforced").
struct TypeState {
    lock: Mutex<()>,
    last_init: Mutex<Option<Bytes>>,
}

impl TypeState {
    fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            last_init: Mutex::new(None),
        }
    }
}

/// Type-keyed façade over a [`MediaSink`]: serializes operations per
/// content type, makes `appendInit` idempotent by value, and derives
/// buffer-range helpers (spec §4.E).
pub struct MediaSourceEngine {
    sink: Arc<dyn MediaSink>,
    types: HashMap<ContentType, TypeState>,
}

impl MediaSourceEngine {
    pub fn new(sink: Arc<dyn MediaSink>) -> Self {
        let mut types = HashMap::new();
        for ct in [
            ContentType::Audio,
            ContentType::Video,
            ContentType::Text,
            ContentType::Image,
        ] {
            types.insert(ct, TypeState::new());
        }
        Self { sink, types }
    }

    fn state(&self, content_type: ContentType) -> &TypeState {
        self.types
            .get(&content_type)
            .expect("all ContentType variants are pre-registered")
    }

    pub async fn init(&self, content_type: ContentType, mime_codecs: &str) -> Result<(), MediaError> {
        let state = self.state(content_type);
        let _guard = state.lock.lock().await;
        self.sink.init(content_type, mime_codecs).await
    }

    /// Idempotent: if `init_bytes` equals the last-appended init segment
    /// for `content_type` by value, the call is a no-op success (spec
    /// §4.E — avoids redundant re-initialization on init-segment reuse
    /// across consecutive `SegmentReference`s).
    pub async fn append_init(
        &self,
        content_type: ContentType,
        init_bytes: Bytes,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let state = self.state(content_type);
        let _guard = state.lock.lock().await;

        let mut last = state.last_init.lock().await;
        if last.as_ref() == Some(&init_bytes) {
            trace!(?content_type, "append_init skipped: identical to last init");
            return Ok(());
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MediaError::OperationAborted),
            result = self.sink.append_init(content_type, init_bytes.clone()) => result,
        };
        result?;
        *last = Some(init_bytes);
        Ok(())
    }

    pub async fn append_buffer(
        &self,
        content_type: ContentType,
        bytes: Bytes,
        timestamp_offset: f64,
        append_window: (f64, f64),
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let state = self.state(content_type);
        let _guard = state.lock.lock().await;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MediaError::OperationAborted),
            result = self.sink.append_buffer(content_type, bytes, timestamp_offset, append_window) => result,
        }
    }

    pub async fn remove(
        &self,
        content_type: ContentType,
        start: f64,
        end: f64,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        let state = self.state(content_type);
        let _guard = state.lock.lock().await;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MediaError::OperationAborted),
            result = self.sink.remove(content_type, start, end) => result,
        }
    }

    /// `clear(type)` is `remove(type, -inf, +inf)`, and also forgets the
    /// last-appended init segment so the next `append_init` is not
    /// mistakenly skipped as a duplicate.
    pub async fn clear(&self, content_type: ContentType, cancel: &CancellationToken) -> Result<(), MediaError> {
        self.remove(content_type, f64::NEG_INFINITY, f64::INFINITY, cancel).await?;
        *self.state(content_type).last_init.lock().await = None;
        Ok(())
    }

    pub async fn set_duration(&self, duration: f64) -> Result<(), MediaError> {
        self.sink.set_duration(duration).await
    }

    pub async fn end_of_stream(&self) -> Result<(), MediaError> {
        debug!("media source end of stream");
        self.sink.end_of_stream().await
    }

    pub async fn buffered_range(&self, content_type: ContentType) -> BufferedRanges {
        self.sink.buffered_range(content_type).await
    }

    pub async fn buffer_start(&self, content_type: ContentType) -> Option<f64> {
        buffer_start(&self.buffered_range(content_type).await)
    }

    pub async fn buffered_ahead_of(&self, content_type: ContentType, t: f64) -> f64 {
        buffered_ahead_of(&self.buffered_range(content_type).await, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as AsyncMutex;

    struct FakeSink {
        init_calls: AtomicUsize,
        ranges: AsyncMutex<HashMap<ContentType, BufferedRanges>>,
    }

    impl FakeSink {
        fn new() -> Self {
            Self {
                init_calls: AtomicUsize::new(0),
                ranges: AsyncMutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl MediaSink for FakeSink {
        async fn init(&self, _content_type: ContentType, _mime_codecs: &str) -> Result<(), MediaError> {
            Ok(())
        }

        async fn append_init(&self, _content_type: ContentType, _bytes: Bytes) -> Result<(), MediaError> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn append_buffer(
            &self,
            content_type: ContentType,
            bytes: Bytes,
            timestamp_offset: f64,
            append_window: (f64, f64),
        ) -> Result<(), MediaError> {
            let start = timestamp_offset.max(append_window.0);
            let end = (timestamp_offset + bytes.len() as f64).min(append_window.1);
            if end > start {
                self.ranges
                    .lock()
                    .await
                    .entry(content_type)
                    .or_default()
                    .push((start, end));
            }
            Ok(())
        }

        async fn remove(&self, content_type: ContentType, start: f64, end: f64) -> Result<(), MediaError> {
            if let Some(ranges) = self.ranges.lock().await.get_mut(&content_type) {
                ranges.retain(|(s, e)| *e <= start || *s >= end);
            }
            Ok(())
        }

        async fn set_duration(&self, _duration: f64) -> Result<(), MediaError> {
            Ok(())
        }

        async fn end_of_stream(&self) -> Result<(), MediaError> {
            Ok(())
        }

        async fn buffered_range(&self, content_type: ContentType) -> BufferedRanges {
            self.ranges.lock().await.get(&content_type).cloned().unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn append_init_is_idempotent_by_value() {
        let sink = Arc::new(FakeSink::new());
        let engine = MediaSourceEngine::new(sink.clone());
        let token = CancellationToken::new();
        let init = Bytes::from_static(b"init-segment-1");

        engine.append_init(ContentType::Video, init.clone(), &token).await.unwrap();
        engine.append_init(ContentType::Video, init.clone(), &token).await.unwrap();
        assert_eq!(sink.init_calls.load(Ordering::SeqCst), 1);

        let different = Bytes::from_static(b"init-segment-2");
        engine.append_init(ContentType::Video, different, &token).await.unwrap();
        assert_eq!(sink.init_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_forgets_last_init_so_next_append_runs() {
        let sink = Arc::new(FakeSink::new());
        let engine = MediaSourceEngine::new(sink.clone());
        let token = CancellationToken::new();
        let init = Bytes::from_static(b"init-segment-1");

        engine.append_init(ContentType::Video, init.clone(), &token).await.unwrap();
        engine.clear(ContentType::Video, &token).await.unwrap();
        engine.append_init(ContentType::Video, init, &token).await.unwrap();
        assert_eq!(sink.init_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn append_buffer_is_clipped_to_append_window() {
        let sink = Arc::new(FakeSink::new());
        let engine = MediaSourceEngine::new(sink);
        let token = CancellationToken::new();

        engine
            .append_buffer(ContentType::Audio, Bytes::from_static(&[0u8; 10]), 0.0, (2.0, 8.0), &token)
            .await
            .unwrap();

        let ranges = engine.buffered_range(ContentType::Audio).await;
        assert_eq!(ranges, vec![(2.0, 8.0)]);
    }

    #[tokio::test]
    async fn append_aborts_when_cancelled() {
        let sink = Arc::new(FakeSink::new());
        let engine = MediaSourceEngine::new(sink);
        let token = CancellationToken::new();
        token.cancel();

        let err = engine
            .append_buffer(ContentType::Video, Bytes::from_static(b"x"), 0.0, (0.0, 10.0), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::OperationAborted));
    }

    #[tokio::test]
    async fn buffered_ahead_of_reflects_appended_ranges() {
        let sink = Arc::new(FakeSink::new());
        let engine = MediaSourceEngine::new(sink);
        let token = CancellationToken::new();

        engine
            .append_buffer(ContentType::Video, Bytes::from_static(&[0u8; 10]), 0.0, (0.0, 10.0), &token)
            .await
            .unwrap();

        assert_eq!(engine.buffer_start(ContentType::Video).await, Some(0.0));
        assert_eq!(engine.buffered_ahead_of(ContentType::Video, 3.0).await, 7.0);
    }
}
