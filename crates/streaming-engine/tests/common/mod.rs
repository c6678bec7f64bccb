//! Shared fixtures for the seed-scenario integration tests (spec §8,
//! scenarios S1-S6): a minimal local HTTP server standing in for the CDN,
//! and manifest builders that skip the DASH/HLS parsers entirely since
//! these tests exercise the streaming engine, not manifest parsing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use manifest::{
    ContentType, Manifest, Period, SegmentIndex, SegmentReference, Stream, StreamId, Variant,
};
use media_source::{BufferedRanges, MediaError, MediaSink};
use presentation_timeline::TimelineConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Duration;

/// In-memory [`MediaSink`] standing in for a platform media element:
/// records appended ranges per type the same way `fetch_loop`'s unit
/// tests' `FakeSink` does, minus the `std::sync::Mutex` (these tests hold
/// the lock across `.await` points).
#[derive(Default)]
pub struct RecordingSink {
    ranges: AsyncMutex<HashMap<ContentType, BufferedRanges>>,
}

#[async_trait]
impl MediaSink for RecordingSink {
    async fn init(&self, _content_type: ContentType, _mime_codecs: &str) -> Result<(), MediaError> {
        Ok(())
    }

    async fn append_init(&self, _content_type: ContentType, _bytes: bytes::Bytes) -> Result<(), MediaError> {
        Ok(())
    }

    async fn append_buffer(
        &self,
        content_type: ContentType,
        _bytes: bytes::Bytes,
        _timestamp_offset: f64,
        append_window: (f64, f64),
    ) -> Result<(), MediaError> {
        // The fake CDN's bytes carry no real media timing; the announced
        // `append_window` already reflects the segment's presentation
        // interval, so that's what a real sink would end up buffering.
        self.ranges.lock().await.entry(content_type).or_default().push(append_window);
        Ok(())
    }

    async fn remove(&self, content_type: ContentType, start: f64, end: f64) -> Result<(), MediaError> {
        if let Some(ranges) = self.ranges.lock().await.get_mut(&content_type) {
            ranges.retain(|(s, _)| *s < start || *s >= end);
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

/// A CDN stand-in: every request gets a fixed-size body after an
/// adjustable artificial delay, letting tests dial in a precise
/// `bandwidth_bps = 8000 * body_len / delay_ms` for one sample.
pub struct FakeCdn {
    pub addr: SocketAddr,
    delay_ms: Arc<AtomicU64>,
    body_len: Arc<AtomicUsize>,
}

impl FakeCdn {
    pub async fn spawn(initial_delay_ms: u64, initial_body_len: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake cdn listener");
        let addr = listener.local_addr().expect("fake cdn local addr");
        let delay_ms = Arc::new(AtomicU64::new(initial_delay_ms));
        let body_len = Arc::new(AtomicUsize::new(initial_body_len));

        let task_delay = delay_ms.clone();
        let task_len = body_len.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let delay_ms = task_delay.load(Ordering::SeqCst);
                let len = task_len.load(Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = tokio::time::timeout(Duration::from_millis(200), socket.read(&mut buf)).await;
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    let body = vec![0xABu8; len];
                    let header = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, delay_ms, body_len }
    }

    pub fn set_delay_ms(&self, delay_ms: u64) {
        self.delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    pub fn set_body_len(&self, len: usize) {
        self.body_len.store(len, Ordering::SeqCst);
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path)
    }
}

fn video_stream(id: StreamId, segments: &[(f64, f64)], uri_prefix: &str) -> Stream {
    let index = SegmentIndex::from_segments(
        segments
            .iter()
            .enumerate()
            .map(|(i, (t0, t1))| SegmentReference::new(*t0, *t1, vec![format!("{uri_prefix}/seg{i}")]))
            .collect(),
    );
    Stream {
        id,
        content_type: ContentType::Video,
        mime_type: "video/mp4".into(),
        codecs: "avc1.64001f".into(),
        language: None,
        roles: Vec::new(),
        width: Some(1920),
        height: Some(1080),
        frame_rate: Some(30.0),
        primary: false,
        encrypted: false,
        key_id: None,
        segment_index: index,
        init_segment: None,
    }
}

fn audio_stream(id: StreamId, segments: &[(f64, f64)], uri_prefix: &str) -> Stream {
    let index = SegmentIndex::from_segments(
        segments
            .iter()
            .enumerate()
            .map(|(i, (t0, t1))| SegmentReference::new(*t0, *t1, vec![format!("{uri_prefix}/seg{i}")]))
            .collect(),
    );
    Stream {
        id,
        content_type: ContentType::Audio,
        mime_type: "audio/mp4".into(),
        codecs: "mp4a.40.2".into(),
        language: Some("en".into()),
        roles: Vec::new(),
        width: None,
        height: None,
        frame_rate: None,
        primary: false,
        encrypted: false,
        key_id: None,
        segment_index: index,
        init_segment: None,
    }
}

/// S1/S2: a single 60s period, one audio track (10s segments) and one
/// video track (12s segments), one variant.
pub fn single_period_av_manifest(cdn: &FakeCdn) -> Manifest {
    let mut manifest = Manifest::new(TimelineConfig { duration: Some(60.0), ..TimelineConfig::default() });

    let audio_segments: Vec<_> = (0..6).map(|i| (i as f64 * 10.0, (i + 1) as f64 * 10.0)).collect();
    let video_segments: Vec<_> = (0..5).map(|i| (i as f64 * 12.0, (i + 1) as f64 * 12.0)).collect();

    let audio_id = manifest.push_stream(audio_stream(StreamId(0), &audio_segments, &cdn.url("audio")));
    let video_id = manifest.push_stream(video_stream(StreamId(0), &video_segments, &cdn.url("video")));

    let variant_id = manifest.push_variant(Variant {
        id: manifest::VariantId(0),
        audio: Some(audio_id),
        video: Some(video_id),
        text: None,
        bandwidth: 2_000_000,
        drm_infos: Vec::new(),
        allowed_by_application: true,
        allowed_by_key_system: true,
    });

    manifest.push_period(Period { id: manifest::PeriodId(0), start: 0.0, variants: vec![variant_id], text_streams: Vec::new() });
    manifest
}

/// S3: two back-to-back 30s periods, each with its own audio/video
/// streams and a single variant.
pub fn two_period_manifest(cdn: &FakeCdn) -> Manifest {
    let mut manifest = Manifest::new(TimelineConfig { duration: Some(60.0), ..TimelineConfig::default() });

    for (period_index, start) in [(0usize, 0.0), (1, 30.0)] {
        let audio_segments: Vec<_> = (0..3).map(|i| (i as f64 * 10.0, (i + 1) as f64 * 10.0)).collect();
        let video_segments: Vec<_> = (0..3).map(|i| (i as f64 * 10.0, (i + 1) as f64 * 10.0)).collect();
        let prefix = format!("p{period_index}");

        let audio_id = manifest.push_stream(audio_stream(StreamId(0), &audio_segments, &cdn.url(&format!("{prefix}/audio"))));
        let video_id = manifest.push_stream(video_stream(StreamId(0), &video_segments, &cdn.url(&format!("{prefix}/video"))));

        let variant_id = manifest.push_variant(Variant {
            id: manifest::VariantId(0),
            audio: Some(audio_id),
            video: Some(video_id),
            text: None,
            bandwidth: 2_000_000,
            drm_infos: Vec::new(),
            allowed_by_application: true,
            allowed_by_key_system: true,
        });

        manifest.push_period(Period {
            id: manifest::PeriodId(0),
            start,
            variants: vec![variant_id],
            text_streams: Vec::new(),
        });
    }
    manifest
}

/// S4: one period, video-only, three variants (@500k, @2M, @5M).
pub fn variant_ladder_manifest(cdn: &FakeCdn) -> Manifest {
    let mut manifest = Manifest::new(TimelineConfig { duration: Some(60.0), ..TimelineConfig::default() });
    let segments: Vec<_> = (0..6).map(|i| (i as f64 * 10.0, (i + 1) as f64 * 10.0)).collect();

    let mut variant_ids = Vec::new();
    for (bw, height) in [(500_000u64, 360u32), (2_000_000, 720), (5_000_000, 1080)] {
        let mut stream = video_stream(StreamId(0), &segments, &cdn.url(&format!("v{bw}")));
        stream.height = Some(height);
        stream.width = Some(height * 16 / 9);
        let stream_id = manifest.push_stream(stream);
        let variant_id = manifest.push_variant(Variant {
            id: manifest::VariantId(0),
            audio: None,
            video: Some(stream_id),
            text: None,
            bandwidth: bw,
            drm_infos: Vec::new(),
            allowed_by_application: true,
            allowed_by_key_system: true,
        });
        variant_ids.push(variant_id);
    }

    manifest.push_period(Period { id: manifest::PeriodId(0), start: 0.0, variants: variant_ids, text_streams: Vec::new() });
    manifest
}

/// S7: one period whose only variant points at a video `StreamId` that was
/// never pushed onto the manifest — a corrupt "ref invalid" reference the
/// fetch loop discovers only once it tries to resolve the stream.
pub fn dangling_stream_manifest(cdn: &FakeCdn) -> Manifest {
    let mut manifest = Manifest::new(TimelineConfig { duration: Some(60.0), ..TimelineConfig::default() });
    let segments: Vec<_> = (0..3).map(|i| (i as f64 * 10.0, (i + 1) as f64 * 10.0)).collect();

    // Push one real audio stream so the content type under test has a
    // sibling, then point the variant's video slot at a `StreamId` that was
    // never pushed (`manifest.stream(..)` returns `None` for it).
    let audio_id = manifest.push_stream(audio_stream(StreamId(0), &segments, &cdn.url("audio")));
    let dangling_video_id = StreamId(99);

    let variant_id = manifest.push_variant(Variant {
        id: manifest::VariantId(0),
        audio: Some(audio_id),
        video: Some(dangling_video_id),
        text: None,
        bandwidth: 2_000_000,
        drm_infos: Vec::new(),
        allowed_by_application: true,
        allowed_by_key_system: true,
    });

    manifest.push_period(Period { id: manifest::PeriodId(0), start: 0.0, variants: vec![variant_id], text_streams: Vec::new() });
    manifest
}

/// S6: one period, a single encrypted video track.
pub fn encrypted_video_manifest(cdn: &FakeCdn, key_id: &str) -> Manifest {
    let mut manifest = Manifest::new(TimelineConfig { duration: Some(60.0), ..TimelineConfig::default() });
    let segments: Vec<_> = (0..6).map(|i| (i as f64 * 10.0, (i + 1) as f64 * 10.0)).collect();

    let mut stream = video_stream(StreamId(0), &segments, &cdn.url("video"));
    stream.encrypted = true;
    stream.key_id = Some(key_id.to_string());
    let video_id = manifest.push_stream(stream);

    let variant_id = manifest.push_variant(Variant {
        id: manifest::VariantId(0),
        audio: None,
        video: Some(video_id),
        text: None,
        bandwidth: 2_000_000,
        drm_infos: Vec::new(),
        allowed_by_application: true,
        allowed_by_key_system: true,
    });

    manifest.push_period(Period { id: manifest::PeriodId(0), start: 0.0, variants: vec![variant_id], text_streams: Vec::new() });
    manifest
}
