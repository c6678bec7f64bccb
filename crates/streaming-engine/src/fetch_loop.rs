use std::sync::Arc;

use manifest::{ContentType, InitSegmentReference, Manifest, Period, SegmentReference, StreamId};
use net::{millis, NetworkEngine, NetworkRequest, RequestType};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StreamingConfig;
use crate::error::EngineError;

/// What a single fetch-loop step accomplished (spec §4.H, loop steps 1-8).
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// `bufferedAheadOf >= bufferingGoal`; nothing fetched this step.
    Slept,
    /// An init segment and/or a media segment was appended.
    Appended { position: u64, bytes: usize },
    /// `t_target` crossed into a new period; the loop reseeded onto
    /// `stream` before any append.
    PeriodTransitioned { stream: StreamId },
    /// Live content ran past the last known segment; caller should
    /// refresh the manifest before the next step.
    AwaitingManifestRefresh,
    /// The segment index has no more segments and the period/presentation
    /// has ended.
    EndOfStream,
    /// The init segment (if any) is appended, but the next media append is
    /// held because the governing DRM key is not yet `usable` (spec §4.F,
    /// S6).
    KeyPending,
}

/// Per-content-type fetch loop state (spec §4.H). Holds just enough to
/// resume the next step: which stream/period it is pulling from and what
/// init segment was last appended, so `appendInit` calls stay idempotent.
pub struct FetchLoop {
    pub content_type: ContentType,
    current_period: Option<manifest::PeriodId>,
    current_stream: Option<StreamId>,
    last_init: Option<Arc<InitSegmentReference>>,
    /// The active period's presentation-time start, added to every segment
    /// reference's period-local `timestampOffset`/`appendWindow` before it
    /// reaches the sink (spec §3 invariant: buffered range is anchored at
    /// `s.t0 + P.start + s.timestampOffset`).
    period_start: f64,
    consecutive_parse_errors: u32,
    parse_error_threshold: u32,
}

impl FetchLoop {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            current_period: None,
            current_stream: None,
            last_init: None,
            period_start: 0.0,
            consecutive_parse_errors: 0,
            parse_error_threshold: 3,
        }
    }

    pub fn current_stream(&self) -> Option<StreamId> {
        self.current_stream
    }

    /// ABR switch: the next step uses `stream` instead of the current
    /// one, and re-appends its init segment before the next media append
    /// (spec §4.H "Switching").
    pub fn switch_to(&mut self, stream: StreamId) {
        self.current_stream = Some(stream);
    }

    /// One iteration of the per-type fetch loop.
    #[allow(clippy::too_many_arguments)]
    pub async fn step(
        &mut self,
        manifest: &Manifest,
        media_source: &media_source::MediaSourceEngine,
        network: &NetworkEngine,
        bandwidth: &AsyncMutex<abr::BandwidthEstimator>,
        config: &StreamingConfig,
        current_time: f64,
        effective_rate: f64,
        select_stream_for_period: impl Fn(&Period, ContentType) -> Option<StreamId>,
        key_ready: bool,
        token: &CancellationToken,
    ) -> Result<StepOutcome, EngineError> {
        let buffered_ranges = media_source.buffered_range(self.content_type).await;
        let buffer_end = buffered_ranges.last().map(|(_, end)| *end);
        let t_target = current_time.max(buffer_end.unwrap_or(current_time));

        let buffered_ahead = media_source::buffered_ahead_of(&buffered_ranges, current_time);
        let buffering_goal = play_head::effective_buffering_goal(config.buffering_goal, effective_rate);
        if buffered_ahead >= buffering_goal {
            return Ok(StepOutcome::Slept);
        }

        let period = manifest.period_at(t_target).ok_or(EngineError::SegmentDoesNotExist)?;
        let crossed_period = self.current_period != Some(period.id);
        if crossed_period {
            let stream = select_stream_for_period(period, self.content_type).ok_or(EngineError::SegmentDoesNotExist)?;
            self.current_period = Some(period.id);
            self.current_stream = Some(stream);
            self.period_start = period.start;
            info!(?self.content_type, period = period.id.0, "fetch loop crossed period boundary");
            return Ok(StepOutcome::PeriodTransitioned { stream });
        }

        let stream_id = self.current_stream.ok_or(EngineError::SegmentDoesNotExist)?;
        let stream = manifest.stream(stream_id).ok_or_else(|| {
            EngineError::Manifest(manifest::ManifestError::StreamReferenceInvalid { stream_id: stream_id.0 })
        })?;

        let local_t = t_target - period.start;
        let position = match stream.segment_index.find(local_t) {
            Some(p) => p,
            None => {
                if stream.segment_index.last_position().is_some_and(|last| {
                    stream.segment_index.get(last).is_some_and(|s| local_t >= s.t1)
                }) {
                    return Ok(StepOutcome::AwaitingManifestRefresh);
                }
                return Ok(StepOutcome::EndOfStream);
            }
        };

        let segment = stream.segment_index.get(position).ok_or(EngineError::SegmentDoesNotExist)?.clone();

        if !segment.shares_init_segment_with(&self.last_init) {
            if let Some(init_ref) = &segment.init_segment {
                self.append_init_segment(media_source, network, config, init_ref, token).await?;
                self.last_init = Some(init_ref.clone());
            }
        }

        if !key_ready {
            debug!(?self.content_type, "fetch loop holding media append, key not usable");
            return Ok(StepOutcome::KeyPending);
        }

        let started = std::time::Instant::now();
        let bytes = self.fetch_segment_bytes(network, config, &segment, token).await?;
        let download_ms = millis(started.elapsed()).max(1);
        let len = bytes.len();

        let (window_start, window_end) = segment.append_window;
        media_source
            .append_buffer(
                self.content_type,
                bytes,
                segment.timestamp_offset + self.period_start,
                (window_start + self.period_start, window_end + self.period_start),
                token,
            )
            .await?;

        bandwidth.lock().await.sample(len as u64, download_ms);

        debug!(?self.content_type, position, bytes = len, "fetch loop appended segment");
        Ok(StepOutcome::Appended { position, bytes: len })
    }

    async fn append_init_segment(
        &self,
        media_source: &media_source::MediaSourceEngine,
        network: &NetworkEngine,
        config: &StreamingConfig,
        init_ref: &InitSegmentReference,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        let uri = init_ref.uris.first().ok_or(EngineError::SegmentDoesNotExist)?;
        let mut request = NetworkRequest::get(RequestType::Segment, uri.clone());
        if let Some((start, end)) = init_ref.byte_range {
            request = request.with_byte_range(start, Some(end));
        }
        let response = network.fetch(request, &config.retry_parameters, token).await?;
        media_source
            .append_init(self.content_type, response.body, token)
            .await?;
        Ok(())
    }

    async fn fetch_segment_bytes(
        &self,
        network: &NetworkEngine,
        config: &StreamingConfig,
        segment: &SegmentReference,
        token: &CancellationToken,
    ) -> Result<bytes::Bytes, EngineError> {
        let uri = segment.uris.first().ok_or(EngineError::SegmentDoesNotExist)?;
        let mut request = NetworkRequest::get(RequestType::Segment, uri.clone());
        if let Some((start, end)) = segment.byte_range {
            request = request.with_byte_range(start, Some(end));
        }
        let response = network.fetch(request, &config.retry_parameters, token).await?;
        Ok(response.body)
    }

    /// Eviction on `QUOTA_EXCEEDED` (spec §5, §4.H failure table):
    /// `remove([bufferStart, currentTime - evictionGoal])`.
    pub async fn evict_for_quota(
        &self,
        media_source: &media_source::MediaSourceEngine,
        current_time: f64,
        eviction_goal: f64,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        let Some(start) = media_source.buffer_start(self.content_type).await else {
            return Ok(());
        };
        let end = current_time - eviction_goal;
        if end > start {
            media_source.remove(self.content_type, start, end, token).await?;
        }
        Ok(())
    }

    /// Parse error recovery (spec §4.H "ref invalid: evict, resume"): the
    /// cached period/stream/init state is stale — most often because a
    /// manifest refresh dropped the stream this loop was pulling from —
    /// so the next `step` reselects a stream for the current position as
    /// if it had just crossed a period boundary.
    pub fn invalidate_stream(&mut self) {
        self.current_period = None;
        self.current_stream = None;
        self.last_init = None;
    }

    pub fn note_parse_error(&mut self) -> bool {
        self.consecutive_parse_errors += 1;
        self.consecutive_parse_errors >= self.parse_error_threshold
    }

    pub fn reset_parse_errors(&mut self) {
        self.consecutive_parse_errors = 0;
    }

    /// Seek handling (spec §4.H): clears state so the next `step` reseeds
    /// fresh, unless `still_buffered` (the type's buffer already covers
    /// the target, per `seekTolerance`).
    pub fn seek(&mut self, still_buffered: bool) {
        if !still_buffered {
            self.last_init = None;
        }
        warn!(?self.content_type, still_buffered, "fetch loop seek");
    }
}
