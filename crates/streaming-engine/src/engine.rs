use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use abr::{BandwidthEstimator, VariantChooser};
use drm::DrmEngine;
use manifest::{ContentType, Manifest, Period, StreamId, VariantId};
use media_source::MediaSourceEngine;
use net::NetworkEngine;
use play_head::{PlayHeadController, SeekOutcome};
use text_engine::TextEngine;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::StreamingConfig;
use crate::error::EngineError;
use crate::failure::{classify, RecoveryAction};
use crate::fetch_loop::{FetchLoop, StepOutcome};

/// The Streaming Engine (spec §4.H): owns one [`FetchLoop`] per active
/// content type and coordinates them against the manifest, media source,
/// network, ABR and (optionally) DRM and text engines.
pub struct StreamingEngine {
    manifest: RwLock<Manifest>,
    media_source: Arc<MediaSourceEngine>,
    network: Arc<NetworkEngine>,
    bandwidth: AsyncMutex<BandwidthEstimator>,
    chooser: AsyncMutex<VariantChooser>,
    drm: Option<Arc<DrmEngine>>,
    text_engine: Option<AsyncMutex<TextEngine>>,
    play_head: AsyncMutex<PlayHeadController>,
    config: StreamingConfig,
    loops: AsyncMutex<HashMap<ContentType, FetchLoop>>,
    /// When a type first started waiting on a non-`usable` key, for the
    /// `key_status_timeout` check (spec §4.F, S6).
    key_wait_started: AsyncMutex<HashMap<ContentType, Instant>>,
}

impl StreamingEngine {
    pub fn new(
        manifest: Manifest,
        media_source: Arc<MediaSourceEngine>,
        network: Arc<NetworkEngine>,
        bandwidth: BandwidthEstimator,
        chooser: VariantChooser,
        drm: Option<Arc<DrmEngine>>,
        text_engine: Option<TextEngine>,
        play_head: PlayHeadController,
        config: StreamingConfig,
        active_types: &[ContentType],
    ) -> Self {
        let mut loops = HashMap::new();
        for content_type in active_types {
            loops.insert(*content_type, FetchLoop::new(*content_type));
        }
        Self {
            manifest: RwLock::new(manifest),
            media_source,
            network,
            bandwidth: AsyncMutex::new(bandwidth),
            chooser: AsyncMutex::new(chooser),
            drm,
            text_engine: text_engine.map(AsyncMutex::new),
            play_head: AsyncMutex::new(play_head),
            config,
            loops: AsyncMutex::new(loops),
            key_wait_started: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Resolves whether `content_type`'s current stream may proceed past
    /// its next media append (spec §4.F, S6): unencrypted or keyless
    /// streams are always ready; encrypted streams wait for their key to
    /// report `usable`, and are held for at most `key_status_timeout`
    /// before `KEY_NOT_AVAILABLE` is surfaced.
    async fn drm_gate(&self, content_type: ContentType, manifest: &Manifest, stream_id: StreamId) -> Result<bool, EngineError> {
        let Some(drm) = &self.drm else { return Ok(true) };
        let Some(stream) = manifest.stream(stream_id) else { return Ok(true) };
        if !stream.encrypted {
            return Ok(true);
        }
        let Some(key_id) = &stream.key_id else { return Ok(true) };

        if drm.key_status(key_id).await == Some(drm::KeyStatus::Usable) {
            self.key_wait_started.lock().await.remove(&content_type);
            return Ok(true);
        }

        let mut waiters = self.key_wait_started.lock().await;
        let started = *waiters.entry(content_type).or_insert_with(Instant::now);
        if started.elapsed() >= self.config.key_status_timeout {
            return Err(EngineError::KeyNotAvailable { key_id: key_id.clone() });
        }
        Ok(false)
    }

    /// Runs one step of `content_type`'s fetch loop (spec §4.H loop
    /// steps 1-8). Period-boundary stream selection defers to ABR for
    /// audio/video and to the period's first text stream for text.
    pub async fn step(
        &self,
        content_type: ContentType,
        current_time: f64,
        token: &CancellationToken,
    ) -> Result<StepOutcome, EngineError> {
        let manifest = self.manifest.read().await;
        let mut loops = self.loops.lock().await;
        let fetch_loop = loops.get_mut(&content_type).ok_or(EngineError::SegmentDoesNotExist)?;

        let chosen_variant = self.current_variant_id(&manifest).await;
        let effective_rate = self.play_head.lock().await.playback_rate();

        let key_ready = match fetch_loop.current_stream() {
            Some(stream_id) => match self.drm_gate(content_type, &manifest, stream_id).await {
                Ok(ready) => ready,
                Err(err) => return Err(err),
            },
            None => true,
        };

        let outcome = fetch_loop
            .step(
                &manifest,
                &self.media_source,
                &self.network,
                &self.bandwidth,
                &self.config,
                current_time,
                effective_rate,
                |period: &Period, ct: ContentType| select_stream_for_period(&manifest, period, ct, chosen_variant),
                key_ready,
                token,
            )
            .await;

        match outcome {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.recover(content_type, fetch_loop, current_time, err, token).await,
        }
    }

    pub async fn active_types(&self) -> Vec<ContentType> {
        self.loops.lock().await.keys().copied().collect()
    }

    /// Runs one step for every active content type, in the style of
    /// the teacher's `coordinator.rs` driving one `fetcher`/`processor`
    /// pair per active stream each tick. Intended to be called
    /// repeatedly by a host scheduling loop (here, the CLI binary).
    pub async fn step_all(&self, current_time: f64, token: &CancellationToken) -> Vec<(ContentType, Result<StepOutcome, EngineError>)> {
        let mut results = Vec::new();
        for content_type in self.active_types().await {
            results.push((content_type, self.step(content_type, current_time, token).await));
        }
        results
    }

    pub async fn manifest(&self) -> tokio::sync::RwLockReadGuard<'_, Manifest> {
        self.manifest.read().await
    }

    pub async fn replace_manifest(&self, manifest: Manifest) {
        *self.manifest.write().await = manifest;
    }

    pub async fn bandwidth_estimate(&self) -> f64 {
        self.bandwidth.lock().await.get_estimate()
    }

    pub async fn set_rate(&self, rate: f64) {
        self.play_head.lock().await.set_rate(rate);
    }

    pub async fn effective_rate(&self) -> f64 {
        self.play_head.lock().await.effective_rate()
    }

    pub async fn is_buffering(&self) -> bool {
        self.play_head.lock().await.is_buffering()
    }

    pub async fn active_stream(&self, content_type: ContentType) -> Option<StreamId> {
        self.loops.lock().await.get(&content_type).and_then(FetchLoop::current_stream)
    }

    /// Explicit track selection (spec §4.K `selectVariantTrack`/
    /// `selectTextTrack`): bypasses ABR and points `content_type`'s loop
    /// directly at `stream`.
    pub async fn switch_stream(&self, content_type: ContentType, stream: StreamId) {
        if let Some(fetch_loop) = self.loops.lock().await.get_mut(&content_type) {
            fetch_loop.switch_to(stream);
        }
    }

    pub async fn buffered_ahead_of(&self, content_type: ContentType, t: f64) -> f64 {
        self.media_source.buffered_ahead_of(content_type, t).await
    }

    /// Re-evaluates buffering hysteresis (spec §4.G) from `primary_type`'s
    /// buffer fill at `t`.
    pub async fn update_buffering(&self, primary_type: ContentType, t: f64, is_at_end: bool) -> play_head::BufferingTransition {
        let buffered_ahead = self.buffered_ahead_of(primary_type, t).await;
        self.play_head.lock().await.update(buffered_ahead, is_at_end)
    }

    pub async fn active_variant(&self) -> Option<VariantId> {
        let manifest = self.manifest.read().await;
        self.current_variant_id(&manifest).await
    }

    async fn current_variant_id(&self, manifest: &Manifest) -> Option<VariantId> {
        let estimate = self.bandwidth.lock().await.get_estimate();
        let period = manifest.periods.first()?;
        let variants: Vec<_> = manifest.variants_in(period).cloned().collect();
        self.chooser.lock().await.choose(manifest, &variants, estimate).ok()
    }

    /// Re-evaluates ABR given the current bandwidth estimate and, if the
    /// chosen variant differs from what the audio/video loops are
    /// currently pulling from, switches them (spec §4.H "Switching").
    pub async fn maybe_switch_variant(&self, current_time: f64, safe_margin: f64, token: &CancellationToken) -> Result<Option<VariantId>, EngineError> {
        let manifest = self.manifest.read().await;
        let estimate = self.bandwidth.lock().await.get_estimate();
        let Some(period) = manifest.periods.first() else {
            return Ok(None);
        };
        let variants: Vec<_> = manifest.variants_in(period).cloned().collect();
        let variant_id = self.chooser.lock().await.choose(&manifest, &variants, estimate)?;
        let variant = manifest.variant(variant_id).ok_or(EngineError::SegmentDoesNotExist)?;

        let mut loops = self.loops.lock().await;
        let mut switched = false;
        for (content_type, stream_id) in [(ContentType::Audio, variant.audio), (ContentType::Video, variant.video)] {
            let Some(stream_id) = stream_id else { continue };
            if let Some(fetch_loop) = loops.get_mut(&content_type) {
                if fetch_loop.current_stream() != Some(stream_id) {
                    if safe_margin > 0.0 {
                        self.media_source
                            .remove(content_type, current_time + safe_margin, f64::INFINITY, token)
                            .await?;
                    }
                    fetch_loop.switch_to(stream_id);
                    switched = true;
                    info!(?content_type, variant = variant_id.0, "abr switched variant");
                }
            }
        }
        Ok(switched.then_some(variant_id))
    }

    /// Seek handling (spec §4.H, §4.G): clamps to `seekRange`, and for
    /// each active type either leaves its buffer (if it already covers
    /// the target) or clears it and restarts that loop at the target.
    pub async fn seek(&self, target: f64, timeline: &presentation_timeline::PresentationTimeline, token: &CancellationToken) -> Result<f64, EngineError> {
        let mut loops = self.loops.lock().await;
        let mut position = target;
        for (content_type, fetch_loop) in loops.iter_mut() {
            let buffered = self.media_source.buffered_range(*content_type).await;
            let outcome: SeekOutcome = self.play_head.lock().await.seek(target, timeline, &buffered);
            position = outcome.position;
            if outcome.needs_reseed {
                self.media_source.clear(*content_type, token).await?;
            }
            fetch_loop.seek(!outcome.needs_reseed);
        }
        Ok(position)
    }

    /// Failure recovery per spec §4.H's table: retry budget is already
    /// spent inside `net::retry_with_backoff`, so by the time an error
    /// reaches here it is either retried-via-ABR-downgrade, evicted, or
    /// fatal.
    async fn recover(
        &self,
        content_type: ContentType,
        fetch_loop: &mut FetchLoop,
        current_time: f64,
        err: EngineError,
        token: &CancellationToken,
    ) -> Result<StepOutcome, EngineError> {
        match classify(&err) {
            RecoveryAction::EvictHeadAndRetryOnce => {
                warn!(?content_type, "quota exceeded, evicting buffer head and retrying once");
                fetch_loop
                    .evict_for_quota(&self.media_source, current_time, self.config.eviction_goal, token)
                    .await?;
                Err(err)
            }
            RecoveryAction::EvictAndResume => {
                if fetch_loop.note_parse_error() {
                    Err(err)
                } else {
                    warn!(?content_type, "stream reference invalid, evicting and reselecting");
                    fetch_loop.invalidate_stream();
                    Ok(StepOutcome::Slept)
                }
            }
            RecoveryAction::HoldForKey => Err(err),
            RecoveryAction::RetryThenDowngrade | RecoveryAction::Fatal => Err(err),
        }
    }
}

fn select_stream_for_period(
    manifest: &Manifest,
    period: &Period,
    content_type: ContentType,
    preferred_variant: Option<VariantId>,
) -> Option<StreamId> {
    if content_type == ContentType::Text {
        return period.text_streams.first().copied();
    }

    let variant = preferred_variant
        .and_then(|id| manifest.variant(id))
        .filter(|v| period.variants.contains(&v.id))
        .or_else(|| manifest.variants_in(period).next())?;

    match content_type {
        ContentType::Audio => variant.audio,
        ContentType::Video => variant.video,
        ContentType::Text => None,
        ContentType::Image => None,
    }
}
