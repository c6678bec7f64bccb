use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use abr::{BandwidthEstimator, VariantChooser};
use drm::{Cdm, ClearKeyCdm, DrmConfig, DrmEngine, NetworkLicenseTransport};
use manifest::dash::DashParser;
use manifest::hls::HlsParser;
use manifest::{ContentType, ManifestParser, PlayerInterface};
use media_source::{MediaSink, MediaSourceEngine};
use net::NetworkEngine;
use play_head::PlayHeadController;
use presentation_timeline::{PresentationTimeline, SystemClock};
use streaming_engine::{EngineError, StepOutcome, StreamingEngine};
use text_engine::{NullDisplayer, TextEngine, TextParserRegistry, VttParser};

use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::events::{EventBus, PlayerEvent};
use crate::stats::PlayerStats;
use crate::tracks::{self, TextTrack, VariantTrack};

struct PlayerInterfaceImpl {
    network: Arc<NetworkEngine>,
    events: Arc<EventBus>,
}

impl PlayerInterface for PlayerInterfaceImpl {
    fn networking(&self) -> Arc<NetworkEngine> {
        self.network.clone()
    }

    fn on_timeline_region_added(&self, region: manifest::TimelineRegion) {
        self.events.emit(PlayerEvent::TimelineRegionAdded { start: region.start, end: region.end });
    }

    fn on_error(&self, error: &manifest::ManifestError) {
        self.events.emit(PlayerEvent::Error {
            category: error.category().to_string(),
            code: error.code().to_string(),
            message: error.to_string(),
        });
    }
}

struct LoadedState {
    engine: StreamingEngine,
    timeline: PresentationTimeline,
}

/// Player Orchestrator (spec §4.K): the public control surface wiring A-J
/// together. Owns the network engine and event bus for the process
/// lifetime; a media sink, manifest and per-type fetch loops come and go
/// with `attach`/`load`/`unload`.
pub struct Player {
    config: Mutex<PlayerConfig>,
    network: Arc<NetworkEngine>,
    events: Arc<EventBus>,
    sink: Mutex<Option<Arc<dyn MediaSink>>>,
    state: Mutex<Option<LoadedState>>,
    token: CancellationToken,
}

impl Player {
    pub fn new(config: PlayerConfig) -> Result<Self, PlayerError> {
        let network_config = net::NetworkConfig::default();
        let network = Arc::new(NetworkEngine::new(&network_config)?);
        Ok(Self {
            config: Mutex::new(config),
            network,
            events: Arc::new(EventBus::default()),
            sink: Mutex::new(None),
            state: Mutex::new(None),
            token: CancellationToken::new(),
        })
    }

    pub fn add_event_listener(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub async fn get_configuration(&self) -> PlayerConfig {
        self.config.lock().await.clone()
    }

    pub async fn configure(&self, config: PlayerConfig) {
        *self.config.lock().await = config;
    }

    /// Attaches a media sink (spec §4.K "attach to a media sink"). Must be
    /// called before `load`.
    pub async fn attach(&self, sink: Arc<dyn MediaSink>) {
        *self.sink.lock().await = Some(sink);
    }

    pub async fn detach(&self) {
        self.unload().await;
        *self.sink.lock().await = None;
    }

    /// Fetches and parses a manifest, selects an initial variant via ABR,
    /// initializes the media source for every active type, and starts the
    /// streaming engine (spec §4.K `load`).
    pub async fn load(&self, uri: &str, mime_type: &str) -> Result<(), PlayerError> {
        self.events.emit(PlayerEvent::Loading);

        let sink = self.sink.lock().await.clone().ok_or(PlayerError::NotAttached)?;
        let config = self.config.lock().await.clone();

        let player_interface: Arc<dyn PlayerInterface> = Arc::new(PlayerInterfaceImpl {
            network: self.network.clone(),
            events: self.events.clone(),
        });

        let mut parser: Box<dyn ManifestParser> = if is_hls(mime_type) {
            Box::new(HlsParser::new())
        } else {
            Box::new(DashParser::new())
        };
        let manifest = parser.start(uri, player_interface, self.token.clone()).await?;

        let clock = Arc::new(SystemClock);
        let timeline = PresentationTimeline::new(manifest.timeline.clone(), clock.clone());

        let bandwidth = BandwidthEstimator::new(config.abr.default_bandwidth_estimate);
        let mut chooser = VariantChooser::new(config.to_abr_config(), clock);

        let drm_engine = self.build_drm_engine(&config);
        let media_source = Arc::new(MediaSourceEngine::new(sink));

        let first_period = manifest.periods.first().ok_or(PlayerError::EmptyManifest)?;
        let estimate = bandwidth.get_estimate();
        let variants: Vec<_> = manifest.variants_in(first_period).cloned().collect();
        let initial_variant = chooser
            .choose(&manifest, &variants, estimate)
            .ok()
            .and_then(|id| manifest.variant(id).cloned());

        let mut active_types = Vec::new();
        if let Some(variant) = &initial_variant {
            if let Some(stream) = variant.audio.and_then(|id| manifest.stream(id)) {
                media_source.init(ContentType::Audio, &mime_codecs(stream)).await?;
                active_types.push(ContentType::Audio);
            }
            if let Some(stream) = variant.video.and_then(|id| manifest.stream(id)) {
                media_source.init(ContentType::Video, &mime_codecs(stream)).await?;
                active_types.push(ContentType::Video);
            }
        }
        if let Some(text_stream_id) = first_period.text_streams.first() {
            if let Some(stream) = manifest.stream(*text_stream_id) {
                media_source.init(ContentType::Text, &mime_codecs(stream)).await?;
                active_types.push(ContentType::Text);
            }
        }

        let mut text_registry = TextParserRegistry::new();
        text_registry.register("text/vtt", Box::new(VttParser));
        let text_engine = Some(TextEngine::new(text_registry, Arc::new(NullDisplayer)));

        let play_head = PlayHeadController::new(config.to_play_head_config());

        let engine = StreamingEngine::new(
            manifest,
            media_source,
            self.network.clone(),
            bandwidth,
            chooser,
            drm_engine,
            text_engine,
            play_head,
            config.to_streaming_config(),
            &active_types,
        );

        if let Some(stream) = initial_variant.as_ref().and_then(|v| v.audio) {
            engine.switch_stream(ContentType::Audio, stream).await;
        }
        if let Some(stream) = initial_variant.as_ref().and_then(|v| v.video) {
            engine.switch_stream(ContentType::Video, stream).await;
        }

        *self.state.lock().await = Some(LoadedState { engine, timeline });
        self.events.emit(PlayerEvent::TracksChanged);
        info!(uri, "player load complete");
        Ok(())
    }

    pub async fn unload(&self) {
        if self.state.lock().await.take().is_some() {
            self.events.emit(PlayerEvent::Unloading);
        }
    }

    fn build_drm_engine(&self, config: &PlayerConfig) -> Option<Arc<DrmEngine>> {
        if config.drm.clear_keys.is_empty() {
            return None;
        }
        let drm_config: DrmConfig = config.to_drm_config();
        let cdm: Arc<dyn Cdm> = Arc::new(ClearKeyCdm::new(&drm_config));
        let retry_parameters = net::RetryParameters {
            timeout: drm_config.license_request_timeout,
            ..net::RetryParameters::default()
        };
        let transport: Arc<dyn drm::LicenseTransport> =
            Arc::new(NetworkLicenseTransport::new(self.network.clone(), retry_parameters));
        Some(Arc::new(DrmEngine::new(vec![cdm], transport, drm_config)))
    }

    /// Runs one step of every active content type's fetch loop (spec
    /// §4.H's dataflow: "K starts H, which for each active type runs an
    /// independent fetch-append loop"). Intended to be called repeatedly
    /// by the host's scheduling loop (the CLI binary drives this on a
    /// timer).
    pub async fn tick(&self, current_time: f64) -> Result<Vec<(ContentType, StepOutcome)>, PlayerError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(PlayerError::NotLoaded)?;

        let mut outcomes = Vec::new();
        for (content_type, result) in state.engine.step_all(current_time, &self.token).await {
            match result {
                Ok(outcome) => outcomes.push((content_type, outcome)),
                Err(err) => {
                    self.emit_error(&err);
                    if matches!(err, EngineError::KeyNotAvailable { .. }) {
                        continue;
                    }
                    return Err(PlayerError::Engine(err));
                }
            }
        }

        let primary_type = if state.engine.active_stream(ContentType::Video).await.is_some() {
            ContentType::Video
        } else {
            ContentType::Audio
        };
        let is_at_end = state.timeline.duration().is_some_and(|d| current_time >= d);
        let transition = state.engine.update_buffering(primary_type, current_time, is_at_end).await;
        if transition != play_head::BufferingTransition::Unchanged {
            self.events.emit(PlayerEvent::Buffering { is_buffering: state.engine.is_buffering().await });
        }

        Ok(outcomes)
    }

    fn emit_error(&self, error: &EngineError) {
        warn!(category = error.category(), code = error.code(), "streaming engine error");
        self.events.emit(PlayerEvent::Error {
            category: error.category().to_string(),
            code: error.code().to_string(),
            message: error.to_string(),
        });
    }

    pub async fn seek(&self, target: f64) -> Result<f64, PlayerError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(PlayerError::NotLoaded)?;
        let position = state.engine.seek(target, &state.timeline, &self.token).await?;
        Ok(position)
    }

    pub async fn trick_play(&self, rate: f64) -> Result<(), PlayerError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(PlayerError::NotLoaded)?;
        state.engine.set_rate(rate).await;
        Ok(())
    }

    pub async fn cancel_trick_play(&self) -> Result<(), PlayerError> {
        self.trick_play(1.0).await
    }

    pub async fn select_variant_track(&self, variant_id: manifest::VariantId) -> Result<(), PlayerError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(PlayerError::NotLoaded)?;
        let manifest = state.engine.manifest().await;
        let variant = manifest.variant(variant_id).ok_or(PlayerError::UnknownTrack)?.clone();
        drop(manifest);
        if let Some(stream) = variant.audio {
            state.engine.switch_stream(ContentType::Audio, stream).await;
        }
        if let Some(stream) = variant.video {
            state.engine.switch_stream(ContentType::Video, stream).await;
        }
        self.events.emit(PlayerEvent::Adaptation { variant: variant_id });
        Ok(())
    }

    pub async fn select_text_track(&self, stream_id: manifest::StreamId) -> Result<(), PlayerError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(PlayerError::NotLoaded)?;
        state.engine.switch_stream(ContentType::Text, stream_id).await;
        Ok(())
    }

    pub async fn set_text_track_visibility(&self, visible: bool) {
        self.events.emit(PlayerEvent::TextTrackVisibility { visible });
    }

    pub async fn get_tracks(&self) -> Result<(Vec<VariantTrack>, Vec<TextTrack>), PlayerError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(PlayerError::NotLoaded)?;
        let manifest = state.engine.manifest().await;
        let active_variant = state.engine.active_variant().await;
        let active_text = state.engine.active_stream(ContentType::Text).await;

        let Some(period) = manifest.periods.first() else {
            return Ok((Vec::new(), Vec::new()));
        };

        let variant_tracks = manifest
            .variants_in(period)
            .map(|v| tracks::variant_track(&manifest, v, active_variant == Some(v.id)))
            .collect();

        let text_tracks = period
            .text_streams
            .iter()
            .filter_map(|id| manifest.stream(*id))
            .filter_map(|s| tracks::text_track(s, active_text == Some(s.id)))
            .collect();

        Ok((variant_tracks, text_tracks))
    }

    pub async fn get_stats(&self) -> Result<PlayerStats, PlayerError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(PlayerError::NotLoaded)?;
        let manifest = state.engine.manifest().await;
        let active_video = state.engine.active_stream(ContentType::Video).await.and_then(|id| manifest.stream(id));
        let seek_range = state.timeline.seek_range();
        Ok(PlayerStats {
            estimated_bandwidth: state.engine.bandwidth_estimate().await,
            width: active_video.and_then(|s| s.width),
            height: active_video.and_then(|s| s.height),
            buffering: state.engine.is_buffering().await,
            current_time: state.timeline.now(),
            seek_range_start: seek_range.start,
            seek_range_end: seek_range.end,
        })
    }
}

fn is_hls(mime_type: &str) -> bool {
    mime_type.contains("mpegurl")
}

fn mime_codecs(stream: &manifest::Stream) -> String {
    if stream.codecs.is_empty() {
        stream.mime_type.clone()
    } else {
        format!("{}; codecs=\"{}\"", stream.mime_type, stream.codecs)
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player").finish_non_exhaustive()
    }
}
