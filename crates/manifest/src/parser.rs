use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ManifestError;
use crate::model::Manifest;

/// Callbacks the host/orchestrator exposes to a parser (spec §4.I:
/// "Player interface exposes: networking, `filter(manifest)`,
/// `makeTextStreamsForClosedCaptions(manifest)`, `onTimelineRegionAdded`,
/// `onEvent`, `onError`, `isLowLatencyMode()`, `updateDuration()`").
///
/// Default method bodies are no-ops so concrete player implementations
/// only need to override what they use, matching the registry-of-optional-
/// hooks shape the teacher's coordinator takes with its event channel.
pub trait PlayerInterface: Send + Sync {
    fn networking(&self) -> Arc<net::NetworkEngine>;

    /// Lets the host rewrite the manifest after parsing (e.g. to inject
    /// closed-caption streams it derives out-of-band).
    fn filter(&self, _manifest: &mut Manifest) {}

    fn on_timeline_region_added(&self, _region: TimelineRegion) {}

    fn on_event(&self, _event: ManifestEvent) {}

    fn on_error(&self, _error: &ManifestError) {}

    fn is_low_latency_mode(&self) -> bool {
        false
    }

    fn update_duration(&self, _duration: Option<f64>) {}
}

#[derive(Debug, Clone)]
pub struct TimelineRegion {
    pub scheme_id_uri: String,
    pub start: f64,
    pub end: f64,
    pub event_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ManifestEvent {
    Refreshed,
    ExpirationUpdated { session_id: String, new_expiration: f64 },
}

/// Spec §4.I: `start`, `stop`, `update` (live), `onExpirationUpdated`.
#[async_trait]
pub trait ManifestParser: Send + Sync {
    async fn start(
        &mut self,
        uri: &str,
        player: Arc<dyn PlayerInterface>,
        token: CancellationToken,
    ) -> Result<Manifest, ManifestError>;

    async fn stop(&mut self);

    /// Refreshes a live manifest, applying the update to `manifest` in place.
    async fn update(&mut self, manifest: &mut Manifest) -> Result<(), ManifestError>;

    fn on_expiration_updated(&mut self, _session_id: &str, _new_expiration: f64) {}
}
