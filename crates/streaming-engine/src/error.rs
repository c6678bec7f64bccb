use thiserror::Error;

/// Severity per spec §7: recoverable errors surface as events without
/// stopping playback; critical errors stop the affected loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Critical,
}

/// Streaming-category error, carrying `{severity, category, code}` per
/// spec §7, folding in errors raised by every crate the fetch loop talks
/// to (the way the teacher folds `FlvError`/`reqwest::Error` into
/// `DownloadError` via `#[from]`).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bad http status fetching segment: {0}")]
    BadHttpStatus(#[from] net::NetworkError),

    #[error("segment does not exist at the requested position")]
    SegmentDoesNotExist,

    #[error("cannot switch codec mid-period: {reason}")]
    CannotSwitchCodec { reason: String },

    #[error("media source operation failed: {0}")]
    MediaSourceFailed(#[from] media_source::MediaError),

    #[error("manifest error: {0}")]
    Manifest(#[from] manifest::ManifestError),

    #[error("drm error: {0}")]
    Drm(#[from] drm::DrmError),

    #[error("key {key_id} not available within timeout")]
    KeyNotAvailable { key_id: String },

    #[error("no playable variant: {0}")]
    NoPlayableVariant(#[from] abr::AbrError),
}

impl EngineError {
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::BadHttpStatus(_) => "network",
            EngineError::MediaSourceFailed(_) => "media",
            EngineError::Manifest(_) => "manifest",
            EngineError::Drm(_) | EngineError::KeyNotAvailable { .. } => "drm",
            _ => "streaming",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::BadHttpStatus(_) => "BAD_HTTP_STATUS",
            EngineError::SegmentDoesNotExist => "SEGMENT_DOES_NOT_EXIST",
            EngineError::CannotSwitchCodec { .. } => "CANNOT_SWITCH_CODEC",
            EngineError::MediaSourceFailed(e) => e.code(),
            EngineError::Manifest(e) => e.code(),
            EngineError::Drm(e) => e.code(),
            EngineError::KeyNotAvailable { .. } => "KEY_NOT_AVAILABLE",
            EngineError::NoPlayableVariant(_) => "SEGMENT_DOES_NOT_EXIST",
        }
    }

    /// Propagation policy per spec §7: transient network errors and
    /// quota pressure recover locally; logical inconsistencies and
    /// unsupported switches are critical.
    pub fn severity(&self) -> Severity {
        match self {
            EngineError::BadHttpStatus(e) if e.is_retryable() => Severity::Recoverable,
            EngineError::MediaSourceFailed(media_source::MediaError::QuotaExceeded { .. }) => Severity::Recoverable,
            EngineError::KeyNotAvailable { .. } => Severity::Recoverable,
            EngineError::SegmentDoesNotExist => Severity::Critical,
            EngineError::CannotSwitchCodec { .. } => Severity::Critical,
            EngineError::MediaSourceFailed(_) => Severity::Critical,
            EngineError::Manifest(_) => Severity::Critical,
            EngineError::Drm(_) => Severity::Critical,
            EngineError::NoPlayableVariant(_) => Severity::Critical,
            EngineError::BadHttpStatus(_) => Severity::Critical,
        }
    }
}
