use thiserror::Error;

/// Manifest-category errors per spec §7.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid HLS tag: {tag}")]
    InvalidHlsTag { tag: String },

    #[error("HLS playlist header missing")]
    HlsPlaylistHeaderMissing,

    #[error("invalid HLS playlist hierarchy: {reason}")]
    HlsInvalidPlaylistHierarchy { reason: String },

    #[error("DASH representation has no segment info: {representation_id}")]
    DashNoSegmentInfo { representation_id: String },

    #[error("unknown MIME type: {mime_type}")]
    UnknownMimeType { mime_type: String },

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error(transparent)]
    Network(#[from] net::NetworkError),

    #[error("patch-MPD target not found: {xpath}")]
    PatchTargetNotFound { xpath: String },

    #[error("stream {stream_id} is no longer present in the manifest")]
    StreamReferenceInvalid { stream_id: u32 },
}

impl ManifestError {
    pub fn category(&self) -> &'static str {
        "manifest"
    }

    pub fn code(&self) -> &'static str {
        match self {
            ManifestError::InvalidHlsTag { .. } => "INVALID_HLS_TAG",
            ManifestError::HlsPlaylistHeaderMissing => "HLS_PLAYLIST_HEADER_MISSING",
            ManifestError::HlsInvalidPlaylistHierarchy { .. } => "HLS_INVALID_PLAYLIST_HIERARCHY",
            ManifestError::DashNoSegmentInfo { .. } => "DASH_NO_SEGMENT_INFO",
            ManifestError::UnknownMimeType { .. } => "UNKNOWN_MIME_TYPE",
            ManifestError::Xml(_) => "DASH_NO_SEGMENT_INFO",
            ManifestError::Network(_) => "HTTP_ERROR",
            ManifestError::PatchTargetNotFound { .. } => "DASH_NO_SEGMENT_INFO",
            ManifestError::StreamReferenceInvalid { .. } => "STREAM_REFERENCE_INVALID",
        }
    }
}
