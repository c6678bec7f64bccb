use thiserror::Error;

/// DRM-category errors (spec §7: "DRM: `OFFLINE_SESSION_REMOVED`,
/// `LICENSE_REQUEST_FAILED`, `LICENSE_RESPONSE_REJECTED`, `KEY_NOT_GRANTED`,
/// `EXPIRED`").
#[derive(Debug, Error)]
pub enum DrmError {
    #[error("no configured key system could be initialized")]
    NoSupportedKeySystem,

    #[error("license request failed for key system {key_system}: {reason}")]
    LicenseRequestFailed { key_system: String, reason: String },

    #[error("license response rejected by session: {reason}")]
    LicenseResponseRejected { reason: String },

    #[error("key {key_id} was not granted usable status")]
    KeyNotGranted { key_id: String },

    #[error("session for key system {key_system} expired")]
    Expired { key_system: String },

    #[error("offline session {session_id} removed")]
    OfflineSessionRemoved { session_id: String },

    #[error("session operation attempted after close")]
    SessionClosed,

    #[error("network error while fetching license: {0}")]
    Network(#[from] net::NetworkError),
}

impl DrmError {
    pub fn category(&self) -> &'static str {
        "drm"
    }

    pub fn code(&self) -> &'static str {
        match self {
            DrmError::NoSupportedKeySystem => "KEY_NOT_GRANTED",
            DrmError::LicenseRequestFailed { .. } => "LICENSE_REQUEST_FAILED",
            DrmError::LicenseResponseRejected { .. } => "LICENSE_RESPONSE_REJECTED",
            DrmError::KeyNotGranted { .. } => "KEY_NOT_GRANTED",
            DrmError::Expired { .. } => "EXPIRED",
            DrmError::OfflineSessionRemoved { .. } => "OFFLINE_SESSION_REMOVED",
            DrmError::SessionClosed => "LICENSE_REQUEST_FAILED",
            DrmError::Network(_) => "LICENSE_REQUEST_FAILED",
        }
    }
}
