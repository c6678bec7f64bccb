use crate::error::{EngineError, Severity};

/// The recovery action a fetch loop should take after a failed step, per
/// spec §4.H's failure-semantics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// HTTP transient / retryable network error: retry with back-off
    /// (already exhausted by `net`'s own retry budget before this point),
    /// then ABR-downgrade if retries are exhausted.
    RetryThenDowngrade,
    /// HTTP permanent (4xx other than 408/429) or a logical
    /// inconsistency: surface fatal.
    Fatal,
    /// Parse error: evict one segment and resume; fatal after a
    /// per-stream threshold.
    EvictAndResume,
    /// Sink `QUOTA_EXCEEDED`: remove a chunk from the buffer head, retry
    /// the same append once.
    EvictHeadAndRetryOnce,
    /// DRM missing key: hold the append until key-status becomes usable
    /// or the configured timeout elapses.
    HoldForKey,
}

/// Classifies `error` into the recovery action the fetch loop takes (spec
/// §4.H failure table).
pub fn classify(error: &EngineError) -> RecoveryAction {
    match error {
        EngineError::BadHttpStatus(net_err) if net_err.is_retryable() => RecoveryAction::RetryThenDowngrade,
        EngineError::BadHttpStatus(_) => RecoveryAction::Fatal,
        EngineError::MediaSourceFailed(media_source::MediaError::QuotaExceeded { .. }) => {
            RecoveryAction::EvictHeadAndRetryOnce
        }
        EngineError::MediaSourceFailed(_) => RecoveryAction::Fatal,
        EngineError::Manifest(_) => RecoveryAction::EvictAndResume,
        EngineError::KeyNotAvailable { .. } => RecoveryAction::HoldForKey,
        _ => RecoveryAction::Fatal,
    }
}

pub fn severity_for(action: RecoveryAction) -> Severity {
    match action {
        RecoveryAction::RetryThenDowngrade | RecoveryAction::EvictAndResume | RecoveryAction::EvictHeadAndRetryOnce => {
            Severity::Recoverable
        }
        RecoveryAction::Fatal => Severity::Critical,
        RecoveryAction::HoldForKey => Severity::Recoverable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net::NetworkError;

    #[test]
    fn quota_exceeded_evicts_head_and_retries_once() {
        let err = EngineError::MediaSourceFailed(media_source::MediaError::QuotaExceeded {
            content_type: manifest::ContentType::Video,
        });
        assert_eq!(classify(&err), RecoveryAction::EvictHeadAndRetryOnce);
    }

    #[test]
    fn retryable_http_status_downgrades_after_budget() {
        let err = EngineError::BadHttpStatus(NetworkError::http_status(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "https://example/seg.m4s".to_string(),
            "segment fetch",
        ));
        assert_eq!(classify(&err), RecoveryAction::RetryThenDowngrade);
    }

    #[test]
    fn permanent_http_status_is_fatal() {
        let err = EngineError::BadHttpStatus(NetworkError::http_status(
            reqwest::StatusCode::FORBIDDEN,
            "https://example/seg.m4s".to_string(),
            "segment fetch",
        ));
        assert_eq!(classify(&err), RecoveryAction::Fatal);
    }

    #[test]
    fn stream_reference_invalid_evicts_and_resumes() {
        let err = EngineError::Manifest(manifest::ManifestError::StreamReferenceInvalid { stream_id: 7 });
        assert_eq!(classify(&err), RecoveryAction::EvictAndResume);
    }

    #[test]
    fn key_not_available_holds_for_key() {
        let err = EngineError::KeyNotAvailable { key_id: "kid1".to_string() };
        assert_eq!(classify(&err), RecoveryAction::HoldForKey);
    }
}
