use std::collections::HashMap;
use std::sync::Arc;

use manifest::DrmInfo;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cdm::Cdm;
use crate::error::DrmError;
use crate::session::{DrmSession, SessionState};
use crate::transport::LicenseTransport;
use crate::types::{DrmConfig, KeyStatus, SessionId, SessionType};

/// Orchestrates key-system selection, CDM session lifecycle and license
/// requests (spec §4.F). Holds one [`DrmSession`] per opened content key,
/// and exposes the aggregated `keyId -> status` map the ABR chooser reads.
pub struct DrmEngine {
    cdms: HashMap<String, Arc<dyn Cdm>>,
    transport: Arc<dyn LicenseTransport>,
    config: DrmConfig,
    sessions: Mutex<HashMap<SessionId, DrmSession>>,
    next_id: Mutex<u64>,
}

impl DrmEngine {
    pub fn new(cdms: Vec<Arc<dyn Cdm>>, transport: Arc<dyn LicenseTransport>, config: DrmConfig) -> Self {
        let cdms = cdms.into_iter().map(|cdm| (cdm.key_system().to_string(), cdm)).collect();
        Self {
            cdms,
            transport,
            config,
            sessions: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
        }
    }

    /// Key-system selection (spec §4.F): tries every key system advertised
    /// by `drm_infos`, in `preferred_key_systems` order, returning the
    /// first one this engine has a registered [`Cdm`] for.
    pub fn select_key_system<'a>(&self, drm_infos: &'a [DrmInfo]) -> Option<&'a DrmInfo> {
        for preferred in &self.config.preferred_key_systems {
            if let Some(info) = drm_infos.iter().find(|info| &info.key_system == preferred) {
                if self.cdms.contains_key(&info.key_system) {
                    return Some(info);
                }
            }
        }
        drm_infos.iter().find(|info| self.cdms.contains_key(&info.key_system))
    }

    /// Opens a session for `drm_info`, runs the generate-request/license
    /// flow to completion, and returns the session id once key statuses
    /// have been aggregated (session may land `usable` or
    /// `output-restricted`).
    pub async fn open_session(
        &self,
        drm_info: &DrmInfo,
        persistent: bool,
        token: &CancellationToken,
    ) -> Result<SessionId, DrmError> {
        let cdm = self.cdms.get(&drm_info.key_system).cloned().ok_or(DrmError::NoSupportedKeySystem)?;
        let session_type = if persistent {
            SessionType::PersistentLicense
        } else {
            SessionType::Temporary
        };

        let id = cdm.create_session(session_type).await?;
        {
            let mut sessions = self.sessions.lock().await;
            let mut session = DrmSession::new(id, drm_info.key_system.clone(), session_type);
            session.begin_generating();
            sessions.insert(id, session);
        }

        let uri = self
            .config
            .servers
            .get(&drm_info.key_system)
            .or(drm_info.license_server_uri.as_ref())
            .ok_or_else(|| DrmError::LicenseRequestFailed {
                key_system: drm_info.key_system.clone(),
                reason: "no license server configured".to_string(),
            })?
            .clone();

        for entry in &drm_info.init_data {
            let message = cdm.generate_request(id, entry.init_data_type, &entry.data).await?;
            {
                let mut sessions = self.sessions.lock().await;
                if let Some(session) = sessions.get_mut(&id) {
                    session.message_emitted();
                }
            }

            let response = self
                .request_license_with_retry(&drm_info.key_system, &uri, message.request_body, token)
                .await?;

            let statuses = cdm.update(id, &response).await?;
            let mut sessions = self.sessions.lock().await;
            if let Some(session) = sessions.get_mut(&id) {
                session.license_accepted(statuses.clone());
                if session.state == SessionState::Usable {
                    info!(key_system = %drm_info.key_system, "drm session usable");
                } else {
                    warn!(key_system = %drm_info.key_system, "drm session output-restricted: no usable keys granted");
                }
            }

            for (key_id, status) in &statuses {
                if *status != KeyStatus::Usable {
                    return Err(DrmError::KeyNotGranted { key_id: key_id.clone() });
                }
            }
        }

        Ok(id)
    }

    /// Timeouts: license requests carry a configurable timeout; on
    /// timeout, one retry with back-off; then fail `LICENSE_REQUEST_FAILED`
    /// (spec §4.F).
    async fn request_license_with_retry(
        &self,
        key_system: &str,
        uri: &str,
        body: Vec<u8>,
        token: &CancellationToken,
    ) -> Result<Vec<u8>, DrmError> {
        let timeout = self.config.license_request_timeout;
        for attempt in 0..2u32 {
            let attempt_result = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(DrmError::LicenseRequestFailed {
                    key_system: key_system.to_string(),
                    reason: "cancelled".to_string(),
                }),
                result = tokio::time::timeout(timeout, self.transport.request_license(uri, body.clone(), token)) => result,
            };

            match attempt_result {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    if attempt == 0 {
                        debug!(key_system, error = %e, "license request failed, retrying once");
                        continue;
                    }
                    return Err(e);
                }
                Err(_elapsed) => {
                    if attempt == 0 {
                        debug!(key_system, "license request timed out, retrying once");
                        continue;
                    }
                    return Err(DrmError::LicenseRequestFailed {
                        key_system: key_system.to_string(),
                        reason: "timed out".to_string(),
                    });
                }
            }
        }
        unreachable!("loop always returns within two attempts")
    }

    /// Aggregated `keyId -> status` map across every open session (spec
    /// §4.F / §4.D input).
    pub async fn key_statuses(&self) -> HashMap<String, KeyStatus> {
        let sessions = self.sessions.lock().await;
        let mut merged = HashMap::new();
        for session in sessions.values() {
            merged.extend(session.key_statuses.clone());
        }
        merged
    }

    pub async fn key_status(&self, key_id: &str) -> Option<KeyStatus> {
        self.key_statuses().await.get(key_id).copied()
    }

    pub async fn mark_expired(&self, session: SessionId) {
        if let Some(s) = self.sessions.lock().await.get_mut(&session) {
            s.mark_expired();
        }
    }

    /// Any -> `closed` on `destroy()`.
    pub async fn close_session(&self, session: SessionId) -> Result<(), DrmError> {
        let key_system = {
            let mut sessions = self.sessions.lock().await;
            let Some(s) = sessions.get_mut(&session) else {
                return Ok(());
            };
            s.close();
            s.key_system.clone()
        };
        if let Some(cdm) = self.cdms.get(&key_system) {
            cdm.close(session).await?;
        }
        Ok(())
    }

    pub async fn close_all(&self) {
        let ids: Vec<SessionId> = self.sessions.lock().await.keys().copied().collect();
        for id in ids {
            let _ = self.close_session(id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdm::ClearKeyCdm;
    use async_trait::async_trait;
    use manifest::{InitDataEntry, InitDataType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct RespondingTransport;

    #[async_trait]
    impl LicenseTransport for RespondingTransport {
        async fn request_license(
            &self,
            _uri: &str,
            request_body: Vec<u8>,
            _token: &CancellationToken,
        ) -> Result<Vec<u8>, DrmError> {
            let parsed: serde_json::Value = serde_json::from_slice(&request_body).unwrap();
            let kids = parsed["kids"].as_array().unwrap().clone();
            let keys: Vec<_> = kids
                .iter()
                .map(|kid| serde_json::json!({ "kid": kid, "k": "unused" }))
                .collect();
            Ok(serde_json::to_vec(&serde_json::json!({ "keys": keys })).unwrap())
        }
    }

    struct FlakyThenOkTransport {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl LicenseTransport for FlakyThenOkTransport {
        async fn request_license(
            &self,
            _uri: &str,
            _request_body: Vec<u8>,
            _token: &CancellationToken,
        ) -> Result<Vec<u8>, DrmError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DrmError::LicenseRequestFailed {
                    key_system: "org.w3.clearkey".to_string(),
                    reason: "first attempt fails".to_string(),
                });
            }
            Ok(serde_json::to_vec(&serde_json::json!({ "keys": [] })).unwrap())
        }
    }

    fn clearkey_drm_info(key_id: &str) -> DrmInfo {
        DrmInfo {
            key_system: DrmConfig::CLEARKEY_SYSTEM.to_string(),
            license_server_uri: Some("https://license.example/clearkey".to_string()),
            init_data: vec![InitDataEntry {
                init_data_type: InitDataType::KeyIds,
                data: key_id.as_bytes().to_vec(),
                key_id: Some(key_id.to_string()),
            }],
            distinctive_identifier_required: false,
            persistent_state_required: false,
        }
    }

    #[tokio::test]
    async fn open_session_reaches_usable_on_granted_key() {
        let mut config = DrmConfig::new(vec![DrmConfig::CLEARKEY_SYSTEM.to_string()]);
        config.clear_keys.insert("deadbeef".to_string(), "00112233".to_string());
        let cdm: Arc<dyn Cdm> = Arc::new(ClearKeyCdm::new(&config));
        let engine = DrmEngine::new(vec![cdm], Arc::new(RespondingTransport), config);
        let token = CancellationToken::new();

        let info = clearkey_drm_info("kid1");
        let session = engine.open_session(&info, false, &token).await.unwrap();
        assert_eq!(engine.key_status("kid1").await, Some(KeyStatus::Usable));
        engine.close_session(session).await.unwrap();
    }

    #[tokio::test]
    async fn license_request_retries_once_then_succeeds() {
        let config = DrmConfig::new(vec![DrmConfig::CLEARKEY_SYSTEM.to_string()]);
        let cdm: Arc<dyn Cdm> = Arc::new(ClearKeyCdm::new(&config));
        let transport = Arc::new(FlakyThenOkTransport {
            attempts: AtomicUsize::new(0),
        });
        let engine = DrmEngine::new(vec![cdm], transport.clone(), config);
        let token = CancellationToken::new();

        let info = clearkey_drm_info("kid1");
        let err = engine.open_session(&info, false, &token).await.unwrap_err();
        assert!(matches!(err, DrmError::KeyNotGranted { .. }));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn select_key_system_prefers_configured_order() {
        let config = DrmConfig::new(vec![DrmConfig::CLEARKEY_SYSTEM.to_string()]);
        let cdm: Arc<dyn Cdm> = Arc::new(ClearKeyCdm::new(&config));
        let engine = DrmEngine::new(vec![cdm], Arc::new(RespondingTransport), config);

        let unsupported = DrmInfo {
            key_system: "com.example.unsupported".to_string(),
            ..clearkey_drm_info("kid1")
        };
        let infos = vec![unsupported, clearkey_drm_info("kid1")];
        let selected = engine.select_key_system(&infos).unwrap();
        assert_eq!(selected.key_system, DrmConfig::CLEARKEY_SYSTEM);
    }

    #[tokio::test(start_paused = true)]
    async fn license_request_times_out_then_fails_after_one_retry() {
        struct NeverRespondingTransport;
        #[async_trait]
        impl LicenseTransport for NeverRespondingTransport {
            async fn request_license(
                &self,
                _uri: &str,
                _request_body: Vec<u8>,
                _token: &CancellationToken,
            ) -> Result<Vec<u8>, DrmError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("never resolves within the test timeout")
            }
        }

        let mut config = DrmConfig::new(vec![DrmConfig::CLEARKEY_SYSTEM.to_string()]);
        config.license_request_timeout = Duration::from_millis(10);
        let cdm: Arc<dyn Cdm> = Arc::new(ClearKeyCdm::new(&config));
        let engine = DrmEngine::new(vec![cdm], Arc::new(NeverRespondingTransport), config);
        let token = CancellationToken::new();

        let info = clearkey_drm_info("kid1");
        let err = engine.open_session(&info, false, &token).await.unwrap_err();
        assert!(matches!(err, DrmError::LicenseRequestFailed { .. }));
    }
}
