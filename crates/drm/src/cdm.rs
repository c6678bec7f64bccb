use std::collections::HashMap;

use async_trait::async_trait;
use manifest::InitDataType;
use parking_lot::Mutex;

use crate::error::DrmError;
use crate::types::{DrmConfig, KeyStatus, SessionId, SessionType};

/// A `message` event emitted by a CDM session when it needs the
/// application to talk to a license server (spec §4.F: "CDM emits a
/// `message` containing a request body").
pub struct CdmMessage {
    pub request_body: Vec<u8>,
}

/// Content Decryption Module seam (spec §1, §4.F). A real binding would
/// wrap a platform CDM; the supplemental `ClearKeyCdm` below is a
/// concrete in-process implementation so the DRM pipeline is exercisable
/// without one (spec §6 `clearKeys`).
#[async_trait]
pub trait Cdm: Send + Sync {
    fn key_system(&self) -> &str;

    async fn create_session(&self, session_type: SessionType) -> Result<SessionId, DrmError>;

    /// Produces the license request for `init_data` of `init_data_type`,
    /// transitioning the session toward `awaiting-license`.
    async fn generate_request(
        &self,
        session: SessionId,
        init_data_type: InitDataType,
        init_data: &[u8],
    ) -> Result<CdmMessage, DrmError>;

    /// Feeds a license-server response to the session, returning the
    /// resulting `keyId -> status` map.
    async fn update(&self, session: SessionId, response: &[u8]) -> Result<HashMap<String, KeyStatus>, DrmError>;

    async fn close(&self, session: SessionId) -> Result<(), DrmError>;
}

/// An in-process ClearKey CDM: sessions track the requested key IDs, and
/// `update` grants `Usable` for any key ID present in the configured
/// `clearKeys` map (spec §6), `InternalError` otherwise.
pub struct ClearKeyCdm {
    clear_keys: HashMap<String, String>,
    sessions: Mutex<HashMap<SessionId, Vec<String>>>,
    next_id: Mutex<u64>,
}

impl ClearKeyCdm {
    pub fn new(config: &DrmConfig) -> Self {
        Self {
            clear_keys: config.clear_keys.clone(),
            sessions: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
        }
    }
}

#[async_trait]
impl Cdm for ClearKeyCdm {
    fn key_system(&self) -> &str {
        DrmConfig::CLEARKEY_SYSTEM
    }

    async fn create_session(&self, _session_type: SessionType) -> Result<SessionId, DrmError> {
        let mut next_id = self.next_id.lock();
        let id = SessionId(*next_id);
        *next_id += 1;
        self.sessions.lock().insert(id, Vec::new());
        Ok(id)
    }

    async fn generate_request(
        &self,
        session: SessionId,
        init_data_type: InitDataType,
        init_data: &[u8],
    ) -> Result<CdmMessage, DrmError> {
        if init_data_type != InitDataType::KeyIds {
            tracing::debug!(?init_data_type, "clearkey CDM treats non-keyids init data as opaque kid list");
        }
        let kids: Vec<String> = String::from_utf8_lossy(init_data)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        self.sessions
            .lock()
            .get_mut(&session)
            .ok_or(DrmError::SessionClosed)?
            .extend(kids.iter().cloned());

        let body = serde_json::json!({ "kids": kids, "type": "temporary" });
        Ok(CdmMessage {
            request_body: serde_json::to_vec(&body).expect("json serialization never fails here"),
        })
    }

    async fn update(&self, session: SessionId, response: &[u8]) -> Result<HashMap<String, KeyStatus>, DrmError> {
        let requested = self
            .sessions
            .lock()
            .get(&session)
            .cloned()
            .ok_or(DrmError::SessionClosed)?;

        let parsed: serde_json::Value = serde_json::from_slice(response).map_err(|e| DrmError::LicenseResponseRejected {
            reason: e.to_string(),
        })?;

        let granted_kids: Vec<String> = parsed
            .get("keys")
            .and_then(|k| k.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.get("kid").and_then(|k| k.as_str()).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut statuses = HashMap::new();
        for kid in &requested {
            let status = if granted_kids.contains(kid) {
                KeyStatus::Usable
            } else {
                KeyStatus::InternalError
            };
            statuses.insert(kid.clone(), status);
        }
        Ok(statuses)
    }

    async fn close(&self, session: SessionId) -> Result<(), DrmError> {
        self.sessions.lock().remove(&session);
        Ok(())
    }
}
