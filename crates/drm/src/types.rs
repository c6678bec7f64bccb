use std::collections::HashMap;
use std::time::Duration;

/// Per-key status, aggregated by the engine into a `keyId -> status` map
/// the ABR chooser consults (spec §4.D, §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyStatus {
    Usable,
    Expired,
    OutputRestricted,
    InternalError,
    Released,
    StatusPending,
    UsableInFuture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SessionType {
    Temporary,
    PersistentLicense,
}

/// `advanced{keySystem -> {...}}` entry (spec §6).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AdvancedKeySystemConfig {
    pub robustness: Option<String>,
    pub server_certificate: Option<Vec<u8>>,
    pub individualization_server: Option<String>,
    pub session_type: Option<SessionType>,
}

/// `drm` configuration surface, §6: `servers{keySystem→uri}`,
/// `clearKeys{kid→key}`, `advanced{...}`, `delayLicenseRequestUntilPlayed`.
#[derive(Debug, Clone, Default)]
pub struct DrmConfig {
    pub servers: HashMap<String, String>,
    pub clear_keys: HashMap<String, String>,
    pub advanced: HashMap<String, AdvancedKeySystemConfig>,
    pub delay_license_request_until_played: bool,
    pub preferred_key_systems: Vec<String>,
    pub license_request_timeout: Duration,
}

impl DrmConfig {
    pub fn new(preferred_key_systems: Vec<String>) -> Self {
        Self {
            preferred_key_systems,
            license_request_timeout: Duration::from_secs(10),
            ..Default::default()
        }
    }

    /// The clearkey key system name the supplemental in-process CDM
    /// registers under.
    pub const CLEARKEY_SYSTEM: &'static str = "org.w3.clearkey";
}
