//! DRM Engine (spec §4.F): key-system selection, CDM session lifecycle,
//! license requests and key-status aggregation.

mod cdm;
mod engine;
mod error;
mod session;
mod transport;
mod types;

pub use cdm::{Cdm, CdmMessage, ClearKeyCdm};
pub use engine::DrmEngine;
pub use error::DrmError;
pub use session::{DrmSession, SessionState};
pub use transport::{LicenseTransport, NetworkLicenseTransport};
pub use types::{AdvancedKeySystemConfig, DrmConfig, KeyStatus, SessionId, SessionType};
