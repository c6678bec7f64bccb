use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use abr::AbrConfig;
use drm::{AdvancedKeySystemConfig, DrmConfig};
use play_head::PlayHeadConfig;
use streaming_engine::StreamingConfig;

/// The aggregated `streaming`/`abr`/`drm`/`preferences` configuration
/// surface (spec §6), serializable to/from TOML the way the teacher's
/// `strev-cli` persists its config with `confy`/`toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub streaming: StreamingSection,
    pub abr: AbrSection,
    pub drm: DrmSection,
    pub preferences: Preferences,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            streaming: StreamingSection::default(),
            abr: AbrSection::default(),
            drm: DrmSection::default(),
            preferences: Preferences::default(),
        }
    }
}

impl PlayerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn to_streaming_config(&self) -> StreamingConfig {
        StreamingConfig {
            buffering_goal: self.streaming.buffering_goal,
            rebuffering_goal: self.streaming.rebuffering_goal,
            buffer_behind: self.streaming.buffer_behind,
            eviction_goal: self.streaming.eviction_goal,
            retry_parameters: net::RetryParameters {
                max_attempts: self.streaming.retry_max_attempts,
                base_delay: Duration::from_millis(self.streaming.retry_base_delay_ms),
                fuzz_factor: self.streaming.retry_fuzz_factor,
                backoff_factor: self.streaming.retry_backoff_factor,
                timeout: Duration::from_millis(self.streaming.retry_timeout_ms),
            },
            stall_enabled: self.streaming.stall_enabled,
            stall_threshold: self.streaming.stall_threshold,
            stall_skip: self.streaming.stall_skip,
            start_at_segment_boundary: self.streaming.start_at_segment_boundary,
            ignore_text_stream_failures: self.streaming.ignore_text_stream_failures,
            key_status_timeout: Duration::from_millis(self.streaming.key_status_timeout_ms),
            max_segment_duration: self.streaming.max_segment_duration,
        }
    }

    pub fn to_play_head_config(&self) -> PlayHeadConfig {
        PlayHeadConfig {
            buffering_goal: self.streaming.buffering_goal,
            rebuffering_goal: self.streaming.rebuffering_goal,
        }
    }

    pub fn to_abr_config(&self) -> AbrConfig {
        AbrConfig {
            min_bandwidth: self.abr.restrictions.min_bandwidth,
            max_bandwidth: self.abr.restrictions.max_bandwidth,
            min_height: self.abr.restrictions.min_height,
            max_height: self.abr.restrictions.max_height,
            min_pixels: self.abr.restrictions.min_pixels,
            max_pixels: self.abr.restrictions.max_pixels,
            min_frame_rate: self.abr.restrictions.min_frame_rate,
            max_frame_rate: self.abr.restrictions.max_frame_rate,
            bandwidth_upgrade_target: self.abr.bandwidth_upgrade_target,
            bandwidth_downgrade_target: self.abr.bandwidth_downgrade_target,
            switch_interval: self.abr.switch_interval,
            preferred_video_codecs: self.preferences.preferred_video_codecs.clone(),
            preferred_audio_codecs: self.preferences.preferred_audio_codecs.clone(),
        }
    }

    pub fn to_drm_config(&self) -> DrmConfig {
        let mut config = DrmConfig::new(self.drm.preferred_key_systems.clone());
        config.servers = self.drm.servers.clone();
        config.clear_keys = self.drm.clear_keys.clone();
        config.advanced = self.drm.advanced.clone();
        config.delay_license_request_until_played = self.drm.delay_license_request_until_played;
        config.license_request_timeout = Duration::from_millis(self.drm.license_request_timeout_ms);
        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSection {
    pub buffering_goal: f64,
    pub rebuffering_goal: f64,
    pub buffer_behind: f64,
    pub eviction_goal: f64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_fuzz_factor: f64,
    pub retry_backoff_factor: f64,
    pub retry_timeout_ms: u64,
    pub stall_enabled: bool,
    pub stall_threshold: f64,
    pub stall_skip: f64,
    pub start_at_segment_boundary: bool,
    pub ignore_text_stream_failures: bool,
    pub key_status_timeout_ms: u64,
    pub max_segment_duration: f64,
}

impl Default for StreamingSection {
    fn default() -> Self {
        let defaults = StreamingConfig::default();
        Self {
            buffering_goal: defaults.buffering_goal,
            rebuffering_goal: defaults.rebuffering_goal,
            buffer_behind: defaults.buffer_behind,
            eviction_goal: defaults.eviction_goal,
            retry_max_attempts: defaults.retry_parameters.max_attempts,
            retry_base_delay_ms: defaults.retry_parameters.base_delay.as_millis() as u64,
            retry_fuzz_factor: defaults.retry_parameters.fuzz_factor,
            retry_backoff_factor: defaults.retry_parameters.backoff_factor,
            retry_timeout_ms: defaults.retry_parameters.timeout.as_millis() as u64,
            stall_enabled: defaults.stall_enabled,
            stall_threshold: defaults.stall_threshold,
            stall_skip: defaults.stall_skip,
            start_at_segment_boundary: defaults.start_at_segment_boundary,
            ignore_text_stream_failures: defaults.ignore_text_stream_failures,
            key_status_timeout_ms: defaults.key_status_timeout.as_millis() as u64,
            max_segment_duration: defaults.max_segment_duration,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AbrRestrictions {
    pub min_bandwidth: Option<u64>,
    pub max_bandwidth: Option<u64>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    pub min_pixels: Option<u64>,
    pub max_pixels: Option<u64>,
    pub min_frame_rate: Option<f64>,
    pub max_frame_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbrSection {
    pub enabled: bool,
    pub use_network_information: bool,
    pub default_bandwidth_estimate: f64,
    pub restrictions: AbrRestrictions,
    pub switch_interval: f64,
    pub bandwidth_upgrade_target: f64,
    pub bandwidth_downgrade_target: f64,
}

impl Default for AbrSection {
    fn default() -> Self {
        let defaults = AbrConfig::default();
        Self {
            enabled: true,
            use_network_information: false,
            default_bandwidth_estimate: 1_000_000.0,
            restrictions: AbrRestrictions::default(),
            switch_interval: defaults.switch_interval,
            bandwidth_upgrade_target: defaults.bandwidth_upgrade_target,
            bandwidth_downgrade_target: defaults.bandwidth_downgrade_target,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrmSection {
    pub servers: HashMap<String, String>,
    pub clear_keys: HashMap<String, String>,
    pub advanced: HashMap<String, AdvancedKeySystemConfig>,
    pub delay_license_request_until_played: bool,
    pub preferred_key_systems: Vec<String>,
    pub license_request_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub preferred_audio_language: Option<String>,
    pub preferred_text_language: Option<String>,
    pub preferred_audio_channel_count: Option<u32>,
    pub preferred_video_codecs: Vec<String>,
    pub preferred_audio_codecs: Vec<String>,
}
