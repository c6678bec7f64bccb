use net::RetryParameters;

/// The `streaming` config surface (spec §6).
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    pub buffering_goal: f64,
    pub rebuffering_goal: f64,
    pub buffer_behind: f64,
    pub eviction_goal: f64,
    pub retry_parameters: RetryParameters,
    pub stall_enabled: bool,
    pub stall_threshold: f64,
    pub stall_skip: f64,
    pub start_at_segment_boundary: bool,
    pub ignore_text_stream_failures: bool,
    /// How long a segment append may be held waiting for a DRM key to
    /// become `usable` before `KEY_NOT_AVAILABLE` is surfaced (spec §4.F,
    /// S6).
    pub key_status_timeout: std::time::Duration,
    /// `maxSegmentDuration`, used to size the per-type memory budget and
    /// as the eviction chunk on `QUOTA_EXCEEDED` (spec §5, failure table).
    pub max_segment_duration: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            buffering_goal: 10.0,
            rebuffering_goal: 2.0,
            buffer_behind: 30.0,
            eviction_goal: 5.0,
            retry_parameters: RetryParameters::default(),
            stall_enabled: true,
            stall_threshold: 1.0,
            stall_skip: 0.1,
            start_at_segment_boundary: true,
            ignore_text_stream_failures: true,
            key_status_timeout: std::time::Duration::from_secs(5),
            max_segment_duration: 12.0,
        }
    }
}
