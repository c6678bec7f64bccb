/// Snapshot returned by `getStats` (spec §4.K), assembled from the
/// bandwidth estimator, play head and DRM engine at call time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStats {
    pub estimated_bandwidth: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub buffering: bool,
    pub current_time: f64,
    pub seek_range_start: f64,
    pub seek_range_end: f64,
}
