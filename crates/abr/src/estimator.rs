/// A duration-weighted exponential moving average with a fixed half-life
/// (in seconds): a sample `weight` seconds old is weighted by
/// `0.5^(weight/half_life)` relative to one just taken.
#[derive(Debug, Clone, Copy)]
struct Ewma {
    alpha: f64,
    estimate: f64,
    total_weight: f64,
}

impl Ewma {
    fn new(half_life_seconds: f64) -> Self {
        Self {
            alpha: (-std::f64::consts::LN_2 / half_life_seconds).exp(),
            estimate: 0.0,
            total_weight: 0.0,
        }
    }

    fn sample(&mut self, weight: f64, value: f64) {
        let adjusted_alpha = self.alpha.powf(weight);
        let new_estimate = value * (1.0 - adjusted_alpha) + adjusted_alpha * self.estimate;
        self.estimate = if new_estimate.is_nan() { value } else { new_estimate };
        self.total_weight += weight;
    }

    fn estimate(&self) -> f64 {
        let zero_factor = 1.0 - self.alpha.powf(self.total_weight);
        if zero_factor > 0.0 {
            self.estimate / zero_factor
        } else {
            self.estimate
        }
    }
}

/// Exponential-weighted throughput estimate from completed transfers
/// (spec §4.C). Two averages (fast 2s half-life, slow 10s half-life) are
/// kept; the conservative (`max`) of the two is reported once the slow
/// average has enough samples to be trustworthy, biasing toward a lower
/// estimate only when both averages agree a drop happened.
pub struct BandwidthEstimator {
    fast: Ewma,
    slow: Ewma,
    sample_count: u32,
    default_estimate: f64,
    slow_trust_threshold_samples: u32,
    min_sample_duration_ms: u32,
}

impl BandwidthEstimator {
    pub fn new(default_estimate_bps: f64) -> Self {
        Self {
            fast: Ewma::new(2.0),
            slow: Ewma::new(10.0),
            sample_count: 0,
            default_estimate: default_estimate_bps,
            slow_trust_threshold_samples: 2,
            min_sample_duration_ms: 50,
        }
    }

    /// `sample(bytes, durationMs)`: ignores samples with `durationMs < 50`.
    pub fn sample(&mut self, bytes: u64, duration_ms: u64) {
        if duration_ms < self.min_sample_duration_ms as u64 {
            return;
        }
        let bandwidth_bps = 8000.0 * bytes as f64 / duration_ms as f64;
        let weight_seconds = duration_ms as f64 / 1000.0;
        self.fast.sample(weight_seconds, bandwidth_bps);
        self.slow.sample(weight_seconds, bandwidth_bps);
        self.sample_count += 1;
        tracing::debug!(bytes, duration_ms, bandwidth_bps, "bandwidth sample recorded");
    }

    pub fn get_estimate(&self) -> f64 {
        if self.sample_count == 0 {
            return self.default_estimate;
        }
        if self.sample_count >= self.slow_trust_threshold_samples {
            self.fast.estimate().max(self.slow.estimate())
        } else {
            self.fast.estimate()
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn reset(&mut self) {
        self.fast = Ewma::new(2.0);
        self.slow = Ewma::new(10.0);
        self.sample_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_tiny_duration_samples() {
        let mut estimator = BandwidthEstimator::new(1_000_000.0);
        estimator.sample(1_000, 10);
        assert_eq!(estimator.sample_count(), 0);
    }

    #[test]
    fn converges_to_constant_throughput_within_five_percent() {
        let mut estimator = BandwidthEstimator::new(1_000_000.0);
        // 1,000,000 bps for 1s chunks -> 125,000 bytes/sec.
        for _ in 0..20 {
            estimator.sample(125_000, 1_000);
        }
        let estimate = estimator.get_estimate();
        let target = 1_000_000.0;
        assert!(
            (estimate - target).abs() / target < 0.05,
            "estimate {estimate} not within 5% of {target}"
        );
    }

    #[test]
    fn reset_clears_samples_and_returns_default() {
        let mut estimator = BandwidthEstimator::new(500_000.0);
        estimator.sample(125_000, 1_000);
        estimator.reset();
        assert_eq!(estimator.get_estimate(), 500_000.0);
        assert_eq!(estimator.sample_count(), 0);
    }

    #[test]
    fn reacts_faster_to_a_sudden_drop_than_it_would_steady_state() {
        let mut estimator = BandwidthEstimator::new(1_000_000.0);
        for _ in 0..20 {
            estimator.sample(625_000, 1_000); // 5 Mbps
        }
        let before = estimator.get_estimate();
        for _ in 0..3 {
            estimator.sample(50_000, 1_000); // 400 kbps
        }
        let after = estimator.get_estimate();
        assert!(after < before);
    }
}
