use std::sync::Arc;

use manifest::{Manifest, Variant, VariantId};
use presentation_timeline::Clock;

/// Configuration enumerated in spec §4.D.
#[derive(Debug, Clone)]
pub struct AbrConfig {
    pub min_bandwidth: Option<u64>,
    pub max_bandwidth: Option<u64>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    pub min_pixels: Option<u64>,
    pub max_pixels: Option<u64>,
    pub min_frame_rate: Option<f64>,
    pub max_frame_rate: Option<f64>,
    pub bandwidth_upgrade_target: f64,
    pub bandwidth_downgrade_target: f64,
    pub switch_interval: f64,
    pub preferred_video_codecs: Vec<String>,
    pub preferred_audio_codecs: Vec<String>,
}

impl Default for AbrConfig {
    fn default() -> Self {
        Self {
            min_bandwidth: None,
            max_bandwidth: None,
            min_height: None,
            max_height: None,
            min_pixels: None,
            max_pixels: None,
            min_frame_rate: None,
            max_frame_rate: None,
            bandwidth_upgrade_target: 0.85,
            bandwidth_downgrade_target: 0.95,
            switch_interval: 1.0,
            preferred_video_codecs: Vec::new(),
            preferred_audio_codecs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AbrError {
    #[error("no playable variants in the current ABR variant set")]
    NoPlayableVariants,
}

/// Restriction info surfaced to the engine on `NoPlayableVariants`
/// (spec §4.D: "engine surfaces restriction info").
#[derive(Debug, Clone, Default)]
pub struct RestrictionInfo {
    pub missing_keys: bool,
    pub app_restricted: bool,
    pub key_status_restricted: bool,
}

/// Picks one variant from candidates given bandwidth, restrictions and
/// preferences (spec §4.D). Deterministic and idempotent given identical
/// inputs: the only mutable state is which variant is "current" and when
/// the last switch happened, both needed to implement the hysteresis rule.
pub struct VariantChooser {
    config: AbrConfig,
    clock: Arc<dyn Clock>,
    current: Option<VariantId>,
    last_switch_time: Option<f64>,
}

impl VariantChooser {
    pub fn new(config: AbrConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            current: None,
            last_switch_time: None,
        }
    }

    pub fn current(&self) -> Option<VariantId> {
        self.current
    }

    fn passes_restrictions(&self, variant: &Variant, manifest: &Manifest) -> bool {
        if !variant.is_playable() {
            return false;
        }
        if let Some(min) = self.config.min_bandwidth {
            if variant.bandwidth < min {
                return false;
            }
        }
        if let Some(max) = self.config.max_bandwidth {
            if variant.bandwidth > max {
                return false;
            }
        }
        if let Some(video_id) = variant.video {
            if let Some(video) = manifest.stream(video_id) {
                if let Some(min) = self.config.min_height {
                    if video.height.is_some_and(|h| h < min) {
                        return false;
                    }
                }
                if let Some(max) = self.config.max_height {
                    if video.height.is_some_and(|h| h > max) {
                        return false;
                    }
                }
                if let Some(min) = self.config.min_pixels {
                    if video.pixels().is_some_and(|p| p < min) {
                        return false;
                    }
                }
                if let Some(max) = self.config.max_pixels {
                    if video.pixels().is_some_and(|p| p > max) {
                        return false;
                    }
                }
                if let Some(min) = self.config.min_frame_rate {
                    if video.frame_rate.is_some_and(|f| f < min) {
                        return false;
                    }
                }
                if let Some(max) = self.config.max_frame_rate {
                    if video.frame_rate.is_some_and(|f| f > max) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Tie-break order: higher bandwidth ≤ cap > higher resolution >
    /// preferred codec > stable order from manifest (first encountered
    /// wins remaining ties, since `fold` only replaces on strict `>`).
    fn pick_best<'a>(&self, candidates: &[&'a Variant], manifest: &'a Manifest) -> Option<&'a Variant> {
        candidates.iter().copied().fold(None, |best, v| match best {
            None => Some(v),
            Some(current_best) => {
                if self.rank(v, manifest) > self.rank(current_best, manifest) {
                    Some(v)
                } else {
                    Some(current_best)
                }
            }
        })
    }

    fn rank(&self, variant: &Variant, manifest: &Manifest) -> (u64, u64, u8) {
        let pixels = variant
            .video
            .and_then(|id| manifest.stream(id))
            .and_then(|s| s.pixels())
            .unwrap_or(0);
        let codec_matches = variant
            .video
            .and_then(|id| manifest.stream(id))
            .map(|s| self.config.preferred_video_codecs.iter().any(|c| s.codecs.contains(c)))
            .unwrap_or(false);
        (variant.bandwidth, pixels, codec_matches as u8)
    }

    /// Returns the chosen variant given the current bandwidth estimate, or
    /// `NoPlayableVariants` if every candidate fails restrictions.
    pub fn choose(&mut self, manifest: &Manifest, variants: &[Variant], bandwidth_estimate: f64) -> Result<VariantId, AbrError> {
        let filtered: Vec<&Variant> = variants
            .iter()
            .filter(|v| self.passes_restrictions(v, manifest))
            .collect();
        if filtered.is_empty() {
            return Err(AbrError::NoPlayableVariants);
        }

        let now = self.clock.now_seconds();
        let affordable: Vec<&Variant> = filtered
            .iter()
            .copied()
            .filter(|v| v.bandwidth as f64 <= bandwidth_estimate * self.config.bandwidth_upgrade_target)
            .collect();
        let candidate = self
            .pick_best(&affordable, manifest)
            .or_else(|| self.pick_cheapest(&filtered))
            .expect("filtered is non-empty");

        let Some(current_id) = self.current else {
            self.current = Some(candidate.id);
            self.last_switch_time = Some(now);
            return Ok(candidate.id);
        };

        let current_variant = filtered.iter().find(|v| v.id == current_id).copied();
        let Some(current_variant) = current_variant else {
            // The previously chosen variant no longer passes restrictions;
            // switch unconditionally (hysteresis only governs bandwidth-
            // driven switches, not forced evictions).
            self.current = Some(candidate.id);
            self.last_switch_time = Some(now);
            return Ok(candidate.id);
        };

        if candidate.id == current_variant.id {
            return Ok(current_id);
        }

        let interval_elapsed = self
            .last_switch_time
            .is_none_or(|t| now - t >= self.config.switch_interval);

        let should_switch = if candidate.bandwidth > current_variant.bandwidth {
            interval_elapsed && bandwidth_estimate >= candidate.bandwidth as f64 / self.config.bandwidth_upgrade_target
        } else {
            interval_elapsed && bandwidth_estimate <= current_variant.bandwidth as f64 * self.config.bandwidth_downgrade_target
        };

        if should_switch {
            self.current = Some(candidate.id);
            self.last_switch_time = Some(now);
            Ok(candidate.id)
        } else {
            Ok(current_id)
        }
    }

    fn pick_cheapest<'a>(&self, candidates: &[&'a Variant]) -> Option<&'a Variant> {
        candidates
            .iter()
            .copied()
            .min_by_key(|v| v.bandwidth)
    }
}
