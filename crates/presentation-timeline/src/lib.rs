//! Presentation Timeline (spec §4.A): the canonical mapping from wall-clock
//! to presentation time, and the live availability/seek windows derived
//! from it.

mod clock;

use std::sync::Arc;

pub use clock::{Clock, SystemClock, TestClock};

/// A closed interval `[start, end]` of presentation time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Parameters fixed at manifest-parse time; distinct from the `Clock`
/// dependency so a timeline can be rebuilt on manifest refresh without
/// discarding the injected clock.
#[derive(Debug, Clone)]
pub struct TimelineConfig {
    /// `None` means infinite (live, no announced duration).
    pub duration: Option<f64>,
    pub is_live: bool,
    /// How far back live segments remain fetchable from the live edge.
    pub segment_availability_duration: Option<f64>,
    /// Safety margin subtracted from the live edge for `seekRange.end`.
    pub live_edge_safety_margin: f64,
    /// Presentation start offset: wall-clock seconds corresponding to
    /// presentation time zero. Only meaningful when `is_live`.
    pub availability_start_time: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            duration: Some(0.0),
            is_live: false,
            segment_availability_duration: None,
            live_edge_safety_margin: 0.0,
            availability_start_time: 0.0,
        }
    }
}

/// Implements the operations of spec §4.A.
pub struct PresentationTimeline {
    config: TimelineConfig,
    clock: Arc<dyn Clock>,
    /// Set via `offset()`; shifts the computed live-edge position.
    presentation_offset: f64,
}

impl PresentationTimeline {
    pub fn new(config: TimelineConfig, clock: Arc<dyn Clock>) -> Self {
        assert!(
            config.is_live || config.duration.is_some(),
            "VOD timelines must have a finite duration"
        );
        Self {
            config,
            clock,
            presentation_offset: 0.0,
        }
    }

    pub fn vod(duration: f64, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            TimelineConfig {
                duration: Some(duration),
                is_live: false,
                ..Default::default()
            },
            clock,
        )
    }

    /// Current wall-clock time expressed in presentation seconds.
    pub fn now(&self) -> f64 {
        self.clock.now_seconds() - self.config.availability_start_time + self.presentation_offset
    }

    pub fn duration(&self) -> Option<f64> {
        self.config.duration
    }

    pub fn is_live(&self) -> bool {
        self.config.is_live
    }

    /// `[A_start(t), A_end(t)]`. VOD: `[0, duration]`, time-invariant.
    /// Live: the sliding window ending at the live edge.
    pub fn segment_availability(&self) -> TimeRange {
        if !self.config.is_live {
            let end = self.config.duration.unwrap_or(0.0);
            return TimeRange::new(0.0, end);
        }

        let live_edge = self.now();
        let window = self.config.segment_availability_duration.unwrap_or(live_edge);
        let start = (live_edge - window).max(0.0);
        let end = match self.config.duration {
            Some(d) => live_edge.min(d),
            None => live_edge,
        };
        let end = end.max(start);
        TimeRange::new(start, end)
    }

    /// `seekRange.end = min(duration, availability.end - liveEdgeSafetyMargin)`.
    pub fn seek_range(&self) -> TimeRange {
        let availability = self.segment_availability();
        let duration = self.config.duration.unwrap_or(f64::INFINITY);
        let end = (availability.end - self.config.live_edge_safety_margin)
            .min(duration)
            .max(availability.start);
        TimeRange::new(availability.start, end)
    }

    /// Sets the zero point of the presentation timeline, used when a
    /// manifest refresh rebases `availabilityStartTime`.
    pub fn offset(&mut self, origin: f64) {
        self.presentation_offset = origin;
    }

    /// Clamps a requested seek target into `seekRange`.
    pub fn clamp_seek(&self, target: f64) -> f64 {
        let range = self.seek_range();
        target.clamp(range.start, range.end)
    }
}
