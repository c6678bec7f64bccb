use media_source::BufferedRanges;
use presentation_timeline::PresentationTimeline;
use tracing::{debug, info};

use crate::config::{effective_buffering_goal, PlayHeadConfig};

/// A transition the controller observed this tick, for the caller to react
/// to (surface a `buffering`/`playing` event, adjust scheduling, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferingTransition {
    Unchanged,
    Entered,
    Left,
}

/// Outcome of a clamped seek (spec §4.G: "if the new position is outside
/// any buffered interval, request the engine to clear and reseed per
/// type").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekOutcome {
    pub position: f64,
    pub needs_reseed: bool,
}

/// Tracks buffering-state hysteresis and effective playback rate (spec
/// §4.G). Observes time, buffer fill and the user-chosen rate; does not
/// itself own a media element or sink.
pub struct PlayHeadController {
    config: PlayHeadConfig,
    buffering: bool,
    user_rate: f64,
}

impl PlayHeadController {
    pub fn new(config: PlayHeadConfig) -> Self {
        Self {
            config,
            buffering: false,
            user_rate: 1.0,
        }
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// Report to the engine: 0 while buffering, otherwise the user-chosen
    /// rate (spec §4.G).
    pub fn effective_rate(&self) -> f64 {
        if self.buffering {
            0.0
        } else {
            self.user_rate
        }
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.user_rate = rate;
    }

    /// The user-chosen rate, unlike `effective_rate` not zeroed while
    /// buffering — what playback will resume at once buffering ends, and
    /// so what `bufferingGoal` must scale against (spec §4.H).
    pub fn playback_rate(&self) -> f64 {
        self.user_rate
    }

    /// Re-evaluates buffering-state hysteresis given the current primary
    /// type's `bufferedAheadOf(t)` and whether the sink has reached the
    /// end of the presentation.
    pub fn update(&mut self, buffered_ahead: f64, is_at_end: bool) -> BufferingTransition {
        if !self.buffering && buffered_ahead < self.config.rebuffering_goal && !is_at_end {
            self.buffering = true;
            info!(buffered_ahead, "play head entering buffering state");
            return BufferingTransition::Entered;
        }
        let buffering_goal = effective_buffering_goal(self.config.buffering_goal, self.user_rate);
        if self.buffering && (buffered_ahead >= buffering_goal || is_at_end) {
            self.buffering = false;
            info!(buffered_ahead, "play head leaving buffering state");
            return BufferingTransition::Left;
        }
        BufferingTransition::Unchanged
    }

    /// Clamps `target` to the timeline's seek range, and reports whether
    /// the clamped position falls outside every buffered interval of
    /// `currently_buffered` (in which case the caller must clear and
    /// reseed per type).
    pub fn seek(
        &self,
        target: f64,
        timeline: &PresentationTimeline,
        currently_buffered: &BufferedRanges,
    ) -> SeekOutcome {
        let position = timeline.clamp_seek(target);
        let needs_reseed = !currently_buffered.iter().any(|(start, end)| position >= *start && position < *end);
        debug!(target, position, needs_reseed, "play head seek");
        SeekOutcome { position, needs_reseed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presentation_timeline::TimelineConfig;
    use std::sync::Arc;

    fn vod_timeline(duration: f64) -> PresentationTimeline {
        PresentationTimeline::vod(duration, Arc::new(presentation_timeline::SystemClock))
    }

    #[test]
    fn enters_buffering_below_rebuffering_goal() {
        let mut controller = PlayHeadController::new(PlayHeadConfig::default());
        assert_eq!(controller.update(1.0, false), BufferingTransition::Entered);
        assert!(controller.is_buffering());
        assert_eq!(controller.effective_rate(), 0.0);
    }

    #[test]
    fn leaves_buffering_only_at_buffering_goal_not_rebuffering_goal() {
        let mut controller = PlayHeadController::new(PlayHeadConfig::default());
        controller.update(1.0, false);
        assert_eq!(controller.update(5.0, false), BufferingTransition::Unchanged);
        assert!(controller.is_buffering());
        assert_eq!(controller.update(10.0, false), BufferingTransition::Left);
        assert!(!controller.is_buffering());
    }

    #[test]
    fn leaves_buffering_at_rate_scaled_goal_when_fast_forwarding() {
        let mut controller = PlayHeadController::new(PlayHeadConfig::default());
        controller.set_rate(2.0);
        controller.update(1.0, false);
        assert!(controller.is_buffering());

        // Default buffering_goal is 10.0; at 2x rate the effective goal is
        // 20.0, so 10.0 buffered ahead is not yet enough to leave buffering.
        assert_eq!(controller.update(10.0, false), BufferingTransition::Unchanged);
        assert!(controller.is_buffering());
        assert_eq!(controller.update(20.0, false), BufferingTransition::Left);
        assert!(!controller.is_buffering());
    }

    #[test]
    fn buffering_at_end_of_presentation_does_not_trigger() {
        let mut controller = PlayHeadController::new(PlayHeadConfig::default());
        assert_eq!(controller.update(0.0, true), BufferingTransition::Unchanged);
    }

    #[test]
    fn effective_rate_reports_user_rate_when_not_buffering() {
        let mut controller = PlayHeadController::new(PlayHeadConfig::default());
        controller.set_rate(2.0);
        assert_eq!(controller.effective_rate(), 2.0);
    }

    #[test]
    fn seek_clamps_to_seek_range_and_detects_unbuffered_target() {
        let controller = PlayHeadController::new(PlayHeadConfig::default());
        let timeline = vod_timeline(100.0);
        let buffered = vec![(0.0, 10.0)];

        let within = controller.seek(5.0, &timeline, &buffered);
        assert_eq!(within.position, 5.0);
        assert!(!within.needs_reseed);

        let outside = controller.seek(50.0, &timeline, &buffered);
        assert_eq!(outside.position, 50.0);
        assert!(outside.needs_reseed);

        let clamped = controller.seek(1000.0, &timeline, &buffered);
        assert_eq!(clamped.position, 100.0);
    }
}
