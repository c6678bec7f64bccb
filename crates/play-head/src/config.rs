/// Subset of the `streaming` config surface (spec §6) the play head needs:
/// `bufferingGoal`, `rebufferingGoal`.
#[derive(Debug, Clone, Copy)]
pub struct PlayHeadConfig {
    pub buffering_goal: f64,
    pub rebuffering_goal: f64,
}

impl Default for PlayHeadConfig {
    fn default() -> Self {
        Self {
            buffering_goal: 10.0,
            rebuffering_goal: 2.0,
        }
    }
}

impl PlayHeadConfig {
    /// §4.H "when `effectiveRate > 1`, `bufferingGoal_effective = bufferingGoal × effectiveRate`".
    pub fn effective_buffering_goal(&self, effective_rate: f64) -> f64 {
        effective_buffering_goal(self.buffering_goal, effective_rate)
    }
}

/// Free-standing form of the same rule, for callers (the streaming engine's
/// fetch loop) that hold a plain `bufferingGoal` rather than a whole
/// [`PlayHeadConfig`].
pub fn effective_buffering_goal(buffering_goal: f64, effective_rate: f64) -> f64 {
    if effective_rate > 1.0 {
        buffering_goal * effective_rate
    } else {
        buffering_goal
    }
}
