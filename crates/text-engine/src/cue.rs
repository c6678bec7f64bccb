/// A single subtitle/caption cue, in presentation seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub id: Option<String>,
    pub start: f64,
    pub end: f64,
    pub payload: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, payload: impl Into<String>) -> Self {
        Self {
            id: None,
            start,
            end,
            payload: payload.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Clips the cue to `[start, end)`, per §4.E's append-window clipping
    /// applied to text the same way as media (spec §4.J). Returns `None`
    /// if the cue falls entirely outside the window.
    pub fn clip(&self, window_start: f64, window_end: f64) -> Option<Cue> {
        let start = self.start.max(window_start);
        let end = self.end.min(window_end);
        if end <= start {
            return None;
        }
        Some(Cue {
            id: self.id.clone(),
            start,
            end,
            payload: self.payload.clone(),
        })
    }
}
