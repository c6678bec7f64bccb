use crate::cue::Cue;

/// Time-sorted cue buffer for one text stream (spec §4.J: "Appends a cue
/// array into a time-sorted buffer per text stream; supports
/// `remove(start, end)`").
#[derive(Default)]
pub struct CueBuffer {
    cues: Vec<Cue>,
}

impl CueBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `cues`, clipping each to `append_window` (same clipping
    /// discipline as §4.E), and keeps the buffer sorted by start time.
    pub fn append(&mut self, cues: Vec<Cue>, append_window: (f64, f64)) {
        for cue in cues {
            if let Some(clipped) = cue.clip(append_window.0, append_window.1) {
                self.cues.push(clipped);
            }
        }
        self.cues.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());
    }

    /// Removes every cue overlapping `[start, end)`.
    pub fn remove(&mut self, start: f64, end: f64) {
        self.cues.retain(|cue| cue.end <= start || cue.start >= end);
    }

    pub fn cues_active_at(&self, t: f64) -> Vec<&Cue> {
        self.cues.iter().filter(|cue| t >= cue.start && t < cue.end).collect()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_clips_to_window_and_sorts() {
        let mut buffer = CueBuffer::new();
        buffer.append(
            vec![Cue::new(5.0, 6.0, "late"), Cue::new(1.0, 2.0, "early"), Cue::new(-1.0, 0.5, "before window")],
            (0.0, 10.0),
        );
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.cues_active_at(1.5)[0].payload, "early");
    }

    #[test]
    fn remove_drops_overlapping_cues_only() {
        let mut buffer = CueBuffer::new();
        buffer.append(vec![Cue::new(0.0, 2.0, "a"), Cue::new(5.0, 7.0, "b")], (0.0, 10.0));
        buffer.remove(1.0, 6.0);
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn remove_is_tolerant_of_empty_overlap() {
        let mut buffer = CueBuffer::new();
        buffer.append(vec![Cue::new(0.0, 2.0, "a")], (0.0, 10.0));
        buffer.remove(5.0, 6.0);
        assert_eq!(buffer.len(), 1);
    }
}
