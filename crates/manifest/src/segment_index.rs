use std::collections::VecDeque;

use crate::model::SegmentReference;

/// Lazy, position-indexed sequence of segment references per stream
/// (spec §4.B). Positions are dense integers; segments are stored in a
/// deque so `evict` can drop from the head in O(1) amortized while
/// preserving position numbering via `base_position`.
#[derive(Debug, Default)]
pub struct SegmentIndex {
    base_position: u64,
    segments: VecDeque<SegmentReference>,
}

impl SegmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<SegmentReference>) -> Self {
        Self {
            base_position: 0,
            segments: segments.into(),
        }
    }

    pub fn push(&mut self, segment: SegmentReference) {
        self.segments.push_back(segment);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the position whose interval `[t0, t1)` contains `t`, treating
    /// the interval as right-open. `None` if `t` falls before the first
    /// segment or past the last.
    pub fn find(&self, t: f64) -> Option<u64> {
        // Segments are in ascending time order; binary search on t0.
        let idx = self.segments.partition_point(|s| s.t0 <= t);
        if idx == 0 {
            return None;
        }
        let candidate = &self.segments[idx - 1];
        if t >= candidate.t0 && t < candidate.t1 {
            Some(self.base_position + (idx - 1) as u64)
        } else {
            None
        }
    }

    /// `None` past the last segment.
    pub fn get(&self, position: u64) -> Option<&SegmentReference> {
        if position < self.base_position {
            return None;
        }
        let idx = (position - self.base_position) as usize;
        self.segments.get(idx)
    }

    pub fn first_position(&self) -> Option<u64> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.base_position)
        }
    }

    pub fn last_position(&self) -> Option<u64> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.base_position + self.segments.len() as u64 - 1)
        }
    }

    /// Shortens the final reference's `t1` to `period_end` if the parser
    /// over-specified it.
    pub fn fit(&mut self, period_end: f64) {
        if let Some(last) = self.segments.back_mut() {
            if last.t1 > period_end {
                last.t1 = period_end.max(last.t0);
                if last.append_window.1 > last.t1 {
                    last.append_window.1 = last.t1;
                }
            }
        }
    }

    /// Drops positions whose `t1 <= threshold`.
    pub fn evict(&mut self, threshold: f64) {
        while let Some(front) = self.segments.front() {
            if front.t1 <= threshold {
                self.segments.pop_front();
                self.base_position += 1;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(bounds: &[(f64, f64)]) -> SegmentIndex {
        let segments = bounds
            .iter()
            .map(|(t0, t1)| SegmentReference::new(*t0, *t1, vec!["seg.mp4".into()]))
            .collect();
        SegmentIndex::from_segments(segments)
    }

    #[test]
    fn find_returns_position_for_right_open_interval() {
        let index = index_with(&[(0.0, 10.0), (10.0, 20.0), (20.0, 30.0)]);
        assert_eq!(index.find(0.0), Some(0));
        assert_eq!(index.find(9.999), Some(0));
        assert_eq!(index.find(10.0), Some(1));
        assert_eq!(index.find(29.999), Some(2));
        assert_eq!(index.find(30.0), None);
        assert_eq!(index.find(-1.0), None);
    }

    #[test]
    fn get_returns_none_past_last_segment() {
        let index = index_with(&[(0.0, 10.0)]);
        assert!(index.get(0).is_some());
        assert!(index.get(1).is_none());
    }

    #[test]
    fn fit_shortens_final_reference() {
        let mut index = index_with(&[(0.0, 10.0), (10.0, 25.0)]);
        index.fit(20.0);
        assert_eq!(index.get(1).unwrap().t1, 20.0);
    }

    #[test]
    fn evict_drops_expired_positions_and_preserves_numbering() {
        let mut index = index_with(&[(0.0, 10.0), (10.0, 20.0), (20.0, 30.0)]);
        index.evict(15.0);
        assert_eq!(index.first_position(), Some(1));
        assert_eq!(index.get(1).unwrap().t0, 10.0);
        assert_eq!(index.find(12.0), Some(1));
        assert_eq!(index.find(2.0), None);
    }

    #[test]
    fn positions_are_contiguous_after_several_evictions() {
        let mut index = index_with(&[(0.0, 10.0), (10.0, 20.0), (20.0, 30.0), (30.0, 40.0)]);
        index.evict(10.0);
        index.evict(25.0);
        assert_eq!(index.first_position(), Some(2));
        assert_eq!(index.get(2).unwrap().t0, 20.0);
        assert_eq!(index.get(3).unwrap().t0, 30.0);
    }
}
