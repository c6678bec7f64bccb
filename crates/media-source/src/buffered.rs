/// A totally-ordered sequence of non-overlapping intervals the sink
/// reports as buffered (spec §3, "Buffer Range"). Derived, not stored.
pub type BufferedRanges = Vec<(f64, f64)>;

/// `bufferStart`: the earliest buffered position, or `None` if nothing is
/// buffered.
pub fn buffer_start(ranges: &BufferedRanges) -> Option<f64> {
    ranges.first().map(|r| r.0)
}

/// `bufferedAheadOf(t)`: total buffered duration contiguously reachable
/// from `t` without a gap. Zero if `t` is not covered by any range.
pub fn buffered_ahead_of(ranges: &BufferedRanges, t: f64) -> f64 {
    let Some(start_idx) = ranges.iter().position(|(start, end)| t >= *start && t < *end) else {
        return 0.0;
    };
    let mut ahead = ranges[start_idx].1 - t;
    let mut last_end = ranges[start_idx].1;
    for (start, end) in &ranges[start_idx + 1..] {
        if *start > last_end {
            break;
        }
        ahead += end - last_end.max(*start);
        last_end = *end;
    }
    ahead.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_start_is_first_range_start() {
        let ranges = vec![(5.0, 10.0), (12.0, 20.0)];
        assert_eq!(buffer_start(&ranges), Some(5.0));
    }

    #[test]
    fn buffered_ahead_of_zero_when_uncovered() {
        let ranges = vec![(5.0, 10.0)];
        assert_eq!(buffered_ahead_of(&ranges, 11.0), 0.0);
    }

    #[test]
    fn buffered_ahead_of_sums_contiguous_ranges() {
        let ranges = vec![(0.0, 10.0), (10.0, 20.0), (25.0, 30.0)];
        assert_eq!(buffered_ahead_of(&ranges, 5.0), 15.0);
    }

    #[test]
    fn buffered_ahead_of_stops_at_gap() {
        let ranges = vec![(0.0, 10.0), (15.0, 20.0)];
        assert_eq!(buffered_ahead_of(&ranges, 5.0), 5.0);
    }
}
