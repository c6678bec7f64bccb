use crate::cue::Cue;
use crate::error::TextError;
use crate::parser::TextParser;

/// Minimal WebVTT cue parser: the one concrete [`TextParser`] this crate
/// ships, enough to exercise the text pipeline end-to-end. Extended cue
/// settings (position, alignment, regions) are ignored; only the cue
/// timing and payload are extracted.
pub struct VttParser;

fn parse_timestamp(s: &str) -> Option<f64> {
    let s = s.trim();
    let (hms, millis) = s.split_once('.')?;
    let millis: f64 = millis.parse().ok()?;
    let parts: Vec<&str> = hms.split(':').collect();
    let (h, m, sec) = match parts.as_slice() {
        [h, m, s] => (h.parse().ok()?, m.parse().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(h * 3600.0 + m * 60.0 + sec + millis / 1000.0)
}

fn parse_cue_timing(line: &str) -> Option<(f64, f64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    Some((parse_timestamp(start)?, parse_timestamp(end)?))
}

impl TextParser for VttParser {
    fn parse(&self, bytes: &[u8], timestamp_offset: f64) -> Result<Vec<Cue>, TextError> {
        let text = std::str::from_utf8(bytes).map_err(|e| TextError::TextParseError { reason: e.to_string() })?;

        let mut lines = text.lines();
        match lines.next() {
            Some(first) if first.trim_start().starts_with("WEBVTT") => {}
            _ => {
                return Err(TextError::TextParseError {
                    reason: "missing WEBVTT header".to_string(),
                })
            }
        }

        let mut cues = Vec::new();
        let mut pending_id: Option<String> = None;
        let mut current: Option<(f64, f64, Vec<String>)> = None;

        for line in lines {
            if line.trim().is_empty() {
                if let Some((start, end, payload_lines)) = current.take() {
                    let mut cue = Cue::new(start + timestamp_offset, end + timestamp_offset, payload_lines.join("\n"));
                    if let Some(id) = pending_id.take() {
                        cue = cue.with_id(id);
                    }
                    cues.push(cue);
                }
                continue;
            }

            if let Some((start, end)) = parse_cue_timing(line) {
                current = Some((start, end, Vec::new()));
            } else if let Some((_, _, payload)) = &mut current {
                payload.push(line.to_string());
            } else if !line.trim_start().starts_with("NOTE") {
                pending_id = Some(line.trim().to_string());
            }
        }

        if let Some((start, end, payload_lines)) = current.take() {
            let mut cue = Cue::new(start + timestamp_offset, end + timestamp_offset, payload_lines.join("\n"));
            if let Some(id) = pending_id.take() {
                cue = cue.with_id(id);
            }
            cues.push(cue);
        }

        Ok(cues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_cues_with_ids() {
        let input = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:04.000\nHello world\n\n2\n00:00:05.500 --> 00:00:07.000\nSecond cue\n";
        let cues = VttParser.parse(input.as_bytes(), 0.0).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].id.as_deref(), Some("1"));
        assert_eq!(cues[0].start, 1.0);
        assert_eq!(cues[0].end, 4.0);
        assert_eq!(cues[0].payload, "Hello world");
        assert_eq!(cues[1].start, 5.5);
    }

    #[test]
    fn applies_timestamp_offset() {
        let input = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi\n";
        let cues = VttParser.parse(input.as_bytes(), 100.0).unwrap();
        assert_eq!(cues[0].start, 101.0);
        assert_eq!(cues[0].end, 102.0);
    }

    #[test]
    fn rejects_missing_header() {
        let err = VttParser.parse(b"not a vtt file", 0.0).unwrap_err();
        assert!(matches!(err, TextError::TextParseError { .. }));
    }
}
