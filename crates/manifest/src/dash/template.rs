/// Expands a DASH `SegmentTemplate` URL pattern (`$RepresentationID$`,
/// `$Number$`, `$Number%05d$`, `$Time$`, `$$`) for one segment.
pub fn expand_template(template: &str, representation_id: &str, number: u64, time: u64) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            if let Some(end) = template[i + 1..].find('$') {
                let token = &template[i + 1..i + 1 + end];
                if token.is_empty() {
                    out.push('$');
                } else {
                    out.push_str(&expand_token(token, representation_id, number, time));
                }
                i = i + 1 + end + 1;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    let _ = &mut chars;
    out
}

fn expand_token(token: &str, representation_id: &str, number: u64, time: u64) -> String {
    let (name, format) = match token.split_once('%') {
        Some((n, f)) => (n, Some(f)),
        None => (token, None),
    };
    let value = match name {
        "RepresentationID" => return representation_id.to_string(),
        "Number" => number,
        "Time" => time,
        _ => return format!("${token}$"),
    };
    match format {
        Some(spec) => format_with_width(value, spec),
        None => value.to_string(),
    }
}

/// Parses a `printf`-style integer width spec (`05d`) and zero-pads.
fn format_with_width(value: u64, spec: &str) -> String {
    let digits: String = spec.chars().take_while(|c| c.is_ascii_digit()).collect();
    let width: usize = if digits.starts_with('0') {
        digits.parse().unwrap_or(0)
    } else {
        digits.parse().unwrap_or(0)
    };
    format!("{value:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_representation_and_number() {
        let out = expand_template("$RepresentationID$/seg-$Number$.m4s", "video-720p", 12, 0);
        assert_eq!(out, "video-720p/seg-12.m4s");
    }

    #[test]
    fn expands_zero_padded_number() {
        let out = expand_template("seg-$Number%05d$.m4s", "r", 7, 0);
        assert_eq!(out, "seg-00007.m4s");
    }

    #[test]
    fn expands_time_and_literal_dollar() {
        let out = expand_template("seg-$Time$-$$.m4s", "r", 0, 9000);
        assert_eq!(out, "seg-9000-$.m4s");
    }
}
