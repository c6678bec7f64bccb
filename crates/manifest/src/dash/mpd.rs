//! Serde model of the subset of MPD (ISO 23009-1) this engine needs.
//!
//! Field names mirror the XML attribute/element casing directly, the way
//! `dash-mpd-rs` models MPD, so `quick-xml`'s serde integration can
//! deserialize without a separate rename table.
#![allow(non_snake_case)]

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct S {
    #[serde(rename = "@t")]
    pub t: Option<u64>,
    #[serde(rename = "@d")]
    pub d: u64,
    #[serde(rename = "@r")]
    pub r: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct SegmentTimeline {
    #[serde(rename = "S", default)]
    pub segments: Vec<S>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Initialization {
    #[serde(rename = "@sourceURL")]
    pub source_url: Option<String>,
    #[serde(rename = "@range")]
    pub range: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SegmentTemplate {
    #[serde(rename = "@initialization")]
    pub initialization: Option<String>,
    #[serde(rename = "@media")]
    pub media: Option<String>,
    #[serde(rename = "@startNumber")]
    pub start_number: Option<u64>,
    #[serde(rename = "@duration")]
    pub duration: Option<u64>,
    #[serde(rename = "@timescale")]
    pub timescale: Option<u64>,
    #[serde(rename = "@presentationTimeOffset")]
    pub presentation_time_offset: Option<u64>,
    #[serde(rename = "Initialization")]
    pub initialization_elem: Option<Initialization>,
    #[serde(rename = "SegmentTimeline")]
    pub segment_timeline: Option<SegmentTimeline>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ContentProtection {
    #[serde(rename = "@schemeIdUri")]
    pub scheme_id_uri: String,
    #[serde(rename = "@value")]
    pub value: Option<String>,
    #[serde(rename = "@cenc:default_KID")]
    pub default_kid: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Representation {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@mimeType")]
    pub mime_type: Option<String>,
    #[serde(rename = "@codecs")]
    pub codecs: Option<String>,
    #[serde(rename = "@bandwidth")]
    pub bandwidth: u64,
    #[serde(rename = "@width")]
    pub width: Option<u32>,
    #[serde(rename = "@height")]
    pub height: Option<u32>,
    #[serde(rename = "@frameRate")]
    pub frame_rate: Option<String>,
    #[serde(rename = "SegmentTemplate")]
    pub segment_template: Option<SegmentTemplate>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdaptationSet {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@contentType")]
    pub content_type: Option<String>,
    #[serde(rename = "@mimeType")]
    pub mime_type: Option<String>,
    #[serde(rename = "@lang")]
    pub lang: Option<String>,
    #[serde(rename = "SegmentTemplate")]
    pub segment_template: Option<SegmentTemplate>,
    #[serde(rename = "ContentProtection", default)]
    pub content_protections: Vec<ContentProtection>,
    #[serde(rename = "Representation", default)]
    pub representations: Vec<Representation>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Period {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@start")]
    pub start: Option<String>,
    #[serde(rename = "@duration")]
    pub duration: Option<String>,
    #[serde(rename = "AdaptationSet", default)]
    pub adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Mpd {
    #[serde(rename = "@type")]
    pub presentation_type: Option<String>,
    #[serde(rename = "@mediaPresentationDuration")]
    pub media_presentation_duration: Option<String>,
    #[serde(rename = "@availabilityStartTime")]
    pub availability_start_time: Option<String>,
    #[serde(rename = "@timeShiftBufferDepth")]
    pub time_shift_buffer_depth: Option<String>,
    #[serde(rename = "@suggestedPresentationDelay")]
    pub suggested_presentation_delay: Option<String>,
    #[serde(rename = "Period", default)]
    pub periods: Vec<Period>,
}

/// Parses an ISO-8601 duration (`PT1H30M0S`) into seconds. DASH uses this
/// format for `mediaPresentationDuration`, `minBufferTime`, and friends.
pub fn parse_xs_duration(value: &str) -> Option<f64> {
    let duration = iso8601::duration(value).ok()?;
    match duration {
        iso8601::Duration::YMDHMS {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond,
        } => {
            let days = year as f64 * 365.0 + month as f64 * 30.0 + day as f64;
            Some(
                days * 86_400.0
                    + hour as f64 * 3_600.0
                    + minute as f64 * 60.0
                    + second as f64
                    + millisecond as f64 / 1000.0,
            )
        }
        iso8601::Duration::Weeks(w) => Some(w as f64 * 7.0 * 86_400.0),
    }
}
