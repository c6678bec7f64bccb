use std::sync::Arc;

use async_trait::async_trait;
use net::{NetworkRequest, RequestType, RetryParameters};
use presentation_timeline::TimelineConfig;
use tokio_util::sync::CancellationToken;

use crate::dash::mpd::{self, Mpd, Representation, SegmentTemplate};
use crate::dash::patch::{apply_patch, parse_patch_document};
use crate::dash::template::expand_template;
use crate::error::ManifestError;
use crate::model::{ContentType, DrmInfo, InitDataEntry, InitDataType, Manifest, Period, Stream, Variant};
use crate::parser::{ManifestParser, PlayerInterface};
use crate::segment_index::SegmentIndex;

/// Concrete `ManifestParser` for MPD (spec §6). Builds a `Manifest` graph by
/// walking `Period -> AdaptationSet -> Representation`, each representation
/// becoming one `Stream` whose `SegmentIndex` is built from its (or its
/// adaptation set's) `SegmentTemplate`.
#[derive(Default)]
pub struct DashParser {
    uri: Option<String>,
    /// The raw deserialized document behind the last `Manifest` this parser
    /// built, kept so an incoming patch-MPD document has something to
    /// apply against without a full refetch.
    last_mpd: Option<Mpd>,
}

impl DashParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch-MPD update path (spec §6): applies a `<Patch>` document to the
    /// last full MPD this parser parsed and rebuilds `manifest` from the
    /// result, instead of refetching and reparsing the whole document.
    pub async fn update_from_patch(&mut self, manifest: &mut Manifest, patch_xml: &str) -> Result<(), ManifestError> {
        let mpd = self
            .last_mpd
            .as_mut()
            .ok_or_else(|| ManifestError::Xml("no base MPD held to apply a patch against".to_string()))?;
        let patch = parse_patch_document(patch_xml)?;
        apply_patch(mpd, &patch);
        *manifest = build_manifest(mpd)?;
        Ok(())
    }
}

#[async_trait]
impl ManifestParser for DashParser {
    async fn start(
        &mut self,
        uri: &str,
        player: Arc<dyn PlayerInterface>,
        token: CancellationToken,
    ) -> Result<Manifest, ManifestError> {
        self.uri = Some(uri.to_string());
        let bytes = fetch_mpd(uri, player.as_ref(), &token).await?;
        let mpd: Mpd = quick_xml::de::from_str(&bytes).map_err(|e| ManifestError::Xml(e.to_string()))?;
        let mut manifest = build_manifest(&mpd)?;
        player.filter(&mut manifest);
        self.last_mpd = Some(mpd);
        Ok(manifest)
    }

    async fn stop(&mut self) {
        self.uri = None;
        self.last_mpd = None;
    }

    async fn update(&mut self, manifest: &mut Manifest) -> Result<(), ManifestError> {
        // A full non-patch refresh. Hosts with a patch-MPD document instead
        // of a full MPD call `update_from_patch` directly.
        let Some(uri) = self.uri.clone() else {
            return Ok(());
        };
        let bytes = fetch_mpd_raw(&uri).await?;
        let mpd: Mpd = quick_xml::de::from_str(&bytes).map_err(|e| ManifestError::Xml(e.to_string()))?;
        *manifest = build_manifest(&mpd)?;
        self.last_mpd = Some(mpd);
        Ok(())
    }
}

async fn fetch_mpd(
    uri: &str,
    player: &dyn PlayerInterface,
    token: &CancellationToken,
) -> Result<String, ManifestError> {
    let engine = player.networking();
    let request = NetworkRequest::get(RequestType::Manifest, uri);
    let response = engine.fetch(request, &RetryParameters::default(), token).await?;
    Ok(String::from_utf8_lossy(&response.body).into_owned())
}

/// Standalone refetch used by `update()`, where we do not have access back
/// to the `PlayerInterface` (the parser only keeps the URI between calls).
async fn fetch_mpd_raw(uri: &str) -> Result<String, ManifestError> {
    let config = net::NetworkConfig::default();
    let engine = net::NetworkEngine::new(&config)?;
    let request = NetworkRequest::get(RequestType::Manifest, uri);
    let token = CancellationToken::new();
    let response = engine.fetch(request, &RetryParameters::default(), &token).await?;
    Ok(String::from_utf8_lossy(&response.body).into_owned())
}

pub fn build_manifest(mpd: &Mpd) -> Result<Manifest, ManifestError> {
    let is_live = mpd.presentation_type.as_deref() == Some("dynamic");
    let duration = mpd
        .media_presentation_duration
        .as_deref()
        .and_then(mpd::parse_xs_duration);

    let timeline = TimelineConfig {
        duration,
        is_live,
        segment_availability_duration: mpd
            .time_shift_buffer_depth
            .as_deref()
            .and_then(mpd::parse_xs_duration),
        live_edge_safety_margin: mpd
            .suggested_presentation_delay
            .as_deref()
            .and_then(mpd::parse_xs_duration)
            .unwrap_or(0.0),
        availability_start_time: 0.0,
    };

    let mut manifest = Manifest::new(timeline);

    let mut period_start = 0.0;
    for (period_idx, period) in mpd.periods.iter().enumerate() {
        let start = period
            .start
            .as_deref()
            .and_then(mpd::parse_xs_duration)
            .unwrap_or(period_start);
        let period_duration = period.duration.as_deref().and_then(mpd::parse_xs_duration);

        let mut variant_ids = Vec::new();
        let mut text_stream_ids = Vec::new();

        for adaptation_set in &period.adaptation_sets {
            let content_type = resolve_content_type(adaptation_set)?;
            let drm_infos = build_drm_infos(adaptation_set);

            for representation in &adaptation_set.representations {
                let template = representation
                    .segment_template
                    .as_ref()
                    .or(adaptation_set.segment_template.as_ref());

                let segment_index = match template {
                    Some(template) => build_segment_index(template, &representation.id, period_duration)?,
                    None => {
                        return Err(ManifestError::DashNoSegmentInfo {
                            representation_id: representation.id.clone(),
                        })
                    }
                };

                let mime_type = representation
                    .mime_type
                    .clone()
                    .or_else(|| adaptation_set.mime_type.clone())
                    .ok_or_else(|| ManifestError::UnknownMimeType {
                        mime_type: String::new(),
                    })?;

                let stream = Stream {
                    id: crate::model::StreamId(0),
                    content_type,
                    mime_type,
                    codecs: representation.codecs.clone().unwrap_or_default(),
                    language: adaptation_set.lang.clone(),
                    roles: Vec::new(),
                    width: representation.width,
                    height: representation.height,
                    frame_rate: representation
                        .frame_rate
                        .as_deref()
                        .and_then(parse_frame_rate),
                    primary: false,
                    encrypted: !drm_infos.is_empty(),
                    key_id: drm_infos
                        .first()
                        .and_then(|d| d.init_data.first())
                        .and_then(|e| e.key_id.clone()),
                    segment_index,
                    init_segment: None,
                };
                let stream_id = manifest.push_stream(stream);

                let (audio, video, text) = match content_type {
                    ContentType::Audio => (Some(stream_id), None, None),
                    ContentType::Video => (None, Some(stream_id), None),
                    ContentType::Text => {
                        text_stream_ids.push(stream_id);
                        (None, None, Some(stream_id))
                    }
                    ContentType::Image => (None, None, None),
                };

                if content_type != ContentType::Text {
                    let variant = Variant {
                        id: crate::model::VariantId(0),
                        audio,
                        video,
                        text: None,
                        bandwidth: representation.bandwidth,
                        drm_infos: drm_infos.clone(),
                        allowed_by_application: true,
                        allowed_by_key_system: true,
                    };
                    variant_ids.push(manifest.push_variant(variant));
                    let _ = text;
                }
            }
        }

        manifest.push_period(Period {
            id: crate::model::PeriodId(period_idx as u32),
            start,
            variants: variant_ids,
            text_streams: text_stream_ids,
        });

        period_start = start + period_duration.unwrap_or(0.0);
    }

    Ok(manifest)
}

fn resolve_content_type(adaptation_set: &crate::dash::mpd::AdaptationSet) -> Result<ContentType, ManifestError> {
    if let Some(ct) = &adaptation_set.content_type {
        return Ok(match ct.as_str() {
            "audio" => ContentType::Audio,
            "video" => ContentType::Video,
            "text" => ContentType::Text,
            "image" => ContentType::Image,
            other => {
                return Err(ManifestError::UnknownMimeType {
                    mime_type: other.to_string(),
                })
            }
        });
    }
    if let Some(mime) = &adaptation_set.mime_type {
        if mime.starts_with("audio/") {
            return Ok(ContentType::Audio);
        }
        if mime.starts_with("video/") {
            return Ok(ContentType::Video);
        }
        if mime.starts_with("text/") || mime.contains("ttml") || mime.contains("vtt") {
            return Ok(ContentType::Text);
        }
        if mime.starts_with("image/") {
            return Ok(ContentType::Image);
        }
    }
    Err(ManifestError::UnknownMimeType {
        mime_type: adaptation_set.mime_type.clone().unwrap_or_default(),
    })
}

fn build_drm_infos(adaptation_set: &crate::dash::mpd::AdaptationSet) -> Vec<DrmInfo> {
    adaptation_set
        .content_protections
        .iter()
        .map(|cp| DrmInfo {
            key_system: cp.scheme_id_uri.clone(),
            license_server_uri: None,
            init_data: vec![InitDataEntry {
                init_data_type: InitDataType::Cenc,
                data: Vec::new(),
                key_id: cp.default_kid.clone(),
            }],
            distinctive_identifier_required: false,
            persistent_state_required: false,
        })
        .collect()
}

fn parse_frame_rate(value: &str) -> Option<f64> {
    if let Some((num, den)) = value.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            None
        } else {
            Some(num / den)
        }
    } else {
        value.parse().ok()
    }
}

/// Builds a `SegmentIndex` from a `SegmentTemplate`+`SegmentTimeline`, or
/// from a fixed `@duration` when no explicit timeline is present.
pub fn build_segment_index(
    template: &SegmentTemplate,
    representation_id: &str,
    period_duration: Option<f64>,
) -> Result<SegmentIndex, ManifestError> {
    let timescale = template.timescale.unwrap_or(1).max(1) as f64;
    let media = template.media.clone().unwrap_or_default();
    let mut number = template.start_number.unwrap_or(1);
    let mut segments = Vec::new();

    if let Some(timeline) = &template.segment_timeline {
        let mut current_time: u64 = 0;
        let entries = &timeline.segments;
        for (idx, s) in entries.iter().enumerate() {
            let mut t = s.t.unwrap_or(current_time);
            let d = s.d.max(1);
            match s.r {
                Some(r) if r >= 0 => {
                    for _ in 0..=r {
                        push_segment(&mut segments, &media, representation_id, number, t, d, timescale);
                        t += d;
                        number += 1;
                    }
                }
                Some(_) => {
                    // r == -1 (or less): repeat until the next S's `t`, or
                    // the period boundary for the last entry.
                    let end_time = entries
                        .get(idx + 1)
                        .and_then(|next| next.t)
                        .unwrap_or_else(|| {
                            period_duration
                                .map(|pd| (pd * timescale) as u64)
                                .unwrap_or(t + d)
                        });
                    while t < end_time {
                        push_segment(&mut segments, &media, representation_id, number, t, d, timescale);
                        t += d;
                        number += 1;
                    }
                }
                None => {
                    push_segment(&mut segments, &media, representation_id, number, t, d, timescale);
                    t += d;
                    number += 1;
                }
            }
            current_time = t;
        }
    } else if let (Some(duration), Some(period_duration)) = (template.duration, period_duration) {
        let duration = duration.max(1);
        let total_ticks = (period_duration * timescale) as u64;
        let mut t = 0u64;
        while t < total_ticks {
            push_segment(&mut segments, &media, representation_id, number, t, duration, timescale);
            t += duration;
            number += 1;
        }
    } else {
        return Err(ManifestError::DashNoSegmentInfo {
            representation_id: representation_id.to_string(),
        });
    }

    Ok(SegmentIndex::from_segments(segments))
}

fn push_segment(
    out: &mut Vec<crate::model::SegmentReference>,
    media_template: &str,
    representation_id: &str,
    number: u64,
    t: u64,
    d: u64,
    timescale: f64,
) {
    let t0 = t as f64 / timescale;
    let t1 = (t + d) as f64 / timescale;
    let uri = expand_template(media_template, representation_id, number, t);
    out.push(crate::model::SegmentReference::new(t0, t1, vec![uri]));
}
