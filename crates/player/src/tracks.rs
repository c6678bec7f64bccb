use manifest::{ContentType, Stream, StreamId, Variant, VariantId};

/// A track as surfaced to an application via `getTracks` (spec §4.K):
/// one entry per variant (audio+video pair) plus one per text stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantTrack {
    pub variant_id: VariantId,
    pub bandwidth: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
    pub audio_codec: Option<String>,
    pub video_codec: Option<String>,
    pub language: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextTrack {
    pub stream_id: StreamId,
    pub language: Option<String>,
    pub roles: Vec<String>,
    pub active: bool,
}

pub fn variant_track(manifest: &manifest::Manifest, variant: &Variant, active: bool) -> VariantTrack {
    let audio = variant.audio.and_then(|id| manifest.stream(id));
    let video = variant.video.and_then(|id| manifest.stream(id));
    VariantTrack {
        variant_id: variant.id,
        bandwidth: variant.bandwidth,
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        frame_rate: video.and_then(|s| s.frame_rate),
        audio_codec: audio.map(|s| s.codecs.clone()),
        video_codec: video.map(|s| s.codecs.clone()),
        language: audio.and_then(|s| s.language.clone()),
        active,
    }
}

pub fn text_track(stream: &Stream, active: bool) -> Option<TextTrack> {
    if stream.content_type != ContentType::Text {
        return None;
    }
    Some(TextTrack {
        stream_id: stream.id,
        language: stream.language.clone(),
        roles: stream.roles.clone(),
        active,
    })
}
