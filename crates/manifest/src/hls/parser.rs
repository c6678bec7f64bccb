use std::sync::Arc;

use async_trait::async_trait;
use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist};
use net::{NetworkRequest, RequestType, RetryParameters};
use presentation_timeline::TimelineConfig;
use tokio_util::sync::CancellationToken;

use crate::error::ManifestError;
use crate::model::{
    ContentType, DrmInfo, InitDataEntry, InitDataType, InitSegmentReference, Manifest, Period, Stream,
    Variant,
};
use crate::parser::{ManifestParser, PlayerInterface};
use crate::segment_index::SegmentIndex;

/// Concrete `ManifestParser` for HLS (spec §6): a master playlist becomes
/// one `Period` whose variants reference a video/audio `Stream` pair; each
/// stream's media playlist is fetched and turned into a `SegmentIndex`
/// from `#EXTINF`/`#EXT-X-BYTERANGE`.
pub struct HlsParser {
    master_uri: Option<String>,
}

impl Default for HlsParser {
    fn default() -> Self {
        Self { master_uri: None }
    }
}

impl HlsParser {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManifestParser for HlsParser {
    async fn start(
        &mut self,
        uri: &str,
        player: Arc<dyn PlayerInterface>,
        token: CancellationToken,
    ) -> Result<Manifest, ManifestError> {
        self.master_uri = Some(uri.to_string());
        let engine = player.networking();
        let bytes = fetch(&engine, uri, &token).await?;

        let manifest = match m3u8_rs::parse_playlist_res(&bytes) {
            Ok(Playlist::MasterPlaylist(master)) => {
                build_from_master(&master, uri, &engine, &token).await?
            }
            Ok(Playlist::MediaPlaylist(media)) => build_from_single_media(&media, uri)?,
            Err(_) => return Err(ManifestError::HlsPlaylistHeaderMissing),
        };

        let mut manifest = manifest;
        player.filter(&mut manifest);
        Ok(manifest)
    }

    async fn stop(&mut self) {
        self.master_uri = None;
    }

    async fn update(&mut self, manifest: &mut Manifest) -> Result<(), ManifestError> {
        let Some(uri) = self.master_uri.clone() else {
            return Ok(());
        };
        let config = net::NetworkConfig::default();
        let engine = net::NetworkEngine::new(&config)?;
        let token = CancellationToken::new();
        let bytes = fetch(&engine, &uri, &token).await?;
        match m3u8_rs::parse_playlist_res(&bytes) {
            Ok(Playlist::MasterPlaylist(master)) => {
                *manifest = build_from_master(&master, &uri, &engine, &token).await?;
            }
            Ok(Playlist::MediaPlaylist(media)) => {
                *manifest = build_from_single_media(&media, &uri)?;
            }
            Err(_) => return Err(ManifestError::HlsPlaylistHeaderMissing),
        }
        Ok(())
    }
}

async fn fetch(
    engine: &net::NetworkEngine,
    uri: &str,
    token: &CancellationToken,
) -> Result<Vec<u8>, ManifestError> {
    let request = NetworkRequest::get(RequestType::Manifest, uri);
    let response = engine.fetch(request, &RetryParameters::default(), token).await?;
    Ok(response.body.to_vec())
}

async fn build_from_master(
    master: &MasterPlaylist,
    base_uri: &str,
    engine: &net::NetworkEngine,
    token: &CancellationToken,
) -> Result<Manifest, ManifestError> {
    let mut manifest = Manifest::new(TimelineConfig::default());
    let mut variant_ids = Vec::new();

    for variant in &master.variants {
        let media_uri = resolve_uri(base_uri, &variant.uri);
        let bytes = fetch(engine, &media_uri, token).await?;
        let media = match m3u8_rs::parse_media_playlist_res(&bytes) {
            Ok(media) => media,
            Err(_) => {
                return Err(ManifestError::HlsInvalidPlaylistHierarchy {
                    reason: format!("variant {media_uri} did not parse as a media playlist"),
                })
            }
        };

        let (segment_index, drm_infos, encrypted, key_id, init_segment) =
            build_segment_index(&media, &media_uri)?;

        let codecs = variant.codecs.clone().unwrap_or_default();
        let is_audio_only = codecs_are_audio_only(&codecs);

        let stream = Stream {
            id: crate::model::StreamId(0),
            content_type: if is_audio_only { ContentType::Audio } else { ContentType::Video },
            mime_type: if is_audio_only {
                "audio/mp4".to_string()
            } else {
                "video/mp4".to_string()
            },
            codecs,
            language: None,
            roles: Vec::new(),
            width: variant.resolution.map(|r| r.width as u32),
            height: variant.resolution.map(|r| r.height as u32),
            frame_rate: variant.frame_rate,
            primary: false,
            encrypted,
            key_id,
            segment_index,
            init_segment,
        };
        let stream_id = manifest.push_stream(stream);

        let (audio, video) = if is_audio_only {
            (Some(stream_id), None)
        } else {
            (None, Some(stream_id))
        };

        let v = Variant {
            id: crate::model::VariantId(0),
            audio,
            video,
            text: None,
            bandwidth: variant.bandwidth,
            drm_infos,
            allowed_by_application: true,
            allowed_by_key_system: true,
        };
        variant_ids.push(manifest.push_variant(v));
    }

    manifest.push_period(Period {
        id: crate::model::PeriodId(0),
        start: 0.0,
        variants: variant_ids,
        text_streams: Vec::new(),
    });

    Ok(manifest)
}

fn build_from_single_media(media: &MediaPlaylist, uri: &str) -> Result<Manifest, ManifestError> {
    let mut manifest = Manifest::new(TimelineConfig {
        is_live: !media.end_list,
        ..Default::default()
    });

    let (segment_index, drm_infos, encrypted, key_id, init_segment) = build_segment_index(media, uri)?;
    let stream = Stream {
        id: crate::model::StreamId(0),
        content_type: ContentType::Video,
        mime_type: "video/mp4".to_string(),
        codecs: String::new(),
        language: None,
        roles: Vec::new(),
        width: None,
        height: None,
        frame_rate: None,
        primary: true,
        encrypted,
        key_id,
        segment_index,
        init_segment,
    };
    let stream_id = manifest.push_stream(stream);

    let variant = Variant {
        id: crate::model::VariantId(0),
        audio: None,
        video: Some(stream_id),
        text: None,
        bandwidth: 0,
        drm_infos,
        allowed_by_application: true,
        allowed_by_key_system: true,
    };
    let variant_id = manifest.push_variant(variant);

    manifest.push_period(Period {
        id: crate::model::PeriodId(0),
        start: 0.0,
        variants: vec![variant_id],
        text_streams: Vec::new(),
    });

    Ok(manifest)
}

#[allow(clippy::type_complexity)]
fn build_segment_index(
    media: &MediaPlaylist,
    base_uri: &str,
) -> Result<
    (
        SegmentIndex,
        Vec<DrmInfo>,
        bool,
        Option<String>,
        Option<Arc<InitSegmentReference>>,
    ),
    ManifestError,
> {
    let mut segments = Vec::new();
    let mut t = 0.0f64;
    let mut drm_infos = Vec::new();
    let mut encrypted = false;
    let mut key_id = None;
    let mut init_segment = None;

    for segment in &media.segments {
        if let Some(key) = &segment.key {
            if !matches!(key.method, m3u8_rs::KeyMethod::None) {
                encrypted = true;
                let uri = key.uri.clone().unwrap_or_default();
                key_id = key.keyformatversions.clone();
                drm_infos.push(DrmInfo {
                    key_system: "org.w3.clearkey".to_string(),
                    license_server_uri: Some(resolve_uri(base_uri, &uri)),
                    init_data: vec![InitDataEntry {
                        init_data_type: InitDataType::KeyIds,
                        data: Vec::new(),
                        key_id: key.iv.clone(),
                    }],
                    distinctive_identifier_required: false,
                    persistent_state_required: false,
                });
            }
        }

        if let Some(map) = &segment.map {
            init_segment = Some(Arc::new(InitSegmentReference {
                uris: vec![resolve_uri(base_uri, &map.uri)],
                byte_range: map.byte_range.as_ref().map(|r| {
                    let length = r.length;
                    let offset = r.offset.unwrap_or(0);
                    (offset, offset + length)
                }),
                quality: None,
            }));
        }

        let duration = segment.duration as f64;
        if duration <= 0.0 {
            continue;
        }
        let t0 = t;
        let t1 = t + duration;
        let uri = resolve_uri(base_uri, &segment.uri);
        let mut reference = crate::model::SegmentReference::new(t0, t1, vec![uri]);
        if let Some(range) = &segment.byte_range {
            let offset = range.offset.unwrap_or(0);
            reference = reference.with_byte_range(offset, offset + range.length);
        }
        if let Some(init) = &init_segment {
            reference = reference.with_init_segment(init.clone());
        }
        segments.push(reference);
        t = t1;
    }

    Ok((SegmentIndex::from_segments(segments), drm_infos, encrypted, key_id, init_segment))
}

fn codecs_are_audio_only(codecs: &str) -> bool {
    !codecs.is_empty() && !codecs.split(',').any(|c| c.trim().starts_with("avc") || c.trim().starts_with("hev") || c.trim().starts_with("hvc") || c.trim().starts_with("av01"))
}

fn resolve_uri(base: &str, candidate: &str) -> String {
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return candidate.to_string();
    }
    match url::Url::parse(base).and_then(|b| b.join(candidate)) {
        Ok(joined) => joined.into(),
        Err(_) => candidate.to_string(),
    }
}
