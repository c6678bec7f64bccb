use std::sync::Arc;

use presentation_timeline::TimelineConfig;

use crate::segment_index::SegmentIndex;

/// Arena index into [`Manifest::periods`]. Resolves the "cyclic references"
/// design note (spec §9) without back-pointers: periods, streams and
/// variants are addressed by ID rather than shared pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Audio,
    Video,
    Text,
    Image,
}

/// DRM init-data types accepted unchanged per spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitDataType {
    Cenc,
    KeyIds,
    WebM,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitDataEntry {
    pub init_data_type: InitDataType,
    pub data: Vec<u8>,
    pub key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrmInfo {
    pub key_system: String,
    pub license_server_uri: Option<String>,
    pub init_data: Vec<InitDataEntry>,
    pub distinctive_identifier_required: bool,
    pub persistent_state_required: bool,
}

/// Optional media-quality descriptor carried by an init segment reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaQuality {
    pub codec: Option<String>,
    pub bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Equality is structural, as required by spec §3.
#[derive(Debug, Clone, PartialEq)]
pub struct InitSegmentReference {
    pub uris: Vec<String>,
    pub byte_range: Option<(u64, u64)>,
    pub quality: Option<MediaQuality>,
}

/// A single fetchable media byte range and its time placement (spec §3).
#[derive(Debug, Clone)]
pub struct SegmentReference {
    /// Half-open interval `[t0, t1)` in period-local seconds.
    pub t0: f64,
    pub t1: f64,
    pub uris: Vec<String>,
    pub byte_range: Option<(u64, u64)>,
    /// Shared by value-equality across segment references that reuse the
    /// same init segment, to let callers skip redundant appends.
    pub init_segment: Option<Arc<InitSegmentReference>>,
    pub timestamp_offset: f64,
    pub append_window: (f64, f64),
}

impl SegmentReference {
    pub fn new(t0: f64, t1: f64, uris: Vec<String>) -> Self {
        assert!(t0 < t1, "segment reference interval must be non-empty: [{t0}, {t1})");
        Self {
            t0,
            t1,
            uris,
            byte_range: None,
            init_segment: None,
            timestamp_offset: 0.0,
            append_window: (t0, t1),
        }
    }

    pub fn with_init_segment(mut self, init_segment: Arc<InitSegmentReference>) -> Self {
        self.init_segment = Some(init_segment);
        self
    }

    pub fn with_byte_range(mut self, start: u64, end: u64) -> Self {
        self.byte_range = Some((start, end));
        self
    }

    pub fn with_timestamp_offset(mut self, offset: f64) -> Self {
        self.timestamp_offset = offset;
        self
    }

    pub fn with_append_window(mut self, start: f64, end: f64) -> Self {
        self.append_window = (start, end);
        self
    }

    /// True if the same init segment (by value) was appended last, per the
    /// idempotence rule in spec §4.E's `appendInit`.
    pub fn shares_init_segment_with(&self, other: &Option<Arc<InitSegmentReference>>) -> bool {
        match (&self.init_segment, other) {
            (Some(a), Some(b)) => **a == **b,
            (None, None) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct Stream {
    pub id: StreamId,
    pub content_type: ContentType,
    pub mime_type: String,
    pub codecs: String,
    pub language: Option<String>,
    pub roles: Vec<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
    pub primary: bool,
    pub encrypted: bool,
    pub key_id: Option<String>,
    pub segment_index: SegmentIndex,
    pub init_segment: Option<Arc<InitSegmentReference>>,
}

impl Stream {
    pub fn pixels(&self) -> Option<u64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(w as u64 * h as u64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub id: VariantId,
    pub audio: Option<StreamId>,
    pub video: Option<StreamId>,
    pub text: Option<StreamId>,
    pub bandwidth: u64,
    pub drm_infos: Vec<DrmInfo>,
    pub allowed_by_application: bool,
    pub allowed_by_key_system: bool,
}

impl Variant {
    /// Invariant per spec §3: either audio or video must be present.
    pub fn is_valid(&self) -> bool {
        self.audio.is_some() || self.video.is_some()
    }

    pub fn is_playable(&self) -> bool {
        self.allowed_by_application && self.allowed_by_key_system
    }
}

#[derive(Debug, Clone)]
pub struct Period {
    pub id: PeriodId,
    pub start: f64,
    pub variants: Vec<VariantId>,
    pub text_streams: Vec<StreamId>,
}

/// The manifest graph produced by a [`crate::parser::ManifestParser`]:
/// arena-owned periods/variants/streams addressed by ID (spec §9).
#[derive(Debug)]
pub struct Manifest {
    pub timeline: TimelineConfig,
    pub periods: Vec<Period>,
    pub variants: Vec<Variant>,
    pub streams: Vec<Stream>,
}

impl Manifest {
    pub fn new(timeline: TimelineConfig) -> Self {
        Self {
            timeline,
            periods: Vec::new(),
            variants: Vec::new(),
            streams: Vec::new(),
        }
    }

    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(id.0 as usize)
    }

    pub fn stream_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.streams.get_mut(id.0 as usize)
    }

    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.get(id.0 as usize)
    }

    pub fn period(&self, id: PeriodId) -> Option<&Period> {
        self.periods.get(id.0 as usize)
    }

    /// Resolves the period active at presentation time `t`. Periods are
    /// non-overlapping and gap-free, so the last period whose start is
    /// `<= t` is the answer.
    pub fn period_at(&self, t: f64) -> Option<&Period> {
        self.periods.iter().rev().find(|p| p.start <= t)
    }

    pub fn variants_in(&self, period: &Period) -> impl Iterator<Item = &Variant> {
        period.variants.iter().filter_map(|id| self.variant(*id))
    }

    pub fn push_stream(&mut self, mut stream: Stream) -> StreamId {
        let id = StreamId(self.streams.len() as u32);
        stream.id = id;
        self.streams.push(stream);
        id
    }

    pub fn push_variant(&mut self, mut variant: Variant) -> VariantId {
        let id = VariantId(self.variants.len() as u32);
        variant.id = id;
        self.variants.push(variant);
        id
    }

    pub fn push_period(&mut self, mut period: Period) -> PeriodId {
        let id = PeriodId(self.periods.len() as u32);
        period.id = id;
        self.periods.push(period);
        id
    }
}
