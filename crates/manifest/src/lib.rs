//! Manifest data model, Segment Index (spec §4.B) and the Manifest Parser
//! Interface (spec §4.I) with concrete DASH and HLS parsers.

pub mod dash;
pub mod error;
pub mod hls;
pub mod model;
pub mod parser;
pub mod segment_index;

pub use error::ManifestError;
pub use model::{
    ContentType, DrmInfo, InitDataEntry, InitDataType, InitSegmentReference, Manifest, MediaQuality,
    Period, PeriodId, SegmentReference, Stream, StreamId, Variant, VariantId,
};
pub use parser::{ManifestEvent, ManifestParser, PlayerInterface, TimelineRegion};
pub use segment_index::SegmentIndex;
