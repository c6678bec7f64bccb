//! DASH (MPD) manifest support.

pub mod mpd;
pub mod parser;
pub mod patch;
mod template;

pub use mpd::Mpd;
pub use parser::{build_manifest, build_segment_index, DashParser};
pub use patch::{apply_patch, MpdPatch, PatchEntry, PatchOp, PatchTarget};
