use crate::cue::Cue;

/// Rendering seam (spec §4.J: "Displays by emitting cues to a displayer
/// interface (`append`, `remove`, `setVisibility`, `destroy`)"). The
/// actual rendering surface (DOM overlay, terminal, ...) is out of scope
/// per spec §1; this crate only drives the interface.
pub trait Displayer: Send + Sync {
    fn append(&self, cue: &Cue);
    fn remove(&self, start: f64, end: f64);
    fn set_visibility(&self, visible: bool);
    fn destroy(&self);
}

/// A no-op displayer, useful for headless operation and tests.
#[derive(Default)]
pub struct NullDisplayer;

impl Displayer for NullDisplayer {
    fn append(&self, _cue: &Cue) {}
    fn remove(&self, _start: f64, _end: f64) {}
    fn set_visibility(&self, _visible: bool) {}
    fn destroy(&self) {}
}
