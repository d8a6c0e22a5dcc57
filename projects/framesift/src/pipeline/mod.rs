// Frame extraction pipeline: per-frame transforms and the worker pool that
// runs them

pub mod annotate;
pub mod glyphs;
pub mod orchestrator;
pub mod types;
pub mod workers;

pub use annotate::{annotate, ShadowCurve};
pub use orchestrator::{extract_frames, extract_from_reader, frame_entry_name, ExtractionOutput};
pub use types::JobControl;
pub use workers::run_ordered;
