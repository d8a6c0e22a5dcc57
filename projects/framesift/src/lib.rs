//! Frame extraction from videos and color / black & white photo sorting.
//!
//! The library takes media as byte buffers and returns byte buffers
//! (zip archives) plus serializable records. The `framesift` binary wraps
//! it for local files.

pub mod archive;
pub mod config;
pub mod error;
pub mod photos;
pub mod pipeline;
pub mod run_artifacts;
pub mod video;

pub use config::ProcessingConfig;
pub use error::{ErrorKind, MediaError, MediaResult};
pub use pipeline::{extract_frames, ExtractionOutput, JobControl};
pub use run_artifacts::{BatchReport, ClassificationResult, ExcludedImage, VideoMetadata};
