// Process-wide tuning values.
//
// Every threshold the pipeline compares against lives here as a named
// constant. `ProcessingConfig` is built once at startup and passed by
// reference into each request.

use std::time::Duration;

/// A pixel counts as colorful when `max(R,G,B) - min(R,G,B)` exceeds this.
pub const SATURATION_THRESHOLD: u8 = 15;

/// An image is colorful when strictly more than this percentage of its
/// pixels are colorful.
pub const COLORFUL_PERCENT_THRESHOLD: f64 = 2.0;

/// Pixels with Rec.601 luma at or above this value are left untouched by
/// shadow removal.
pub const SHADOW_LUMA_THRESHOLD: f32 = 96.0;

/// Exponent of the shadow lift curve `T * (Y / T)^gamma`. Must be in (0, 1).
pub const SHADOW_LIFT_GAMMA: f32 = 0.6;

/// Opacity of the black rectangle drawn behind the timestamp.
pub const OVERLAY_BACKING_ALPHA: f32 = 0.6;

/// Distance in pixels between the frame corner and the timestamp box.
pub const OVERLAY_MARGIN: u32 = 10;

/// Forward gap (in source frames) beyond which the sampler seeks instead of
/// decoding every intermediate frame.
pub const SEEK_AHEAD_FRAMES: f64 = 50.0;

/// Used when the container does not report a usable frame rate.
pub const FALLBACK_FPS: f64 = 30.0;

pub const DEFAULT_INTERVAL_SECONDS: f64 = 0.1;
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;
pub const DEFAULT_MAX_IMAGE_PIXELS: u64 = 100_000_000;

/// File extensions accepted when collecting photos from a directory.
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierThresholds {
    pub saturation: u8,
    pub colorful_percent: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            saturation: SATURATION_THRESHOLD,
            colorful_percent: COLORFUL_PERCENT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    /// Upper bound on annotation / classification worker threads.
    pub workers: usize,
    /// Largest number of frames one extraction request may produce.
    pub max_samples: usize,
    /// Largest decoded image (width * height) the classifier accepts.
    pub max_image_pixels: u64,
    /// Wall-clock budget for one request; `None` means unbounded.
    pub timeout: Option<Duration>,
    pub thresholds: ClassifierThresholds,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            max_samples: DEFAULT_MAX_SAMPLES,
            max_image_pixels: DEFAULT_MAX_IMAGE_PIXELS,
            timeout: None,
            thresholds: ClassifierThresholds::default(),
        }
    }
}

impl ProcessingConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
