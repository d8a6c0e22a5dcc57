use crate::config::{ClassifierThresholds, ProcessingConfig};
use crate::error::{MediaError, MediaResult};
use crate::run_artifacts::ClassificationResult;
use image::{ImageReader, Rgb, RgbImage};
use std::io::Cursor;

pub const COLORFUL_MESSAGE: &str = "Colorful";
pub const MONOCHROME_MESSAGE: &str = "Black & White";

/// A pixel is colorful when its channel spread exceeds `saturation`.
pub fn is_colorful_pixel(pixel: &Rgb<u8>, saturation: u8) -> bool {
    let [r, g, b] = pixel.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    max - min > saturation
}

/// Fraction of colorful pixels in `image`, in `[0, 1]`. Empty images count
/// as fully monochrome.
pub fn colorful_ratio(image: &RgbImage, saturation: u8) -> f64 {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let colorful = image
        .pixels()
        .filter(|p| is_colorful_pixel(p, saturation))
        .count() as u64;
    colorful as f64 / total as f64
}

/// Decides whether an image is color or black & white from its pixels.
#[derive(Debug, Clone, Copy)]
pub struct ColorClassifier {
    thresholds: ClassifierThresholds,
    max_image_pixels: u64,
}

impl ColorClassifier {
    pub fn new(thresholds: ClassifierThresholds, max_image_pixels: u64) -> Self {
        Self {
            thresholds,
            max_image_pixels,
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.thresholds, config.max_image_pixels)
    }

    /// The verdict compares the exact percentage with the threshold; only the
    /// reported `colorful_percentage` is rounded to two decimals, so a result
    /// can read `2.0` and still be colorful.
    pub fn classify(&self, filename: &str, bytes: &[u8]) -> MediaResult<ClassificationResult> {
        let image = self.decode(bytes)?;
        let ratio = colorful_ratio(&image, self.thresholds.saturation);
        let percentage = ratio * 100.0;
        let is_colorful = percentage > self.thresholds.colorful_percent;

        tracing::debug!(
            "Classified {}: {:.2}% colorful pixels ({}x{})",
            filename,
            percentage,
            image.width(),
            image.height()
        );

        Ok(ClassificationResult {
            filename: filename.to_string(),
            is_colorful,
            colorful_percentage: (percentage * 100.0).round() / 100.0,
            message: if is_colorful {
                COLORFUL_MESSAGE
            } else {
                MONOCHROME_MESSAGE
            }
            .to_string(),
        })
    }

    /// Decode to RGB, dropping any alpha channel. Dimensions are checked
    /// from the header before pixel data is allocated.
    fn decode(&self, bytes: &[u8]) -> MediaResult<RgbImage> {
        let (width, height) = open_reader(bytes)?.into_dimensions()?;
        let pixels = width as u64 * height as u64;
        if pixels > self.max_image_pixels {
            return Err(MediaError::ResourceExhausted(format!(
                "image is {}x{} ({} pixels), limit is {}",
                width, height, pixels, self.max_image_pixels
            )));
        }
        Ok(open_reader(bytes)?.decode()?.to_rgb8())
    }
}

fn open_reader(bytes: &[u8]) -> MediaResult<ImageReader<Cursor<&[u8]>>> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::UnreadableImage(e.to_string()))
}
