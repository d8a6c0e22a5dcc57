// Records returned to callers
//
// These are the JSON shapes the command-line front end prints. They carry
// results only; pixel data and archive bytes never pass through here.

use serde::{Deserialize, Serialize};

/// Stream properties reported by a probe, rounded to 2 decimals.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub duration: f64,
    pub fps: f64,
    /// `[width, height]`
    pub size: [u32; 2],
}

/// Verdict for a single image.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub filename: String,
    pub is_colorful: bool,
    /// Rounded to two decimals for display; `is_colorful` is decided first.
    pub colorful_percentage: f64,
    pub message: String,
}

/// An input left out of a batch and the reason it was skipped.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExcludedImage {
    pub filename: String,
    pub reason: String,
}

/// Summary of a sorted batch.
///
/// `colorful_count + bw_count == total`; excluded inputs are not counted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub total: usize,
    pub colorful_count: usize,
    pub bw_count: usize,
    pub colorful_files: Vec<String>,
    pub bw_files: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<ExcludedImage>,
}
