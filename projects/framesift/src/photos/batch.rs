use super::classifier::ColorClassifier;
use crate::archive::ArchiveBuilder;
use crate::config::ProcessingConfig;
use crate::error::{MediaError, MediaResult};
use crate::pipeline::{run_ordered, JobControl};
use crate::run_artifacts::{BatchReport, ClassificationResult, ExcludedImage};
use std::time::Instant;

pub const COLORFUL_DIR: &str = "colorful";
pub const MONOCHROME_DIR: &str = "b&w";

/// One uploaded image.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Outcome for a single input of a batch.
#[derive(Debug)]
pub enum Verdict {
    Colorful(ClassificationResult),
    Monochrome(ClassificationResult),
    Excluded(MediaError),
}

/// Report plus per-input verdicts, indexed like the inputs.
#[derive(Debug)]
pub struct SortedBatch {
    pub report: BatchReport,
    pub verdicts: Vec<Verdict>,
}

impl SortedBatch {
    /// Zip the sorted images under `colorful/` and `b&w/`.
    ///
    /// `images` must be the slice this batch was built from. Excluded inputs
    /// are left out; duplicate filenames get suffixed names.
    pub fn archive(&self, images: &[ImageInput]) -> MediaResult<Vec<u8>> {
        let mut builder = ArchiveBuilder::new();
        for (dir, want_colorful) in [(COLORFUL_DIR, true), (MONOCHROME_DIR, false)] {
            for (input, verdict) in images.iter().zip(&self.verdicts) {
                let selected = match verdict {
                    Verdict::Colorful(_) => want_colorful,
                    Verdict::Monochrome(_) => !want_colorful,
                    Verdict::Excluded(_) => false,
                };
                if selected {
                    builder.add(&format!("{}/{}", dir, input.filename), &input.bytes)?;
                }
            }
        }
        builder.finish()
    }
}

/// Classify every image on the worker pool and sort the results.
///
/// Inputs that cannot be classified are reported under `excluded` and do
/// not affect the others. Only timeout and cancellation fail the batch.
pub fn sort_batch(
    images: &[ImageInput],
    config: &ProcessingConfig,
    control: &JobControl,
) -> MediaResult<SortedBatch> {
    let classifier = ColorClassifier::from_config(config);
    let start_inst = Instant::now();

    let verdicts = run_ordered(
        images.iter().map(Ok),
        config.workers,
        control,
        |input: &ImageInput| {
            Ok(match classifier.classify(&input.filename, &input.bytes) {
                Ok(result) if result.is_colorful => Verdict::Colorful(result),
                Ok(result) => Verdict::Monochrome(result),
                Err(e) => {
                    tracing::warn!("Excluding {}: {}", input.filename, e);
                    Verdict::Excluded(e)
                }
            })
        },
    )?;

    let mut report = BatchReport::default();
    for (input, verdict) in images.iter().zip(&verdicts) {
        match verdict {
            Verdict::Colorful(_) => report.colorful_files.push(input.filename.clone()),
            Verdict::Monochrome(_) => report.bw_files.push(input.filename.clone()),
            Verdict::Excluded(e) => report.excluded.push(ExcludedImage {
                filename: input.filename.clone(),
                reason: e.to_string(),
            }),
        }
    }
    report.colorful_count = report.colorful_files.len();
    report.bw_count = report.bw_files.len();
    report.total = report.colorful_count + report.bw_count;

    tracing::info!(
        "Sorted {} images: {} colorful, {} black & white, {} excluded in {:.1}ms",
        report.total,
        report.colorful_count,
        report.bw_count,
        report.excluded.len(),
        start_inst.elapsed().as_secs_f64() * 1000.0
    );

    Ok(SortedBatch { report, verdicts })
}

/// Classify a single image as a one-element batch.
pub fn classify_one(
    input: &ImageInput,
    config: &ProcessingConfig,
    control: &JobControl,
) -> MediaResult<ClassificationResult> {
    let batch = sort_batch(std::slice::from_ref(input), config, control)?;
    match batch.verdicts.into_iter().next() {
        Some(Verdict::Colorful(result)) | Some(Verdict::Monochrome(result)) => Ok(result),
        Some(Verdict::Excluded(e)) => Err(e),
        None => Err(MediaError::UnreadableImage(format!(
            "no result for {}",
            input.filename
        ))),
    }
}
