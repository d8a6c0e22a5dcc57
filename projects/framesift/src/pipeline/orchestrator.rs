// Frame extraction pipeline
//
// Decoding runs on the calling thread through the sampler; annotation and
// PNG encoding fan out over the worker pool and come back in frame order
// before the archive is assembled.

use super::annotate::annotate;
use super::types::JobControl;
use super::workers::run_ordered;
use crate::archive::{self, ArchiveEntry};
use crate::config::ProcessingConfig;
use crate::error::{MediaError, MediaResult};
use crate::run_artifacts::VideoMetadata;
use crate::video::{self, Frame, SampleRequest, VideoReader};
use image::ImageFormat;
use std::io::Cursor;
use std::time::Instant;

/// A finished extraction: the complete archive plus what went into it.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub archive: Vec<u8>,
    pub frame_names: Vec<String>,
    pub metadata: VideoMetadata,
}

impl ExtractionOutput {
    pub fn frame_count(&self) -> usize {
        self.frame_names.len()
    }
}

/// Archive entry name for a sampled frame.
pub fn frame_entry_name(index: usize, timestamp_seconds: f64) -> String {
    format!("frame_{:05}_{:.2}s.png", index, timestamp_seconds)
}

/// Probe `video_bytes`, sample it according to `request` and return a zip
/// of annotated PNG frames.
pub fn extract_frames(
    video_bytes: &[u8],
    request: &SampleRequest,
    config: &ProcessingConfig,
    control: &JobControl,
) -> MediaResult<ExtractionOutput> {
    control.check()?;
    let mut handle = video::probe(video_bytes)?;
    extract_from_reader(&mut handle, request, config, control)
}

/// Run the extraction over an already opened reader.
pub fn extract_from_reader<R: VideoReader + ?Sized>(
    reader: &mut R,
    request: &SampleRequest,
    config: &ProcessingConfig,
    control: &JobControl,
) -> MediaResult<ExtractionOutput> {
    let metadata = VideoMetadata::from(reader.info());
    let start_inst = Instant::now();

    let sampler = video::sample(reader, request, config.max_samples)?;
    let plan = *sampler.plan();
    tracing::info!(
        "Extracting up to {} frames ({:.2}s..{:.2}s every {:.3}s) on {} workers",
        plan.count,
        plan.start,
        plan.end,
        plan.interval,
        config.workers
    );

    let overlay_time = request.overlay_time;
    let remove_shadows = request.remove_shadows;
    let entries = run_ordered(sampler, config.workers, control, |frame: Frame| {
        let annotated = annotate(&frame, overlay_time, remove_shadows);
        let mut png = Cursor::new(Vec::new());
        annotated.image.write_to(&mut png, ImageFormat::Png).map_err(|e| {
            MediaError::Io(std::io::Error::other(format!(
                "PNG encode of frame {} failed: {}",
                frame.index, e
            )))
        })?;
        Ok(ArchiveEntry::new(
            frame_entry_name(frame.index, frame.timestamp_seconds),
            png.into_inner(),
        ))
    })?;

    if entries.len() < plan.count {
        tracing::debug!(
            "Stream ended early: {} of {} planned frames decoded",
            entries.len(),
            plan.count
        );
    }

    control.check()?;
    let frame_names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
    let archive = archive::build(entries)?;

    tracing::info!(
        "Extracted {} frames into {} byte archive in {:.1}ms",
        frame_names.len(),
        archive.len(),
        start_inst.elapsed().as_secs_f64() * 1000.0
    );

    Ok(ExtractionOutput {
        archive,
        frame_names,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::video::synthetic::SyntheticReader;
    use crate::video::test_clip;
    use std::io::Read;
    use std::time::Duration;
    use zip::ZipArchive;

    fn config(workers: usize) -> ProcessingConfig {
        ProcessingConfig::default().with_workers(workers)
    }

    #[test]
    fn test_frame_entry_name() {
        assert_eq!(frame_entry_name(0, 0.0), "frame_00000_0.00s.png");
        assert_eq!(frame_entry_name(12, 61.25), "frame_00012_61.25s.png");
    }

    #[test]
    fn test_six_frames_from_ten_second_clip() {
        let mut reader = SyntheticReader::new(30.0, 300).with_size(64, 48);
        let request = SampleRequest::new(0.0, 10.0, 2.0);
        let output =
            extract_from_reader(&mut reader, &request, &config(3), &JobControl::unbounded())
                .unwrap();

        assert_eq!(
            output.frame_names,
            vec![
                "frame_00000_0.00s.png",
                "frame_00001_2.00s.png",
                "frame_00002_4.00s.png",
                "frame_00003_6.00s.png",
                "frame_00004_8.00s.png",
                "frame_00005_10.00s.png",
            ]
        );
        assert_eq!(output.metadata.duration, 10.0);
        assert_eq!(output.metadata.fps, 30.0);
        assert_eq!(output.metadata.size, [64, 48]);

        let mut archive = ZipArchive::new(Cursor::new(output.archive)).unwrap();
        assert_eq!(archive.len(), 6);
        let mut png = Vec::new();
        archive.by_index(0).unwrap().read_to_end(&mut png).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_frames_without_transforms_keep_source_pixels() {
        let mut reader = SyntheticReader::new(10.0, 50);
        let request = SampleRequest::new(1.0, 2.0, 1.0)
            .with_overlay_time(false)
            .with_remove_shadows(false);
        let output =
            extract_from_reader(&mut reader, &request, &config(2), &JobControl::unbounded())
                .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(output.archive)).unwrap();
        let mut sources = Vec::new();
        for i in 0..archive.len() {
            let mut png = Vec::new();
            archive.by_index(i).unwrap().read_to_end(&mut png).unwrap();
            let image = image::load_from_memory(&png).unwrap().to_rgb8();
            sources.push(SyntheticReader::frame_number_of(&image));
        }
        assert_eq!(sources, vec![10, 20]);
    }

    #[test]
    fn test_encoded_clip_end_to_end() {
        let bytes = test_clip::encode_gray_steps(30, 10).unwrap();
        let request = SampleRequest::new(0.0, 10.0, 2.0)
            .with_overlay_time(false)
            .with_remove_shadows(false);
        let output = extract_frames(&bytes, &request, &config(3), &JobControl::unbounded())
            .unwrap();

        assert_eq!(output.metadata.duration, 10.0);
        assert_eq!(output.metadata.fps, 30.0);
        assert_eq!(output.frame_count(), 6);
        assert_eq!(output.frame_names[5], "frame_00005_10.00s.png");

        // t=10 is past the last frame's pts, so it shows second 9.
        let seconds = [0, 2, 4, 6, 8, 9];
        let mut archive = ZipArchive::new(Cursor::new(output.archive)).unwrap();
        for (i, second) in seconds.into_iter().enumerate() {
            let mut png = Vec::new();
            archive.by_index(i).unwrap().read_to_end(&mut png).unwrap();
            let image = image::load_from_memory(&png).unwrap().to_rgb8();
            assert_eq!(
                image.dimensions(),
                (test_clip::CLIP_WIDTH, test_clip::CLIP_HEIGHT)
            );
            let expected = test_clip::expected_gray(test_clip::luma_for_second(second));
            let center = image.get_pixel(test_clip::CLIP_WIDTH / 2, test_clip::CLIP_HEIGHT / 2);
            assert!(
                (center[0] as f64 - expected).abs() < 10.0,
                "frame {} is {:?}, expected about {}",
                i,
                center,
                expected
            );
        }
    }

    #[test]
    fn test_output_is_reproducible() {
        let run = || {
            let mut reader = SyntheticReader::new(30.0, 90);
            let request = SampleRequest::new(0.0, 2.0, 0.5);
            extract_from_reader(&mut reader, &request, &config(4), &JobControl::unbounded())
                .unwrap()
                .archive
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_zero_timeout_returns_no_archive() {
        let mut reader = SyntheticReader::new(30.0, 300);
        let request = SampleRequest::new(0.0, 10.0, 0.1);
        let control = JobControl::new(Some(Duration::ZERO));
        let err = extract_from_reader(&mut reader, &request, &config(2), &control).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }

    #[test]
    fn test_cancelled_job_returns_no_archive() {
        let mut reader = SyntheticReader::new(30.0, 300);
        let request = SampleRequest::new(0.0, 10.0, 0.1);
        let control = JobControl::unbounded();
        control.cancel();
        let err = extract_from_reader(&mut reader, &request, &config(2), &control).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(reader.grabs, 0);
    }

    #[test]
    fn test_mid_stream_corruption_returns_no_archive() {
        let mut reader = SyntheticReader::new(10.0, 100).corrupt_from(35);
        let request = SampleRequest::new(0.0, 9.0, 1.0);
        let err = extract_from_reader(&mut reader, &request, &config(2), &JobControl::unbounded())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[test]
    fn test_invalid_range_rejected_before_decoding() {
        let mut reader = SyntheticReader::new(30.0, 300);
        let request = SampleRequest::new(5.0, 2.0, 1.0);
        let err = extract_from_reader(&mut reader, &request, &config(2), &JobControl::unbounded())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRange);
        assert_eq!(reader.grabs, 0);
    }

    #[test]
    fn test_unreadable_video_bytes() {
        let request = SampleRequest::new(0.0, 1.0, 0.5);
        let err = extract_frames(
            b"not a video",
            &request,
            &config(1),
            &JobControl::unbounded(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableMedia);
    }
}
