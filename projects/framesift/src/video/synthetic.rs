// In-memory constant-frame-rate reader for sampler and pipeline tests.
//
// Frame `n` has pts `n / fps` and is a solid image whose red channel holds
// `n % 256`, so tests can tell which source frame was selected.

use super::{VideoInfo, VideoReader};
use crate::error::{MediaError, MediaResult};
use image::{Rgb, RgbImage};

pub struct SyntheticReader {
    info: VideoInfo,
    frame_count: usize,
    /// Index of the next frame `grab` will decode.
    cursor: usize,
    current: Option<usize>,
    /// Key frame spacing used by `seek`.
    gop: usize,
    /// `grab` fails once it reaches this frame.
    corrupt_from: Option<usize>,
    pub grabs: usize,
    pub retrieves: usize,
    pub seeks: Vec<f64>,
}

impl SyntheticReader {
    pub fn new(fps: f64, frame_count: usize) -> Self {
        Self {
            info: VideoInfo {
                duration_seconds: frame_count as f64 / fps,
                fps,
                width: 32,
                height: 24,
            },
            frame_count,
            cursor: 0,
            current: None,
            gop: 30,
            corrupt_from: None,
            grabs: 0,
            retrieves: 0,
            seeks: Vec::new(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.info.width = width;
        self.info.height = height;
        self
    }

    /// Report a container duration that differs from the decodable frames.
    pub fn with_reported_duration(mut self, seconds: f64) -> Self {
        self.info.duration_seconds = seconds;
        self
    }

    pub fn corrupt_from(mut self, frame: usize) -> Self {
        self.corrupt_from = Some(frame);
        self
    }

    /// Source frame number encoded in an image produced by this reader.
    pub fn frame_number_of(image: &RgbImage) -> u8 {
        image.get_pixel(0, 0)[0]
    }
}

impl VideoReader for SyntheticReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn grab(&mut self) -> MediaResult<Option<f64>> {
        if self.corrupt_from == Some(self.cursor) {
            return Err(MediaError::DecodeError(format!(
                "corrupt packet at frame {}",
                self.cursor
            )));
        }
        if self.cursor >= self.frame_count {
            return Ok(None);
        }
        self.grabs += 1;
        self.current = Some(self.cursor);
        self.cursor += 1;
        Ok(Some(self.current.unwrap_or_default() as f64 / self.info.fps))
    }

    fn retrieve(&mut self) -> MediaResult<RgbImage> {
        let n = self
            .current
            .ok_or_else(|| MediaError::DecodeError("no frame decoded yet".to_string()))?;
        self.retrieves += 1;
        Ok(RgbImage::from_pixel(
            self.info.width,
            self.info.height,
            Rgb([(n % 256) as u8, 40, 40]),
        ))
    }

    fn seek(&mut self, seconds: f64) -> MediaResult<()> {
        self.seeks.push(seconds);
        let last = self.frame_count.saturating_sub(1);
        let target = ((seconds * self.info.fps).floor().max(0.0) as usize).min(last);
        self.cursor = (target / self.gop) * self.gop;
        self.current = None;
        Ok(())
    }
}
