pub mod ffmpeg_reader;
pub mod sampler;
#[cfg(test)]
pub(crate) mod synthetic;
#[cfg(test)]
pub(crate) mod test_clip;

use crate::error::{MediaError, MediaResult};
use crate::run_artifacts::VideoMetadata;
use ffmpeg_reader::FfmpegReader;
use image::RgbImage;
use std::io::Write;
use tempfile::NamedTempFile;

pub use sampler::{sample, Frame, FrameSampler, SamplePlan, SampleRequest};

/// Stream properties reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub duration_seconds: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.fps
    }
}

impl From<&VideoInfo> for VideoMetadata {
    fn from(info: &VideoInfo) -> Self {
        VideoMetadata {
            duration: round2(info.duration_seconds),
            fps: round2(info.fps),
            size: [info.width, info.height],
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A forward decoding cursor over one video stream.
///
/// Decoding is split into `grab` (advance and decode, no pixel conversion)
/// and `retrieve` (convert the most recently grabbed frame to RGB) so that
/// frames skipped by the sampler never pay for colour conversion.
pub trait VideoReader: Send {
    fn info(&self) -> &VideoInfo;

    /// Decode the next frame and make it current. Returns its presentation
    /// time in seconds, or `None` once the stream is exhausted. At end of
    /// stream the previously grabbed frame stays current.
    fn grab(&mut self) -> MediaResult<Option<f64>>;

    /// RGB copy of the current frame. May be called repeatedly.
    fn retrieve(&mut self) -> MediaResult<RgbImage>;

    /// Move the cursor to the key frame at or before `seconds`. The next
    /// `grab` returns the first frame decoded from there.
    fn seek(&mut self, seconds: f64) -> MediaResult<()>;
}

/// An opened video, owned by exactly one request.
///
/// Field order matters: the decoder is dropped before the spooled input
/// file is deleted.
pub struct VideoHandle {
    reader: FfmpegReader,
    _source: NamedTempFile,
}

impl VideoHandle {
    pub fn metadata(&self) -> VideoMetadata {
        VideoMetadata::from(self.reader.info())
    }
}

impl VideoReader for VideoHandle {
    fn info(&self) -> &VideoInfo {
        self.reader.info()
    }

    fn grab(&mut self) -> MediaResult<Option<f64>> {
        self.reader.grab()
    }

    fn retrieve(&mut self) -> MediaResult<RgbImage> {
        self.reader.retrieve()
    }

    fn seek(&mut self, seconds: f64) -> MediaResult<()> {
        self.reader.seek(seconds)
    }
}

/// Open a video held in memory and read its stream headers.
pub fn probe(video_bytes: &[u8]) -> MediaResult<VideoHandle> {
    if video_bytes.is_empty() {
        return Err(MediaError::UnreadableMedia("empty input".to_string()));
    }

    let mut source = tempfile::Builder::new()
        .prefix("framesift-")
        .suffix(".video")
        .tempfile()?;
    source.write_all(video_bytes)?;
    source.flush()?;

    let reader = FfmpegReader::open(source.path())?;
    let info = reader.info();
    tracing::info!(
        "Probed video: duration={:.2}s, fps={:.2}, size={}x{}",
        info.duration_seconds,
        info.fps,
        info.width,
        info.height
    );

    Ok(VideoHandle {
        reader,
        _source: source,
    })
}
