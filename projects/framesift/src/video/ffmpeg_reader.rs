use super::{VideoInfo, VideoReader};
use crate::config::FALLBACK_FPS;
use crate::error::{MediaError, MediaResult};
use image::RgbImage;
use std::path::Path;

use ffmpeg_next::ffi;

/// FFmpeg's `AV_NOPTS_VALUE`.
const NO_PTS: i64 = i64::MIN;

/// Video reader backed by FFmpeg via ffmpeg-next.
///
/// Holds a forward-only decode cursor. Decoded frames stay in their native
/// pixel format until `retrieve` converts the current one to RGB24.
pub struct FfmpegReader {
    input_ctx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::codec::decoder::Video,
    video_stream_index: usize,
    time_base: ffmpeg_next::Rational,
    /// Stream start time in stream time base; subtracted from every pts.
    start_pts: i64,
    /// `start_pts` in seconds, added back when seeking.
    start_offset_seconds: f64,
    /// Lazily created on first retrieve (source format is only known then).
    scaler: Option<ScalerState>,
    info: VideoInfo,
    current: ffmpeg_next::util::frame::Video,
    has_current: bool,
    /// Persistent packet object to avoid allocations.
    reuse_packet: ffmpeg_next::codec::packet::Packet,
    /// Whether we've sent EOF to the decoder.
    eof_sent: bool,
}

struct ScalerState {
    context: ffmpeg_next::software::scaling::Context,
    format: ffmpeg_next::format::Pixel,
    width: u32,
    height: u32,
}

// SAFETY: an FfmpegReader is owned by exactly one request and only ever
// driven from one thread at a time; the raw pointers inside ffmpeg-next
// types are never shared.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn open(path: &Path) -> MediaResult<Self> {
        ffmpeg_next::init()
            .map_err(|e| MediaError::UnreadableMedia(format!("FFmpeg init failed: {}", e)))?;

        let input_ctx = ffmpeg_next::format::input(&path)
            .map_err(|e| MediaError::UnreadableMedia(format!("cannot parse container: {}", e)))?;

        let video_stream = input_ctx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| MediaError::UnreadableMedia("no video stream found".to_string()))?;

        let video_stream_index = video_stream.index();
        let time_base = video_stream.time_base();
        let start_pts = if video_stream.start_time() == NO_PTS {
            0
        } else {
            video_stream.start_time()
        };

        let fps = rational_to_f64(video_stream.avg_frame_rate())
            .or_else(|| rational_to_f64(video_stream.rate()))
            .unwrap_or_else(|| {
                tracing::warn!(
                    "FfmpegReader: could not determine FPS, defaulting to {:.1}",
                    FALLBACK_FPS
                );
                FALLBACK_FPS
            });

        let container_duration = input_ctx.duration();
        let duration_seconds = if container_duration > 0 {
            container_duration as f64 / ffi::AV_TIME_BASE as f64
        } else if video_stream.duration() > 0 {
            video_stream.duration() as f64 * f64::from(time_base)
        } else if video_stream.frames() > 0 {
            video_stream.frames() as f64 / fps
        } else {
            tracing::warn!("FfmpegReader: container reports no duration");
            0.0
        };

        let decoder_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())
                .map_err(|e| {
                    MediaError::UnreadableMedia(format!("cannot create decoder context: {}", e))
                })?;

        let decoder = decoder_ctx
            .decoder()
            .video()
            .map_err(|e| MediaError::UnreadableMedia(format!("cannot open video decoder: {}", e)))?;

        let start_offset_seconds = start_pts as f64 * f64::from(time_base);

        let info = VideoInfo {
            duration_seconds,
            fps,
            width: decoder.width(),
            height: decoder.height(),
        };

        tracing::debug!(
            "FfmpegReader: opened stream {} (time_base={}/{}, start_pts={})",
            video_stream_index,
            time_base.numerator(),
            time_base.denominator(),
            start_pts
        );

        Ok(Self {
            input_ctx,
            decoder,
            video_stream_index,
            time_base,
            start_pts,
            start_offset_seconds,
            scaler: None,
            info,
            current: ffmpeg_next::util::frame::Video::empty(),
            has_current: false,
            reuse_packet: ffmpeg_next::codec::packet::Packet::empty(),
            eof_sent: false,
        })
    }

    /// Core decoding loop: receive the next frame, feeding packets as needed.
    /// Returns `Ok(false)` once the decoder is drained.
    fn decode_loop(
        &mut self,
        target_frame: &mut ffmpeg_next::util::frame::Video,
    ) -> MediaResult<bool> {
        loop {
            // 1. Try to receive a decoded frame
            match self.decoder.receive_frame(target_frame) {
                Ok(()) => return Ok(true),
                Err(ffmpeg_next::Error::Other { errno: ffi::EAGAIN }) => {
                    if self.eof_sent {
                        return Ok(false);
                    }
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(false),
                Err(e) => return Err(MediaError::DecodeError(e.to_string())),
            }

            // 2. Feed packets until we find a video packet OR reach EOF
            let mut found_packet = false;
            while next_packet(self.reuse_packet.read(&mut self.input_ctx))? {
                if self.reuse_packet.stream() == self.video_stream_index {
                    self.decoder
                        .send_packet(&self.reuse_packet)
                        .map_err(|e| MediaError::DecodeError(format!("bad packet: {}", e)))?;
                    found_packet = true;
                    break;
                }
            }

            if !found_packet {
                // EOF reached in input file: notify decoder to flush
                self.decoder
                    .send_eof()
                    .map_err(|e| MediaError::DecodeError(format!("flush failed: {}", e)))?;
                self.eof_sent = true;
            }
        }
    }

    fn pts_seconds(&self, frame: &ffmpeg_next::util::frame::Video) -> f64 {
        let pts = frame.timestamp().or_else(|| frame.pts()).unwrap_or(self.start_pts);
        (pts - self.start_pts) as f64 * f64::from(self.time_base)
    }

    fn scaler_for(
        &mut self,
        format: ffmpeg_next::format::Pixel,
        width: u32,
        height: u32,
    ) -> MediaResult<&mut ffmpeg_next::software::scaling::Context> {
        let stale = match &self.scaler {
            Some(s) => s.format != format || s.width != width || s.height != height,
            None => true,
        };
        if stale {
            let context = ffmpeg_next::software::scaling::Context::get(
                format,
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )
            .map_err(|e| MediaError::DecodeError(format!("cannot create scaler: {}", e)))?;
            self.scaler = Some(ScalerState {
                context,
                format,
                width,
                height,
            });
        }
        match self.scaler.as_mut() {
            Some(state) => Ok(&mut state.context),
            None => Err(MediaError::DecodeError("scaler unavailable".to_string())),
        }
    }
}

/// Whether a demux read produced a packet. End of file is `Ok(false)`; any
/// other read failure means the container is damaged.
fn next_packet(read: Result<(), ffmpeg_next::Error>) -> MediaResult<bool> {
    match read {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Eof) => Ok(false),
        Err(e) => Err(MediaError::DecodeError(format!("demux failed: {}", e))),
    }
}

/// Absolute seek position in `AV_TIME_BASE` units for a time measured from
/// the stream start.
fn seek_timestamp(seconds: f64, start_offset_seconds: f64) -> i64 {
    ((seconds.max(0.0) + start_offset_seconds) * ffi::AV_TIME_BASE as f64) as i64
}

/// Copy an RGB24 ffmpeg frame into an owned image, dropping row padding.
fn rgb_frame_to_image(frame: &ffmpeg_next::util::frame::Video) -> MediaResult<RgbImage> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let data = frame.data(0);
    let stride = frame.stride(0);
    let row_len = width * 3;

    let mut pixels = Vec::with_capacity(row_len * height);
    for y in 0..height {
        let src_offset = y * stride;
        let row = data
            .get(src_offset..src_offset + row_len)
            .ok_or_else(|| MediaError::DecodeError("short frame buffer".to_string()))?;
        pixels.extend_from_slice(row);
    }

    RgbImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| MediaError::DecodeError("frame size mismatch".to_string()))
}

fn rational_to_f64(rate: ffmpeg_next::Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(f64::from(rate))
    } else {
        None
    }
}

impl VideoReader for FfmpegReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn grab(&mut self) -> MediaResult<Option<f64>> {
        let mut frame = ffmpeg_next::util::frame::Video::empty();
        if !self.decode_loop(&mut frame)? {
            return Ok(None);
        }
        let pts = self.pts_seconds(&frame);
        self.current = frame;
        self.has_current = true;
        Ok(Some(pts))
    }

    fn retrieve(&mut self) -> MediaResult<RgbImage> {
        if !self.has_current {
            return Err(MediaError::DecodeError("no frame decoded yet".to_string()));
        }
        let format = self.current.format();
        let (width, height) = (self.current.width(), self.current.height());

        let mut rgb = ffmpeg_next::util::frame::Video::empty();
        let current = std::mem::replace(&mut self.current, ffmpeg_next::util::frame::Video::empty());
        let result = self
            .scaler_for(format, width, height)
            .and_then(|scaler| {
                scaler
                    .run(&current, &mut rgb)
                    .map_err(|e| MediaError::DecodeError(format!("scaler failed: {}", e)))
            });
        self.current = current;
        result?;

        rgb_frame_to_image(&rgb)
    }

    fn seek(&mut self, seconds: f64) -> MediaResult<()> {
        let timestamp = seek_timestamp(seconds, self.start_offset_seconds);
        self.input_ctx
            .seek(timestamp, ..timestamp)
            .map_err(|e| MediaError::DecodeError(format!("seek to {:.3}s failed: {}", seconds, e)))?;
        self.decoder.flush();
        self.eof_sent = false;
        self.has_current = false;
        tracing::debug!("FfmpegReader: seeked to {:.3}s", seconds);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_end_of_file_is_not_an_error() {
        assert!(next_packet(Ok(())).unwrap());
        assert!(!next_packet(Err(ffmpeg_next::Error::Eof)).unwrap());
    }

    #[test]
    fn test_damaged_container_is_a_decode_error() {
        for err in [
            ffmpeg_next::Error::InvalidData,
            ffmpeg_next::Error::Bug,
        ] {
            let result = next_packet(Err(err));
            assert_eq!(result.err().unwrap().kind(), ErrorKind::DecodeError);
        }
    }

    #[test]
    fn test_seek_adds_stream_start() {
        let base = ffi::AV_TIME_BASE as i64;
        assert_eq!(seek_timestamp(2.0, 0.0), 2 * base);
        assert_eq!(seek_timestamp(2.0, 1.5), 7 * base / 2);
        assert_eq!(seek_timestamp(-1.0, 0.25), base / 4);
    }
}
