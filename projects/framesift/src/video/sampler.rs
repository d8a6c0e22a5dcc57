// Frame sampler: turns a time window + interval into a forward-only
// sequence of decoded frames, one per sample timestamp.

use super::{VideoInfo, VideoReader};
use crate::config::SEEK_AHEAD_FRAMES;
use crate::error::{MediaError, MediaResult};
use image::RgbImage;

/// Slack used when comparing timestamps that went through float arithmetic.
const TIME_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRequest {
    pub start: f64,
    pub end: f64,
    pub interval: f64,
    pub overlay_time: bool,
    pub remove_shadows: bool,
}

impl SampleRequest {
    pub fn new(start: f64, end: f64, interval: f64) -> Self {
        Self {
            start,
            end,
            interval,
            overlay_time: true,
            remove_shadows: true,
        }
    }

    pub fn with_overlay_time(mut self, enabled: bool) -> Self {
        self.overlay_time = enabled;
        self
    }

    pub fn with_remove_shadows(mut self, enabled: bool) -> Self {
        self.remove_shadows = enabled;
        self
    }

    /// Validate against the probed stream and resolve the sample schedule.
    ///
    /// `end` may overshoot the reported duration by at most one frame, since
    /// containers round their duration.
    pub fn plan(&self, info: &VideoInfo, max_samples: usize) -> MediaResult<SamplePlan> {
        let SampleRequest {
            start,
            end,
            interval,
            ..
        } = *self;

        if !(start.is_finite() && end.is_finite() && interval.is_finite()) {
            return Err(MediaError::InvalidRange(
                "start, end and interval must be finite numbers".to_string(),
            ));
        }
        if start < 0.0 {
            return Err(MediaError::InvalidRange(format!(
                "start {:.3}s is negative",
                start
            )));
        }
        if end < start {
            return Err(MediaError::InvalidRange(format!(
                "end {:.3}s is before start {:.3}s",
                end, start
            )));
        }
        if info.duration_seconds > 0.0 && end > info.duration_seconds + info.frame_duration() {
            return Err(MediaError::InvalidRange(format!(
                "end {:.3}s is past the video duration {:.3}s",
                end, info.duration_seconds
            )));
        }
        if interval <= 0.0 {
            return Err(MediaError::InvalidRange(format!(
                "interval {} must be positive",
                interval
            )));
        }

        let span = end - start;
        let (interval, steps) = if span <= 0.0 {
            (interval, 0.0)
        } else {
            let interval = interval.min(span);
            (interval, (span / interval + 1e-9).floor())
        };

        // Checked before the cast: `steps` can exceed `usize::MAX`.
        if steps + 1.0 > max_samples as f64 {
            return Err(MediaError::ResourceExhausted(format!(
                "{:.0} frames requested, limit is {}",
                steps + 1.0,
                max_samples
            )));
        }
        let count = steps as usize + 1;

        Ok(SamplePlan {
            start,
            end,
            interval,
            count,
        })
    }
}

/// A validated sample schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePlan {
    pub start: f64,
    pub end: f64,
    pub interval: f64,
    pub count: usize,
}

impl SamplePlan {
    pub fn timestamp(&self, index: usize) -> f64 {
        (self.start + index as f64 * self.interval).min(self.end)
    }
}

/// One sampled frame. Never mutated after the sampler yields it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    /// Sample target time.
    pub timestamp_seconds: f64,
    /// Presentation time of the source frame that was selected.
    pub source_pts_seconds: f64,
    pub image: RgbImage,
}

/// Lazy, forward-only sequence of frames over an exclusively borrowed reader.
pub struct FrameSampler<'a, R: VideoReader + ?Sized> {
    reader: &'a mut R,
    plan: SamplePlan,
    next_index: usize,
    /// Pts of the reader's current frame, `None` before the first grab or
    /// right after a seek.
    current_pts: Option<f64>,
    frame_duration: f64,
    seek_distance: f64,
    finished: bool,
}

/// Validate `request` and start sampling `reader`.
///
/// Range problems surface here, before anything is decoded.
pub fn sample<'a, R: VideoReader + ?Sized>(
    reader: &'a mut R,
    request: &SampleRequest,
    max_samples: usize,
) -> MediaResult<FrameSampler<'a, R>> {
    let info = *reader.info();
    let plan = request.plan(&info, max_samples)?;
    let frame_duration = info.frame_duration();

    tracing::debug!(
        "Sampling {} frames from {:.3}s to {:.3}s every {:.3}s",
        plan.count,
        plan.start,
        plan.end,
        plan.interval
    );

    Ok(FrameSampler {
        reader,
        plan,
        next_index: 0,
        current_pts: None,
        frame_duration,
        seek_distance: SEEK_AHEAD_FRAMES * frame_duration,
        finished: false,
    })
}

impl<'a, R: VideoReader + ?Sized> FrameSampler<'a, R> {
    pub fn plan(&self) -> &SamplePlan {
        &self.plan
    }

    /// Advance the cursor until the current frame is the one on screen at
    /// `target`. Returns its pts, or `None` when the stream ends first.
    fn locate(&mut self, target: f64) -> MediaResult<Option<f64>> {
        let cursor = self.current_pts.unwrap_or(0.0);
        if target - cursor > self.seek_distance {
            self.reader.seek(target)?;
            self.current_pts = None;
        }

        loop {
            if let Some(pts) = self.current_pts {
                // The current frame stays on screen until pts + frame_duration.
                if pts + self.frame_duration > target + TIME_EPSILON {
                    return Ok(Some(pts));
                }
            }

            match self.reader.grab()? {
                Some(pts) => self.current_pts = Some(pts),
                None => {
                    // End of stream: the last frame still covers targets up to
                    // one frame past its pts.
                    return Ok(match self.current_pts {
                        Some(pts) if target <= pts + self.frame_duration + TIME_EPSILON => {
                            Some(pts)
                        }
                        _ => None,
                    });
                }
            }
        }
    }
}

impl<'a, R: VideoReader + ?Sized> Iterator for FrameSampler<'a, R> {
    type Item = MediaResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.next_index >= self.plan.count {
            return None;
        }

        let index = self.next_index;
        let target = self.plan.timestamp(index);

        let located = self
            .locate(target)
            .and_then(|pts| match pts {
                Some(pts) => self.reader.retrieve().map(|image| Some((pts, image))),
                None => Ok(None),
            });

        match located {
            Ok(Some((source_pts_seconds, image))) => {
                self.next_index += 1;
                Some(Ok(Frame {
                    index,
                    timestamp_seconds: target,
                    source_pts_seconds,
                    image,
                }))
            }
            Ok(None) => {
                tracing::debug!(
                    "Stream ended before {:.3}s; yielded {} of {} frames",
                    target,
                    index,
                    self.plan.count
                );
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.plan.count - self.next_index))
        }
    }
}
