use super::glyphs::{self, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use crate::config::{
    OVERLAY_BACKING_ALPHA, OVERLAY_MARGIN, SHADOW_LIFT_GAMMA, SHADOW_LUMA_THRESHOLD,
};
use crate::video::Frame;
use image::{Rgb, RgbImage};

/// Apply the requested transforms to a copy of `frame`. Shadows are lifted
/// before the timestamp is drawn.
pub fn annotate(frame: &Frame, overlay_time: bool, remove_shadows: bool) -> Frame {
    let mut image = if remove_shadows {
        ShadowCurve::default().lift_shadows(&frame.image)
    } else {
        frame.image.clone()
    };

    if overlay_time {
        overlay_timestamp(&mut image, frame.timestamp_seconds);
    }

    Frame {
        index: frame.index,
        timestamp_seconds: frame.timestamp_seconds,
        source_pts_seconds: frame.source_pts_seconds,
        image,
    }
}

/// Brightening curve for dark regions.
///
/// A pixel with Rec.601 luma `Y` below `threshold` has every channel scaled
/// by `f(Y) / Y` where `f(Y) = threshold * (Y / threshold)^gamma`. The gain
/// is at least 1, so channels never decrease; pixels at or above the
/// threshold pass through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct ShadowCurve {
    pub threshold: f32,
    pub gamma: f32,
}

impl Default for ShadowCurve {
    fn default() -> Self {
        Self {
            threshold: SHADOW_LUMA_THRESHOLD,
            gamma: SHADOW_LIFT_GAMMA,
        }
    }
}

impl ShadowCurve {
    pub fn gain(&self, luma: f32) -> f32 {
        if luma <= 0.0 || luma >= self.threshold {
            return 1.0;
        }
        (luma / self.threshold).powf(self.gamma - 1.0)
    }

    pub fn lift_pixel(&self, pixel: Rgb<u8>) -> Rgb<u8> {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        let gain = self.gain(luma);
        if gain == 1.0 {
            return pixel;
        }
        let scale = |c: u8| (c as f32 * gain).round().min(255.0) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    }

    pub fn lift_shadows(&self, image: &RgbImage) -> RgbImage {
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            *pixel = self.lift_pixel(*pixel);
        }
        out
    }
}

/// `MM:SS.ss`, rounded to the nearest hundredth of a second.
pub fn format_timestamp(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let minutes = centis / 6000;
    let secs = (centis % 6000) / 100;
    let hundredths = centis % 100;
    format!("{:02}:{:02}.{:02}", minutes, secs, hundredths)
}

/// Layout of the timestamp box for a frame of the given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub padding: u32,
}

impl OverlayBox {
    pub fn for_frame(frame_width: u32, frame_height: u32, text: &str) -> Self {
        let scale = (frame_width.min(frame_height) / 300).max(1);
        let padding = 2 * scale;
        Self {
            x: OVERLAY_MARGIN,
            y: OVERLAY_MARGIN,
            width: glyphs::text_width(text) * scale + 2 * padding,
            height: GLYPH_HEIGHT * scale + 2 * padding,
            scale,
            padding,
        }
    }
}

/// Burn `seconds` into the top-left corner of `image` as white text on a
/// translucent black box. Anything falling outside the frame is clipped.
pub fn overlay_timestamp(image: &mut RgbImage, seconds: f64) {
    let text = format_timestamp(seconds);
    let (width, height) = image.dimensions();
    let layout = OverlayBox::for_frame(width, height, &text);

    let x_end = (layout.x + layout.width).min(width);
    let y_end = (layout.y + layout.height).min(height);
    let keep = 1.0 - OVERLAY_BACKING_ALPHA;
    for y in layout.y..y_end {
        for x in layout.x..x_end {
            let pixel = image.get_pixel_mut(x, y);
            for c in pixel.0.iter_mut() {
                *c = (*c as f32 * keep).round() as u8;
            }
        }
    }

    let white = Rgb([255, 255, 255]);
    let origin_y = layout.y + layout.padding;
    let mut origin_x = layout.x + layout.padding;
    for c in text.chars() {
        let rows = glyphs::glyph(c);
        for gy in 0..GLYPH_HEIGHT {
            for gx in 0..GLYPH_WIDTH {
                if !glyphs::is_set(rows, gx, gy) {
                    continue;
                }
                for dy in 0..layout.scale {
                    for dx in 0..layout.scale {
                        let px = origin_x + gx * layout.scale + dx;
                        let py = origin_y + gy * layout.scale + dy;
                        if px < width && py < height {
                            image.put_pixel(px, py, white);
                        }
                    }
                }
            }
        }
        origin_x += (GLYPH_WIDTH + GLYPH_SPACING) * layout.scale;
    }
}
