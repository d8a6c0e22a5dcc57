// Real encoded clips for exercising the FFmpeg reader end to end.

use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::Video as VideoFrame;
use ffmpeg_next::{codec, encoder, format, Packet, Rational};

pub const CLIP_WIDTH: u32 = 72;
pub const CLIP_HEIGHT: u32 = 48;

/// Flat gray luma used for every frame within second `s`.
pub fn luma_for_second(s: u32) -> u8 {
    (20 + 20 * s) as u8
}

/// RGB value the scaler produces for a limited-range luma with neutral chroma.
pub fn expected_gray(luma: u8) -> f64 {
    (luma as f64 - 16.0) * 255.0 / 219.0
}

/// Encode `seconds` of MPEG-4 video at `fps` into an MP4 container.
///
/// Each second is a flat gray frame of increasing brightness, so a sampled
/// frame can be matched back to the second it came from.
pub fn encode_gray_steps(fps: i32, seconds: u32) -> Result<Vec<u8>, ffmpeg_next::Error> {
    ffmpeg_next::init()?;

    let file = tempfile::Builder::new()
        .prefix("framesift-clip-")
        .suffix(".mp4")
        .tempfile()
        .map_err(|_| ffmpeg_next::Error::Bug)?;

    let frame_rate = Rational(fps, 1);
    let codec_time_base = Rational(1, fps);

    let mut octx = format::output(&file.path())?;
    let global_header = octx
        .format()
        .flags()
        .contains(format::Flags::GLOBAL_HEADER);

    let codec = encoder::find(codec::Id::MPEG4).ok_or(ffmpeg_next::Error::EncoderNotFound)?;
    let mut video = codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()?;
    video.set_width(CLIP_WIDTH);
    video.set_height(CLIP_HEIGHT);
    video.set_format(Pixel::YUV420P);
    video.set_time_base(codec_time_base);
    video.set_frame_rate(Some(frame_rate));
    video.set_gop(fps as u32);
    if global_header {
        video.set_flags(codec::Flags::GLOBAL_HEADER);
    }
    let mut encoder = video.open_as(codec)?;

    {
        let mut stream = octx.add_stream(codec)?;
        stream.set_parameters(&encoder);
        stream.set_time_base(codec_time_base);
        stream.set_avg_frame_rate(frame_rate);
    }
    octx.write_header()?;
    let stream_time_base = octx
        .stream(0)
        .map(|s| s.time_base())
        .ok_or(ffmpeg_next::Error::StreamNotFound)?;

    let total = fps as u32 * seconds;
    for i in 0..total {
        let mut frame = VideoFrame::new(Pixel::YUV420P, CLIP_WIDTH, CLIP_HEIGHT);
        frame.data_mut(0).fill(luma_for_second(i / fps as u32));
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        frame.set_pts(Some(i as i64));
        encoder.send_frame(&frame)?;
        write_packets(&mut encoder, &mut octx, codec_time_base, stream_time_base)?;
    }
    encoder.send_eof()?;
    write_packets(&mut encoder, &mut octx, codec_time_base, stream_time_base)?;
    octx.write_trailer()?;
    drop(octx);

    std::fs::read(file.path()).map_err(|_| ffmpeg_next::Error::Bug)
}

fn write_packets(
    encoder: &mut encoder::video::Encoder,
    octx: &mut format::context::Output,
    codec_time_base: Rational,
    stream_time_base: Rational,
) -> Result<(), ffmpeg_next::Error> {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(0);
        packet.set_duration(1);
        packet.rescale_ts(codec_time_base, stream_time_base);
        packet.write_interleaved(octx)?;
    }
    Ok(())
}
