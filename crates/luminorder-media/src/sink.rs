// crates/luminorder-media/src/sink.rs
//
// Encode side of the codec adapter: a single H.264 video stream. Stream and
// encoder timebase are 1/framerate, so every appended frame lasts exactly
// one tick and the output's nominal framerate matches the source's.
//
// PTS strategy: a monotonically increasing frame counter starting at zero —
// the reordered montage has no relationship to source timestamps.

use std::path::Path;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, Id as CodecId};
use ffmpeg::encoder;
use ffmpeg::format::{output as open_output, Pixel};
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::util::rational::Rational;
use ffmpeg::Packet;

use luminorder_core::JobError;

use crate::surface::Surface;

pub struct MovieSink {
    octx:     ffmpeg::format::context::Output,
    encoder:  ffmpeg::encoder::Video,
    scaler:   SwsContext,
    frame_tb: Rational,
    width:    u32,
    height:   u32,
    next_pts: i64,
}

impl MovieSink {
    /// Open `path` for writing `width`×`height` H.264 at `frame_rate`.
    /// Quality is pinned at CRF 0 (x264 lossless) — montage frames should be
    /// faithful copies of the source frames, not re-compressed approximations.
    pub fn open(
        path: &Path,
        width: u32,
        height: u32,
        frame_rate: Rational,
    ) -> Result<Self, JobError> {
        let mut octx = open_output(&path)
            .map_err(|e| JobError::Unwritable(format!("{}: {e}", path.display())))?;

        let h264 = encoder::find(CodecId::H264).ok_or_else(|| {
            JobError::CodecUnavailable("H.264 encoder not found — is libx264 available?".into())
        })?;

        // One tick of the stream timebase = one frame duration (1/framerate).
        let frame_tb = Rational::new(frame_rate.denominator(), frame_rate.numerator());

        {
            let mut ost = octx
                .add_stream(h264)
                .map_err(|e| JobError::Unwritable(format!("add video stream: {e}")))?;
            ost.set_time_base(frame_tb);
        }

        let enc_ctx = codec::context::Context::new_with_codec(h264);
        let mut enc = enc_ctx
            .encoder()
            .video()
            .map_err(|e| JobError::CodecUnavailable(format!("video encoder context: {e}")))?;

        enc.set_width(width);
        enc.set_height(height);
        enc.set_format(Pixel::YUV420P);
        enc.set_time_base(frame_tb);
        enc.set_frame_rate(Some(frame_rate));
        enc.set_bit_rate(0); // CRF controls quality; bit_rate 0 signals VBR

        let mut opts = ffmpeg::Dictionary::new();
        opts.set("crf", "0");
        opts.set("preset", "fast");

        let mut encoder = enc
            .open_as_with(h264, opts)
            .map_err(|e| JobError::CodecUnavailable(format!("open H.264 encoder: {e}")))?;

        // Square pixels. Must be set after open_as_with — libavcodec resets
        // sample_aspect_ratio during codec initialisation.
        encoder.set_aspect_ratio(Rational::new(1, 1));

        // Copy encoder params into the stream's codecpar so the muxer has
        // resolution, format, and codec-private data. set_parameters()
        // requires AsPtr<AVCodecParameters>, which encoder::Video does not
        // implement, so this goes through the FFI directly.
        unsafe {
            let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                (**(*octx.as_mut_ptr()).streams.add(0)).codecpar,
                encoder.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
            );
            if ret < 0 {
                return Err(JobError::Unwritable(format!(
                    "avcodec_parameters_from_context failed: {ret}"
                )));
            }
        }

        octx.write_header()
            .map_err(|e| JobError::Unwritable(format!("write header: {e}")))?;

        let scaler = SwsContext::get(
            Pixel::RGB24, width, height,
            Pixel::YUV420P, width, height,
            Flags::BILINEAR,
        )
        .map_err(|e| JobError::CodecUnavailable(e.to_string()))?;

        Ok(Self { octx, encoder, scaler, frame_tb, width, height, next_pts: 0 })
    }

    /// Encode one surface as the next output frame.
    pub fn append(&mut self, surface: &Surface) -> Result<(), JobError> {
        let frame_idx = self.next_pts as u64;
        if surface.width() != self.width || surface.height() != self.height {
            return Err(JobError::EncodeFailed(frame_idx));
        }

        // Re-stride the packed surface into an ffmpeg frame.
        let mut rgb = VideoFrame::new(Pixel::RGB24, self.width, self.height);
        let stride = rgb.stride(0);
        let row_bytes = self.width as usize * 3;
        {
            let data = rgb.data_mut(0);
            for row in 0..self.height as usize {
                data[row * stride..row * stride + row_bytes]
                    .copy_from_slice(&surface.data()[row * row_bytes..(row + 1) * row_bytes]);
            }
        }

        let mut yuv = VideoFrame::empty();
        self.scaler.run(&rgb, &mut yuv).map_err(|e| {
            eprintln!("[media] RGB→YUV scale failed at output frame {frame_idx}: {e}");
            JobError::EncodeFailed(frame_idx)
        })?;
        yuv.set_pts(Some(self.next_pts));
        // swscale inherits the source SAR; force 1:1 so players don't letterbox.
        unsafe {
            (*yuv.as_mut_ptr()).sample_aspect_ratio = ffmpeg::ffi::AVRational { num: 1, den: 1 };
        }

        self.encoder
            .send_frame(&yuv)
            .map_err(|_| JobError::EncodeFailed(frame_idx))?;
        self.next_pts += 1;
        self.drain_packets(frame_idx)
    }

    /// How many frames have been appended so far.
    pub fn frames_written(&self) -> u64 {
        self.next_pts as u64
    }

    /// Flush the encoder and close the container.
    pub fn finish(mut self) -> Result<(), JobError> {
        let frame_idx = self.next_pts as u64;
        self.encoder
            .send_eof()
            .map_err(|_| JobError::EncodeFailed(frame_idx))?;
        self.drain_packets(frame_idx)?;
        self.octx
            .write_trailer()
            .map_err(|e| JobError::Unwritable(format!("write trailer: {e}")))?;
        Ok(())
    }

    fn drain_packets(&mut self, frame_idx: u64) -> Result<(), JobError> {
        let ost_tb = self
            .octx
            .stream(0)
            .map(|s| s.time_base())
            .unwrap_or(self.frame_tb);

        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(0);
            pkt.rescale_ts(self.frame_tb, ost_tb);
            pkt.write_interleaved(&mut self.octx)
                .map_err(|_| JobError::EncodeFailed(frame_idx))?;
        }
        Ok(())
    }
}
