// crates/luminorder-media/src/source.rs
//
// Decode side of the codec adapter. Opens the source once and serves frames
// by index: sequential reads decode straight through (no seek), anything
// else seeks to the keyframe at or before the target and burns through the
// GOP. Together with sink.rs this is the only place that touches media files.

use std::path::{Path, PathBuf};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::util::rational::Rational;

use luminorder_core::JobError;

use crate::surface::Surface;

/// Forward distance (in frames) beyond which a keyframe seek beats decoding
/// through the intervening frames.
const SEEK_AHEAD_FRAMES: u64 = 64;

pub struct MovieSource {
    path:        PathBuf,
    ictx:        ffmpeg::format::context::Input,
    decoder:     ffmpeg::decoder::video::Video,
    scaler:      SwsContext,
    video_idx:   usize,
    time_base:   Rational,
    frame_rate:  Rational,
    /// First video PTS in seconds; frame 0 sits here, not at 0.0.
    start_secs:  f64,
    frame_count: u64,
    width:       u32,
    height:      u32,
    /// Index the next sequential decode will produce; None right after a seek.
    next_index:  Option<u64>,
    /// True once EOF has been sent to the decoder (drains held-back frames).
    flushed:     bool,
    surface:     Surface,
}

impl MovieSource {
    pub fn open(path: &Path) -> Result<Self, JobError> {
        if !path.exists() {
            return Err(JobError::NotFound(path.to_path_buf()));
        }

        let ictx = input(&path)
            .map_err(|e| JobError::Unreadable(format!("{}: {e}", path.display())))?;

        let video_idx = ictx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| {
                JobError::UnsupportedFormat(format!("no video stream in {}", path.display()))
            })?
            .index();

        let (time_base, frame_rate, start_secs, frame_count, width, height) = {
            let stream = ictx.stream(video_idx).ok_or_else(|| {
                JobError::UnsupportedFormat(format!("video stream vanished in {}", path.display()))
            })?;
            let tb = stream.time_base();
            let rate = stream.avg_frame_rate();
            if rate.numerator() <= 0 || rate.denominator() <= 0 {
                return Err(JobError::UnsupportedFormat(format!(
                    "unknown frame rate in {}",
                    path.display()
                )));
            }

            let params = stream.parameters();
            let (w, h) = (params.width(), params.height());
            if w == 0 || h == 0 {
                return Err(JobError::UnsupportedFormat(format!(
                    "zero-area video stream in {}",
                    path.display()
                )));
            }

            let start = stream.start_time();
            let start_secs = if start == ffmpeg::ffi::AV_NOPTS_VALUE {
                0.0
            } else {
                start as f64 * f64::from(tb)
            };

            // nb_frames when the container carries it, duration × fps otherwise.
            let count = if stream.frames() > 0 {
                stream.frames() as u64
            } else {
                let dur_secs = if stream.duration() > 0 {
                    stream.duration() as f64 * f64::from(tb)
                } else {
                    ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
                };
                (dur_secs * f64::from(rate)).round() as u64
            };

            (tb, rate, start_secs, count, w, h)
        };

        // Second context for decoder construction (Parameters borrows from
        // Stream, which borrows from ictx).
        let ictx2 = input(&path)
            .map_err(|e| JobError::Unreadable(format!("{}: {e}", path.display())))?;
        let stream2 = ictx2.stream(video_idx).ok_or_else(|| {
            JobError::UnsupportedFormat(format!("video stream vanished in {}", path.display()))
        })?;
        let dec_ctx = ffmpeg::codec::context::Context::from_parameters(stream2.parameters())
            .map_err(|e| JobError::UnsupportedFormat(e.to_string()))?;
        let decoder = dec_ctx
            .decoder()
            .video()
            .map_err(|e| JobError::UnsupportedFormat(e.to_string()))?;

        let scaler = SwsContext::get(
            decoder.format(), decoder.width(), decoder.height(),
            Pixel::RGB24, width, height,
            Flags::BILINEAR,
        )
        .map_err(|e| JobError::UnsupportedFormat(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            ictx,
            decoder,
            scaler,
            video_idx,
            time_base,
            frame_rate,
            start_secs,
            frame_count,
            width,
            height,
            next_index: Some(0),
            flushed: false,
            surface: Surface::new(),
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    pub fn framerate_hz(&self) -> f64 {
        f64::from(self.frame_rate)
    }

    /// Decode frame `index` and return a borrow of the adapter's surface.
    /// The borrow is invalidated by the next call on this source.
    ///
    /// Sequential reads (`index` == previous + 1) are O(1) amortized.
    /// Backward or far-forward reads seek, then burn through the pre-roll —
    /// correct for every `0 <= index < frame_count()`, O(GOP) at worst.
    pub fn read_frame(&mut self, index: u64) -> Result<&Surface, JobError> {
        let sequential = self.next_index == Some(index);
        let near_forward =
            matches!(self.next_index, Some(n) if index > n && index - n < SEEK_AHEAD_FRAMES);
        if !sequential && !near_forward {
            self.seek_before(index)?;
        }

        let target_secs = self.frame_secs(index);
        let half_frame = 0.5 / f64::from(self.frame_rate);

        loop {
            let Some(frame) = self.decode_next(index)? else {
                return Err(JobError::DecodeFailed(index));
            };
            let pts_secs = frame
                .pts()
                .map(|pts| pts as f64 * f64::from(self.time_base))
                .unwrap_or(target_secs);

            // Pre-roll from a keyframe-aligned seek (or a near-forward skip).
            if pts_secs < target_secs - half_frame {
                continue;
            }

            self.surface_from(&frame, index)?;
            self.next_index = Some(index + 1);
            return Ok(&self.surface);
        }
    }

    /// Presentation time of frame `index`, in seconds.
    fn frame_secs(&self, index: u64) -> f64 {
        self.start_secs + index as f64 / f64::from(self.frame_rate)
    }

    /// Backward keyframe seek: land at or before frame `index`, flush the
    /// decoder, and let the PTS filter in read_frame discard the pre-roll.
    fn seek_before(&mut self, index: u64) -> Result<(), JobError> {
        let secs = self.frame_secs(index);
        let ts = (secs * self.time_base.denominator() as f64 / self.time_base.numerator() as f64)
            as i64;

        if self.ictx.seek(ts, ..=ts).is_err() {
            // Some containers refuse the range seek; re-open and decode from
            // the top — the PTS filter still lands on the right frame.
            eprintln!(
                "[media] seek to frame {index} refused — re-opening {}",
                self.path.display()
            );
            self.ictx = input(&self.path)
                .map_err(|e| JobError::Unreadable(format!("{}: {e}", self.path.display())))?;
        }

        self.decoder.flush();
        self.flushed = false;
        self.next_index = None;
        Ok(())
    }

    /// Pull the next decoded frame, feeding packets as needed.
    /// Returns None once the stream (and the decoder's held-back frames)
    /// are exhausted. `index` is only for error attribution.
    fn decode_next(&mut self, index: u64) -> Result<Option<VideoFrame>, JobError> {
        let mut decoded = VideoFrame::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.flushed {
                return Ok(None);
            }

            // Feed exactly one video packet, or EOF when the demuxer is done.
            let mut fed = false;
            for result in self.ictx.packets() {
                let (stream, packet) = result.map_err(|e| {
                    eprintln!("[media] packet read failed near frame {index}: {e}");
                    JobError::DecodeFailed(index)
                })?;
                if stream.index() != self.video_idx {
                    continue;
                }
                self.decoder.send_packet(&packet).map_err(|e| {
                    eprintln!("[media] decoder rejected packet near frame {index}: {e}");
                    JobError::DecodeFailed(index)
                })?;
                fed = true;
                break;
            }
            if !fed {
                // EOF — codecs with B-frames hold frames back; drain them.
                let _ = self.decoder.send_eof();
                self.flushed = true;
            }
        }
    }

    fn surface_from(&mut self, decoded: &VideoFrame, index: u64) -> Result<(), JobError> {
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(JobError::EmptySurface);
        }
        let mut rgb = VideoFrame::empty();
        self.scaler.run(decoded, &mut rgb).map_err(|e| {
            eprintln!("[media] scale failed at frame {index}: {e}");
            JobError::DecodeFailed(index)
        })?;
        self.surface.fill(self.width, self.height, rgb.data(0), rgb.stride(0));
        Ok(())
    }
}
