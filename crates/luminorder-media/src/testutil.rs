// crates/luminorder-media/src/testutil.rs
//
// Fixture clips for tests that need a real movie on disk: encode a short
// sequence of uniform-gray frames through MovieSink, then exercise the decode
// and pipeline paths against the result. One gray level per frame keeps the
// expected brightness order readable in the tests themselves.

use std::path::Path;
use std::sync::Once;

use ffmpeg_the_third::util::rational::Rational;

use crate::sink::MovieSink;
use crate::surface::Surface;

pub(crate) const FIXTURE_WIDTH: u32 = 64;
pub(crate) const FIXTURE_HEIGHT: u32 = 48;

pub(crate) fn ffmpeg_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| crate::init().expect("FFmpeg init"));
}

/// Write a 25 fps clip to `path` with one uniform frame per entry in
/// `levels` (each level is the R=G=B byte value of that frame).
pub(crate) fn write_fixture_clip(path: &Path, levels: &[u8]) {
    ffmpeg_init();
    let mut sink = MovieSink::open(path, FIXTURE_WIDTH, FIXTURE_HEIGHT, Rational::new(25, 1))
        .expect("open fixture sink");
    let pixels = (FIXTURE_WIDTH * FIXTURE_HEIGHT * 3) as usize;
    for &level in levels {
        let surface = Surface::from_rgb(FIXTURE_WIDTH, FIXTURE_HEIGHT, vec![level; pixels]);
        sink.append(&surface).expect("append fixture frame");
    }
    sink.finish().expect("finish fixture clip");
}
