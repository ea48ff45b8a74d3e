// crates/luminorder-media/src/analyze.rs
//
// Mean-brightness reduction. Pure: reads the surface, mutates nothing.

use luminorder_core::JobError;

use crate::surface::Surface;

/// Mean over all pixels of `(R+G+B) / (3·255)`, in `[0, 1]`.
///
/// Alpha never reaches here — surfaces are RGB24. The accumulator is f64:
/// a u32 channel sum overflows around 5.6 megapixels of white, and f32
/// drops low-order contributions long before a 4K frame is done.
pub fn brightness(surface: &Surface) -> Result<f64, JobError> {
    let pixels = surface.width() as u64 * surface.height() as u64;
    if pixels == 0 {
        return Err(JobError::EmptySurface);
    }

    let mut sum = 0.0f64;
    for px in surface.data().chunks_exact(3) {
        sum += (px[0] as u32 + px[1] as u32 + px[2] as u32) as f64;
    }
    Ok(sum / (3.0 * 255.0 * pixels as f64))
}
