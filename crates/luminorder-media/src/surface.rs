// crates/luminorder-media/src/surface.rs
//
// RGB24 pixel buffer handed out by MovieSource. The source owns one Surface
// and overwrites it on every read, so a borrow never outlives the next
// adapter call. Rows are packed — stride padding is stripped on copy-in.

pub struct Surface {
    width:  u32,
    height: u32,
    data:   Vec<u8>, // RGB24, row-major, no stride padding
}

impl Surface {
    pub fn new() -> Self {
        Self { width: 0, height: 0, data: Vec::new() }
    }

    /// Build a surface from packed RGB24 bytes; `data.len()` must be
    /// `width * height * 3`.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGB24 bytes: 3 bytes per pixel, rows of exactly `width * 3`.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy one frame's visible pixels in, dropping stride padding.
    pub(crate) fn fill(&mut self, width: u32, height: u32, raw: &[u8], stride: usize) {
        let row_bytes = width as usize * 3;
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.reserve(row_bytes * height as usize);
        for row in 0..height as usize {
            self.data.extend_from_slice(&raw[row * stride..row * stride + row_bytes]);
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_strips_stride_padding() {
        // two 2-pixel rows with 2 bytes of padding each
        let raw = [
            1, 2, 3, 4, 5, 6, 0xEE, 0xEE, // row 0
            7, 8, 9, 10, 11, 12, 0xEE, 0xEE, // row 1
        ];
        let mut s = Surface::new();
        s.fill(2, 2, &raw, 8);
        assert_eq!(s.data(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!((s.width(), s.height()), (2, 2));
    }
}
