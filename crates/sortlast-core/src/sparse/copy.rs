//! Extracting a contiguous pixel range from a sparse stream (§4.5), shared
//! by [`crate::sparse::split`] and [`crate::sparse::interlace`].

use crate::error::{Error, Result};
use crate::sparse::build::SparseBuilder;
use crate::sparse::scan::ScanCursor;
use crate::sparse::SparseImage;

/// Copies the `count` logical pixels starting at `offset` out of `src` into
/// a fresh sparse image sized `out_width x out_height` (which must multiply
/// out to `count` — callers pick whatever rectangular shape the extracted
/// range represents, e.g. a horizontal band for [`crate::sparse::split`]).
///
/// The degenerate case `offset == 0 && count == src.num_pixels() &&
/// (out_width, out_height) == (src.width(), src.height())` is a verbatim
/// payload copy rather than a pixel-by-pixel walk (§9 open question (b):
/// `split` into one partition is identity).
pub fn copy_pixel_range(src: &SparseImage, offset: u64, count: u64, out_width: u32, out_height: u32) -> Result<SparseImage> {
    if offset + count > src.num_pixels() {
        return Err(Error::invalid_value("pixel range exceeds source image"));
    }
    if out_width as u64 * out_height as u64 != count {
        return Err(Error::invalid_value("out_width*out_height must equal count"));
    }
    if offset == 0 && count == src.num_pixels() && out_width == src.width() && out_height == src.height() {
        return SparseImage::from_raw(src.package().to_vec());
    }

    let mut cursor = ScanCursor::new(src);
    cursor.skip_pixels(src, offset)?;

    let mut builder = SparseBuilder::new(src.color_format(), src.depth_format(), out_width, out_height, src.is_layered());
    for _ in 0..count {
        match cursor.advance_pixel(src)? {
            None => builder.push_inactive(1),
            Some(frags) => builder.push_active(frags),
        }
    }
    builder.finish()
}
