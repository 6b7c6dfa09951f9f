//! Worst-case buffer sizing (§4.1).
//!
//! Exposed as free functions on a zero-sized [`SizeCalculator`] — mirroring
//! how the original library exposes `icetImageBufferSize` and friends as
//! free functions rather than methods on a constructed image — so the
//! external compositing schedule (§1: an external collaborator) can
//! pre-size buffers through the state-store allocator before any image
//! handle exists.

use crate::format::{ColorFormat, DepthFormat};
use crate::header::{HEADER_SIZE, LAYERED_SUBHEADER_SIZE};

/// Byte size of a flat sparse run header: two 32-bit counts.
pub const RUN_HEADER_SIZE_FLAT: usize = 2 * 4;

/// Byte size of a layered sparse run header: three 32-bit counts.
pub const RUN_HEADER_SIZE_LAYERED: usize = 3 * 4;

/// Byte size of the fragment-count prefix on a layered active pixel.
pub const LAYERED_FRAGMENT_COUNT_SIZE: usize = 4;

/// Pure free functions computing worst-case buffer sizes for the three
/// image classes (§4.1).
#[derive(Debug, Clone, Copy)]
pub struct SizeCalculator;

impl SizeCalculator {
    /// Size of one fragment (color+depth).
    #[inline]
    fn fragment_size(color: ColorFormat, depth: DepthFormat) -> usize {
        color.pixel_size() + depth.pixel_size()
    }

    /// Worst-case size of a flat dense image: header plus `w*h` fragments.
    pub fn dense_size(color: ColorFormat, depth: DepthFormat, width: u32, height: u32) -> usize {
        HEADER_SIZE + width as usize * height as usize * Self::fragment_size(color, depth)
    }

    /// Worst-case size of a layered dense image: header, sub-header, and
    /// `w*h*num_layers` fragments split into a color run and a depth run.
    pub fn layered_dense_size(
        color: ColorFormat,
        depth: DepthFormat,
        width: u32,
        height: u32,
        num_layers: u32,
    ) -> usize {
        HEADER_SIZE
            + LAYERED_SUBHEADER_SIZE
            + width as usize
                * height as usize
                * num_layers as usize
                * Self::fragment_size(color, depth)
    }

    /// Worst-case size of a flat sparse image.
    ///
    /// `header + run_header + dense_payload`, plus the degenerate-run slack
    /// `(run_header_size - fragment_size) * ceil(pixels/2)` when
    /// `fragment_size < run_header_size`: an adversarial stream of
    /// alternating 1-pixel runs pays a run header on every pixel and can
    /// exceed the dense size.
    pub fn sparse_size(color: ColorFormat, depth: DepthFormat, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        let fragment_size = Self::fragment_size(color, depth);
        let base = HEADER_SIZE + RUN_HEADER_SIZE_FLAT + pixels * fragment_size;
        base + Self::degenerate_slack(RUN_HEADER_SIZE_FLAT, fragment_size, pixels)
    }

    /// Worst-case size of a layered sparse image.
    ///
    /// Uses the 3-field run header and multiplies the per-pixel payload by
    /// `num_layers`; the slack term compares the layered run header against
    /// the minimal active-pixel payload (the fragment-count prefix alone,
    /// i.e. zero fragments), since that is the smallest an active pixel can
    /// be.
    pub fn layered_sparse_size(
        color: ColorFormat,
        depth: DepthFormat,
        width: u32,
        height: u32,
        num_layers: u32,
    ) -> usize {
        let pixels = width as usize * height as usize;
        let per_pixel = LAYERED_FRAGMENT_COUNT_SIZE
            + num_layers as usize * Self::fragment_size(color, depth);
        let base = HEADER_SIZE + LAYERED_SUBHEADER_SIZE + RUN_HEADER_SIZE_LAYERED + pixels * per_pixel;
        base + Self::degenerate_slack(RUN_HEADER_SIZE_LAYERED, LAYERED_FRAGMENT_COUNT_SIZE, pixels)
    }

    fn degenerate_slack(run_header_size: usize, min_active_pixel_size: usize, pixels: usize) -> usize {
        if min_active_pixel_size < run_header_size {
            (run_header_size - min_active_pixel_size) * pixels.div_ceil(2)
        } else {
            0
        }
    }
}
