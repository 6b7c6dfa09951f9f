//! Dense → sparse encoding (§4.3).
//!
//! A pixel is *active* when it could still affect a composite: for
//! Z-buffer mode, depth less than the far plane (`1.0`); for blend mode,
//! depth less than `1.0` when depth is carried, else alpha different from
//! the background, else (open question (a), see DESIGN.md) every pixel —
//! there is no depth or alpha to tell background from foreground.
//!
//! A layered active pixel keeps only its active fragments; if none of a
//! pixel's layers are active the whole pixel is inactive.

use crate::dense::{fragment_at, DenseRead};
use crate::error::Result;
use crate::format::{ColorFormat, CompositeMode, DepthFormat};
use crate::fragment::Fragment;
use crate::sparse::build::SparseBuilder;
use crate::sparse::SparseImage;
use crate::viewport::Viewport;

const ACTIVE_ALPHA_EPSILON: f32 = f32::EPSILON;

fn is_active(frag: &Fragment, color: ColorFormat, depth: DepthFormat, mode: CompositeMode, background_alpha: f32) -> bool {
    if depth.has_depth() {
        return frag.depth < 1.0;
    }
    match mode {
        CompositeMode::ZBuffer { .. } => true,
        CompositeMode::Blend(_) => {
            if color.has_alpha() {
                (frag.color.alpha() - background_alpha).abs() > ACTIVE_ALPHA_EPSILON
            } else {
                true
            }
        }
    }
}

/// Encodes `dense` into a [`SparseImage`] using `mode`'s activity
/// predicate, against a cleared background of `background_alpha`.
pub fn encode(dense: &impl DenseRead, mode: CompositeMode, background_alpha: f32) -> Result<SparseImage> {
    let header = dense.header();
    let layers = dense.num_layers().max(1);
    let layered = layers > 1;
    let mut builder = SparseBuilder::new(header.color, header.depth, header.width, header.height, layered);
    let pixels = header.width as usize * header.height as usize;

    for pixel in 0..pixels {
        let mut active = Vec::new();
        for layer in 0..layers as usize {
            let idx = pixel * layers as usize + layer;
            let frag = fragment_at(dense, idx);
            if is_active(&frag, header.color, header.depth, mode, background_alpha) {
                active.push(frag);
            }
        }
        if active.is_empty() {
            builder.push_inactive(1);
        } else {
            builder.push_active(active);
        }
    }
    builder.finish()
}

/// Encodes only `region` of `dense`, padding pixels outside it as inactive
/// (§4.3's region-restricted encode, used by tile extraction).
pub fn encode_region(
    dense: &impl DenseRead,
    region: Viewport,
    mode: CompositeMode,
    background_alpha: f32,
) -> Result<SparseImage> {
    let header = dense.header();
    let layers = dense.num_layers().max(1);
    let layered = layers > 1;
    let mut builder = SparseBuilder::new(header.color, header.depth, header.width, header.height, layered);

    for y in 0..header.height {
        for x in 0..header.width {
            if !region.contains(x, y) {
                builder.push_inactive(1);
                continue;
            }
            let pixel = (y as usize) * header.width as usize + x as usize;
            let mut active = Vec::new();
            for layer in 0..layers as usize {
                let idx = pixel * layers as usize + layer;
                let frag = fragment_at(dense, idx);
                if is_active(&frag, header.color, header.depth, mode, background_alpha) {
                    active.push(frag);
                }
            }
            if active.is_empty() {
                builder.push_inactive(1);
            } else {
                builder.push_active(active);
            }
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::OwnedDense;
    use crate::format::DepthFormat;
    use crate::fragment::ColorValue;

    fn sample_dense() -> OwnedDense {
        // 2x1, first pixel at the far plane (inactive), second in front.
        let size = crate::size::SizeCalculator::dense_size(ColorFormat::Rgba8, DepthFormat::D32F, 2, 1);
        let mut img = OwnedDense::assign_buffer(vec![0u8; size], ColorFormat::Rgba8, DepthFormat::D32F, 2, 1, 2, 1).unwrap();
        img.color_bytes_mut()[0..4].copy_from_slice(&[0, 0, 0, 0]);
        img.depth_bytes_mut()[0..4].copy_from_slice(&1.0f32.to_ne_bytes());
        img.color_bytes_mut()[4..8].copy_from_slice(&[200, 10, 10, 255]);
        img.depth_bytes_mut()[4..8].copy_from_slice(&0.3f32.to_ne_bytes());
        img
    }

    #[test]
    fn far_plane_pixel_encodes_inactive() {
        let dense = sample_dense();
        let sparse = encode(&dense, CompositeMode::z_buffer(), 0.0).unwrap();
        let mut cursor = crate::sparse::scan::ScanCursor::new(&sparse);
        assert_eq!(cursor.advance_pixel(&sparse).unwrap(), None);
        let second = cursor.advance_pixel(&sparse).unwrap().unwrap();
        assert_eq!(second[0].color, ColorValue::Rgba8([200, 10, 10, 255]));
    }

    #[test]
    fn region_outside_pixels_are_forced_inactive() {
        let dense = sample_dense();
        let sparse = encode_region(&dense, Viewport::new(0, 0, 1, 1), CompositeMode::z_buffer(), 0.0).unwrap();
        let mut cursor = crate::sparse::scan::ScanCursor::new(&sparse);
        // Pixel 0 is at the far plane *and* inside the region: inactive.
        assert_eq!(cursor.advance_pixel(&sparse).unwrap(), None);
        // Pixel 1 is active in the source but outside the 1x1 region.
        assert_eq!(cursor.advance_pixel(&sparse).unwrap(), None);
    }
}
