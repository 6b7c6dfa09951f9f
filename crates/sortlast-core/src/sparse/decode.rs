//! Sparse → dense decoding (§4.3).
//!
//! Inactive pixels decode to the background fragment; active pixels decode
//! to their stored fragment (layered: the nearest, i.e. first, fragment —
//! matching how a single Z-buffer-composited layer is read back). With
//! `correct_background` set, each decoded active pixel is additionally
//! blended UNDER the true background color (§4.2's "correct background":
//! the image was cleared against a proxy background and must be corrected
//! against the real one before display).

use crate::compose::blend_fragment;
use crate::dense::OwnedDense;
use crate::error::Result;
use crate::format::BlendDir;
use crate::fragment::{ColorValue, Fragment};
use crate::sparse::scan::ScanCursor;
use crate::sparse::SparseImage;

/// Decodes `sparse` to a freshly allocated flat dense image.
///
/// `background` is the color written for inactive pixels; `true_background`
/// is only consulted when `correct_background` is set.
pub fn decode(sparse: &SparseImage, background: ColorValue, true_background: [f32; 4], correct_background: bool) -> Result<OwnedDense> {
    let color = sparse.color_format();
    let depth = sparse.depth_format();
    let width = sparse.width();
    let height = sparse.height();
    let size = crate::size::SizeCalculator::dense_size(color, depth, width, height);
    let mut out = OwnedDense::assign_buffer(vec![0u8; size], color, depth, width, height, sparse.num_pixels() as u32, 1)?;

    let mut cursor = ScanCursor::new(sparse);
    for pixel in 0..sparse.num_pixels() as usize {
        let frag = match cursor.advance_pixel(sparse)? {
            None => Fragment::background(background),
            Some(mut frags) => {
                let mut frag = frags.remove(0);
                if correct_background {
                    let bg = Fragment {
                        color: ColorValue::from_floats(color, true_background),
                        depth: 1.0,
                    };
                    frag = blend_fragment(frag, bg, BlendDir::Over);
                }
                frag
            }
        };
        crate::dense::write_fragment_at(&mut out, pixel, frag);
    }
    Ok(out)
}
