//! Bit-reverse interlace permutation (§4.5), the receive-side counterpart
//! to [`crate::sparse::split`] in a binary-swap compositing schedule: after
//! `log2(n)` exchange rounds, each peer's accumulated rows are in
//! bit-reversed order relative to the final image and must be permuted
//! back before decode/display.
//!
//! `eventual_num_partitions` need not be a power of two: the bit-reverse
//! rule falls back to identity for any reversed index it produces that's
//! out of range, and the `num_pixels % eventual_num_partitions` remainder
//! is distributed one pixel to each of the lowest-numbered partitions,
//! matching the original library's handling of non-power-of-two partition
//! counts.

use crate::error::{Error, Result};
use crate::sparse::copy::copy_pixel_range;
use crate::sparse::SparseImage;

/// Number of bits [`reverse_bits`] reverses for a given partition count:
/// the smallest bit width whose range covers `n`, found the same way the
/// original's `BIT_REVERSE` macro derives it (doubling until it reaches or
/// passes `n`) rather than via a closed-form log2.
fn bit_width_for(n: u32) -> u32 {
    let mut bits = 0u32;
    let mut placeholder = 1u32;
    while placeholder < n {
        bits += 1;
        placeholder <<= 1;
    }
    bits
}

/// Reverses the low `bits` bits of `value`.
fn reverse_bits(value: u32, bits: u32) -> u32 {
    let mut v = value;
    let mut r = 0u32;
    for _ in 0..bits {
        r = (r << 1) | (v & 1);
        v >>= 1;
    }
    r
}

/// Bit-reverses `original_idx` against `eventual_num_partitions`, falling
/// back to identity when the reversed value lands outside the valid
/// partition range (the non-power-of-two case).
fn reverse_partition_index(original_idx: u32, eventual_num_partitions: u32) -> u32 {
    let reversed = reverse_bits(original_idx, bit_width_for(eventual_num_partitions));
    if reversed >= eventual_num_partitions {
        original_idx
    } else {
        reversed
    }
}

/// The pixel count of natural partition `natural_idx` out of
/// `eventual_num_partitions` partitions covering `num_pixels`: the
/// `num_pixels % eventual_num_partitions` remainder goes one-per-partition
/// to the lowest-numbered partitions.
fn partition_size(natural_idx: u32, eventual_num_partitions: u32, num_pixels: u64) -> u64 {
    let lower = num_pixels / eventual_num_partitions as u64;
    let remaining = num_pixels % eventual_num_partitions as u64;
    lower + if (natural_idx as u64) < remaining { 1 } else { 0 }
}

/// Cumulative pixel offset, within a stream laid out in bit-reversed
/// partition order, of the partition whose natural (post-interlace) index
/// is `partition_index` (§4.5 "interlace offset lookup").
///
/// Mirrors the original's accumulation loop: walk partitions in
/// bit-reversed-scan order and sum the sizes of every one encountered
/// before reaching `partition_index`.
pub fn interlace_offset(partition_index: u32, eventual_num_partitions: u32, num_pixels: u64) -> Result<u64> {
    if eventual_num_partitions == 0 || partition_index >= eventual_num_partitions {
        return Err(Error::invalid_value("partition_index out of range for interlace offset"));
    }
    let mut offset = 0u64;
    for original_idx in 0..eventual_num_partitions {
        let natural_idx = reverse_partition_index(original_idx, eventual_num_partitions);
        if natural_idx == partition_index {
            return Ok(offset);
        }
        offset += partition_size(natural_idx, eventual_num_partitions, num_pixels);
    }
    Err(Error::sanity_check_fail("interlace offset: partition index not found in scan"))
}

/// Permutes `src`'s `n` bit-reversed-order partitions back into natural
/// order. `n < 2` is a verbatim copy (nothing to permute).
pub fn interlace(src: &SparseImage, n: u32) -> Result<SparseImage> {
    let num_pixels = src.num_pixels();
    if n < 2 {
        return copy_pixel_range(src, 0, num_pixels, src.width(), src.height());
    }
    let width = src.width();

    let mut groups = Vec::with_capacity(n as usize);
    for natural_idx in 0..n {
        let size = partition_size(natural_idx, n, num_pixels);
        let offset = interlace_offset(natural_idx, n, num_pixels)?;
        let (group_width, group_height) = if width > 0 && size % width as u64 == 0 {
            (width, (size / width as u64) as u32)
        } else {
            (size as u32, 1)
        };
        groups.push(copy_pixel_range(src, offset, size, group_width, group_height)?);
    }
    concatenate(&groups, src.width(), src.height())
}

fn concatenate(parts: &[SparseImage], width: u32, height: u32) -> Result<SparseImage> {
    let color = parts[0].color_format();
    let depth = parts[0].depth_format();
    let layered = parts.iter().any(|p| p.is_layered());
    let mut builder = crate::sparse::build::SparseBuilder::new(color, depth, width, height, layered);
    for part in parts {
        let mut cursor = crate::sparse::scan::ScanCursor::new(part);
        for _ in 0..part.num_pixels() {
            match cursor.advance_pixel(part)? {
                None => builder.push_inactive(1),
                Some(frags) => builder.push_active(frags),
            }
        }
    }
    builder.finish()
}
