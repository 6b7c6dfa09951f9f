//! Hierarchical K-of-E partitioning (§4.5), the fan-out half of a
//! binary-swap compositing round: divide a sparse image's pixels into
//! `num_partitions` contiguous bands so each can be sent to a different
//! peer.
//!
//! Partitions are sized as evenly as possible; when `num_pixels` doesn't
//! divide evenly, the first `num_pixels % num_partitions` partitions get
//! one extra pixel (so sizes never differ by more than one row).
//!
//! `split(_, 1, _)` is identity (§9 open question (b)): this is exactly
//! [`crate::sparse::copy::copy_pixel_range`]'s `offset == 0, count ==
//! num_pixels` fast path, so it falls out of the general loop below without
//! special-casing.

use crate::error::{Error, Result};
use crate::sparse::copy::copy_pixel_range;
use crate::sparse::SparseImage;

/// One partition's pixel range, as `(offset, count)` in the source's pixel
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    /// First pixel index (inclusive).
    pub offset: u64,
    /// Number of pixels in this partition.
    pub count: u64,
}

/// Computes the `num_partitions` contiguous, near-even pixel ranges for an
/// image of `num_pixels` pixels.
pub fn partition_ranges(num_pixels: u64, num_partitions: u32) -> Result<Vec<PartitionRange>> {
    if num_partitions == 0 {
        return Err(Error::invalid_value("num_partitions must be at least 1"));
    }
    let num_partitions = num_partitions as u64;
    let base = num_pixels / num_partitions;
    let remainder = num_pixels % num_partitions;
    let mut ranges = Vec::with_capacity(num_partitions as usize);
    let mut offset = 0;
    for i in 0..num_partitions {
        let count = base + if i < remainder { 1 } else { 0 };
        ranges.push(PartitionRange { offset, count });
        offset += count;
    }
    Ok(ranges)
}

/// Splits `src` into `num_partitions` sparse sub-images along its pixel
/// order. Each partition keeps `src`'s width (so a partition is a band of
/// full rows) when `num_pixels` is a multiple of `width`; callers that
/// split at non-row boundaries get a partition whose own width/height no
/// longer matches the original frame and must track that themselves.
pub fn split(src: &SparseImage, num_partitions: u32) -> Result<Vec<SparseImage>> {
    let ranges = partition_ranges(src.num_pixels(), num_partitions)?;
    let width = src.width();
    ranges
        .into_iter()
        .map(|range| {
            let (out_width, out_height) = partition_shape(range.count, width);
            copy_pixel_range(src, range.offset, range.count, out_width, out_height)
        })
        .collect()
}

fn partition_shape(count: u64, frame_width: u32) -> (u32, u32) {
    if frame_width > 0 && count % frame_width as u64 == 0 {
        (frame_width, (count / frame_width as u64) as u32)
    } else {
        (count as u32, 1)
    }
}
