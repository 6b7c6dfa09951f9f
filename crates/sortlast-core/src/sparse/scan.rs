//! The central run-stream walker (§4.4).
//!
//! [`ScanCursor`] is the one place that understands run-header layout;
//! every sparse transform (`decode`, `compose_dense_sparse`,
//! `compose_sparse_sparse`, `copy`, `split`, `interlace`) drives one or two
//! of these rather than re-deriving the stream format.

use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::sparse::{read_active_pixel, read_run_header, SparseImage};

/// Walks a [`SparseImage`]'s run stream one logical pixel at a time.
pub struct ScanCursor {
    pos: usize,
    inactive_remaining: u32,
    active_remaining: u32,
    pixels_seen: u64,
}

impl ScanCursor {
    /// A cursor positioned at the start of `image`'s run stream.
    pub fn new(_image: &SparseImage) -> Self {
        Self {
            pos: 0,
            inactive_remaining: 0,
            active_remaining: 0,
            pixels_seen: 0,
        }
    }

    /// How many of `image`'s pixels remain unvisited.
    pub fn pixels_remaining(&self, image: &SparseImage) -> u64 {
        image.num_pixels().saturating_sub(self.pixels_seen)
    }

    fn ensure_run_loaded(&mut self, image: &SparseImage) -> Result<()> {
        if self.inactive_remaining == 0 && self.active_remaining == 0 && self.pixels_seen < image.num_pixels() {
            let (inactive, active, _frags) = read_run_header(image.payload(), &mut self.pos, image.is_layered())?;
            self.inactive_remaining = inactive;
            self.active_remaining = active;
        }
        Ok(())
    }

    /// Advances past one logical pixel, returning `None` for an inactive
    /// pixel or `Some(fragments)` for an active one (a single-element
    /// vector unless `image` is layered).
    ///
    /// Returns `Err(SanityCheckFail)` if called past the end of `image`'s
    /// pixel count, or if the stream is exhausted before that count is
    /// reached (§4.4: "the run-length accounting is an internal
    /// invariant").
    pub fn advance_pixel(&mut self, image: &SparseImage) -> Result<Option<Vec<Fragment>>> {
        if self.pixels_seen >= image.num_pixels() {
            return Err(Error::sanity_check_fail("scan cursor advanced past the declared pixel count"));
        }
        self.ensure_run_loaded(image)?;
        self.pixels_seen += 1;
        if self.inactive_remaining > 0 {
            self.inactive_remaining -= 1;
            Ok(None)
        } else if self.active_remaining > 0 {
            self.active_remaining -= 1;
            let frags = read_active_pixel(
                image.payload(),
                &mut self.pos,
                image.color_format(),
                image.depth_format(),
                image.is_layered(),
            )?;
            Ok(Some(frags))
        } else {
            Err(Error::sanity_check_fail(
                "run stream exhausted before declared pixel count",
            ))
        }
    }

    /// Advances past `count` logical pixels without decoding active
    /// fragments, for callers (e.g. `split`) that only need to find a byte
    /// offset. Returns the number of active pixels skipped.
    pub fn skip_pixels(&mut self, image: &SparseImage, count: u64) -> Result<u64> {
        let mut active_skipped = 0u64;
        for _ in 0..count {
            if self.advance_pixel(image)?.is_some() {
                active_skipped += 1;
            }
        }
        Ok(active_skipped)
    }

    /// Byte offset into `image.payload()` this cursor has reached.
    pub fn byte_offset(&self) -> usize {
        self.pos
    }
}
