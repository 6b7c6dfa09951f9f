//! Incremental run-stream construction, the write-side counterpart to
//! [`crate::sparse::scan::ScanCursor`].
//!
//! A pixel pushed onto an in-progress run either extends that run (more
//! inactive pixels onto an inactive-only run, or more active pixels onto a
//! run already carrying actives) or closes it and starts a new one (an
//! inactive pixel arriving after the run already has active pixels). This
//! two-phase bookkeeping is what keeps adjacent same-kind pixels from
//! paying for a run header each.

use crate::error::Result;
use crate::format::{ColorFormat, DepthFormat};
use crate::fragment::Fragment;
use crate::sparse::{write_active_pixel, write_run_header, SparseImage};

/// Builds one [`SparseImage`] by accepting runs of inactive pixels and
/// individual active pixels in pixel order.
pub struct SparseBuilder {
    color: ColorFormat,
    depth: DepthFormat,
    width: u32,
    height: u32,
    layered: bool,
    payload: Vec<u8>,
    run_inactive: u32,
    run_active: Vec<Vec<Fragment>>,
    pixels_pushed: u64,
}

impl SparseBuilder {
    /// Starts a new, empty builder for an image of the given dimensions
    /// and formats.
    pub fn new(color: ColorFormat, depth: DepthFormat, width: u32, height: u32, layered: bool) -> Self {
        Self {
            color,
            depth,
            width,
            height,
            layered,
            payload: Vec::new(),
            run_inactive: 0,
            run_active: Vec::new(),
            pixels_pushed: 0,
        }
    }

    /// Appends `count` consecutive inactive pixels.
    pub fn push_inactive(&mut self, count: u32) {
        if count == 0 {
            return;
        }
        if !self.run_active.is_empty() {
            self.flush_run();
        }
        self.run_inactive += count;
        self.pixels_pushed += count as u64;
    }

    /// Appends one active pixel. `fragments` is the pixel's fragment list:
    /// exactly one element for a flat image, any number (sorted by depth)
    /// for a layered one.
    pub fn push_active(&mut self, fragments: Vec<Fragment>) {
        self.run_active.push(fragments);
        self.pixels_pushed += 1;
    }

    fn flush_run(&mut self) {
        if self.run_inactive == 0 && self.run_active.is_empty() {
            return;
        }
        let frag_total = self.layered.then(|| {
            self.run_active.iter().map(|f| f.len() as u32).sum::<u32>()
        });
        write_run_header(&mut self.payload, self.run_inactive, self.run_active.len() as u32, frag_total);
        for frags in self.run_active.drain(..) {
            write_active_pixel(&mut self.payload, &frags, self.depth, self.layered);
        }
        self.run_inactive = 0;
    }

    /// Closes the last run (if any pixels are pending) and returns the
    /// finished [`SparseImage`].
    pub fn finish(mut self) -> Result<SparseImage> {
        self.flush_run();
        Ok(SparseImage::from_parts(
            self.color,
            self.depth,
            self.width,
            self.height,
            self.layered,
            &self.payload,
        ))
    }

    /// Pixels pushed so far (inactive runs count fully, active pixels count
    /// one each). Callers building a full image should push until this
    /// equals `width * height`.
    pub fn pixels_pushed(&self) -> u64 {
        self.pixels_pushed
    }
}
