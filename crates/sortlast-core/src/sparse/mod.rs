//! Sparse (run-length encoded) images (§3, §4.3–§4.5).
//!
//! A sparse buffer is the common 7-word header (plus the layered sub-header
//! when applicable) followed by a stream of runs. Each run is a small
//! integer header — `(inactive_count, active_count)` for a flat image,
//! `(inactive_count, active_count, active_fragment_count)` for a layered
//! one — followed by that many active pixels. A flat active pixel is one
//! [`crate::fragment::Fragment`]; a layered active pixel is a `u32` fragment
//! count followed by that many fragments.
//!
//! This module holds the buffer type itself; [`scan`] walks it pixel by
//! pixel, [`build`] constructs one run by run, and [`encode`], [`decode`],
//! [`split`], [`interlace`], and [`copy`] are the transforms built on top of
//! those two primitives.

pub mod build;
pub mod copy;
pub mod decode;
pub mod encode;
pub mod interlace;
pub mod scan;
pub mod split;

use crate::error::{Error, Result};
use crate::format::{ColorFormat, DepthFormat};
use crate::fragment::Fragment;
use crate::header::{payload_offset, read_num_layers, write_num_layers, Header, ImageClass, Magic};

/// An owned sparse image buffer.
#[derive(Debug, Clone)]
pub struct SparseImage {
    buf: Vec<u8>,
}

impl SparseImage {
    /// Wraps a raw buffer, validating that its magic names the sparse
    /// class.
    pub fn from_raw(buf: Vec<u8>) -> Result<Self> {
        let header = Header::read(&buf)?;
        if header.magic.class()? != ImageClass::Sparse {
            return Err(Error::invalid_value("buffer is not a sparse image"));
        }
        Ok(Self { buf })
    }

    /// Builds a sparse image from a header and an already-encoded run
    /// stream, setting `actual_bytes` to the true occupied size.
    pub(crate) fn from_parts(
        color: ColorFormat,
        depth: DepthFormat,
        width: u32,
        height: u32,
        layered: bool,
        payload: &[u8],
    ) -> Self {
        let offset = payload_offset(layered);
        let mut buf = vec![0u8; offset + payload.len()];
        let header = Header {
            magic: Magic::new(ImageClass::Sparse, layered),
            color,
            depth,
            width,
            height,
            max_pixels: width * height,
            actual_bytes: (offset + payload.len()) as i64,
        };
        header.write(&mut buf);
        if layered {
            write_num_layers(&mut buf, 1);
        }
        buf[offset..].copy_from_slice(payload);
        Self { buf }
    }

    /// The buffer's header.
    pub fn header(&self) -> Header {
        Header::read(&self.buf).expect("SparseImage always holds a valid header")
    }

    /// Color format.
    pub fn color_format(&self) -> ColorFormat {
        self.header().color
    }

    /// Depth format.
    pub fn depth_format(&self) -> DepthFormat {
        self.header().depth
    }

    /// Logical width.
    pub fn width(&self) -> u32 {
        self.header().width
    }

    /// Logical height.
    pub fn height(&self) -> u32 {
        self.header().height
    }

    /// `width * height`.
    pub fn num_pixels(&self) -> u64 {
        self.header().num_pixels()
    }

    /// Whether the LAYERED flag is set.
    pub fn is_layered(&self) -> bool {
        self.header().magic.is_layered()
    }

    /// The run stream, excluding the common and layered sub-headers.
    pub fn payload(&self) -> &[u8] {
        let start = payload_offset(self.is_layered());
        let end = self.header().actual_bytes as usize;
        &self.buf[start..end]
    }

    /// The whole buffer, header included — this is already "packaged" in
    /// the sense of §4.7 (a sparse image's wire form is its own buffer).
    pub fn package(&self) -> &[u8] {
        &self.buf[..self.header().actual_bytes as usize]
    }

    /// Rewraps a packaged buffer back into a `SparseImage`.
    pub fn unpackage(buf: Vec<u8>) -> Result<Self> {
        Self::from_raw(buf)
    }

    /// A fully-inactive sparse image of the given dimensions (§4.3 "clear
    /// sparse": a single run with `inactive = width*height`, `active = 0`).
    pub fn all_inactive(
        color: ColorFormat,
        depth: DepthFormat,
        width: u32,
        height: u32,
        layered: bool,
    ) -> Result<Self> {
        let pixels = width as u64 * height as u64;
        if pixels > u32::MAX as u64 {
            return Err(Error::invalid_value("width*height exceeds a single run's 32-bit count"));
        }
        let mut payload = Vec::new();
        write_run_header(&mut payload, pixels as u32, 0, layered.then_some(0));
        Ok(Self::from_parts(color, depth, width, height, layered, &payload))
    }
}

/// Reads one run header from `buf` at `*pos`, advancing `*pos` past it.
pub(crate) fn read_run_header(buf: &[u8], pos: &mut usize, layered: bool) -> Result<(u32, u32, Option<u32>)> {
    let need = if layered {
        crate::size::RUN_HEADER_SIZE_LAYERED
    } else {
        crate::size::RUN_HEADER_SIZE_FLAT
    };
    if buf.len() < *pos + need {
        return Err(Error::sanity_check_fail("buffer too short for run header"));
    }
    let inactive = u32::from_ne_bytes(buf[*pos..*pos + 4].try_into().unwrap());
    let active = u32::from_ne_bytes(buf[*pos + 4..*pos + 8].try_into().unwrap());
    let frags = if layered {
        Some(u32::from_ne_bytes(buf[*pos + 8..*pos + 12].try_into().unwrap()))
    } else {
        None
    };
    *pos += need;
    Ok((inactive, active, frags))
}

/// Appends one run header to `buf`.
pub(crate) fn write_run_header(buf: &mut Vec<u8>, inactive: u32, active: u32, frags: Option<u32>) {
    buf.extend_from_slice(&inactive.to_ne_bytes());
    buf.extend_from_slice(&active.to_ne_bytes());
    if let Some(f) = frags {
        buf.extend_from_slice(&f.to_ne_bytes());
    }
}

/// Reads one active pixel (a single fragment, or a layered fragment list)
/// from `buf` at `*pos`, advancing `*pos` past it.
pub(crate) fn read_active_pixel(
    buf: &[u8],
    pos: &mut usize,
    color: ColorFormat,
    depth: DepthFormat,
    layered: bool,
) -> Result<Vec<Fragment>> {
    let frag_size = Fragment::size(color, depth);
    if layered {
        if buf.len() < *pos + 4 {
            return Err(Error::sanity_check_fail("buffer too short for fragment count"));
        }
        let count = u32::from_ne_bytes(buf[*pos..*pos + 4].try_into().unwrap());
        *pos += 4;
        let mut frags = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if buf.len() < *pos + frag_size {
                return Err(Error::sanity_check_fail("buffer too short for fragment"));
            }
            frags.push(Fragment::read(&buf[*pos..*pos + frag_size], color, depth)?);
            *pos += frag_size;
        }
        Ok(frags)
    } else {
        if buf.len() < *pos + frag_size {
            return Err(Error::sanity_check_fail("buffer too short for fragment"));
        }
        let frag = Fragment::read(&buf[*pos..*pos + frag_size], color, depth)?;
        *pos += frag_size;
        Ok(vec![frag])
    }
}

/// Appends one active pixel's fragments to `buf`.
pub(crate) fn write_active_pixel(buf: &mut Vec<u8>, frags: &[Fragment], depth: DepthFormat, layered: bool) {
    if layered {
        buf.extend_from_slice(&(frags.len() as u32).to_ne_bytes());
    }
    for frag in frags {
        let color_size = frag.color.format().pixel_size();
        let mut tmp = vec![0u8; color_size + depth.pixel_size()];
        frag.write(&mut tmp, depth);
        buf.extend_from_slice(&tmp);
    }
}
