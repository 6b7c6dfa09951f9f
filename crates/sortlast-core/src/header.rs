//! The common image header shared by dense, dense-pointer, and sparse
//! buffers (§3).
//!
//! Every image handle wraps a single contiguous byte buffer whose first
//! bytes are seven machine integers: magic, color format, depth format,
//! width, height, max pixels, and actual bytes. A layered image additionally
//! carries a one-word sub-header (`num_layers`) immediately after the common
//! header and before the pixel payload.
//!
//! Per §9(c) (endianness open question), this implementation assumes a
//! homogeneous byte order across the wire: header fields are read and
//! written with native-endian integer casts, matching the original
//! library's "never byte-swap" assumption rather than defining a portable
//! wire order.
//!
//! # Used By
//!
//! - [`crate::dense`], [`crate::sparse`] — every accessor reads the header
//!   once at the boundary and works with statically-typed fields after
//!   that (design note: "tagged view types").

use crate::error::{Error, Result};
use crate::format::{ColorFormat, DepthFormat};

/// Number of machine words in the common header.
pub const HEADER_WORDS: usize = 7;

/// Byte size of the common header.
pub const HEADER_SIZE: usize = HEADER_WORDS * std::mem::size_of::<i64>();

/// Byte size of the layered sub-header (`num_layers`).
pub const LAYERED_SUBHEADER_SIZE: usize = std::mem::size_of::<i64>();

/// Sentinel `actual_bytes` value for pointer-backed dense images (§3
/// invariant 5: "cannot be packaged for send").
pub const POINTER_ACTUAL_BYTES: i64 = -1;

/// Image class, the mutually-exclusive low bits of [`Magic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageClass {
    /// Flat buffer with header + pixel arrays.
    Dense,
    /// Payload holds two externally-owned pointers; read-only.
    DensePointer,
    /// Run-length encoded active/inactive pixel stream.
    Sparse,
}

const CLASS_DENSE: i64 = 1;
const CLASS_DENSE_POINTER: i64 = 2;
const CLASS_SPARSE: i64 = 3;
const FLAG_LAYERED: i64 = 1 << 4;

/// The image class bits plus the orthogonal `LAYERED` flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Magic(i64);

impl Magic {
    /// Builds a magic value for the given class and layered-ness.
    pub fn new(class: ImageClass, layered: bool) -> Self {
        let base = match class {
            ImageClass::Dense => CLASS_DENSE,
            ImageClass::DensePointer => CLASS_DENSE_POINTER,
            ImageClass::Sparse => CLASS_SPARSE,
        };
        Self(base | if layered { FLAG_LAYERED } else { 0 })
    }

    /// Decodes the image class, raising `InvalidEnum` on an unrecognized
    /// class code.
    pub fn class(&self) -> Result<ImageClass> {
        match self.0 & !FLAG_LAYERED {
            CLASS_DENSE => Ok(ImageClass::Dense),
            CLASS_DENSE_POINTER => Ok(ImageClass::DensePointer),
            CLASS_SPARSE => Ok(ImageClass::Sparse),
            other => Err(Error::invalid_enum("magic", other)),
        }
    }

    /// Whether the `LAYERED` bit is set.
    #[inline]
    pub const fn is_layered(&self) -> bool {
        self.0 & FLAG_LAYERED != 0
    }

    /// Returns this magic with the `LAYERED` bit cleared (§4.2
    /// "adjust for output": "strip the LAYERED flag from magic").
    #[inline]
    pub const fn without_layered(self) -> Self {
        Self(self.0 & !FLAG_LAYERED)
    }

    /// Returns this magic with the `LAYERED` bit set.
    #[inline]
    pub const fn with_layered(self) -> Self {
        Self(self.0 | FLAG_LAYERED)
    }

    /// Raw wire value.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Reconstructs a `Magic` from a raw wire value without validating the
    /// class; validate with [`Magic::class`] before relying on it.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }
}

/// The seven-word common header (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Image class ⊕ LAYERED flag.
    pub magic: Magic,
    /// Color format.
    pub color: ColorFormat,
    /// Depth format.
    pub depth: DepthFormat,
    /// Current logical width.
    pub width: u32,
    /// Current logical height.
    pub height: u32,
    /// Capacity the buffer was allocated for, in pixels.
    pub max_pixels: u32,
    /// Bytes currently occupied: dense total size, sparse compressed size,
    /// or [`POINTER_ACTUAL_BYTES`] for pointer-backed images.
    pub actual_bytes: i64,
}

impl Header {
    /// Reads a header from the front of `buf`.
    ///
    /// Raises `SanityCheckFail` if `buf` is shorter than [`HEADER_SIZE`],
    /// and propagates format-decode errors without failing: callers that
    /// need strict validation should check the returned formats against
    /// [`ColorFormat::None`]/[`DepthFormat::None`] coercion.
    pub fn read(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::sanity_check_fail(format!(
                "buffer of {} bytes too small for {}-byte header",
                buf.len(),
                HEADER_SIZE
            )));
        }
        let words = read_words(buf);
        let (color, _color_err) = ColorFormat::from_code(words[1]);
        let (depth, _depth_err) = DepthFormat::from_code(words[2]);
        Ok(Self {
            magic: Magic::from_raw(words[0]),
            color,
            depth,
            width: words[3].max(0) as u32,
            height: words[4].max(0) as u32,
            max_pixels: words[5].max(0) as u32,
            actual_bytes: words[6],
        })
    }

    /// Writes this header into the front of `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than [`HEADER_SIZE`]; callers must size
    /// buffers via [`crate::size::SizeCalculator`] first.
    pub fn write(&self, buf: &mut [u8]) {
        assert!(buf.len() >= HEADER_SIZE, "buffer too small for header");
        let words = [
            self.magic.raw(),
            self.color.to_code(),
            self.depth.to_code(),
            self.width as i64,
            self.height as i64,
            self.max_pixels as i64,
            self.actual_bytes,
        ];
        write_words(buf, &words);
    }

    /// `width * height`, the pixel count this header declares.
    #[inline]
    pub fn num_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Validates invariant 1 (§3): `width*height <= max_pixels`.
    pub fn check_within_capacity(&self) -> Result<()> {
        if self.num_pixels() > self.max_pixels as u64 {
            return Err(Error::invalid_value(format!(
                "{}x{} ({} pixels) exceeds max_pixels {}",
                self.width,
                self.height,
                self.num_pixels(),
                self.max_pixels
            )));
        }
        Ok(())
    }
}

/// Reads the layered sub-header (`num_layers`) immediately following the
/// common header.
pub fn read_num_layers(buf: &[u8]) -> Result<u32> {
    let start = HEADER_SIZE;
    let end = start + LAYERED_SUBHEADER_SIZE;
    if buf.len() < end {
        return Err(Error::sanity_check_fail(
            "buffer too small for layered sub-header",
        ));
    }
    let raw = i64::from_ne_bytes(buf[start..end].try_into().unwrap());
    Ok(raw.max(0) as u32)
}

/// Writes the layered sub-header (`num_layers`) immediately following the
/// common header.
pub fn write_num_layers(buf: &mut [u8], num_layers: u32) {
    let start = HEADER_SIZE;
    let end = start + LAYERED_SUBHEADER_SIZE;
    assert!(buf.len() >= end, "buffer too small for layered sub-header");
    buf[start..end].copy_from_slice(&(num_layers as i64).to_ne_bytes());
}

/// Offset of the pixel payload, accounting for the layered sub-header when
/// `layered` is set.
#[inline]
pub const fn payload_offset(layered: bool) -> usize {
    if layered {
        HEADER_SIZE + LAYERED_SUBHEADER_SIZE
    } else {
        HEADER_SIZE
    }
}

fn read_words(buf: &[u8]) -> [i64; HEADER_WORDS] {
    let mut words = [0i64; HEADER_WORDS];
    for (i, word) in words.iter_mut().enumerate() {
        let start = i * 8;
        *word = i64::from_ne_bytes(buf[start..start + 8].try_into().unwrap());
    }
    words
}

fn write_words(buf: &mut [u8], words: &[i64; HEADER_WORDS]) {
    for (i, word) in words.iter().enumerate() {
        let start = i * 8;
        buf[start..start + 8].copy_from_slice(&word.to_ne_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_buffer() {
        let header = Header {
            magic: Magic::new(ImageClass::Dense, false),
            color: ColorFormat::Rgba8,
            depth: DepthFormat::D32F,
            width: 4,
            height: 2,
            max_pixels: 16,
            actual_bytes: 100,
        };
        let mut buf = vec![0u8; HEADER_SIZE];
        header.write(&mut buf);
        let read_back = Header::read(&buf).unwrap();
        assert_eq!(read_back, header);
    }

    #[test]
    fn layered_flag_is_orthogonal_to_class() {
        let magic = Magic::new(ImageClass::Sparse, true);
        assert_eq!(magic.class().unwrap(), ImageClass::Sparse);
        assert!(magic.is_layered());
        let stripped = magic.without_layered();
        assert_eq!(stripped.class().unwrap(), ImageClass::Sparse);
        assert!(!stripped.is_layered());
    }

    #[test]
    fn unrecognized_class_is_sanity_check_fail() {
        let magic = Magic::from_raw(0xdead);
        assert!(matches!(
            magic.class(),
            Err(Error::InvalidEnum { field, .. }) if field == "magic"
        ));
    }

    #[test]
    fn short_buffer_fails_to_read_header() {
        let buf = vec![0u8; HEADER_SIZE - 1];
        assert!(Header::read(&buf).is_err());
    }

    #[test]
    fn capacity_check_rejects_oversized_dimensions() {
        let header = Header {
            magic: Magic::new(ImageClass::Dense, false),
            color: ColorFormat::Rgba8,
            depth: DepthFormat::None,
            width: 10,
            height: 10,
            max_pixels: 50,
            actual_bytes: 0,
        };
        assert!(header.check_within_capacity().is_err());
    }
}
