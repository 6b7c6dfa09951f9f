//! Pixel color/depth formats and the composite mode.
//!
//! This module provides the canonical definitions for the color and depth
//! formats a dense or sparse image may carry, plus the process-wide
//! [`CompositeMode`] that governs both the sparse encoder's activity
//! predicate (§4.3) and the compositing operators (§4.6).
//!
//! # Dependencies
//!
//! None (pure Rust types).
//!
//! # Used By
//!
//! - [`crate::header`] — formats are stored as header fields.
//! - [`crate::dense`], [`crate::sparse`] — per-pixel byte sizing.
//! - [`crate::compose`] — activity predicate and blend arithmetic.

use crate::error::{Error, Result};

/// Color channel layout and storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorFormat {
    /// 8-bit RGBA, one byte per channel.
    Rgba8,
    /// 32-bit float RGBA.
    Rgba32F,
    /// 32-bit float RGB, no alpha channel.
    Rgb32F,
    /// No color data carried.
    #[default]
    None,
}

impl ColorFormat {
    /// Bytes occupied by one color sample.
    #[inline]
    pub const fn pixel_size(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgba32F => 16,
            Self::Rgb32F => 12,
            Self::None => 0,
        }
    }

    /// Whether this format carries an alpha channel.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba8 | Self::Rgba32F)
    }

    /// Number of color channels.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgba8 | Self::Rgba32F => 4,
            Self::Rgb32F => 3,
            Self::None => 0,
        }
    }

    /// Decodes the wire representation written to a header field.
    ///
    /// Unknown codes are coerced to [`ColorFormat::None`] and reported via
    /// `Error::InvalidEnum`, matching §4.2's "coerce unknown formats to NONE
    /// with an error".
    pub fn from_code(code: i64) -> (Self, Option<Error>) {
        match code {
            0 => (Self::None, None),
            1 => (Self::Rgba8, None),
            2 => (Self::Rgba32F, None),
            3 => (Self::Rgb32F, None),
            other => (
                Self::None,
                Some(Error::invalid_enum("color format", other)),
            ),
        }
    }

    /// Encodes to the wire representation stored in a header field.
    #[inline]
    pub const fn to_code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Rgba8 => 1,
            Self::Rgba32F => 2,
            Self::Rgb32F => 3,
        }
    }
}

/// Depth storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFormat {
    /// 32-bit float depth.
    D32F,
    /// No depth data carried.
    #[default]
    None,
}

impl DepthFormat {
    /// Bytes occupied by one depth sample.
    #[inline]
    pub const fn pixel_size(self) -> usize {
        match self {
            Self::D32F => 4,
            Self::None => 0,
        }
    }

    /// Whether this format carries depth.
    #[inline]
    pub const fn has_depth(self) -> bool {
        matches!(self, Self::D32F)
    }

    /// Decodes the wire representation written to a header field.
    pub fn from_code(code: i64) -> (Self, Option<Error>) {
        match code {
            0 => (Self::None, None),
            1 => (Self::D32F, None),
            other => (Self::None, Some(Error::invalid_enum("depth format", other))),
        }
    }

    /// Encodes to the wire representation stored in a header field.
    #[inline]
    pub const fn to_code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::D32F => 1,
        }
    }
}

/// Combined byte size of one color+depth fragment.
#[inline]
pub const fn fragment_size(color: ColorFormat, depth: DepthFormat) -> usize {
    color.pixel_size() + depth.pixel_size()
}

/// Direction of an OVER/UNDER alpha blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendDir {
    /// Source composited on top of destination: `dst = src OVER dst`.
    Over,
    /// Destination treated as on top: `dst = dst OVER src`.
    Under,
}

/// Process-wide compositing mode (§6: `composite mode` state-store key).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompositeMode {
    /// Depth comparison: lower depth wins.
    ZBuffer {
        /// Cap on retained fragments per pixel during layered cc-composite
        /// (§9 open question (d)); `None` means no cap beyond operand depth.
        max_layers: Option<u32>,
    },
    /// Alpha blending in the given direction.
    Blend(BlendDir),
}

impl CompositeMode {
    /// Z-buffer mode with no layer cap.
    pub const fn z_buffer() -> Self {
        Self::ZBuffer { max_layers: None }
    }

    /// Whether this mode is Z-buffer (vs. blend).
    #[inline]
    pub const fn is_z_buffer(&self) -> bool {
        matches!(self, Self::ZBuffer { .. })
    }
}

/// Parses a header color/depth format pair, raising on unknown codes.
///
/// Returns formats coerced to `None` on error, per §4.2's "coerce unknown
/// formats to NONE with an error" policy, alongside the `Result` so callers
/// that want to abort can do so while callers that want to proceed with the
/// coerced value can.
pub fn decode_formats(color_code: i64, depth_code: i64) -> (ColorFormat, DepthFormat, Result<()>) {
    let (color, color_err) = ColorFormat::from_code(color_code);
    let (depth, depth_err) = DepthFormat::from_code(depth_code);
    let result = match color_err.or(depth_err) {
        Some(e) => Err(e),
        None => Ok(()),
    };
    (color, depth, result)
}
