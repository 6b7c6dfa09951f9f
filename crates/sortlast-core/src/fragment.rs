//! One color+depth sample at one pixel (§3, §4.3).
//!
//! A flat active pixel carries exactly one [`Fragment`]; a layered active
//! pixel carries a count followed by that many fragments, sorted by depth
//! (GLOSSARY: "Fragment").

use crate::error::{Error, Result};
use crate::format::{ColorFormat, DepthFormat};

/// A color sample, tagged by the format it was read with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorValue {
    /// 8-bit RGBA.
    Rgba8([u8; 4]),
    /// 32-bit float RGBA.
    Rgba32F([f32; 4]),
    /// 32-bit float RGB.
    Rgb32F([f32; 3]),
    /// No color data.
    None,
}

impl ColorValue {
    /// The format this value is stored as.
    pub fn format(&self) -> ColorFormat {
        match self {
            Self::Rgba8(_) => ColorFormat::Rgba8,
            Self::Rgba32F(_) => ColorFormat::Rgba32F,
            Self::Rgb32F(_) => ColorFormat::Rgb32F,
            Self::None => ColorFormat::None,
        }
    }

    /// Builds a color value of `format` from a `[r, g, b, a]` float tuple,
    /// scaling/truncating channels the format doesn't carry (§4.2
    /// "clear around region"/"correct background", both of which take a
    /// float color and must store it in whatever format the image uses).
    pub fn from_floats(format: ColorFormat, rgba: [f32; 4]) -> Self {
        match format {
            ColorFormat::Rgba8 => Self::Rgba8([
                (rgba[0].clamp(0.0, 1.0) * 255.0).round() as u8,
                (rgba[1].clamp(0.0, 1.0) * 255.0).round() as u8,
                (rgba[2].clamp(0.0, 1.0) * 255.0).round() as u8,
                (rgba[3].clamp(0.0, 1.0) * 255.0).round() as u8,
            ]),
            ColorFormat::Rgba32F => Self::Rgba32F(rgba),
            ColorFormat::Rgb32F => Self::Rgb32F([rgba[0], rgba[1], rgba[2]]),
            ColorFormat::None => Self::None,
        }
    }

    /// Alpha channel, or `1.0` for formats without one.
    pub fn alpha(&self) -> f32 {
        match self {
            Self::Rgba8(c) => c[3] as f32 / 255.0,
            Self::Rgba32F(c) => c[3],
            Self::Rgb32F(_) | Self::None => 1.0,
        }
    }

    /// Reads a color value of the given format from `buf`.
    pub fn read(buf: &[u8], format: ColorFormat) -> Result<Self> {
        let needed = format.pixel_size();
        if buf.len() < needed {
            return Err(Error::sanity_check_fail("buffer too short for color value"));
        }
        Ok(match format {
            ColorFormat::Rgba8 => Self::Rgba8([buf[0], buf[1], buf[2], buf[3]]),
            ColorFormat::Rgba32F => Self::Rgba32F(read_f32x(buf, 4)),
            ColorFormat::Rgb32F => {
                let v = read_f32x(buf, 3);
                Self::Rgb32F([v[0], v[1], v[2]])
            }
            ColorFormat::None => Self::None,
        })
    }

    /// Writes this color value to `buf`, which must be at least
    /// `self.format().pixel_size()` bytes.
    pub fn write(&self, buf: &mut [u8]) {
        match self {
            Self::Rgba8(c) => buf[0..4].copy_from_slice(c),
            Self::Rgba32F(c) => write_f32x(buf, c),
            Self::Rgb32F(c) => write_f32x(buf, c),
            Self::None => {}
        }
    }
}

fn read_f32x<const N: usize>(buf: &[u8], n: usize) -> [f32; N] {
    let mut out = [0.0f32; N];
    for i in 0..n {
        let start = i * 4;
        out[i] = f32::from_ne_bytes(buf[start..start + 4].try_into().unwrap());
    }
    out
}

fn write_f32x(buf: &mut [u8], values: &[f32]) {
    for (i, v) in values.iter().enumerate() {
        let start = i * 4;
        buf[start..start + 4].copy_from_slice(&v.to_ne_bytes());
    }
}

/// One color+depth sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Color sample.
    pub color: ColorValue,
    /// Depth sample. `1.0` means "background"/farthest; not meaningful when
    /// the image carries no depth format.
    pub depth: f32,
}

impl Fragment {
    /// The background fragment for the given formats: background color
    /// (caller-supplied) and depth `1.0` (§4.2 "clear around region": "...
    /// depth to 1.0").
    pub fn background(color: ColorValue) -> Self {
        Self { color, depth: 1.0 }
    }

    /// Byte size of one fragment in the given formats.
    #[inline]
    pub fn size(color: ColorFormat, depth: DepthFormat) -> usize {
        color.pixel_size() + depth.pixel_size()
    }

    /// Reads a fragment from `buf`.
    pub fn read(buf: &[u8], color: ColorFormat, depth: DepthFormat) -> Result<Self> {
        let color_value = ColorValue::read(buf, color)?;
        let depth_value = if depth.has_depth() {
            let start = color.pixel_size();
            f32::from_ne_bytes(buf[start..start + 4].try_into().map_err(|_| {
                Error::sanity_check_fail("buffer too short for depth value")
            })?)
        } else {
            1.0
        };
        Ok(Self {
            color: color_value,
            depth: depth_value,
        })
    }

    /// Writes this fragment to `buf`.
    pub fn write(&self, buf: &mut [u8], depth: DepthFormat) {
        let color_size = self.color.format().pixel_size();
        self.color.write(&mut buf[..color_size]);
        if depth.has_depth() {
            buf[color_size..color_size + 4].copy_from_slice(&self.depth.to_ne_bytes());
        }
    }
}
