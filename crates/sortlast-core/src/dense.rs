//! Dense image operations (§4.2).
//!
//! A dense image payload is `width*height*num_layers` color samples
//! followed by `width*height*num_layers` depth samples (§3); `num_layers`
//! is `1` for a non-layered image. [`OwnedDense`] is a read/write view over
//! an owned buffer; [`DensePointerImage`] is a read-only view over two
//! externally-owned slices (design note: "pointer-backed read-only images
//! → distinct type", so writing through it is a compile error rather than
//! a runtime branch).

use crate::context::StateStore;
use crate::error::{Error, Result};
use crate::format::ColorFormat;
use crate::fragment::ColorValue;
use crate::header::{
    payload_offset, read_num_layers, write_num_layers, Header, ImageClass, Magic,
    POINTER_ACTUAL_BYTES,
};
use crate::size::SizeCalculator;
use crate::viewport::Viewport;

/// Read-only access to a dense image's header and pixel payload.
pub trait DenseRead {
    /// This image's header.
    fn header(&self) -> Header;

    /// Number of depth-ordered layers per pixel (`1` when not layered).
    fn num_layers(&self) -> u32;

    /// The color payload: `width*height*num_layers` samples.
    fn color_bytes(&self) -> &[u8];

    /// The depth payload: `width*height*num_layers` samples.
    fn depth_bytes(&self) -> &[u8];
}

/// An owned, heap-allocated dense image buffer (flat or layered).
#[derive(Debug, Clone)]
pub struct OwnedDense {
    buf: Vec<u8>,
}

impl OwnedDense {
    /// Assigns a freshly allocated buffer as a dense image (§4.2 "assign
    /// buffer"): writes the header, rejecting an empty buffer or dimensions
    /// that don't fit `max_pixels`, and coercing unknown formats to `None`
    /// with an error.
    pub fn assign_buffer(
        buf: Vec<u8>,
        color: ColorFormat,
        depth: crate::format::DepthFormat,
        width: u32,
        height: u32,
        max_pixels: u32,
        num_layers: u32,
    ) -> Result<Self> {
        if buf.is_empty() {
            return Err(Error::invalid_value("buffer must not be NULL/empty"));
        }
        let layered = num_layers != 1;
        if layered && !depth.has_depth() {
            return Err(Error::invalid_operation(
                "layered dense images must have a depth format (magic & LAYERED => depth != NONE)",
            ));
        }
        let header = Header {
            magic: Magic::new(ImageClass::Dense, layered),
            color,
            depth,
            width,
            height,
            max_pixels,
            actual_bytes: 0,
        };
        header.check_within_capacity()?;
        let size = if layered {
            SizeCalculator::layered_dense_size(color, depth, width, height, num_layers)
        } else {
            SizeCalculator::dense_size(color, depth, width, height)
        };
        if buf.len() < size {
            return Err(Error::invalid_value(format!(
                "buffer of {} bytes too small for {} bytes required",
                buf.len(),
                size
            )));
        }
        let mut image = Self { buf };
        let mut written_header = header;
        written_header.actual_bytes = size as i64;
        written_header.write(&mut image.buf);
        if layered {
            write_num_layers(&mut image.buf, num_layers);
        }
        Ok(image)
    }

    /// Changes the logical dimensions in place (§4.2 "set dimensions"):
    /// rejects dimensions that would exceed `max_pixels` and recomputes
    /// `actual_bytes`.
    pub fn set_dimensions(&mut self, width: u32, height: u32) -> Result<()> {
        let mut header = self.header();
        if width as u64 * height as u64 > header.max_pixels as u64 {
            return Err(Error::invalid_value(format!(
                "{width}x{height} exceeds max_pixels {}",
                header.max_pixels
            )));
        }
        header.width = width;
        header.height = height;
        let layers = self.num_layers();
        let size = if self.is_layered() {
            SizeCalculator::layered_dense_size(header.color, header.depth, width, height, layers)
        } else {
            SizeCalculator::dense_size(header.color, header.depth, width, height)
        };
        header.actual_bytes = size as i64;
        header.write(&mut self.buf);
        Ok(())
    }

    /// Whether the `LAYERED` flag is set.
    pub fn is_layered(&self) -> bool {
        self.header().magic.is_layered()
    }

    fn payload_start(&self) -> usize {
        payload_offset(self.is_layered())
    }

    fn layout(&self) -> (usize, usize, usize) {
        // (color_start, depth_start, depth_end)
        let header = self.header();
        let layers = self.num_layers() as usize;
        let pixels = header.width as usize * header.height as usize;
        let color_len = pixels * layers * header.color.pixel_size();
        let depth_len = pixels * layers * header.depth.pixel_size();
        let color_start = self.payload_start();
        let depth_start = color_start + color_len;
        (color_start, depth_start, depth_start + depth_len)
    }

    /// Mutable access to the color payload.
    pub fn color_bytes_mut(&mut self) -> &mut [u8] {
        let (color_start, depth_start, _) = self.layout();
        &mut self.buf[color_start..depth_start]
    }

    /// Mutable access to the depth payload.
    pub fn depth_bytes_mut(&mut self) -> &mut [u8] {
        let (_, depth_start, depth_end) = self.layout();
        &mut self.buf[depth_start..depth_end]
    }

    /// §4.2 "adjust for output": strips the `LAYERED` flag; if the
    /// one-buffer composite mode is enabled and color is present, also
    /// drops depth and recomputes size.
    pub fn adjust_for_output(&mut self, store: &dyn StateStore) -> Result<()> {
        let mut header = self.header();
        header.magic = header.magic.without_layered();
        if store.one_buffer_composite() && header.color != ColorFormat::None {
            header.depth = crate::format::DepthFormat::None;
        }
        let size = SizeCalculator::dense_size(header.color, header.depth, header.width, header.height);
        header.actual_bytes = size as i64;
        header.write(&mut self.buf);
        Ok(())
    }

    /// §4.2 "adjust for input": resets formats from process state and
    /// recomputes size, used when a receiver sees a buffer whose sender
    /// used a larger `max_pixels`.
    pub fn adjust_for_input(&mut self, store: &dyn StateStore) -> Result<()> {
        let mut header = self.header();
        header.color = store.color_format();
        header.depth = store.depth_format();
        let size = SizeCalculator::dense_size(header.color, header.depth, header.width, header.height);
        header.actual_bytes = size as i64;
        header.write(&mut self.buf);
        Ok(())
    }

    /// §4.2 "clear around region": sets every pixel outside `region` to
    /// `background` (and depth to `1.0`), without double-writing any
    /// border pixel. `(0,0,0,0)` clears the whole image.
    pub fn clear_around_region(&mut self, region: Viewport, background: ColorValue) -> Result<()> {
        let header = self.header();
        let (width, height) = (header.width, header.height);
        if region.is_zero() {
            return self.clear_rect(Viewport::new(0, 0, width, height), background);
        }
        let region = region.clamp_to(width, height);
        // Bottom strip: y in [0, region.y)
        if region.y > 0 {
            self.clear_rect(Viewport::new(0, 0, width, region.y), background)?;
        }
        // Top strip: y in [region.top(), height)
        if region.top() < height {
            self.clear_rect(
                Viewport::new(0, region.top(), width, height - region.top()),
                background,
            )?;
        }
        // Left strip, restricted to region's row band to avoid
        // double-writing the corners already cleared by the bottom/top
        // strips.
        if region.x > 0 {
            self.clear_rect(
                Viewport::new(0, region.y, region.x, region.height),
                background,
            )?;
        }
        // Right strip, same restriction.
        if region.right() < width {
            self.clear_rect(
                Viewport::new(region.right(), region.y, width - region.right(), region.height),
                background,
            )?;
        }
        Ok(())
    }

    fn clear_rect(&mut self, rect: Viewport, background: ColorValue) -> Result<()> {
        if rect.width == 0 || rect.height == 0 {
            return Ok(());
        }
        let header = self.header();
        let layers = self.num_layers();
        let color_size = header.color.pixel_size();
        let depth_size = header.depth.pixel_size();
        let (color_start, depth_start, _) = self.layout();
        for y in rect.y..rect.top() {
            for x in rect.x..rect.right() {
                for layer in 0..layers as usize {
                    let pixel_index = (y as usize * header.width as usize + x as usize) * layers as usize + layer;
                    if color_size > 0 {
                        let offset = color_start + pixel_index * color_size;
                        background.write(&mut self.buf[offset..offset + color_size]);
                    }
                    if depth_size > 0 {
                        let offset = depth_start + pixel_index * depth_size;
                        self.buf[offset..offset + depth_size].copy_from_slice(&1f32.to_ne_bytes());
                    }
                }
            }
        }
        Ok(())
    }

    /// §4.2 "background correction": applies UNDER with the configured
    /// true background color to every pixel, for RGBA formats; no-op for
    /// RGB float (no alpha to blend against).
    pub fn correct_background(&mut self, true_background: [f32; 4]) -> Result<()> {
        let header = self.header();
        match header.color {
            ColorFormat::Rgba8 => {
                let bg = [
                    (true_background[0] * 255.0).round() as u8,
                    (true_background[1] * 255.0).round() as u8,
                    (true_background[2] * 255.0).round() as u8,
                    (true_background[3] * 255.0).round() as u8,
                ];
                let color = self.color_bytes_mut();
                for px in color.chunks_exact_mut(4) {
                    let src = [px[0], px[1], px[2], px[3]];
                    let blended = crate::compose::blend_over_rgba8(src, bg);
                    px.copy_from_slice(&blended);
                }
            }
            ColorFormat::Rgba32F => {
                let color = self.color_bytes_mut();
                for px in color.chunks_exact_mut(16) {
                    let src = read_f32_4(px);
                    let blended = crate::compose::blend_over_rgba32f(src, true_background);
                    write_f32_4(px, blended);
                }
            }
            ColorFormat::Rgb32F | ColorFormat::None => {}
        }
        Ok(())
    }

    /// §4.2 "package/unpackage": serializes the whole buffer as bytes.
    /// Pointer-backed images aren't representable here (they are a
    /// distinct, non-serializable type), so this always succeeds for an
    /// `OwnedDense`.
    pub fn package(&self) -> &[u8] {
        &self.buf[..self.header().actual_bytes.max(0) as usize]
    }

    /// Validates and wraps a received byte range as a dense image,
    /// clamping `max_pixels` down to `width*height` (§4.2).
    pub fn unpackage(mut buf: Vec<u8>) -> Result<Self> {
        let mut header = Header::read(&buf)?;
        header.magic.class()?;
        if header.actual_bytes == POINTER_ACTUAL_BYTES {
            return Err(Error::invalid_operation(
                "a pointer-backed image cannot be unpackaged",
            ));
        }
        let layered = header.magic.is_layered();
        let layers = if layered { read_num_layers(&buf)? } else { 1 };
        let expected = if layered {
            SizeCalculator::layered_dense_size(header.color, header.depth, header.width, header.height, layers)
        } else {
            SizeCalculator::dense_size(header.color, header.depth, header.width, header.height)
        };
        if header.actual_bytes as usize != expected {
            return Err(Error::sanity_check_fail(format!(
                "actual_bytes {} does not match computed size {}",
                header.actual_bytes, expected
            )));
        }
        header.max_pixels = header.width * header.height;
        header.write(&mut buf);
        Ok(Self { buf })
    }
}

impl DenseRead for OwnedDense {
    fn header(&self) -> Header {
        Header::read(&self.buf).expect("OwnedDense always carries a valid header")
    }

    fn num_layers(&self) -> u32 {
        if self.is_layered() {
            read_num_layers(&self.buf).unwrap_or(1)
        } else {
            1
        }
    }

    fn color_bytes(&self) -> &[u8] {
        let (color_start, depth_start, _) = self.layout();
        &self.buf[color_start..depth_start]
    }

    fn depth_bytes(&self) -> &[u8] {
        let (_, depth_start, depth_end) = self.layout();
        &self.buf[depth_start..depth_end]
    }
}

/// A read-only dense image backed by externally-owned color/depth slices
/// (§3 "dense pointer image"). The borrow lives only as long as this value
/// (§5), and it cannot be serialized (`actual_bytes == -1`, invariant 5).
#[derive(Debug, Clone, Copy)]
pub struct DensePointerImage<'a> {
    color: &'a [u8],
    depth: &'a [u8],
    width: u32,
    height: u32,
    color_format: ColorFormat,
    depth_format: crate::format::DepthFormat,
}

impl<'a> DensePointerImage<'a> {
    /// Wraps externally-owned color/depth slices as a read-only dense
    /// image.
    pub fn new(
        color: &'a [u8],
        depth: &'a [u8],
        width: u32,
        height: u32,
        color_format: ColorFormat,
        depth_format: crate::format::DepthFormat,
    ) -> Self {
        Self {
            color,
            depth,
            width,
            height,
            color_format,
            depth_format,
        }
    }
}

impl DenseRead for DensePointerImage<'_> {
    fn header(&self) -> Header {
        Header {
            magic: Magic::new(ImageClass::DensePointer, false),
            color: self.color_format,
            depth: self.depth_format,
            width: self.width,
            height: self.height,
            max_pixels: self.width * self.height,
            actual_bytes: POINTER_ACTUAL_BYTES,
        }
    }

    fn num_layers(&self) -> u32 {
        1
    }

    fn color_bytes(&self) -> &[u8] {
        self.color
    }

    fn depth_bytes(&self) -> &[u8] {
        self.depth
    }
}

/// §4.2 "copy pixels": copies the full payload from `src` to `dst`. Both
/// images must share color format, depth format, and layer count.
pub fn copy_pixels(src: &impl DenseRead, dst: &mut OwnedDense) -> Result<()> {
    let src_header = src.header();
    let dst_header = dst.header();
    check_compatible(&src_header, &dst_header, src.num_layers(), dst.num_layers())?;
    dst.color_bytes_mut().copy_from_slice(src.color_bytes());
    dst.depth_bytes_mut().copy_from_slice(src.depth_bytes());
    Ok(())
}

/// §4.2 "copy region": copies `in_viewport` from `src` into `out_viewport`
/// of `dst` (equal size).
pub fn copy_region(
    src: &impl DenseRead,
    in_viewport: Viewport,
    dst: &mut OwnedDense,
    out_viewport: Viewport,
) -> Result<()> {
    if in_viewport.width != out_viewport.width || in_viewport.height != out_viewport.height {
        return Err(Error::invalid_value(
            "in_viewport and out_viewport must have identical size",
        ));
    }
    let src_header = src.header();
    let dst_header = dst.header();
    check_compatible(&src_header, &dst_header, src.num_layers(), dst.num_layers())?;
    let layers = src.num_layers() as usize;
    let color_size = src_header.color.pixel_size();
    let depth_size = src_header.depth.pixel_size();

    for row in 0..in_viewport.height {
        for col in 0..in_viewport.width {
            let src_pixel = ((in_viewport.y + row) as usize * src_header.width as usize
                + (in_viewport.x + col) as usize)
                * layers;
            let dst_pixel = ((out_viewport.y + row) as usize * dst_header.width as usize
                + (out_viewport.x + col) as usize)
                * layers;
            for layer in 0..layers {
                if color_size > 0 {
                    let s = (src_pixel + layer) * color_size;
                    let d = (dst_pixel + layer) * color_size;
                    let sample = src.color_bytes()[s..s + color_size].to_vec();
                    dst.color_bytes_mut()[d..d + color_size].copy_from_slice(&sample);
                }
                if depth_size > 0 {
                    let s = (src_pixel + layer) * depth_size;
                    let d = (dst_pixel + layer) * depth_size;
                    let sample = src.depth_bytes()[s..s + depth_size].to_vec();
                    dst.depth_bytes_mut()[d..d + depth_size].copy_from_slice(&sample);
                }
            }
        }
    }
    Ok(())
}

fn check_compatible(a: &Header, b: &Header, a_layers: u32, b_layers: u32) -> Result<()> {
    if a.color != b.color || a.depth != b.depth || a_layers != b_layers {
        return Err(Error::invalid_value(
            "images must share color format, depth format, and layer count",
        ));
    }
    Ok(())
}

/// §4.2 format conversion: color copies support RGBA8↔RGBA32F and all
/// pairs among {RGBA8, RGBA32F, RGB32F}; float↔ubyte scales by 255;
/// RGB→RGBA fills alpha = 1; RGBA→RGB drops alpha. Depth only supports
/// D32F→D32F (handled by the caller as a plain byte copy).
pub fn convert_color(value: ColorValue, to: ColorFormat) -> Result<ColorValue> {
    use ColorValue::*;
    Ok(match (value, to) {
        (v, fmt) if v.format() == fmt => v,
        (Rgba8(c), ColorFormat::Rgba32F) => Rgba32F([
            c[0] as f32 / 255.0,
            c[1] as f32 / 255.0,
            c[2] as f32 / 255.0,
            c[3] as f32 / 255.0,
        ]),
        (Rgba32F(c), ColorFormat::Rgba8) => Rgba8([
            (c[0] * 255.0).round().clamp(0.0, 255.0) as u8,
            (c[1] * 255.0).round().clamp(0.0, 255.0) as u8,
            (c[2] * 255.0).round().clamp(0.0, 255.0) as u8,
            (c[3] * 255.0).round().clamp(0.0, 255.0) as u8,
        ]),
        (Rgb32F(c), ColorFormat::Rgba32F) => Rgba32F([c[0], c[1], c[2], 1.0]),
        (Rgba32F(c), ColorFormat::Rgb32F) => Rgb32F([c[0], c[1], c[2]]),
        (Rgb32F(c), ColorFormat::Rgba8) => Rgba8([
            (c[0] * 255.0).round().clamp(0.0, 255.0) as u8,
            (c[1] * 255.0).round().clamp(0.0, 255.0) as u8,
            (c[2] * 255.0).round().clamp(0.0, 255.0) as u8,
            255,
        ]),
        (Rgba8(c), ColorFormat::Rgb32F) => Rgb32F([
            c[0] as f32 / 255.0,
            c[1] as f32 / 255.0,
            c[2] as f32 / 255.0,
        ]),
        (_, ColorFormat::None) => None,
        (value, to) => {
            return Err(Error::invalid_value(format!(
                "unsupported color conversion {:?} -> {to:?}",
                value.format()
            )))
        }
    })
}

/// Reads the fragment at `linear_index` (`pixel * num_layers + layer`).
/// Shared by [`crate::compose`] (where `num_layers == 1`, so the linear
/// index is just the pixel index) and [`crate::sparse::encode`] (which
/// enumerates layers explicitly).
pub(crate) fn fragment_at(img: &impl DenseRead, linear_index: usize) -> crate::fragment::Fragment {
    let header = img.header();
    let color_size = header.color.pixel_size();
    let depth_size = header.depth.pixel_size();
    let color = if color_size > 0 {
        let s = linear_index * color_size;
        ColorValue::read(&img.color_bytes()[s..s + color_size], header.color).unwrap()
    } else {
        ColorValue::None
    };
    let depth = if depth_size > 0 {
        let s = linear_index * depth_size;
        f32::from_ne_bytes(img.depth_bytes()[s..s + 4].try_into().unwrap())
    } else {
        1.0
    };
    crate::fragment::Fragment { color, depth }
}

/// Writes a fragment at `linear_index`; see [`fragment_at`].
pub(crate) fn write_fragment_at(img: &mut OwnedDense, linear_index: usize, frag: crate::fragment::Fragment) {
    let header = img.header();
    let color_size = header.color.pixel_size();
    let depth_size = header.depth.pixel_size();
    if color_size > 0 {
        let s = linear_index * color_size;
        frag.color.write(&mut img.color_bytes_mut()[s..s + color_size]);
    }
    if depth_size > 0 {
        let s = linear_index * depth_size;
        img.depth_bytes_mut()[s..s + 4].copy_from_slice(&frag.depth.to_ne_bytes());
    }
}

fn read_f32_4(buf: &[u8]) -> [f32; 4] {
    let mut out = [0f32; 4];
    for (i, o) in out.iter_mut().enumerate() {
        *o = f32::from_ne_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
    }
    out
}

fn write_f32_4(buf: &mut [u8], v: [f32; 4]) {
    for (i, value) in v.iter().enumerate() {
        buf[i * 4..i * 4 + 4].copy_from_slice(&value.to_ne_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DepthFormat;

    fn make_uniform(color: ColorFormat, depth: DepthFormat, w: u32, h: u32) -> OwnedDense {
        let size = SizeCalculator::dense_size(color, depth, w, h);
        OwnedDense::assign_buffer(vec![0u8; size], color, depth, w, h, w * h, 1).unwrap()
    }

    #[test]
    fn scenario_f_clear_around_region_leaves_interior_untouched() {
        let mut img = make_uniform(ColorFormat::Rgba8, DepthFormat::None, 4, 4);
        for px in img.color_bytes_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&[1, 2, 3, 4]);
        }
        img.clear_around_region(Viewport::new(1, 1, 2, 2), ColorValue::Rgba8([0, 0, 0, 0]))
            .unwrap();
        let header = img.header();
        let mut border = 0;
        let mut interior_untouched = true;
        for y in 0..4u32 {
            for x in 0..4u32 {
                let idx = (y as usize * header.width as usize + x as usize) * 4;
                let px = &img.color_bytes()[idx..idx + 4];
                let inside = x >= 1 && x < 3 && y >= 1 && y < 3;
                if inside {
                    if px != [1, 2, 3, 4] {
                        interior_untouched = false;
                    }
                } else {
                    assert_eq!(px, [0, 0, 0, 0]);
                    border += 1;
                }
            }
        }
        assert_eq!(border, 12);
        assert!(interior_untouched);
    }

    #[test]
    fn degenerate_region_clears_whole_image() {
        let mut img = make_uniform(ColorFormat::Rgba8, DepthFormat::None, 2, 2);
        for px in img.color_bytes_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&[9, 9, 9, 9]);
        }
        img.clear_around_region(Viewport::zero(), ColorValue::Rgba8([1, 1, 1, 1]))
            .unwrap();
        assert!(img.color_bytes().chunks_exact(4).all(|px| px == [1, 1, 1, 1]));
    }

    #[test]
    fn copy_pixels_rejects_mismatched_formats() {
        let src = make_uniform(ColorFormat::Rgba8, DepthFormat::None, 2, 2);
        let mut dst = make_uniform(ColorFormat::Rgba32F, DepthFormat::None, 2, 2);
        assert!(copy_pixels(&src, &mut dst).is_err());
    }

    #[test]
    fn copy_region_moves_a_sub_rectangle() {
        let mut src = make_uniform(ColorFormat::Rgba8, DepthFormat::None, 4, 4);
        for (i, px) in src.color_bytes_mut().chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&[i as u8, 0, 0, 255]);
        }
        let mut dst = make_uniform(ColorFormat::Rgba8, DepthFormat::None, 2, 2);
        copy_region(&src, Viewport::new(1, 1, 2, 2), &mut dst, Viewport::new(0, 0, 2, 2)).unwrap();
        assert_eq!(dst.color_bytes()[0], 5); // (1,1) -> index 1*4+1=5
    }

    #[test]
    fn color_conversion_scales_and_fills_alpha() {
        let converted = convert_color(ColorValue::Rgba8([255, 0, 0, 255]), ColorFormat::Rgba32F).unwrap();
        assert_eq!(converted, ColorValue::Rgba32F([1.0, 0.0, 0.0, 1.0]));
        let rgb = convert_color(ColorValue::Rgb32F([1.0, 0.0, 0.0]), ColorFormat::Rgba8).unwrap();
        assert_eq!(rgb, ColorValue::Rgba8([255, 0, 0, 255]));
    }

    #[test]
    fn layered_without_depth_is_rejected() {
        let size = SizeCalculator::layered_dense_size(ColorFormat::Rgba8, DepthFormat::None, 2, 2, 2);
        let result = OwnedDense::assign_buffer(
            vec![0u8; size],
            ColorFormat::Rgba8,
            DepthFormat::None,
            2,
            2,
            4,
            2,
        );
        assert!(result.is_err());
    }
}
