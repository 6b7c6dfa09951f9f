//! Property tests for the eight round-trip/permutation invariants.

use proptest::prelude::*;
use sortlast_core::prelude::*;
use sortlast_core::sparse::build::SparseBuilder;
use sortlast_core::sparse::copy::copy_pixel_range;
use sortlast_core::sparse::decode::decode;
use sortlast_core::sparse::encode::encode;
use sortlast_core::sparse::interlace::{interlace, interlace_offset};
use sortlast_core::sparse::scan::ScanCursor;
use sortlast_core::sparse::split::split;

/// Builds a flat RGBA8+D32F dense image of `w*h` pixels from `depths`
/// (cycled if shorter), coloring pixel `i` as `(i, i, i, 255)`.
fn dense_from_depths(w: u32, h: u32, depths: &[f32]) -> OwnedDense {
    let size = SizeCalculator::dense_size(ColorFormat::Rgba8, DepthFormat::D32F, w, h);
    let mut img = OwnedDense::assign_buffer(vec![0u8; size], ColorFormat::Rgba8, DepthFormat::D32F, w, h, w * h, 1).unwrap();
    for i in 0..(w * h) as usize {
        let v = (i % 256) as u8;
        img.color_bytes_mut()[i * 4..i * 4 + 4].copy_from_slice(&[v, v, v, 255]);
        img.depth_bytes_mut()[i * 4..i * 4 + 4].copy_from_slice(&depths[i % depths.len()].to_ne_bytes());
    }
    img
}

fn small_dims() -> impl Strategy<Value = (u32, u32)> {
    (1u32..6, 1u32..4)
}

fn depth_vec(max_len: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(0.0f32..1.2, 1..=max_len)
}

proptest! {
    /// 1. Encode/decode round-trips active pixels byte-for-byte and fills
    /// inactive pixels with the background.
    #[test]
    fn encode_decode_round_trip((w, h) in small_dims(), depths in depth_vec(20)) {
        let dense = dense_from_depths(w, h, &depths);
        let sparse = encode(&dense, CompositeMode::z_buffer(), 0.0)?;
        let background = ColorValue::Rgba8([9, 9, 9, 9]);
        let decoded = decode(&sparse, background, [0.0; 4], false)?;

        for i in 0..(w * h) as usize {
            let d = depths[i % depths.len()];
            let expected_color = if d < 1.0 { [(i % 256) as u8; 3] } else { [9, 9, 9] };
            let got = &decoded.color_bytes()[i * 4..i * 4 + 3];
            if d < 1.0 {
                prop_assert_eq!(got, &expected_color[..]);
            } else {
                prop_assert_eq!(got, &[9u8, 9, 9][..]);
            }
        }
    }

    /// 2. `copy_pixel_range(S, off, n)` then decode equals decoding `S` and
    /// taking the `n`-pixel window starting at `off`.
    #[test]
    fn copy_pixel_range_matches_decoded_window((w, h) in small_dims(), depths in depth_vec(20)) {
        let dense = dense_from_depths(w, h, &depths);
        let sparse = encode(&dense, CompositeMode::z_buffer(), 0.0)?;
        let n = sparse.num_pixels();
        prop_assume!(n >= 2);
        let off = n / 3;
        let count = n - off;
        let window = copy_pixel_range(&sparse, off, count, count as u32, 1)?;

        let full_decoded = decode(&sparse, ColorValue::Rgba8([0, 0, 0, 0]), [0.0; 4], false)?;
        let window_decoded = decode(&window, ColorValue::Rgba8([0, 0, 0, 0]), [0.0; 4], false)?;

        let expected = &full_decoded.color_bytes()[(off as usize) * 4..];
        prop_assert_eq!(window_decoded.color_bytes(), expected);
    }

    /// 3. For any `K` dividing the partition count evenly or not,
    /// concatenating `split(S, K)` partitions decodes to the same pixels
    /// as `S` itself, in order.
    #[test]
    fn split_partitions_concatenate_to_original((w, h) in small_dims(), depths in depth_vec(20), k in 1u32..5) {
        let dense = dense_from_depths(w, h, &depths);
        let sparse = encode(&dense, CompositeMode::z_buffer(), 0.0)?;
        let parts = split(&sparse, k)?;

        let whole = decode(&sparse, ColorValue::Rgba8([0, 0, 0, 0]), [0.0; 4], false)?;
        let mut reassembled = Vec::new();
        for part in &parts {
            let d = decode(part, ColorValue::Rgba8([0, 0, 0, 0]), [0.0; 4], false)?;
            reassembled.extend_from_slice(d.color_bytes());
        }
        prop_assert_eq!(reassembled, whole.color_bytes().to_vec());
    }

    /// 4. `interlace(S, E)` is the permutation `interlaced[i] == S[p]` where
    /// `p = bit_reverse(i mod E, log2 E) + (i/E)*E`.
    #[test]
    fn interlace_matches_bit_reverse_permutation(bits in 1u32..4, groups_count in 2u32..6) {
        let e = 1u32 << bits;
        let group_size = groups_count;
        let total = e * group_size;
        prop_assume!(total <= 64);

        let mut builder = SparseBuilder::new(ColorFormat::Rgba8, DepthFormat::None, total, 1, false);
        for label in 0u32..total {
            let v = (label % 256) as u8;
            builder.push_active(vec![Fragment {
                color: ColorValue::Rgba8([v, v, v, 255]),
                depth: 1.0,
            }]);
        }
        let src = builder.finish()?;
        let interlaced = interlace(&src, e)?;

        let mut cursor = ScanCursor::new(&interlaced);
        for i in 0..total {
            let dest_slot = i / group_size;
            let within_group = i % group_size;
            let source_slot = reverse_bits_ref(dest_slot, bits);
            let p = source_slot * group_size + within_group;
            let frags = cursor.advance_pixel(&interlaced)?.unwrap();
            let ColorValue::Rgba8(c) = frags[0].color else { unreachable!() };
            prop_assert_eq!(c[0] as u32, p % 256);
        }
    }

    /// 5. `interlace_offset(j, E, n)` over all natural slots `j < E`
    /// enumerates the same `E` offsets, evenly spaced by `group_size`, that
    /// a direct bit-reverse scan would produce — i.e. the per-slot offsets
    /// are a permutation of `{0, group_size, 2*group_size, ...}` and
    /// recover the full pixel count when paired with their (equal, since
    /// `E` divides `total` evenly here) partition sizes.
    #[test]
    fn interlace_offset_groups_sum_to_total(bits in 1u32..4, group_size in 1u32..8) {
        let e = 1u32 << bits;
        let total = (e * group_size) as u64;
        let mut offsets: Vec<u64> = (0..e)
            .map(|j| interlace_offset(j, e, total))
            .collect::<Result<_, _>>()?;
        offsets.sort_unstable();
        let expected: Vec<u64> = (0..e as u64).map(|k| k * group_size as u64).collect();
        prop_assert_eq!(offsets, expected);
    }

    /// 6. `sparse ⊕ sparse` then decode equals composing the two dense
    /// sources directly, for pixel data where every pixel is active under
    /// the chosen mode (depths strictly less than the far plane).
    #[test]
    fn sparse_cc_composite_matches_dense_compose(
        (w, h) in small_dims(),
        da in prop::collection::vec(0.0f32..0.99, 1..=20),
        db in prop::collection::vec(0.0f32..0.99, 1..=20),
    ) {
        let a = dense_from_depths(w, h, &da);
        let b = dense_from_depths(w, h, &db);

        let sa = encode(&a, CompositeMode::z_buffer(), 0.0)?;
        let sb = encode(&b, CompositeMode::z_buffer(), 0.0)?;
        let merged = compose_sparse_sparse(&sa, &sb, CompositeMode::z_buffer())?;
        let via_sparse = decode(&merged, ColorValue::Rgba8([0, 0, 0, 0]), [0.0; 4], false)?;

        let via_dense = compose_dense_dense(&a, &b, CompositeMode::z_buffer())?;
        prop_assert_eq!(via_sparse.color_bytes(), via_dense.color_bytes());
    }

    /// 7. `SizeCalculator::sparse_size` bounds the `actual_bytes` of any
    /// sparse stream encoded from a dense image of those parameters.
    #[test]
    fn sparse_size_bounds_actual_encoded_size((w, h) in small_dims(), depths in depth_vec(20)) {
        let dense = dense_from_depths(w, h, &depths);
        let sparse = encode(&dense, CompositeMode::z_buffer(), 0.0)?;
        let bound = SizeCalculator::sparse_size(ColorFormat::Rgba8, DepthFormat::D32F, w, h);
        prop_assert!(bound as i64 >= sparse.header().actual_bytes);
    }

    /// 8. `package` then `unpackage` preserves a dense image's pixel
    /// content, reducing `max_pixels` to `w*h`.
    #[test]
    fn dense_package_unpackage_round_trip((w, h) in small_dims(), depths in depth_vec(20)) {
        let dense = dense_from_depths(w, h, &depths);
        let packaged = dense.package().to_vec();
        let back = OwnedDense::unpackage(packaged)?;
        prop_assert_eq!(back.color_bytes(), dense.color_bytes());
        prop_assert_eq!(back.depth_bytes(), dense.depth_bytes());
        prop_assert_eq!(back.header().max_pixels, w * h);
    }
}

fn reverse_bits_ref(value: u32, bits: u32) -> u32 {
    let mut v = value;
    let mut r = 0u32;
    for _ in 0..bits {
        r = (r << 1) | (v & 1);
        v >>= 1;
    }
    r
}
