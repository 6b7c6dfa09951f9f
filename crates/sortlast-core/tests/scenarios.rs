//! Integration tests, one per literal walkthrough in §8, exercised through
//! the crate's public API only (no `pub(crate)` access as the unit tests
//! use).

use sortlast_core::prelude::*;
use sortlast_core::sparse::build::SparseBuilder;
use sortlast_core::sparse::copy::copy_pixel_range;
use sortlast_core::sparse::encode::encode;
use sortlast_core::sparse::interlace::{interlace, interlace_offset};
use sortlast_core::sparse::scan::ScanCursor;
use sortlast_core::sparse::split::split;

fn uniform_dense(color: ColorFormat, depth: DepthFormat, w: u32, h: u32, pixel: (u8, u8, u8, u8, f32)) -> OwnedDense {
    let size = SizeCalculator::dense_size(color, depth, w, h);
    let mut img = OwnedDense::assign_buffer(vec![0u8; size], color, depth, w, h, w * h, 1).unwrap();
    for i in 0..(w * h) as usize {
        img.color_bytes_mut()[i * 4..i * 4 + 4].copy_from_slice(&[pixel.0, pixel.1, pixel.2, pixel.3]);
        img.depth_bytes_mut()[i * 4..i * 4 + 4].copy_from_slice(&pixel.4.to_ne_bytes());
    }
    img
}

fn dense_with_depths(depths: &[f32]) -> OwnedDense {
    let w = depths.len() as u32;
    let size = SizeCalculator::dense_size(ColorFormat::Rgba8, DepthFormat::D32F, w, 1);
    let mut img = OwnedDense::assign_buffer(vec![0u8; size], ColorFormat::Rgba8, DepthFormat::D32F, w, 1, w, 1).unwrap();
    for (i, d) in depths.iter().enumerate() {
        img.color_bytes_mut()[i * 4..i * 4 + 4].copy_from_slice(&[i as u8, i as u8, i as u8, 255]);
        img.depth_bytes_mut()[i * 4..i * 4 + 4].copy_from_slice(&d.to_ne_bytes());
    }
    img
}

fn decode_all(sparse: &sortlast_core::SparseImage) -> Vec<(u8, f32)> {
    let mut cursor = ScanCursor::new(sparse);
    let mut out = Vec::new();
    for _ in 0..sparse.num_pixels() {
        match cursor.advance_pixel(sparse).unwrap() {
            None => out.push((255, 1.0)),
            Some(frags) => {
                let f = &frags[0];
                let ColorValue::Rgba8(c) = f.color else { panic!() };
                out.push((c[0], f.depth));
            }
        }
    }
    out
}

/// Scenario A — round-trip a uniform opaque image. Every pixel
/// `(255,0,0,255)` depth `0.5` on a 4x2 RGBA8+D32F dense image encodes to
/// a single fully-active run and decodes back to identical pixel content.
///
/// The distilled walkthrough computes `actual_bytes` assuming 4-byte
/// header words; this header uses 8-byte (`i64`) words (see DESIGN.md's
/// endianness/word-size note), so this test checks the *shape* of the
/// encoded stream (one run, all 8 pixels active) and round-trip identity
/// rather than the literal byte count.
#[test]
fn scenario_a_round_trip_uniform_opaque_image() {
    let dense = uniform_dense(ColorFormat::Rgba8, DepthFormat::D32F, 4, 2, (255, 0, 0, 255, 0.5));
    let sparse = encode(&dense, CompositeMode::z_buffer(), 0.0).unwrap();

    let mut cursor = ScanCursor::new(&sparse);
    let mut active_count = 0;
    for _ in 0..sparse.num_pixels() {
        if cursor.advance_pixel(&sparse).unwrap().is_some() {
            active_count += 1;
        }
    }
    assert_eq!(active_count, 8);

    let decoded = sortlast_core::sparse::decode::decode(&sparse, ColorValue::Rgba8([0, 0, 0, 0]), [0.0; 4], false).unwrap();
    assert_eq!(decoded.color_bytes(), dense.color_bytes());
}

/// Scenario B — sparse split alignment. An 8x1 stream with depths
/// `[1,1,0.5,0.5,1,0.5,1,1]` split `K=2` (near-even partitions of 4 each)
/// decodes, partition by partition, to the same pixels as decoding the
/// whole unsplit stream.
#[test]
fn scenario_b_split_partitions_match_unsplit_decode() {
    let dense = dense_with_depths(&[1.0, 1.0, 0.5, 0.5, 1.0, 0.5, 1.0, 1.0]);
    let sparse = encode(&dense, CompositeMode::z_buffer(), 0.0).unwrap();
    let whole = decode_all(&sparse);

    let parts = split(&sparse, 2).unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].num_pixels(), 4);
    assert_eq!(parts[1].num_pixels(), 4);

    let mut reassembled = decode_all(&parts[0]);
    reassembled.extend(decode_all(&parts[1]));
    assert_eq!(reassembled, whole);
}

/// Scenario C — interlace is invertible by offset lookup. With `E=4`
/// groups over an 8-pixel stream (group size 2), `interlace_offset` walks
/// partitions in bit-reversed scan order (natural indices `0,2,1,3`), so
/// natural group 1's data is reached only after groups 0 and 2 (each size
/// 2) have already been scanned — its offset is 4, not 2. Pairing each
/// natural group's offset with its source pixels and concatenating in
/// natural order reproduces exactly what `interlace()` itself computes.
#[test]
fn scenario_c_interlace_offset_matches_bit_reversed_source_group() {
    let mut builder = SparseBuilder::new(ColorFormat::Rgba8, DepthFormat::None, 8, 1, false);
    for label in 0u8..8 {
        builder.push_active(vec![Fragment {
            color: ColorValue::Rgba8([label, label, label, 255]),
            depth: 1.0,
        }]);
    }
    let src = builder.finish().unwrap();

    // natural group index -> (offset, expected source pixel labels).
    let expectations: [(u32, u64, [u8; 2]); 4] = [(0, 0, [0, 1]), (1, 4, [4, 5]), (2, 2, [2, 3]), (3, 6, [6, 7])];
    for (natural_idx, expected_offset, expected_labels) in expectations {
        let offset = interlace_offset(natural_idx, 4, 8).unwrap();
        assert_eq!(offset, expected_offset);
        let group = copy_pixel_range(&src, offset, 2, 2, 1).unwrap();
        let labels = decode_all(&group).into_iter().map(|(c, _)| c).collect::<Vec<_>>();
        assert_eq!(labels, expected_labels.to_vec());
    }

    // interlace() permutes dest<-reverse_bits(dest) group order: [0,1,4,5,2,3,6,7].
    let interlaced = interlace(&src, 4).unwrap();
    let labels = decode_all(&interlaced).into_iter().map(|(c, _)| c).collect::<Vec<_>>();
    assert_eq!(labels, vec![0u8, 1, 4, 5, 2, 3, 6, 7]);
}

/// Scenario D — Z-buffer composition. `A = (red, 0.2), (green, 0.9)`,
/// `B = (blue, 0.5), (yellow, 0.3)` composite to `(red, 0.2), (yellow, 0.3)`.
#[test]
fn scenario_d_z_buffer_composition() {
    let size = SizeCalculator::dense_size(ColorFormat::Rgba8, DepthFormat::D32F, 2, 1);
    let mut a = OwnedDense::assign_buffer(vec![0u8; size], ColorFormat::Rgba8, DepthFormat::D32F, 2, 1, 2, 1).unwrap();
    a.color_bytes_mut().copy_from_slice(&[255, 0, 0, 255, 0, 255, 0, 255]);
    a.depth_bytes_mut()[0..4].copy_from_slice(&0.2f32.to_ne_bytes());
    a.depth_bytes_mut()[4..8].copy_from_slice(&0.9f32.to_ne_bytes());

    let mut b = OwnedDense::assign_buffer(vec![0u8; size], ColorFormat::Rgba8, DepthFormat::D32F, 2, 1, 2, 1).unwrap();
    b.color_bytes_mut().copy_from_slice(&[0, 0, 255, 255, 255, 255, 0, 255]);
    b.depth_bytes_mut()[0..4].copy_from_slice(&0.5f32.to_ne_bytes());
    b.depth_bytes_mut()[4..8].copy_from_slice(&0.3f32.to_ne_bytes());

    let out = compose_dense_dense(&a, &b, CompositeMode::z_buffer()).unwrap();
    assert_eq!(&out.color_bytes()[0..4], &[255, 0, 0, 255]);
    assert_eq!(&out.color_bytes()[4..8], &[255, 255, 0, 255]);
}

/// Scenario E — compressed-compressed alpha OVER between two 1x1 sparse
/// images. `front = (100,0,0,128)`, `back = (0,0,200,255)`; the correct
/// integer OVER result is `(100, 0, 99, 255)` (see DESIGN.md for why this
/// differs from the distilled walkthrough's arithmetic).
#[test]
fn scenario_e_compressed_compressed_alpha_over() {
    let mut front = SparseBuilder::new(ColorFormat::Rgba8, DepthFormat::None, 1, 1, false);
    front.push_active(vec![Fragment {
        color: ColorValue::Rgba8([100, 0, 0, 128]),
        depth: 1.0,
    }]);
    let front = front.finish().unwrap();

    let mut back = SparseBuilder::new(ColorFormat::Rgba8, DepthFormat::None, 1, 1, false);
    back.push_active(vec![Fragment {
        color: ColorValue::Rgba8([0, 0, 200, 255]),
        depth: 1.0,
    }]);
    let back = back.finish().unwrap();

    let merged = compose_sparse_sparse(&front, &back, CompositeMode::Blend(BlendDir::Over)).unwrap();
    let mut cursor = ScanCursor::new(&merged);
    let frags = cursor.advance_pixel(&merged).unwrap().unwrap();
    assert_eq!(frags[0].color, ColorValue::Rgba8([100, 0, 99, 255]));
}

/// Scenario F — clear-around-region. A 4x4 RGBA8 image cleared around
/// region `(1,1,2,2)` against `(0,0,0,0)` leaves the 12 border pixels at
/// the background color and the 4 interior pixels untouched.
#[test]
fn scenario_f_clear_around_region() {
    let mut img = uniform_dense(ColorFormat::Rgba8, DepthFormat::None, 4, 4, (7, 7, 7, 7, 1.0));
    img.clear_around_region(Viewport::new(1, 1, 2, 2), ColorValue::Rgba8([0, 0, 0, 0]))
        .unwrap();
    let mut border = 0;
    for y in 0..4u32 {
        for x in 0..4u32 {
            let idx = (y as usize * 4 + x as usize) * 4;
            let px = &img.color_bytes()[idx..idx + 4];
            if x >= 1 && x < 3 && y >= 1 && y < 3 {
                assert_eq!(px, [7, 7, 7, 7]);
            } else {
                assert_eq!(px, [0, 0, 0, 0]);
                border += 1;
            }
        }
    }
    assert_eq!(border, 12);
}
