//! Tiled-display viewport glue (§4.7).
//!
//! A physical render covers one rectangular area (the "physical render
//! target"); the external schedule asks for one or more tile images cut
//! out of it. A tile can be:
//!
//! - entirely outside the physical area — nothing to extract;
//! - fully contained in it — a plain [`crate::dense::copy_region`];
//! - partially overlapping ("floating") — the physical render doesn't
//!   cover the whole tile, so the caller must re-render at the tile's own
//!   viewport before extraction can happen.
//!
//! Re-rendering is expensive, so when a floating viewport was already
//! rendered earlier in the same frame, it's reused instead of re-run
//! (§4.7: "a floating viewport rendered this frame may be reused if the
//! requested viewport is identical"); [`floating_viewport_reusable`]
//! isolates that one timestamp comparison so it can be tested without a
//! real render callback.

use crate::context::{StateKey, StateStore, StateValue};
use crate::dense::{copy_region, DenseRead, OwnedDense};
use crate::error::Result;
use crate::fragment::ColorValue;
use crate::size::SizeCalculator;
use crate::viewport::Viewport;

/// How a requested tile relates to the physical render area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileRelation {
    /// No overlap with the physical render area.
    Outside,
    /// Entirely within the physical render area.
    Contained,
    /// Partially overlapping: a fresh (or reused) render at the tile's own
    /// viewport is required.
    Floating,
}

/// Classifies `tile` against the `physical` render area.
pub fn classify_tile(tile: Viewport, physical: Viewport) -> TileRelation {
    match tile.intersect(&physical) {
        None => TileRelation::Outside,
        Some(overlap) if overlap == tile => TileRelation::Contained,
        Some(_) => TileRelation::Floating,
    }
}

/// Whether a floating viewport rendered at `cached` on frame-relative
/// timestamp `rendered_at` can be reused for a request of `requested` at
/// `frame_start` (§4.7): only if it's the *same* viewport, and the render
/// happened at or after this frame began.
pub fn floating_viewport_reusable(cached: Viewport, requested: Viewport, rendered_at: i64, frame_start: i64) -> bool {
    cached == requested && rendered_at >= frame_start
}

/// Extracts `tile` from `source`, a dense image covering `physical`.
///
/// `source`'s own width/height are assumed to match `physical`'s size
/// (i.e. `source` covers exactly the physical render area, offset at its
/// origin). Returns `None` when the tile doesn't overlap the physical area
/// and the process isn't configured to render empty tiles anyway.
pub fn get_tile_image(
    source: &impl DenseRead,
    physical: Viewport,
    tile: Viewport,
    store: &dyn StateStore,
) -> Result<Option<OwnedDense>> {
    match classify_tile(tile, physical) {
        TileRelation::Outside => {
            if render_empty_tiles(store) {
                Ok(Some(background_tile(tile, store)?))
            } else {
                Ok(None)
            }
        }
        TileRelation::Contained => {
            let local = Viewport::new(tile.x - physical.x, tile.y - physical.y, tile.width, tile.height);
            let header = source.header();
            let size = SizeCalculator::dense_size(header.color, header.depth, tile.width, tile.height);
            let mut out = OwnedDense::assign_buffer(
                vec![0u8; size],
                header.color,
                header.depth,
                tile.width,
                tile.height,
                tile.area() as u32,
                1,
            )?;
            copy_region(source, local, &mut out, Viewport::new(0, 0, tile.width, tile.height))?;
            Ok(Some(out))
        }
        TileRelation::Floating => Ok(None),
    }
}

/// Encodes the tile extracted by [`get_tile_image`] to a sparse image,
/// under `mode`'s activity predicate (§4.7's "compressed tile image" path
/// used when sending tiles to a display node).
///
/// An empty tile (outside the physical render area, with empty-tile
/// rendering disabled) still yields a transportable stream: an
/// all-inactive sparse image sized to `tile`, rather than `None`.
pub fn get_compressed_tile_image(
    source: &impl DenseRead,
    physical: Viewport,
    tile: Viewport,
    store: &dyn StateStore,
    mode: crate::format::CompositeMode,
) -> Result<crate::sparse::SparseImage> {
    match get_tile_image(source, physical, tile, store)? {
        None => crate::sparse::SparseImage::all_inactive(store.color_format(), store.depth_format(), tile.width, tile.height, false),
        Some(dense) => {
            let background_alpha = store.background_color()[3];
            crate::sparse::encode::encode(&dense, mode, background_alpha)
        }
    }
}

fn render_empty_tiles(store: &dyn StateStore) -> bool {
    matches!(store.get(StateKey::EmptyImageRender), Some(StateValue::Boolean(true)))
}

fn background_tile(tile: Viewport, store: &dyn StateStore) -> Result<OwnedDense> {
    let color = store.color_format();
    let depth = store.depth_format();
    let size = SizeCalculator::dense_size(color, depth, tile.width, tile.height);
    let mut out = OwnedDense::assign_buffer(vec![0u8; size], color, depth, tile.width, tile.height, tile.area() as u32, 1)?;
    let background = ColorValue::from_floats(color, store.background_color());
    out.clear_around_region(Viewport::zero(), background)?;
    Ok(out)
}
