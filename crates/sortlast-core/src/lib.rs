//! # sortlast-core
//!
//! Dense/sparse pixel image core for parallel sort-last compositing on
//! tiled displays.
//!
//! Every image is one contiguous byte buffer: a seven-word common header
//! (magic, color format, depth format, width, height, max pixels, actual
//! bytes), an optional one-word layered sub-header, and a payload —
//! `width*height*num_layers` color+depth samples for a dense image, or a
//! run-length stream of inactive/active pixels for a sparse one.
//!
//! ## Crate Structure
//!
//! - [`header`] — the common header and the `Magic`/`ImageClass` tags.
//! - [`format`] — color/depth formats and [`format::CompositeMode`].
//! - [`fragment`] — one color+depth sample.
//! - [`size`] — worst-case buffer sizing.
//! - [`dense`] — dense image read/write, region copy/clear, format
//!   conversion.
//! - [`sparse`] — sparse image encode/decode, split, interlace, the "cc"
//!   compositor's scan primitive.
//! - [`compose`] — the three compositing operators.
//! - [`tile`] — tiled-display viewport glue.
//! - [`context`] — the injected process-state and diagnostics traits.
//! - [`timing`] — RAII timing-section markers.
//! - [`viewport`] — rectangular pixel regions.
//! - [`error`] — the crate's error and warning types.
//!
//! ## Feature Flags
//!
//! - `log` — routes [`context::Diagnostics`] reports through the [`log`]
//!   facade in addition to the caller-visible recording.

#![warn(missing_docs)]

pub mod compose;
pub mod context;
pub mod dense;
pub mod error;
pub mod format;
pub mod fragment;
pub mod header;
pub mod size;
pub mod sparse;
pub mod tile;
pub mod timing;
pub mod viewport;

pub use compose::{blend_fragment, blend_over_rgba32f, blend_over_rgba8, compose_dense_dense, compose_dense_sparse, compose_sparse_sparse};
pub use context::{Diagnostics, StateKey, StateStore, StateValue};
pub use dense::{copy_pixels, copy_region, convert_color, DenseRead, DensePointerImage, OwnedDense};
pub use error::{Error, ErrorKind, Result, Warning};
pub use format::{BlendDir, ColorFormat, CompositeMode, DepthFormat};
pub use fragment::{ColorValue, Fragment};
pub use header::{Header, ImageClass, Magic};
pub use size::SizeCalculator;
pub use sparse::SparseImage;
pub use timing::{TimingHooks, TimingMarker, TimingScope};
pub use viewport::Viewport;

/// Prelude module for convenient imports.
///
/// ```
/// use sortlast_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compose::{blend_fragment, compose_dense_dense, compose_dense_sparse, compose_sparse_sparse};
    pub use crate::context::{Diagnostics, StateKey, StateStore, StateValue};
    pub use crate::dense::{DenseRead, DensePointerImage, OwnedDense};
    pub use crate::error::{Error, Result};
    pub use crate::format::{BlendDir, ColorFormat, CompositeMode, DepthFormat};
    pub use crate::fragment::{ColorValue, Fragment};
    pub use crate::size::SizeCalculator;
    pub use crate::sparse::SparseImage;
    pub use crate::viewport::Viewport;
}
