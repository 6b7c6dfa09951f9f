//! The injected process-wide state store (§5, §6).
//!
//! Design note: "process-wide format/background state → explicit context."
//! Every public operation that needs process state takes a `&dyn StateStore`
//! (or an image already bound to one) rather than reaching for global
//! mutable state; global state, if any, lives only at the outermost API
//! layer that wraps this core — which is out of scope here (§1 Non-goals:
//! "CLI/configuration").

use crate::error::{Error, ErrorKind, Result, Warning};
use crate::format::{ColorFormat, CompositeMode, DepthFormat};

/// Recognized state-store keys (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// Process color format.
    ColorFormat,
    /// Process depth format.
    DepthFormat,
    /// Composite mode (Z-buffer vs. blend).
    CompositeMode,
    /// Cleared background color, as 4 floats.
    BackgroundColorFloat,
    /// Cleared background color, packed as a word (format-dependent).
    BackgroundColorWord,
    /// True background color used for background correction, as 4 floats.
    TrueBackgroundColorFloat,
    /// True background color, packed as a word.
    TrueBackgroundColorWord,
    /// Whether the one-buffer composite mode is enabled.
    OneBufferComposite,
    /// Whether floating-viewport rendering is enabled.
    FloatingViewport,
    /// Whether an empty tile should still invoke the draw callback.
    EmptyImageRender,
    /// Whether the current frame's image was pre-rendered.
    PreRendered,
    /// Whether the render layer holds its own buffer across frames.
    RenderLayerHoldsBuffer,
    /// Whether a frame is currently being drawn (guards format changes).
    DrawingFrame,
    /// Current tile viewports, `int[4*tiles]`.
    TileViewports,
    /// Contained-viewport/tile bitmask.
    ContainedViewportMask,
    /// Physical render target width.
    PhysicalRenderWidth,
    /// Physical render target height.
    PhysicalRenderHeight,
    /// Timestamp of the last floating-viewport render.
    RenderedViewportTimestamp,
    /// Timestamp marking the start of the current frame.
    FrameStartTimestamp,
}

/// A state-store scalar value (§6: `get_enum`/`get_integer`/`get_float`/
/// `get_boolean`/`get_pointer`).
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    /// An enum-coded integer (format, composite mode, ...).
    Enum(i64),
    /// A plain integer.
    Integer(i64),
    /// A floating-point scalar.
    Float(f64),
    /// A boolean flag.
    Boolean(bool),
    /// A vector of integers (e.g. tile viewports).
    IntVec(Vec<i32>),
    /// A vector of floats (e.g. a background color).
    FloatVec(Vec<f32>),
}

/// Diagnostics sink: `raise_error`/`raise_warning` (§6, §7).
///
/// Callers observe errors only through this channel for ordinary use;
/// operations additionally return `Result` so library callers (as opposed
/// to the outer wrapper that owns the state store) can propagate failures
/// with `?`.
pub trait Diagnostics {
    /// Reports an error. Implementations typically log and/or record the
    /// error for the caller's polling API; they do not need to abort.
    fn raise_error(&self, error: &Error);

    /// Reports a recoverable warning (e.g. blending without alpha, §4.6).
    fn raise_warning(&self, warning: &Warning);
}

/// The external, process-wide state store (§5, §6): typed scalar reads plus
/// a keyed byte-buffer allocator.
pub trait StateStore: Diagnostics {
    /// Reads a scalar value by key. Returns `None` for keys the
    /// implementation doesn't track.
    fn get(&self, key: StateKey) -> Option<StateValue>;

    /// Returns a process-owned buffer of at least `bytes` for `name`.
    /// Subsequent calls with the same `name` may return the same or a new
    /// buffer (§5: "callers must treat the buffer as invalidated by any
    /// subsequent request with the same key").
    fn get_state_buffer(&self, name: &str, bytes: usize) -> Vec<u8>;

    /// Convenience: reads the process color format, defaulting to `None`.
    fn color_format(&self) -> ColorFormat {
        match self.get(StateKey::ColorFormat) {
            Some(StateValue::Enum(code)) => ColorFormat::from_code(code).0,
            _ => ColorFormat::None,
        }
    }

    /// Convenience: reads the process depth format, defaulting to `None`.
    fn depth_format(&self) -> DepthFormat {
        match self.get(StateKey::DepthFormat) {
            Some(StateValue::Enum(code)) => DepthFormat::from_code(code).0,
            _ => DepthFormat::None,
        }
    }

    /// Convenience: reads the configured composite mode, defaulting to
    /// Z-buffer with no layer cap.
    fn composite_mode(&self) -> CompositeMode {
        match self.get(StateKey::CompositeMode) {
            Some(StateValue::Enum(1)) => CompositeMode::Blend(crate::format::BlendDir::Over),
            Some(StateValue::Enum(2)) => CompositeMode::Blend(crate::format::BlendDir::Under),
            _ => CompositeMode::z_buffer(),
        }
    }

    /// Convenience: reads a float[4] background color, defaulting to
    /// transparent black.
    fn background_color(&self) -> [f32; 4] {
        match self.get(StateKey::BackgroundColorFloat) {
            Some(StateValue::FloatVec(v)) if v.len() == 4 => [v[0], v[1], v[2], v[3]],
            _ => [0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Convenience: reads the true background color (§4.2 background
    /// correction), defaulting to the same as [`StateStore::background_color`].
    fn true_background_color(&self) -> [f32; 4] {
        match self.get(StateKey::TrueBackgroundColorFloat) {
            Some(StateValue::FloatVec(v)) if v.len() == 4 => [v[0], v[1], v[2], v[3]],
            _ => self.background_color(),
        }
    }

    /// Convenience: whether the one-buffer composite mode is enabled.
    fn one_buffer_composite(&self) -> bool {
        matches!(
            self.get(StateKey::OneBufferComposite),
            Some(StateValue::Boolean(true))
        )
    }
}

/// A simple in-memory [`StateStore`] used by tests and as documentation of
/// the contract; the real store lives in the external compositing schedule
/// (§1) and is out of scope here.
#[derive(Default)]
pub struct RecordingStateStore {
    values: std::collections::HashMap<StateKey, StateValue>,
    buffers: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
    errors: std::sync::Mutex<Vec<String>>,
    warnings: std::sync::Mutex<Vec<String>>,
}

impl RecordingStateStore {
    /// Creates an empty store; all reads return `None` until [`Self::set`]
    /// is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar value for `key`.
    pub fn set(&mut self, key: StateKey, value: StateValue) {
        self.values.insert(key, value);
    }

    /// Errors reported so far, formatted as strings.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    /// Warnings reported so far, formatted as strings.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Diagnostics for RecordingStateStore {
    fn raise_error(&self, error: &Error) {
        #[cfg(feature = "log")]
        log::error!("{} ({:?})", error, error.kind());
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn raise_warning(&self, warning: &Warning) {
        #[cfg(feature = "log")]
        log::warn!("{}", warning);
        self.warnings.lock().unwrap().push(warning.to_string());
    }
}

impl StateStore for RecordingStateStore {
    fn get(&self, key: StateKey) -> Option<StateValue> {
        self.values.get(&key).cloned()
    }

    fn get_state_buffer(&self, name: &str, bytes: usize) -> Vec<u8> {
        let mut buffers = self.buffers.lock().unwrap();
        let buf = buffers.entry(name.to_string()).or_default();
        if buf.len() < bytes {
            buf.resize(bytes, 0);
        }
        buf.clone()
    }
}

/// Shorthand for "an error kind the caller wants raised and swallowed
/// rather than propagated", matching §7's "detected preconditions raise and
/// return an appropriate identity".
pub fn raise_and_default<T: Default>(diag: &dyn Diagnostics, error: Error) -> (T, Error) {
    diag.raise_error(&error);
    (T::default(), error)
}

/// Raises a warning of the given kind through `diag`.
pub fn warn(diag: &dyn Diagnostics, kind: ErrorKind, detail: impl Into<String>) {
    diag.raise_warning(&Warning::new(kind, detail));
}
