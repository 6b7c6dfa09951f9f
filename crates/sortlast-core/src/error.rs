//! Error and warning kinds for the image core.
//!
//! This module provides the unified error handling used across header
//! parsing, dense/sparse image operations, and compositing. Error kinds
//! fall into four categories (§7):
//!
//! - [`Error::InvalidValue`] — bad dimensions, offsets, mismatched formats.
//! - [`Error::InvalidEnum`] — unknown format/mode code.
//! - [`Error::InvalidOperation`] — write to a read-only image, missing depth
//!   on a layered image, changing format mid-draw.
//! - [`Error::SanityCheckFail`] — internal-invariant violation (bad magic,
//!   run-length accounting mismatch, buffer overrun).
//!
//! Detected preconditions return an `Err` (callers map this to "raise and
//! return an identity", per §7); internal invariant failures are the same
//! variant (`SanityCheckFail`) and may indicate outputs were partially
//! written.
//!
//! # Dependencies
//!
//! - [`thiserror`] — derive macro for `Display`/`std::error::Error`.

use thiserror::Error as ThisError;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the image core.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A value (dimension, offset, count, format pairing) was invalid for
    /// the requested operation.
    #[error("invalid value: {detail}")]
    InvalidValue {
        /// Description of the invalid value.
        detail: String,
    },

    /// A header field or argument held a code that doesn't name a known
    /// enum member.
    #[error("invalid enum for {field}: {code}")]
    InvalidEnum {
        /// Name of the field/argument.
        field: String,
        /// The unrecognized code.
        code: i64,
    },

    /// The operation is not permitted in the current state (write to a
    /// read-only pointer image, format change while drawing, missing depth
    /// on a layered image, etc).
    #[error("invalid operation: {detail}")]
    InvalidOperation {
        /// Description of why the operation is disallowed.
        detail: String,
    },

    /// An internal invariant was violated: bad magic, a run-length
    /// accounting mismatch, or a buffer overrun. Outputs may be partially
    /// written when this is raised.
    #[error("sanity check failed: {detail}")]
    SanityCheckFail {
        /// Description of the violated invariant.
        detail: String,
    },
}

impl Error {
    /// Creates an [`Error::InvalidValue`].
    #[inline]
    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::InvalidValue {
            detail: detail.into(),
        }
    }

    /// Creates an [`Error::InvalidEnum`].
    #[inline]
    pub fn invalid_enum(field: impl Into<String>, code: i64) -> Self {
        Self::InvalidEnum {
            field: field.into(),
            code,
        }
    }

    /// Creates an [`Error::InvalidOperation`].
    #[inline]
    pub fn invalid_operation(detail: impl Into<String>) -> Self {
        Self::InvalidOperation {
            detail: detail.into(),
        }
    }

    /// Creates an [`Error::SanityCheckFail`].
    #[inline]
    pub fn sanity_check_fail(detail: impl Into<String>) -> Self {
        Self::SanityCheckFail {
            detail: detail.into(),
        }
    }

    /// The error kind as reported through [`crate::context::Diagnostics`],
    /// matching §7's four kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
            Self::InvalidEnum { .. } => ErrorKind::InvalidEnum,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::SanityCheckFail { .. } => ErrorKind::SanityCheckFail,
        }
    }
}

/// The four error/warning kinds from §7, shared by [`Error`] and
/// [`Warning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad dimensions, offsets, or mismatched formats.
    InvalidValue,
    /// Unknown enum code.
    InvalidEnum,
    /// Operation not permitted in the current state.
    InvalidOperation,
    /// Internal invariant violation.
    SanityCheckFail,
}

/// A recoverable condition reported through
/// [`crate::context::Diagnostics::raise_warning`] rather than returned as an
/// error (e.g. blending without an alpha channel, §4.6).
#[derive(Debug, Clone, ThisError)]
#[error("warning ({kind:?}): {detail}")]
pub struct Warning {
    /// Which of the four kinds this warning falls under.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub detail: String,
}

impl Warning {
    /// Creates a new warning.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}
