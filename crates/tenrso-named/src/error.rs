//! Error types for named-tensor operations
//!
//! Every fallible operation in this crate returns [`Result`], whose error is a
//! [`NamedTensorError`]. Failures raised by the dense engine (`anyhow` errors
//! from [`DenseND`](crate::DenseND)) are carried through the
//! [`NamedTensorError::Engine`] variant.
//!
//! # Examples
//!
//! ```
//! use tenrso_named::{DenseND, NamedTensor, NamedTensorError};
//!
//! let x = NamedTensor::with_dims(DenseND::<f64>::zeros(&[2, 3]), [Some("N"), Some("C")]).unwrap();
//! match x.axis_of("H") {
//!     Err(NamedTensorError::DimensionNotFound { selector, .. }) => assert_eq!(selector, "H"),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror::Error;

/// Top-level error type for named-tensor operations
#[derive(Error, Debug)]
pub enum NamedTensorError {
    /// A selector did not resolve to any axis
    #[error("Dimension not found: {selector} (dims {dims})")]
    DimensionNotFound { selector: String, dims: String },

    /// A name maps to more than one axis
    #[error("Ambiguous dimension '{name}': matches axes {axes:?}")]
    AmbiguousDimension { name: String, axes: Vec<usize> },

    /// Data shape and metadata lengths disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A name appears twice in a dims tuple or template
    #[error("Duplicate dimension name '{0}'")]
    DuplicateDimension(String),

    /// Two selectors resolved to the same axis
    #[error("Duplicate axis {axis} in selection")]
    DuplicateAxis { axis: usize },

    /// Positional index outside an axis
    #[error("Index {index} out of bounds for axis {axis} of size {size}")]
    IndexOutOfBounds {
        index: isize,
        axis: usize,
        size: usize,
    },

    /// Two dims tuples name the same position differently
    #[error("Incompatible dimensions: {lhs} and {rhs}")]
    IncompatibleDimensions { lhs: String, rhs: String },

    /// Two coordinate vectors on the same axis differ
    #[error("Incompatible coordinates on axis {axis}: {lhs} vs {rhs}")]
    IncompatibleCoordinates {
        axis: usize,
        lhs: String,
        rhs: String,
    },

    /// Dimension alignment failed
    #[error("Cannot cast dims {subject} onto {target}: {reason}")]
    CastImpossible {
        target: String,
        subject: String,
        reason: String,
    },

    /// Strict casting refused a subject of higher rank than its target
    #[error("Rank mismatch: subject of rank {subject} cannot be cast onto target of rank {target}")]
    RankMismatch { target: usize, subject: usize },

    /// Aligned shapes are not broadcast-compatible
    #[error("Broadcast impossible with shapes and dims <{lhs_shape:?}, {lhs_dims}> and <{rhs_shape:?}, {rhs_dims}>")]
    BroadcastError {
        lhs_shape: Vec<usize>,
        lhs_dims: String,
        rhs_shape: Vec<usize>,
        rhs_dims: String,
    },

    /// Neither the primary nor the reflected operator accepts the operands
    #[error("Unsupported operator '{op}' for operands ({lhs}, {rhs})")]
    UnsupportedOperator {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    /// Axes permutation is not well defined
    #[error("Invalid permutation {axes:?} for rank {rank}")]
    InvalidPermutation {
        axes: Vec<Option<usize>>,
        rank: usize,
    },

    /// An operation needed a coordinate that is absent
    #[error("No coordinate on axis {axis}")]
    MissingCoordinate { axis: usize },

    /// Error raised by the dense engine
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Result alias used throughout this crate
pub type Result<T> = std::result::Result<T, NamedTensorError>;
