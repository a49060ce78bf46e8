//! # tenrso-named
//!
//! Named-dimension tensors for TenRSo.
//!
//! A [`NamedTensor`] wraps a [`DenseND`] buffer with per-axis metadata:
//!
//! - an optional **name** per axis (`"N"`, `"C"`, `"H"`, ...), unique within a tensor
//! - an optional **coordinate** per axis ([`Coord`]), numeric or labelled, whose
//!   length matches the axis size
//!
//! Axes are addressed by name or by (possibly negative) position through
//! [`DimSelector`], and binary operations line axes up by name before applying
//! the usual trailing broadcasting rule.
//!
//! ## Quick Start
//!
//! ```
//! use tenrso_named::{DenseND, NamedTensor};
//!
//! let image = NamedTensor::with_dims(
//!     DenseND::<f64>::ones(&[10, 3, 32, 48]),
//!     [None, Some("C"), Some("H"), Some("W")],
//! )
//! .unwrap();
//! assert_eq!(image.axis_of("H").unwrap(), 2);
//! assert_eq!(image.axis_of(-1).unwrap(), 3);
//! ```
//!
//! ## Broadcasting
//!
//! Two strategies are built in:
//!
//! - **vanilla**: plain trailing broadcasting, with names merged position by
//!   position. Two different names on one position are an error.
//! - **unilateral**: the second operand is rearranged onto the first by name.
//!   Its unnamed axes fill the remaining positions from the right, and names
//!   the first operand lacks move to new leading axes.
//!
//! ```
//! use tenrso_named::{BroadcastPolicy, Broadcaster, DenseND, NamedTensor};
//!
//! let image = NamedTensor::with_dims(
//!     DenseND::<f64>::zeros(&[10, 3, 32, 48]),
//!     [None, Some("C"), Some("H"), Some("W")],
//! )
//! .unwrap();
//! let label = NamedTensor::with_dims(DenseND::<f64>::zeros(&[10, 32, 48]), [None, Some("H"), Some("W")]).unwrap();
//!
//! let b = Broadcaster::unilateral().broadcast(&image, &label).unwrap();
//! assert_eq!(b.y.shape(), &[10, 1, 32, 48]);
//! assert_eq!(b.shape(), Some(vec![10, 3, 32, 48]));
//!
//! // trailing alignment puts the batch axis of `label` against C
//! assert!(Broadcaster::vanilla().broadcast(&image, &label).is_err());
//! ```
//!
//! ## Operators and Reductions
//!
//! Arithmetic goes through vanilla broadcasting and returns a `Result`:
//!
//! ```
//! use tenrso_named::reduce::sum;
//! use tenrso_named::types::selectors;
//! use tenrso_named::{DenseND, NamedTensor};
//!
//! let x = NamedTensor::with_dims(
//!     DenseND::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap(),
//!     [Some("N"), Some("C")],
//! )
//! .unwrap();
//! let y = (&x * 2.0).unwrap();
//! let per_row = sum(&y, Some(&selectors(["C"]))).unwrap();
//! assert_eq!(per_row.data()[&[0]], 12.0);
//! assert_eq!(per_row.dim(0), Some("N"));
//! ```
//!
//! ## Templates
//!
//! A [`Template`] fixes the output layout by slot and folds any number of
//! operands into it:
//!
//! ```
//! use tenrso_named::{DenseND, NamedTensor, Template};
//!
//! let template = Template::from_names(["N", "C", "T"]).unwrap();
//! let a = NamedTensor::with_dims(DenseND::<f64>::zeros(&[5, 4]), [Some("T"), Some("N")]).unwrap();
//! let b = NamedTensor::with_dims(DenseND::<f64>::zeros(&[3]), [Some("C")]).unwrap();
//! let (cast, state) = template.fold([&a, &b]).unwrap();
//! assert_eq!(cast[0].shape(), &[4, 1, 5]);
//! assert_eq!(state.shape, vec![4, 3, 5]);
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`] with a [`NamedTensorError`]
//! naming the dims, shapes or axes involved. Engine errors from [`DenseND`]
//! (plain `anyhow::Error`) are carried in [`NamedTensorError::Engine`].
//!
//! ## Logging
//!
//! Cast decisions and broadcasts are reported through `tracing`. See
//! [`tracing_support`] for subscriber setup.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for metadata types
//! - `subscriber`: [`tracing_support::init_tracing`] with `tracing-subscriber`

pub mod array_like;
pub mod axes;
pub mod broadcast;
pub mod dense;
pub mod dimcast;
pub mod error;
pub mod merge;
pub mod promote;
pub mod reduce;
pub mod template;
pub mod tensor;
pub mod tracing_support;
pub mod types;
pub mod ufunc;


pub use array_like::{ArrayLike, IntoNamedTensor};
pub use broadcast::{cast_onto, BroadcastPolicy, Broadcasted, Broadcaster};
pub use dense::DenseND;
pub use dimcast::{DimCast, DimCaster, TrivialCaster, UnilateralCaster};
pub use error::{NamedTensorError, Result};
pub use merge::{DefaultMerger, MetadataMerger};
pub use promote::{apply_binary, apply_compare, promote, promote_ternary, promote_with, BinaryOp, CompareOp, Operand};
pub use reduce::ReduceOp;
pub use template::{template_broadcast, AxisSelector, Template, TemplateBroadcaster, TemplateSlot, TemplateState};
pub use tensor::NamedTensor;
pub use types::{
    AxesPermutation, AxisSlice, Coord, CoordValue, Coords, Dim, DimSelector, Dims, Position, Rank, Shape,
    Tolerance,
};
pub use ufunc::{softmax, where_, ElemOp};
