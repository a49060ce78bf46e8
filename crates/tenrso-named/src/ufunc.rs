//! Element-wise functions on named tensors
//!
//! Unary functions keep every piece of metadata. [`softmax`] normalizes along
//! one named axis and [`where_`] selects between two operands under unilateral
//! broadcasting.

use scirs2_core::numeric::Float;

use crate::array_like::IntoNamedTensor;
use crate::broadcast::Broadcaster;
use crate::error::Result;
use crate::promote::promote_ternary;
use crate::tensor::NamedTensor;
use crate::types::DimSelector;

/// Element-wise operation types (operations on a single tensor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElemOp {
    /// Negation: -x
    Neg,
    /// Absolute value: |x|
    Abs,
    /// Exponential: e^x
    Exp,
    /// Natural logarithm: ln(x)
    Ln,
    Log2,
    Log10,
    /// Square root: sqrt(x)
    Sqrt,
    Sin,
    Cos,
    Tan,
    Sinh,
    Cosh,
    /// Hyperbolic tangent: tanh(x)
    Tanh,
    /// Sigmoid: 1 / (1 + e^(-x)), evaluated as (1 + tanh(x / 2)) / 2
    Sigmoid,
}

impl ElemOp {
    pub fn apply<T: Float>(self, v: T) -> T {
        match self {
            ElemOp::Neg => -v,
            ElemOp::Abs => v.abs(),
            ElemOp::Exp => v.exp(),
            ElemOp::Ln => v.ln(),
            ElemOp::Log2 => v.log2(),
            ElemOp::Log10 => v.log10(),
            ElemOp::Sqrt => v.sqrt(),
            ElemOp::Sin => v.sin(),
            ElemOp::Cos => v.cos(),
            ElemOp::Tan => v.tan(),
            ElemOp::Sinh => v.sinh(),
            ElemOp::Cosh => v.cosh(),
            ElemOp::Tanh => v.tanh(),
            ElemOp::Sigmoid => {
                let half = T::one() / (T::one() + T::one());
                half * (T::one() + (v * half).tanh())
            }
        }
    }
}

/// Apply `op` to every element
pub fn map_elem<T: Float>(x: &NamedTensor<T>, op: ElemOp) -> NamedTensor<T> {
    x.map(|&v| op.apply(v))
}

impl<T: Float> NamedTensor<T> {
    /// Method form of [`map_elem`]
    pub fn apply(&self, op: ElemOp) -> NamedTensor<T> {
        map_elem(self, op)
    }
}

/// Softmax along one axis
///
/// ```
/// use tenrso_named::ufunc::softmax;
/// use tenrso_named::{DenseND, NamedTensor};
///
/// let logits = NamedTensor::with_dims(
///     DenseND::from_vec(vec![1.0, 1.0, 0.0, 1000.0], &[2, 2]).unwrap(),
///     [Some("N"), Some("K")],
/// )
/// .unwrap();
/// let p = softmax(&logits, "K").unwrap();
/// assert!((p.data()[&[0, 0]] - 0.5).abs() < 1e-12);
/// assert!((p.data()[&[1, 1]] - 1.0).abs() < 1e-12);
/// ```
pub fn softmax<T: Float>(x: &NamedTensor<T>, dim: impl Into<DimSelector>) -> Result<NamedTensor<T>> {
    let axis = x.axis_of(dim)?;
    let data = x.data().map_lanes(axis, |lane| {
        let peak = lane.iter().fold(T::neg_infinity(), |acc, &v| acc.max(v));
        let mut total = T::zero();
        for v in lane.iter_mut() {
            *v = (*v - peak).exp();
            total = total + *v;
        }
        for v in lane.iter_mut() {
            *v = *v / total;
        }
    })?;
    x.with_data(data)
}

/// Pick from `x` where `cond` holds and from `y` elsewhere
///
/// The operands are broadcast unilaterally: `cond` first against `x`, then
/// the pair against `y`. Any operand may be a plain buffer.
///
/// ```
/// use tenrso_named::{where_, DenseND, NamedTensor};
///
/// let x = NamedTensor::with_dims(DenseND::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap(), [Some("T")]).unwrap();
/// let picked = where_(vec![true, false, true], &x, NamedTensor::scalar(-1.0)).unwrap();
/// assert_eq!(picked.data().iter().copied().collect::<Vec<_>>(), vec![1.0, -1.0, 3.0]);
/// assert_eq!(picked.dim(0), Some("T"));
/// ```
pub fn where_<T, C, X, Y>(cond: C, x: X, y: Y) -> Result<NamedTensor<T>>
where
    T: Clone,
    C: IntoNamedTensor<bool>,
    X: IntoNamedTensor<T>,
    Y: IntoNamedTensor<T>,
{
    let (cond, x, y) = (cond.into_named(), x.into_named(), y.into_named());
    let select = promote_ternary(Broadcaster::unilateral(), |c: &bool, a: &T, b: &T| {
        if *c {
            a.clone()
        } else {
            b.clone()
        }
    });
    select(&cond, &x, &y)
}
