//! Operation promotion
//!
//! Raw array operations know nothing about names. [`promote`] wraps one so
//! that it broadcasts its named operands first and wraps the raw result with
//! the merged dims and coordinates; [`promote_with`] adds a metadata
//! post-processor and [`promote_ternary`] handles three operands.
//!
//! Arithmetic and comparison operators go through [`BinaryOp`] and
//! [`CompareOp`]. Each operator is bound to a primary kernel (`lhs ∘ rhs`,
//! used when the left operand is a tensor) and a reflected kernel (used with
//! swapped operands when only the right operand is a tensor).
//!
//! ```
//! use tenrso_named::{DenseND, NamedTensor};
//!
//! let x = NamedTensor::with_dims(DenseND::from_vec(vec![1.0, 2.0], &[2]).unwrap(), [Some("N")]).unwrap();
//! let y = (&x * 3.0).unwrap();
//! let z = (10.0 - &y).unwrap();
//! assert_eq!(z.data()[&[1]], 4.0);
//! assert_eq!(z.dim(0), Some("N"));
//! ```

use scirs2_core::numeric::Float;

use crate::broadcast::{BroadcastPolicy, Broadcasted, Broadcaster};
use crate::dense::DenseND;
use crate::error::{NamedTensorError, Result};
use crate::tensor::NamedTensor;
use crate::types::{Coords, Dims};

impl<B: BroadcastPolicy + ?Sized> BroadcastPolicy for &B {
    fn broadcast<T: Clone, U: Clone>(
        &self,
        x: &NamedTensor<T>,
        y: &NamedTensor<U>,
    ) -> Result<Broadcasted<T, U>> {
        (**self).broadcast(x, y)
    }
}

/// Lift a raw binary operation to named tensors
pub fn promote<T, U, V, B, F>(
    broadcaster: B,
    op: F,
) -> impl Fn(&NamedTensor<T>, &NamedTensor<U>) -> Result<NamedTensor<V>>
where
    T: Clone,
    U: Clone,
    B: BroadcastPolicy,
    F: Fn(&DenseND<T>, &DenseND<U>) -> anyhow::Result<DenseND<V>>,
{
    move |x: &NamedTensor<T>, y: &NamedTensor<U>| {
        let b = broadcaster.broadcast(x, y)?;
        let data = op(&b.x, &b.y)?;
        NamedTensor::from_parts(data, Some(b.dims), Some(b.coords))
    }
}

/// Like [`promote`], with a post-processor rewriting the merged metadata
pub fn promote_with<T, U, V, B, F, P>(
    broadcaster: B,
    op: F,
    post: P,
) -> impl Fn(&NamedTensor<T>, &NamedTensor<U>) -> Result<NamedTensor<V>>
where
    T: Clone,
    U: Clone,
    B: BroadcastPolicy,
    F: Fn(&DenseND<T>, &DenseND<U>) -> anyhow::Result<DenseND<V>>,
    P: Fn(Dims, Coords) -> (Dims, Coords),
{
    move |x: &NamedTensor<T>, y: &NamedTensor<U>| {
        let b = broadcaster.broadcast(x, y)?;
        let data = op(&b.x, &b.y)?;
        let (dims, coords) = post(b.dims, b.coords);
        NamedTensor::from_parts(data, Some(dims), Some(coords))
    }
}

/// Lift an elementwise three-operand kernel to named tensors
///
/// The first two operands are broadcast together, then the result is
/// broadcast against the third.
pub fn promote_ternary<A, B, C, V, P, F>(
    broadcaster: P,
    kernel: F,
) -> impl Fn(&NamedTensor<A>, &NamedTensor<B>, &NamedTensor<C>) -> Result<NamedTensor<V>>
where
    A: Clone,
    B: Clone,
    C: Clone,
    P: BroadcastPolicy,
    F: Fn(&A, &B, &C) -> V,
{
    move |a: &NamedTensor<A>, b: &NamedTensor<B>, c: &NamedTensor<C>| {
        let ab = broadcaster.broadcast(a, b)?;
        let pairs = ab.x.zip_with(&ab.y, |p, q| (p.clone(), q.clone()))?;
        let pairs = NamedTensor::from_parts(pairs, Some(ab.dims), Some(ab.coords))?;
        let abc = broadcaster.broadcast(&pairs, c)?;
        let data = abc.x.zip_with(&abc.y, |(p, q), r| kernel(p, q, r))?;
        NamedTensor::from_parts(data, Some(abc.dims), Some(abc.coords))
    }
}

/// Primary and reflected kernels of one operator
#[derive(Debug, Clone, Copy)]
pub struct OperatorBinding<T, R> {
    pub symbol: &'static str,
    /// `primary(l, r) = l ∘ r`
    pub primary: fn(&T, &T) -> R,
    /// `reflected(r, l) = l ∘ r`
    pub reflected: fn(&T, &T) -> R,
}

impl<T, R> OperatorBinding<T, R> {
    pub fn new(symbol: &'static str, primary: fn(&T, &T) -> R, reflected: fn(&T, &T) -> R) -> Self {
        Self {
            symbol,
            primary,
            reflected,
        }
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Elementwise maximum
    Maximum,
    /// Elementwise minimum
    Minimum,
    /// Elementwise power
    Pow,
}

impl BinaryOp {
    pub fn binding<T: Float>(self) -> OperatorBinding<T, T> {
        match self {
            BinaryOp::Add => OperatorBinding::new("+", |l, r| *l + *r, |r, l| *l + *r),
            BinaryOp::Sub => OperatorBinding::new("-", |l, r| *l - *r, |r, l| *l - *r),
            BinaryOp::Mul => OperatorBinding::new("*", |l, r| *l * *r, |r, l| *l * *r),
            BinaryOp::Div => OperatorBinding::new("/", |l, r| *l / *r, |r, l| *l / *r),
            BinaryOp::Maximum => OperatorBinding::new(
                "maximum",
                |l, r| Float::max(*l, *r),
                |r, l| Float::max(*l, *r),
            ),
            BinaryOp::Minimum => OperatorBinding::new(
                "minimum",
                |l, r| Float::min(*l, *r),
                |r, l| Float::min(*l, *r),
            ),
            BinaryOp::Pow => OperatorBinding::new("pow", |l, r| l.powf(*r), |r, l| l.powf(*r)),
        }
    }
}

/// Comparison operators producing boolean tensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn binding<T: PartialOrd>(self) -> OperatorBinding<T, bool> {
        // reflected kernels see (rhs, lhs), so the order flips
        match self {
            CompareOp::Eq => OperatorBinding::new("==", |l, r| l == r, |r, l| l == r),
            CompareOp::Ne => OperatorBinding::new("!=", |l, r| l != r, |r, l| l != r),
            CompareOp::Lt => OperatorBinding::new("<", |l, r| l < r, |r, l| r > l),
            CompareOp::Le => OperatorBinding::new("<=", |l, r| l <= r, |r, l| r >= l),
            CompareOp::Gt => OperatorBinding::new(">", |l, r| l > r, |r, l| r < l),
            CompareOp::Ge => OperatorBinding::new(">=", |l, r| l >= r, |r, l| r <= l),
        }
    }
}

/// Operand of a promoted operator
#[derive(Debug)]
pub enum Operand<'a, T> {
    Tensor(&'a NamedTensor<T>),
    Scalar(T),
}

impl<'a, T> From<&'a NamedTensor<T>> for Operand<'a, T> {
    fn from(x: &'a NamedTensor<T>) -> Self {
        Operand::Tensor(x)
    }
}

impl<T: Clone> Operand<'_, T> {
    fn kind(&self) -> &'static str {
        match self {
            Operand::Tensor(_) => "tensor",
            Operand::Scalar(_) => "scalar",
        }
    }

    fn to_tensor(&self) -> NamedTensor<T> {
        match self {
            Operand::Tensor(x) => x.view_copy(),
            Operand::Scalar(v) => NamedTensor::scalar(v.clone()),
        }
    }
}

/// Kernel applied to `(this, other)`; `None` when `this` is not a tensor
fn dispatch<T, R, B>(
    kernel: fn(&T, &T) -> R,
    broadcaster: &B,
    this: &Operand<'_, T>,
    other: &Operand<'_, T>,
) -> Option<Result<NamedTensor<R>>>
where
    T: Clone,
    B: BroadcastPolicy,
{
    let Operand::Tensor(x) = this else {
        return None;
    };
    let y = other.to_tensor();
    let lifted = promote(broadcaster, |a: &DenseND<T>, b: &DenseND<T>| a.zip_with(b, kernel));
    Some(lifted(x, &y))
}

/// Apply a bound operator: primary first, reflected second
pub fn apply_operator<T, R, B>(
    binding: &OperatorBinding<T, R>,
    broadcaster: &B,
    lhs: Operand<'_, T>,
    rhs: Operand<'_, T>,
) -> Result<NamedTensor<R>>
where
    T: Clone,
    B: BroadcastPolicy,
{
    if let Some(result) = dispatch(binding.primary, broadcaster, &lhs, &rhs) {
        return result;
    }
    if let Some(result) = dispatch(binding.reflected, broadcaster, &rhs, &lhs) {
        return result;
    }
    Err(NamedTensorError::UnsupportedOperator {
        op: binding.symbol,
        lhs: lhs.kind(),
        rhs: rhs.kind(),
    })
}

/// Arithmetic under vanilla broadcasting
pub fn apply_binary<T: Float>(op: BinaryOp, lhs: Operand<'_, T>, rhs: Operand<'_, T>) -> Result<NamedTensor<T>> {
    apply_operator(&op.binding(), &Broadcaster::vanilla(), lhs, rhs)
}

/// Comparison under vanilla broadcasting
pub fn apply_compare<T: Clone + PartialOrd>(
    op: CompareOp,
    lhs: Operand<'_, T>,
    rhs: Operand<'_, T>,
) -> Result<NamedTensor<bool>> {
    apply_operator(&op.binding(), &Broadcaster::vanilla(), lhs, rhs)
}

impl<T: Float> NamedTensor<T> {
    pub fn maximum(&self, other: &NamedTensor<T>) -> Result<NamedTensor<T>> {
        apply_binary(BinaryOp::Maximum, self.into(), other.into())
    }

    pub fn minimum(&self, other: &NamedTensor<T>) -> Result<NamedTensor<T>> {
        apply_binary(BinaryOp::Minimum, self.into(), other.into())
    }

    pub fn pow(&self, exponent: &NamedTensor<T>) -> Result<NamedTensor<T>> {
        apply_binary(BinaryOp::Pow, self.into(), exponent.into())
    }
}

impl<T: Clone + PartialOrd> NamedTensor<T> {
    /// Elementwise comparison against another tensor
    pub fn compare(&self, op: CompareOp, other: &NamedTensor<T>) -> Result<NamedTensor<bool>> {
        apply_compare(op, self.into(), other.into())
    }

    /// Elementwise comparison against a scalar
    pub fn compare_scalar(&self, op: CompareOp, value: T) -> Result<NamedTensor<bool>> {
        apply_compare(op, self.into(), Operand::Scalar(value))
    }
}

macro_rules! impl_named_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<'b, T: Float> std::ops::$trait<&'b NamedTensor<T>> for &NamedTensor<T> {
            type Output = Result<NamedTensor<T>>;

            fn $method(self, rhs: &'b NamedTensor<T>) -> Self::Output {
                apply_binary($op, Operand::Tensor(self), Operand::Tensor(rhs))
            }
        }

        impl<T: Float> std::ops::$trait<T> for &NamedTensor<T> {
            type Output = Result<NamedTensor<T>>;

            fn $method(self, rhs: T) -> Self::Output {
                apply_binary($op, Operand::Tensor(self), Operand::Scalar(rhs))
            }
        }

        impl<'b> std::ops::$trait<&'b NamedTensor<f64>> for f64 {
            type Output = Result<NamedTensor<f64>>;

            fn $method(self, rhs: &'b NamedTensor<f64>) -> Self::Output {
                apply_binary($op, Operand::Scalar(self), Operand::Tensor(rhs))
            }
        }

        impl<'b> std::ops::$trait<&'b NamedTensor<f32>> for f32 {
            type Output = Result<NamedTensor<f32>>;

            fn $method(self, rhs: &'b NamedTensor<f32>) -> Self::Output {
                apply_binary($op, Operand::Scalar(self), Operand::Tensor(rhs))
            }
        }
    };
}

impl_named_binop!(Add, add, BinaryOp::Add);
impl_named_binop!(Sub, sub, BinaryOp::Sub);
impl_named_binop!(Mul, mul, BinaryOp::Mul);
impl_named_binop!(Div, div, BinaryOp::Div);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{dims, named, Coord};

    fn vector(values: Vec<f64>, name: &str) -> NamedTensor<f64> {
        let n = values.len();
        NamedTensor::with_dims(DenseND::from_vec(values, &[n]).unwrap(), [Some(name)]).unwrap()
    }

    #[test]
    fn test_tensor_arithmetic_broadcasts() {
        let x = NamedTensor::with_dims(
            DenseND::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap(),
            [Some("N"), None],
        )
        .unwrap();
        let y = NamedTensor::new(DenseND::from_vec(vec![10.0, 20.0, 30.0], &[3]).unwrap());
        let z = (&x + &y).unwrap();
        assert_eq!(z.dims(), &dims([Some("N"), None])[..]);
        assert_eq!(z.data()[&[1, 2]], 36.0);
    }

    #[test]
    fn test_reflected_operators() {
        let x = vector(vec![1.0, 4.0], "T");
        let sub = (1.0 - &x).unwrap();
        assert_eq!(sub.data()[&[1]], -3.0);
        let div = (8.0 / &x).unwrap();
        assert_eq!(div.data()[&[1]], 2.0);
        assert_eq!(div.dim(0), Some("T"));

        let lt = apply_compare(CompareOp::Lt, Operand::Scalar(2.0), Operand::Tensor(&x)).unwrap();
        assert!(!lt.data()[&[0]]);
        assert!(lt.data()[&[1]]);
    }

    #[test]
    fn test_scalar_scalar_unsupported() {
        let err = apply_binary::<f64>(BinaryOp::Add, Operand::Scalar(1.0), Operand::Scalar(2.0)).unwrap_err();
        assert!(matches!(
            err,
            NamedTensorError::UnsupportedOperator {
                op: "+",
                lhs: "scalar",
                rhs: "scalar"
            }
        ));
    }

    #[test]
    fn test_operators_use_vanilla_broadcasting() {
        let x = NamedTensor::with_dims(DenseND::<f64>::zeros(&[2, 3]), [Some("A"), Some("B")]).unwrap();
        let y = NamedTensor::with_dims(DenseND::<f64>::zeros(&[2, 3]), [Some("A"), Some("C")]).unwrap();
        assert!(matches!(
            &x + &y,
            Err(NamedTensorError::IncompatibleDimensions { .. })
        ));
    }

    #[test]
    fn test_maximum_pow_compare() {
        let x = vector(vec![1.0, 5.0], "T");
        let y = vector(vec![3.0, 2.0], "T");
        let m = x.maximum(&y).unwrap();
        assert_eq!(m.data()[&[0]], 3.0);
        assert_eq!(m.data()[&[1]], 5.0);
        let p = x.pow(&y).unwrap();
        assert_eq!(p.data()[&[1]], 25.0);
        let ge = x.compare(CompareOp::Ge, &y).unwrap();
        assert!(!ge.data()[&[0]]);
        assert!(ge.data()[&[1]]);
        let eq = x.compare_scalar(CompareOp::Eq, 5.0).unwrap();
        assert!(eq.data()[&[1]]);
    }

    #[test]
    fn test_promote_unilateral() {
        let add = promote(Broadcaster::unilateral(), |a: &DenseND<f64>, b: &DenseND<f64>| {
            a.zip_with(b, |u, v| u + v)
        });
        let x = NamedTensor::with_dims(DenseND::<f64>::ones(&[2, 3]), [Some("A"), Some("B")]).unwrap();
        let y = NamedTensor::with_dims(DenseND::<f64>::ones(&[2, 4]), [Some("A"), Some("C")]).unwrap();
        let z = add(&x, &y).unwrap();
        assert_eq!(z.dims(), &named(["C", "A", "B"])[..]);
        assert_eq!(z.shape(), &[4, 2, 3]);
        assert_eq!(z.data()[&[3, 1, 2]], 2.0);
    }

    #[test]
    fn test_promote_with_post_processor() {
        let op = promote_with(
            Broadcaster::vanilla(),
            |a: &DenseND<f64>, b: &DenseND<f64>| a.zip_with(b, |u, v| u * v),
            |dims, coords| (dims.into_iter().map(|d| d.map(|n| n.to_lowercase())).collect(), coords),
        );
        let x = vector(vec![1.0, 2.0], "T");
        let z = op(&x, &x).unwrap();
        assert_eq!(z.dim(0), Some("t"));
        assert_eq!(z.data()[&[1]], 4.0);
    }

    #[test]
    fn test_promote_ternary_keeps_coords() {
        let select = promote_ternary(Broadcaster::unilateral(), |c: &bool, a: &f64, b: &f64| {
            if *c {
                *a
            } else {
                *b
            }
        });
        let x = vector(vec![1.0, 2.0, 3.0], "T")
            .with_coords(vec![Some(Coord::from(vec![0.0, 0.5, 1.0]))])
            .unwrap();
        let cond = x.compare_scalar(CompareOp::Gt, 1.5).unwrap();
        let zero = NamedTensor::scalar(0.0);
        let z = select(&cond, &x, &zero).unwrap();
        assert_eq!(z.coord(0), x.coord(0));
        let values: Vec<f64> = z.data().iter().copied().collect();
        assert_eq!(values, vec![0.0, 2.0, 3.0]);
    }
}
