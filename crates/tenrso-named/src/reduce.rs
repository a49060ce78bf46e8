//! Reductions over named axes
//!
//! Every reduction resolves its selectors with [`NamedTensor::axes_of`],
//! removes the reduced axes from the names and coordinates, and lets the
//! engine reduce the data. Passing `None` reduces over every axis.
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
//! let s = sum(&x, Some(&selectors(["C"]))).unwrap();
//! assert_eq!(s.dims(), &[Some("N".to_string())]);
//! assert_eq!(s.data()[&[1]], 15.0);
//! ```

use scirs2_core::ndarray_ext::ArrayView1;
use scirs2_core::numeric::{Float, FromPrimitive};
use tracing::debug;

use crate::axes::strip_remaining;
use crate::dense::DenseND;
use crate::error::{NamedTensorError, Result};
use crate::tensor::NamedTensor;
use crate::types::{CoordValue, DimSelector};

/// Reduction operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Prod,
    Mean,
    /// Population standard deviation
    Std,
    Max,
    Min,
    /// Sum ignoring NaN
    NanSum,
    /// Mean ignoring NaN
    NanMean,
}

impl ReduceOp {
    fn apply<T: Float + FromPrimitive>(self, lane: ArrayView1<'_, T>) -> T {
        let count = |n: usize| T::from_usize(n).unwrap_or_else(T::nan);
        match self {
            ReduceOp::Sum => lane.iter().fold(T::zero(), |acc, &v| acc + v),
            ReduceOp::Prod => lane.iter().fold(T::one(), |acc, &v| acc * v),
            ReduceOp::Mean => ReduceOp::Sum.apply(lane) / count(lane.len()),
            ReduceOp::Std => {
                let mean = ReduceOp::Mean.apply(lane);
                let var = lane.iter().fold(T::zero(), |acc, &v| acc + (v - mean) * (v - mean));
                (var / count(lane.len())).sqrt()
            }
            ReduceOp::Max => lane.iter().fold(T::neg_infinity(), |acc, &v| acc.max(v)),
            ReduceOp::Min => lane.iter().fold(T::infinity(), |acc, &v| acc.min(v)),
            ReduceOp::NanSum => lane
                .iter()
                .filter(|v| !v.is_nan())
                .fold(T::zero(), |acc, &v| acc + v),
            ReduceOp::NanMean => {
                let (sum, n) = lane
                    .iter()
                    .filter(|v| !v.is_nan())
                    .fold((T::zero(), 0usize), |(acc, n), &v| (acc + v, n + 1));
                sum / count(n)
            }
        }
    }
}

/// Reduce `x` over the selected axes
pub fn reduce<T>(x: &NamedTensor<T>, op: ReduceOp, dims: Option<&[DimSelector]>) -> Result<NamedTensor<T>>
where
    T: Float + FromPrimitive,
{
    let axes = x.axes_of(dims)?;
    if axes.is_empty() {
        return Ok(x.view_copy());
    }
    debug!(?op, ?axes, "reduce");
    let data = x.data().reduce_axes(&axes, |lane| op.apply(lane))?;
    NamedTensor::from_parts(
        data,
        Some(strip_remaining(x.dims(), &axes)),
        Some(strip_remaining(x.coords(), &axes)),
    )
}

impl<T: Float + FromPrimitive> NamedTensor<T> {
    /// Method form of [`reduce`]
    pub fn reduce(&self, op: ReduceOp, dims: Option<&[DimSelector]>) -> Result<NamedTensor<T>> {
        reduce(self, op, dims)
    }
}

macro_rules! reduction {
    ($(#[$doc:meta])* $name:ident, $op:expr) => {
        $(#[$doc])*
        pub fn $name<T>(x: &NamedTensor<T>, dims: Option<&[DimSelector]>) -> Result<NamedTensor<T>>
        where
            T: Float + FromPrimitive,
        {
            reduce(x, $op, dims)
        }
    };
}

reduction!(sum, ReduceOp::Sum);
reduction!(prod, ReduceOp::Prod);
reduction!(mean, ReduceOp::Mean);
reduction!(
    /// Population standard deviation
    std,
    ReduceOp::Std
);
reduction!(max, ReduceOp::Max);
reduction!(min, ReduceOp::Min);
reduction!(nansum, ReduceOp::NanSum);
reduction!(nanmean, ReduceOp::NanMean);

/// Position of the first element winning `better` in each lane along `dim`
fn arg_extremum<T, F>(x: &NamedTensor<T>, dim: DimSelector, better: F) -> Result<(usize, NamedTensor<usize>)>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    let axis = x.axis_of(dim)?;
    if x.shape()[axis] == 0 {
        return Err(NamedTensorError::ShapeMismatch(format!(
            "cannot locate an extremum along empty axis {}",
            axis
        )));
    }
    let data: DenseND<usize> = x.data().reduce_axes(&[axis], |lane| {
        let mut best = 0;
        for (i, v) in lane.iter().enumerate().skip(1) {
            if better(v, &lane[best]) {
                best = i;
            }
        }
        best
    })?;
    let tensor = NamedTensor::from_parts(
        data,
        Some(strip_remaining(x.dims(), &[axis])),
        Some(strip_remaining(x.coords(), &[axis])),
    )?;
    Ok((axis, tensor))
}

/// Index of the maximum along one axis; ties go to the first occurrence
pub fn argmax<T: Clone + PartialOrd>(x: &NamedTensor<T>, dim: impl Into<DimSelector>) -> Result<NamedTensor<usize>> {
    arg_extremum(x, dim.into(), |a, b| a > b).map(|(_, t)| t)
}

/// Index of the minimum along one axis; ties go to the first occurrence
pub fn argmin<T: Clone + PartialOrd>(x: &NamedTensor<T>, dim: impl Into<DimSelector>) -> Result<NamedTensor<usize>> {
    arg_extremum(x, dim.into(), |a, b| a < b).map(|(_, t)| t)
}

fn coord_at<T>(
    x: &NamedTensor<T>,
    axis: usize,
    positions: NamedTensor<usize>,
    use_index_if_no_coord: bool,
) -> Result<NamedTensor<CoordValue>> {
    match x.coord(axis) {
        Some(coord) => Ok(positions.map(|&i| {
            coord
                .value(i)
                .unwrap_or(CoordValue::Number(i as f64))
        })),
        None if use_index_if_no_coord => Ok(positions.map(|&i| CoordValue::Number(i as f64))),
        None => Err(NamedTensorError::MissingCoordinate { axis }),
    }
}

/// Coordinate value at the maximum along one axis
///
/// Without a coordinate on that axis the plain index is reported when
/// `use_index_if_no_coord` is set, otherwise `MissingCoordinate` is returned.
///
/// ```
/// use tenrso_named::reduce::coord_max;
/// use tenrso_named::{Coord, CoordValue, DenseND, NamedTensor};
///
/// let x = NamedTensor::with_dims(DenseND::from_vec(vec![0.1, 0.7, 0.2], &[3]).unwrap(), [Some("F")])
///     .unwrap()
///     .with_coords(vec![Some(Coord::from(vec![10.0, 20.0, 30.0]))])
///     .unwrap();
/// let peak = coord_max(&x, "F", false).unwrap();
/// assert_eq!(peak.data()[&[]], CoordValue::Number(20.0));
/// ```
pub fn coord_max<T: Clone + PartialOrd>(
    x: &NamedTensor<T>,
    dim: impl Into<DimSelector>,
    use_index_if_no_coord: bool,
) -> Result<NamedTensor<CoordValue>> {
    let (axis, positions) = arg_extremum(x, dim.into(), |a, b| a > b)?;
    coord_at(x, axis, positions, use_index_if_no_coord)
}

/// Coordinate value at the minimum along one axis
pub fn coord_min<T: Clone + PartialOrd>(
    x: &NamedTensor<T>,
    dim: impl Into<DimSelector>,
    use_index_if_no_coord: bool,
) -> Result<NamedTensor<CoordValue>> {
    let (axis, positions) = arg_extremum(x, dim.into(), |a, b| a < b)?;
    coord_at(x, axis, positions, use_index_if_no_coord)
}
