//! Axis utilities
//!
//! Shape rules and metadata-carrying axis moves shared by the caster, the
//! broadcasters and the reductions:
//!
//! - [`permute`] applies a generalized permutation (with `None` sentinels that
//!   insert singleton axes), carrying names and coordinates along
//! - [`pad_singleton`] and [`align_rank`] insert unnamed size-1 axes
//! - [`shapes_broadcastable`] / [`broadcast_shape`] implement the
//!   trailing-aligned equal-or-one rule
//! - [`strip`] partitions a per-axis sequence by axis indices

use std::sync::Arc;

use crate::error::{NamedTensorError, Result};
use crate::tensor::NamedTensor;
use crate::types::{Coords, Dims, Position};

/// Check trailing-aligned broadcast compatibility
///
/// ```
/// use tenrso_named::axes::shapes_broadcastable;
///
/// assert!(shapes_broadcastable(&[10, 3, 256, 384], &[10, 1, 256, 384]));
/// assert!(shapes_broadcastable(&[3, 1], &[4]));
/// assert!(!shapes_broadcastable(&[2, 3], &[4, 3, 4]));
/// ```
pub fn shapes_broadcastable(a: &[usize], b: &[usize]) -> bool {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .all(|(&sa, &sb)| sa == sb || sa == 1 || sb == 1)
}

/// Shape resulting from broadcasting `a` with `b`, or `None` if incompatible
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    if !shapes_broadcastable(a, b) {
        return None;
    }

    let len = a.len().max(b.len());
    let mut result = vec![0; len];
    for (i, slot) in result.iter_mut().rev().enumerate() {
        let da = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let db = if i < b.len() { b[b.len() - 1 - i] } else { 1 };
        *slot = if da == 1 { db } else { da };
    }
    Some(result)
}

/// Check that a generalized permutation uses every source axis at most once,
/// and exactly once when `rank` is given
pub fn permutation_well_defined(axes: &[Option<usize>], rank: Option<usize>) -> bool {
    let sources: Vec<usize> = axes.iter().flatten().copied().collect();
    let mut sorted = sources.clone();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != sources.len() {
        return false;
    }
    match rank {
        Some(rank) => sorted.len() == rank && sorted.iter().enumerate().all(|(i, &a)| i == a),
        None => true,
    }
}

/// Inverse of a plain permutation: `inverse[p[i]] == i`
///
/// Fails with `InvalidPermutation` unless `axes` uses each of `0..axes.len()`
/// exactly once.
pub fn inverse_permutation(axes: &[usize]) -> Result<Vec<usize>> {
    let general: Vec<Option<usize>> = axes.iter().copied().map(Some).collect();
    if !permutation_well_defined(&general, Some(axes.len())) {
        return Err(NamedTensorError::InvalidPermutation {
            axes: general,
            rank: axes.len(),
        });
    }
    let mut inverse = vec![0; axes.len()];
    for (i, &a) in axes.iter().enumerate() {
        inverse[a] = i;
    }
    Ok(inverse)
}

/// Apply a generalized permutation to a named tensor
///
/// Every `None` entry inserts a new size-1 unnamed axis. The new axes are
/// appended to the data in order of appearance and then transposed into
/// place together with the source axes.
///
/// ```
/// use tenrso_named::{axes, DenseND, NamedTensor};
///
/// let y = NamedTensor::with_dims(DenseND::<f64>::zeros(&[10, 256, 384]), [None, Some("H"), Some("W")]).unwrap();
/// let z = axes::permute(&y, &[Some(0), None, Some(1), Some(2)]).unwrap();
/// assert_eq!(z.shape(), &[10, 1, 256, 384]);
/// assert_eq!(z.dim(2), Some("H"));
/// ```
pub fn permute<T: Clone>(x: &NamedTensor<T>, axes: &[Option<usize>]) -> Result<NamedTensor<T>> {
    let rank = x.rank();
    if !permutation_well_defined(axes, Some(rank)) {
        return Err(NamedTensorError::InvalidPermutation {
            axes: axes.to_vec(),
            rank,
        });
    }

    let identity = axes.len() == rank && axes.iter().enumerate().all(|(i, a)| *a == Some(i));
    if identity {
        return Ok(x.view_copy());
    }

    let mut next_axis = rank;
    let mut order = Vec::with_capacity(axes.len());
    let mut dims = Vec::with_capacity(axes.len());
    let mut coords = Vec::with_capacity(axes.len());
    for entry in axes {
        match entry {
            Some(axis) => {
                order.push(*axis);
                dims.push(x.dims()[*axis].clone());
                coords.push(x.coords()[*axis].clone());
            }
            None => {
                order.push(next_axis);
                next_axis += 1;
                dims.push(None);
                coords.push(None);
            }
        }
    }

    let mut padded_shape = x.shape().to_vec();
    padded_shape.resize(next_axis, 1);
    let data = x.data().reshape(&padded_shape)?.permute(&order)?;
    NamedTensor::from_parts(data, Some(dims), Some(coords))
}

/// Insert `count` unnamed size-1 axes on one side
pub fn pad_singleton<T: Clone>(x: &NamedTensor<T>, count: usize, position: Position) -> Result<NamedTensor<T>> {
    if count == 0 {
        return Ok(x.view_copy());
    }
    let ones = std::iter::repeat(1).take(count);
    let shape: Vec<usize> = match position {
        Position::Left => ones.chain(x.shape().iter().copied()).collect(),
        Position::Right => x.shape().iter().copied().chain(ones).collect(),
    };
    let (dims, coords): (Dims, Coords) = match position {
        Position::Left => (
            std::iter::repeat(None).take(count).chain(x.dims().iter().cloned()).collect(),
            std::iter::repeat(None).take(count).chain(x.coords().iter().cloned()).collect(),
        ),
        Position::Right => (
            x.dims().iter().cloned().chain(std::iter::repeat(None).take(count)).collect(),
            x.coords().iter().cloned().chain(std::iter::repeat(None).take(count)).collect(),
        ),
    };
    let data = x.data().reshape(&shape)?;
    NamedTensor::from_shared(Arc::new(data), Some(dims), Some(coords))
}

/// Left-pad the lower-rank tensor so both share a rank
pub fn align_rank<T: Clone, U: Clone>(
    x: &NamedTensor<T>,
    y: &NamedTensor<U>,
) -> Result<(NamedTensor<T>, NamedTensor<U>)> {
    let (rx, ry) = (x.rank(), y.rank());
    if rx > ry {
        Ok((x.view_copy(), pad_singleton(y, rx - ry, Position::Left)?))
    } else if rx < ry {
        Ok((pad_singleton(x, ry - rx, Position::Left)?, y.view_copy()))
    } else {
        Ok((x.view_copy(), y.view_copy()))
    }
}

/// Partition of a per-axis sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stripped<T> {
    /// Items whose position was not selected, in order
    pub remaining: Vec<T>,
    /// Items at the selected positions, in order of position
    pub stripped: Vec<T>,
}

/// Split `items` into the entries at `indices` and the rest, preserving order
///
/// ```
/// use tenrso_named::axes::strip;
///
/// let parts = strip(&["N", "C", "H", "W"], &[1, 3]);
/// assert_eq!(parts.remaining, vec!["N", "H"]);
/// assert_eq!(parts.stripped, vec!["C", "W"]);
/// ```
pub fn strip<T: Clone>(items: &[T], indices: &[usize]) -> Stripped<T> {
    let mut remaining = Vec::with_capacity(items.len());
    let mut stripped = Vec::with_capacity(indices.len());
    for (i, item) in items.iter().enumerate() {
        if indices.contains(&i) {
            stripped.push(item.clone());
        } else {
            remaining.push(item.clone());
        }
    }
    Stripped {
        remaining,
        stripped,
    }
}

/// The `remaining` half of [`strip`]
pub fn strip_remaining<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    strip(items, indices).remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DenseND;
    use crate::types::{dims, Coord};

    fn chw() -> NamedTensor<f64> {
        let data = DenseND::from_vec((0..24).map(|v| v as f64).collect(), &[2, 3, 4]).unwrap();
        NamedTensor::with_dims(data, [Some("C"), Some("H"), None])
            .unwrap()
            .with_coords(vec![Some(Coord::from(vec!["a", "b"])), None, None])
            .unwrap()
    }

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[2, 1, 4], &[3, 1]), Some(vec![2, 3, 4]));
        assert_eq!(broadcast_shape(&[], &[5]), Some(vec![5]));
        assert_eq!(broadcast_shape(&[2, 3], &[4]), None);
    }

    #[test]
    fn test_permutation_well_defined() {
        assert!(permutation_well_defined(&[Some(1), None, Some(0)], Some(2)));
        assert!(!permutation_well_defined(&[Some(1), Some(1)], None));
        assert!(!permutation_well_defined(&[Some(0), None], Some(2)));
        assert!(!permutation_well_defined(&[Some(0), Some(2)], Some(2)));
        assert!(permutation_well_defined(&[Some(5)], None));
    }

    #[test]
    fn test_permute_with_sentinels() {
        let x = chw();
        let y = permute(&x, &[None, Some(2), Some(0), None, Some(1)]).unwrap();
        assert_eq!(y.shape(), &[1, 4, 2, 1, 3]);
        assert_eq!(y.dims(), &dims([None, None, Some("C"), None, Some("H")])[..]);
        assert_eq!(y.coord(2), Some(&Coord::from(vec!["a", "b"])));
        // y[0, w, c, 0, h] == x[c, h, w]
        assert_eq!(y.data()[&[0, 3, 1, 0, 2]], x.data()[&[1, 2, 3]]);
    }

    #[test]
    fn test_permute_rejects_bad_permutations() {
        let x = chw();
        assert!(matches!(
            permute(&x, &[Some(0), Some(1)]),
            Err(NamedTensorError::InvalidPermutation { .. })
        ));
        assert!(permute(&x, &[Some(0), Some(0), Some(1), Some(2)]).is_err());
        assert!(permute(&x, &[Some(0), Some(1), Some(3)]).is_err());
    }

    #[test]
    fn test_permute_identity_shares_data() {
        let x = chw();
        let y = permute(&x, &[Some(0), Some(1), Some(2)]).unwrap();
        assert!(y.shares_data(&x));
    }

    #[test]
    fn test_pad_and_align() {
        let x = chw();
        let right = pad_singleton(&x, 2, Position::Right).unwrap();
        assert_eq!(right.shape(), &[2, 3, 4, 1, 1]);
        assert_eq!(right.dim(0), Some("C"));

        let small = NamedTensor::new(DenseND::<f64>::zeros(&[4]));
        let (a, b) = align_rank(&x, &small).unwrap();
        assert_eq!(a.shape(), &[2, 3, 4]);
        assert_eq!(b.shape(), &[1, 1, 4]);
        assert!(a.shares_data(&x));

        let (c, d) = align_rank(&small, &x).unwrap();
        assert_eq!(c.shape(), &[1, 1, 4]);
        assert_eq!(d.shape(), &[2, 3, 4]);
    }

    #[test]
    fn test_strip() {
        let parts = strip(&[10, 20, 30], &[0, 2]);
        assert_eq!(parts.remaining, vec![20]);
        assert_eq!(parts.stripped, vec![10, 30]);
        assert_eq!(strip_remaining(&[10, 20, 30], &[]), vec![10, 20, 30]);
    }

    #[test]
    fn test_inverse_permutation() {
        let p = vec![2, 0, 1];
        let inv = inverse_permutation(&p).unwrap();
        assert_eq!(inv, vec![1, 2, 0]);
        assert_eq!(inverse_permutation(&inv).unwrap(), p);
    }

    #[test]
    fn test_inverse_permutation_rejects_non_permutations() {
        assert!(matches!(
            inverse_permutation(&[0, 3, 1]),
            Err(NamedTensorError::InvalidPermutation { rank: 3, .. })
        ));
        assert!(matches!(
            inverse_permutation(&[1, 1]),
            Err(NamedTensorError::InvalidPermutation { .. })
        ));
        assert_eq!(inverse_permutation(&[]).unwrap(), Vec::<usize>::new());
    }
}
