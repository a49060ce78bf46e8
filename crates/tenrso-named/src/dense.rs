//! Dense N-dimensional storage backing named tensors
//!
//! `DenseND<T>` is the engine under [`NamedTensor`](crate::NamedTensor): it owns
//! the elements and knows nothing about dimension names or coordinates. The
//! named layer only ever asks it for the structural operations listed here
//! (permute, reshape, gather along an axis, broadcasting zips and lane
//! reductions).
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.
//! Direct use of `ndarray` or `num_traits` is forbidden per SCIRS2_INTEGRATION_POLICY.md

use scirs2_core::ndarray_ext::{Array, ArrayView, ArrayView1, Axis, IxDyn, Zip};
use scirs2_core::numeric::Num;
use std::fmt;

use crate::axes::broadcast_shape;

/// Dense N-dimensional tensor backed by scirs2_core's ndarray
///
/// # Examples
///
/// ```
/// use tenrso_named::DenseND;
///
/// let tensor = DenseND::<f64>::zeros(&[2, 3, 4]);
/// assert_eq!(tensor.shape(), &[2, 3, 4]);
/// assert_eq!(tensor.rank(), 3);
/// ```
#[derive(Clone, PartialEq)]
pub struct DenseND<T> {
    /// Underlying ndarray storage (via scirs2_core)
    pub(crate) data: Array<T, IxDyn>,
}

impl<T> DenseND<T> {
    /// Create a tensor from an existing ndarray
    ///
    /// ```
    /// use scirs2_core::ndarray_ext::Array;
    /// use tenrso_named::DenseND;
    ///
    /// let arr = Array::<f64, _>::zeros(vec![2, 3]);
    /// let tensor = DenseND::from_array(arr);
    /// assert_eq!(tensor.shape(), &[2, 3]);
    /// ```
    pub fn from_array(array: Array<T, IxDyn>) -> Self {
        Self { data: array }
    }

    /// Create a tensor from a vector with given shape (row-major order)
    ///
    /// ```
    /// use tenrso_named::DenseND;
    ///
    /// let tensor = DenseND::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(tensor[&[1, 0]], 4.0);
    /// ```
    pub fn from_vec(vec: Vec<T>, shape: &[usize]) -> anyhow::Result<Self> {
        let total: usize = shape.iter().product();
        if vec.len() != total {
            anyhow::bail!(
                "Shape {:?} requires {} elements, but got {}",
                shape,
                total,
                vec.len()
            );
        }
        let array = Array::from_shape_vec(IxDyn(shape), vec)?;
        Ok(Self { data: array })
    }

    /// Rank-0 tensor holding a single value
    pub fn scalar(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            data: Array::from_elem(IxDyn(&[]), value),
        }
    }

    /// Get the rank (number of dimensions) of this tensor
    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    /// Get the shape of this tensor
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_array(&self) -> &Array<T, IxDyn> {
        &self.data
    }

    pub fn into_array(self) -> Array<T, IxDyn> {
        self.data
    }

    pub fn view(&self) -> ArrayView<'_, T, IxDyn> {
        self.data.view()
    }

    /// Iterate over elements in logical row-major order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Element at `index`, or `None` when out of bounds or of wrong rank
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.rank() {
            return None;
        }
        if index.iter().zip(self.shape()).any(|(&i, &n)| i >= n) {
            return None;
        }
        Some(&self.data[IxDyn(index)])
    }

    /// Apply `f` to every element, keeping the shape
    pub fn map<U, F>(&self, f: F) -> DenseND<U>
    where
        F: FnMut(&T) -> U,
    {
        DenseND {
            data: self.data.map(f),
        }
    }

    /// Permute the axes of the tensor
    ///
    /// ```
    /// use tenrso_named::DenseND;
    ///
    /// let tensor = DenseND::<f64>::zeros(&[2, 3, 4]);
    /// let permuted = tensor.permute(&[2, 0, 1]).unwrap();
    /// assert_eq!(permuted.shape(), &[4, 2, 3]);
    /// ```
    pub fn permute(&self, axes: &[usize]) -> anyhow::Result<Self>
    where
        T: Clone,
    {
        if axes.len() != self.rank() {
            anyhow::bail!(
                "Permutation axes length ({}) must match tensor rank ({})",
                axes.len(),
                self.rank()
            );
        }

        let mut sorted = axes.to_vec();
        sorted.sort_unstable();
        if sorted.iter().enumerate().any(|(i, &ax)| ax != i) {
            anyhow::bail!("Invalid permutation: {:?}", axes);
        }

        Ok(Self {
            data: self.data.clone().permuted_axes(IxDyn(axes)),
        })
    }

    /// Reshape the tensor to a new shape with the same number of elements
    ///
    /// Elements keep their logical row-major order.
    pub fn reshape(&self, new_shape: &[usize]) -> anyhow::Result<Self>
    where
        T: Clone,
    {
        let new_size: usize = new_shape.iter().product();
        let old_size = self.len();

        if new_size != old_size {
            anyhow::bail!(
                "Cannot reshape tensor of size {} into shape {:?} (size {})",
                old_size,
                new_shape,
                new_size
            );
        }

        if let Ok(reshaped) = self.data.view().into_shape_with_order(IxDyn(new_shape)) {
            Ok(Self {
                data: reshaped.to_owned(),
            })
        } else {
            // Not contiguous: copy in logical order
            let flat: Vec<T> = self.data.iter().cloned().collect();
            Ok(Self {
                data: Array::from_shape_vec(IxDyn(new_shape), flat)?,
            })
        }
    }

    /// Insert a singleton axis at position `axis`
    ///
    /// ```
    /// use tenrso_named::DenseND;
    ///
    /// let tensor = DenseND::<f64>::zeros(&[2, 3]);
    /// assert_eq!(tensor.insert_axis(1).unwrap().shape(), &[2, 1, 3]);
    /// assert_eq!(tensor.insert_axis(2).unwrap().shape(), &[2, 3, 1]);
    /// ```
    pub fn insert_axis(&self, axis: usize) -> anyhow::Result<Self>
    where
        T: Clone,
    {
        if axis > self.rank() {
            anyhow::bail!(
                "Axis {} out of bounds for insert_axis (max {})",
                axis,
                self.rank()
            );
        }
        Ok(Self {
            data: self.data.clone().insert_axis(Axis(axis)),
        })
    }

    /// Drop `axis` by taking position `index` along it
    pub fn index_axis(&self, axis: usize, index: usize) -> anyhow::Result<Self>
    where
        T: Clone,
    {
        self.check_axis(axis)?;
        if index >= self.shape()[axis] {
            anyhow::bail!(
                "Index {} out of bounds for axis {} of size {}",
                index,
                axis,
                self.shape()[axis]
            );
        }
        Ok(Self {
            data: self.data.index_axis(Axis(axis), index).to_owned(),
        })
    }

    /// Gather positions `indices` along `axis`
    ///
    /// ```
    /// use tenrso_named::DenseND;
    ///
    /// let t = DenseND::from_vec(vec![1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
    /// let picked = t.select_axis(1, &[2, 0]).unwrap();
    /// assert_eq!(picked.shape(), &[2, 2]);
    /// assert_eq!(picked[&[1, 0]], 6);
    /// ```
    pub fn select_axis(&self, axis: usize, indices: &[usize]) -> anyhow::Result<Self>
    where
        T: Clone,
    {
        self.check_axis(axis)?;
        let size = self.shape()[axis];
        if let Some(&bad) = indices.iter().find(|&&i| i >= size) {
            anyhow::bail!(
                "Index {} out of bounds for axis {} of size {}",
                bad,
                axis,
                size
            );
        }
        Ok(Self {
            data: self.data.select(Axis(axis), indices),
        })
    }

    /// Combine two tensors elementwise under NumPy broadcasting rules
    ///
    /// ```
    /// use tenrso_named::DenseND;
    ///
    /// let a = DenseND::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
    /// let b = DenseND::from_vec(vec![10.0, 20.0], &[2, 1]).unwrap();
    /// let c = a.zip_with(&b, |x, y| x + y).unwrap();
    /// assert_eq!(c.shape(), &[2, 3]);
    /// assert_eq!(c[&[1, 2]], 23.0);
    /// ```
    pub fn zip_with<U, V, F>(&self, other: &DenseND<U>, mut f: F) -> anyhow::Result<DenseND<V>>
    where
        F: FnMut(&T, &U) -> V,
    {
        let shape = broadcast_shape(self.shape(), other.shape()).ok_or_else(|| {
            anyhow::anyhow!(
                "Shapes {:?} and {:?} are not broadcastable",
                self.shape(),
                other.shape()
            )
        })?;
        let lhs = self
            .data
            .broadcast(IxDyn(&shape))
            .ok_or_else(|| anyhow::anyhow!("Cannot broadcast {:?} to {:?}", self.shape(), shape))?;
        let rhs = other
            .data
            .broadcast(IxDyn(&shape))
            .ok_or_else(|| anyhow::anyhow!("Cannot broadcast {:?} to {:?}", other.shape(), shape))?;

        Ok(DenseND {
            data: Zip::from(lhs).and(rhs).map_collect(|a, b| f(a, b)),
        })
    }

    /// Reduce over `axes` with a lane function.
    ///
    /// The reduced axes are moved last and flattened, so `f` sees every
    /// element of one output cell as a single 1-D lane. The result keeps
    /// the remaining axes in their original order.
    pub fn reduce_axes<U, F>(&self, axes: &[usize], mut f: F) -> anyhow::Result<DenseND<U>>
    where
        T: Clone,
        F: FnMut(ArrayView1<'_, T>) -> U,
    {
        for &axis in axes {
            self.check_axis(axis)?;
        }
        let kept: Vec<usize> = (0..self.rank()).filter(|a| !axes.contains(a)).collect();
        if kept.len() + axes.len() != self.rank() {
            anyhow::bail!("Duplicate axes in reduction: {:?}", axes);
        }

        let order: Vec<usize> = kept.iter().chain(axes.iter()).copied().collect();
        let mut flat_shape: Vec<usize> = kept.iter().map(|&a| self.shape()[a]).collect();
        let lane_len: usize = axes.iter().map(|&a| self.shape()[a]).product();
        flat_shape.push(lane_len);

        let flat = self.permute(&order)?.reshape(&flat_shape)?;
        let last = flat.rank() - 1;
        Ok(DenseND {
            data: flat.data.map_axis(Axis(last), |lane| f(lane)),
        })
    }

    /// Transform every lane along `axis` in place of a copy
    pub fn map_lanes<F>(&self, axis: usize, mut f: F) -> anyhow::Result<Self>
    where
        T: Clone,
        F: FnMut(&mut [T]),
    {
        self.check_axis(axis)?;
        let mut data = self.data.clone();
        for mut lane in data.lanes_mut(Axis(axis)) {
            let mut buf: Vec<T> = lane.iter().cloned().collect();
            f(&mut buf);
            for (dst, src) in lane.iter_mut().zip(buf) {
                *dst = src;
            }
        }
        Ok(Self { data })
    }

    fn check_axis(&self, axis: usize) -> anyhow::Result<()> {
        if axis >= self.rank() {
            anyhow::bail!(
                "Axis {} out of bounds for tensor of rank {}",
                axis,
                self.rank()
            );
        }
        Ok(())
    }
}

impl<T> DenseND<T>
where
    T: Clone + Num,
{
    /// Create a tensor filled with a specific value
    pub fn from_elem(shape: &[usize], value: T) -> Self {
        Self {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize]) -> Self {
        Self::from_elem(shape, T::zero())
    }

    /// Create a tensor filled with ones
    pub fn ones(shape: &[usize]) -> Self {
        Self::from_elem(shape, T::one())
    }
}

impl<T> std::ops::Index<&[usize]> for DenseND<T> {
    type Output = T;

    fn index(&self, index: &[usize]) -> &Self::Output {
        &self.data[IxDyn(index)]
    }
}

impl<T: fmt::Debug> fmt::Debug for DenseND<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseND")
            .field("shape", &self.shape())
            .field("rank", &self.rank())
            .field("data", &self.data)
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for DenseND<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_zeros() {
        let tensor = DenseND::<f64>::zeros(&[2, 3, 4]);
        assert_eq!(tensor.shape(), &[2, 3, 4]);
        assert_eq!(tensor.rank(), 3);
        assert_eq!(tensor.len(), 24);
        assert_eq!(tensor[&[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_scalar() {
        let s = DenseND::scalar(7.5);
        assert_eq!(s.rank(), 0);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&[]), Some(&7.5));
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        assert!(DenseND::from_vec(vec![1.0, 2.0, 3.0], &[2, 2]).is_err());
    }

    #[test]
    fn test_permute_moves_values() {
        let t = DenseND::from_vec((0..6).collect(), &[2, 3]).unwrap();
        let p = t.permute(&[1, 0]).unwrap();
        assert_eq!(p.shape(), &[3, 2]);
        assert_eq!(p[&[2, 1]], 5);
        assert_eq!(p[&[1, 0]], 1);
        assert!(t.permute(&[0, 0]).is_err());
        assert!(t.permute(&[0]).is_err());
    }

    #[test]
    fn test_reshape_after_permute_keeps_logical_order() {
        let t = DenseND::from_vec((0..6).collect(), &[2, 3]).unwrap();
        let flat = t.permute(&[1, 0]).unwrap().reshape(&[6]).unwrap();
        let values: Vec<i32> = flat.iter().copied().collect();
        assert_eq!(values, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_index_and_select_axis() {
        let t = DenseND::from_vec((0..6).collect(), &[2, 3]).unwrap();
        let row = t.index_axis(0, 1).unwrap();
        assert_eq!(row.shape(), &[3]);
        assert_eq!(row[&[0]], 3);
        assert!(t.index_axis(0, 2).is_err());

        let cols = t.select_axis(1, &[1, 1]).unwrap();
        assert_eq!(cols.shape(), &[2, 2]);
        assert_eq!(cols[&[1, 1]], 4);
        assert!(t.select_axis(1, &[3]).is_err());
    }

    #[test]
    fn test_zip_with_broadcasts() {
        let a = DenseND::from_vec(vec![1.0, 2.0], &[2, 1]).unwrap();
        let b = DenseND::from_vec(vec![10.0, 20.0, 30.0], &[1, 3]).unwrap();
        let c = a.zip_with(&b, |x, y| x * y).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_eq!(c[&[1, 2]], 60.0);

        let bad = DenseND::<f64>::zeros(&[4]);
        assert!(a.zip_with(&bad, |x, y| x + y).is_err());
    }

    #[test]
    fn test_reduce_axes() {
        let t = DenseND::from_vec((1..=24).map(|v| v as f64).collect(), &[2, 3, 4]).unwrap();
        let sums = t.reduce_axes(&[0, 2], |lane| lane.sum()).unwrap();
        assert_eq!(sums.shape(), &[3]);
        // axis-1 slice 0 holds 1..=4 and 13..=16
        assert_eq!(sums[&[0]], 10.0 + 58.0);

        let all = t.reduce_axes(&[0, 1, 2], |lane| lane.len()).unwrap();
        assert_eq!(all.rank(), 0);
        assert_eq!(all.get(&[]), Some(&24));

        assert!(t.reduce_axes(&[1, 1], |lane| lane.len()).is_err());
    }

    #[test]
    fn test_map_lanes() {
        let t = DenseND::from_vec(vec![1, 2, 3, 4], &[2, 2]).unwrap();
        let r = t.map_lanes(1, |lane| lane.reverse()).unwrap();
        assert_eq!(r[&[0, 0]], 2);
        assert_eq!(r[&[1, 1]], 3);
    }
}
