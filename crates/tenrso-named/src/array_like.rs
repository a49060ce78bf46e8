//! Engine contract and input conversion
//!
//! [`ArrayLike`] is the set of structural operations the named layer needs
//! from an n-d array engine. [`DenseND`] is the engine used throughout this
//! crate; raw `ndarray` arrays are accepted too and are converted on entry.
//!
//! [`IntoNamedTensor`] lets operations accept named tensors, engine arrays or
//! flat vectors interchangeably. Anything that is not already a named tensor is
//! wrapped with unnamed axes.

use scirs2_core::ndarray_ext::{Array, IxDyn};

use crate::dense::DenseND;
use crate::tensor::NamedTensor;
use crate::types::Shape;

/// Operations an array engine must provide to back a named tensor
pub trait ArrayLike: Sized {
    type Elem;

    fn shape(&self) -> Shape;

    fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Reorder axes; `axes` must be a permutation of `0..rank`
    fn transpose(&self, axes: &[usize]) -> anyhow::Result<Self>;

    fn reshape(&self, shape: &[usize]) -> anyhow::Result<Self>;

    /// Insert a size-1 axis at `axis`
    fn insert_axis(&self, axis: usize) -> anyhow::Result<Self>;

    /// Take position `index` along `axis`, dropping the axis
    fn index_axis(&self, axis: usize, index: usize) -> anyhow::Result<Self>;

    /// Gather positions `indices` along `axis`
    fn select_axis(&self, axis: usize, indices: &[usize]) -> anyhow::Result<Self>;

    fn map_elems<F>(&self, f: F) -> Self
    where
        F: FnMut(&Self::Elem) -> Self::Elem;

    fn into_dense(self) -> DenseND<Self::Elem>;
}

impl<T: Clone> ArrayLike for DenseND<T> {
    type Elem = T;

    fn shape(&self) -> Shape {
        Shape::from_slice(DenseND::shape(self))
    }

    fn transpose(&self, axes: &[usize]) -> anyhow::Result<Self> {
        self.permute(axes)
    }

    fn reshape(&self, shape: &[usize]) -> anyhow::Result<Self> {
        DenseND::reshape(self, shape)
    }

    fn insert_axis(&self, axis: usize) -> anyhow::Result<Self> {
        DenseND::insert_axis(self, axis)
    }

    fn index_axis(&self, axis: usize, index: usize) -> anyhow::Result<Self> {
        DenseND::index_axis(self, axis, index)
    }

    fn select_axis(&self, axis: usize, indices: &[usize]) -> anyhow::Result<Self> {
        DenseND::select_axis(self, axis, indices)
    }

    fn map_elems<F>(&self, f: F) -> Self
    where
        F: FnMut(&T) -> T,
    {
        self.map(f)
    }

    fn into_dense(self) -> DenseND<T> {
        self
    }
}

impl<T: Clone> ArrayLike for Array<T, IxDyn> {
    type Elem = T;

    fn shape(&self) -> Shape {
        Shape::from_slice(Array::shape(self))
    }

    fn transpose(&self, axes: &[usize]) -> anyhow::Result<Self> {
        Ok(DenseND::from_array(self.clone()).permute(axes)?.into_array())
    }

    fn reshape(&self, shape: &[usize]) -> anyhow::Result<Self> {
        Ok(DenseND::from_array(self.clone()).reshape(shape)?.into_array())
    }

    fn insert_axis(&self, axis: usize) -> anyhow::Result<Self> {
        Ok(DenseND::from_array(self.clone()).insert_axis(axis)?.into_array())
    }

    fn index_axis(&self, axis: usize, index: usize) -> anyhow::Result<Self> {
        Ok(DenseND::from_array(self.clone()).index_axis(axis, index)?.into_array())
    }

    fn select_axis(&self, axis: usize, indices: &[usize]) -> anyhow::Result<Self> {
        Ok(DenseND::from_array(self.clone()).select_axis(axis, indices)?.into_array())
    }

    fn map_elems<F>(&self, f: F) -> Self
    where
        F: FnMut(&T) -> T,
    {
        self.map(f)
    }

    fn into_dense(self) -> DenseND<T> {
        DenseND::from_array(self)
    }
}

/// Conversion of operation inputs into named tensors
pub trait IntoNamedTensor<T> {
    fn into_named(self) -> NamedTensor<T>;
}

impl<T> IntoNamedTensor<T> for NamedTensor<T> {
    fn into_named(self) -> NamedTensor<T> {
        self
    }
}

impl<T> IntoNamedTensor<T> for &NamedTensor<T> {
    fn into_named(self) -> NamedTensor<T> {
        self.view_copy()
    }
}

impl<T> IntoNamedTensor<T> for DenseND<T> {
    fn into_named(self) -> NamedTensor<T> {
        NamedTensor::new(self)
    }
}

impl<T> IntoNamedTensor<T> for Array<T, IxDyn> {
    fn into_named(self) -> NamedTensor<T> {
        NamedTensor::new(DenseND::from_array(self))
    }
}

impl<T> IntoNamedTensor<T> for Vec<T> {
    fn into_named(self) -> NamedTensor<T> {
        NamedTensor::new(DenseND::from_array(Array::from_vec(self).into_dyn()))
    }
}
