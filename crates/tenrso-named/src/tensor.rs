//! The named tensor container
//!
//! [`NamedTensor<T>`] pairs a shared [`DenseND`] buffer with per-axis names and
//! coordinates. Cloning a tensor (or calling [`NamedTensor::view_copy`]) copies
//! the metadata but shares the buffer, so relabelling a copy never touches the
//! original.
//!
//! Invariants upheld by every constructor and setter:
//!
//! - `dims.len() == coords.len() == rank`
//! - every present coordinate has exactly as many values as its axis
//! - dimension names are unique

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::array_like::ArrayLike;
use crate::axes;
use crate::dense::DenseND;
use crate::error::{NamedTensorError, Result};
use crate::types::{format_dims, AxisSlice, Coord, Coords, Dim, DimSelector, Dims, Position, Shape};

/// Tensor with named axes and optional coordinates
///
/// # Examples
///
/// ```
/// use tenrso_named::{DenseND, NamedTensor};
///
/// let x = NamedTensor::with_dims(DenseND::<f64>::zeros(&[8, 3, 4]), [None, Some("C"), Some("W")]).unwrap();
/// assert_eq!(x.axis_of("W").unwrap(), 2);
/// assert_eq!(x.axis_of(-3).unwrap(), 0);
/// assert_eq!(x.dim(0), None);
/// ```
pub struct NamedTensor<T> {
    data: Arc<DenseND<T>>,
    dims: Dims,
    coords: Coords,
    /// name -> axis, rebuilt whenever dims change
    index: HashMap<String, usize>,
}

impl<T> Clone for NamedTensor<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            dims: self.dims.clone(),
            coords: self.coords.clone(),
            index: self.index.clone(),
        }
    }
}

/// Map a possibly negative axis index into `0..rank`
pub(crate) fn normalize_axis(index: isize, rank: usize) -> Option<usize> {
    let resolved = if index < 0 {
        index + rank as isize
    } else {
        index
    };
    (0..rank as isize).contains(&resolved).then_some(resolved as usize)
}

/// Find the axis carrying `name` in a bare dims tuple
pub(crate) fn find_dim(dims: &[Dim], name: &str) -> Result<Option<usize>> {
    let hits: Vec<usize> = dims
        .iter()
        .enumerate()
        .filter(|(_, d)| d.as_deref() == Some(name))
        .map(|(i, _)| i)
        .collect();
    match hits.as_slice() {
        [] => Ok(None),
        [axis] => Ok(Some(*axis)),
        _ => Err(NamedTensorError::AmbiguousDimension {
            name: name.to_string(),
            axes: hits,
        }),
    }
}

/// Resolve a selector against a bare dims tuple
pub(crate) fn resolve_axis(dims: &[Dim], selector: &DimSelector) -> Result<usize> {
    let rank = dims.len();
    let found = match selector {
        DimSelector::Index(i) => normalize_axis(*i, rank),
        DimSelector::Name(name) => find_dim(dims, name)?,
        DimSelector::NameOr(name, i) => match find_dim(dims, name)? {
            Some(axis) => Some(axis),
            None => normalize_axis(*i, rank),
        },
    };
    found.ok_or_else(|| NamedTensorError::DimensionNotFound {
        selector: selector.to_string(),
        dims: format_dims(dims),
    })
}

fn check_unique(dims: &[Dim]) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(dims.len());
    for (axis, name) in dims.iter().enumerate() {
        if let Some(name) = name {
            if index.insert(name.clone(), axis).is_some() {
                return Err(NamedTensorError::DuplicateDimension(name.clone()));
            }
        }
    }
    Ok(index)
}

fn check_coords(shape: &[usize], coords: &[Option<Coord>]) -> Result<()> {
    if coords.len() != shape.len() {
        return Err(NamedTensorError::ShapeMismatch(format!(
            "{} coordinates for a tensor of rank {}",
            coords.len(),
            shape.len()
        )));
    }
    for (axis, (coord, &size)) in coords.iter().zip(shape).enumerate() {
        if let Some(coord) = coord {
            if coord.len() != size {
                return Err(NamedTensorError::ShapeMismatch(format!(
                    "coordinate of length {} on axis {} of size {}",
                    coord.len(),
                    axis,
                    size
                )));
            }
        }
    }
    Ok(())
}

impl<T> NamedTensor<T> {
    /// Wrap a buffer with unnamed axes and no coordinates
    pub fn new(data: DenseND<T>) -> Self {
        let rank = data.rank();
        Self {
            data: Arc::new(data),
            dims: vec![None; rank],
            coords: vec![None; rank],
            index: HashMap::new(),
        }
    }

    /// Build a tensor from data and optional metadata, validating both
    pub fn from_parts(data: DenseND<T>, dims: Option<Dims>, coords: Option<Coords>) -> Result<Self> {
        Self::from_shared(Arc::new(data), dims, coords)
    }

    pub(crate) fn from_shared(
        data: Arc<DenseND<T>>,
        dims: Option<Dims>,
        coords: Option<Coords>,
    ) -> Result<Self> {
        let rank = data.rank();
        let dims = dims.unwrap_or_else(|| vec![None; rank]);
        if dims.len() != rank {
            return Err(NamedTensorError::ShapeMismatch(format!(
                "{} dims {} for a tensor of rank {}",
                dims.len(),
                format_dims(&dims),
                rank
            )));
        }
        let index = check_unique(&dims)?;
        let coords = coords.unwrap_or_else(|| vec![None; rank]);
        check_coords(data.shape(), &coords)?;
        Ok(Self {
            data,
            dims,
            coords,
            index,
        })
    }

    /// Wrap a buffer and name its axes
    pub fn with_dims<I, S>(data: DenseND<T>, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self::from_parts(data, Some(crate::types::dims(names)), None)
    }

    /// Replace all coordinates, consuming `self`
    pub fn with_coords(mut self, coords: Coords) -> Result<Self> {
        self.set_coords(coords)?;
        Ok(self)
    }

    /// Rank-0 tensor
    pub fn scalar(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(DenseND::scalar(value))
    }

    /// Wrap any engine array with unnamed axes
    pub fn from_array_like<A>(array: A) -> Self
    where
        A: ArrayLike<Elem = T>,
    {
        Self::new(array.into_dense())
    }

    pub fn data(&self) -> &DenseND<T> {
        &self.data
    }

    pub(crate) fn shared_data(&self) -> &Arc<DenseND<T>> {
        &self.data
    }

    /// Take the buffer out, copying only if it is still shared
    pub fn into_data(self) -> DenseND<T>
    where
        T: Clone,
    {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Check whether two tensors share one buffer
    pub fn shares_data(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn coords(&self) -> &[Option<Coord>] {
        &self.coords
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn shape_vec(&self) -> Shape {
        Shape::from_slice(self.shape())
    }

    pub fn rank(&self) -> usize {
        self.data.rank()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Name of `axis`, if any
    pub fn dim(&self, axis: usize) -> Option<&str> {
        self.dims.get(axis).and_then(|d| d.as_deref())
    }

    /// Coordinate of `axis`, if any
    pub fn coord(&self, axis: usize) -> Option<&Coord> {
        self.coords.get(axis).and_then(Option::as_ref)
    }

    /// Check whether any axis is named
    pub fn has_names(&self) -> bool {
        !self.index.is_empty()
    }

    /// Resolve one selector to an axis position
    pub fn axis_of(&self, selector: impl Into<DimSelector>) -> Result<usize> {
        let selector = selector.into();
        let found = match &selector {
            DimSelector::Index(i) => normalize_axis(*i, self.rank()),
            DimSelector::Name(name) => self.index.get(name).copied(),
            DimSelector::NameOr(name, i) => self
                .index
                .get(name)
                .copied()
                .or_else(|| normalize_axis(*i, self.rank())),
        };
        found.ok_or_else(|| NamedTensorError::DimensionNotFound {
            selector: selector.to_string(),
            dims: format_dims(&self.dims),
        })
    }

    /// Resolve several selectors; `None` selects every axis in order
    pub fn axes_of(&self, selectors: Option<&[DimSelector]>) -> Result<Vec<usize>> {
        let Some(selectors) = selectors else {
            return Ok((0..self.rank()).collect());
        };
        let mut axes = Vec::with_capacity(selectors.len());
        for selector in selectors {
            let axis = self.axis_of(selector)?;
            if axes.contains(&axis) {
                return Err(NamedTensorError::DuplicateAxis { axis });
            }
            axes.push(axis);
        }
        Ok(axes)
    }

    /// Replace all names
    pub fn set_dims(&mut self, dims: Dims) -> Result<()> {
        if dims.len() != self.rank() {
            return Err(NamedTensorError::ShapeMismatch(format!(
                "{} dims {} for a tensor of rank {}",
                dims.len(),
                format_dims(&dims),
                self.rank()
            )));
        }
        self.index = check_unique(&dims)?;
        self.dims = dims;
        Ok(())
    }

    /// Rename (or unname) the axis picked by `selector`
    pub fn set_dim(&mut self, selector: impl Into<DimSelector>, name: Option<&str>) -> Result<()> {
        let axis = self.axis_of(selector)?;
        let mut dims = self.dims.clone();
        dims[axis] = name.map(String::from);
        self.set_dims(dims)
    }

    /// Replace all coordinates
    pub fn set_coords(&mut self, coords: Coords) -> Result<()> {
        check_coords(self.shape(), &coords)?;
        self.coords = coords;
        Ok(())
    }

    /// Set (or clear) the coordinate of the axis picked by `selector`
    pub fn set_coord(&mut self, selector: impl Into<DimSelector>, coord: Option<Coord>) -> Result<()> {
        let axis = self.axis_of(selector)?;
        let mut coords = self.coords.clone();
        coords[axis] = coord;
        self.set_coords(coords)
    }

    /// Copy metadata, share data
    pub fn view_copy(&self) -> Self {
        self.clone()
    }

    /// Copy with one axis renamed
    pub fn rename(&self, selector: impl Into<DimSelector>, name: Option<&str>) -> Result<Self> {
        let mut out = self.view_copy();
        out.set_dim(selector, name)?;
        Ok(out)
    }

    /// Elementwise map keeping every piece of metadata
    pub fn map<U, F>(&self, f: F) -> NamedTensor<U>
    where
        F: FnMut(&T) -> U,
    {
        NamedTensor {
            data: Arc::new(self.data.map(f)),
            dims: self.dims.clone(),
            coords: self.coords.clone(),
            index: self.index.clone(),
        }
    }

    /// Attach this tensor's metadata to a new buffer of the same shape
    pub fn with_data<U>(&self, data: DenseND<U>) -> Result<NamedTensor<U>> {
        if data.shape() != self.shape() {
            return Err(NamedTensorError::ShapeMismatch(format!(
                "data of shape {:?} for metadata of shape {:?}",
                data.shape(),
                self.shape()
            )));
        }
        NamedTensor::from_parts(data, Some(self.dims.clone()), Some(self.coords.clone()))
    }
}

impl<T: Clone> NamedTensor<T> {
    /// Keep positions `slice` of one axis; names and coordinates follow
    ///
    /// ```
    /// use tenrso_named::{AxisSlice, DenseND, NamedTensor};
    ///
    /// let x = NamedTensor::with_dims(DenseND::<f64>::zeros(&[2, 5]), [Some("N"), Some("T")]).unwrap();
    /// let y = x.slice_on("T", AxisSlice::new(1, Some(4))).unwrap();
    /// assert_eq!(y.shape(), &[2, 3]);
    /// ```
    pub fn slice_on(&self, selector: impl Into<DimSelector>, slice: impl Into<AxisSlice>) -> Result<Self> {
        let axis = self.axis_of(selector)?;
        let slice: AxisSlice = slice.into();
        let indices = slice.indices(self.shape()[axis]);
        let data = self.data.select_axis(axis, &indices)?;
        let mut coords = self.coords.clone();
        coords[axis] = coords[axis].as_ref().map(|c| c.select(&indices));
        Self::from_parts(data, Some(self.dims.clone()), Some(coords))
    }

    /// Take one position of an axis, dropping that axis
    pub fn index_on(&self, selector: impl Into<DimSelector>, position: isize) -> Result<Self> {
        let axis = self.axis_of(selector)?;
        let size = self.shape()[axis];
        let index = normalize_axis(position, size).ok_or(NamedTensorError::IndexOutOfBounds {
            index: position,
            axis,
            size,
        })?;
        let data = self.data.index_axis(axis, index)?;
        let mut dims = self.dims.clone();
        let mut coords = self.coords.clone();
        dims.remove(axis);
        coords.remove(axis);
        Self::from_parts(data, Some(dims), Some(coords))
    }

    /// Add one singleton axis at the given side
    pub fn new_axis(&self, name: Option<&str>, position: Position) -> Result<Self> {
        self.new_axes(&[name], position)
    }

    /// Add singleton axes at the given side, in order
    pub fn new_axes(&self, names: &[Option<&str>], position: Position) -> Result<Self> {
        let padded = axes::pad_singleton(self, names.len(), position)?;
        let mut dims = padded.dims.clone();
        let offset = match position {
            Position::Left => 0,
            Position::Right => self.rank(),
        };
        for (i, name) in names.iter().enumerate() {
            dims[offset + i] = name.map(String::from);
        }
        NamedTensor::from_shared(Arc::clone(&padded.data), Some(dims), Some(padded.coords))
    }

    /// Move the selected axes to the front, keeping the others in order
    pub fn dims_first(&self, selectors: &[DimSelector]) -> Result<Self> {
        let chosen = self.axes_of(Some(selectors))?;
        let rest = (0..self.rank()).filter(|a| !chosen.contains(a));
        let order: Vec<Option<usize>> = chosen.iter().copied().chain(rest).map(Some).collect();
        axes::permute(self, &order)
    }

    /// Move the selected axes to the back, keeping the others in order
    pub fn dims_last(&self, selectors: &[DimSelector]) -> Result<Self> {
        let chosen = self.axes_of(Some(selectors))?;
        let rest = (0..self.rank()).filter(|a| !chosen.contains(a));
        let order: Vec<Option<usize>> = rest.chain(chosen.iter().copied()).map(Some).collect();
        axes::permute(self, &order)
    }
}

impl<T: PartialEq> PartialEq for NamedTensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims && self.coords == other.coords && self.data == other.data
    }
}

impl<T: fmt::Debug> fmt::Debug for NamedTensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedTensor")
            .field("shape", &self.shape())
            .field("dims", &self.dims)
            .field("coords", &self.coords)
            .field("data", &self.data)
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for NamedTensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NamedTensor")?;
        writeln!(f, "  shape: {:?}", self.shape())?;
        writeln!(f, "  dims: {}", format_dims(&self.dims))?;
        if self.coords.iter().any(Option::is_some) {
            writeln!(f, "  coords:")?;
            for (axis, coord) in self.coords.iter().enumerate() {
                let label = self.dim(axis).map_or_else(|| axis.to_string(), String::from);
                match coord {
                    Some(c) => writeln!(f, "    {}: {}", label, c)?,
                    None => writeln!(f, "    {}: None", label)?,
                }
            }
        }
        write!(f, "  data:\n{}", self.data)
    }
}

impl<T> std::ops::Neg for &NamedTensor<T>
where
    T: Clone + std::ops::Neg<Output = T>,
{
    type Output = NamedTensor<T>;

    fn neg(self) -> Self::Output {
        self.map(|v| -v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{dims, named, selectors};

    fn sample() -> NamedTensor<f64> {
        let data = DenseND::from_vec((0..24).map(|v| v as f64).collect(), &[2, 3, 4]).unwrap();
        NamedTensor::with_dims(data, [None, Some("C"), Some("W")]).unwrap()
    }

    #[test]
    fn test_new_is_unnamed() {
        let x = NamedTensor::new(DenseND::<f64>::zeros(&[2, 3]));
        assert_eq!(x.dims(), &[None, None]);
        assert_eq!(x.coords(), &[None, None]);
        assert!(!x.has_names());
    }

    #[test]
    fn test_axis_resolution() {
        let x = sample();
        assert_eq!(x.axis_of("C").unwrap(), 1);
        assert_eq!(x.axis_of(-1).unwrap(), 2);
        assert_eq!(x.axis_of(0).unwrap(), 0);
        assert_eq!(x.axis_of(DimSelector::name_or("T", -1)).unwrap(), 2);
        assert_eq!(x.axis_of(DimSelector::name_or("C", 0)).unwrap(), 1);
        assert!(matches!(
            x.axis_of("H"),
            Err(NamedTensorError::DimensionNotFound { .. })
        ));
        assert!(matches!(
            x.axis_of(3),
            Err(NamedTensorError::DimensionNotFound { .. })
        ));
        assert!(x.axis_of(-4).is_err());
    }

    #[test]
    fn test_axes_of() {
        let x = sample();
        assert_eq!(x.axes_of(None).unwrap(), vec![0, 1, 2]);
        assert_eq!(x.axes_of(Some(&selectors(["W", "C"]))).unwrap(), vec![2, 1]);
        assert!(matches!(
            x.axes_of(Some(&selectors([DimSelector::from("W"), DimSelector::from(-1)]))),
            Err(NamedTensorError::DuplicateAxis { axis: 2 })
        ));
    }

    #[test]
    fn test_find_dim_ambiguous() {
        let d = named(["A", "A"]);
        assert!(matches!(
            find_dim(&d, "A"),
            Err(NamedTensorError::AmbiguousDimension { .. })
        ));
        assert!(resolve_axis(&d, &"A".into()).is_err());
    }

    #[test]
    fn test_validation() {
        let data = DenseND::<f64>::zeros(&[2, 3]);
        assert!(matches!(
            NamedTensor::with_dims(data.clone(), [Some("A")]),
            Err(NamedTensorError::ShapeMismatch(_))
        ));
        assert!(matches!(
            NamedTensor::with_dims(data.clone(), [Some("A"), Some("A")]),
            Err(NamedTensorError::DuplicateDimension(_))
        ));
        let bad_coord = NamedTensor::new(data.clone()).with_coords(vec![Some(Coord::from(vec![1.0])), None]);
        assert!(matches!(bad_coord, Err(NamedTensorError::ShapeMismatch(_))));
        let ok = NamedTensor::new(data).with_coords(vec![Some(Coord::from(vec!["a", "b"])), None]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_view_copy_shares_data_not_metadata() {
        let x = sample();
        let mut y = x.view_copy();
        y.set_dim("C", Some("channels")).unwrap();
        assert!(x.shares_data(&y));
        assert_eq!(x.dim(1), Some("C"));
        assert_eq!(y.dim(1), Some("channels"));
        assert_eq!(y.axis_of("channels").unwrap(), 1);
        assert!(y.axis_of("C").is_err());
    }

    #[test]
    fn test_set_dims_rebuilds_index() {
        let mut x = sample();
        x.set_dims(dims([Some("N"), None, Some("C")])).unwrap();
        assert_eq!(x.axis_of("C").unwrap(), 2);
        assert_eq!(x.axis_of("N").unwrap(), 0);
        assert!(x.set_dims(named(["A", "B"])).is_err());
        // failed update leaves the tensor untouched
        assert_eq!(x.axis_of("C").unwrap(), 2);
    }

    #[test]
    fn test_slice_and_index_on() {
        let x = sample()
            .with_coords(vec![None, Some(Coord::from(vec!["r", "g", "b"])), None])
            .unwrap();
        let y = x.slice_on("C", AxisSlice::new(1, None)).unwrap();
        assert_eq!(y.shape(), &[2, 2, 4]);
        assert_eq!(y.coord(1), Some(&Coord::from(vec!["g", "b"])));
        assert_eq!(y.data()[&[0, 0, 0]], 4.0);

        let z = x.index_on("W", -1).unwrap();
        assert_eq!(z.shape(), &[2, 3]);
        assert_eq!(z.dims(), &dims([None, Some("C")])[..]);
        assert_eq!(z.data()[&[1, 2]], 23.0);
        assert!(matches!(
            x.index_on("W", 4),
            Err(NamedTensorError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_new_axis() {
        let x = sample();
        let left = x.new_axis(Some("B"), Position::Left).unwrap();
        assert_eq!(left.shape(), &[1, 2, 3, 4]);
        assert_eq!(left.axis_of("B").unwrap(), 0);
        let right = x.new_axes(&[None, Some("T")], Position::Right).unwrap();
        assert_eq!(right.shape(), &[2, 3, 4, 1, 1]);
        assert_eq!(right.axis_of("T").unwrap(), 4);
        assert!(x.new_axis(Some("C"), Position::Left).is_err());
    }

    #[test]
    fn test_dims_first_and_last() {
        let x = sample();
        let first = x.dims_first(&selectors(["W"])).unwrap();
        assert_eq!(first.dims(), &dims([Some("W"), None, Some("C")])[..]);
        assert_eq!(first.shape(), &[4, 2, 3]);
        let last = x.dims_last(&selectors([0])).unwrap();
        assert_eq!(last.dims(), &dims([Some("C"), Some("W"), None])[..]);
    }

    #[test]
    fn test_neg_and_map_keep_metadata() {
        let x = sample();
        let y = -&x;
        assert_eq!(y.dims(), x.dims());
        assert_eq!(y.data()[&[0, 0, 1]], -1.0);
        let flags = x.map(|v| *v > 10.0);
        assert_eq!(flags.dims(), x.dims());
        assert!(flags.data()[&[1, 0, 0]]);
    }

    #[test]
    fn test_display() {
        let x = NamedTensor::with_dims(DenseND::<f64>::zeros(&[2]), [Some("N")])
            .unwrap()
            .with_coords(vec![Some(Coord::from(vec![1.0, 2.0]))])
            .unwrap();
        let text = x.to_string();
        assert!(text.contains("dims: (N)"));
        assert!(text.contains("N: [1, 2] (2 numeric)"));
    }
}
