//! Core type definitions for named tensors.
//!
//! This module defines the vocabulary shared by every other module:
//!
//! - Type aliases for shapes and ranks ([`Rank`], [`Shape`])
//! - Dimension names ([`Dim`], [`Dims`]) and axis selectors ([`DimSelector`])
//! - Coordinates ([`Coord`], [`Coords`]) attached to axes
//! - Generalized permutations ([`AxesPermutation`])
//! - Small configuration values ([`Position`], [`AxisSlice`], [`Tolerance`])
//!
//! # Examples
//!
//! ```
//! use tenrso_named::types::{dims, format_dims, named};
//!
//! let d = dims([None, Some("C"), Some("H"), Some("W")]);
//! assert_eq!(format_dims(&d), "(None, C, H, W)");
//! assert_eq!(named(["H", "W"]), dims([Some("H"), Some("W")]));
//! ```

use smallvec::SmallVec;
use std::fmt;

/// Type alias for tensor rank (number of axes).
pub type Rank = usize;

/// Shape type using SmallVec to avoid heap allocation for common cases.
///
/// Named tensors rarely exceed six axes; higher ranks spill to the heap.
pub type Shape = SmallVec<[usize; 6]>;

/// Name of a single axis. `None` marks an unnamed axis.
pub type Dim = Option<String>;

/// Ordered axis names of a tensor, one entry per axis.
pub type Dims = Vec<Dim>;

/// Per-axis coordinates of a tensor. `None` marks an axis without coordinates.
pub type Coords = Vec<Option<Coord>>;

/// Generalized axes permutation.
///
/// `Some(i)` takes source axis `i`; `None` inserts a new singleton axis.
pub type AxesPermutation = Vec<Option<usize>>;

/// Build a [`Dims`] tuple from optional names.
pub fn dims<I, S>(names: I) -> Dims
where
    I: IntoIterator<Item = Option<S>>,
    S: Into<String>,
{
    names.into_iter().map(|n| n.map(Into::into)).collect()
}

/// Build a fully named [`Dims`] tuple.
pub fn named<I, S>(names: I) -> Dims
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(|n| Some(n.into())).collect()
}

/// Render a dims tuple as `(None, C, H)`.
pub fn format_dims(dims: &[Dim]) -> String {
    let parts: Vec<&str> = dims
        .iter()
        .map(|d| d.as_deref().unwrap_or("None"))
        .collect();
    format!("({})", parts.join(", "))
}

/// Selector resolving to a single axis of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DimSelector {
    /// Positional index; negative values count from the end
    Index(isize),
    /// Exact dimension name
    Name(String),
    /// Name lookup with a positional fallback when the name is absent
    NameOr(String, isize),
}

impl DimSelector {
    /// Name lookup that falls back to `index` when `name` is absent.
    pub fn name_or(name: impl Into<String>, index: isize) -> Self {
        DimSelector::NameOr(name.into(), index)
    }
}

impl fmt::Display for DimSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimSelector::Index(i) => write!(f, "{}", i),
            DimSelector::Name(n) => write!(f, "{}", n),
            DimSelector::NameOr(n, i) => write!(f, "{} (or {})", n, i),
        }
    }
}

impl From<&str> for DimSelector {
    fn from(name: &str) -> Self {
        DimSelector::Name(name.to_string())
    }
}

impl From<String> for DimSelector {
    fn from(name: String) -> Self {
        DimSelector::Name(name)
    }
}

impl From<&String> for DimSelector {
    fn from(name: &String) -> Self {
        DimSelector::Name(name.clone())
    }
}

impl From<isize> for DimSelector {
    fn from(index: isize) -> Self {
        DimSelector::Index(index)
    }
}

impl From<i32> for DimSelector {
    fn from(index: i32) -> Self {
        DimSelector::Index(index as isize)
    }
}

impl From<usize> for DimSelector {
    fn from(index: usize) -> Self {
        DimSelector::Index(index as isize)
    }
}

impl From<&DimSelector> for DimSelector {
    fn from(selector: &DimSelector) -> Self {
        selector.clone()
    }
}

/// Collect heterogeneous selector inputs into a `Vec<DimSelector>`.
///
/// ```
/// use tenrso_named::types::{selectors, DimSelector};
///
/// let s = selectors(["H", "W"]);
/// assert_eq!(s, vec![DimSelector::Name("H".into()), DimSelector::Name("W".into())]);
/// ```
pub fn selectors<I, S>(items: I) -> Vec<DimSelector>
where
    I: IntoIterator<Item = S>,
    S: Into<DimSelector>,
{
    items.into_iter().map(Into::into).collect()
}

/// Coordinate values attached to one axis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Coord {
    /// Numeric coordinates (compared with a tolerance)
    Numeric(Vec<f64>),
    /// Label coordinates (compared exactly)
    Labels(Vec<String>),
}

/// A single coordinate value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoordValue {
    Number(f64),
    Label(String),
}

impl fmt::Display for CoordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordValue::Number(v) => write!(f, "{}", v),
            CoordValue::Label(l) => write!(f, "{}", l),
        }
    }
}

impl Coord {
    /// Number of coordinate values
    pub fn len(&self) -> usize {
        match self {
            Coord::Numeric(v) => v.len(),
            Coord::Labels(v) => v.len(),
        }
    }

    /// Check if the coordinate has no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at position `index`, if in range
    pub fn value(&self, index: usize) -> Option<CoordValue> {
        match self {
            Coord::Numeric(v) => v.get(index).copied().map(CoordValue::Number),
            Coord::Labels(v) => v.get(index).cloned().map(CoordValue::Label),
        }
    }

    /// Gather the values at `indices` into a new coordinate.
    ///
    /// Indices must be in range.
    pub fn select(&self, indices: &[usize]) -> Coord {
        match self {
            Coord::Numeric(v) => Coord::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Coord::Labels(v) => Coord::Labels(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Coord::Numeric(_) => "numeric",
            Coord::Labels(_) => "labels",
        }
    }
}

impl From<Vec<f64>> for Coord {
    fn from(values: Vec<f64>) -> Self {
        Coord::Numeric(values)
    }
}

impl From<Vec<String>> for Coord {
    fn from(labels: Vec<String>) -> Self {
        Coord::Labels(labels)
    }
}

impl From<Vec<&str>> for Coord {
    fn from(labels: Vec<&str>) -> Self {
        Coord::Labels(labels.into_iter().map(String::from).collect())
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.len();
        let show = |f: &mut fmt::Formatter<'_>, i: usize| match self.value(i) {
            Some(v) => write!(f, "{}", v),
            None => Ok(()),
        };
        write!(f, "[")?;
        if n <= 6 {
            for i in 0..n {
                if i > 0 {
                    write!(f, ", ")?;
                }
                show(f, i)?;
            }
        } else {
            for i in 0..3 {
                show(f, i)?;
                write!(f, ", ")?;
            }
            write!(f, "...")?;
            for i in n - 3..n {
                write!(f, ", ")?;
                show(f, i)?;
            }
        }
        write!(f, "] ({} {})", n, self.kind())
    }
}

/// Side of a dims tuple that new or moved axes go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Position {
    /// Prepend
    #[default]
    Left,
    /// Append
    Right,
}

/// Half-open range along one axis with a positive step.
///
/// `start` and `end` follow the usual negative-from-the-end convention and
/// are clamped to the axis. A step of zero is treated as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSlice {
    pub start: isize,
    pub end: Option<isize>,
    pub step: usize,
}

impl AxisSlice {
    pub fn new(start: isize, end: Option<isize>) -> Self {
        Self {
            start,
            end,
            step: 1,
        }
    }

    /// The whole axis
    pub fn full() -> Self {
        Self::new(0, None)
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    /// Positions selected on an axis of length `len`
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let clamp = |v: isize| -> usize {
            let v = if v < 0 { v + len as isize } else { v };
            v.clamp(0, len as isize) as usize
        };
        let start = clamp(self.start);
        let end = self.end.map_or(len, clamp);
        (start..end.max(start)).step_by(self.step.max(1)).collect()
    }
}

impl From<std::ops::Range<isize>> for AxisSlice {
    fn from(range: std::ops::Range<isize>) -> Self {
        AxisSlice::new(range.start, Some(range.end))
    }
}

/// Tolerances for comparing numeric coordinates.
///
/// Two values `a`, `b` are close when `|a - b| <= atol + rtol * |b|`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-8,
        }
    }
}

impl Tolerance {
    /// Exact comparison
    pub fn exact() -> Self {
        Self {
            rtol: 0.0,
            atol: 0.0,
        }
    }

    pub fn with_rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// Check whether `a` is close to `b`
    pub fn close(&self, a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        (a - b).abs() <= self.atol + self.rtol * b.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims_helpers() {
        let d = dims([None, Some("C")]);
        assert_eq!(d, vec![None, Some("C".to_string())]);
        assert_eq!(format_dims(&d), "(None, C)");
        assert_eq!(format_dims(&[]), "()");
    }

    #[test]
    fn test_selector_conversions() {
        assert_eq!(DimSelector::from("H"), DimSelector::Name("H".into()));
        assert_eq!(DimSelector::from(-1), DimSelector::Index(-1));
        assert_eq!(DimSelector::from(2usize), DimSelector::Index(2));
        assert_eq!(
            DimSelector::name_or("C", 1),
            DimSelector::NameOr("C".into(), 1)
        );
    }

    #[test]
    fn test_axis_slice_indices() {
        assert_eq!(AxisSlice::full().indices(4), vec![0, 1, 2, 3]);
        assert_eq!(AxisSlice::new(1, Some(3)).indices(4), vec![1, 2]);
        assert_eq!(AxisSlice::new(-2, None).indices(4), vec![2, 3]);
        assert_eq!(AxisSlice::new(0, None).with_step(2).indices(5), vec![0, 2, 4]);
        assert_eq!(AxisSlice::new(3, Some(1)).indices(4), Vec::<usize>::new());
        assert_eq!(AxisSlice::new(-10, Some(10)).indices(3), vec![0, 1, 2]);
    }

    #[test]
    fn test_coord_select_and_display() {
        let c = Coord::from(vec![0.0, 0.5, 1.0]);
        assert_eq!(c.len(), 3);
        assert_eq!(c.select(&[2, 0]), Coord::Numeric(vec![1.0, 0.0]));
        assert_eq!(c.value(1), Some(CoordValue::Number(0.5)));
        assert_eq!(c.value(3), None);

        let labels = Coord::from(vec!["a", "b"]);
        assert_eq!(labels.to_string(), "[a, b] (2 labels)");

        let long = Coord::from((0..10).map(|i| i as f64).collect::<Vec<_>>());
        assert_eq!(long.to_string(), "[0, 1, 2, ..., 7, 8, 9] (10 numeric)");
    }

    #[test]
    fn test_tolerance() {
        let tol = Tolerance::default();
        assert!(tol.close(1.0, 1.0 + 1e-9));
        assert!(!tol.close(1.0, 1.1));
        assert!(!Tolerance::exact().close(1.0, 1.0 + 1e-12));
        assert!(!tol.close(f64::NAN, f64::NAN));
    }
}
