//! Name and coordinate mergers
//!
//! After two tensors are positionally aligned their per-axis metadata is
//! combined here. A named axis absorbs an unnamed one; two different names on
//! one position are an error. Coordinates follow the same rule, with numeric
//! values compared under a [`Tolerance`].

use crate::error::{NamedTensorError, Result};
use crate::types::{format_dims, Coord, Coords, Dim, Dims, Tolerance};

/// Strategy combining the metadata of two aligned tensors
pub trait MetadataMerger {
    fn merge_dims(&self, a: &[Dim], b: &[Dim]) -> Result<Dims> {
        merge_dims(a, b)
    }

    fn merge_coords(&self, a: &[Option<Coord>], b: &[Option<Coord>]) -> Result<Coords>;
}

/// Merger used by every built-in broadcaster
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DefaultMerger {
    pub tolerance: Tolerance,
}

impl DefaultMerger {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }
}

impl MetadataMerger for DefaultMerger {
    fn merge_coords(&self, a: &[Option<Coord>], b: &[Option<Coord>]) -> Result<Coords> {
        merge_coords(a, b, self.tolerance)
    }
}

/// Left-pad the shorter of two per-axis lists with `None`, longer list first
fn pad_pair<'a, T: Clone>(a: &'a [Option<T>], b: &'a [Option<T>]) -> (Vec<Option<T>>, &'a [Option<T>], bool) {
    let swapped = a.len() < b.len();
    let (long, short) = if swapped { (b, a) } else { (a, b) };
    let padded: Vec<Option<T>> = std::iter::repeat(None)
        .take(long.len() - short.len())
        .chain(short.iter().cloned())
        .collect();
    (padded, long, swapped)
}

/// Merge two dims tuples position by position
///
/// ```
/// use tenrso_named::merge::merge_dims;
/// use tenrso_named::types::dims;
///
/// let merged = merge_dims(&dims([None, Some("C"), None]), &dims([Some("N"), None, None])).unwrap();
/// assert_eq!(merged, dims([Some("N"), Some("C"), None]));
/// assert!(merge_dims(&dims([Some("A")]), &dims([Some("B")])).is_err());
/// ```
pub fn merge_dims(a: &[Dim], b: &[Dim]) -> Result<Dims> {
    let (short, long, _) = pad_pair(a, b);
    long.iter()
        .zip(short.iter())
        .map(|pair| match pair {
            (Some(x), Some(y)) if x != y => Err(NamedTensorError::IncompatibleDimensions {
                lhs: format_dims(a),
                rhs: format_dims(b),
            }),
            (Some(x), _) => Ok(Some(x.clone())),
            (None, y) => Ok(y.clone()),
        })
        .collect()
}

/// Merge two coordinate lists position by position
///
/// Positions are counted on the longer list after left padding.
pub fn merge_coords(a: &[Option<Coord>], b: &[Option<Coord>], tolerance: Tolerance) -> Result<Coords> {
    let (short, long, swapped) = pad_pair(a, b);
    long.iter()
        .zip(short.iter())
        .enumerate()
        .map(|(axis, pair)| match pair {
            (Some(x), Some(y)) => {
                if coord_equal(x, y, tolerance) {
                    Ok(Some(x.clone()))
                } else {
                    let (lhs, rhs) = if swapped { (y, x) } else { (x, y) };
                    Err(NamedTensorError::IncompatibleCoordinates {
                        axis,
                        lhs: lhs.to_string(),
                        rhs: rhs.to_string(),
                    })
                }
            }
            (Some(x), None) => Ok(Some(x.clone())),
            (None, y) => Ok(y.clone()),
        })
        .collect()
}

/// Compare two single coordinates
///
/// Numeric values use the tolerance; labels compare exactly; different
/// kinds or lengths are unequal.
pub fn coord_equal(a: &Coord, b: &Coord, tolerance: Tolerance) -> bool {
    match (a, b) {
        (Coord::Numeric(x), Coord::Numeric(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(&u, &v)| tolerance.close(u, v))
        }
        (Coord::Labels(x), Coord::Labels(y)) => x == y,
        _ => false,
    }
}

/// Compare two coordinate lists
///
/// `None` matches `None`. `None` against a concrete coordinate matches only
/// when `none_compatible` is set. Lists of different length are unequal.
pub fn coords_equal(
    a: &[Option<Coord>],
    b: &[Option<Coord>],
    tolerance: Tolerance,
    none_compatible: bool,
) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Some(x), Some(y)) => coord_equal(x, y, tolerance),
            (None, None) => true,
            _ => none_compatible,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{dims, named};

    #[test]
    fn test_merge_dims_pads_shorter() {
        let merged = merge_dims(&named(["H", "W"]), &dims([Some("N"), None, None])).unwrap();
        assert_eq!(merged, dims([Some("N"), Some("H"), Some("W")]));

        let merged = merge_dims(&dims([Some("N"), None, None]), &named(["H", "W"])).unwrap();
        assert_eq!(merged, dims([Some("N"), Some("H"), Some("W")]));
    }

    #[test]
    fn test_merge_dims_conflict_names_both() {
        let err = merge_dims(&named(["A", "B"]), &named(["A", "C"])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("(A, B)"));
        assert!(msg.contains("(A, C)"));
    }

    #[test]
    fn test_merge_coords_tolerance() {
        let a = vec![Some(Coord::from(vec![0.0, 1.0, 2.0]))];
        let b = vec![Some(Coord::from(vec![0.0, 1.0 + 1e-12, 2.0]))];
        let merged = merge_coords(&a, &b, Tolerance::default()).unwrap();
        assert_eq!(merged, a);

        let c = vec![Some(Coord::from(vec![0.0, 1.5, 2.0]))];
        assert!(matches!(
            merge_coords(&a, &c, Tolerance::default()),
            Err(NamedTensorError::IncompatibleCoordinates { axis: 0, .. })
        ));
    }

    #[test]
    fn test_merge_coords_carries_one_sided() {
        let a = vec![Some(Coord::from(vec!["x", "y"])), None];
        let b = vec![Some(Coord::from(vec![1.0]))];
        let expected = vec![Some(Coord::from(vec!["x", "y"])), Some(Coord::from(vec![1.0]))];
        assert_eq!(merge_coords(&a, &b, Tolerance::default()).unwrap(), expected);
        assert_eq!(merge_coords(&b, &a, Tolerance::default()).unwrap(), expected);

        // the shorter list is right-aligned, so here both land on position 1
        let c = vec![None, Some(Coord::from(vec!["x", "y"]))];
        assert!(merge_coords(&c, &b, Tolerance::default()).is_err());
    }

    #[test]
    fn test_coords_equal() {
        let numeric = Some(Coord::from(vec![1.0, 2.0]));
        let labels = Some(Coord::from(vec!["1", "2"]));
        let tol = Tolerance::default();
        assert!(coords_equal(&[numeric.clone()], &[numeric.clone()], tol, false));
        assert!(!coords_equal(&[numeric.clone()], &[labels], tol, false));
        assert!(!coords_equal(&[numeric.clone()], &[None], tol, false));
        assert!(coords_equal(&[numeric.clone()], &[None], tol, true));
        assert!(!coords_equal(&[numeric], &[], tol, true));
    }

    #[test]
    fn test_default_merger() {
        let merger = DefaultMerger::new(Tolerance::exact());
        let a = vec![Some(Coord::from(vec![1.0]))];
        let b = vec![Some(Coord::from(vec![1.0 + 1e-12]))];
        assert!(merger.merge_coords(&a, &b).is_err());
        assert_eq!(merger.merge_dims(&named(["A"]), &[None]).unwrap(), named(["A"]));
    }
}
