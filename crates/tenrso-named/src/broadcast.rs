//! Name-aware broadcasting
//!
//! Broadcasting two named tensors runs the same pipeline for every variant:
//!
//! 1. a [`DimCaster`] computes one permutation per tensor
//! 2. both tensors are permuted ([`axes::permute`]) and rank-aligned
//!    ([`axes::align_rank`])
//! 3. dims and coordinates are merged by a [`MetadataMerger`]
//! 4. the aligned shapes are checked against the equal-or-one rule
//!
//! The result is a [`Broadcasted`] pair of positionally aligned buffers plus
//! the merged metadata. Neither input is modified.
//!
//! [`Broadcaster`] bundles a caster, a merger and the shape-check switch behind
//! a small builder:
//!
//! ```
//! use tenrso_named::{Broadcaster, BroadcastPolicy, DenseND, NamedTensor, Tolerance};
//!
//! let img = NamedTensor::with_dims(DenseND::<f64>::zeros(&[2, 3, 8, 8]), [None, Some("C"), Some("H"), Some("W")]).unwrap();
//! let label = NamedTensor::with_dims(DenseND::<f64>::ones(&[2, 8, 8]), [None, Some("H"), Some("W")]).unwrap();
//!
//! let b = Broadcaster::unilateral()
//!     .with_tolerance(Tolerance::default().with_atol(1e-6))
//!     .broadcast(&img, &label)
//!     .unwrap();
//! assert_eq!(b.y.shape(), &[2, 1, 8, 8]);
//! ```

use tracing::debug;

use crate::axes::{self, shapes_broadcastable};
use crate::dense::DenseND;
use crate::dimcast::{DimCaster, TrivialCaster, UnilateralCaster};
use crate::error::{NamedTensorError, Result};
use crate::merge::{DefaultMerger, MetadataMerger};
use crate::tensor::NamedTensor;
use crate::types::{format_dims, Coord, Coords, Dims, Tolerance};

/// Two positionally aligned buffers with merged metadata
#[derive(Debug, Clone)]
pub struct Broadcasted<T, U> {
    pub x: DenseND<T>,
    pub y: DenseND<U>,
    pub dims: Dims,
    pub coords: Coords,
}

impl<T, U> Broadcasted<T, U> {
    /// Shape the elementwise result will have, `None` when the aligned
    /// shapes do not broadcast (only possible with the shape check disabled)
    pub fn shape(&self) -> Option<Vec<usize>> {
        axes::broadcast_shape(self.x.shape(), self.y.shape())
    }
}

/// Anything that can broadcast two named tensors
pub trait BroadcastPolicy {
    fn broadcast<T: Clone, U: Clone>(
        &self,
        x: &NamedTensor<T>,
        y: &NamedTensor<U>,
    ) -> Result<Broadcasted<T, U>>;
}

/// Coordinates of singleton axes facing a larger axis do not survive broadcasting
pub(crate) fn drop_stretched_coords(coords: &[Option<Coord>], own: &[usize], other: &[usize]) -> Coords {
    coords
        .iter()
        .zip(own.iter().zip(other))
        .map(|(c, (&n, &m))| if n == 1 && m > 1 { None } else { c.clone() })
        .collect()
}

/// Broadcast `x` with `y` through an explicit caster and merger
pub fn broadcast<T, U, C, M>(
    x: &NamedTensor<T>,
    y: &NamedTensor<U>,
    caster: &C,
    merger: &M,
    shape_check: bool,
) -> Result<Broadcasted<T, U>>
where
    T: Clone,
    U: Clone,
    C: DimCaster + ?Sized,
    M: MetadataMerger + ?Sized,
{
    let cast = caster.cast(x.dims(), y.dims())?;
    let xp = axes::permute(x, &cast.target)?;
    let yp = axes::permute(y, &cast.subject)?;
    let (xa, ya) = axes::align_rank(&xp, &yp)?;

    let dims = merger.merge_dims(xa.dims(), ya.dims())?;
    let coords = merger.merge_coords(
        &drop_stretched_coords(xa.coords(), xa.shape(), ya.shape()),
        &drop_stretched_coords(ya.coords(), ya.shape(), xa.shape()),
    )?;

    if shape_check && !shapes_broadcastable(xa.shape(), ya.shape()) {
        return Err(NamedTensorError::BroadcastError {
            lhs_shape: x.shape().to_vec(),
            lhs_dims: format_dims(x.dims()),
            rhs_shape: y.shape().to_vec(),
            rhs_dims: format_dims(y.dims()),
        });
    }

    debug!(
        lhs = ?xa.shape(),
        rhs = ?ya.shape(),
        dims = %format_dims(&dims),
        "broadcast"
    );
    Ok(Broadcasted {
        x: xa.into_data(),
        y: ya.into_data(),
        dims,
        coords,
    })
}

/// Configurable broadcaster: a caster, a merger and a shape-check switch
#[derive(Debug, Clone)]
pub struct Broadcaster<C = UnilateralCaster, M = DefaultMerger> {
    caster: C,
    merger: M,
    shape_check: bool,
}

impl Broadcaster<TrivialCaster, DefaultMerger> {
    /// Plain trailing broadcasting; names only have to agree
    pub fn vanilla() -> Self {
        Self {
            caster: TrivialCaster,
            merger: DefaultMerger::default(),
            shape_check: true,
        }
    }
}

impl Broadcaster<UnilateralCaster, DefaultMerger> {
    /// Rearrange the second operand onto the first by name
    pub fn unilateral() -> Self {
        Self {
            caster: UnilateralCaster::default(),
            merger: DefaultMerger::default(),
            shape_check: true,
        }
    }

    /// Refuse rank growth and name conflicts instead of migrating axes
    pub fn strict(mut self, strict: bool) -> Self {
        self.caster.strict = strict;
        self
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::unilateral()
    }
}

impl<C> Broadcaster<C, DefaultMerger> {
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.merger.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> Tolerance {
        self.merger.tolerance
    }
}

impl<C, M> Broadcaster<C, M> {
    /// Build from explicit parts
    pub fn from_parts(caster: C, merger: M, shape_check: bool) -> Self {
        Self {
            caster,
            merger,
            shape_check,
        }
    }

    pub fn with_shape_check(mut self, shape_check: bool) -> Self {
        self.shape_check = shape_check;
        self
    }

    pub fn with_merger<M2: MetadataMerger>(self, merger: M2) -> Broadcaster<C, M2> {
        Broadcaster {
            caster: self.caster,
            merger,
            shape_check: self.shape_check,
        }
    }

    pub fn caster(&self) -> &C {
        &self.caster
    }

    pub fn merger(&self) -> &M {
        &self.merger
    }
}

impl<C: DimCaster, M: MetadataMerger> BroadcastPolicy for Broadcaster<C, M> {
    fn broadcast<T: Clone, U: Clone>(
        &self,
        x: &NamedTensor<T>,
        y: &NamedTensor<U>,
    ) -> Result<Broadcasted<T, U>> {
        broadcast(x, y, &self.caster, &self.merger, self.shape_check)
    }
}

/// Broadcast `y` against `x` and return `y` laid out like the result
///
/// Axes that `y` lacks become singletons carrying the merged names;
/// coordinates on singleton axes are dropped.
///
/// ```
/// use tenrso_named::{broadcast::cast_onto, Broadcaster, DenseND, NamedTensor};
///
/// let x = NamedTensor::with_dims(DenseND::<f64>::zeros(&[4, 3]), [Some("T"), Some("C")]).unwrap();
/// let w = NamedTensor::with_dims(DenseND::<f64>::ones(&[3]), [Some("C")]).unwrap();
/// let cast = cast_onto(&Broadcaster::unilateral(), &x, &w).unwrap();
/// assert_eq!(cast.shape(), &[1, 3]);
/// assert_eq!(cast.dim(0), Some("T"));
/// ```
pub fn cast_onto<T, U, B>(broadcaster: &B, x: &NamedTensor<T>, y: &NamedTensor<U>) -> Result<NamedTensor<U>>
where
    T: Clone,
    U: Clone,
    B: BroadcastPolicy,
{
    let b = broadcaster.broadcast(x, y)?;
    let coords: Coords = b
        .coords
        .into_iter()
        .zip(b.y.shape())
        .map(|(c, &n)| c.filter(|c| n > 1 && c.len() == n))
        .collect();
    NamedTensor::from_parts(b.y, Some(b.dims), Some(coords))
}
