//! Template broadcasting
//!
//! A [`Template`] fixes the output layout up front: an ordered list of slots,
//! each selecting an operand axis by name or by index. Every operand is
//! permuted onto the template, with singletons for the slots it lacks, and its
//! metadata is folded into an explicit [`TemplateState`] accumulator.
//!
//! Slots can be restricted to one operand through a channel number. Operand
//! `k` of [`Template::fold`] uses channel `k`; the two operands of
//! [`TemplateBroadcaster`] use channels 0 and 1.
//!
//! ```
//! use tenrso_named::template::{Template, TemplateSlot};
//! use tenrso_named::{DenseND, NamedTensor};
//!
//! let template = Template::new(vec![
//!     TemplateSlot::named("N"),
//!     TemplateSlot::named("T"),
//!     TemplateSlot::named("C"),
//! ])
//! .unwrap();
//!
//! let x = NamedTensor::with_dims(DenseND::<f64>::zeros(&[3, 5]), [Some("C"), Some("T")]).unwrap();
//! let w = NamedTensor::with_dims(DenseND::<f64>::zeros(&[3]), [Some("C")]).unwrap();
//! let (cast, state) = template.fold([&x, &w]).unwrap();
//! assert_eq!(cast[0].shape(), &[1, 5, 3]);
//! assert_eq!(cast[1].shape(), &[1, 1, 3]);
//! assert_eq!(state.shape, vec![1, 5, 3]);
//! ```

use tracing::trace;

use crate::axes::{self, permutation_well_defined};
use crate::broadcast::{drop_stretched_coords, BroadcastPolicy, Broadcasted};
use crate::error::{NamedTensorError, Result};
use crate::merge::{merge_coords, merge_dims};
use crate::tensor::{find_dim, normalize_axis, NamedTensor};
use crate::types::{format_dims, AxesPermutation, Coords, Dim, Dims, Tolerance};

/// How a template slot picks an operand axis
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AxisSelector {
    Name(String),
    Index(isize),
}

/// One position of a template
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateSlot {
    pub selector: AxisSelector,
    /// Operand this slot applies to; `None` applies to all
    pub channel: Option<usize>,
    /// Fail instead of inserting a singleton when the axis is absent
    pub required: bool,
}

impl TemplateSlot {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            selector: AxisSelector::Name(name.into()),
            channel: None,
            required: false,
        }
    }

    pub fn indexed(index: isize) -> Self {
        Self {
            selector: AxisSelector::Index(index),
            channel: None,
            required: false,
        }
    }

    pub fn on_channel(mut self, channel: usize) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }

    fn applies_to(&self, channel: usize) -> bool {
        self.channel.map_or(true, |c| c == channel)
    }
}

/// Merged metadata of every operand cast so far
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateState {
    pub dims: Dims,
    pub coords: Coords,
    /// Broadcast shape of the operands absorbed so far
    pub shape: Vec<usize>,
}

/// Ordered slots that operands are cast onto
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    slots: Vec<TemplateSlot>,
    tolerance: Tolerance,
}

impl Template {
    /// Slot names must be unique
    pub fn new(slots: Vec<TemplateSlot>) -> Result<Self> {
        let mut seen: Vec<&str> = Vec::new();
        for slot in &slots {
            if let AxisSelector::Name(name) = &slot.selector {
                if seen.contains(&name.as_str()) {
                    return Err(NamedTensorError::DuplicateDimension(name.clone()));
                }
                seen.push(name);
            }
        }
        Ok(Self {
            slots,
            tolerance: Tolerance::default(),
        })
    }

    /// Template of optional named slots
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(TemplateSlot::named).collect())
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn slots(&self) -> &[TemplateSlot] {
        &self.slots
    }

    pub fn rank(&self) -> usize {
        self.slots.len()
    }

    /// Empty accumulator: slot names, no coordinates, all-singleton shape
    pub fn initial_state(&self) -> TemplateState {
        TemplateState {
            dims: self
                .slots
                .iter()
                .map(|slot| match &slot.selector {
                    AxisSelector::Name(name) => Some(name.clone()),
                    AxisSelector::Index(_) => None,
                })
                .collect(),
            coords: vec![None; self.rank()],
            shape: vec![1; self.rank()],
        }
    }

    /// Permutation casting an operand with `dims` onto the template
    pub fn permutation(&self, dims: &[Dim], channel: usize) -> Result<AxesPermutation> {
        let mut perm = Vec::with_capacity(self.rank());
        for slot in &self.slots {
            if !slot.applies_to(channel) {
                perm.push(None);
                continue;
            }
            let found = match &slot.selector {
                AxisSelector::Name(name) => find_dim(dims, name)?,
                AxisSelector::Index(index) => normalize_axis(*index, dims.len()),
            };
            if found.is_none() && slot.required {
                let selector = match &slot.selector {
                    AxisSelector::Name(name) => name.clone(),
                    AxisSelector::Index(index) => index.to_string(),
                };
                return Err(NamedTensorError::DimensionNotFound {
                    selector,
                    dims: format_dims(dims),
                });
            }
            perm.push(found);
        }

        if !permutation_well_defined(&perm, Some(dims.len())) {
            return Err(NamedTensorError::CastImpossible {
                target: format!("template of rank {}", self.rank()),
                subject: format_dims(dims),
                reason: format!("slots select {:?}; every axis must be selected exactly once", perm),
            });
        }
        Ok(perm)
    }

    /// Cast one operand and fold its metadata into `state`
    pub fn cast<T: Clone>(
        &self,
        state: TemplateState,
        x: &NamedTensor<T>,
        channel: usize,
    ) -> Result<(NamedTensor<T>, TemplateState)> {
        let perm = self.permutation(x.dims(), channel)?;
        let cast = axes::permute(x, &perm)?;
        trace!(channel, ?perm, "template cast");
        let state = self.absorb(state, &cast)?;
        Ok((cast, state))
    }

    /// Cast every operand, operand `k` on channel `k`
    pub fn fold<'a, T, I>(&self, operands: I) -> Result<(Vec<NamedTensor<T>>, TemplateState)>
    where
        T: Clone + 'a,
        I: IntoIterator<Item = &'a NamedTensor<T>>,
    {
        let mut state = self.initial_state();
        let mut cast = Vec::new();
        for (channel, x) in operands.into_iter().enumerate() {
            let (x1, next) = self.cast(state, x, channel)?;
            cast.push(x1);
            state = next;
        }
        Ok((cast, state))
    }

    fn absorb<T>(&self, state: TemplateState, x: &NamedTensor<T>) -> Result<TemplateState> {
        let dims = merge_dims(&state.dims, x.dims())?;
        let coords = merge_coords(
            &drop_stretched_coords(&state.coords, &state.shape, x.shape()),
            &drop_stretched_coords(x.coords(), x.shape(), &state.shape),
            self.tolerance,
        )?;
        let shape = axes::broadcast_shape(&state.shape, x.shape()).ok_or_else(|| {
            NamedTensorError::BroadcastError {
                lhs_shape: state.shape.clone(),
                lhs_dims: format_dims(&state.dims),
                rhs_shape: x.shape().to_vec(),
                rhs_dims: format_dims(x.dims()),
            }
        })?;
        Ok(TemplateState { dims, coords, shape })
    }
}

/// Two-operand broadcaster driven by a template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateBroadcaster {
    template: Template,
}

impl TemplateBroadcaster {
    pub fn new(template: Template) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

/// Broadcaster over a template of optional named slots
pub fn template_broadcast<I, S>(names: I) -> Result<TemplateBroadcaster>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Ok(TemplateBroadcaster::new(Template::from_names(names)?))
}

impl BroadcastPolicy for TemplateBroadcaster {
    fn broadcast<T: Clone, U: Clone>(
        &self,
        x: &NamedTensor<T>,
        y: &NamedTensor<U>,
    ) -> Result<Broadcasted<T, U>> {
        let state = self.template.initial_state();
        let (x1, state) = self.template.cast(state, x, 0)?;
        let (y1, state) = self.template.cast(state, y, 1)?;
        Ok(Broadcasted {
            x: x1.into_data(),
            y: y1.into_data(),
            dims: state.dims,
            coords: state.coords,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DenseND;
    use crate::types::{dims, named, Coord};

    fn tensor(shape: &[usize], names: &[Option<&str>]) -> NamedTensor<f64> {
        NamedTensor::with_dims(DenseND::zeros(shape), names.iter().copied()).unwrap()
    }

    #[test]
    fn test_duplicate_slot_names() {
        assert!(matches!(
            Template::from_names(["A", "B", "A"]),
            Err(NamedTensorError::DuplicateDimension(_))
        ));
    }

    #[test]
    fn test_missing_axis_becomes_singleton() {
        let template = Template::from_names(["N", "C", "H"]).unwrap();
        let x = tensor(&[4, 2], &[Some("H"), Some("N")]);
        assert_eq!(
            template.permutation(x.dims(), 0).unwrap(),
            vec![Some(1), None, Some(0)]
        );
    }

    #[test]
    fn test_required_slot() {
        let template = Template::new(vec![TemplateSlot::named("N").require(), TemplateSlot::named("C")]).unwrap();
        let x = tensor(&[3], &[Some("C")]);
        assert!(matches!(
            template.permutation(x.dims(), 0),
            Err(NamedTensorError::DimensionNotFound { .. })
        ));
    }

    #[test]
    fn test_uncovered_axis_is_error() {
        let template = Template::from_names(["C"]).unwrap();
        let x = tensor(&[3, 4], &[Some("C"), Some("T")]);
        assert!(matches!(
            template.permutation(x.dims(), 0),
            Err(NamedTensorError::CastImpossible { .. })
        ));
    }

    #[test]
    fn test_channels_and_index_slots() {
        let template = Template::new(vec![
            TemplateSlot::indexed(0).on_channel(0),
            TemplateSlot::named("K"),
            TemplateSlot::indexed(0).on_channel(1),
        ])
        .unwrap();
        let a = tensor(&[2, 5], &[None, Some("K")]);
        let b = tensor(&[5, 3], &[Some("K"), None]);
        // channel 1 picks index 0 of `b`, which is "K" and already taken
        assert!(template.fold([&a, &b]).is_err());

        let b = tensor(&[3, 5], &[None, Some("K")]);
        let (cast, state) = template.fold([&a, &b]).unwrap();
        assert_eq!(cast[0].shape(), &[2, 5, 1]);
        assert_eq!(cast[1].shape(), &[1, 5, 3]);
        assert_eq!(state.shape, vec![2, 5, 3]);
        assert_eq!(state.dims, dims([None, Some("K"), None]));
    }

    #[test]
    fn test_broadcaster_merges_coords() {
        let b = template_broadcast(["T", "C"]).unwrap();
        let x = tensor(&[4], &[Some("T")])
            .with_coords(vec![Some(Coord::from(vec![0.0, 1.0, 2.0, 3.0]))])
            .unwrap();
        let y = tensor(&[2], &[Some("C")])
            .with_coords(vec![Some(Coord::from(vec!["re", "im"]))])
            .unwrap();
        let out = b.broadcast(&x, &y).unwrap();
        assert_eq!(out.dims, named(["T", "C"]));
        assert_eq!(out.x.shape(), &[4, 1]);
        assert_eq!(out.y.shape(), &[1, 2]);
        assert_eq!(out.coords[0], x.coords()[0]);
        assert_eq!(out.coords[1], y.coords()[0]);
    }

    #[test]
    fn test_incompatible_sizes() {
        let b = template_broadcast(["T"]).unwrap();
        let x = tensor(&[4], &[Some("T")]);
        let y = tensor(&[3], &[Some("T")]);
        assert!(matches!(
            b.broadcast(&x, &y),
            Err(NamedTensorError::BroadcastError { .. })
        ));
    }
}
