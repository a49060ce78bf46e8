//! Dimension casters
//!
//! A caster decides which axis of one tensor corresponds to which axis of
//! another, producing a pair of generalized permutations ([`DimCast`]) that
//! bring both tensors into positional alignment.
//!
//! - [`TrivialCaster`] keeps both tensors as they are and leaves alignment to
//!   plain trailing broadcasting.
//! - [`UnilateralCaster`] keeps the target fixed and rearranges the subject
//!   onto it by name first and by trailing position second (see [`cast_dim`]).
//!
//! # Examples
//!
//! ```
//! use tenrso_named::dimcast::cast_dim;
//! use tenrso_named::types::dims;
//!
//! // image (None, C, H, W) against label (None, H, W)
//! let cast = cast_dim(
//!     &dims([None, Some("C"), Some("H"), Some("W")]),
//!     &dims([None, Some("H"), Some("W")]),
//!     false,
//! )
//! .unwrap();
//! assert_eq!(cast.target, vec![Some(0), Some(1), Some(2), Some(3)]);
//! assert_eq!(cast.subject, vec![Some(0), None, Some(1), Some(2)]);
//! ```

use tracing::{debug, trace};

use crate::error::{NamedTensorError, Result};
use crate::tensor::find_dim;
use crate::types::{format_dims, AxesPermutation, Dim};

/// Pair of permutations aligning a target and a subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimCast {
    pub target: AxesPermutation,
    pub subject: AxesPermutation,
}

impl DimCast {
    /// Identity on both sides
    pub fn identity(target_rank: usize, subject_rank: usize) -> Self {
        Self {
            target: (0..target_rank).map(Some).collect(),
            subject: (0..subject_rank).map(Some).collect(),
        }
    }
}

/// Strategy computing axis correspondence from two dims tuples
pub trait DimCaster {
    fn cast(&self, target: &[Dim], subject: &[Dim]) -> Result<DimCast>;
}

/// Caster that never moves axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrivialCaster;

impl DimCaster for TrivialCaster {
    fn cast(&self, target: &[Dim], subject: &[Dim]) -> Result<DimCast> {
        Ok(DimCast::identity(target.len(), subject.len()))
    }
}

/// Caster that rearranges the subject onto a fixed target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnilateralCaster {
    /// Refuse higher-rank subjects and conflicting names instead of migrating
    pub strict: bool,
}

impl UnilateralCaster {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl DimCaster for UnilateralCaster {
    fn cast(&self, target: &[Dim], subject: &[Dim]) -> Result<DimCast> {
        cast_dim(target, subject, self.strict)
    }
}

fn cast_error(target: &[Dim], subject: &[Dim], reason: String) -> NamedTensorError {
    NamedTensorError::CastImpossible {
        target: format_dims(target),
        subject: format_dims(subject),
        reason,
    }
}

/// Cast the subject dims onto the target dims.
///
/// 1. A subject of higher rank is refused when `strict`, otherwise the target
///    gains leading virtual unnamed slots.
/// 2. Every named target slot takes the same-named subject axis.
/// 3. Matched axes anchor the order. Each run of unmatched subject axes
///    between two matched axes goes to the open slots between their slots.
///    A run followed by a matched axis prefers unnamed slots; a trailing run
///    aligns to the right. Within a run, named slots are avoided for named
///    axes. Runs that do not fit their segment spill onto whatever open slots
///    are left, right-aligned.
/// 4. A named subject axis landing on a slot with another name is refused
///    when `strict`; otherwise it migrates to a new leading singleton slot of
///    the target, in subject order.
/// 5. Every subject axis must end up in exactly one slot.
pub fn cast_dim(target: &[Dim], subject: &[Dim], strict: bool) -> Result<DimCast> {
    let (m, n) = (target.len(), subject.len());
    if n > m && strict {
        return Err(NamedTensorError::RankMismatch {
            target: m,
            subject: n,
        });
    }

    let virtual_slots = n.saturating_sub(m);
    let slots: Vec<Option<&str>> = std::iter::repeat(None)
        .take(virtual_slots)
        .chain(target.iter().map(|d| d.as_deref()))
        .collect();
    let mut assigned: Vec<Option<usize>> = vec![None; slots.len()];
    let mut placed = vec![false; n];

    for (slot, name) in slots.iter().enumerate() {
        let Some(name) = name else { continue };
        if let Some(axis) = find_dim(subject, name)? {
            assigned[slot] = Some(axis);
            placed[axis] = true;
        }
    }

    // (subject axis, target slot) for every name match
    let anchors: Vec<(usize, usize)> = assigned
        .iter()
        .enumerate()
        .filter_map(|(slot, axis)| axis.map(|a| (a, slot)))
        .collect();
    let mut taken: Vec<bool> = assigned.iter().map(Option::is_some).collect();
    let mut migrating = Vec::new();
    let mut spill = Vec::new();
    let mut settle = |axis: usize, slot: usize| -> Result<()> {
        match (slots[slot], subject[axis].as_deref()) {
            (Some(slot_name), Some(axis_name)) => {
                if strict {
                    return Err(cast_error(
                        target,
                        subject,
                        format!(
                            "subject axis {} '{}' falls on target slot '{}'",
                            axis, axis_name, slot_name
                        ),
                    ));
                }
                trace!(axis, name = axis_name, slot = slot_name, "migrating subject axis");
                migrating.push(axis);
            }
            _ => assigned[slot] = Some(axis),
        }
        Ok(())
    };

    for run in unmatched_runs(&placed) {
        let (first, last) = (run[0], run[run.len() - 1]);
        let lo = anchors.iter().filter(|(a, _)| *a < first).map(|(_, s)| *s).max();
        let hi = anchors.iter().filter(|(a, _)| *a > last).map(|(_, s)| *s).min();
        let segment: Vec<usize> = (0..slots.len())
            .filter(|&s| !taken[s] && lo.map_or(true, |l| s > l) && hi.map_or(true, |h| s < h))
            .collect();
        if segment.len() < run.len() {
            trace!(?run, ?lo, ?hi, "subject run spills out of its segment");
            spill.extend(run);
            continue;
        }
        for (axis, slot) in place_run(&slots, subject, &run, &segment, hi.is_some()) {
            taken[slot] = true;
            settle(axis, slot)?;
        }
    }

    if !spill.is_empty() {
        let open: Vec<usize> = (0..slots.len()).filter(|&s| !taken[s]).collect();
        if open.len() < spill.len() {
            return Err(cast_error(
                target,
                subject,
                format!("{} subject axes left for {} open slots", spill.len(), open.len()),
            ));
        }
        for (axis, slot) in place_run(&slots, subject, &spill, &open, false) {
            taken[slot] = true;
            settle(axis, slot)?;
        }
    }
    // subject order for the migrated axes
    migrating.sort_unstable();

    let lead = migrating.len() + virtual_slots;
    let subject_perm: AxesPermutation = migrating.iter().map(|&a| Some(a)).chain(assigned).collect();
    let target_perm: AxesPermutation = std::iter::repeat(None)
        .take(lead)
        .chain((0..m).map(Some))
        .collect();

    let mut seen = vec![0usize; n];
    for axis in subject_perm.iter().flatten() {
        seen[*axis] += 1;
    }
    if let Some(axis) = seen.iter().position(|&count| count != 1) {
        return Err(cast_error(
            target,
            subject,
            format!("subject axis {} placed {} times", axis, seen[axis]),
        ));
    }

    debug!(
        target_dims = %format_dims(target),
        subject_dims = %format_dims(subject),
        ?target_perm,
        ?subject_perm,
        "unilateral cast"
    );
    Ok(DimCast {
        target: target_perm,
        subject: subject_perm,
    })
}

/// Maximal runs of consecutive subject axes left unmatched by name
fn unmatched_runs(placed: &[bool]) -> Vec<Vec<usize>> {
    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut current = Vec::new();
    for (axis, &done) in placed.iter().enumerate() {
        if done {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(axis);
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Order-preserving placement of `run` onto `segment` (`run.len() <= segment.len()`).
///
/// Costs are compared lexicographically: named axes on named slots first,
/// then named slots used at all when `prefer_unnamed`, then distance from the
/// right end of the segment.
fn place_run(
    slots: &[Option<&str>],
    subject: &[Dim],
    run: &[usize],
    segment: &[usize],
    prefer_unnamed: bool,
) -> Vec<(usize, usize)> {
    type Cost = (usize, usize, usize);
    let (k, s) = (run.len(), segment.len());
    let step = |axis: usize, j: usize| -> Cost {
        let named_slot = slots[segment[j]].is_some();
        (
            usize::from(named_slot && subject[axis].is_some()),
            usize::from(named_slot && prefer_unnamed),
            s - 1 - j,
        )
    };

    // best[i][j]: first i axes placed within the first j slots
    let mut best: Vec<Vec<Option<Cost>>> = vec![vec![None; s + 1]; k + 1];
    let mut took = vec![vec![false; s + 1]; k + 1];
    for cell in best[0].iter_mut() {
        *cell = Some((0, 0, 0));
    }
    for i in 1..=k {
        for j in i..=s {
            let skip = best[i][j - 1];
            let take = best[i - 1][j - 1].map(|(a, b, c)| {
                let (x, y, z) = step(run[i - 1], j - 1);
                (a + x, b + y, c + z)
            });
            match (take, skip) {
                (Some(t), Some(sk)) if sk < t => best[i][j] = Some(sk),
                (Some(t), _) => {
                    best[i][j] = Some(t);
                    took[i][j] = true;
                }
                (None, sk) => best[i][j] = sk,
            }
        }
    }

    let mut out = Vec::with_capacity(k);
    let (mut i, mut j) = (k, s);
    while i > 0 {
        if took[i][j] {
            out.push((run[i - 1], segment[j - 1]));
            i -= 1;
        }
        j -= 1;
    }
    out.reverse();
    out
}
