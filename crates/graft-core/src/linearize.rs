//! C3-style MRO linearization
//!
//! Merges the already-computed MROs of a type's declared bases, plus the
//! declared-base list itself, into one linear order. A candidate head is
//! mergeable when it appears past the cursor of no other sequence; the
//! scan restarts from the first sequence after every merge, so among
//! qualifying heads the earliest-listed sequence always wins. That
//! tie-break is what keeps linearization stable when unrelated ancestors
//! are added later.

use crate::conflict;
use crate::registry::TypeRegistry;
use graft_types::{ResolveError, TypeNodeId};

/// Merge cursor over one base's MRO
pub(crate) struct MergeState {
    /// The sequence being merged
    pub(crate) mro: Vec<TypeNodeId>,
    /// Index of the next item to merge; equals `mro.len()` when done
    pub(crate) next: usize,
}

impl MergeState {
    pub(crate) fn new(mro: Vec<TypeNodeId>) -> Self {
        Self { mro, next: 0 }
    }

    pub(crate) fn is_merged(&self) -> bool {
        self.next >= self.mro.len()
    }

    pub(crate) fn candidate(&self) -> TypeNodeId {
        self.mro[self.next]
    }

    /// Whether `id` occurs strictly past this sequence's cursor
    ///
    /// Safe on fully merged sequences, whose cursor sits past the end.
    pub(crate) fn past_next_contains(&self, id: TypeNodeId) -> bool {
        self.mro
            .get(self.next + 1..)
            .is_some_and(|tail| tail.contains(&id))
    }

    /// Advance past `id` if it is this sequence's current head
    fn note_merged(&mut self, id: TypeNodeId) {
        if !self.is_merged() && self.candidate() == id {
            self.next += 1;
        }
    }
}

/// Compute the MRO for a type from its declared bases
///
/// Every base must already be published with its own MRO; an unknown base
/// is the `UnresolvedBase` precondition error, distinct from a genuine
/// ordering conflict. A type with no declared bases linearizes to
/// `[ty, root]`.
pub fn linearize(
    ty: TypeNodeId,
    name: &str,
    declared_bases: &[TypeNodeId],
    registry: &TypeRegistry,
) -> Result<Vec<TypeNodeId>, ResolveError> {
    for (i, &base) in declared_bases.iter().enumerate() {
        if declared_bases[i + 1..].contains(&base) {
            return Err(ResolveError::DuplicateBase { ty, base });
        }
    }

    if declared_bases.is_empty() {
        if ty == registry.root() {
            return Ok(vec![ty]);
        }
        return Ok(vec![ty, registry.root()]);
    }

    let mut to_merge = Vec::with_capacity(declared_bases.len() + 1);
    for &base in declared_bases {
        let node = registry
            .get(base)
            .ok_or(ResolveError::UnresolvedBase { ty, base })?;
        to_merge.push(MergeState::new(node.mro().to_vec()));
    }
    to_merge.push(MergeState::new(declared_bases.to_vec()));

    let mut mro = vec![ty];
    'scan: loop {
        for i in 0..to_merge.len() {
            if to_merge[i].is_merged() {
                continue;
            }
            let candidate = to_merge[i].candidate();
            if to_merge.iter().any(|state| state.past_next_contains(candidate)) {
                continue;
            }
            mro.push(candidate);
            for state in to_merge.iter_mut() {
                state.note_merged(candidate);
            }
            continue 'scan;
        }
        break;
    }

    if to_merge.iter().any(|state| !state.is_merged()) {
        return Err(ResolveError::Conflict(conflict::diagnose(
            ty, name, &to_merge, registry,
        )));
    }

    Ok(mro)
}
