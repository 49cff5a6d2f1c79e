//! Conflict diagnostics for failed linearizations
//!
//! When the merge reaches an impasse, every remaining head is blocked
//! because it occurs past the cursor of some other sequence. Those blocked
//! heads are exactly the ancestors whose relative order is mutually
//! contradictory, and they are reported in first-appearance order across
//! the merge sequences so the same hierarchy always produces the same
//! report.
//!
//! The report also names the attributes that were installed on any of the
//! conflicting ancestors after initial registration. The common way a
//! previously-stable hierarchy becomes unlinearizable is a structural
//! modification of one ancestor after other types were already resolved;
//! naming the late attributes points straight at the modification.

use crate::linearize::MergeState;
use crate::registry::TypeRegistry;
use graft_types::{ConflictReport, TypeNodeId};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// Build the diagnostic for a merge impasse
pub(crate) fn diagnose(
    ty: TypeNodeId,
    name: &str,
    to_merge: &[MergeState],
    registry: &TypeRegistry,
) -> ConflictReport {
    let mut seen = FxHashSet::default();
    let mut conflicting = Vec::new();

    for state in to_merge {
        if state.is_merged() {
            continue;
        }
        let head = state.candidate();
        if !seen.insert(head) {
            continue;
        }
        let blocked = to_merge
            .iter()
            .any(|other| other.past_next_contains(head));
        if blocked {
            let head_name = registry
                .get(head)
                .map(|node| node.name().to_string())
                .unwrap_or_else(|| head.to_string());
            conflicting.push((head, head_name));
        }
    }

    let mut attributes = BTreeSet::new();
    for (id, _) in &conflicting {
        if let Some(node) = registry.get(*id) {
            attributes.extend(node.late_attribute_names());
        }
    }

    ConflictReport {
        type_id: ty,
        type_name: name.to_string(),
        conflicting,
        attributes: attributes.into_iter().collect(),
    }
}
