//! Error taxonomy for type resolution and hybrid synthesis
//!
//! All failures are explicit result values. A failed operation never
//! mutates state that other callers can observe, so every error here is
//! safe to report and, where marked, to retry.

use crate::node::{HostTypeId, TypeNodeId};
use std::fmt;
use thiserror::Error;

/// Diagnostic for a failed linearization
///
/// Produced once per failed attempt, fully built before it is returned.
/// `conflicting` names the ancestors whose relative order is mutually
/// contradictory; `attributes` names the attributes installed after the
/// hierarchy was otherwise stable on any of those ancestors, which is the
/// usual way an already-resolved hierarchy becomes unlinearizable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictReport {
    /// Type whose linearization failed
    pub type_id: TypeNodeId,
    /// Name of that type
    pub type_name: String,
    /// Ancestors with mutually contradictory order, in first-appearance
    /// order across the merge sequences
    pub conflicting: Vec<(TypeNodeId, String)>,
    /// Attribute names implicated by post-registration mutation, sorted
    pub attributes: Vec<String>,
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot create a consistent method resolution order (MRO) for {} with bases ",
            self.type_name
        )?;
        for (i, (_, name)) in self.conflicting.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        if !self.attributes.is_empty() {
            write!(f, " (conflicting attributes: {})", self.attributes.join(", "))?;
        }
        Ok(())
    }
}

/// Errors from type registration and linearization
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A declared base is not (yet) resolved
    ///
    /// Ordering precondition, not a conflict: retry after the base is
    /// registered.
    #[error("base {base} of type {ty} is not resolved")]
    UnresolvedBase {
        /// Type being linearized
        ty: TypeNodeId,
        /// The unresolved base
        base: TypeNodeId,
    },

    /// The same base is declared more than once
    #[error("duplicate base {base} declared by type {ty}")]
    DuplicateBase {
        /// Type being linearized
        ty: TypeNodeId,
        /// The repeated base
        base: TypeNodeId,
    },

    /// No consistent linear order exists
    #[error("{0}")]
    Conflict(ConflictReport),

    /// The type ID is not registered
    #[error("unknown type {0}")]
    UnknownType(TypeNodeId),
}

/// Failure reported by the external image generator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("image generation failed: {message}")]
pub struct ImageError {
    /// Collaborator-defined failure description
    pub message: String,
    /// Whether retrying the same request can succeed
    pub retryable: bool,
}

/// Errors from hybrid type synthesis
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// The candidate hierarchy has no consistent linear order
    #[error("{0}")]
    MroConflict(ConflictReport),

    /// A host-demanded member has no concrete implementation
    #[error("host requirement demands '{member}' but no implementation was found")]
    UnsatisfiedRequirement {
        /// The unimplemented member name
        member: String,
    },

    /// The host binding does not (yet) know the requested type
    ///
    /// Retryable precondition: the host platform loads classes
    /// incrementally and may learn this one later.
    #[error("host type '{id}' is not available")]
    HostTypeNotFound {
        /// The unknown host identifier
        id: HostTypeId,
    },

    /// The guest base is not a registered type
    #[error("guest base {0} is not registered")]
    UnknownGuestBase(TypeNodeId),

    /// The image generator failed
    #[error(transparent)]
    ImageGeneration(#[from] ImageError),
}

impl SynthesisError {
    /// Whether retrying the same request can succeed without changing the
    /// declared hierarchy
    pub fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::HostTypeNotFound { .. } => true,
            SynthesisError::UnknownGuestBase(_) => true,
            SynthesisError::ImageGeneration(err) => err.retryable,
            SynthesisError::MroConflict(_) => false,
            SynthesisError::UnsatisfiedRequirement { .. } => false,
        }
    }
}
