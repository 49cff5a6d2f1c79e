//! Collaborator contracts for the host platform
//!
//! The core never talks to the host platform directly. A [`HostBinding`]
//! maps a host class/interface identifier to a description of its members
//! and supertypes, and an [`ImageGenerator`] turns a finished
//! [`HybridSpec`] into a loadable concrete type. Both are injected; the
//! core only decides which methods an image must expose and what calling
//! through them must do.

use graft_types::{AttributeKind, HostTypeId, ImageError, ImplHandle, TypeNodeId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// One member of a host class or interface
#[derive(Debug, Clone)]
pub struct HostMember {
    /// Member name
    pub name: String,
    /// Attribute kind the member maps to in the guest model
    pub kind: AttributeKind,
    /// Implementation handle; `None` for abstract members
    pub implementation: Option<ImplHandle>,
}

impl HostMember {
    /// A concrete method the host type implements itself
    pub fn concrete(name: impl Into<String>, handle: ImplHandle) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Method,
            implementation: Some(handle),
        }
    }

    /// An abstract method the host type demands from implementors
    pub fn abstract_method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Method,
            implementation: None,
        }
    }
}

/// Description of one host class or interface
///
/// Must be stable: describing the same identifier twice yields the same
/// supertypes and members.
#[derive(Debug, Clone)]
pub struct HostTypeDesc {
    /// Host identifier
    pub id: HostTypeId,
    /// Guest-visible name for the view node
    pub name: String,
    /// Direct supertypes (superclass and implemented interfaces)
    pub supertypes: Vec<HostTypeId>,
    /// Members this host type declares itself
    pub members: Vec<HostMember>,
}

/// Maps host identifiers to type descriptions
///
/// `None` means the host platform does not know the identifier yet; the
/// caller treats that as a retryable precondition failure, never as a
/// conflict.
pub trait HostBinding: Send + Sync {
    /// Describe a host class or interface
    fn describe(&self, id: &HostTypeId) -> Option<HostTypeDesc>;
}

/// One host-visible method of a hybrid image and its dispatch target
#[derive(Debug, Clone)]
pub struct MethodForward {
    /// Host-visible member name
    pub member: String,
    /// Node whose definition currently resolves the member
    pub target: TypeNodeId,
    /// Implementation handle the forward initially binds to
    pub handle: ImplHandle,
}

/// Everything the image generator needs to emit a hybrid type
#[derive(Debug, Clone)]
pub struct HybridSpec {
    /// Name of the hybrid type
    pub name: String,
    /// Full resolved MRO of the hybrid
    pub mro: Vec<TypeNodeId>,
    /// Host requirements the image must satisfy structurally
    pub requirements: BTreeSet<HostTypeId>,
    /// Forwarding entry for every host-visible member
    pub forwards: Vec<MethodForward>,
}

/// Handle to a loadable concrete type produced by the image generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle(pub u64);

/// Emits loadable concrete types for hybrid specs
pub trait ImageGenerator: Send + Sync {
    /// Produce a loadable type whose host-visible methods forward into
    /// guest dispatch
    fn emit(&self, spec: &HybridSpec) -> Result<ImageHandle, ImageError>;
}

/// Map-backed [`HostBinding`]
///
/// Descriptions are registered explicitly; useful for embedders that
/// learn about host types incrementally, and for tests.
pub struct TableHostBinding {
    types: RwLock<FxHashMap<HostTypeId, HostTypeDesc>>,
}

impl TableHostBinding {
    /// Create an empty binding
    pub fn new() -> Self {
        Self {
            types: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register (or replace) a description
    pub fn insert(&self, desc: HostTypeDesc) {
        self.types.write().insert(desc.id.clone(), desc);
    }

    /// Number of known host types
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Whether no host type is known
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl Default for TableHostBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBinding for TableHostBinding {
    fn describe(&self, id: &HostTypeId) -> Option<HostTypeDesc> {
        self.types.read().get(id).cloned()
    }
}
