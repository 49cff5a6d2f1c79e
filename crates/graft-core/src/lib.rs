//! Graft Resolution Core
//!
//! Runtime core of the graft object model: a dynamically-typed,
//! multiple-inheritance guest type system that coexists with a
//! single-inheritance-plus-interfaces host platform.
//!
//! The core computes a deterministic method resolution order (MRO) for
//! every guest-visible type, detects hierarchies for which no consistent
//! order exists, memoizes attribute lookup along the MRO with
//! generation-stamped invalidation, and synthesizes hybrid types at
//! runtime that satisfy host structural requirements while dispatching
//! through the guest MRO.
//!
//! Source parsing, the low-level class image emitter, and the built-in
//! value types live outside this crate; the image emitter and the host
//! type descriptions are injected through the collaborator traits in
//! [`host`].

#![warn(missing_docs)]

pub mod conflict;
pub mod host;
pub mod linearize;
pub mod lookup;
pub mod registry;
pub mod synth;
pub mod system;

pub use graft_types::{
    AttributeChange, AttributeDef, AttributeKind, AttributeSpec, ConflictReport, HostTypeId,
    ImageError, ImplHandle, ResolveError, SynthesisError, TypeNode, TypeNodeId,
};
pub use host::{
    HostBinding, HostMember, HostTypeDesc, HybridSpec, ImageGenerator, ImageHandle, MethodForward,
    TableHostBinding,
};
pub use lookup::LookupCache;
pub use registry::TypeRegistry;
pub use synth::HybridSynthesizer;
pub use system::TypeSystem;
