//! Graft Type Model
//!
//! Data model for the graft object system: type nodes, attribute
//! definitions, and the error taxonomy shared by the resolution core.

#![warn(missing_docs)]

pub mod error;
pub mod node;

pub use error::{ConflictReport, ImageError, ResolveError, SynthesisError};
pub use node::{
    AttributeChange, AttributeDef, AttributeKind, AttributeSpec, HostTypeId, ImplHandle, TypeNode,
    TypeNodeId,
};
