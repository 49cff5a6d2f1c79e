//! Embedding facade
//!
//! [`TypeSystem`] bundles the registry, the lookup cache, and the hybrid
//! synthesizer behind the resolution API an embedder calls: register
//! types, resolve attributes, synthesize hybrids, mutate attributes.

use crate::host::{HostBinding, ImageGenerator};
use crate::lookup::LookupCache;
use crate::registry::TypeRegistry;
use crate::synth::HybridSynthesizer;
use graft_types::{
    AttributeChange, AttributeDef, AttributeSpec, HostTypeId, ResolveError, SynthesisError,
    TypeNodeId,
};
use std::sync::Arc;

/// The assembled resolution core
pub struct TypeSystem {
    registry: Arc<TypeRegistry>,
    cache: LookupCache,
    synthesizer: HybridSynthesizer,
}

impl TypeSystem {
    /// Create a type system with the given host collaborators
    ///
    /// The universal root is named `object`.
    pub fn new(binding: Arc<dyn HostBinding>, images: Arc<dyn ImageGenerator>) -> Self {
        let registry = Arc::new(TypeRegistry::new("object"));
        let synthesizer = HybridSynthesizer::new(registry.clone(), binding, images);
        Self {
            registry,
            cache: LookupCache::new(),
            synthesizer,
        }
    }

    /// The underlying registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The universal root
    pub fn root(&self) -> TypeNodeId {
        self.registry.root()
    }

    /// Register a built-in type directly under the root
    pub fn register_root_type(
        &self,
        name: impl Into<String>,
        attributes: Vec<AttributeSpec>,
    ) -> TypeNodeId {
        self.registry.register_root_type(name, attributes)
    }

    /// Register a guest type
    pub fn register_guest_type(
        &self,
        name: impl Into<String>,
        declared_bases: Vec<TypeNodeId>,
        attributes: Vec<AttributeSpec>,
    ) -> Result<TypeNodeId, ResolveError> {
        self.registry.register_guest_type(name, declared_bases, attributes)
    }

    /// Resolve an attribute along a type's MRO, memoized
    pub fn resolve_attribute(&self, ty: TypeNodeId, name: &str) -> Option<AttributeDef> {
        self.cache.resolve(&self.registry, ty, name)
    }

    /// Synthesize a hybrid type for a guest base and host requirements
    pub fn synthesize_hybrid(
        &self,
        guest_base: TypeNodeId,
        requirements: &[HostTypeId],
    ) -> Result<TypeNodeId, SynthesisError> {
        self.synthesizer.synthesize(guest_base, requirements)
    }

    /// Apply attribute changes to a type, bumping its generation
    pub fn mutate_attributes(
        &self,
        ty: TypeNodeId,
        changes: &[AttributeChange],
    ) -> Result<u64, ResolveError> {
        self.registry.mutate_attributes(ty, changes)
    }

    /// The MRO of a registered type
    pub fn mro(&self, ty: TypeNodeId) -> Option<Vec<TypeNodeId>> {
        self.registry.get(ty).map(|node| node.mro().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HybridSpec, ImageHandle, TableHostBinding};
    use graft_types::{ImageError, ImplHandle};

    struct NoopImages;

    impl ImageGenerator for NoopImages {
        fn emit(&self, _spec: &HybridSpec) -> Result<ImageHandle, ImageError> {
            Ok(ImageHandle(0))
        }
    }

    fn system() -> TypeSystem {
        TypeSystem::new(Arc::new(TableHostBinding::new()), Arc::new(NoopImages))
    }

    #[test]
    fn test_end_to_end_registration_and_lookup() {
        let system = system();
        let animal = system
            .register_guest_type(
                "Animal",
                vec![],
                vec![AttributeSpec::method("speak", ImplHandle(1))],
            )
            .unwrap();
        let dog = system.register_guest_type("Dog", vec![animal], vec![]).unwrap();

        assert_eq!(system.mro(dog).unwrap(), vec![dog, animal, system.root()]);
        let def = system.resolve_attribute(dog, "speak").unwrap();
        assert_eq!(def.origin, animal);
    }

    #[test]
    fn test_mutation_visible_through_facade() {
        let system = system();
        let a = system.register_guest_type("A", vec![], vec![]).unwrap();
        let b = system.register_guest_type("B", vec![a], vec![]).unwrap();

        assert!(system.resolve_attribute(b, "m").is_none());
        system
            .mutate_attributes(
                a,
                &[AttributeChange::Set(AttributeSpec::method(
                    "m",
                    ImplHandle(5),
                ))],
            )
            .unwrap();
        assert_eq!(system.resolve_attribute(b, "m").unwrap().origin, a);
    }
}
