//! Hybrid type synthesis
//!
//! A hybrid type is a guest type that is simultaneously a structural match
//! for a set of host classes/interfaces. Synthesis imports view nodes for
//! the requested host types, linearizes the candidate hierarchy, verifies
//! that every host-demanded abstract member has a concrete implementation
//! along the MRO, asks the image generator for a loadable concrete type,
//! and only then publishes the node. A failed request publishes nothing
//! and is never cached, so it can be retried once the precondition clears.
//!
//! Requests are deduplicated by canonical key (guest base plus the sorted
//! requirement set). Two threads racing on the same key serialize on a
//! per-key mutex; the loser re-checks the published map and takes the
//! cache-hit path, so exactly one node and one image are ever produced per
//! key.

use crate::host::{HostBinding, HybridSpec, ImageGenerator, MethodForward};
use crate::linearize::linearize;
use crate::registry::TypeRegistry;
use dashmap::DashMap;
use graft_types::{HostTypeId, ResolveError, SynthesisError, TypeNode, TypeNodeId};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Deduplication key for hybrid requests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CanonicalKey {
    guest_base: TypeNodeId,
    /// Sorted, deduplicated requirement set
    requirements: Vec<HostTypeId>,
}

impl CanonicalKey {
    /// Canonicalize a request
    fn new(guest_base: TypeNodeId, requirements: &[HostTypeId]) -> Self {
        let mut requirements = requirements.to_vec();
        requirements.sort();
        requirements.dedup();
        Self {
            guest_base,
            requirements,
        }
    }
}

/// Builds and registers hybrid types
pub struct HybridSynthesizer {
    registry: Arc<TypeRegistry>,
    binding: Arc<dyn HostBinding>,
    images: Arc<dyn ImageGenerator>,
    /// Successfully published hybrids by canonical key
    published: DashMap<CanonicalKey, TypeNodeId>,
    /// Per-key critical sections; entries are retained so that late
    /// waiters and fresh arrivals always serialize on the same mutex
    in_flight: DashMap<CanonicalKey, Arc<Mutex<()>>>,
}

impl HybridSynthesizer {
    /// Create a synthesizer over a registry and its collaborators
    pub fn new(
        registry: Arc<TypeRegistry>,
        binding: Arc<dyn HostBinding>,
        images: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            registry,
            binding,
            images,
            published: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Synthesize (or return the already-synthesized) hybrid type for a
    /// guest base and a set of host requirements
    pub fn synthesize(
        &self,
        guest_base: TypeNodeId,
        requirements: &[HostTypeId],
    ) -> Result<TypeNodeId, SynthesisError> {
        let key = CanonicalKey::new(guest_base, requirements);
        if let Some(existing) = self.published.get(&key) {
            return Ok(*existing);
        }

        let gate = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = gate.lock();

        // The winner of the race may have published while we waited.
        if let Some(existing) = self.published.get(&key) {
            return Ok(*existing);
        }
        self.synthesize_locked(&key)
    }

    /// Number of published hybrids
    pub fn published_count(&self) -> usize {
        self.published.len()
    }

    fn synthesize_locked(&self, key: &CanonicalKey) -> Result<TypeNodeId, SynthesisError> {
        let base = self
            .registry
            .get(key.guest_base)
            .ok_or(SynthesisError::UnknownGuestBase(key.guest_base))?;

        let mut bases = vec![key.guest_base];
        for requirement in &key.requirements {
            let view = self.import_host_type(requirement)?;
            if !bases.contains(&view) {
                bases.push(view);
            }
        }

        let id = TypeNodeId::next();
        let name = self.hybrid_name(&base, &bases[1..]);
        let mro = linearize(id, &name, &bases, &self.registry).map_err(map_resolve)?;

        // Everything any host view along the MRO demands but does not
        // implement must resolve to a concrete definition somewhere in
        // the order, or the image would have nothing to forward to.
        let mut host_visible = BTreeSet::new();
        for &ancestor_id in &mro {
            let Some(ancestor) = self.registry.get(ancestor_id) else {
                continue;
            };
            if !ancestor.host_requirements().is_empty() {
                host_visible.extend(ancestor.abstract_members().iter().cloned());
                host_visible.extend(ancestor.declared_attribute_names());
            }
        }

        let mut forwards = Vec::with_capacity(host_visible.len());
        for member in &host_visible {
            match resolve_along(&self.registry, &mro, member) {
                Some((target, handle)) => forwards.push(MethodForward {
                    member: member.clone(),
                    target,
                    handle,
                }),
                None => {
                    return Err(SynthesisError::UnsatisfiedRequirement {
                        member: member.clone(),
                    })
                }
            }
        }
        let spec = HybridSpec {
            name: name.clone(),
            mro: mro.clone(),
            requirements: key.requirements.iter().cloned().collect(),
            forwards,
        };
        self.images.emit(&spec)?;

        let node = TypeNode::new(id, name, bases, mro, vec![])
            .with_host_requirements(key.requirements.iter().cloned().collect());
        self.registry.publish(node);
        self.published.insert(key.clone(), id);
        Ok(id)
    }

    /// Import a host type (and, transitively, its supertypes) as view
    /// nodes, deduplicated through the registry
    fn import_host_type(&self, id: &HostTypeId) -> Result<TypeNodeId, SynthesisError> {
        if let Some(existing) = self.registry.host_view(id) {
            return Ok(existing);
        }
        let desc = self
            .binding
            .describe(id)
            .ok_or_else(|| SynthesisError::HostTypeNotFound { id: id.clone() })?;

        let mut bases = Vec::with_capacity(desc.supertypes.len());
        for supertype in &desc.supertypes {
            let view = self.import_host_type(supertype)?;
            if !bases.contains(&view) {
                bases.push(view);
            }
        }

        self.registry
            .register_host_view(&desc, bases)
            .map_err(map_resolve)
    }

    fn hybrid_name(&self, base: &TypeNode, views: &[TypeNodeId]) -> String {
        let mut name = base.name().to_string();
        for &view in views {
            name.push('$');
            match self.registry.get(view) {
                Some(node) => name.push_str(node.name()),
                None => name.push_str(&view.to_string()),
            }
        }
        name
    }
}

fn map_resolve(err: ResolveError) -> SynthesisError {
    match err {
        ResolveError::Conflict(report) => SynthesisError::MroConflict(report),
        // Unreachable from synthesis: every base handed to linearize is
        // deduplicated and already published. Kept exhaustive so a
        // registry inconsistency surfaces as an error, not a panic; the
        // reported id is the offending participant, which may be a host
        // view rather than the guest base.
        ResolveError::UnresolvedBase { base, .. } | ResolveError::DuplicateBase { base, .. } => {
            SynthesisError::UnknownGuestBase(base)
        }
        ResolveError::UnknownType(id) => SynthesisError::UnknownGuestBase(id),
    }
}

/// First concrete definition of `name` along `mro`
fn resolve_along(
    registry: &TypeRegistry,
    mro: &[TypeNodeId],
    name: &str,
) -> Option<(TypeNodeId, graft_types::ImplHandle)> {
    for &id in mro {
        if let Some(node) = registry.get(id) {
            if let Some(def) = node.own_attribute(name) {
                return Some((def.origin, def.handle));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostMember, HostTypeDesc, ImageHandle, TableHostBinding};
    use graft_types::{AttributeSpec, ImageError, ImplHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingImages {
        emits: AtomicUsize,
        fail_with: Option<ImageError>,
    }

    impl CountingImages {
        fn new() -> Self {
            Self {
                emits: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        fn failing(err: ImageError) -> Self {
            Self {
                emits: AtomicUsize::new(0),
                fail_with: Some(err),
            }
        }

        fn emit_count(&self) -> usize {
            self.emits.load(Ordering::SeqCst)
        }
    }

    impl ImageGenerator for CountingImages {
        fn emit(&self, _spec: &HybridSpec) -> Result<ImageHandle, ImageError> {
            let n = self.emits.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(ImageHandle(n as u64)),
            }
        }
    }

    fn runnable_desc() -> HostTypeDesc {
        HostTypeDesc {
            id: HostTypeId::new("java.lang.Runnable"),
            name: "Runnable".to_string(),
            supertypes: vec![],
            members: vec![HostMember::abstract_method("run")],
        }
    }

    fn setup() -> (Arc<TypeRegistry>, Arc<TableHostBinding>, Arc<CountingImages>) {
        let registry = Arc::new(TypeRegistry::new("object"));
        let binding = Arc::new(TableHostBinding::new());
        let images = Arc::new(CountingImages::new());
        (registry, binding, images)
    }

    #[test]
    fn test_synthesize_is_idempotent() {
        let (registry, binding, images) = setup();
        binding.insert(runnable_desc());
        let base = registry
            .register_guest_type("Task", vec![], vec![AttributeSpec::method("run", ImplHandle(1))])
            .unwrap();

        let synth = HybridSynthesizer::new(registry.clone(), binding, images.clone());
        let reqs = [HostTypeId::new("java.lang.Runnable")];
        let first = synth.synthesize(base, &reqs).unwrap();
        let second = synth.synthesize(base, &reqs).unwrap();

        assert_eq!(first, second);
        assert_eq!(images.emit_count(), 1);
        assert_eq!(synth.published_count(), 1);

        let node = registry.get(first).unwrap();
        assert_eq!(node.mro()[0], first);
        assert_eq!(node.mro()[1], base);
        assert_eq!(*node.mro().last().unwrap(), registry.root());
        assert!(node
            .host_requirements()
            .contains(&HostTypeId::new("java.lang.Runnable")));
    }

    #[test]
    fn test_requirement_order_does_not_matter() {
        let (registry, binding, images) = setup();
        binding.insert(runnable_desc());
        binding.insert(HostTypeDesc {
            id: HostTypeId::new("java.io.Closeable"),
            name: "Closeable".to_string(),
            supertypes: vec![],
            members: vec![HostMember::abstract_method("close")],
        });
        let base = registry
            .register_guest_type(
                "Worker",
                vec![],
                vec![
                    AttributeSpec::method("run", ImplHandle(1)),
                    AttributeSpec::method("close", ImplHandle(2)),
                ],
            )
            .unwrap();

        let synth = HybridSynthesizer::new(registry, binding, images.clone());
        let a = synth
            .synthesize(
                base,
                &[
                    HostTypeId::new("java.lang.Runnable"),
                    HostTypeId::new("java.io.Closeable"),
                ],
            )
            .unwrap();
        let b = synth
            .synthesize(
                base,
                &[
                    HostTypeId::new("java.io.Closeable"),
                    HostTypeId::new("java.lang.Runnable"),
                ],
            )
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(images.emit_count(), 1);
    }

    #[test]
    fn test_unsatisfied_requirement() {
        let (registry, binding, images) = setup();
        binding.insert(runnable_desc());
        let base = registry.register_guest_type("Empty", vec![], vec![]).unwrap();

        let synth = HybridSynthesizer::new(registry, binding, images.clone());
        let err = synth
            .synthesize(base, &[HostTypeId::new("java.lang.Runnable")])
            .unwrap_err();
        assert_eq!(
            err,
            SynthesisError::UnsatisfiedRequirement {
                member: "run".to_string(),
            }
        );
        // Step 4 fails before the image generator is consulted.
        assert_eq!(images.emit_count(), 0);
        assert_eq!(synth.published_count(), 0);
    }

    #[test]
    fn test_host_type_not_found_is_retryable() {
        let (registry, binding, images) = setup();
        let base = registry
            .register_guest_type("Task", vec![], vec![AttributeSpec::method("run", ImplHandle(1))])
            .unwrap();

        let synth = HybridSynthesizer::new(registry, binding.clone(), images.clone());
        let reqs = [HostTypeId::new("java.lang.Runnable")];
        let err = synth.synthesize(base, &reqs).unwrap_err();
        assert!(matches!(err, SynthesisError::HostTypeNotFound { .. }));
        assert!(err.is_retryable());

        // The host platform learns the class; the retry must succeed.
        binding.insert(runnable_desc());
        assert!(synth.synthesize(base, &reqs).is_ok());
        assert_eq!(images.emit_count(), 1);
    }

    #[test]
    fn test_failed_image_generation_publishes_nothing() {
        let (registry, binding, _) = setup();
        binding.insert(runnable_desc());
        let images = Arc::new(CountingImages::failing(ImageError {
            message: "loader busy".to_string(),
            retryable: true,
        }));
        let base = registry
            .register_guest_type("Task", vec![], vec![AttributeSpec::method("run", ImplHandle(1))])
            .unwrap();

        let synth = HybridSynthesizer::new(registry.clone(), binding, images.clone());
        let reqs = [HostTypeId::new("java.lang.Runnable")];
        let err = synth.synthesize(base, &reqs).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(synth.published_count(), 0);

        // A second attempt reaches the generator again: failures are
        // never cached.
        let _ = synth.synthesize(base, &reqs);
        assert_eq!(images.emit_count(), 2);
    }

    #[test]
    fn test_transitive_host_supertypes_are_imported() {
        let (registry, binding, images) = setup();
        binding.insert(HostTypeDesc {
            id: HostTypeId::new("java.util.List"),
            name: "List".to_string(),
            supertypes: vec![HostTypeId::new("java.util.Collection")],
            members: vec![HostMember::abstract_method("get")],
        });
        binding.insert(HostTypeDesc {
            id: HostTypeId::new("java.util.Collection"),
            name: "Collection".to_string(),
            supertypes: vec![],
            members: vec![
                HostMember::abstract_method("size"),
                HostMember::concrete("isEmpty", ImplHandle(100)),
            ],
        });
        let base = registry
            .register_guest_type(
                "Seq",
                vec![],
                vec![
                    AttributeSpec::method("get", ImplHandle(1)),
                    AttributeSpec::method("size", ImplHandle(2)),
                ],
            )
            .unwrap();

        let synth = HybridSynthesizer::new(registry.clone(), binding, images);
        let hybrid = synth
            .synthesize(base, &[HostTypeId::new("java.util.List")])
            .unwrap();

        let list_view = registry.host_view(&HostTypeId::new("java.util.List")).unwrap();
        let coll_view = registry
            .host_view(&HostTypeId::new("java.util.Collection"))
            .unwrap();
        let mro = registry.get(hybrid).unwrap().mro().to_vec();
        let pos = |id| mro.iter().position(|&m| m == id).unwrap();
        assert!(pos(base) < pos(list_view));
        assert!(pos(list_view) < pos(coll_view));
    }

    #[test]
    fn test_concrete_host_member_satisfies_requirement() {
        // "isEmpty" is abstract nowhere and concrete on the host view;
        // the guest base supplies nothing for it, and that is fine.
        let (registry, binding, images) = setup();
        binding.insert(HostTypeDesc {
            id: HostTypeId::new("java.util.AbstractList"),
            name: "AbstractList".to_string(),
            supertypes: vec![],
            members: vec![
                HostMember::abstract_method("get"),
                HostMember::concrete("isEmpty", ImplHandle(100)),
            ],
        });
        let base = registry
            .register_guest_type("Seq", vec![], vec![AttributeSpec::method("get", ImplHandle(1))])
            .unwrap();

        let synth = HybridSynthesizer::new(registry, binding, images);
        assert!(synth
            .synthesize(base, &[HostTypeId::new("java.util.AbstractList")])
            .is_ok());
    }
}
