//! Type node model
//!
//! A [`TypeNode`] is the runtime record for one guest-visible type: its
//! declared bases, its computed method resolution order, the attributes it
//! declares itself, and the host-platform requirements it must satisfy.
//!
//! Nodes are published through the registry as `Arc<TypeNode>` and are
//! structurally immutable after publication; only the attribute table may
//! change, and every change bumps the node's generation counter so caches
//! can revalidate without traversing dependents.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique type node IDs
static NEXT_TYPE_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a type node, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeNodeId(u64);

impl TypeNodeId {
    /// Mint a fresh, never-before-used ID
    pub fn next() -> Self {
        TypeNodeId(NEXT_TYPE_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a host-platform class or interface
///
/// Opaque to the core; typically a fully-qualified host class name. `Ord`
/// so that requirement sets have a canonical sorted form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostTypeId(String);

impl HostTypeId {
    /// Create a host type identifier
    pub fn new(name: impl Into<String>) -> Self {
        HostTypeId(name.into())
    }

    /// The identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostTypeId {
    fn from(s: &str) -> Self {
        HostTypeId::new(s)
    }
}

/// What kind of attribute a definition is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Callable method
    Method,
    /// Plain data field
    Field,
    /// Descriptor with custom get/set behavior
    Descriptor,
}

/// Opaque handle to an executable implementation
///
/// The compilation layer that produced the body owns the mapping from
/// handle to code; the core only threads handles through lookup and
/// forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImplHandle(pub u64);

/// One resolved attribute definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    /// Node that declares this definition
    pub origin: TypeNodeId,
    /// Attribute kind
    pub kind: AttributeKind,
    /// Implementation handle
    pub handle: ImplHandle,
    /// Generation of the origin node at the moment the definition was
    /// installed (0 for definitions present at initial registration)
    pub added_at: u64,
}

/// Attribute declaration supplied by a caller at registration or mutation
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    /// Attribute name
    pub name: String,
    /// Attribute kind
    pub kind: AttributeKind,
    /// Implementation handle
    pub handle: ImplHandle,
}

impl AttributeSpec {
    /// Declare a method
    pub fn method(name: impl Into<String>, handle: ImplHandle) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Method,
            handle,
        }
    }

    /// Declare a field
    pub fn field(name: impl Into<String>, handle: ImplHandle) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Field,
            handle,
        }
    }

    /// Declare a descriptor
    pub fn descriptor(name: impl Into<String>, handle: ImplHandle) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Descriptor,
            handle,
        }
    }
}

/// One change applied by an attribute mutation
#[derive(Debug, Clone)]
pub enum AttributeChange {
    /// Install or replace a definition
    Set(AttributeSpec),
    /// Remove a definition by name
    Remove(String),
}

/// Runtime record for one guest-visible type
///
/// Constructed only by the registry (guest and root types) and the hybrid
/// synthesizer, always with the MRO already computed; a node that readers
/// can see is never half-resolved.
pub struct TypeNode {
    /// Unique ID
    id: TypeNodeId,
    /// Human-readable type name
    name: String,
    /// Declared bases, in precedence order
    declared_bases: Vec<TypeNodeId>,
    /// Method resolution order: self first, universal root last
    mro: Vec<TypeNodeId>,
    /// Host classes/interfaces this type must satisfy structurally
    host_requirements: BTreeSet<HostTypeId>,
    /// Members a host view demands but does not implement
    abstract_members: BTreeSet<String>,
    /// Attributes declared by this node itself
    attributes: RwLock<FxHashMap<String, AttributeDef>>,
    /// Bumped on every attribute mutation, under the write lock
    generation: AtomicU64,
}

impl TypeNode {
    /// Create a node ready for publication
    ///
    /// `attributes` are the node's own declarations; their `origin` is set
    /// to `id` and their `added_at` to 0 (present since registration).
    pub fn new(
        id: TypeNodeId,
        name: impl Into<String>,
        declared_bases: Vec<TypeNodeId>,
        mro: Vec<TypeNodeId>,
        attributes: Vec<AttributeSpec>,
    ) -> Self {
        let mut table = FxHashMap::default();
        for spec in attributes {
            table.insert(
                spec.name,
                AttributeDef {
                    origin: id,
                    kind: spec.kind,
                    handle: spec.handle,
                    added_at: 0,
                },
            );
        }
        Self {
            id,
            name: name.into(),
            declared_bases,
            mro,
            host_requirements: BTreeSet::new(),
            abstract_members: BTreeSet::new(),
            attributes: RwLock::new(table),
            generation: AtomicU64::new(0),
        }
    }

    /// Attach host requirements (hybrid nodes)
    pub fn with_host_requirements(mut self, requirements: BTreeSet<HostTypeId>) -> Self {
        self.host_requirements = requirements;
        self
    }

    /// Attach the set of members demanded but not implemented (host views)
    pub fn with_abstract_members(mut self, members: BTreeSet<String>) -> Self {
        self.abstract_members = members;
        self
    }

    /// Unique ID
    pub fn id(&self) -> TypeNodeId {
        self.id
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared bases in precedence order
    pub fn declared_bases(&self) -> &[TypeNodeId] {
        &self.declared_bases
    }

    /// Method resolution order
    pub fn mro(&self) -> &[TypeNodeId] {
        &self.mro
    }

    /// Host requirements this type satisfies structurally
    pub fn host_requirements(&self) -> &BTreeSet<HostTypeId> {
        &self.host_requirements
    }

    /// Members demanded but not implemented by this node
    pub fn abstract_members(&self) -> &BTreeSet<String> {
        &self.abstract_members
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Look up an attribute declared by this node itself
    pub fn own_attribute(&self, name: &str) -> Option<AttributeDef> {
        self.attributes.read().get(name).cloned()
    }

    /// Whether this node itself declares `name`
    pub fn declares(&self, name: &str) -> bool {
        self.attributes.read().contains_key(name)
    }

    /// Names this node declares itself, sorted
    pub fn declared_attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attributes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names declared after initial registration, sorted
    ///
    /// These are the names the conflict detector reports when a mutation
    /// makes an already-stable hierarchy unlinearizable.
    pub fn late_attribute_names(&self) -> Vec<String> {
        let table = self.attributes.read();
        let mut names: Vec<String> = table
            .iter()
            .filter(|(_, def)| def.added_at > 0)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Apply a batch of attribute changes as one exclusive section
    ///
    /// The generation is bumped once, before the changes land, and newly
    /// installed definitions carry the bumped generation as `added_at`.
    /// Returns the new generation.
    pub fn apply_changes(&self, changes: &[AttributeChange]) -> u64 {
        let mut table = self.attributes.write();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        for change in changes {
            match change {
                AttributeChange::Set(spec) => {
                    table.insert(
                        spec.name.clone(),
                        AttributeDef {
                            origin: self.id,
                            kind: spec.kind,
                            handle: spec.handle,
                            added_at: generation,
                        },
                    );
                }
                AttributeChange::Remove(name) => {
                    table.remove(name);
                }
            }
        }
        generation
    }
}

impl fmt::Debug for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("declared_bases", &self.declared_bases)
            .field("mro", &self.mro)
            .field("host_requirements", &self.host_requirements)
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_node_ids_are_unique() {
        let ids: Vec<_> = (0..100).map(|_| TypeNodeId::next()).collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                assert_ne!(ids[i], ids[j]);
            }
        }
    }

    #[test]
    fn test_new_node_attributes_stamped_at_zero() {
        let id = TypeNodeId::next();
        let node = TypeNode::new(
            id,
            "Point",
            vec![],
            vec![id],
            vec![AttributeSpec::method("draw", ImplHandle(1))],
        );
        let def = node.own_attribute("draw").unwrap();
        assert_eq!(def.origin, id);
        assert_eq!(def.added_at, 0);
        assert_eq!(node.generation(), 0);
        assert!(node.late_attribute_names().is_empty());
    }

    #[test]
    fn test_apply_changes_bumps_generation_and_stamps() {
        let id = TypeNodeId::next();
        let node = TypeNode::new(id, "Point", vec![], vec![id], vec![]);

        let gen = node.apply_changes(&[AttributeChange::Set(AttributeSpec::method(
            "draw",
            ImplHandle(7),
        ))]);
        assert_eq!(gen, 1);
        assert_eq!(node.generation(), 1);

        let def = node.own_attribute("draw").unwrap();
        assert_eq!(def.added_at, 1);
        assert_eq!(node.late_attribute_names(), vec!["draw".to_string()]);

        let gen = node.apply_changes(&[AttributeChange::Remove("draw".to_string())]);
        assert_eq!(gen, 2);
        assert!(node.own_attribute("draw").is_none());
    }
}
