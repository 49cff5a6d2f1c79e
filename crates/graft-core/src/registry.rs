//! Process-wide registry of type nodes
//!
//! The registry is the single publication point of the system: a node is
//! either absent, under construction on the stack of the registering
//! thread, or fully published with its MRO set. Readers never observe a
//! half-resolved node. Built-in and root nodes are registered at startup
//! and never removed; host views and hybrid nodes are added on demand and
//! deduplicated.

use crate::host::HostTypeDesc;
use crate::linearize::linearize;
use dashmap::DashMap;
use graft_types::{
    AttributeChange, AttributeSpec, HostTypeId, ResolveError, TypeNode, TypeNodeId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Registry of all published type nodes
pub struct TypeRegistry {
    /// Published nodes by ID
    nodes: DashMap<TypeNodeId, Arc<TypeNode>>,
    /// Host identifier to its view node, for deduplicated import
    host_views: DashMap<HostTypeId, TypeNodeId>,
    /// The universal root every MRO ends with
    root: TypeNodeId,
}

impl TypeRegistry {
    /// Create a registry with its universal root type
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = TypeNodeId::next();
        let registry = Self {
            nodes: DashMap::new(),
            host_views: DashMap::new(),
            root,
        };
        registry.publish(TypeNode::new(root, root_name, vec![], vec![root], vec![]));
        registry
    }

    /// The universal root
    pub fn root(&self) -> TypeNodeId {
        self.root
    }

    /// Get a published node
    pub fn get(&self, id: TypeNodeId) -> Option<Arc<TypeNode>> {
        self.nodes.get(&id).map(|entry| entry.clone())
    }

    /// Number of published nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is published (never true: the root always is)
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register a built-in type directly under the root
    ///
    /// Root-level types have the trivial MRO `[type, root]`, so this
    /// cannot fail.
    pub fn register_root_type(
        &self,
        name: impl Into<String>,
        attributes: Vec<AttributeSpec>,
    ) -> TypeNodeId {
        let id = TypeNodeId::next();
        self.publish(TypeNode::new(id, name, vec![], vec![id, self.root], attributes));
        id
    }

    /// Register a guest type with the given declared bases
    ///
    /// Linearizes first and publishes only on success; a failed
    /// registration leaves no trace.
    pub fn register_guest_type(
        &self,
        name: impl Into<String>,
        declared_bases: Vec<TypeNodeId>,
        attributes: Vec<AttributeSpec>,
    ) -> Result<TypeNodeId, ResolveError> {
        let name = name.into();
        let id = TypeNodeId::next();
        let mro = linearize(id, &name, &declared_bases, self)?;
        self.publish(TypeNode::new(id, name, declared_bases, mro, attributes));
        Ok(id)
    }

    /// Register a view node for a host class or interface
    ///
    /// `base_ids` are the already-imported views of the host type's
    /// supertypes. The view declares the host type's concrete members as
    /// attributes, records its abstract members, and carries its own host
    /// identifier as a requirement it structurally satisfies. Returns the
    /// existing view if another thread imported the same identifier first.
    pub fn register_host_view(
        &self,
        desc: &HostTypeDesc,
        base_ids: Vec<TypeNodeId>,
    ) -> Result<TypeNodeId, ResolveError> {
        if let Some(existing) = self.host_view(&desc.id) {
            return Ok(existing);
        }

        let id = TypeNodeId::next();
        let mro = linearize(id, &desc.name, &base_ids, self)?;

        let mut attributes = Vec::new();
        let mut abstract_members = BTreeSet::new();
        for member in &desc.members {
            match member.implementation {
                Some(handle) => attributes.push(AttributeSpec {
                    name: member.name.clone(),
                    kind: member.kind,
                    handle,
                }),
                None => {
                    abstract_members.insert(member.name.clone());
                }
            }
        }

        let mut requirements = BTreeSet::new();
        requirements.insert(desc.id.clone());
        let node = TypeNode::new(id, desc.name.clone(), base_ids, mro, attributes)
            .with_host_requirements(requirements)
            .with_abstract_members(abstract_members);

        // Another import of the same host type may have won the race
        // between the check above and here; keep the first view.
        match self.host_views.entry(desc.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Ok(*entry.get()),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                self.publish(node);
                entry.insert(id);
                Ok(id)
            }
        }
    }

    /// The view node for a host identifier, if already imported
    pub fn host_view(&self, id: &HostTypeId) -> Option<TypeNodeId> {
        self.host_views.get(id).map(|entry| *entry)
    }

    /// Apply attribute changes to a published node
    ///
    /// Exclusive with respect to other mutations and to lookup walks over
    /// the same node; bumps the node's generation so stale cache entries
    /// revalidate. Returns the new generation.
    pub fn mutate_attributes(
        &self,
        ty: TypeNodeId,
        changes: &[AttributeChange],
    ) -> Result<u64, ResolveError> {
        let node = self.get(ty).ok_or(ResolveError::UnknownType(ty))?;
        Ok(node.apply_changes(changes))
    }

    /// Publish a fully-constructed node
    pub(crate) fn publish(&self, node: TypeNode) -> Arc<TypeNode> {
        let arc = Arc::new(node);
        self.nodes.insert(arc.id(), arc.clone());
        arc
    }
}
