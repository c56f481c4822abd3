use derive_more::Display;
use ecow::EcoString;
use indexmap::IndexMap;

use crate::{NodeId, ScopeId};

/// Namespace partition inside a scope.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    #[display("values")]
    Values,
    #[display("types")]
    Types,
    #[display("procs")]
    Procs,
    #[display("modules")]
    Modules,
    /// Import aliases, only ever looked up locally.
    #[display("imports")]
    Imports,
    /// Driver-specific namespace.
    #[display("extension #{_0}")]
    Extension(u16),
}

impl Tag {
    /// Tags holding declarations that get resolved when a scope is compiled.
    pub const DECLS: [Tag; 3] = [Tag::Values, Tag::Types, Tag::Procs];
}

/// Named bindings partitioned by [`Tag`], optionally chained to a parent.
///
/// Bindings keep insertion order, so iteration and printing are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    parent: Option<ScopeId>,
    owner: Option<NodeId>,
    bindings: IndexMap<Tag, IndexMap<EcoString, NodeId>>,
}

impl Scope {
    pub(crate) fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            owner: None,
            bindings: IndexMap::new(),
        }
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// The module node this scope belongs to, if any.
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: NodeId) {
        self.owner = Some(owner);
    }

    pub fn get(&self, tag: Tag, name: &str) -> Option<NodeId> {
        self.bindings.get(&tag)?.get(name).copied()
    }

    pub fn contains(&self, tag: Tag, name: &str) -> bool {
        self.get(tag, name).is_some()
    }

    /// Inserts or overwrites, returning the previous binding.
    pub(crate) fn insert(&mut self, tag: Tag, name: EcoString, node: NodeId) -> Option<NodeId> {
        self.bindings.entry(tag).or_default().insert(name, node)
    }

    pub fn iter(&self, tag: Tag) -> impl Iterator<Item = (&EcoString, NodeId)> {
        self.bindings
            .get(&tag)
            .into_iter()
            .flat_map(|bindings| bindings.iter().map(|(name, &node)| (name, node)))
    }

    /// Tags that have at least one binding, in first-use order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.bindings
            .iter()
            .filter(|(_, bindings)| !bindings.is_empty())
            .map(|(&tag, _)| tag)
    }

    pub fn len(&self) -> usize {
        self.bindings.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
