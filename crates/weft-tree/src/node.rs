use ecow::EcoString;
use std::fmt;

use weft_span::Loc;

use crate::{NodeId, ScopeId, Tag, tree::Resolve};

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: EcoString,
    pub ty: NodeId,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Builtin type without further structure.
    Opaque,
    Unit,
    Bool,
    Integer { signed: bool, bits: u16 },
    /// Points at another type node without resolving it.
    Pointer(NodeId),
    /// Stands for another, already resolved, type node.
    Alias(NodeId),
    Struct(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Module(ScopeId),
    Value { ty: Option<NodeId> },
    Function {
        params: Vec<NodeId>,
        result: Option<NodeId>,
    },
    Type(TypeKind),
    Import { module: NodeId },
    Error(EcoString),
    /// Placeholder of an open declaration bound under `Tag`.
    Open(Tag),
}

impl NodeKind {
    pub fn is_module(&self) -> bool {
        matches!(self, Self::Module(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Short description used in messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Module(_) => "module",
            Self::Value { .. } => "value",
            Self::Function { .. } => "procedure",
            Self::Type(_) => "type",
            Self::Import { .. } => "import",
            Self::Error(_) => "error",
            Self::Open(_) => "open declaration",
        }
    }
}

pub(crate) enum State {
    Open(Box<dyn Resolve>),
    Resolving,
    Closed,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(_) => f.write_str("Open"),
            Self::Resolving => f.write_str("Resolving"),
            Self::Closed => f.write_str("Closed"),
        }
    }
}

/// One entry of the tree arena.
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) loc: Loc,
    pub(crate) name: Option<EcoString>,
    pub(crate) scope: Option<ScopeId>,
    pub(crate) state: State,
}

impl Node {
    pub(crate) fn closed(kind: NodeKind, name: Option<EcoString>, loc: Loc) -> Self {
        Self {
            kind,
            loc,
            name,
            scope: None,
            state: State::Closed,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn loc(&self) -> Loc {
        self.loc
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The scope this node was last bound in.
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, State::Closed)
    }

    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }
}
