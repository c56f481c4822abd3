//! The semantic tree shared by every language driver.
//!
//! All nodes and scopes of one compilation live in a single [`Tree`] arena and
//! are addressed by [`NodeId`] and [`ScopeId`] handles. Declarations may be
//! *open*: bound into a scope before their value is known and closed on first
//! [`Tree::resolve`].

pub mod error;
pub mod node;
pub mod print;
pub mod scope;
pub mod tree;

pub use error::TreeError;
pub use node::{Field, Node, NodeKind, TypeKind};
pub use scope::{Scope, Tag};
pub use tree::{Resolve, Tree};

use weft_utils::define_id;

define_id!(NodeId);
define_id!(ScopeId);

pub mod prelude {
    pub use crate::{
        Field, Node, NodeId, NodeKind, Resolve, Scope, ScopeId, Tag, Tree, TreeError, TypeKind,
    };
}
