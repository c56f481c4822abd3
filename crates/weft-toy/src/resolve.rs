use ecow::EcoString;

use weft_span::Report;
use weft_tree::{Field, NodeId, NodeKind, Resolve, ScopeId, Tag, Tree, TypeKind};

use crate::{
    ast::{Binding, DeclKind, Path, TypeExpr},
    error::ToyError,
};

/// Payload of one open declaration: its syntax and the scope it was declared in.
pub(crate) struct DeclResolver {
    pub scope: ScopeId,
    pub kind: DeclKind,
}

impl Resolve for DeclResolver {
    fn resolve(self: Box<Self>, _decl: NodeId, tree: &mut Tree, report: &mut Report) -> NodeKind {
        let DeclResolver { scope, kind } = *self;
        let mut lower = Lower {
            scope,
            tree,
            report,
        };

        match &kind {
            DeclKind::Type(ty) => NodeKind::Type(lower.type_kind(ty)),
            DeclKind::Let(ty) => NodeKind::Value {
                ty: Some(lower.ty(ty)),
            },
            DeclKind::Proc { params, result } => {
                let params = params.iter().map(|param| lower.param(param)).collect();
                let result = result.as_ref().map(|ty| lower.ty(ty));
                NodeKind::Function { params, result }
            }
        }
    }
}

struct Lower<'a> {
    scope: ScopeId,
    tree: &'a mut Tree,
    report: &'a mut Report,
}

impl Lower<'_> {
    /// Named types become aliases of the resolved target; pointers only record
    /// their target.
    fn type_kind(&mut self, expr: &TypeExpr) -> TypeKind {
        match expr {
            TypeExpr::Named(path) => TypeKind::Alias(self.named(path)),
            TypeExpr::Pointer(inner, _) => TypeKind::Pointer(self.pointee(inner)),
            TypeExpr::Struct(fields, _) => {
                TypeKind::Struct(fields.iter().map(|field| self.field(field)).collect())
            }
        }
    }

    fn ty(&mut self, expr: &TypeExpr) -> NodeId {
        match expr {
            TypeExpr::Named(path) => self.named(path),
            _ => {
                let kind = self.type_kind(expr);
                self.tree.add(NodeKind::Type(kind), None, expr.loc())
            }
        }
    }

    fn pointee(&mut self, expr: &TypeExpr) -> NodeId {
        match expr {
            TypeExpr::Named(path) => match self.find(path) {
                Ok(node) => node,
                Err(error) => self.raise(error),
            },
            _ => self.ty(expr),
        }
    }

    fn named(&mut self, path: &Path) -> NodeId {
        match self.find(path) {
            Ok(node) => self.tree.resolve(node, self.report),
            Err(error) => self.raise(error),
        }
    }

    fn field(&mut self, binding: &Binding) -> Field {
        Field {
            name: binding.name.clone(),
            ty: self.ty(&binding.ty),
            loc: binding.loc,
        }
    }

    fn param(&mut self, binding: &Binding) -> NodeId {
        let ty = self.ty(&binding.ty);
        self.tree.add(
            NodeKind::Value { ty: Some(ty) },
            Some(binding.name.clone()),
            binding.loc,
        )
    }

    fn raise(&mut self, error: ToyError) -> NodeId {
        self.tree.raise(error.into(), self.report)
    }

    /// The type declaration `path` names, without resolving it.
    fn find(&self, path: &Path) -> Result<NodeId, ToyError> {
        let name = path.last();
        let module = match path.prefix() {
            [] => None,
            prefix => Some(self.module(prefix, path)?),
        };

        let lookup = |tag| match module {
            Some(scope) => self.tree.lookup_local(scope, tag, name),
            None => self.tree.lookup(self.scope, tag, name),
        };

        if let Some(node) = lookup(Tag::Types) {
            return Ok(node);
        }

        let found = [
            (Tag::Values, "value"),
            (Tag::Procs, "procedure"),
            (Tag::Imports, "module"),
        ]
        .into_iter()
        .find_map(|(tag, found)| lookup(tag).map(|_| found));

        let name = EcoString::from(path.to_string());
        Err(match found {
            Some(found) => ToyError::NotAType {
                name,
                found,
                loc: path.loc,
            },
            None => ToyError::UnresolvedType {
                name,
                loc: path.loc,
            },
        })
    }

    /// Scope of the module a qualified name starts with. The first segment
    /// must be an import, later ones name nested modules.
    fn module(&self, prefix: &[EcoString], path: &Path) -> Result<ScopeId, ToyError> {
        let unresolved = || ToyError::UnresolvedType {
            name: path.to_string().into(),
            loc: path.loc,
        };

        let (first, rest) = prefix.split_first().ok_or_else(unresolved)?;
        let import = self
            .tree
            .lookup(self.scope, Tag::Imports, first)
            .ok_or_else(unresolved)?;
        let mut scope = self
            .tree
            .module_scope(self.tree.import_target(import))
            .ok_or_else(unresolved)?;

        for segment in rest {
            let module = self
                .tree
                .lookup_local(scope, Tag::Modules, segment)
                .ok_or_else(unresolved)?;
            scope = self.tree.module_scope(module).ok_or_else(unresolved)?;
        }

        Ok(scope)
    }
}
