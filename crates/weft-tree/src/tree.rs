use ecow::EcoString;
use log::{debug, trace};
use owo_colors::OwoColorize;
use std::{collections::HashSet, mem, ops::Index};

use weft_span::{Diagnostic, Loc, Report};

use crate::{
    NodeId, ScopeId, Tag, TreeError,
    node::{Node, NodeKind, State},
    scope::Scope,
};

/// Closes an open declaration.
///
/// A resolver owns whatever it needs to compute the declaration (its payload)
/// and is consumed by the single call that closes it. It may resolve other
/// declarations through the tree it is handed.
pub trait Resolve {
    fn resolve(self: Box<Self>, decl: NodeId, tree: &mut Tree, report: &mut Report) -> NodeKind;
}

impl<F> Resolve for F
where
    F: FnOnce(NodeId, &mut Tree, &mut Report) -> NodeKind,
{
    fn resolve(self: Box<Self>, decl: NodeId, tree: &mut Tree, report: &mut Report) -> NodeKind {
        (*self)(decl, tree, report)
    }
}

/// Arena of nodes and scopes for one compilation.
///
/// The tree starts out with a root module whose scope has no parent. Handles
/// stay valid for the lifetime of the tree; nodes are never removed, so nodes
/// referencing each other in a cycle are fine.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    scopes: Vec<Scope>,
    /// Open declarations currently being resolved, innermost last.
    stack: Vec<NodeId>,
    root: NodeId,
}

impl Tree {
    pub fn new(root_name: impl Into<EcoString>) -> Self {
        Self::with_capacity(root_name, 0)
    }

    pub fn with_capacity(root_name: impl Into<EcoString>, capacity: usize) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(capacity),
            scopes: Vec::with_capacity(capacity / 8),
            stack: Vec::new(),
            root: NodeId::from_usize(0),
        };
        tree.root = tree.module(None, root_name, Loc::builtin());
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_scope(&self) -> ScopeId {
        match self.nodes[self.root.as_usize()].kind {
            NodeKind::Module(scope) => scope,
            _ => unreachable!("root node is always a module"),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.as_usize()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name()
    }

    pub fn loc(&self, id: NodeId) -> Loc {
        self.node(id).loc
    }

    pub fn is_open(&self, id: NodeId) -> bool {
        self.node(id).is_open()
    }

    pub fn is_error(&self, id: NodeId) -> bool {
        self.node(id).is_error()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.as_usize()]
    }

    /// The scope of a module node.
    pub fn module_scope(&self, module: NodeId) -> Option<ScopeId> {
        match self.kind(module) {
            NodeKind::Module(scope) => Some(*scope),
            _ => None,
        }
    }

    /// Follows import nodes to the module they name.
    pub fn import_target(&self, id: NodeId) -> NodeId {
        match self.kind(id) {
            NodeKind::Import { module } => *module,
            _ => id,
        }
    }

    pub fn open_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::from_usize(self.scopes.len());
        self.scopes.push(Scope::new(parent));
        id
    }

    /// Creates a module node owning a fresh scope chained to `parent`.
    pub fn module(
        &mut self,
        parent: Option<ScopeId>,
        name: impl Into<EcoString>,
        loc: Loc,
    ) -> NodeId {
        let scope = self.open_scope(parent);
        let node = self.add(NodeKind::Module(scope), Some(name.into()), loc);
        self.scopes[scope.as_usize()].set_owner(node);
        node
    }

    /// Adds a closed node that is not bound anywhere yet.
    pub fn add(&mut self, kind: NodeKind, name: Option<EcoString>, loc: Loc) -> NodeId {
        let id = NodeId::from_usize(self.nodes.len());
        self.nodes.push(Node::closed(kind, name, loc));
        id
    }

    /// Adds an error node without diagnosing anything.
    pub fn error(&mut self, loc: Loc, message: impl Into<EcoString>) -> NodeId {
        self.add(NodeKind::Error(message.into()), None, loc)
    }

    /// Records `diagnostic` and returns an error node in its place.
    pub fn raise(&mut self, diagnostic: Diagnostic, report: &mut Report) -> NodeId {
        let node = self.error(diagnostic.loc, diagnostic.message.as_str());
        report.add_diagnostic(diagnostic);
        node
    }

    /// Binds `node` under `(tag, name)` in `scope`.
    ///
    /// An existing binding is diagnosed as shadowed and then overwritten. The
    /// previous node is returned so callers can link the two declarations.
    pub fn bind(
        &mut self,
        scope: ScopeId,
        tag: Tag,
        name: impl Into<EcoString>,
        node: NodeId,
        report: &mut Report,
    ) -> Option<NodeId> {
        let name = name.into();

        if let Some(previous) = self.scope(scope).get(tag, &name) {
            if previous != node {
                let error = TreeError::ShadowedDeclaration {
                    name: name.clone(),
                    tag,
                    previous: self.loc(previous),
                    current: self.loc(node),
                };
                trace!("{} {name} in {tag}", "Shadow".bold().yellow());
                report.add_diagnostic(error.into());
            }
        }

        self.nodes[node.as_usize()].scope = Some(scope);
        self.scopes[scope.as_usize()].insert(tag, name, node)
    }

    /// Looks `name` up in `scope`, then in its parents.
    pub fn lookup(&self, scope: ScopeId, tag: Tag, name: &str) -> Option<NodeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(node) = scope.get(tag, name) {
                return Some(node);
            }
            current = scope.parent();
        }
        None
    }

    pub fn lookup_local(&self, scope: ScopeId, tag: Tag, name: &str) -> Option<NodeId> {
        self.scope(scope).get(tag, name)
    }

    /// First hit of `name` across `tags`, in the order given.
    pub fn select(&self, scope: ScopeId, tags: &[Tag], name: &str) -> Option<NodeId> {
        tags.iter().find_map(|&tag| self.lookup(scope, tag, name))
    }

    pub fn bindings(&self, scope: ScopeId, tag: Tag) -> impl Iterator<Item = (&str, NodeId)> {
        self.scope(scope)
            .iter(tag)
            .map(|(name, node)| (name.as_str(), node))
    }

    /// Creates an open declaration and binds it.
    pub fn open_declaration(
        &mut self,
        scope: ScopeId,
        tag: Tag,
        name: impl Into<EcoString>,
        loc: Loc,
        resolver: impl Resolve + 'static,
        report: &mut Report,
    ) -> NodeId {
        let name = name.into();
        let id = NodeId::from_usize(self.nodes.len());
        self.nodes.push(Node {
            kind: NodeKind::Open(tag),
            loc,
            name: Some(name.clone()),
            scope: None,
            state: State::Open(Box::new(resolver)),
        });
        self.bind(scope, tag, name, id, report);
        id
    }

    /// Closes `decl` if it is still open and returns it.
    ///
    /// Closed nodes are returned unchanged. A declaration that is reached again
    /// while its own resolver runs is a cycle: the re-entrant call gets a fresh
    /// error node and one diagnostic is recorded, the outer resolution goes on.
    pub fn resolve(&mut self, decl: NodeId, report: &mut Report) -> NodeId {
        let node = &mut self.nodes[decl.as_usize()];
        let resolver = match mem::replace(&mut node.state, State::Resolving) {
            State::Open(resolver) => resolver,
            State::Closed => {
                node.state = State::Closed;
                return decl;
            }
            State::Resolving => return self.cycle(decl, report),
        };

        trace!(
            "{} {}",
            "Resolve".bold().bright_white(),
            node.name().unwrap_or("<anonymous>")
        );

        self.stack.push(decl);
        let kind = resolver.resolve(decl, self, report);
        self.stack.pop();

        let node = &mut self.nodes[decl.as_usize()];
        node.kind = kind;
        node.state = State::Closed;
        decl
    }

    fn cycle(&mut self, decl: NodeId, report: &mut Report) -> NodeId {
        let name = EcoString::from(self.name(decl).unwrap_or("<anonymous>"));
        let loc = self.loc(decl);

        let start = self
            .stack
            .iter()
            .position(|&id| id == decl)
            .unwrap_or(0);
        let chain = self.stack[start..]
            .iter()
            .map(|&id| {
                (
                    EcoString::from(self.name(id).unwrap_or("<anonymous>")),
                    self.loc(id),
                )
            })
            .collect();

        debug!("{} {name}", "Cycle".bold().red());

        let error = TreeError::CyclicResolution {
            name: name.clone(),
            loc,
            chain,
        };
        let message = error.to_string();
        report.add_diagnostic(error.into());

        self.add(NodeKind::Error(message.into()), Some(name), loc)
    }

    /// Number of declarations currently being resolved.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Resolves every open declaration reachable from `scope`, descending into
    /// the scopes of modules bound there.
    pub fn resolve_scope(&mut self, scope: ScopeId, report: &mut Report) {
        let mut visited = HashSet::new();
        let mut queue = vec![scope];

        while let Some(scope) = queue.pop() {
            if !visited.insert(scope) {
                continue;
            }

            let current = self.scope(scope);
            let extensions = current
                .tags()
                .filter(|tag| matches!(tag, Tag::Extension(_)));
            let decls = Tag::DECLS
                .into_iter()
                .chain(extensions)
                .flat_map(|tag| current.iter(tag).map(|(_, node)| node))
                .collect::<Vec<_>>();

            for decl in decls {
                self.resolve(decl, report);
            }

            let modules = self
                .scope(scope)
                .iter(Tag::Modules)
                .filter_map(|(_, node)| self.module_scope(node))
                .collect::<Vec<_>>();
            queue.extend(modules.into_iter().rev());
        }
    }

    /// Open declarations left anywhere in the tree.
    pub fn open_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_open()).count()
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        self.node(index)
    }
}

impl Index<ScopeId> for Tree {
    type Output = Scope;

    fn index(&self, index: ScopeId) -> &Self::Output {
        self.scope(index)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use weft_span::{SourceId, Span};

    use super::*;
    use crate::{
        TypeKind,
        print::{PrintOptions, TreePrinter},
    };

    fn loc(n: usize) -> Loc {
        Loc::new(SourceId::from_usize(1), Span::new(n, n + 1))
    }

    fn alias_to(scope: ScopeId, target: impl Into<EcoString>) -> impl Resolve + 'static {
        let target = target.into();
        move |_decl: NodeId, tree: &mut Tree, report: &mut Report| {
            let target = tree
                .lookup(scope, Tag::Types, &target)
                .expect("target is bound");
            let resolved = tree.resolve(target, report);
            NodeKind::Type(TypeKind::Alias(resolved))
        }
    }

    fn cycles(report: &Report) -> usize {
        report.with_code(TreeError::CYCLIC_RESOLUTION).count()
    }

    #[test]
    fn root_module_has_scope() {
        let tree = Tree::new("root");
        let scope = tree.root_scope();

        assert_eq!(tree.name(tree.root()), Some("root"));
        assert_eq!(tree.scope(scope).parent(), None);
        assert_eq!(tree.scope(scope).owner(), Some(tree.root()));
    }

    #[test]
    fn shadowing_diagnoses_once_and_overwrites() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let scope = tree.open_scope(None);

        let first = tree.add(NodeKind::Value { ty: None }, Some("x".into()), loc(0));
        let second = tree.add(NodeKind::Value { ty: None }, Some("x".into()), loc(10));

        assert_eq!(tree.bind(scope, Tag::Values, "x", first, &mut report), None);
        assert_eq!(
            tree.bind(scope, Tag::Values, "x", second, &mut report),
            Some(first)
        );

        let shadows = report
            .with_code(TreeError::SHADOWED_DECLARATION)
            .collect::<Vec<_>>();
        assert_eq!(shadows.len(), 1);
        assert_eq!(shadows[0].loc, loc(10));
        assert_eq!(shadows[0].trace[0].1, loc(0));
        assert!(!report.has_fatal());

        assert_eq!(tree.lookup(scope, Tag::Values, "x"), Some(second));
    }

    #[test]
    fn rebinding_same_node_is_silent() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let scope = tree.open_scope(None);
        let node = tree.add(NodeKind::Value { ty: None }, Some("x".into()), loc(0));

        tree.bind(scope, Tag::Values, "x", node, &mut report);
        tree.bind(scope, Tag::Values, "x", node, &mut report);

        assert!(report.is_empty());
    }

    #[test]
    fn same_name_in_other_tag_is_not_shadowing() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let scope = tree.open_scope(None);
        let value = tree.add(NodeKind::Value { ty: None }, Some("x".into()), loc(0));
        let ty = tree.add(NodeKind::Type(TypeKind::Unit), Some("x".into()), loc(1));

        tree.bind(scope, Tag::Values, "x", value, &mut report);
        tree.bind(scope, Tag::Types, "x", ty, &mut report);

        assert!(report.is_empty());
        assert_eq!(tree.select(scope, &[Tag::Types, Tag::Values], "x"), Some(ty));
        assert_eq!(tree.select(scope, &[Tag::Values, Tag::Types], "x"), Some(value));
    }

    #[test]
    fn lookup_falls_through_to_parents() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let outer = tree.open_scope(None);
        let inner = tree.open_scope(Some(outer));

        let global = tree.add(NodeKind::Value { ty: None }, Some("g".into()), loc(0));
        let outer_x = tree.add(NodeKind::Value { ty: None }, Some("x".into()), loc(1));
        let inner_x = tree.add(NodeKind::Value { ty: None }, Some("x".into()), loc(2));

        tree.bind(outer, Tag::Values, "g", global, &mut report);
        tree.bind(outer, Tag::Values, "x", outer_x, &mut report);
        tree.bind(inner, Tag::Values, "x", inner_x, &mut report);

        assert_eq!(tree.lookup(inner, Tag::Values, "g"), Some(global));
        assert_eq!(tree.lookup(inner, Tag::Values, "x"), Some(inner_x));
        assert_eq!(tree.lookup(outer, Tag::Values, "x"), Some(outer_x));
        assert_eq!(tree.lookup_local(inner, Tag::Values, "g"), None);
        assert_eq!(tree.lookup(inner, Tag::Values, "missing"), None);
        // different scopes never shadow each other
        assert!(report.is_empty());
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let scope = tree.root_scope();
        let calls = Rc::new(Cell::new(0));

        let counter = calls.clone();
        let decl = tree.open_declaration(
            scope,
            Tag::Types,
            "T",
            loc(0),
            move |_decl: NodeId, _tree: &mut Tree, _report: &mut Report| {
                counter.set(counter.get() + 1);
                NodeKind::Type(TypeKind::Bool)
            },
            &mut report,
        );

        assert!(tree.is_open(decl));
        assert_eq!(tree.kind(decl), &NodeKind::Open(Tag::Types));

        let first = tree.resolve(decl, &mut report);
        let second = tree.resolve(decl, &mut report);

        assert_eq!(first, decl);
        assert_eq!(second, decl);
        assert_eq!(calls.get(), 1);
        assert!(!tree.is_open(decl));
        assert_eq!(tree.kind(decl), &NodeKind::Type(TypeKind::Bool));
        assert!(report.is_empty());
    }

    #[test]
    fn mutual_alias_is_a_cycle() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let scope = tree.root_scope();

        let a = tree.open_declaration(scope, Tag::Types, "A", loc(0), alias_to(scope, "B"), &mut report);
        let b = tree.open_declaration(scope, Tag::Types, "B", loc(5), alias_to(scope, "A"), &mut report);

        assert_eq!(tree.resolve(a, &mut report), a);

        assert_eq!(cycles(&report), 1);
        assert_eq!(tree.depth(), 0);
        assert!(!tree.is_open(a));
        assert!(!tree.is_open(b));

        // the re-entrant lookup of `A` from inside `B` got an error node
        let NodeKind::Type(TypeKind::Alias(inner)) = *tree.kind(b) else {
            panic!("B should be an alias");
        };
        assert!(tree.is_error(inner));
        assert_ne!(inner, a);
        assert_eq!(tree.kind(a), &NodeKind::Type(TypeKind::Alias(b)));

        let diag = report.with_code(TreeError::CYCLIC_RESOLUTION).next().unwrap();
        assert_eq!(diag.loc, loc(0));
        assert_eq!(diag.trace.len(), 2);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let scope = tree.root_scope();

        let a = tree.open_declaration(scope, Tag::Types, "A", loc(0), alias_to(scope, "A"), &mut report);
        tree.resolve(a, &mut report);

        assert_eq!(cycles(&report), 1);
        assert!(report.has_fatal());
    }

    #[test]
    fn mutual_pointers_close_without_cycle() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let scope = tree.root_scope();

        let pointer_to = |target: &'static str| {
            move |_decl: NodeId, tree: &mut Tree, _report: &mut Report| {
                let target = tree.lookup(scope, Tag::Types, target).expect("bound");
                NodeKind::Type(TypeKind::Pointer(target))
            }
        };

        let t = tree.open_declaration(scope, Tag::Types, "T", loc(0), pointer_to("U"), &mut report);
        let u = tree.open_declaration(scope, Tag::Types, "U", loc(1), pointer_to("T"), &mut report);

        tree.resolve_scope(scope, &mut report);

        assert!(report.is_empty());
        assert_eq!(tree.kind(t), &NodeKind::Type(TypeKind::Pointer(u)));
        assert_eq!(tree.kind(u), &NodeKind::Type(TypeKind::Pointer(t)));
    }

    const DEPTH: usize = 1000;

    fn chain(tree: &mut Tree, report: &mut Report, last_target: &str) -> Vec<NodeId> {
        let scope = tree.root_scope();
        (0..DEPTH)
            .map(|i| {
                let target = if i + 1 == DEPTH {
                    last_target.to_owned()
                } else {
                    format!("t{}", i + 1)
                };
                tree.open_declaration(
                    scope,
                    Tag::Types,
                    format!("t{i}"),
                    loc(i),
                    alias_to(scope, target),
                    report,
                )
            })
            .collect()
    }

    #[test]
    fn deep_acyclic_chain_resolves() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let scope = tree.root_scope();

        let unit = tree.add(NodeKind::Type(TypeKind::Unit), Some("unit".into()), loc(0));
        tree.bind(scope, Tag::Types, "unit", unit, &mut report);
        let decls = chain(&mut tree, &mut report, "unit");

        tree.resolve(decls[0], &mut report);

        assert!(report.is_empty());
        assert_eq!(tree.open_count(), 0);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.kind(decls[DEPTH - 1]), &NodeKind::Type(TypeKind::Alias(unit)));
    }

    #[test]
    fn deep_cycle_is_reported_once() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();

        let decls = chain(&mut tree, &mut report, "t0");

        tree.resolve(decls[0], &mut report);

        assert_eq!(cycles(&report), 1);
        assert_eq!(tree.open_count(), 0);
        assert_eq!(tree.depth(), 0);
        let diag = report.with_code(TreeError::CYCLIC_RESOLUTION).next().unwrap();
        assert_eq!(diag.trace.len(), DEPTH);
    }

    #[test]
    fn resolve_scope_descends_into_modules() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let root = tree.root_scope();

        let module = tree.module(Some(root), "m", loc(0));
        tree.bind(root, Tag::Modules, "m", module, &mut report);
        let inner = tree.module_scope(module).unwrap();

        let decl = tree.open_declaration(
            inner,
            Tag::Values,
            "x",
            loc(1),
            |_decl: NodeId, _tree: &mut Tree, _report: &mut Report| NodeKind::Value { ty: None },
            &mut report,
        );
        let ext = tree.open_declaration(
            inner,
            Tag::Extension(0),
            "attr",
            loc(2),
            |_decl: NodeId, _tree: &mut Tree, _report: &mut Report| NodeKind::Type(TypeKind::Unit),
            &mut report,
        );

        tree.resolve_scope(root, &mut report);

        assert!(!tree.is_open(decl));
        assert!(!tree.is_open(ext));
        assert_eq!(tree.open_count(), 0);
    }

    #[test]
    fn raise_records_and_returns_error_node() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();

        let node = tree.raise(Diagnostic::error(loc(3), "unresolved `x`"), &mut report);

        assert!(tree.is_error(node));
        assert_eq!(tree.kind(node), &NodeKind::Error("unresolved `x`".into()));
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn prints_module() {
        let mut tree = Tree::new("root");
        let mut report = Report::new();
        let root = tree.root_scope();
        let module = tree.module(Some(root), "M", loc(0));
        let scope = tree.module_scope(module).unwrap();

        let u = tree.add(NodeKind::Type(TypeKind::Bool), Some("U".into()), loc(1));
        tree.bind(scope, Tag::Types, "U", u, &mut report);
        let t = tree.add(NodeKind::Type(TypeKind::Pointer(u)), Some("T".into()), loc(2));
        tree.bind(scope, Tag::Types, "T", t, &mut report);
        let x = tree.add(NodeKind::Value { ty: Some(t) }, Some("x".into()), loc(3));
        tree.bind(scope, Tag::Values, "x", x, &mut report);

        let out = TreePrinter::new(&tree, PrintOptions::default()).render(module);

        assert_eq!(out, "module M\n  type U = bool\n  type T = *M.U\n  let x: M.T\n");
    }
}
