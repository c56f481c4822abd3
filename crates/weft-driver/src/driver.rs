use camino::Utf8Path;
use derive_more::Display;
use ecow::EcoString;
use semver::Version;

use weft_span::{Report, SourceId};
use weft_tree::{NodeId, ScopeId, Tree};

use crate::{DriverError, GuestAst, ModulePath, context::Context, lifetime::Contexts};

/// The three global stages, in the order they run.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[display("forward declarations")]
    ForwardDecls,
    #[display("import resolution")]
    ProcessImports,
    #[display("module compilation")]
    CompileModule,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Self::ForwardDecls => Some(Self::ProcessImports),
            Self::ProcessImports => Some(Self::CompileModule),
            Self::CompileModule => None,
        }
    }
}

/// Identity of a language driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    /// Stable id, also the language hint users pass.
    pub id: EcoString,
    pub name: EcoString,
    pub version: Version,
    /// File extensions without the leading dot.
    pub extensions: Vec<EcoString>,
}

impl DriverInfo {
    pub fn new<'e>(
        id: impl Into<EcoString>,
        name: impl Into<EcoString>,
        version: Version,
        extensions: impl IntoIterator<Item = &'e str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version,
            extensions: extensions
                .into_iter()
                .map(|ext| EcoString::from(ext.trim_start_matches('.')))
                .collect(),
        }
    }
}

/// A pluggable language front end.
///
/// Callbacks are invoked in declaration order. `create` and `destroy` run once
/// per [`Lifetime`](crate::Lifetime), the others once per context. The stage
/// callbacks of one stage run for every context before any callback of the
/// next stage.
pub trait Driver {
    fn info(&self) -> &DriverInfo;

    /// Called when a lifetime is created. May register compiled modules.
    fn create(&self, cx: &mut CreateCx<'_>) {
        let _ = cx;
    }

    /// Scans `text` into the driver's AST.
    fn preparse(&self, cx: &mut ParseCx<'_>, text: &str) -> Result<Box<dyn GuestAst>, DriverError>;

    /// Decides the module path of a parsed source.
    fn postparse(&self, cx: &mut ParseCx<'_>, ast: &mut dyn GuestAst)
    -> Result<ModulePath, DriverError>;

    fn forward_decls(&self, cx: &mut StageCx<'_>) -> Result<(), DriverError>;

    fn process_imports(&self, cx: &mut StageCx<'_>) -> Result<(), DriverError>;

    fn compile_module(&self, cx: &mut StageCx<'_>) -> Result<(), DriverError>;

    /// Called once when the lifetime ends.
    fn destroy(&self, cx: &mut DestroyCx<'_>) {
        let _ = cx;
    }
}

/// Handed to [`Driver::create`].
pub struct CreateCx<'a> {
    pub tree: &'a mut Tree,
    pub report: &'a mut Report,
    pub(crate) language: NodeId,
    pub(crate) compiled: Vec<(ModulePath, NodeId)>,
}

impl CreateCx<'_> {
    /// The driver's builtin module.
    pub fn language(&self) -> NodeId {
        self.language
    }

    pub fn language_scope(&self) -> ScopeId {
        match self.tree.module_scope(self.language) {
            Some(scope) => scope,
            None => unreachable!("language nodes are modules"),
        }
    }

    /// Registers an already compiled module. Stages skip it, but other
    /// modules find it through `find_module`.
    pub fn add_compiled(&mut self, path: ModulePath, root: NodeId) {
        self.compiled.push((path, root));
    }
}

/// Handed to [`Driver::preparse`] and [`Driver::postparse`].
pub struct ParseCx<'a> {
    pub path: &'a Utf8Path,
    pub source: SourceId,
    pub report: &'a mut Report,
}

/// Handed to each stage callback.
///
/// Grants mutable access to the shared tree and report, and read-only access to
/// every registered context.
pub struct StageCx<'a> {
    pub tree: &'a mut Tree,
    pub report: &'a mut Report,
    pub(crate) contexts: &'a Contexts,
    pub(crate) path: &'a ModulePath,
    pub(crate) source: Option<SourceId>,
    pub(crate) ast: &'a mut Box<dyn GuestAst>,
    pub(crate) root: &'a mut Option<NodeId>,
    pub(crate) language: NodeId,
    pub(crate) stage: Stage,
}

impl StageCx<'_> {
    pub fn path(&self) -> &ModulePath {
        self.path
    }

    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The driver's builtin module, parent of every module it opens.
    pub fn language(&self) -> NodeId {
        self.language
    }

    pub fn language_scope(&self) -> ScopeId {
        match self.tree.module_scope(self.language) {
            Some(scope) => scope,
            None => unreachable!("language nodes are modules"),
        }
    }

    pub fn ast(&self) -> &dyn GuestAst {
        &**self.ast
    }

    pub fn ast_mut(&mut self) -> &mut dyn GuestAst {
        &mut **self.ast
    }

    pub fn root(&self) -> Option<NodeId> {
        *self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        *self.root = Some(root);
    }

    /// Another registered module. The current context is found too, but its
    /// AST is checked out while its stage runs.
    pub fn find_module(&self, path: &ModulePath) -> Option<&Context> {
        self.contexts.find(path)
    }

    /// Borrows the AST alongside the tree, report and registry.
    pub fn split(&mut self) -> StageParts<'_> {
        StageParts {
            ast: &mut **self.ast,
            tree: &mut *self.tree,
            report: &mut *self.report,
            contexts: self.contexts,
        }
    }
}

/// Disjoint borrows of a [`StageCx`].
pub struct StageParts<'s> {
    pub ast: &'s mut dyn GuestAst,
    pub tree: &'s mut Tree,
    pub report: &'s mut Report,
    pub contexts: &'s Contexts,
}

/// Handed to [`Driver::destroy`].
pub struct DestroyCx<'a> {
    pub tree: &'a Tree,
    pub report: &'a mut Report,
}
