use camino::{Utf8Path, Utf8PathBuf};
use std::{any::Any, fmt, rc::Rc};

use weft_span::SourceId;
use weft_tree::NodeId;
use weft_utils::define_id;

use crate::{Driver, ModulePath, Stage};

define_id!(ContextId);

/// A driver's parsed representation of one source.
///
/// The core only moves it between the driver's own callbacks; drivers get
/// their concrete type back with [`downcast_ref`](dyn GuestAst::downcast_ref).
pub trait GuestAst: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + fmt::Debug> GuestAst for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn GuestAst {
    pub fn is<T: GuestAst>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: GuestAst>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: GuestAst>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Where a context is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    /// Registered by a driver's `create` with a finished tree and no source.
    Compiled,
    Parsed,
    ForwardDeclared,
    ImportsResolved,
    Finished,
    /// A stage failed; later stages are skipped.
    Failed(Stage),
}

impl ContextState {
    /// State after successfully running `stage`.
    pub(crate) fn after(stage: Stage) -> Self {
        match stage {
            Stage::ForwardDecls => Self::ForwardDeclared,
            Stage::ProcessImports => Self::ImportsResolved,
            Stage::CompileModule => Self::Finished,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One translation unit registered in a [`Lifetime`](crate::Lifetime).
pub struct Context {
    id: ContextId,
    path: ModulePath,
    driver: Rc<dyn Driver>,
    file: Option<Utf8PathBuf>,
    source: Option<SourceId>,
    pub(crate) ast: Option<Box<dyn GuestAst>>,
    pub(crate) root: Option<NodeId>,
    pub(crate) state: ContextState,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("driver", &self.driver.info().id)
            .field("file", &self.file)
            .field("source", &self.source)
            .field("ast", &self.ast)
            .field("root", &self.root)
            .field("state", &self.state)
            .finish()
    }
}

impl Context {
    pub(crate) fn parsed(
        id: ContextId,
        path: ModulePath,
        driver: Rc<dyn Driver>,
        file: &Utf8Path,
        source: SourceId,
        ast: Box<dyn GuestAst>,
    ) -> Self {
        Self {
            id,
            path,
            driver,
            file: Some(file.to_owned()),
            source: Some(source),
            ast: Some(ast),
            root: None,
            state: ContextState::Parsed,
        }
    }

    pub(crate) fn compiled(
        id: ContextId,
        path: ModulePath,
        driver: Rc<dyn Driver>,
        root: NodeId,
    ) -> Self {
        Self {
            id,
            path,
            driver,
            file: None,
            source: None,
            ast: None,
            root: Some(root),
            state: ContextState::Compiled,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn path(&self) -> &ModulePath {
        &self.path
    }

    pub fn driver(&self) -> &Rc<dyn Driver> {
        &self.driver
    }

    /// The file this context was scanned from, `None` for compiled contexts.
    pub fn file(&self) -> Option<&Utf8Path> {
        self.file.as_deref()
    }

    /// `None` for compiled contexts.
    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    /// The guest AST. `None` for compiled contexts, and for the context whose
    /// stage is currently running.
    pub fn ast(&self) -> Option<&dyn GuestAst> {
        self.ast.as_deref()
    }

    /// The module node, once `forward_decls` installed one.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_compiled(&self) -> bool {
        self.state == ContextState::Compiled
    }

    /// Replaces the AST and tree root wholesale.
    pub(crate) fn update(&mut self, ast: Box<dyn GuestAst>, root: Option<NodeId>) {
        self.ast = Some(ast);
        self.root = root;
    }
}
