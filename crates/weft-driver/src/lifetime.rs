use camino::Utf8Path;
use ecow::EcoString;
use indexmap::IndexMap;
use log::{debug, info, trace};
use owo_colors::OwoColorize;
use std::rc::Rc;

use weft_span::{Issue, Loc, Report, SourceId, SourceManager};
use weft_tree::{NodeId, Tag, Tree};

use crate::{
    Context, ContextId, ContextState, CreateCx, DestroyCx, Driver, DriverError, GuestAst,
    LifetimeError, LifetimeOptions, Mediator, ModulePath, ParseCx, PluginCx, Stage, StageCx,
};

/// Contexts of a lifetime, addressable by id and by module path.
#[derive(Debug, Default)]
pub struct Contexts {
    contexts: Vec<Context>,
    paths: IndexMap<ModulePath, ContextId>,
}

impl Contexts {
    pub fn find(&self, path: &ModulePath) -> Option<&Context> {
        self.paths
            .get(path)
            .map(|id| &self.contexts[id.as_usize()])
    }

    pub fn get(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(id.as_usize())
    }

    /// Contexts in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn insert(&mut self, context: Context) {
        self.paths.insert(context.path().clone(), context.id());
        self.contexts.push(context);
    }

    fn next_id(&self) -> ContextId {
        ContextId::from_usize(self.contexts.len())
    }
}

/// One compilation run.
///
/// Owns every context, the shared tree and the report. Sources are added
/// first, then the three stages run in order, each across all contexts.
/// Dropping the lifetime releases all of it and lets every driver clean up.
pub struct Lifetime<'m> {
    mediator: &'m Mediator,
    options: LifetimeOptions,
    tree: Tree,
    report: Report,
    contexts: Contexts,
    /// Builtin module of each driver, by driver id.
    languages: IndexMap<EcoString, NodeId>,
    next_stage: Option<Stage>,
    started: bool,
    destroyed: bool,
}

impl<'m> Lifetime<'m> {
    pub fn new(mediator: &'m Mediator, options: LifetimeOptions) -> Self {
        let tree = Tree::with_capacity("<root>", options.capacity);
        Self::with_tree(mediator, options, tree)
    }

    /// Creates a lifetime that allocates into `tree`.
    pub fn with_tree(mediator: &'m Mediator, options: LifetimeOptions, tree: Tree) -> Self {
        let report = Report::with_threshold(options.threshold());

        let mut lifetime = Self {
            mediator,
            options,
            tree,
            report,
            contexts: Contexts::default(),
            languages: IndexMap::new(),
            next_stage: Some(Stage::ForwardDecls),
            started: false,
            destroyed: false,
        };

        for plugin in mediator.plugins() {
            trace!("{} plugin {}", "Create".bold().bright_white(), plugin.info().id);
            plugin.create(&mut lifetime.plugin_cx());
        }
        for driver in mediator.drivers() {
            lifetime.create(driver.clone());
        }

        lifetime
    }

    fn plugin_cx(&mut self) -> PluginCx<'_> {
        PluginCx {
            tree: &self.tree,
            report: &mut self.report,
        }
    }

    fn create(&mut self, driver: Rc<dyn Driver>) {
        let id = driver.info().id.clone();
        let root_scope = self.tree.root_scope();
        let name = format!("{}.{id}", ModulePath::LANGUAGE_ROOT);

        let language = self.tree.module(Some(root_scope), name.as_str(), Loc::builtin());
        self.tree
            .bind(root_scope, Tag::Modules, name, language, &mut self.report);
        self.languages.insert(id.clone(), language);

        let mut cx = CreateCx {
            tree: &mut self.tree,
            report: &mut self.report,
            language,
            compiled: Vec::new(),
        };
        driver.create(&mut cx);
        let compiled = cx.compiled;

        for (path, root) in compiled {
            if self.contexts.find(&path).is_some() {
                let error = LifetimeError::DuplicateModule {
                    path,
                    source_path: SourceManager::BUILTIN_PATH.into(),
                    existing: SourceManager::BUILTIN_PATH.into(),
                };
                self.report.add_issue(Issue::from(&error));
                continue;
            }

            trace!("{} compiled module {path}", "Create".bold().bright_white());
            self.tree
                .bind(root_scope, Tag::Modules, path.to_string(), root, &mut self.report);
            let context = Context::compiled(self.contexts.next_id(), path, driver.clone(), root);
            self.contexts.insert(context);
        }
    }

    pub fn mediator(&self) -> &'m Mediator {
        self.mediator
    }

    pub fn options(&self) -> &LifetimeOptions {
        &self.options
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut Report {
        &mut self.report
    }

    /// Moves the report out, leaving an empty one with the same threshold.
    pub fn take_report(&mut self) -> Report {
        let empty = Report::with_threshold(self.report.threshold());
        std::mem::replace(&mut self.report, empty)
    }

    pub fn contexts(&self) -> &Contexts {
        &self.contexts
    }

    /// Builtin module of the driver with the given id.
    pub fn language(&self, driver: &str) -> Option<NodeId> {
        self.languages.get(driver).copied()
    }

    /// Scans a loaded source and registers it under the module path its
    /// driver chooses.
    ///
    /// The driver is picked by `language` (a driver id) if given, otherwise
    /// by the extension of `path`. Every error is also recorded in the report.
    ///
    /// # Panics
    ///
    /// If a stage has already run.
    pub fn add_source(
        &mut self,
        path: &Utf8Path,
        source: SourceId,
        text: &str,
        language: Option<&str>,
    ) -> Result<ContextId, LifetimeError> {
        assert!(
            !self.started,
            "sources cannot be added once stages have started (adding `{path}`)"
        );

        let result = self.add_source_inner(path, source, text, language);
        if let Err(error) = &result {
            self.report.add_issue(Issue::from(error));
        }
        result
    }

    fn add_source_inner(
        &mut self,
        path: &Utf8Path,
        source: SourceId,
        text: &str,
        language: Option<&str>,
    ) -> Result<ContextId, LifetimeError> {
        let driver = match language {
            Some(id) => self
                .mediator
                .driver(id)
                .ok_or_else(|| LifetimeError::UnknownLanguage(id.into()))?,
            None => self
                .mediator
                .driver_for_path(path)
                .ok_or_else(|| LifetimeError::UnknownExtension(path.to_owned()))?,
        }
        .clone();

        debug!(
            "{} {path} with {}",
            "Source".bold().bright_white(),
            driver.info().name
        );

        let mut cx = ParseCx {
            path,
            source,
            report: &mut self.report,
        };
        let parsed = driver.preparse(&mut cx, text).and_then(|mut ast| {
            let module = driver.postparse(&mut cx, &mut *ast)?;
            Ok((ast, module))
        });
        let (ast, module) = match parsed {
            Ok(parsed) => parsed,
            Err(error) => {
                if let Some(reason) = error.reason() {
                    self.report.add_issue(Issue::error(reason.as_str()));
                }
                return Err(LifetimeError::ParseFailure(path.to_owned()));
            }
        };

        if module.is_reserved() {
            return Err(LifetimeError::ReservedModule {
                path: module,
                source_path: path.to_owned(),
            });
        }
        if let Some(existing) = self.contexts.find(&module) {
            return Err(LifetimeError::DuplicateModule {
                path: module,
                source_path: path.to_owned(),
                existing: existing
                    .file()
                    .unwrap_or(Utf8Path::new(SourceManager::BUILTIN_PATH))
                    .to_owned(),
            });
        }

        let id = self.contexts.next_id();
        trace!("{} {module} as context {id}", "Register".bold().bright_white());
        self.contexts
            .insert(Context::parsed(id, module, driver, path, source, ast));
        Ok(id)
    }

    /// Replaces the AST of the module at `path` before any stage runs.
    ///
    /// # Panics
    ///
    /// If a stage has already run.
    pub fn update(&mut self, path: &ModulePath, ast: Box<dyn GuestAst>) -> bool {
        assert!(!self.started, "contexts cannot be updated once stages have started");

        let Some(&id) = self.contexts.paths.get(path) else {
            return false;
        };
        let context = &mut self.contexts.contexts[id.as_usize()];
        if context.is_compiled() {
            return false;
        }
        context.update(ast, None);
        true
    }

    pub fn find_module(&self, path: &ModulePath) -> Option<&Context> {
        self.contexts.find(path)
    }

    /// The stage that runs next, `None` once all have run.
    pub fn next_stage(&self) -> Option<Stage> {
        self.next_stage
    }

    /// Runs `stage` for every context in registration order.
    ///
    /// Compiled contexts and contexts whose earlier stage failed are skipped.
    /// A failing context is recorded and the stage goes on with the others.
    /// Plugins hear about the stage before and after.
    ///
    /// # Panics
    ///
    /// If `stage` is not the next stage due.
    pub fn run_stage(&mut self, stage: Stage) {
        assert_eq!(
            self.next_stage,
            Some(stage),
            "stages must run once each, in order"
        );
        self.started = true;
        self.next_stage = stage.next();

        let mediator = self.mediator;
        for plugin in mediator.plugins() {
            plugin.stage_started(stage, &mut self.plugin_cx());
        }

        self.run_contexts(stage);

        for plugin in mediator.plugins() {
            plugin.stage_finished(stage, &mut self.plugin_cx());
        }
    }

    fn run_contexts(&mut self, stage: Stage) {
        if !self.options.continue_on_error && self.report.has_fatal() {
            info!("{} {stage} after fatal errors", "Skip".bold().yellow());
            return;
        }

        info!("{} {stage}", "Stage".bold().bright_white());

        for index in 0..self.contexts.len() {
            let context = &mut self.contexts.contexts[index];
            if context.is_compiled() || context.state.is_failed() {
                continue;
            }

            let Some(mut ast) = context.ast.take() else {
                unreachable!("parsed contexts own an AST outside of their stage");
            };
            let mut root = context.root;
            let driver = context.driver().clone();
            let language = self.languages[&driver.info().id];
            let source = context.source();

            let result = {
                let context = &self.contexts.contexts[index];
                let mut cx = StageCx {
                    tree: &mut self.tree,
                    report: &mut self.report,
                    contexts: &self.contexts,
                    path: context.path(),
                    source,
                    ast: &mut ast,
                    root: &mut root,
                    language,
                    stage,
                };
                trace!("{} {} ({stage})", "Enter".bold().bright_white(), context.path());

                match stage {
                    Stage::ForwardDecls => driver.forward_decls(&mut cx),
                    Stage::ProcessImports => driver.process_imports(&mut cx),
                    Stage::CompileModule => driver.compile_module(&mut cx),
                }
            };

            let context = &mut self.contexts.contexts[index];
            context.ast = Some(ast);
            if context.root.is_none() {
                if let Some(root) = root {
                    let root_scope = self.tree.root_scope();
                    let name = context.path().to_string();
                    self.tree
                        .bind(root_scope, Tag::Modules, name, root, &mut self.report);
                }
            }
            context.root = root;

            match result {
                Ok(()) => context.state = ContextState::after(stage),
                Err(error) => {
                    context.state = ContextState::Failed(stage);
                    let failure = stage_failure(&driver, stage, context.path(), &error);
                    debug!("{} {failure}", "Failed".bold().red());
                    self.report.add_issue(Issue::from(&failure));
                }
            }
        }
    }

    /// Runs every stage that has not run yet.
    pub fn run_all(&mut self) {
        while let Some(stage) = self.next_stage {
            self.run_stage(stage);
        }
    }

    /// Forces every declaration still open anywhere below the root.
    pub fn resolve_all(&mut self) {
        let root = self.tree.root_scope();
        self.tree.resolve_scope(root, &mut self.report);
    }

    /// Modules with a tree root, in registration order.
    pub fn modules(&self) -> impl Iterator<Item = (&ModulePath, NodeId)> {
        self.contexts
            .iter()
            .filter_map(|context| context.root().map(|root| (context.path(), root)))
    }

    /// Whether the run has failed at the configured threshold.
    pub fn is_fatal(&self) -> bool {
        self.report.has_fatal()
    }

    /// Lets every driver, then every plugin, clean up. Also happens on drop.
    pub fn finish(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        let mediator = self.mediator;
        for driver in mediator.drivers() {
            let mut cx = DestroyCx {
                tree: &self.tree,
                report: &mut self.report,
            };
            driver.destroy(&mut cx);
        }
        for plugin in mediator.plugins() {
            plugin.destroy(&mut self.plugin_cx());
        }
    }
}

impl Drop for Lifetime<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

fn stage_failure(
    driver: &Rc<dyn Driver>,
    stage: Stage,
    path: &ModulePath,
    error: &DriverError,
) -> LifetimeError {
    LifetimeError::DriverStageFailure {
        driver: driver.info().id.clone(),
        stage,
        path: path.clone(),
        reason: error.reason(),
    }
}
