use log::{debug, trace};
use owo_colors::OwoColorize;
use semver::Version;

use weft_driver::{
    CreateCx, Driver, DriverError, DriverInfo, GuestAst, ModulePath, ParseCx, StageCx, StageParts,
};
use weft_span::Loc;
use weft_tree::{NodeKind, ScopeId, Tag, TypeKind};

use crate::{
    ast::{DeclKind, ToyAst},
    error::ToyError,
    lexer::{TokenizeResult, tokenize},
    parser::{ParseResult, parse},
    resolve::DeclResolver,
};

/// Types every toy module sees through the language scope.
pub fn builtins() -> [(&'static str, TypeKind); 4] {
    [
        ("unit", TypeKind::Unit),
        ("bool", TypeKind::Bool),
        (
            "int",
            TypeKind::Integer {
                signed: true,
                bits: 32,
            },
        ),
        (
            "uint",
            TypeKind::Integer {
                signed: false,
                bits: 32,
            },
        ),
    ]
}

/// Driver for `.toy` and `.lang` files.
#[derive(Debug, Clone)]
pub struct ToyDriver {
    info: DriverInfo,
}

impl ToyDriver {
    pub const ID: &'static str = "toy";

    pub fn new() -> Self {
        Self {
            info: DriverInfo::new(
                Self::ID,
                "Toy",
                Version::new(0, 1, 0),
                ["toy", "lang"],
            ),
        }
    }
}

impl Default for ToyDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn toy_ast(ast: &dyn GuestAst) -> Result<&ToyAst, DriverError> {
    ast.downcast_ref::<ToyAst>()
        .ok_or_else(|| DriverError::custom("context does not hold a toy AST"))
}

fn module_scope(cx: &StageCx<'_>) -> Result<ScopeId, DriverError> {
    cx.root()
        .and_then(|root| cx.tree.module_scope(root))
        .ok_or_else(|| DriverError::custom("module was not forward declared"))
}

impl Driver for ToyDriver {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    fn create(&self, cx: &mut CreateCx<'_>) {
        let scope = cx.language_scope();

        for (name, kind) in builtins() {
            let node = cx
                .tree
                .add(NodeKind::Type(kind), Some(name.into()), Loc::builtin());
            cx.tree.bind(scope, Tag::Types, name, node, cx.report);
        }
    }

    fn preparse(&self, cx: &mut ParseCx<'_>, text: &str) -> Result<Box<dyn GuestAst>, DriverError> {
        let TokenizeResult { tokens, errors } = tokenize(text, cx.source);
        let mut failed = !errors.is_empty();
        for error in errors {
            cx.report.add_diagnostic(error);
        }

        let Some(tokens) = tokens else {
            return Err(DriverError::Reported);
        };

        let ParseResult { ast, errors } = parse(&tokens, cx.source);
        failed |= !errors.is_empty();
        for error in errors {
            cx.report.add_diagnostic(error);
        }

        if failed {
            debug!("{} {}", "Syntax errors".bold().red(), cx.path);
            return Err(DriverError::Reported);
        }

        trace!("{} {} declarations", "Parsed".bold().bright_white(), ast.decls.len());
        Ok(Box::new(ast))
    }

    fn postparse(
        &self,
        cx: &mut ParseCx<'_>,
        ast: &mut dyn GuestAst,
    ) -> Result<ModulePath, DriverError> {
        let ast = toy_ast(ast)?;

        let path = match &ast.module {
            Some(path) => ModulePath::new(path.segments.iter().cloned()),
            None => {
                let stem = cx
                    .path
                    .file_stem()
                    .ok_or_else(|| DriverError::custom(format!("`{}` has no file name", cx.path)))?;
                ModulePath::single(stem)
            }
        };

        path.map_err(|error| DriverError::custom(error.to_string()))
    }

    fn forward_decls(&self, cx: &mut StageCx<'_>) -> Result<(), DriverError> {
        let parent = cx.language_scope();
        let name = cx.path().to_string();
        let source = cx.source();

        let StageParts { ast, tree, report, .. } = cx.split();
        let ast = toy_ast(ast)?;

        let loc = match (&ast.module, source) {
            (Some(path), _) => path.loc,
            (None, Some(source)) => Loc::new(source, Default::default()),
            (None, None) => Loc::builtin(),
        };
        let module = tree.module(Some(parent), name, loc);
        let Some(scope) = tree.module_scope(module) else {
            unreachable!("fresh modules own a scope");
        };

        for decl in &ast.decls {
            let tag = match decl.kind {
                DeclKind::Type(_) => Tag::Types,
                DeclKind::Let(_) => Tag::Values,
                DeclKind::Proc { .. } => Tag::Procs,
            };
            let resolver = DeclResolver {
                scope,
                kind: decl.kind.clone(),
            };
            tree.open_declaration(scope, tag, decl.name.clone(), decl.loc, resolver, report);
        }

        cx.set_root(module);
        Ok(())
    }

    fn process_imports(&self, cx: &mut StageCx<'_>) -> Result<(), DriverError> {
        let scope = module_scope(cx)?;
        let imports = toy_ast(cx.ast())?.imports.clone();

        for import in imports {
            let path = match ModulePath::new(import.segments.iter().cloned()) {
                Ok(path) => path,
                Err(error) => return Err(DriverError::custom(error.to_string())),
            };

            if &path == cx.path() {
                let error = ToyError::SelfImport {
                    path: path.to_string().into(),
                    loc: import.loc,
                };
                cx.report.add_diagnostic(error.into());
                continue;
            }

            let target = cx.find_module(&path).and_then(|context| context.root());
            let Some(target) = target else {
                let error = ToyError::UnresolvedImport {
                    path: path.to_string().into(),
                    loc: import.loc,
                };
                cx.report.add_diagnostic(error.into());
                continue;
            };

            trace!("{} {path} into {}", "Import".bold().bright_white(), cx.path());
            let node = cx.tree.add(
                NodeKind::Import { module: target },
                Some(path.last().into()),
                import.loc,
            );
            cx.tree
                .bind(scope, Tag::Imports, path.last(), node, cx.report);
        }

        Ok(())
    }

    fn compile_module(&self, cx: &mut StageCx<'_>) -> Result<(), DriverError> {
        let scope = module_scope(cx)?;
        cx.tree.resolve_scope(scope, cx.report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info() {
        let driver = ToyDriver::new();

        assert_eq!(driver.info().id, ToyDriver::ID);
        assert_eq!(driver.info().extensions, ["toy", "lang"]);
    }
}
