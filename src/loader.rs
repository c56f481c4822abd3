//! Turns command line paths into registered sources.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use log::{debug, trace};
use owo_colors::OwoColorize;
use std::io;

use weft_driver::{Lifetime, Mediator};
use weft_span::SourceManager;
use weft_utils::io::{DirWalker, FileSystem};

/// Expands `paths` into files.
///
/// Files are taken as given, even without a known extension, so the lifetime
/// can report them. Directories are walked and only files some driver claims
/// are kept, unless `language` forces one driver for everything. Hidden files
/// are never picked up from directories. A file reached more than once is
/// kept at its first position.
pub fn discover(
    io: &impl FileSystem,
    mediator: &Mediator,
    paths: &[Utf8PathBuf],
    language: Option<&str>,
) -> io::Result<Vec<Utf8PathBuf>> {
    let mut files = IndexSet::new();

    for path in paths {
        if io.is_dir(path) {
            let found = DirWalker::new(path.clone()).collect_files(io, |file| {
                !is_hidden(file) && (language.is_some() || mediator.driver_for_path(file).is_some())
            })?;
            debug!(
                "{} {} files in {path}",
                "Discovered".bold().bright_white(),
                found.len()
            );
            files.extend(found.iter().map(|file| normalize(file)));
        } else if io.is_file(path) {
            files.insert(normalize(path));
        } else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("`{path}` does not exist"),
            ));
        }
    }

    Ok(files.into_iter().collect())
}

/// Reads every file into `sources` and registers it with `lifetime`.
///
/// Files a driver rejects are recorded in the lifetime's report and skipped.
/// Returns how many were registered.
pub fn load(
    io: &impl FileSystem,
    sources: &mut SourceManager,
    lifetime: &mut Lifetime<'_>,
    files: &[Utf8PathBuf],
    language: Option<&str>,
) -> io::Result<usize> {
    let mut registered = 0;

    for file in files {
        let id = sources.fetch(file, io)?;
        let text = sources.text(id).unwrap_or_default();

        trace!("{} {file}", "Load".bold().bright_white());
        if lifetime.add_source(file, id, text, language).is_ok() {
            registered += 1;
        }
    }

    Ok(registered)
}

/// Convenience for [`discover`] followed by [`load`].
pub fn load_paths(
    io: &impl FileSystem,
    sources: &mut SourceManager,
    lifetime: &mut Lifetime<'_>,
    paths: &[Utf8PathBuf],
    language: Option<&str>,
) -> io::Result<usize> {
    let files = discover(io, lifetime.mediator(), paths, language)?;
    load(io, sources, lifetime, &files, language)
}

/// Drops `.` components, so `./a.toy` and `a.toy` name the same file.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|component| *component != Utf8Component::CurDir)
        .collect()
}

fn is_hidden(path: &Utf8Path) -> bool {
    path.file_name().is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_driver::{LifetimeError, LifetimeOptions};
    use weft_tree::print::PrintOptions;
    use weft_utils::io::MockFileSystem;

    fn project() -> MockFileSystem {
        let mut io = MockFileSystem::new();
        io.add_file("/proj/a.toy", "module A; import B; type T = *B.U;");
        io.add_file("/proj/sub/b.lang", "module B; import A; type U = *A.T;");
        io.add_file("/proj/readme.md", "not a module");
        io.add_file("/proj/.scratch.toy", "this does not parse");
        io
    }

    fn sorted(mut files: Vec<Utf8PathBuf>) -> Vec<String> {
        files.sort();
        files.into_iter().map(Utf8PathBuf::into_string).collect()
    }

    #[test]
    fn discover_walks_directories() {
        let mediator = crate::mediator(PrintOptions::default());
        let files = discover(&project(), &mediator, &[Utf8PathBuf::from("/proj")], None).unwrap();

        assert_eq!(sorted(files), ["/proj/a.toy", "/proj/sub/b.lang"]);
    }

    #[test]
    fn discover_keeps_explicit_files() {
        let mediator = crate::mediator(PrintOptions::default());
        let files = discover(&project(), &mediator, &[Utf8PathBuf::from("/proj/readme.md")], None).unwrap();

        assert_eq!(sorted(files), ["/proj/readme.md"]);
    }

    #[test]
    fn discover_keeps_first_occurrence() {
        let mediator = crate::mediator(PrintOptions::default());
        let paths = ["/proj/sub/b.lang", "/proj/a.toy", "/proj"].map(Utf8PathBuf::from);
        let files = discover(&project(), &mediator, &paths, None).unwrap();

        assert_eq!(files, ["/proj/sub/b.lang", "/proj/a.toy"].map(Utf8PathBuf::from));
    }

    #[test]
    fn current_dir_components_are_dropped() {
        assert_eq!(normalize(Utf8Path::new("./a.toy")), Utf8Path::new("a.toy"));
        assert_eq!(normalize(Utf8Path::new("./src/./b.lang")), Utf8Path::new("src/b.lang"));
    }

    #[test]
    fn discover_missing_path() {
        let mediator = crate::mediator(PrintOptions::default());
        let error = discover(&project(), &mediator, &[Utf8PathBuf::from("/nope")], None).unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn load_registers_and_reports() {
        let io = project();
        let mediator = crate::mediator(PrintOptions::default());
        let mut sources = SourceManager::new();
        let mut lifetime = Lifetime::new(&mediator, LifetimeOptions::default());

        let files = ["/proj/a.toy", "/proj/sub/b.lang", "/proj/readme.md"].map(Utf8PathBuf::from);
        let registered = load(&io, &mut sources, &mut lifetime, &files, None).unwrap();

        assert_eq!(registered, 2);
        assert_eq!(sources.len(), 4);
        assert_eq!(
            lifetime
                .report()
                .issues_with_code(LifetimeError::UNKNOWN_EXTENSION)
                .count(),
            1
        );

        lifetime.run_all();
        lifetime.resolve_all();

        assert!(!lifetime.is_fatal());
        let modules = lifetime
            .modules()
            .map(|(path, _)| path.to_string())
            .collect::<Vec<_>>();
        assert_eq!(modules, ["A", "B"]);
    }

    #[test]
    fn load_paths_end_to_end() {
        let io = project();
        let mediator = crate::mediator(PrintOptions::default());
        let mut sources = SourceManager::new();
        let mut lifetime = Lifetime::new(&mediator, LifetimeOptions::default());

        let registered =
            load_paths(&io, &mut sources, &mut lifetime, &[Utf8PathBuf::from("/proj")], None).unwrap();

        assert_eq!(registered, 2);
        assert!(lifetime.report().is_empty());
    }
}
