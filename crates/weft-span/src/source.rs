use ariadne::Cache;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::{fmt, io, ops::Index, sync::Arc};

use weft_utils::{define_id, io::FileSystem};

define_id!(SourceId);

impl SourceId {
    /// Reserved for declarations that have no source text.
    pub const BUILTIN: Self = Self { id: 0 };
}

pub type Source = ariadne::Source<Arc<str>>;

/// Holds the text of every loaded source so diagnostics can render snippets.
///
/// Sources are handed in by the loader; the manager itself only touches the
/// file system through [`SourceManager::fetch`].
#[derive(Debug, Clone)]
pub struct SourceManager {
    sources: IndexMap<Utf8PathBuf, Source>,
}

impl Default for SourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceManager {
    pub const BUILTIN_PATH: &'static str = "<builtin>";

    pub fn new() -> Self {
        let mut sources = IndexMap::new();
        sources.insert(
            Utf8PathBuf::from(Self::BUILTIN_PATH),
            Source::from(Arc::<str>::from("")),
        );
        Self { sources }
    }

    /// Registers already loaded text. Adding a path twice replaces its text and
    /// keeps its id.
    pub fn add(&mut self, path: impl Into<Utf8PathBuf>, text: impl Into<Arc<str>>) -> SourceId {
        let (index, _) = self
            .sources
            .insert_full(path.into(), Source::from(text.into()));
        SourceId::from_usize(index)
    }

    /// Reads `path` through `io` unless it is already loaded.
    pub fn fetch(&mut self, path: &Utf8Path, io: &impl FileSystem) -> io::Result<SourceId> {
        if let Some(id) = self.lookup(path) {
            return Ok(id);
        }

        let text = io.read_file(path)?;
        Ok(self.add(path, text))
    }

    pub fn lookup(&self, path: &Utf8Path) -> Option<SourceId> {
        self.sources.get_index_of(path).map(SourceId::from_usize)
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.sources.contains_key(path)
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get_index(id.as_usize()).map(|(_, source)| source)
    }

    pub fn path(&self, id: SourceId) -> Option<&Utf8Path> {
        self.sources
            .get_index(id.as_usize())
            .map(|(path, _)| path.as_path())
    }

    pub fn text(&self, id: SourceId) -> Option<&str> {
        self.get(id).map(|source| source.text())
    }

    /// Number of sources, the builtin one included.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &Utf8Path)> {
        self.sources
            .keys()
            .enumerate()
            .skip(1)
            .map(|(index, path)| (SourceId::from_usize(index), path.as_path()))
    }
}

impl Cache<SourceId> for &SourceManager {
    type Storage = Arc<str>;

    fn fetch(&mut self, id: &SourceId) -> Result<&Source, impl fmt::Debug> {
        self.get(*id).ok_or("Source id not found")
    }

    fn display<'a>(&self, id: &'a SourceId) -> Option<impl fmt::Display + 'a> {
        self.path(*id).map(|path| path.to_string())
    }
}

impl Index<SourceId> for SourceManager {
    type Output = Source;

    fn index(&self, index: SourceId) -> &Self::Output {
        &self.sources[index.as_usize()]
    }
}

#[cfg(test)]
mod tests {
    use weft_utils::io::MockFileSystem;

    use super::*;

    #[test]
    fn builtin_is_reserved() {
        let sources = SourceManager::new();

        assert_eq!(
            sources.path(SourceId::BUILTIN),
            Some(Utf8Path::new(SourceManager::BUILTIN_PATH))
        );
        assert!(sources.is_empty());
        assert_eq!(sources.iter().count(), 0);
    }

    #[test]
    fn add_then_lookup() {
        let mut sources = SourceManager::new();
        let id = sources.add("a.toy", "module A;");

        assert_ne!(id, SourceId::BUILTIN);
        assert_eq!(sources.lookup(Utf8Path::new("a.toy")), Some(id));
        assert_eq!(sources.text(id), Some("module A;"));
    }

    #[test]
    fn re_add_keeps_id() {
        let mut sources = SourceManager::new();
        let first = sources.add("a.toy", "module A;");
        let second = sources.add("a.toy", "module B;");

        assert_eq!(first, second);
        assert_eq!(sources.text(first), Some("module B;"));
    }

    #[test]
    fn fetch_reads_once() {
        let mut io = MockFileSystem::new();
        io.add_file("/a.toy", "module A;");

        let mut sources = SourceManager::new();
        let id = sources.fetch(Utf8Path::new("/a.toy"), &io).unwrap();

        io.add_file("/a.toy", "changed");
        let again = sources.fetch(Utf8Path::new("/a.toy"), &io).unwrap();

        assert_eq!(id, again);
        assert_eq!(sources.text(id), Some("module A;"));
    }

    #[test]
    fn fetch_missing() {
        let io = MockFileSystem::new();
        let mut sources = SourceManager::new();

        assert!(sources.fetch(Utf8Path::new("/nope.toy"), &io).is_err());
    }
}
