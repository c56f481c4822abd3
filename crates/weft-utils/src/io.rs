//! File system access for the source loader.
//!
//! The compiler core never touches the disk. Front ends that do go through
//! [`FileSystem`], so tests can swap in a [`MockFileSystem`].

use camino::{Utf8Path, Utf8PathBuf};
use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    fs, io,
};

/// Breadth-first walk over a directory tree yielding every file once.
pub struct DirWalker {
    queue: VecDeque<Utf8PathBuf>,
    walked: HashSet<Utf8PathBuf>,
}

impl DirWalker {
    pub fn new(dir: Utf8PathBuf) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(dir);
        Self {
            queue,
            walked: HashSet::new(),
        }
    }

    /// Advance the walker to the next file. Entries of one directory are
    /// visited in lexicographic order so that the walk is reproducible.
    /// Returned paths are not canonicalised.
    pub fn next(&mut self, io: &impl FileSystem) -> io::Result<Option<Utf8PathBuf>> {
        while let Some(path) = self.queue.pop_front() {
            let full_path = io.canonicalize(&path)?;

            if io.is_file(&full_path) {
                return Ok(Some(path));
            }

            if !io.is_dir(&full_path) {
                continue;
            }

            // symlink loops
            if !self.walked.insert(full_path) {
                continue;
            }

            let mut entries = io.read_dir(&path)?.into_iter().collect::<io::Result<Vec<_>>>()?;
            entries.sort();
            self.queue.extend(entries);
        }
        Ok(None)
    }

    /// Drains the walker, keeping only files accepted by `filter`.
    pub fn collect_files(
        mut self,
        io: &impl FileSystem,
        mut filter: impl FnMut(&Utf8Path) -> bool,
    ) -> io::Result<Vec<Utf8PathBuf>> {
        let mut files = Vec::new();
        while let Some(path) = self.next(io)? {
            if filter(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

pub type ReadDir = Vec<io::Result<Utf8PathBuf>>;

pub trait FileSystem {
    fn read_dir(&self, path: &Utf8Path) -> io::Result<ReadDir>;
    fn read_file(&self, path: &Utf8Path) -> io::Result<String>;

    fn is_dir(&self, path: &Utf8Path) -> bool;
    fn is_file(&self, path: &Utf8Path) -> bool;

    fn canonicalize(&self, path: &Utf8Path) -> io::Result<Utf8PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_dir(&self, path: &Utf8Path) -> io::Result<ReadDir> {
        fs::read_dir(path).map(|entries| {
            entries
                .filter_map(|entry| match entry {
                    Ok(entry) => {
                        let path = Utf8PathBuf::from_path_buf(entry.path()).ok()?;
                        Some(Ok(path))
                    }
                    Err(err) => Some(Err(err)),
                })
                .collect()
        })
    }

    fn read_file(&self, path: &Utf8Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Utf8Path) -> bool {
        path.is_file()
    }

    fn canonicalize(&self, path: &Utf8Path) -> io::Result<Utf8PathBuf> {
        path.canonicalize_utf8()
    }
}

/// In-memory file system. `None` entries are directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockFileSystem {
    files: BTreeMap<Utf8PathBuf, Option<String>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file and every missing parent directory.
    pub fn add_file(&mut self, path: impl Into<Utf8PathBuf>, content: impl Into<String>) {
        let path = path.into();
        for dir in path.ancestors().skip(1) {
            if dir.as_str().is_empty() {
                break;
            }
            self.files.entry(dir.to_owned()).or_insert(None);
        }
        self.files.insert(path, Some(content.into()));
    }
}

impl FileSystem for MockFileSystem {
    fn read_dir(&self, path: &Utf8Path) -> io::Result<ReadDir> {
        if !self.is_dir(path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "Directory not found"));
        }

        Ok(self
            .files
            .keys()
            .filter(|key| key.parent() == Some(path))
            .map(|key| Ok(key.clone()))
            .collect())
    }

    fn read_file(&self, path: &Utf8Path) -> io::Result<String> {
        match self.files.get(path) {
            Some(Some(content)) => Ok(content.clone()),
            Some(None) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Path is a directory",
            )),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "File not found")),
        }
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        self.files.get(path).is_some_and(|v| v.is_none())
    }

    fn is_file(&self, path: &Utf8Path) -> bool {
        self.files.get(path).is_some_and(|v| v.is_some())
    }

    fn canonicalize(&self, path: &Utf8Path) -> io::Result<Utf8PathBuf> {
        Ok(path.to_owned())
    }
}
