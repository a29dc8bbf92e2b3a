use crate::errors::{FileOperation, IoError};
use std::{
    borrow::Cow,
    collections::BTreeMap,
    path::{Component, Path},
};
use walkdir::WalkDir;

/// An in-memory set of files keyed by their `/`-separated path relative to a root.
///
/// Listing is always ordered by path, so two runs over identical inputs enumerate
/// identically. Content is kept as raw bytes; [`FileSet::contents`] gives a text view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: BTreeMap<String, Vec<u8>>,
}
impl FileSet {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
    /// Reads every regular file under `root` into a new [`FileSet`].
    ///
    /// A missing `root` yields an empty set, which lets rules with `override`
    /// bootstrap a destination from nothing.
    pub fn from_dir(root: &Path) -> Result<Self, IoError> {
        let mut set = Self::new();

        if !root.exists() {
            log::debug!("source root {} does not exist", root.display());
            return Ok(set);
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(error) => {
                    let path = error.path().unwrap_or(root).to_path_buf();

                    Err(IoError::new(FileOperation::Walk, path, error.into()))?
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let full_path = entry.path();
            let Ok(relative) = full_path.strip_prefix(root) else {
                continue;
            };

            let content = std::fs::read(full_path)
                .map_err(|error| IoError::new(FileOperation::Read, full_path.into(), error))?;

            set.write(path_key(relative), content);
        }

        Ok(set)
    }
    /// Final file paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
    pub fn file_list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_slice()))
    }
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }
    pub fn read(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }
    /// Text view of a file, replacing invalid UTF-8 sequences.
    pub fn contents(&self, path: &str) -> Option<Cow<'_, str>> {
        self.read(path).map(String::from_utf8_lossy)
    }
    /// Inserts or replaces `path`, returning the previous content if any.
    pub fn write(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.entries.insert(path.into(), content.into())
    }
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.entries.remove(path)
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns a relative path into a file set key: `/` separators, no `.` segments,
/// `..` popping the previous segment.
pub fn path_key<P: AsRef<Path>>(path: P) -> String {
    let mut segments: Vec<String> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            // Skip the current-dir marker "." and anything anchoring the path
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}

            // For "..", pop the last segment if possible
            Component::ParentDir => {
                segments.pop();
            }

            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
        }
    }

    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_key_normalizes_segments() {
        assert_eq!(path_key("./src/index.ts"), "src/index.ts");
        assert_eq!(path_key("src/../lib/mod.rs"), "lib/mod.rs");
        assert_eq!(path_key("/abs/file"), "abs/file");
    }

    #[test]
    fn file_list_is_sorted_regardless_of_insertion() {
        let mut set = FileSet::new();
        set.write("src/index.ts", "b");
        set.write("package.json", "a");
        set.write("src/bin.ts", "c");

        assert_eq!(
            set.file_list(),
            vec!["package.json", "src/bin.ts", "src/index.ts"]
        );
    }

    #[test]
    fn from_dir_reads_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join("src/index.ts"), "export {}").unwrap();

        let set = FileSet::from_dir(dir.path()).unwrap();

        assert_eq!(set.file_list(), vec!["package.json", "src/index.ts"]);
        assert_eq!(set.contents("src/index.ts").unwrap(), "export {}");
    }

    #[test]
    fn from_dir_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = FileSet::from_dir(&dir.path().join("nope")).unwrap();

        assert!(set.is_empty());
    }
}
