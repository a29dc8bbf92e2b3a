use crate::descriptor::FileDescriptors;
use std::path::{Path, PathBuf};

/// Options for a single copy run.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Source directory.
    pub src: PathBuf,
    /// Output directory.
    pub dist: PathBuf,
    /// Rules deciding what happens to each file. `None` copies everything as-is.
    pub files: Option<FileDescriptors>,
    /// Log every per-file decision at `info` level.
    pub debug: bool,
    /// Flush the resulting file set to `dist`.
    pub write: bool,
    /// Skip matched files missing from `src` instead of failing, for every rule.
    pub skip_if_not_exists: bool,
    /// Only use `override` content when the source file does not exist.
    pub disable_override: bool,
    /// Drop files that were renamed away. Only honoured when `src` and `dist` coincide.
    pub enable_migrate_mode: bool,
}
impl CopyOptions {
    pub fn new<S: Into<PathBuf>, D: Into<PathBuf>>(src: S, dist: D) -> Self {
        Self {
            src: src.into(),
            dist: dist.into(),
            ..Self::default()
        }
    }
    pub fn files(mut self, files: impl Into<FileDescriptors>) -> Self {
        self.files = Some(files.into());
        self
    }
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
    pub fn skip_if_not_exists(mut self, skip: bool) -> Self {
        self.skip_if_not_exists = skip;
        self
    }
    pub fn disable_override(mut self, disable: bool) -> Self {
        self.disable_override = disable;
        self
    }
    pub fn enable_migrate_mode(mut self, enable: bool) -> Self {
        self.enable_migrate_mode = enable;
        self
    }
    /// Whether `src` and `dist` point at the same directory.
    pub fn is_in_place(&self) -> bool {
        same_dir(&self.src, &self.dist)
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => crate::vfs::path_key(a) == crate::vfs::path_key(b) && a.is_absolute() == b.is_absolute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_place_compares_normalized_paths() {
        assert!(CopyOptions::new("template", "./template").is_in_place());
        assert!(!CopyOptions::new("template", "out").is_in_place());
    }

    #[test]
    fn in_place_resolves_existing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir_all(&nested).unwrap();

        assert!(CopyOptions::new(&nested, nested.join("..").join("a")).is_in_place());
    }
}
