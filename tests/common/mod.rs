#![allow(dead_code)]

use std::{fs, path::Path};
use tempfile::TempDir;

pub const BANNER: &str = "/* Banner*/";

/// A source tree with `package.json`, `src/bin.ts` and `src/index.ts`.
pub fn fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("a temp dir");

    write(dir.path(), "package.json", r#"{ "name": "fixture" }"#);
    write(dir.path(), "src/bin.ts", "import './index';\n");
    write(dir.path(), "src/index.ts", "export const answer = 42;\n");

    dir
}

pub fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("parent directory");
    }
    fs::write(full, content).expect("fixture file");
}
