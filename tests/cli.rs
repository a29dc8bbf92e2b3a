// The CLI is exercised as a subprocess; library behaviour is covered by the other suites.
mod common;

use common::write;
use predicates::prelude::*;
use std::path::Path;

const CONFIG: &str = r#"
src = "template"
dist = "out"

[variables]
name = "demo"

[files]
"**" = true
"**/*.tera" = { render = true }
"LICENSE" = "MIT"
"#;

fn project() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "template/README.md.tera", "# {{ name }}\n");
    write(root.path(), "template/src/main.rs", "fn main() {}\n");
    write(root.path(), "gabarit.toml", CONFIG);
    root
}

fn gabarit(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("gabarit").unwrap();
    cmd.current_dir(root).env("NO_COLOR", "1");
    cmd
}

#[test]
fn copy_with_yes_writes_output() {
    let root = project();

    gabarit(root.path())
        .arg("copy")
        .arg("gabarit.toml")
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"));

    let readme = std::fs::read_to_string(root.path().join("out/README.md")).unwrap();
    assert_eq!(readme, "# demo\n");
    assert!(root.path().join("out/src/main.rs").exists());
    assert!(root.path().join("out/LICENSE").exists());
}

#[test]
fn dry_run_only_previews() {
    let root = project();

    gabarit(root.path())
        .arg("copy")
        .arg("gabarit.toml")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("README.md").and(predicate::str::contains("main.rs")));

    assert!(!root.path().join("out").exists());
}

#[test]
fn preview_lists_resulting_tree() {
    let root = project();

    gabarit(root.path())
        .arg("preview")
        .arg("gabarit.toml")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Preview")
                .and(predicate::str::contains("LICENSE"))
                .and(predicate::str::contains("README.md.tera").not()),
        );

    assert!(!root.path().join("out").exists());
}

#[test]
fn invalid_descriptor_is_reported() {
    let root = project();
    write(
        root.path(),
        "gabarit.toml",
        "src = \"template\"\ndist = \"out\"\n[files]\n\"**\" = 42\n",
    );

    gabarit(root.path())
        .arg("preview")
        .arg("gabarit.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid descriptor"));
}
