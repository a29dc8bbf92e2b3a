use crate::{
    errors::{FileOperation, IoError},
    options::CopyOptions,
    pipeline::{PipelineOutput, Renamed},
    transactions::{Active, RollbackOperation, Transaction},
    vfs::FileSet,
};
use colored::Colorize;
use miette::Diagnostic;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ReconcileError {
    #[error("I/O error while writing the output")]
    #[diagnostic(code(gabarit::reconcile::io))]
    Io(#[from] IoError),
}

/// The final result of a run.
#[derive(Debug)]
pub struct Outcome {
    pub files: FileSet,
    pub renamed: Vec<Renamed>,
    /// Source paths dropped because their file was renamed away in migrate mode.
    pub migrated: Vec<String>,
    /// Where the file set is, or would be, written.
    pub dist: PathBuf,
    /// Whether the file set was flushed to `dist`.
    pub written: bool,
}
impl Outcome {
    pub fn file_list(&self) -> Vec<String> {
        self.files.file_list()
    }
    pub fn contents(&self, path: &str) -> Option<std::borrow::Cow<'_, str>> {
        self.files.contents(path)
    }
}

/// Removes renamed-away source paths from `output` in migrate mode.
///
/// A path that something else was written to (another file renamed onto it, or an
/// emission) is kept. Returns the pruned paths.
pub fn prune_migrated(output: &mut PipelineOutput, options: &CopyOptions) -> Vec<String> {
    if !options.enable_migrate_mode {
        return Vec::new();
    }

    if !options.is_in_place() {
        log::warn!(
            "migrate mode ignored: src '{}' and dist '{}' differ",
            options.src.display(),
            options.dist.display()
        );
        return Vec::new();
    }

    let mut migrated = Vec::new();

    for Renamed { from, to } in &output.renamed {
        if output.written.contains(from) {
            log::debug!("keep {} (rewritten during the run)", from);
            continue;
        }

        output.files.remove(from);

        log::debug!("migrate {} -> {}", from, to);
        migrated.push(from.clone());
    }

    migrated
}

/// Finalizes a run: migrate pruning, then the optional flush to `dist`.
pub fn reconcile(
    mut output: PipelineOutput,
    options: &CopyOptions,
) -> Result<Outcome, ReconcileError> {
    let migrated = prune_migrated(&mut output, options);

    if options.write {
        write_to_disk(&output.files, &migrated, &options.dist)?;
    }

    Ok(Outcome {
        files: output.files,
        renamed: output.renamed,
        migrated,
        dist: options.dist.clone(),
        written: options.write,
    })
}

/// Writes every file of `files` under `dist` and deletes `removed` from it.
///
/// Either everything lands on disk or, on the first I/O error, the changes made so
/// far are rolled back.
pub fn write_to_disk(
    files: &FileSet,
    removed: &[String],
    dist: &Path,
) -> Result<(), ReconcileError> {
    let mut trx = Transaction::<Active>::new();

    for (path, content) in files.iter() {
        let final_path = dist.join(path);

        if let Some(parent) = final_path.parent() {
            create_directory(&mut trx, parent)?;
        }

        write_file(&mut trx, &final_path, content)?;
    }

    for path in removed {
        remove_file(&mut trx, &dist.join(path))?;
    }

    trx.commit();

    Ok(())
}

/// Creates `path` and any missing ancestors, registering the topmost created
/// directory for rollback.
fn create_directory(trx: &mut Transaction<Active>, path: &Path) -> Result<(), IoError> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }

    let mut topmost = path;
    while let Some(parent) = topmost.parent() {
        if parent.as_os_str().is_empty() || parent.exists() {
            break;
        }
        topmost = parent;
    }

    fs::create_dir_all(path)
        .map_err(|error| IoError::new(FileOperation::Mkdir, path.into(), error))?;

    trx.add_operation(RollbackOperation::RemoveDir(topmost.to_path_buf()));

    Ok(())
}

fn write_file(trx: &mut Transaction<Active>, path: &Path, contents: &[u8]) -> Result<(), IoError> {
    let previous = if path.is_file() {
        Some(
            fs::read(path)
                .map_err(|error| IoError::new(FileOperation::Read, path.into(), error))?,
        )
    } else {
        None
    };

    if previous.as_deref() == Some(contents) {
        log::debug!("unchanged {}", path.display());
        return Ok(());
    }

    fs::write(path, contents)
        .map_err(|error| IoError::new(FileOperation::Write, path.into(), error))?;

    match previous {
        Some(previous) => {
            println!("{} {}", "update".yellow(), path.display());

            trx.add_operation(RollbackOperation::RestoreFile(path.to_path_buf(), previous));
        }
        None => {
            println!("{} {}", "create".green(), path.display());

            trx.add_operation(RollbackOperation::RemoveFile(path.to_path_buf()));
        }
    }

    Ok(())
}

fn remove_file(trx: &mut Transaction<Active>, path: &Path) -> Result<(), IoError> {
    if !path.is_file() {
        return Ok(());
    }

    let previous =
        fs::read(path).map_err(|error| IoError::new(FileOperation::Read, path.into(), error))?;

    fs::remove_file(path)
        .map_err(|error| IoError::new(FileOperation::Remove, path.into(), error))?;

    println!("{} {}", "remove".red(), path.display());

    trx.add_operation(RollbackOperation::RestoreFile(path.to_path_buf(), previous));

    Ok(())
}
