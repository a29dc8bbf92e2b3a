use crate::{
    config::{Config, ConfigError},
    descriptor::{normalize, DescriptorError},
    errors::IoError,
    matcher::RuleSet,
    options::CopyOptions,
    pipeline::{Pipeline, PipelineError},
    reconcile::{reconcile, Outcome, ReconcileError},
    vfs::FileSet,
};
use std::{path::Path, rc::Rc};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CopyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Copies `options.src` according to `options.files`.
///
/// Rules are normalized and compiled before any file is read, every candidate file is
/// then run through the pipeline in order, and only once all of them succeeded is the
/// result reconciled and, if `options.write` is set, flushed to `options.dist`.
///
/// # Errors
///
/// Returns a [`CopyError`] if:
///
/// - A rule has a malformed glob pattern.
/// - The source directory cannot be read.
/// - A matched file is missing and has neither an `override` nor `skip_if_not_exists`.
/// - A transform fails.
/// - Writing the output fails, in which case the changes already made are rolled back.
pub async fn copy(options: CopyOptions) -> Result<Outcome, CopyError> {
    let options = Rc::new(options);

    let rules = match &options.files {
        Some(files) => normalize(files),
        None => normalize(&Default::default()),
    };

    if options.debug {
        for rule in &rules {
            log::info!("rule '{}': {:?}", rule.pattern, rule.descriptor);
        }
    }

    let rules = RuleSet::compile(rules)?;

    log::debug!("reading source from: {}", options.src.display());

    let source = FileSet::from_dir(&options.src)?;

    let output = Pipeline::new(Rc::clone(&options))
        .run(&source, &rules)
        .await?;

    let outcome = reconcile(output, &options)?;

    Ok(outcome)
}

/// Loads a `gabarit.toml` file, lets `adjust` tweak the resulting options, and runs
/// [`copy`] with them.
///
/// # Errors
///
/// Returns a [`CopyError`] if the config cannot be read or decoded, or for any reason
/// listed on [`copy`].
pub async fn copy_from_config<P, F>(path: P, adjust: F) -> Result<Outcome, CopyError>
where
    P: AsRef<Path>,
    F: FnOnce(CopyOptions) -> CopyOptions,
{
    let options = Config::from_file(path)?.into_options()?;

    copy(adjust(options)).await
}
