use crate::{
    descriptor::{ObjectDescriptor, Override},
    errors::BoxError,
    matcher::RuleSet,
    options::CopyOptions,
    vfs::{path_key, FileSet},
};
use miette::Diagnostic;
use std::{cell::RefCell, collections::BTreeSet, fmt, path::Path, rc::Rc, string::FromUtf8Error};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("source file not found: '{path}'")]
    #[diagnostic(
        code(gabarit::pipeline::missing_source_file),
        help("Add the file, give the rule an `override`, or set `skip_if_not_exists`")
    )]
    MissingSourceFile { path: String },

    #[error("transform failed for '{path}': {source}")]
    #[diagnostic(code(gabarit::pipeline::transform))]
    Transform {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("'{path}' is not valid UTF-8 and cannot be transformed or overridden")]
    #[diagnostic(
        code(gabarit::pipeline::non_utf8),
        help("Only text files can be given a transform or an override")
    )]
    NonUtf8 {
        path: String,
        #[source]
        source: FromUtf8Error,
    },
}

/// A file a transform inserted into the output on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub path: String,
    pub content: Vec<u8>,
}

/// Handed to every transform invocation.
///
/// Gives read-only access to the run's options and to the output file set as it stood
/// when the transform was called, plus [`TransformerContext::emit_file`] to add extra
/// files. Emitted files skip rule matching.
#[derive(Clone)]
pub struct TransformerContext {
    options: Rc<CopyOptions>,
    stream: Rc<FileSet>,
    emitted: Rc<RefCell<Vec<Emission>>>,
}
impl TransformerContext {
    fn new(options: Rc<CopyOptions>, stream: Rc<FileSet>) -> Self {
        Self {
            options,
            stream,
            emitted: Rc::new(RefCell::new(Vec::new())),
        }
    }
    pub fn options(&self) -> &CopyOptions {
        &self.options
    }
    /// The output as it stood when the transform was called. Files emitted by the
    /// running transform only show up here for later files.
    pub fn stream(&self) -> &FileSet {
        &self.stream
    }
    pub fn emit_file<P: AsRef<Path>, C: Into<Vec<u8>>>(&self, path: P, content: C) {
        self.emitted.borrow_mut().push(Emission {
            path: path_key(path),
            content: content.into(),
        });
    }
    fn take_emitted(&self) -> Vec<Emission> {
        std::mem::take(&mut *self.emitted.borrow_mut())
    }
}
impl fmt::Debug for TransformerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerContext")
            .field("src", &self.options.src)
            .field("dist", &self.options.dist)
            .field("files", &self.stream.len())
            .finish()
    }
}

/// The result of running one file through the pipeline.
#[derive(Debug)]
pub struct ProcessedFile {
    pub source: String,
    pub destination: String,
    pub content: Vec<u8>,
    pub emitted: Vec<Emission>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub from: String,
    pub to: String,
}

/// Everything a run produced, before reconciliation.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub files: FileSet,
    pub renamed: Vec<Renamed>,
    /// Every path something was written to: final destinations and emissions.
    pub written: BTreeSet<String>,
}

pub struct Pipeline {
    options: Rc<CopyOptions>,
    output: Rc<FileSet>,
}
impl Pipeline {
    pub fn new(options: Rc<CopyOptions>) -> Self {
        Self {
            options,
            output: Rc::new(FileSet::new()),
        }
    }

    fn level(&self) -> log::Level {
        if self.options.debug {
            log::Level::Info
        } else {
            log::Level::Debug
        }
    }

    /// Runs every candidate of `source` through the pipeline, one at a time, in
    /// enumeration order. The first failure aborts the run.
    pub async fn run(
        mut self,
        source: &FileSet,
        rules: &RuleSet,
    ) -> Result<PipelineOutput, PipelineError> {
        let level = self.level();
        let mut renamed = Vec::new();
        let mut written = BTreeSet::new();

        for path in rules.candidates(source) {
            let Some(descriptor) = rules.resolve(&path) else {
                log::log!(level, "ignore {}", path);
                continue;
            };

            let Some(processed) = self
                .process_file(&path, &descriptor, source.read(&path))
                .await?
            else {
                continue;
            };

            // the context handed to the transform is gone by now, so this does not copy
            let output = Rc::make_mut(&mut self.output);

            for emission in processed.emitted {
                log::log!(level, "emit {}", emission.path);

                written.insert(emission.path.clone());
                output.write(emission.path, emission.content);
            }

            if processed.source != processed.destination {
                renamed.push(Renamed {
                    from: processed.source.clone(),
                    to: processed.destination.clone(),
                });
            }

            written.insert(processed.destination.clone());
            output.write(processed.destination, processed.content);
        }

        let files = Rc::try_unwrap(self.output).unwrap_or_else(|shared| (*shared).clone());

        Ok(PipelineOutput {
            files,
            renamed,
            written,
        })
    }

    /// Applies a resolved descriptor to one file.
    ///
    /// Returns `None` when the file is skipped because it is missing from the source.
    pub async fn process_file(
        &self,
        path: &str,
        descriptor: &ObjectDescriptor,
        existing: Option<&[u8]>,
    ) -> Result<Option<ProcessedFile>, PipelineError> {
        if descriptor.is_ignored() {
            return Ok(None);
        }

        let mut content = match (existing, &descriptor.r#override) {
            (None, Some(default)) => {
                log::log!(self.level(), "default {}", path);

                default.apply(path, None).into_bytes()
            }
            (None, None) => {
                if descriptor.skip_if_not_exists.unwrap_or(false) || self.options.skip_if_not_exists
                {
                    log::log!(self.level(), "skip {} (not found)", path);
                    return Ok(None);
                }

                return Err(PipelineError::MissingSourceFile {
                    path: path.to_string(),
                });
            }
            (Some(bytes), Some(replacement)) if !self.options.disable_override => {
                log::log!(self.level(), "override {}", path);

                match replacement {
                    Override::Content(content) => content.clone().into_bytes(),
                    Override::With(_) => {
                        let current = as_text(path, bytes.to_vec())?;

                        replacement.apply(path, Some(&current)).into_bytes()
                    }
                }
            }
            (Some(bytes), _) => bytes.to_vec(),
        };

        let mut emitted = Vec::new();

        if let Some(transform) = &descriptor.transform {
            log::log!(self.level(), "transform {}", path);

            let context = TransformerContext::new(Rc::clone(&self.options), Rc::clone(&self.output));
            let text = as_text(path, content)?;

            let transformed = transform
                .call(text, path, context.clone())
                .await
                .map_err(|source| PipelineError::Transform {
                    path: path.to_string(),
                    source,
                })?;

            emitted = context.take_emitted();
            content = transformed.into_bytes();
        }

        let destination = match &descriptor.rename {
            Some(rename) => path_key(rename.apply(path)),
            None => path.to_string(),
        };

        if destination != path {
            log::log!(self.level(), "rename {} -> {}", path, destination);
        }

        Ok(Some(ProcessedFile {
            source: path.to_string(),
            destination,
            content,
            emitted,
        }))
    }
}

fn as_text(path: &str, bytes: Vec<u8>) -> Result<String, PipelineError> {
    String::from_utf8(bytes).map_err(|source| PipelineError::NonUtf8 {
        path: path.to_string(),
        source,
    })
}
