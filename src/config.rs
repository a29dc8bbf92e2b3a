use crate::{
    descriptor::{
        Descriptor, DescriptorError, FileDescriptorItem, FileDescriptors, ObjectDescriptor, Rename,
        Transform,
    },
    errors::{FileOperation, IoError, ParseError},
    options::CopyOptions,
};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};
use tera::{Context, Tera};
use thiserror::Error;

const TERA_FILE_EXTENSION: &str = ".tera";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error within config domain")]
    #[diagnostic(code(gabarit::config::io))]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Descriptor(#[from] DescriptorError),
}

fn default_write() -> bool {
    true
}

/// The `gabarit.toml` file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub src: PathBuf,
    pub dist: PathBuf,
    #[serde(default = "default_write")]
    pub write: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub skip_if_not_exists: bool,
    #[serde(default)]
    pub disable_override: bool,
    #[serde(default)]
    pub enable_migrate_mode: bool,
    /// Values available to `render` rules.
    #[serde(default)]
    pub variables: IndexMap<String, toml::Value>,
    pub files: Option<toml::Value>,
}
impl Config {
    /// Reads a config file. Relative `src`/`dist` are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.into(), error))?;

        let mut config: Config =
            toml::from_str(&content).map_err(|error| ParseError::new(path.into(), error))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.src = base.join(&config.src);
        config.dist = base.join(&config.dist);

        log::debug!(
            "loaded config {} (src: {}, dist: {})",
            path.display(),
            config.src.display(),
            config.dist.display()
        );

        Ok(config)
    }

    pub fn into_options(self) -> Result<CopyOptions, ConfigError> {
        let renderer = Renderer::new(&self.variables);

        let files = self
            .files
            .map(|value| decode_files(value, &renderer))
            .transpose()?;

        Ok(CopyOptions {
            src: self.src,
            dist: self.dist,
            files,
            debug: self.debug,
            write: self.write,
            skip_if_not_exists: self.skip_if_not_exists,
            disable_override: self.disable_override,
            enable_migrate_mode: self.enable_migrate_mode,
        })
    }
}

/// Builds the `render` transform: file content rendered as a tera template.
#[derive(Debug, Clone)]
pub struct Renderer {
    context: Rc<Context>,
}
impl Renderer {
    pub fn new(variables: &IndexMap<String, toml::Value>) -> Self {
        let mut context = Context::new();
        for (key, value) in variables {
            context.insert(key, value);
        }

        Self {
            context: Rc::new(context),
        }
    }
    pub fn transform(&self) -> Transform {
        let context = Rc::clone(&self.context);

        Transform::sync(move |content, _, _| Ok(Tera::one_off(&content, &context, false)?))
    }
}

/// Decodes the `files` value: an array of rules or a table keyed by pattern.
pub fn decode_files(
    value: toml::Value,
    renderer: &Renderer,
) -> Result<FileDescriptors, DescriptorError> {
    match value {
        toml::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| decode_item(index, item, renderer))
            .collect::<Result<Vec<_>, _>>()
            .map(FileDescriptors::Array),
        toml::Value::Table(table) => table
            .into_iter()
            .map(|(pattern, value)| {
                let descriptor = decode_descriptor(&pattern, value, renderer)?;

                Ok((pattern, descriptor))
            })
            .collect::<Result<IndexMap<_, _>, DescriptorError>>()
            .map(FileDescriptors::Map),
        other => Err(DescriptorError::InvalidRules {
            found: other.type_str().to_string(),
        }),
    }
}

fn decode_item(
    index: usize,
    item: toml::Value,
    renderer: &Renderer,
) -> Result<FileDescriptorItem, DescriptorError> {
    let invalid = |found: &str| DescriptorError::InvalidItem {
        index,
        found: found.to_string(),
    };

    match item {
        toml::Value::String(pattern) => Ok(FileDescriptorItem::Pattern(pattern)),
        toml::Value::Array(pair) if (1..=2).contains(&pair.len()) => {
            let mut pair = pair.into_iter();

            let pattern = match pair.next() {
                Some(toml::Value::String(pattern)) => pattern,
                Some(other) => return Err(invalid(other.type_str())),
                None => return Err(invalid("an empty array")),
            };

            let descriptor = pair
                .next()
                .map(|value| decode_descriptor(&pattern, value, renderer))
                .transpose()?;

            Ok(FileDescriptorItem::Pair(pattern, descriptor))
        }
        toml::Value::Array(_) => Err(invalid("an array that is not a [pattern, descriptor] pair")),
        other => Err(invalid(other.type_str())),
    }
}

/// Decodes one rule value, rejecting anything that is not a boolean, a string or a
/// table of known descriptor fields.
pub fn decode_descriptor(
    pattern: &str,
    value: toml::Value,
    renderer: &Renderer,
) -> Result<Descriptor, DescriptorError> {
    let table = match value {
        toml::Value::Boolean(include) => return Ok(Descriptor::Include(include)),
        toml::Value::String(content) => return Ok(Descriptor::from(content)),
        toml::Value::Table(table) => table,
        other => {
            return Err(DescriptorError::Invalid {
                pattern: pattern.to_string(),
                found: other.type_str().to_string(),
            })
        }
    };

    let invalid_field = |field: &str, reason: String| DescriptorError::InvalidField {
        pattern: pattern.to_string(),
        field: field.to_string(),
        reason,
    };
    let expected = |field: &str, kind: &str, value: &toml::Value| {
        invalid_field(field, format!("expected {kind}, found {}", value.type_str()))
    };

    let mut descriptor = ObjectDescriptor::new();
    let mut render = false;

    for (field, value) in table {
        match (field.as_str(), value) {
            ("render", toml::Value::Boolean(flag)) => render = flag,
            ("rename", toml::Value::String(name)) => descriptor.rename = Some(Rename::To(name)),
            ("override", toml::Value::String(content)) => {
                descriptor.r#override = Some(content.into())
            }
            ("skip_if_not_exists", toml::Value::Boolean(flag)) => {
                descriptor.skip_if_not_exists = Some(flag)
            }
            ("ignored", toml::Value::Boolean(flag)) => descriptor.ignored = Some(flag),
            ("render" | "skip_if_not_exists" | "ignored", value) => {
                return Err(expected(&field, "a boolean", &value))
            }
            ("rename" | "override", value) => return Err(expected(&field, "a string", &value)),
            (unknown, _) => return Err(invalid_field(unknown, "unknown field".to_string())),
        }
    }

    if render {
        descriptor.transform = Some(renderer.transform());

        if descriptor.rename.is_none() {
            descriptor.rename = Some(Rename::with(|name| {
                name.strip_suffix(TERA_FILE_EXTENSION)
                    .unwrap_or(name)
                    .to_string()
            }));
        }
    }

    Ok(Descriptor::Object(descriptor))
}
