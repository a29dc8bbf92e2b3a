use crate::{errors::BoxError, pipeline::TransformerContext};
use futures::future::{FutureExt, LocalBoxFuture};
use indexmap::IndexMap;
use miette::Diagnostic;
use std::{fmt, future::Future, rc::Rc};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DescriptorError {
    #[error("invalid descriptor for pattern '{pattern}': expected boolean, string or table, found {found}")]
    #[diagnostic(
        code(gabarit::descriptor::invalid),
        help("Use `true`/`false`, a string (default content) or a table of descriptor fields")
    )]
    Invalid { pattern: String, found: String },

    #[error("invalid field '{field}' in descriptor for pattern '{pattern}': {reason}")]
    #[diagnostic(
        code(gabarit::descriptor::invalid_field),
        help("Known fields are: render, rename, override, skip_if_not_exists, ignored")
    )]
    InvalidField {
        pattern: String,
        field: String,
        reason: String,
    },

    #[error("invalid rule at position {index}: expected a pattern or [pattern, descriptor], found {found}")]
    #[diagnostic(code(gabarit::descriptor::invalid_item))]
    InvalidItem { index: usize, found: String },

    #[error("invalid `files`: expected an array or a table, found {found}")]
    #[diagnostic(code(gabarit::descriptor::invalid_rules))]
    InvalidRules { found: String },

    #[error("invalid glob pattern '{pattern}'")]
    #[diagnostic(code(gabarit::descriptor::invalid_pattern), help("Check the glob syntax"))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

pub type TransformResult = Result<String, BoxError>;
pub type TransformFuture = LocalBoxFuture<'static, TransformResult>;

type TransformFn = dyn Fn(String, String, TransformerContext) -> TransformFuture;

/// A content transformer, called with `(content, filename, context)`.
///
/// Transforms run on the pipeline's single thread of control, so neither the closure
/// nor its future has to be `Send`.
#[derive(Clone)]
pub struct Transform(Rc<TransformFn>);
impl Transform {
    /// Wraps a transform that finishes immediately.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(String, &str, &TransformerContext) -> TransformResult + 'static,
    {
        Self(Rc::new(
            move |content: String, filename: String, context: TransformerContext| -> TransformFuture {
                futures::future::ready(f(content, &filename, &context)).boxed_local()
            },
        ))
    }
    /// Wraps a transform that has to await something before producing its content.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(String, String, TransformerContext) -> Fut + 'static,
        Fut: Future<Output = TransformResult> + 'static,
    {
        Self(Rc::new(
            move |content: String, filename: String, context: TransformerContext| -> TransformFuture {
                f(content, filename, context).boxed_local()
            },
        ))
    }
    pub(crate) fn call(
        &self,
        content: String,
        filename: &str,
        context: TransformerContext,
    ) -> TransformFuture {
        (self.0)(content, filename.to_string(), context)
    }
}
impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

#[derive(Clone)]
pub enum Rename {
    To(String),
    With(Rc<dyn Fn(&str) -> String>),
}
impl Rename {
    pub fn with<F: Fn(&str) -> String + 'static>(f: F) -> Self {
        Self::With(Rc::new(f))
    }
    pub fn apply(&self, original: &str) -> String {
        match self {
            Self::To(name) => name.clone(),
            Self::With(f) => f(original),
        }
    }
}
impl fmt::Debug for Rename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::To(name) => f.debug_tuple("To").field(name).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}
impl From<&str> for Rename {
    fn from(value: &str) -> Self {
        Self::To(value.to_string())
    }
}
impl From<String> for Rename {
    fn from(value: String) -> Self {
        Self::To(value)
    }
}

/// Content used when the source file is missing, and in place of it otherwise
/// unless overriding is disabled.
#[derive(Clone)]
pub enum Override {
    Content(String),
    /// Called with `(filename, existing content)`.
    With(Rc<dyn Fn(&str, Option<&str>) -> String>),
}
impl Override {
    pub fn with<F: Fn(&str, Option<&str>) -> String + 'static>(f: F) -> Self {
        Self::With(Rc::new(f))
    }
    pub fn apply(&self, filename: &str, existing: Option<&str>) -> String {
        match self {
            Self::Content(content) => content.clone(),
            Self::With(f) => f(filename, existing),
        }
    }
}
impl fmt::Debug for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(content) => f.debug_tuple("Content").field(content).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}
impl From<&str> for Override {
    fn from(value: &str) -> Self {
        Self::Content(value.to_string())
    }
}
impl From<String> for Override {
    fn from(value: String) -> Self {
        Self::Content(value)
    }
}

/// What to do with the files a pattern matches. Every field is optional so that
/// descriptors from several matching rules can be layered on top of each other.
#[derive(Debug, Clone, Default)]
pub struct ObjectDescriptor {
    pub transform: Option<Transform>,
    pub rename: Option<Rename>,
    pub skip_if_not_exists: Option<bool>,
    pub r#override: Option<Override>,
    pub ignored: Option<bool>,
}
impl ObjectDescriptor {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
    pub fn with_rename(mut self, rename: impl Into<Rename>) -> Self {
        self.rename = Some(rename.into());
        self
    }
    pub fn with_override(mut self, value: impl Into<Override>) -> Self {
        self.r#override = Some(value.into());
        self
    }
    pub fn skip_if_not_exists(mut self, skip: bool) -> Self {
        self.skip_if_not_exists = Some(skip);
        self
    }
    pub fn ignore(mut self) -> Self {
        self.ignored = Some(true);
        self
    }
    pub fn is_ignored(&self) -> bool {
        self.ignored.unwrap_or(false)
    }
    /// Layers `later` on top of `self`, field by field.
    ///
    /// `ignored` is decided by the last rule layered: a later rule that does not ignore
    /// the file includes it again.
    pub fn merge(&mut self, later: &ObjectDescriptor) {
        if later.transform.is_some() {
            self.transform.clone_from(&later.transform);
        }
        if later.rename.is_some() {
            self.rename.clone_from(&later.rename);
        }
        if later.skip_if_not_exists.is_some() {
            self.skip_if_not_exists = later.skip_if_not_exists;
        }
        if later.r#override.is_some() {
            self.r#override.clone_from(&later.r#override);
        }
        self.ignored = Some(later.is_ignored());
    }
}

/// The shorthand forms a rule value can take.
#[derive(Debug, Clone)]
pub enum Descriptor {
    /// `true` copies as-is, `false` excludes.
    Include(bool),
    /// A string or a function standing in for `{ override }`.
    Override(Override),
    Object(ObjectDescriptor),
}
impl Descriptor {
    /// Function shorthand: default content generated from `(filename, existing)`.
    pub fn generate<F: Fn(&str, Option<&str>) -> String + 'static>(f: F) -> Self {
        Self::Override(Override::with(f))
    }
    /// Expands the shorthand into the canonical object form.
    pub fn into_object(self) -> ObjectDescriptor {
        match self {
            Self::Include(true) => ObjectDescriptor::new(),
            Self::Include(false) => ObjectDescriptor::new().ignore(),
            Self::Override(value) => ObjectDescriptor::new().with_override(value),
            Self::Object(object) => object,
        }
    }
}
impl From<bool> for Descriptor {
    fn from(value: bool) -> Self {
        Self::Include(value)
    }
}
impl From<&str> for Descriptor {
    fn from(value: &str) -> Self {
        Self::Override(value.into())
    }
}
impl From<String> for Descriptor {
    fn from(value: String) -> Self {
        Self::Override(value.into())
    }
}
impl From<Override> for Descriptor {
    fn from(value: Override) -> Self {
        Self::Override(value)
    }
}
impl From<ObjectDescriptor> for Descriptor {
    fn from(value: ObjectDescriptor) -> Self {
        Self::Object(value)
    }
}

/// One entry of the array syntax.
#[derive(Debug, Clone)]
pub enum FileDescriptorItem {
    /// A bare pattern, copied as-is.
    Pattern(String),
    Pair(String, Option<Descriptor>),
}
impl From<&str> for FileDescriptorItem {
    fn from(value: &str) -> Self {
        Self::Pattern(value.to_string())
    }
}
impl From<String> for FileDescriptorItem {
    fn from(value: String) -> Self {
        Self::Pattern(value)
    }
}
impl<S: Into<String>, D: Into<Descriptor>> From<(S, D)> for FileDescriptorItem {
    fn from((pattern, descriptor): (S, D)) -> Self {
        Self::Pair(pattern.into(), Some(descriptor.into()))
    }
}

/// The two user-facing rule syntaxes. Both carry their rule order: the array by
/// position, the map by insertion order.
#[derive(Debug, Clone)]
pub enum FileDescriptors {
    Array(Vec<FileDescriptorItem>),
    Map(IndexMap<String, Descriptor>),
}
impl FileDescriptors {
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FileDescriptorItem>,
    {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
    pub fn map<I, S, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<Descriptor>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(pattern, descriptor)| (pattern.into(), descriptor.into()))
                .collect(),
        )
    }
}
impl Default for FileDescriptors {
    fn default() -> Self {
        Self::array(["**"])
    }
}

/// A pattern with its canonical descriptor.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: String,
    pub descriptor: ObjectDescriptor,
}

/// Rules in precedence order: later rules override earlier ones.
pub type NormalizedDescriptors = Vec<Rule>;

/// Converts either rule syntax into the canonical ordered rule list.
pub fn normalize(files: &FileDescriptors) -> NormalizedDescriptors {
    match files {
        FileDescriptors::Array(items) => items
            .iter()
            .map(|item| match item {
                FileDescriptorItem::Pattern(pattern) | FileDescriptorItem::Pair(pattern, None) => {
                    Rule {
                        pattern: pattern.clone(),
                        descriptor: ObjectDescriptor::new(),
                    }
                }
                FileDescriptorItem::Pair(pattern, Some(descriptor)) => Rule {
                    pattern: pattern.clone(),
                    descriptor: descriptor.clone().into_object(),
                },
            })
            .collect(),
        FileDescriptors::Map(entries) => entries
            .iter()
            .map(|(pattern, descriptor)| Rule {
                pattern: pattern.clone(),
                descriptor: descriptor.clone().into_object(),
            })
            .collect(),
    }
}
