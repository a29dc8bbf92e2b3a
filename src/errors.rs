use miette::Diagnostic;
use thiserror::Error;

/// Error type user transforms may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error, Diagnostic)]
pub enum FileOperation {
    #[error("reading a file")]
    Read,
    #[error("walking a directory")]
    Walk,
    #[error("writing a file")]
    Write,
    #[error("removing a file")]
    Remove,
    #[error("creating a directory")]
    Mkdir,
}
#[derive(Debug, Error, Diagnostic)]
#[error("I/O error: {operation} on path '{path}'")]
#[diagnostic(
    code(gabarit::io),
    help("Check file permissions, disk space, or that the path is correct.")
)]
pub struct IoError {
    pub operation: FileOperation,
    pub path: std::path::PathBuf,
    #[source]
    pub source: std::io::Error,
}
impl IoError {
    pub fn new(operation: FileOperation, path: std::path::PathBuf, error: std::io::Error) -> Self {
        Self {
            operation,
            path,
            source: error,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("Parsing error: toml on '{path}'")]
#[diagnostic(code(gabarit::parse), help("Review the config file"))]
pub struct ParseError {
    pub path: std::path::PathBuf,
    #[source]
    pub source: toml::de::Error,
}
impl ParseError {
    pub fn new(path: std::path::PathBuf, error: toml::de::Error) -> Self {
        Self {
            path,
            source: error,
        }
    }
}
