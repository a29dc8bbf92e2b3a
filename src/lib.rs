//! Rule-driven file copying.
//!
//! A run takes a source directory and an ordered list of glob rules, decides for each
//! file whether to copy, rename, transform, override or drop it, and produces the
//! resulting file set in memory, optionally flushing it to a destination directory.
//!
//! ```rust,ignore
//! use gabarit::{copy, CopyOptions, FileDescriptors, ObjectDescriptor, Transform};
//!
//! let banner = Transform::sync(|content, _, _| Ok(format!("/* banner */\n{content}")));
//! let options = CopyOptions::new("template", "out").files(FileDescriptors::array([
//!     ("**", true.into()),
//!     ("**/*.ts", ObjectDescriptor::new().with_transform(banner).into()),
//! ]));
//!
//! let outcome = futures::executor::block_on(copy(options))?;
//! ```
pub mod api;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod matcher;
pub mod options;
pub mod pipeline;
pub mod preview;
pub mod prompt;
pub mod reconcile;
pub mod transactions;
pub mod vfs;

pub use api::{copy, copy_from_config, CopyError};
pub use descriptor::{
    normalize, Descriptor, FileDescriptorItem, FileDescriptors, NormalizedDescriptors,
    ObjectDescriptor, Override, Rename, Rule, Transform,
};
pub use errors::BoxError;
pub use options::CopyOptions;
pub use pipeline::{Emission, TransformerContext};
pub use reconcile::Outcome;
pub use vfs::FileSet;
