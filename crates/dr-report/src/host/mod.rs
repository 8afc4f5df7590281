//! Collaborators the pipeline talks to but does not own.
//!
//! - [`ProgressHost`]: modal progress display
//! - [`AssetProvider`]: template PDF and logo bytes
//! - [`InfoResolver`]: tenant and dashboard display strings

pub mod assets;
pub mod info;
pub mod progress;

pub use assets::{AssetProvider, FileAssets, StaticAssets};
pub use info::{InfoResolver, StaticInfo, ViewInfoResolver};
pub use progress::{JsonlProgressHost, ModalKind, ModalUpdate, ProgressHost, TracingProgressHost};
