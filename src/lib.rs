//! EPUB container sessions
//!
//! Opens EPUB containers through a pluggable container engine and extracts
//! navigation, chapter text, normalized metadata, and a sampled word-count
//! estimate. Sources are resolved through a [`host::FileHost`] with a
//! best-effort cascade that prefers handing the engine raw bytes, and every
//! temporary resource a session creates is released when it closes.
//!
//! # Modules
//!
//! - [`engine`]: Container engine and render surface traits
//! - [`host`]: File access abstraction plus a local-filesystem host
//! - [`error`]: Crate error type
//!
//! The usual entry point is [`EpubLoader`]:
//!
//! ```ignore
//! let loader = EpubLoader::new(engine, file_host);
//! let session = loader.open("/books/a.epub").await?;
//! let chapters = session.chapters()?;
//! let meta = session.metadata().await?;
//! ```

pub mod engine;
pub mod error;
pub mod host;

mod content;
mod metadata;
mod navigation;
mod resources;
mod session;
mod source;
mod words;

pub use error::{EpubError, Result};
pub use metadata::{EpubMetadata, DEFAULT_LANGUAGE};
pub use navigation::NavEntry;
pub use resources::{ResourceId, ResourceLifecycle, TemporaryResource};
pub use session::{ContainerSession, EpubLoader, LoaderConfig, SessionState};
pub use source::{SourceDescriptor, SourceResolver, ZIP_SIGNATURE};
pub use words::{count_words, strip_markup};
