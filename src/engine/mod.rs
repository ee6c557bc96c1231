//! Container engine abstraction
//!
//! The low-level container engine (ZIP layout, OPF/NCX parsing, rendering)
//! lives outside this crate. This module defines the capability surface the
//! loader consumes from it: an event-driven open, TOC and spine accessors,
//! section loading, and a last-resort rendering path.

mod traits;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use traits::{ContainerEngine, ContainerHandle, RenderHost, RenderSurface, Rendition};
pub use types::{
    ContainerEvent, RawMetadata, RenderOptions, SectionDocument, SpineEntry, TocNode,
};
