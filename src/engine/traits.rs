//! Container engine traits
//!
//! Capability surface consumed from the external container engine, the
//! off-screen renderer, and the rendering host. Implementations are supplied
//! by the embedding application; this crate only drives them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::source::SourceDescriptor;

use super::types::{ContainerEvent, RawMetadata, RenderOptions, SectionDocument, SpineEntry, TocNode};

/// Factory for container handles
///
/// Each handle accepts exactly one `open`; retrieval paths that need a
/// second open (the render fallback) create a fresh handle.
pub trait ContainerEngine: Send + Sync {
    /// Create a new, unopened container handle
    fn create(&self) -> Result<Arc<dyn ContainerHandle>>;
}

/// One container instance, exclusively owned by its session
#[async_trait]
pub trait ContainerHandle: Send + Sync {
    /// Begin opening the container from the given source.
    ///
    /// Completion is reported asynchronously through [`subscribe`]: exactly
    /// one `Ready` or `Error` event per open attempt.
    ///
    /// [`subscribe`]: ContainerHandle::subscribe
    fn open(&self, source: SourceDescriptor) -> Result<()>;

    /// Subscribe to lifecycle events.
    ///
    /// Dropping the receiver detaches the subscription; no callback can fire
    /// after the caller stops listening.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ContainerEvent>;

    /// Hierarchical table of contents, empty when the container declares none
    fn toc(&self) -> Vec<TocNode>;

    /// Physical reading order
    fn spine(&self) -> Vec<SpineEntry>;

    /// Look up the spine item for `href` and load its section document
    async fn load_spine_item(&self, href: &str) -> Result<SectionDocument>;

    /// Load `href` directly, bypassing the spine lookup
    async fn load_href(&self, href: &str) -> Result<SectionDocument>;

    /// Raw bibliographic metadata map
    fn metadata(&self) -> RawMetadata;

    /// Locate the cover image, if the container declares one
    async fn cover_url(&self) -> Result<Option<String>>;

    /// Attach an off-screen surface and return a rendition driving it
    fn render_to(
        &self,
        surface: Arc<dyn RenderSurface>,
        options: RenderOptions,
    ) -> Result<Arc<dyn Rendition>>;

    /// Release engine-side resources.
    ///
    /// Default is a no-op for engines without an explicit destroy capability.
    fn destroy(&self) {}
}

/// A rendition driving content onto an attached surface
pub trait Rendition: Send + Sync {
    /// Subscribe to the "content displayed" signal.
    ///
    /// One message arrives per successful `display`; dropping the receiver
    /// detaches the subscription.
    fn subscribe_displayed(&self) -> mpsc::UnboundedReceiver<()>;

    /// Ask the rendition to display the section at `href`
    fn display(&self, href: &str) -> Result<()>;
}

/// An off-screen rendering surface
pub trait RenderSurface: Send + Sync {
    /// Final rendered markup currently on the surface
    fn markup(&self) -> Result<String>;

    /// Tear the surface down. Idempotent.
    fn dispose(&self);
}

/// Factory for off-screen rendering surfaces
pub trait RenderHost: Send + Sync {
    /// Allocate a new off-screen surface
    fn create_surface(&self) -> Result<Arc<dyn RenderSurface>>;
}
