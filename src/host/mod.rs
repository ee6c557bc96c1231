//! Host file-access layer
//!
//! The loader never reads files itself; it asks the host for bytes. A host
//! exposes direct byte fetches, an optional base64 bridge for environments
//! where fetches fail, and temporary addressable URLs backed by in-memory
//! byte buffers.

mod fs;

use async_trait::async_trait;

use crate::error::Result;

pub use fs::LocalFileHost;

/// Host capability: "given a path, obtain one of {fetchable URL, raw bytes}"
#[async_trait]
pub trait FileHost: Send + Sync {
    /// Whether direct byte reads are available at all.
    ///
    /// Hosts without byte access can only hand URLs through to the engine.
    fn supports_byte_access(&self) -> bool;

    /// Fetch a URL as raw bytes
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Read a file as a base64 payload (data-URL style bridge)
    async fn read_as_base64(&self, path: &str) -> Result<String>;

    /// Allocate a temporary addressable URL backed by the given bytes.
    ///
    /// The URL stays fetchable until [`revoke_buffer_url`] is called.
    ///
    /// [`revoke_buffer_url`]: FileHost::revoke_buffer_url
    fn create_buffer_url(&self, bytes: Vec<u8>) -> Result<String>;

    /// Release a previously allocated buffer URL. Idempotent.
    fn revoke_buffer_url(&self, url: &str);
}
