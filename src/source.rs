//! Source resolution
//!
//! Turns an opaque path or URL into a concrete openable source, trying
//! successively more primitive strategies: direct byte fetch wrapped in an
//! addressable buffer, the host's base64 bridge, a bare byte buffer, and
//! finally an unvalidated `file://` URL.
//!
//! Every successfully-read byte range is sniffed for the ZIP local-file-
//! header signature before use. A mismatch on read bytes is information,
//! not a transient failure, and fails the whole resolution.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{EpubError, Result};
use crate::host::FileHost;
use crate::resources::{ResourceId, ResourceLifecycle, TemporaryResource};

/// ZIP local-file-header signature, the first 4 bytes of every valid container
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// A concrete openable source, consumed by the container engine's `open`
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    /// Raw filesystem path, handed to the engine untouched
    FilePath(String),
    /// Normalized `file://` (or pass-through `http(s)://`) URL; degraded
    /// path with no format guarantee
    FileUrl(String),
    /// Validated container bytes
    ByteBuffer(Vec<u8>),
    /// Temporary addressable byte-resource, registered for later release
    BufferUrl {
        url: String,
        resource: ResourceId,
    },
}

impl SourceDescriptor {
    /// Short tag for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SourceDescriptor::FilePath(_) => "file-path",
            SourceDescriptor::FileUrl(_) => "file-url",
            SourceDescriptor::ByteBuffer(_) => "byte-buffer",
            SourceDescriptor::BufferUrl { .. } => "buffer-url",
        }
    }
}

/// Resolves paths into openable sources through the host file-access layer
pub struct SourceResolver {
    host: Arc<dyn FileHost>,
    resources: Arc<ResourceLifecycle>,
    fetch_budget: Duration,
}

impl SourceResolver {
    /// Create a resolver; buffer URLs it allocates are registered with
    /// `resources` for later release
    pub fn new(
        host: Arc<dyn FileHost>,
        resources: Arc<ResourceLifecycle>,
        fetch_budget: Duration,
    ) -> Self {
        Self {
            host,
            resources,
            fetch_budget,
        }
    }

    /// Resolve a path into an openable source.
    ///
    /// Slow attempts are bounded by the fetch budget and count as failed
    /// strategies; only signature mismatches and total exhaustion are hard
    /// errors.
    pub async fn resolve(&self, path: &str) -> Result<SourceDescriptor> {
        if path.trim().is_empty() {
            return Err(EpubError::SourceUnavailable(path.to_string()));
        }

        if !self.host.supports_byte_access() {
            let descriptor = resolve_without_byte_access(path);
            tracing::debug!(path = %path, source = descriptor.kind(), "resolved without byte access");
            return Ok(descriptor);
        }

        let file_url = normalize_file_url(path);

        // 1. Fetch bytes and wrap them in an addressable buffer URL.
        match self.fetch(&file_url).await {
            Ok(bytes) => {
                let bytes = check_signature(bytes, path)?;
                return self.wrap_buffer(bytes);
            }
            Err(err) => {
                tracing::debug!(path = %path, error = %err, "byte fetch failed, trying base64 bridge");
            }
        }

        // 2. Base64 bridge, same signature check, same wrapper.
        match self.read_base64(path).await {
            Ok(bytes) => {
                let bytes = check_signature(bytes, path)?;
                return self.wrap_buffer(bytes);
            }
            Err(err) => {
                tracing::debug!(path = %path, error = %err, "base64 bridge failed, trying direct fetch");
            }
        }

        // 3. Direct fetch with no addressable wrapper.
        match self.fetch(&file_url).await {
            Ok(bytes) => {
                let bytes = check_signature(bytes, path)?;
                return Ok(SourceDescriptor::ByteBuffer(bytes));
            }
            Err(err) => {
                tracing::debug!(path = %path, error = %err, "direct fetch failed");
            }
        }

        // 4. Degraded fallback: the URL goes through unvalidated.
        tracing::warn!(
            path = %path,
            url = %file_url,
            "all byte strategies failed, falling back to unvalidated file URL"
        );
        Ok(SourceDescriptor::FileUrl(file_url))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        match tokio::time::timeout(self.fetch_budget, self.host.fetch_bytes(url)).await {
            Ok(result) => result,
            Err(_) => Err(EpubError::Host(format!(
                "fetch of '{url}' exceeded {:?}",
                self.fetch_budget
            ))),
        }
    }

    async fn read_base64(&self, path: &str) -> Result<Vec<u8>> {
        let encoded = match tokio::time::timeout(self.fetch_budget, self.host.read_as_base64(path))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(EpubError::Host(format!(
                    "base64 read of '{path}' exceeded {:?}",
                    self.fetch_budget
                )))
            }
        };

        // Hosts may answer with a full data URL; the payload follows the comma.
        let payload = encoded.rsplit(',').next().unwrap_or(&encoded);
        BASE64
            .decode(payload.trim())
            .map_err(|err| EpubError::Host(format!("invalid base64 payload: {err}")))
    }

    fn wrap_buffer(&self, bytes: Vec<u8>) -> Result<SourceDescriptor> {
        let url = self.host.create_buffer_url(bytes)?;
        let resource = self.resources.register(TemporaryResource::BufferUrl {
            url: url.clone(),
            host: self.host.clone(),
        });
        Ok(SourceDescriptor::BufferUrl { url, resource })
    }
}

/// Reject successfully-read bytes that lack the container signature
fn check_signature(bytes: Vec<u8>, path: &str) -> Result<Vec<u8>> {
    if bytes.len() >= ZIP_SIGNATURE.len() && bytes[..ZIP_SIGNATURE.len()] == ZIP_SIGNATURE {
        Ok(bytes)
    } else {
        Err(EpubError::InvalidContainer(format!(
            "'{path}' lacks the ZIP local-file-header signature"
        )))
    }
}

fn resolve_without_byte_access(path: &str) -> SourceDescriptor {
    if path.starts_with("file://") || path.starts_with("http://") || path.starts_with("https://") {
        SourceDescriptor::FileUrl(path.to_string())
    } else {
        SourceDescriptor::FileUrl(normalize_file_url(path))
    }
}

/// Normalize a filesystem path into a `file://` URL.
///
/// Backslashes become forward slashes; drive-letter paths get the extra
/// slash Windows file URLs require.
pub(crate) fn normalize_file_url(path: &str) -> String {
    if path.starts_with("file://") {
        return path.to_string();
    }
    let normalized = path.replace('\\', "/");
    if has_drive_prefix(&normalized) {
        format!("file:///{normalized}")
    } else {
        format!("file://{normalized}")
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}
