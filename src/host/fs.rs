//! Local filesystem host
//!
//! A [`FileHost`] backed directly by the filesystem. Serves `file://` URLs
//! via `tokio::fs` and keeps buffer URLs in an in-memory table keyed by
//! generated `buffer://` handles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{EpubError, Result};

use super::FileHost;

const BUFFER_SCHEME: &str = "buffer://";
const FILE_SCHEME: &str = "file://";

/// Filesystem-backed file host
#[derive(Default)]
pub struct LocalFileHost {
    buffers: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl LocalFileHost {
    /// Create a new host with an empty buffer table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live buffer URLs
    pub fn buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }
}

#[async_trait]
impl FileHost for LocalFileHost {
    fn supports_byte_access(&self) -> bool {
        true
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with(BUFFER_SCHEME) {
            let buffer = self.buffers.lock().get(url).cloned();
            return buffer
                .map(|bytes| bytes.as_ref().clone())
                .ok_or_else(|| EpubError::Host(format!("unknown buffer URL '{url}'")));
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            return Err(EpubError::Host(format!(
                "LocalFileHost cannot fetch remote URL '{url}'"
            )));
        }

        let path = file_url_to_path(url);
        Ok(tokio::fs::read(path).await?)
    }

    async fn read_as_base64(&self, path: &str) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(BASE64.encode(bytes))
    }

    fn create_buffer_url(&self, bytes: Vec<u8>) -> Result<String> {
        let url = format!("{BUFFER_SCHEME}{}", Uuid::new_v4());
        self.buffers.lock().insert(url.clone(), Arc::new(bytes));
        Ok(url)
    }

    fn revoke_buffer_url(&self, url: &str) {
        self.buffers.lock().remove(url);
    }
}

/// Convert a `file://` URL back to a filesystem path.
///
/// Windows drive URLs carry an extra leading slash (`file:///C:/...`).
fn file_url_to_path(url: &str) -> String {
    let Some(rest) = url.strip_prefix(FILE_SCHEME) else {
        return url.to_string();
    };

    let bytes = rest.as_bytes();
    if bytes.len() >= 3
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':'
    {
        return rest[1..].to_string();
    }
    rest.to_string()
}
