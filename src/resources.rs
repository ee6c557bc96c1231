//! Temporary resource registry
//!
//! Tracks temporary addressable byte-resources and off-screen surfaces
//! created while loading a container, and guarantees their release. Every
//! allocation registers here; whichever code path reaches a terminal state
//! first releases, and session close drains whatever is left.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::engine::RenderSurface;
use crate::host::FileHost;

/// Opaque handle to a registered temporary resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(Uuid);

impl ResourceId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A resource owned by the registry from creation until release
pub enum TemporaryResource {
    /// Temporary addressable URL backed by container bytes
    BufferUrl {
        url: String,
        host: Arc<dyn FileHost>,
    },
    /// Off-screen rendering surface
    Surface { surface: Arc<dyn RenderSurface> },
}

impl TemporaryResource {
    fn kind(&self) -> &'static str {
        match self {
            TemporaryResource::BufferUrl { .. } => "buffer-url",
            TemporaryResource::Surface { .. } => "render-surface",
        }
    }

    fn release(self) {
        match self {
            TemporaryResource::BufferUrl { url, host } => host.revoke_buffer_url(&url),
            TemporaryResource::Surface { surface } => surface.dispose(),
        }
    }
}

impl fmt::Debug for TemporaryResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Registry of temporary resources for one session
#[derive(Default)]
pub struct ResourceLifecycle {
    entries: Mutex<HashMap<ResourceId, TemporaryResource>>,
}

impl ResourceLifecycle {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, taking ownership until release
    pub fn register(&self, resource: TemporaryResource) -> ResourceId {
        let id = ResourceId::new();
        tracing::debug!(
            resource = %id,
            kind = resource.kind(),
            "registered temporary resource"
        );
        self.entries.lock().insert(id, resource);
        id
    }

    /// Release one resource.
    ///
    /// Idempotent: releasing an already-released or unknown id is a no-op.
    pub fn release(&self, id: ResourceId) {
        let Some(resource) = self.entries.lock().remove(&id) else {
            return;
        };
        tracing::debug!(resource = %id, kind = resource.kind(), "released temporary resource");
        resource.release();
    }

    /// Release everything still registered
    pub fn drain(&self) {
        let entries: Vec<(ResourceId, TemporaryResource)> =
            self.entries.lock().drain().collect();
        for (id, resource) in entries {
            tracing::debug!(resource = %id, kind = resource.kind(), "draining temporary resource");
            resource.release();
        }
    }

    /// Number of resources currently registered
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
