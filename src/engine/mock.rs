//! Scripted engine, renderer, and host doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{EpubError, Result};
use crate::host::FileHost;
use crate::source::SourceDescriptor;

use super::traits::{ContainerEngine, ContainerHandle, RenderHost, RenderSurface, Rendition};
use super::types::{
    ContainerEvent, RawMetadata, RenderOptions, SectionDocument, SpineEntry, TocNode,
};

/// How a scripted handle answers an open attempt
#[derive(Debug, Clone, Default)]
pub(crate) enum OpenOutcome {
    #[default]
    Ready,
    Error(String),
    /// Neither ready nor error ever fires
    Hang,
}

#[derive(Clone, Default)]
pub(crate) struct MockBehavior {
    pub open_outcome: OpenOutcome,
    pub toc: Vec<TocNode>,
    pub spine: Vec<SpineEntry>,
    pub spine_sections: HashMap<String, SectionDocument>,
    pub direct_sections: HashMap<String, SectionDocument>,
    pub metadata: RawMetadata,
    pub cover_url: Option<String>,
    /// Renditions accept display calls but never signal
    pub render_hangs: bool,
}

/// Scripted container engine; every created handle shares the behavior
/// captured at creation time
#[derive(Default)]
pub(crate) struct MockEngine {
    behavior: Mutex<MockBehavior>,
    handles: Mutex<Vec<Arc<MockHandle>>>,
}

impl MockEngine {
    /// Engine whose handles open successfully
    pub fn ready() -> Self {
        Self::default()
    }

    pub fn with_outcome(outcome: OpenOutcome) -> Self {
        let engine = Self::default();
        engine.behavior.lock().open_outcome = outcome;
        engine
    }

    pub fn set_toc(&self, toc: Vec<TocNode>) {
        self.behavior.lock().toc = toc;
    }

    pub fn set_spine(&self, spine: Vec<SpineEntry>) {
        self.behavior.lock().spine = spine;
    }

    pub fn insert_spine_section(&self, href: &str, body: &str) {
        self.behavior.lock().spine_sections.insert(
            href.to_string(),
            SectionDocument {
                body: Some(body.to_string()),
                document: None,
            },
        );
    }

    pub fn insert_direct_section(&self, href: &str, body: &str) {
        self.behavior.lock().direct_sections.insert(
            href.to_string(),
            SectionDocument {
                body: Some(body.to_string()),
                document: None,
            },
        );
    }

    pub fn set_metadata(&self, value: serde_json::Value) {
        self.behavior.lock().metadata = value
            .as_object()
            .cloned()
            .expect("mock metadata must be a JSON object");
    }

    pub fn set_cover_url(&self, url: &str) {
        self.behavior.lock().cover_url = Some(url.to_string());
    }

    pub fn set_render_hangs(&self, hangs: bool) {
        self.behavior.lock().render_hangs = hangs;
    }

    /// The most recently created handle
    pub fn last_handle(&self) -> Option<Arc<MockHandle>> {
        self.handles.lock().last().cloned()
    }

    /// Number of handles created so far
    pub fn handle_count(&self) -> usize {
        self.handles.lock().len()
    }
}

impl ContainerEngine for MockEngine {
    fn create(&self) -> Result<Arc<dyn ContainerHandle>> {
        let handle = Arc::new(MockHandle::new(self.behavior.lock().clone()));
        self.handles.lock().push(handle.clone());
        Ok(handle)
    }
}

pub(crate) struct MockHandle {
    behavior: MockBehavior,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ContainerEvent>>>>,
    opened: Mutex<Option<SourceDescriptor>>,
    destroyed: AtomicBool,
}

impl MockHandle {
    fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            subscribers: Arc::new(Mutex::new(Vec::new())),
            opened: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn opened_source(&self) -> Option<SourceDescriptor> {
        self.opened.lock().clone()
    }

    fn announce(
        subscribers: &Arc<Mutex<Vec<mpsc::UnboundedSender<ContainerEvent>>>>,
        event: ContainerEvent,
    ) {
        for tx in subscribers.lock().iter() {
            let _ = tx.send(event.clone());
        }
    }
}

#[async_trait]
impl ContainerHandle for MockHandle {
    fn open(&self, source: SourceDescriptor) -> Result<()> {
        if self.opened.lock().replace(source).is_some() {
            return Err(EpubError::Engine("mock handle opened twice".to_string()));
        }
        let subscribers = self.subscribers.clone();
        match self.behavior.open_outcome.clone() {
            OpenOutcome::Ready => {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Self::announce(&subscribers, ContainerEvent::Ready);
                });
            }
            OpenOutcome::Error(message) => {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Self::announce(&subscribers, ContainerEvent::Error(message));
                });
            }
            OpenOutcome::Hang => {}
        }
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ContainerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn toc(&self) -> Vec<TocNode> {
        self.behavior.toc.clone()
    }

    fn spine(&self) -> Vec<SpineEntry> {
        self.behavior.spine.clone()
    }

    async fn load_spine_item(&self, href: &str) -> Result<SectionDocument> {
        self.behavior
            .spine_sections
            .get(href)
            .cloned()
            .ok_or_else(|| EpubError::Engine(format!("no spine item for '{href}'")))
    }

    async fn load_href(&self, href: &str) -> Result<SectionDocument> {
        self.behavior
            .direct_sections
            .get(href)
            .cloned()
            .ok_or_else(|| EpubError::Engine(format!("'{href}' not loadable directly")))
    }

    fn metadata(&self) -> RawMetadata {
        self.behavior.metadata.clone()
    }

    async fn cover_url(&self) -> Result<Option<String>> {
        Ok(self.behavior.cover_url.clone())
    }

    fn render_to(
        &self,
        surface: Arc<dyn RenderSurface>,
        _options: RenderOptions,
    ) -> Result<Arc<dyn Rendition>> {
        Ok(Arc::new(MockRendition {
            hangs: self.behavior.render_hangs,
            _surface: surface,
            displayed: Arc::new(Mutex::new(Vec::new())),
        }))
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

struct MockRendition {
    hangs: bool,
    _surface: Arc<dyn RenderSurface>,
    displayed: Arc<Mutex<Vec<mpsc::UnboundedSender<()>>>>,
}

impl Rendition for MockRendition {
    fn subscribe_displayed(&self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.displayed.lock().push(tx);
        rx
    }

    fn display(&self, _href: &str) -> Result<()> {
        if self.hangs {
            return Ok(());
        }
        let displayed = self.displayed.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            for tx in displayed.lock().iter() {
                let _ = tx.send(());
            }
        });
        Ok(())
    }
}

/// Render host handing out surfaces preloaded with fixed markup
pub(crate) struct MockRenderHost {
    markup: String,
    surfaces: Mutex<Vec<Arc<MockSurface>>>,
}

impl MockRenderHost {
    pub fn with_markup(markup: &str) -> Self {
        Self {
            markup: markup.to_string(),
            surfaces: Mutex::new(Vec::new()),
        }
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.lock().len()
    }

    pub fn all_disposed(&self) -> bool {
        self.surfaces.lock().iter().all(|s| s.is_disposed())
    }
}

impl RenderHost for MockRenderHost {
    fn create_surface(&self) -> Result<Arc<dyn RenderSurface>> {
        let surface = Arc::new(MockSurface {
            markup: self.markup.clone(),
            disposed: AtomicBool::new(false),
        });
        self.surfaces.lock().push(surface.clone());
        Ok(surface)
    }
}

pub(crate) struct MockSurface {
    markup: String,
    disposed: AtomicBool,
}

impl MockSurface {
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl RenderSurface for MockSurface {
    fn markup(&self) -> Result<String> {
        if self.is_disposed() {
            return Err(EpubError::Engine("surface already disposed".to_string()));
        }
        Ok(self.markup.clone())
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

/// Scripted file host backed by in-memory maps
pub(crate) struct MockFileHost {
    byte_access: bool,
    files: Mutex<HashMap<String, Vec<u8>>>,
    base64_files: Mutex<HashMap<String, Vec<u8>>>,
    buffers: Mutex<HashMap<String, Vec<u8>>>,
    revoked: Mutex<Vec<String>>,
}

impl MockFileHost {
    /// Host with direct byte access and no files
    pub fn with_bytes() -> Self {
        Self {
            byte_access: true,
            files: Mutex::new(HashMap::new()),
            base64_files: Mutex::new(HashMap::new()),
            buffers: Mutex::new(HashMap::new()),
            revoked: Mutex::new(Vec::new()),
        }
    }

    /// Host that can only hand URLs through
    pub fn without_byte_access() -> Self {
        let mut host = Self::with_bytes();
        host.byte_access = false;
        host
    }

    /// Register bytes fetchable at `url`
    pub fn insert_file(&self, url: &str, bytes: Vec<u8>) {
        self.files.lock().insert(url.to_string(), bytes);
    }

    /// Register bytes readable through the base64 bridge at `path`
    pub fn insert_base64_file(&self, path: &str, bytes: Vec<u8>) {
        self.base64_files.lock().insert(path.to_string(), bytes);
    }

    /// Synchronous helper for tests that need a live buffer URL
    pub fn create_buffer_url_sync(&self, bytes: Vec<u8>) -> String {
        let url = format!("buffer://{}", Uuid::new_v4());
        self.buffers.lock().insert(url.clone(), bytes);
        url
    }

    /// Number of buffer URLs actually revoked
    pub fn revoked_count(&self) -> usize {
        self.revoked.lock().len()
    }
}

#[async_trait]
impl FileHost for MockFileHost {
    fn supports_byte_access(&self) -> bool {
        self.byte_access
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(bytes) = self.buffers.lock().get(url) {
            return Ok(bytes.clone());
        }
        self.files
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| EpubError::Host(format!("no bytes at '{url}'")))
    }

    async fn read_as_base64(&self, path: &str) -> Result<String> {
        self.base64_files
            .lock()
            .get(path)
            .map(|bytes| BASE64.encode(bytes))
            .ok_or_else(|| EpubError::Host(format!("no base64 bridge entry for '{path}'")))
    }

    fn create_buffer_url(&self, bytes: Vec<u8>) -> Result<String> {
        Ok(self.create_buffer_url_sync(bytes))
    }

    fn revoke_buffer_url(&self, url: &str) {
        if self.buffers.lock().remove(url).is_some() {
            self.revoked.lock().push(url.to_string());
        }
    }
}

/// Build a raw metadata map from a JSON literal
pub(crate) fn raw_metadata(value: serde_json::Value) -> RawMetadata {
    value
        .as_object()
        .cloned()
        .expect("raw metadata literal must be a JSON object")
}
