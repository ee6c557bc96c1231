//! Container session lifecycle
//!
//! A [`ContainerSession`] owns the lifetime of one opened container and
//! drives the asynchronous open → ready/error state machine under a firm
//! timeout. Exactly one open attempt is permitted per session; whichever of
//! {ready, error, timeout} occurs first is authoritative.
//!
//! Callers must serialize `open`, content retrieval, and `close` on one
//! session; no internal lock discipline is provided. The render fallback's
//! secondary session is fully independent of the primary.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::content;
use crate::engine::{ContainerEngine, ContainerEvent, ContainerHandle, RenderHost};
use crate::error::{EpubError, Result};
use crate::host::FileHost;
use crate::metadata::{self, EpubMetadata};
use crate::navigation::{self, NavEntry};
use crate::resources::ResourceLifecycle;
use crate::source::SourceResolver;
use crate::words;

/// Default budget for the open ready/error race
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default budget for the render fallback, open through display
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-attempt budget for host fetches during source resolution
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default chapter sample size for the word estimate
pub const DEFAULT_SAMPLE_CHAPTERS: usize = 5;

/// Timeouts and sampling knobs for a loader
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Budget for the open ready/error race
    pub open_timeout: Duration,
    /// Budget for the render fallback, open through display
    pub render_timeout: Duration,
    /// Per-attempt budget for host fetches during source resolution
    pub fetch_timeout: Duration,
    /// Upper bound on chapters sampled for the word estimate
    pub sample_chapters: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            sample_chapters: DEFAULT_SAMPLE_CHAPTERS,
        }
    }
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Opening,
    Ready,
    Failed,
    Closed,
}

/// Entry point: binds an engine, a file host, and optionally a render host
pub struct EpubLoader {
    engine: Arc<dyn ContainerEngine>,
    file_host: Arc<dyn FileHost>,
    render_host: Option<Arc<dyn RenderHost>>,
    config: LoaderConfig,
}

impl EpubLoader {
    /// Create a loader with default configuration and no render fallback
    pub fn new(engine: Arc<dyn ContainerEngine>, file_host: Arc<dyn FileHost>) -> Self {
        Self {
            engine,
            file_host,
            render_host: None,
            config: LoaderConfig::default(),
        }
    }

    /// Enable the render fallback extraction path
    pub fn with_render_host(mut self, render_host: Arc<dyn RenderHost>) -> Self {
        self.render_host = Some(render_host);
        self
    }

    /// Override timeouts and sampling
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve `path`, open a container, and wait for readiness
    pub async fn open(&self, path: &str) -> Result<ContainerSession> {
        let session = ContainerSession::new(
            path,
            self.engine.clone(),
            self.file_host.clone(),
            self.render_host.clone(),
            self.config,
        );
        session.open().await?;
        Ok(session)
    }
}

/// One container instance and its lifecycle state
pub struct ContainerSession {
    path: String,
    engine: Arc<dyn ContainerEngine>,
    file_host: Arc<dyn FileHost>,
    render_host: Option<Arc<dyn RenderHost>>,
    config: LoaderConfig,
    state: RwLock<SessionState>,
    handle: RwLock<Option<Arc<dyn ContainerHandle>>>,
    resources: Arc<ResourceLifecycle>,
}

impl ContainerSession {
    /// Create an unopened session for `path`
    pub fn new(
        path: &str,
        engine: Arc<dyn ContainerEngine>,
        file_host: Arc<dyn FileHost>,
        render_host: Option<Arc<dyn RenderHost>>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            path: path.to_string(),
            engine,
            file_host,
            render_host,
            config,
            state: RwLock::new(SessionState::Unopened),
            handle: RwLock::new(None),
            resources: Arc::new(ResourceLifecycle::new()),
        }
    }

    /// Originating path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Whether the session reached `Ready` and has not been closed
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    pub(crate) fn engine(&self) -> &Arc<dyn ContainerEngine> {
        &self.engine
    }

    pub(crate) fn file_host(&self) -> &Arc<dyn FileHost> {
        &self.file_host
    }

    pub(crate) fn render_host(&self) -> Option<&Arc<dyn RenderHost>> {
        self.render_host.as_ref()
    }

    pub(crate) fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub(crate) fn resources(&self) -> &Arc<ResourceLifecycle> {
        &self.resources
    }

    /// Handle accessor for operations that require readiness
    pub(crate) fn require_ready(&self) -> Result<Arc<dyn ContainerHandle>> {
        let state = self.state();
        if state != SessionState::Ready {
            return Err(EpubError::NotReady { state });
        }
        self.handle
            .read()
            .clone()
            .ok_or(EpubError::NotReady { state })
    }

    /// Open the container.
    ///
    /// Consumes the session's single open attempt; a second call fails with
    /// [`EpubError::AlreadyOpened`] regardless of the first call's outcome.
    pub async fn open(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            if *state != SessionState::Unopened {
                return Err(EpubError::AlreadyOpened);
            }
            *state = SessionState::Opening;
        }

        tracing::info!(path = %self.path, "opening container");
        match self.try_open().await {
            Ok(handle) => {
                *self.handle.write() = Some(handle);
                *self.state.write() = SessionState::Ready;
                tracing::info!(path = %self.path, "container ready");
                Ok(())
            }
            Err(err) => {
                *self.state.write() = SessionState::Failed;
                // The attempt's temporary byte-resource is useless once the
                // open fails; a ready container keeps it until close because
                // the engine may still read from it lazily.
                self.resources.drain();
                tracing::warn!(path = %self.path, error = %err, "container open failed");
                Err(err)
            }
        }
    }

    async fn try_open(&self) -> Result<Arc<dyn ContainerHandle>> {
        let resolver = SourceResolver::new(
            self.file_host.clone(),
            self.resources.clone(),
            self.config.fetch_timeout,
        );
        let source = resolver.resolve(&self.path).await?;
        tracing::debug!(path = %self.path, source = source.kind(), "resolved container source");

        let handle = self.engine.create()?;
        // Subscribe before open so no event can be missed.
        let mut events = handle.subscribe();
        if let Err(err) = handle.open(source) {
            handle.destroy();
            return Err(err);
        }

        let outcome =
            match tokio::time::timeout(self.config.open_timeout, await_ready(&mut events)).await {
                Ok(result) => result,
                Err(_) => Err(EpubError::OpenTimeout(self.config.open_timeout)),
            };
        // Dropping the receiver here detaches the listeners; late events
        // cannot fire after the race is decided.
        drop(events);

        match outcome {
            Ok(()) => Ok(handle),
            Err(err) => {
                handle.destroy();
                Err(err)
            }
        }
    }

    /// Close the session from any state.
    ///
    /// Destroys the engine handle when present and drains every temporary
    /// resource the session registered. Idempotent.
    pub fn close(&self) {
        let previous = {
            let mut state = self.state.write();
            let previous = *state;
            *state = SessionState::Closed;
            previous
        };
        if previous == SessionState::Closed {
            return;
        }

        if let Some(handle) = self.handle.write().take() {
            handle.destroy();
        }
        self.resources.drain();
        tracing::info!(path = %self.path, "session closed");
    }

    /// Ordered chapter list, flattened from the TOC or spine
    pub fn chapters(&self) -> Result<Vec<NavEntry>> {
        navigation::chapters(self)
    }

    /// Normalized metadata record, including chapter and word totals
    pub async fn metadata(&self) -> Result<EpubMetadata> {
        metadata::metadata(self).await
    }

    /// Rendered markup for the chapter at `href`
    pub async fn chapter_content(&self, href: &str) -> Result<String> {
        content::chapter_content(self, href).await
    }

    /// Rendered markup for the chapter at `index` in the flattened list
    pub async fn chapter_by_index(&self, index: usize) -> Result<String> {
        content::chapter_by_index(self, index).await
    }

    /// Sampled estimate of the container's total word count
    pub async fn estimate_total_words(&self) -> Result<u64> {
        words::estimate_total_words(self).await
    }
}

impl Drop for ContainerSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Wait for the authoritative outcome of an open attempt.
///
/// The caller bounds this with its own budget; a closed stream without an
/// event is an engine defect, not a timeout.
pub(crate) async fn await_ready(events: &mut mpsc::UnboundedReceiver<ContainerEvent>) -> Result<()> {
    while let Some(event) = events.recv().await {
        match event {
            ContainerEvent::Ready => return Ok(()),
            ContainerEvent::Error(message) => return Err(EpubError::OpenFailed(message)),
        }
    }
    Err(EpubError::Engine(
        "event stream closed before ready or error".to_string(),
    ))
}
