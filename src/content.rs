//! Chapter content retrieval
//!
//! Obtains the rendered markup of a chapter through a cascade of extraction
//! strategies; no single method is reliable across all container variants.
//! The last resort opens a disposable second session and reads the markup
//! off an off-screen rendering surface.

use std::sync::Arc;

use crate::engine::{ContainerHandle, RenderOptions, RenderSurface, SectionDocument};
use crate::error::{EpubError, Result};
use crate::navigation;
use crate::resources::TemporaryResource;
use crate::session::{self, ContainerSession};
use crate::source::SourceDescriptor;

/// Extraction strategies, attempted in order; first success wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Spine lookup, then load through the session's shared loader
    SpineDirect,
    /// Direct load on the container handle, bypassing the spine
    BookDirect,
    /// Disposable second session rendered to an off-screen surface
    RenderFallback,
}

const CASCADE: [Strategy; 3] = [
    Strategy::SpineDirect,
    Strategy::BookDirect,
    Strategy::RenderFallback,
];

/// Rendered markup for the chapter at `href`.
///
/// Fails with [`EpubError::NotReady`] before readiness and with
/// [`EpubError::ExtractionFailed`] only after every strategy is exhausted.
pub async fn chapter_content(session: &ContainerSession, href: &str) -> Result<String> {
    let handle = session.require_ready()?;

    let mut last_error = EpubError::Engine("no extraction strategy attempted".to_string());
    for strategy in CASCADE {
        match attempt(session, &handle, href, strategy).await {
            Ok(markup) => {
                tracing::debug!(href = %href, strategy = ?strategy, "chapter content extracted");
                return Ok(markup);
            }
            Err(err) => {
                tracing::debug!(href = %href, strategy = ?strategy, error = %err, "extraction strategy failed");
                last_error = err;
            }
        }
    }

    Err(EpubError::ExtractionFailed {
        href: href.to_string(),
        source: Box::new(last_error),
    })
}

/// Rendered markup for the chapter at `index` in the flattened list
pub async fn chapter_by_index(session: &ContainerSession, index: usize) -> Result<String> {
    let chapters = navigation::chapters(session)?;
    let entry = chapters
        .get(index)
        .ok_or(EpubError::ChapterNotFound(index))?;
    chapter_content(session, &entry.href).await
}

async fn attempt(
    session: &ContainerSession,
    handle: &Arc<dyn ContainerHandle>,
    href: &str,
    strategy: Strategy,
) -> Result<String> {
    match strategy {
        Strategy::SpineDirect => section_markup(handle.load_spine_item(href).await?),
        Strategy::BookDirect => section_markup(handle.load_href(href).await?),
        Strategy::RenderFallback => render_fallback(session, href).await,
    }
}

fn section_markup(section: SectionDocument) -> Result<String> {
    section
        .inner_markup()
        .map(str::to_string)
        .ok_or_else(|| EpubError::Engine("section loaded without markup".to_string()))
}

/// Last-resort extraction through an off-screen surface.
///
/// Opens a disposable second session against the same original path —
/// handles in this engine family permit exactly one `open` each, so the
/// primary cannot be reused. The surface and the disposable handle are torn
/// down on every exit path, including timeout.
async fn render_fallback(session: &ContainerSession, href: &str) -> Result<String> {
    let render_host = session
        .render_host()
        .ok_or_else(|| EpubError::Engine("no render host configured".to_string()))?;

    let handle = session.engine().create()?;
    let surface = render_host.create_surface()?;
    let surface_id = session.resources().register(TemporaryResource::Surface {
        surface: surface.clone(),
    });

    let budget = session.config().render_timeout;
    let outcome = tokio::time::timeout(
        budget,
        render_once(&handle, &surface, session.path(), href),
    )
    .await;

    session.resources().release(surface_id);
    handle.destroy();

    match outcome {
        Ok(result) => result,
        Err(_) => Err(EpubError::RenderTimeout(budget)),
    }
}

async fn render_once(
    handle: &Arc<dyn ContainerHandle>,
    surface: &Arc<dyn RenderSurface>,
    path: &str,
    href: &str,
) -> Result<String> {
    let mut events = handle.subscribe();
    handle.open(SourceDescriptor::FilePath(path.to_string()))?;
    session::await_ready(&mut events).await?;

    let rendition = handle.render_to(surface.clone(), RenderOptions::default())?;
    let mut displayed = rendition.subscribe_displayed();
    rendition.display(href)?;
    if displayed.recv().await.is_none() {
        return Err(EpubError::Engine(
            "renderer dropped before signalling display".to_string(),
        ));
    }

    let markup = surface.markup()?;
    if markup.trim().is_empty() {
        return Err(EpubError::Engine(
            "rendered surface produced no markup".to_string(),
        ));
    }
    Ok(markup)
}
