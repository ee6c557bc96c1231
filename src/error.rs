//! Error types
//!
//! Unified error handling for container loading and content extraction.

use std::time::Duration;

use thiserror::Error;

use crate::session::SessionState;

/// Unified loader error type
#[derive(Debug, Error)]
pub enum EpubError {
    /// Byte signature check failed on a successfully-read range
    #[error("not a valid EPUB container: {0}")]
    InvalidContainer(String),

    /// Every source-resolution strategy was exhausted
    #[error("no usable source for '{0}'")]
    SourceUnavailable(String),

    /// Operation invoked before `Ready` or after `Closed`
    #[error("session is not ready (state: {state:?})")]
    NotReady {
        /// Session state at the time of the call
        state: SessionState,
    },

    /// `open` called on a session that already consumed its one open
    #[error("container already opened; a session permits exactly one open")]
    AlreadyOpened,

    /// Container engine reported an error during open
    #[error("container open failed: {0}")]
    OpenFailed(String),

    /// Neither ready nor error arrived within the open budget
    #[error("container open timed out after {0:?}")]
    OpenTimeout(Duration),

    /// Chapter index outside the flattened chapter list
    #[error("chapter not found: index {0}")]
    ChapterNotFound(usize),

    /// All extraction strategies failed for a chapter
    #[error("all extraction strategies failed for '{href}'")]
    ExtractionFailed {
        /// Chapter destination reference
        href: String,
        /// Innermost strategy error
        #[source]
        source: Box<EpubError>,
    },

    /// Render fallback did not display within budget
    #[error("render fallback timed out after {0:?}")]
    RenderTimeout(Duration),

    /// Host file-access layer error
    #[error("host access error: {0}")]
    Host(String),

    /// Container engine error outside the open path
    #[error("container engine error: {0}")]
    Engine(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, EpubError>;
