//! Container engine data types
//!
//! Shapes exchanged with the external container engine. The engine itself
//! (ZIP layout, OPF/NCX parsing) is a black box behind the traits in
//! `engine::traits`; these types describe only the surface this crate
//! consumes.

use serde::{Deserialize, Serialize};

/// Lifecycle event emitted by a container handle after `open`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    /// Container finished opening and is usable
    Ready,
    /// Container failed to open
    Error(String),
}

/// One node of the navigation tree declared by the container
///
/// Every field is optional; nodes without an `href` carry no destination
/// and exist only to group their children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocNode {
    pub id: Option<String>,
    pub href: Option<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub subitems: Vec<TocNode>,
}

/// One item of the container's physical reading order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpineEntry {
    pub id: Option<String>,
    pub href: String,
}

/// A loaded section document as reported by the engine
#[derive(Debug, Clone, Default)]
pub struct SectionDocument {
    /// Inner markup of the body element, when the section has a body wrapper
    pub body: Option<String>,
    /// Whole-document markup
    pub document: Option<String>,
}

impl SectionDocument {
    /// Inner body markup, falling back to whole-document markup.
    ///
    /// Returns `None` when neither carries non-whitespace content.
    pub fn inner_markup(&self) -> Option<&str> {
        self.body
            .as_deref()
            .or(self.document.as_deref())
            .filter(|markup| !markup.trim().is_empty())
    }
}

/// Options passed to the renderer when attaching a surface
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: String,
    pub height: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: "100%".to_string(),
            height: "100%".to_string(),
        }
    }
}

/// Loosely-typed bibliographic metadata as exposed by the engine
///
/// Field shapes vary by container; `creator` in particular may be a string,
/// a structured object, or a list of either.
pub type RawMetadata = serde_json::Map<String, serde_json::Value>;
