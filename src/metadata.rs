//! Metadata normalization
//!
//! Maps the container's raw, loosely-typed bibliographic fields into a
//! fixed, typed record. The `creator` field in the wild is a plain string,
//! a structured object with a `name`, or a list of either; all three shapes
//! normalize to one comma-joined author string.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{ContainerHandle, RawMetadata};
use crate::error::Result;
use crate::navigation;
use crate::session::ContainerSession;
use crate::words;

/// Language reported when the container declares none.
///
/// A deliberate product default, not a detection result.
pub const DEFAULT_LANGUAGE: &str = "zh";

/// Normalized metadata record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpubMetadata {
    pub title: String,
    pub author: String,
    pub description: String,
    pub publisher: String,
    pub publish_date: String,
    pub language: String,
    /// Self-contained `data:` URI of the cover image, empty when absent
    pub cover: String,
    pub total_chapters: u32,
    pub total_words: u64,
}

impl Default for EpubMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            description: String::new(),
            publisher: String::new(),
            publish_date: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            cover: String::new(),
            total_chapters: 0,
            total_words: 0,
        }
    }
}

/// Normalized metadata for a ready session
pub async fn metadata(session: &ContainerSession) -> Result<EpubMetadata> {
    let handle = session.require_ready()?;
    let raw = handle.metadata();

    let chapters = navigation::chapters(session)?;
    let total_words = words::estimate_total_words(session).await?;

    // Cover failures are absorbed: the record simply has no cover.
    let cover = match fetch_cover(session, handle.as_ref()).await {
        Ok(Some(data_uri)) => data_uri,
        Ok(None) => String::new(),
        Err(err) => {
            tracing::warn!(path = %session.path(), error = %err, "cover fetch failed");
            String::new()
        }
    };

    let publish_date = {
        let date = string_field(&raw, "date");
        if date.is_empty() {
            string_field(&raw, "pubdate")
        } else {
            date
        }
    };
    let language = {
        let language = string_field(&raw, "language");
        if language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language
        }
    };

    Ok(EpubMetadata {
        title: string_field(&raw, "title"),
        author: normalize_creator(raw.get("creator")),
        description: string_field(&raw, "description"),
        publisher: string_field(&raw, "publisher"),
        publish_date,
        language,
        cover,
        total_chapters: chapters.len() as u32,
        total_words,
    })
}

async fn fetch_cover(
    session: &ContainerSession,
    handle: &dyn ContainerHandle,
) -> Result<Option<String>> {
    let Some(url) = handle.cover_url().await? else {
        return Ok(None);
    };

    let bytes = session.file_host().fetch_bytes(&url).await?;
    let clean = url.split(['#', '?']).next().unwrap_or(url.as_str());
    let mime = mime_guess::from_path(clean).first_or_octet_stream();
    Ok(Some(format!(
        "data:{};base64,{}",
        mime,
        BASE64.encode(&bytes)
    )))
}

fn string_field(raw: &RawMetadata, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn normalize_creator(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(name)) => name.clone(),
        Some(Value::Object(fields)) => fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(creator_name)
            .collect::<Vec<_>>()
            .join(", "),
        Some(_) => String::new(),
    }
}

fn creator_name(value: &Value) -> Option<&str> {
    match value {
        Value::String(name) => Some(name),
        Value::Object(fields) => fields.get("name").and_then(Value::as_str),
        _ => None,
    }
}
