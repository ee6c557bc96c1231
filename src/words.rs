//! Word counting and whole-book estimation
//!
//! Counting treats each Han character as one word and each maximal run of
//! ASCII letters as one word; everything else is a separator. The whole-book
//! figure is a sampled estimate, not an exact count: the first few chapters
//! are retrieved, counted, and their mean is scaled by the chapter total.

use std::cell::RefCell;

use lol_html::{doc_text, HtmlRewriter, Settings};

use crate::error::Result;
use crate::navigation;
use crate::session::ContainerSession;

/// Plain text of an HTML fragment or document.
///
/// Script and style contents are dropped, tags are removed, and character
/// entities are decoded. Falls back to returning the input unchanged if the
/// markup is too malformed to stream.
pub fn strip_markup(markup: &str) -> String {
    let pruned = remove_tag_blocks(markup, &["script", "style"]);

    let text = RefCell::new(String::new());
    let streamed = {
        let mut rewriter = HtmlRewriter::new(
            Settings {
                document_content_handlers: vec![doc_text!(|chunk| {
                    text.borrow_mut().push_str(chunk.as_str());
                    Ok(())
                })],
                ..Settings::new()
            },
            |_: &[u8]| {},
        );
        match rewriter.write(pruned.as_bytes()) {
            Ok(()) => rewriter.end(),
            Err(err) => Err(err),
        }
    };
    if let Err(err) = streamed {
        tracing::warn!(error = %err, "markup stripping failed, counting raw text");
        return markup.to_string();
    }

    html_escape::decode_html_entities(&text.into_inner()).into_owned()
}

/// Drop `<tag ...>...</tag>` blocks for each named tag, case-insensitively.
///
/// The streaming rewriter surfaces script and style contents as ordinary
/// text chunks, so those blocks are cut out before it runs.
fn remove_tag_blocks(markup: &str, tags: &[&str]) -> String {
    let lower = markup.to_ascii_lowercase();
    let mut keep = vec![true; markup.len()];
    for tag in tags {
        let open = format!("<{tag}");
        let close = format!("</{tag}>");
        let mut from = 0;
        while let Some(rel) = lower[from..].find(&open) {
            let start = from + rel;
            let after = start + open.len();
            // Require a real tag boundary so "style" never matches "styles".
            let boundary = matches!(
                lower.as_bytes().get(after).copied(),
                None | Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/')
            );
            if !boundary {
                from = after;
                continue;
            }
            let end = match lower[start..].find(&close) {
                Some(rel_end) => start + rel_end + close.len(),
                None => lower.len(),
            };
            keep[start..end].iter_mut().for_each(|flag| *flag = false);
            from = end;
        }
    }
    markup
        .char_indices()
        .filter(|(index, _)| keep[*index])
        .map(|(_, ch)| ch)
        .collect()
}

/// Word count of already-stripped text
pub fn count_words(text: &str) -> u64 {
    let mut count = 0u64;
    let mut in_latin_run = false;
    for ch in text.chars() {
        if ('\u{4e00}'..='\u{9fa5}').contains(&ch) {
            count += 1;
            in_latin_run = false;
        } else if ch.is_ascii_alphabetic() {
            if !in_latin_run {
                count += 1;
                in_latin_run = true;
            }
        } else {
            in_latin_run = false;
        }
    }
    count
}

/// Estimate the container's total word count from a chapter sample.
///
/// Chapters that fail to load are skipped; the mean is taken over the
/// chapters that actually produced text. An empty container, or a sample in
/// which every chapter failed, estimates zero.
pub async fn estimate_total_words(session: &ContainerSession) -> Result<u64> {
    let chapters = navigation::chapters(session)?;
    if chapters.is_empty() {
        return Ok(0);
    }

    let sample_size = chapters.len().min(session.config().sample_chapters);
    let mut sampled = 0u64;
    let mut sampled_words = 0u64;
    for entry in chapters.iter().take(sample_size) {
        match crate::content::chapter_content(session, &entry.href).await {
            Ok(markup) => {
                sampled += 1;
                sampled_words += count_words(&strip_markup(&markup));
            }
            Err(err) => {
                tracing::warn!(
                    href = %entry.href,
                    order = entry.order,
                    error = %err,
                    "skipping unreadable chapter in word sample"
                );
            }
        }
    }
    if sampled == 0 {
        return Ok(0);
    }

    let mean = sampled_words as f64 / sampled as f64;
    let estimate = (mean * chapters.len() as f64).round() as u64;
    tracing::debug!(
        path = %session.path(),
        sampled,
        total_chapters = chapters.len(),
        estimate,
        "estimated total words"
    );
    Ok(estimate)
}
