//! Navigation indexing
//!
//! Flattens the container's hierarchical table of contents into an ordered
//! chapter list, falling back to the physical spine order when the
//! container declares no TOC.

use serde::{Deserialize, Serialize};

use crate::engine::{SpineEntry, TocNode};
use crate::error::Result;
use crate::session::ContainerSession;

/// One chapter in the flattened, order-stable list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEntry {
    /// Chapter id, synthesized as `chapter-<order>` when the TOC omits one
    pub id: String,
    /// Destination reference inside the container
    pub href: String,
    /// Display label, synthesized as `章节 <order+1>` when missing
    pub label: String,
    /// 0-based position, contiguous across the whole list
    pub order: u32,
}

/// Ordered chapter list for a ready session.
///
/// TOC nodes without an href carry no destination: they are skipped, but
/// their children are still visited.
pub fn chapters(session: &ContainerSession) -> Result<Vec<NavEntry>> {
    let handle = session.require_ready()?;

    let toc = handle.toc();
    let mut entries = if toc.is_empty() {
        spine_entries(&handle.spine())
    } else {
        flatten_toc(&toc, 0).0
    };

    // The fold already emits in order; sorting guarantees the contract even
    // if the tree traversal is ever reentered unusually.
    entries.sort_by_key(|entry| entry.order);
    Ok(entries)
}

/// Depth-first pre-order fold over the TOC.
///
/// Returns the emitted entries together with the next free order number so
/// recursive calls never share a mutable accumulator.
fn flatten_toc(nodes: &[TocNode], start: u32) -> (Vec<NavEntry>, u32) {
    nodes.iter().fold(
        (Vec::new(), start),
        |(mut entries, mut order), node| {
            if let Some(href) = non_empty(node.href.as_deref()) {
                entries.push(NavEntry {
                    id: non_empty(node.id.as_deref())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("chapter-{order}")),
                    href: href.to_string(),
                    label: non_empty(node.label.as_deref())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("章节 {}", order + 1)),
                    order,
                });
                order += 1;
            }

            let (children, next) = flatten_toc(&node.subitems, order);
            entries.extend(children);
            (entries, next)
        },
    )
}

fn spine_entries(spine: &[SpineEntry]) -> Vec<NavEntry> {
    spine
        .iter()
        .enumerate()
        .map(|(index, item)| NavEntry {
            id: non_empty(item.id.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| format!("spine-{index}")),
            href: item.href.clone(),
            label: format!("章节 {}", index + 1),
            order: index as u32,
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
