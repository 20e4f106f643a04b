//! Section-level diff between two content snapshots
//!
//! Sections are matched by title. When a title repeats inside one
//! snapshot, the last occurrence wins.

use serde::{Deserialize, Serialize};

use crate::content::{DocumentContent, DocumentSection};
use crate::version::section_map;

/// A section present in both snapshots with different content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionModification {
    pub title: String,
    pub old_content: String,
    pub new_content: String,
}

/// Sections added, removed and modified between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDiff {
    pub added: Vec<DocumentSection>,
    pub removed: Vec<DocumentSection>,
    pub modified: Vec<SectionModification>,
}

impl SectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Diff between two stored revisions of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRevisionDiff {
    pub from_version: String,
    pub to_version: String,
    pub sections_added: Vec<DocumentSection>,
    pub sections_removed: Vec<DocumentSection>,
    pub sections_modified: Vec<SectionModification>,
}

/// Compare two snapshots section by section.
///
/// `added` follows the order of `new`; `removed` and `modified` follow
/// the order of `old`.
pub fn section_diff(old: &DocumentContent, new: &DocumentContent) -> SectionDiff {
    let (old_order, old_map) = section_map(&old.sections);
    let (new_order, new_map) = section_map(&new.sections);

    let added = new_order
        .iter()
        .filter(|title| !old_map.contains_key(*title))
        .map(|title| new_map[title].clone())
        .collect();

    let mut removed = Vec::new();
    let mut modified = Vec::new();
    for title in &old_order {
        let old_section = old_map[title];
        match new_map.get(title) {
            None => removed.push(old_section.clone()),
            Some(new_section) if new_section.content != old_section.content => {
                modified.push(SectionModification {
                    title: old_section.title.clone(),
                    old_content: old_section.content.clone(),
                    new_content: new_section.content.clone(),
                });
            }
            Some(_) => {}
        }
    }

    SectionDiff {
        added,
        removed,
        modified,
    }
}

/// Build a revision diff labelled with both version codes
pub fn revision_diff(
    old: &DocumentContent,
    new: &DocumentContent,
    from_version: &str,
    to_version: &str,
) -> DocumentRevisionDiff {
    let diff = section_diff(old, new);
    DocumentRevisionDiff {
        from_version: from_version.to_string(),
        to_version: to_version.to_string(),
        sections_added: diff.added,
        sections_removed: diff.removed,
        sections_modified: diff.modified,
    }
}
