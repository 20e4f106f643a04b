//! Document content snapshots
//!
//! A snapshot is persisted verbatim as the revision blob:
//!
//! ```json
//! { "title": "...", "sections": [ { "title": "...", "content": "..." } ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A titled block of document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub title: String,
    pub content: String,
}

impl DocumentSection {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Full content of one document revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContent {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<DocumentSection>,
}

impl DocumentContent {
    pub fn new(title: impl Into<String>, sections: Vec<DocumentSection>) -> Self {
        Self {
            title: title.into(),
            sections,
        }
    }

    /// Parse and validate a snapshot received at a boundary
    pub fn from_json_slice(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| CoreError::InvalidContent(e.to_string()))
    }

    /// Validate an untyped JSON value against the snapshot shape
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| CoreError::InvalidContent(e.to_string()))
    }

    /// Serialize as pretty-printed UTF-8 JSON, the on-disk blob format
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// The title as given, if it carries anything besides whitespace
    pub fn supplied_title(&self) -> Option<&str> {
        if self.title.trim().is_empty() {
            None
        } else {
            Some(&self.title)
        }
    }
}
