//! Semantic version codes (`major.minor.patch`)
//!
//! Also hosts the heuristic that picks a bump kind from a content change.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::content::{DocumentContent, DocumentSection};
use crate::error::{CoreError, Result};

/// Length difference (in characters) above which a section edit is a
/// minor change rather than a patch.
const MINOR_CONTENT_DELTA: usize = 50;

/// A parsed `major.minor.patch` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionCode {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionCode {
    /// Version assigned to every new document and roadmap
    pub const INITIAL: VersionCode = VersionCode::new(1, 0, 0);

    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Parse exactly three dot-separated non-negative integers
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidVersionFormat(text.to_string());

        let mut parts = text.split('.');
        let mut next = || -> Result<u64> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };

        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }

    pub fn is_valid(text: &str) -> bool {
        Self::parse(text).is_ok()
    }

    /// Apply a bump; lower components reset to zero
    pub fn bump(self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => Self::new(self.major + 1, 0, 0),
            BumpKind::Minor => Self::new(self.major, self.minor + 1, 0),
            BumpKind::Patch => Self::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl fmt::Display for VersionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Format components as `major.minor.patch`
pub fn format(major: u64, minor: u64, patch: u64) -> String {
    VersionCode::new(major, minor, patch).to_string()
}

/// Increment a version string by `kind`
pub fn increment(text: &str, kind: &str) -> Result<String> {
    let kind: BumpKind = kind.parse()?;
    Ok(VersionCode::parse(text)?.bump(kind).to_string())
}

/// Compare two version strings component-wise
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(VersionCode::parse(a)?.cmp(&VersionCode::parse(b)?))
}

/// Which component of a version to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl BumpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "major" => Ok(BumpKind::Major),
            "minor" => Ok(BumpKind::Minor),
            "patch" => Ok(BumpKind::Patch),
            other => Err(CoreError::InvalidBumpKind(other.to_string())),
        }
    }
}

/// Bump requested by a caller updating a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BumpRequest {
    /// Let [`classify_content_change`] decide
    #[default]
    Auto,
    Explicit(BumpKind),
}

impl BumpRequest {
    /// Resolve to a concrete kind given the previous and next content
    pub fn resolve(self, old: &DocumentContent, new: &DocumentContent) -> BumpKind {
        match self {
            BumpRequest::Auto => classify_content_change(old, new),
            BumpRequest::Explicit(kind) => kind,
        }
    }
}

impl FromStr for BumpRequest {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(BumpRequest::Auto),
            other => other.parse().map(BumpRequest::Explicit),
        }
    }
}

/// Title -> content lookup in first-seen title order; a repeated title
/// keeps the content of its last occurrence.
pub(crate) fn section_map(sections: &[DocumentSection]) -> (Vec<&str>, HashMap<&str, &DocumentSection>) {
    let mut order = Vec::new();
    let mut map = HashMap::new();
    for section in sections {
        if map.insert(section.title.as_str(), section).is_none() {
            order.push(section.title.as_str());
        }
    }
    (order, map)
}

/// Pick a bump kind for a content change.
///
/// Structural changes (title, section count, section titles, or a
/// section whose length moves by more than 50 characters) are minor.
/// Anything else, including no change at all, is a patch.
pub fn classify_content_change(old: &DocumentContent, new: &DocumentContent) -> BumpKind {
    if old.title != new.title {
        return BumpKind::Minor;
    }

    if old.sections.len() != new.sections.len() {
        return BumpKind::Minor;
    }

    let (old_order, old_map) = section_map(&old.sections);
    let (_, new_map) = section_map(&new.sections);

    if old_map.len() != new_map.len() || old_map.keys().any(|title| !new_map.contains_key(title)) {
        return BumpKind::Minor;
    }

    for title in old_order {
        let old_content = &old_map[title].content;
        let new_content = &new_map[title].content;
        if old_content != new_content
            && old_content.chars().count().abs_diff(new_content.chars().count()) > MINOR_CONTENT_DELTA
        {
            return BumpKind::Minor;
        }
    }

    BumpKind::Patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn doc(title: &str, sections: &[(&str, &str)]) -> DocumentContent {
        DocumentContent::new(
            title,
            sections.iter().map(|(t, c)| DocumentSection::new(*t, *c)).collect(),
        )
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(VersionCode::parse("1.2.3").unwrap(), VersionCode::new(1, 2, 3));
        assert_eq!(VersionCode::parse("0.0.1").unwrap(), VersionCode::new(0, 0, 1));
        assert_eq!(VersionCode::parse("10.20.30").unwrap(), VersionCode::new(10, 20, 30));
    }

    #[test]
    fn test_is_valid() {
        assert!(!VersionCode::is_valid("1.2"));
        assert!(!VersionCode::is_valid("1.2.3.4"));
        assert!(!VersionCode::is_valid("a.b.c"));
        assert!(!VersionCode::is_valid("1.2.a"));
        assert!(!VersionCode::is_valid("+1.2.3"));
        assert!(!VersionCode::is_valid("1.2.3-beta"));
        assert!(!VersionCode::is_valid("1..3"));
        assert!(!VersionCode::is_valid(""));
        assert!(VersionCode::is_valid("1.2.3"));
    }

    #[test]
    fn test_parse_error_kind() {
        let err = VersionCode::parse("1.2").unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersionFormat(ref v) if v == "1.2"));
    }

    #[test]
    fn test_increment() {
        assert_eq!(increment("1.2.3", "major").unwrap(), "2.0.0");
        assert_eq!(increment("1.2.3", "minor").unwrap(), "1.3.0");
        assert_eq!(increment("1.2.3", "patch").unwrap(), "1.2.4");
        assert_eq!(increment("1.9.9", "minor").unwrap(), "1.10.0");
        assert_eq!(increment("0.9.9", "major").unwrap(), "1.0.0");
        assert_eq!(increment("1.2.9", "patch").unwrap(), "1.2.10");
    }

    #[test]
    fn test_increment_invalid_kind() {
        let err = increment("1.2.3", "invalid").unwrap_err();
        assert!(matches!(err, CoreError::InvalidBumpKind(_)));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare("2.0.0", "1.9.9").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.2.9", "1.3.0").unwrap(), Ordering::Less);
        assert_eq!(compare("1.2.3", "1.2.3").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.10.0", "1.9.0").unwrap(), Ordering::Greater);
        assert!(compare("1.2", "1.2.3").is_err());
    }

    #[test]
    fn test_bump_request_parse() {
        assert_eq!("auto".parse::<BumpRequest>().unwrap(), BumpRequest::Auto);
        assert_eq!(
            "major".parse::<BumpRequest>().unwrap(),
            BumpRequest::Explicit(BumpKind::Major)
        );
        assert!("huge".parse::<BumpRequest>().is_err());
    }

    #[test]
    fn test_classify_title_change_is_minor() {
        let old = doc("A", &[("S1", "x")]);
        let new = doc("B", &[("S1", "x")]);
        assert_eq!(classify_content_change(&old, &new), BumpKind::Minor);
    }

    #[test]
    fn test_classify_section_count_change_is_minor() {
        let old = doc("A", &[("S1", "x")]);
        let new = doc("A", &[("S1", "x"), ("S2", "y")]);
        assert_eq!(classify_content_change(&old, &new), BumpKind::Minor);
    }

    #[test]
    fn test_classify_renamed_section_is_minor() {
        let old = doc("A", &[("S1", "x")]);
        let new = doc("A", &[("S9", "x")]);
        assert_eq!(classify_content_change(&old, &new), BumpKind::Minor);
    }

    #[test]
    fn test_classify_large_growth_is_minor() {
        let old = doc("A", &[("S1", "x")]);
        let grown = format!("x{}", "y".repeat(51));
        let new = doc("A", &[("S1", grown.as_str())]);
        assert_eq!(classify_content_change(&old, &new), BumpKind::Minor);
    }

    #[test]
    fn test_classify_exactly_fifty_is_patch() {
        let old = doc("A", &[("S1", "x")]);
        let grown = format!("x{}", "y".repeat(50));
        let new = doc("A", &[("S1", grown.as_str())]);
        assert_eq!(classify_content_change(&old, &new), BumpKind::Patch);
    }

    #[test]
    fn test_classify_counts_characters_not_bytes() {
        let old = doc("A", &[("S1", "あ")]);
        let new = doc("A", &[("S1", "あいうえおかきくけこ")]);
        assert_eq!(classify_content_change(&old, &new), BumpKind::Patch);
    }

    #[test]
    fn test_classify_small_edit_is_patch() {
        let old = doc("A", &[("S1", "hello world")]);
        let new = doc("A", &[("S1", "hello brave new world")]);
        assert_eq!(classify_content_change(&old, &new), BumpKind::Patch);
    }

    #[test]
    fn test_classify_identical_is_patch() {
        let old = doc("A", &[("S1", "x"), ("S2", "y")]);
        assert_eq!(classify_content_change(&old, &old.clone()), BumpKind::Patch);
    }

    #[test]
    fn test_classify_duplicate_titles_last_wins() {
        // Same count, same title set; the duplicated title resolves to its last content.
        let old = doc("A", &[("S1", "a"), ("S1", "b")]);
        let new = doc("A", &[("S1", "zzz"), ("S1", "b")]);
        assert_eq!(classify_content_change(&old, &new), BumpKind::Patch);
    }

    proptest! {
        #[test]
        fn prop_format_parse_round_trip(major in 0u64..100_000, minor in 0u64..100_000, patch in 0u64..100_000) {
            let text = format(major, minor, patch);
            prop_assert_eq!(VersionCode::parse(&text).unwrap(), VersionCode::new(major, minor, patch));
        }

        #[test]
        fn prop_compare_reflexive(major in 0u64..1000, minor in 0u64..1000, patch in 0u64..1000) {
            let text = format(major, minor, patch);
            prop_assert_eq!(compare(&text, &text).unwrap(), Ordering::Equal);
        }

        #[test]
        fn prop_bump_is_strictly_greater(major in 0u64..1000, minor in 0u64..1000, patch in 0u64..1000) {
            let v = VersionCode::new(major, minor, patch);
            for kind in [BumpKind::Major, BumpKind::Minor, BumpKind::Patch] {
                prop_assert!(v.bump(kind) > v);
            }
        }
    }
}
