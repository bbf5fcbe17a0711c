//! Canonical property paths.
//!
//! A [`PropertyPath`] is the dot-joined position of a field inside the
//! model graph, relative to the root: `project.settings.csv.separator`.
//! List elements use their decimal index as a segment (`rows.3.name`).
//!
//! The whole dependency system is keyed by these strings, not by object
//! identity: two reads of the same conceptual field through different
//! object identities are the same dependency only if their path strings
//! match.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dot-joined key identifying one field's position in the model graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyPath(String);

impl PropertyPath {
    /// The empty path — the position of the root object itself.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Create a path from an already dot-joined string.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Append one segment, yielding the child's path.
    pub fn join(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}.{segment}", self.0))
        }
    }

    /// Iterate the path's segments, outermost first. The root path has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    /// Whether this is the root (empty) path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for PropertyPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_from_root() {
        let p = PropertyPath::root().join("project");
        assert_eq!(p.as_str(), "project");
    }

    #[test]
    fn test_join_nested() {
        let p = PropertyPath::root()
            .join("project")
            .join("settings")
            .join("csv");
        assert_eq!(p.as_str(), "project.settings.csv");
    }

    #[test]
    fn test_list_index_segment() {
        let p = PropertyPath::new("rows").join("3").join("name");
        assert_eq!(p.as_str(), "rows.3.name");
    }

    #[test]
    fn test_segments() {
        let p = PropertyPath::new("a.b.c");
        let segs: Vec<&str> = p.segments().collect();
        assert_eq!(segs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_root_has_no_segments() {
        assert!(PropertyPath::root().is_root());
        assert_eq!(PropertyPath::root().segments().count(), 0);
    }
}
