//! # Location Paths
//!
//! A [`Path`] identifies where inside a nested input a failure happened:
//! an ordered list of mapping keys and sequence indices, outermost first.
//! The empty path denotes the input root (used for structural and
//! model-level errors).
//!
//! Paths serialize as JSON arrays of strings and integers, e.g.
//! `["items", 1, "quantity"]`, and display as `items[1].quantity`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step in a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field name or mapping key.
    Key(String),
    /// Sequence position.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Location of a value inside a nested input, outermost segment first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The input root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns true if this path denotes the input root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// A new path extending this one by a single segment.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// A new path with `prefix` spliced in front of this one.
    ///
    /// Used to re-root a nested report under its parent field.
    pub fn prefixed(&self, prefix: &Path) -> Self {
        let mut segments = Vec::with_capacity(prefix.0.len() + self.0.len());
        segments.extend(prefix.0.iter().cloned());
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    /// The segments of this path, outermost first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
