//! ScenePath parsing and formatting.
//!
//! Grammar (absolute, '/'-separated):
//!   /segment/segment/...
//! - every path starts with '/'
//! - "/" alone names the pseudo-root that sits above all top-level prims
//! - segments are non-empty and may not contain whitespace or '.'
//!   Examples:
//!   "/SkelBinding/Scope/Inherit" -> segments=["SkelBinding","Scope","Inherit"]
//!   "/Anim1" -> segments=["Anim1"]
//!
//! Paths are stored in their canonical textual form so that hashing and prefix
//! tests stay cheap; segment views are computed on demand.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing or extending a [`ScenePath`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenePathError {
    #[error("empty scene path")]
    Empty,
    #[error("scene path '{0}' is not absolute")]
    NotAbsolute(String),
    #[error("scene path '{0}' has an empty segment")]
    EmptySegment(String),
    #[error("scene path '{path}' has invalid segment '{segment}'")]
    InvalidSegment { path: String, segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScenePath(String);

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.chars().any(|c| c.is_whitespace() || c == '.' || c == '/')
}

impl ScenePath {
    /// The pseudo-root path "/".
    pub fn root() -> Self {
        ScenePath("/".to_string())
    }

    /// Parse a path string according to the grammar described above.
    pub fn parse(s: &str) -> Result<Self, ScenePathError> {
        if s.is_empty() {
            return Err(ScenePathError::Empty);
        }
        if !s.starts_with('/') {
            return Err(ScenePathError::NotAbsolute(s.to_string()));
        }
        if s == "/" {
            return Ok(Self::root());
        }
        for segment in s[1..].split('/') {
            if segment.is_empty() {
                return Err(ScenePathError::EmptySegment(s.to_string()));
            }
            if !valid_segment(segment) {
                return Err(ScenePathError::InvalidSegment {
                    path: s.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
        Ok(ScenePath(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last segment of the path; empty for the pseudo-root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    /// Parent path. The parent of a top-level prim is the pseudo-root; the
    /// pseudo-root itself has no parent.
    pub fn parent(&self) -> Option<ScenePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(ScenePath(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Append a single child segment.
    pub fn child(&self, name: &str) -> Result<ScenePath, ScenePathError> {
        if !valid_segment(name) {
            return Err(ScenePathError::InvalidSegment {
                path: self.0.clone(),
                segment: name.to_string(),
            });
        }
        if self.is_root() {
            Ok(ScenePath(format!("/{name}")))
        } else {
            Ok(ScenePath(format!("{}/{name}", self.0)))
        }
    }

    /// Iterate over all segments, outermost first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments; zero for the pseudo-root.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// True if `prefix` is this path or one of its ancestors.
    pub fn has_prefix(&self, prefix: &ScenePath) -> bool {
        if prefix.is_root() || self.0 == prefix.0 {
            return true;
        }
        self.0.len() > prefix.0.len()
            && self.0.starts_with(&prefix.0)
            && self.0.as_bytes()[prefix.0.len()] == b'/'
    }

    /// Rewrite the `old` prefix of this path into `new`. Returns `None` when
    /// `old` is not a prefix of this path.
    pub fn replace_prefix(&self, old: &ScenePath, new: &ScenePath) -> Option<ScenePath> {
        if !self.has_prefix(old) {
            return None;
        }
        if self == old {
            return Some(new.clone());
        }
        let suffix = if old.is_root() {
            self.0.as_str()
        } else {
            &self.0[old.0.len()..]
        };
        if new.is_root() {
            Some(ScenePath(suffix.to_string()))
        } else {
            Some(ScenePath(format!("{}{suffix}", new.0)))
        }
    }

    /// This path followed by each of its ancestors, stopping before the
    /// pseudo-root.
    pub fn ancestors(&self) -> impl Iterator<Item = ScenePath> {
        let mut next = if self.is_root() {
            None
        } else {
            Some(self.clone())
        };
        std::iter::from_fn(move || {
            let current = next.take()?;
            next = current.parent().filter(|p| !p.is_root());
            Some(current)
        })
    }
}

impl Default for ScenePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ScenePath {
    type Err = ScenePathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenePath::parse(s)
    }
}

impl AsRef<str> for ScenePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Serde support: serialize as string, deserialize from string
impl Serialize for ScenePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ScenePath {
    fn deserialize<D>(deserializer: D) -> Result<ScenePath, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ScenePath::parse(&s).map_err(de::Error::custom)
    }
}
