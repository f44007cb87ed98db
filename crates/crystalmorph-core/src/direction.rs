//! Crystallographic direction labels.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A facet direction such as `1 0 0` or `-1 1 0`.
///
/// Parameter logs and CSV headers spell the same direction with different
/// spacing (`" 1 0 0"`, `"1  0 0"`), so equality and hashing use a
/// whitespace-normalised key while the original label is kept for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Direction {
    label: String,
    key: String,
}

impl Direction {
    /// Creates a direction from its label.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.trim().to_string(),
            key: normalize(label),
        }
    }

    /// The label as first written.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whitespace-normalised comparison key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// `text` names this direction, ignoring spacing.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        normalize(text) == self.key
    }
}

/// Collapse runs of whitespace to single spaces and trim.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every whitespace token of `text` is a signed integer (and there is at least one).
#[must_use]
pub fn is_index_triple(text: &str) -> bool {
    let mut tokens = text.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|t| t.parse::<i32>().is_ok())
}

impl PartialEq for Direction {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Direction {}

impl Hash for Direction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl From<&str> for Direction {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Direction {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<Direction> for String {
    fn from(d: Direction) -> Self {
        d.label
    }
}
