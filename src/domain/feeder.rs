use serde::{Deserialize, Serialize};
use std::fmt;

/// Case-insensitive feeder name.
///
/// Names are trimmed and lowercased on construction, so `"Tanah Merah "` and
/// `"tanah merah"` identify the same feeder everywhere in the crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FeederId(String);

impl FeederId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FeederId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FeederId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for FeederId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<FeederId> for String {
    fn from(id: FeederId) -> Self {
        id.0
    }
}

impl AsRef<str> for FeederId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A feeder and its rated current limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feeder {
    pub id: FeederId,
    pub rated_capacity_a: f64,
}

impl Feeder {
    pub fn new(id: impl Into<FeederId>, rated_capacity_a: f64) -> Self {
        Self {
            id: id.into(),
            rated_capacity_a,
        }
    }

    /// Load in excess of the rating (A), zero when within limits
    pub fn overload_a(&self, load_a: f64) -> f64 {
        (load_a - self.rated_capacity_a).max(0.0)
    }

    /// Spare capacity (A) left before reaching the rating
    pub fn headroom_a(&self, load_a: f64) -> f64 {
        (self.rated_capacity_a - load_a).max(0.0)
    }

    pub fn is_within_rating(&self, load_a: f64) -> bool {
        load_a <= self.rated_capacity_a
    }
}
