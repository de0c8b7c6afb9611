//! Value shapes held by a cache
//!
//! A cache holds either scalars or sets for its whole lifetime. The shape is
//! a type parameter, so a scalar cache cannot be wired to a set store.
//!
//! | Shape | Rust type | Null |
//! |-------|-----------|------|
//! | scalar | `Option<String>` | `None` |
//! | set | `Option<BTreeSet<String>>` | `None` (an empty set normalizes to it) |
//!
//! Absence is not a value. A key nobody has seen is a `NotFound` error.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

/// Single value per key; `None` means the key is known to resolve to nothing
pub type Scalar = Option<String>;

/// Set of values per key; `None` means the key is known to resolve to nothing
pub type ValueSet = Option<BTreeSet<String>>;

/// The value shape of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Scalar,
    Set,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Set => "set",
        };
        write!(f, "{}", name)
    }
}

/// What to do when a remote answer holds more than one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Fail with `Ambiguous`
    Error,
    /// Keep the first candidate and log a warning
    FirstMatch,
    /// Keep every candidate (set caches only)
    AllMatches,
}

impl AmbiguityPolicy {
    /// Default policy for a shape: strict for scalars, permissive for sets
    pub fn default_for(shape: Shape) -> Self {
        match shape {
            Shape::Scalar => Self::Error,
            Shape::Set => Self::AllMatches,
        }
    }
}

/// A value shape that can live in every layer of a cache
pub trait Value: Clone + fmt::Debug + PartialEq + 'static {
    const SHAPE: Shape;

    /// Value fields of the rows this value occupies. `None` is the null marker.
    fn to_fields(&self) -> Vec<Option<String>>;

    /// Rebuild a value from every row recorded for one key, in row order.
    ///
    /// Returns `None` when there are no rows at all (the key is absent).
    fn from_fields<I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<String>>;

    /// Combine a value already stored under a key with a newly put one
    fn merge(existing: Option<Self>, incoming: Self) -> Self;

    /// Fold remote candidates into a value. No candidates means null.
    fn from_candidates(
        key: &str,
        candidates: Vec<String>,
        policy: AmbiguityPolicy,
    ) -> CacheResult<Self>;

    /// Canonical form (an empty set becomes null)
    fn normalized(self) -> Self {
        self
    }

    /// Human-readable rendering for CLI output
    fn render(&self) -> String;
}

impl Value for Scalar {
    const SHAPE: Shape = Shape::Scalar;

    fn to_fields(&self) -> Vec<Option<String>> {
        vec![self.clone()]
    }

    fn from_fields<I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        // Last write wins
        fields.into_iter().last()
    }

    fn merge(_existing: Option<Self>, incoming: Self) -> Self {
        incoming
    }

    fn from_candidates(
        key: &str,
        mut candidates: Vec<String>,
        policy: AmbiguityPolicy,
    ) -> CacheResult<Self> {
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            count => match policy {
                AmbiguityPolicy::FirstMatch => {
                    warn!(
                        "{} candidates for '{}', keeping the first one",
                        count, key
                    );
                    Ok(Some(candidates.swap_remove(0)))
                }
                AmbiguityPolicy::Error | AmbiguityPolicy::AllMatches => {
                    Err(CacheError::Ambiguous {
                        key: key.to_string(),
                        count,
                    })
                }
            },
        }
    }

    fn render(&self) -> String {
        match self {
            Some(value) => value.clone(),
            None => "None".to_string(),
        }
    }
}

impl Value for ValueSet {
    const SHAPE: Shape = Shape::Set;

    fn to_fields(&self) -> Vec<Option<String>> {
        match self {
            Some(set) if !set.is_empty() => set.iter().cloned().map(Some).collect(),
            _ => vec![None],
        }
    }

    fn from_fields<I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut seen_row = false;
        let mut set = BTreeSet::new();
        for field in fields {
            seen_row = true;
            if let Some(element) = field {
                set.insert(element);
            }
        }

        if !seen_row {
            None
        } else if set.is_empty() {
            Some(None)
        } else {
            Some(Some(set))
        }
    }

    fn merge(existing: Option<Self>, incoming: Self) -> Self {
        match (existing.flatten(), incoming.normalized()) {
            (Some(mut current), Some(added)) => {
                current.extend(added);
                Some(current)
            }
            (Some(current), None) => Some(current),
            (None, incoming) => incoming,
        }
    }

    fn from_candidates(
        key: &str,
        candidates: Vec<String>,
        policy: AmbiguityPolicy,
    ) -> CacheResult<Self> {
        let count = candidates.len();
        if count == 0 {
            return Ok(None);
        }
        if count > 1 {
            match policy {
                AmbiguityPolicy::Error => {
                    return Err(CacheError::Ambiguous {
                        key: key.to_string(),
                        count,
                    })
                }
                AmbiguityPolicy::FirstMatch => {
                    warn!(
                        "{} candidates for '{}', keeping the first one",
                        count, key
                    );
                    return Ok(candidates.into_iter().next().map(|c| BTreeSet::from([c])));
                }
                AmbiguityPolicy::AllMatches => {}
            }
        }
        Ok(Some(candidates.into_iter().collect()))
    }

    fn normalized(self) -> Self {
        self.filter(|set| !set.is_empty())
    }

    fn render(&self) -> String {
        match self {
            Some(set) if !set.is_empty() => set.iter().cloned().collect::<Vec<_>>().join(","),
            _ => "None".to_string(),
        }
    }
}
