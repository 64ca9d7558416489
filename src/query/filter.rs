//! Attribute filters applied to a query.
//!
//! The cache treats filters as opaque: each one is reduced to a 64-bit hash
//! and the ordered list of those hashes travels with the cache entry.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single attribute filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Attribute must (or must not) equal one of the listed values.
    Values {
        attr: String,
        values: Vec<i64>,
        exclude: bool,
    },
    /// Integer attribute within `[min, max]`.
    Range {
        attr: String,
        min: i64,
        max: i64,
        exclude: bool,
    },
    /// Float attribute within `[min, max]`.
    FloatRange {
        attr: String,
        min: f32,
        max: f32,
        exclude: bool,
    },
    /// String attribute equal to one of the listed values.
    Strings {
        attr: String,
        values: Vec<String>,
        exclude: bool,
    },
}

impl Filter {
    /// Create an inclusive value-list filter.
    pub fn values<S: Into<String>>(attr: S, values: Vec<i64>) -> Self {
        Filter::Values {
            attr: attr.into(),
            values,
            exclude: false,
        }
    }

    /// Create an inclusive integer range filter.
    pub fn range<S: Into<String>>(attr: S, min: i64, max: i64) -> Self {
        Filter::Range {
            attr: attr.into(),
            min,
            max,
            exclude: false,
        }
    }

    /// Create an inclusive float range filter.
    pub fn float_range<S: Into<String>>(attr: S, min: f32, max: f32) -> Self {
        Filter::FloatRange {
            attr: attr.into(),
            min,
            max,
            exclude: false,
        }
    }

    /// Create an inclusive string-list filter.
    pub fn strings<S: Into<String>>(attr: S, values: Vec<String>) -> Self {
        Filter::Strings {
            attr: attr.into(),
            values,
            exclude: false,
        }
    }

    /// Turn this filter into its negation.
    pub fn excluded(mut self) -> Self {
        match &mut self {
            Filter::Values { exclude, .. }
            | Filter::Range { exclude, .. }
            | Filter::FloatRange { exclude, .. }
            | Filter::Strings { exclude, .. } => *exclude = true,
        }
        self
    }

    /// Attribute this filter applies to.
    pub fn attr(&self) -> &str {
        match self {
            Filter::Values { attr, .. }
            | Filter::Range { attr, .. }
            | Filter::FloatRange { attr, .. }
            | Filter::Strings { attr, .. } => attr,
        }
    }
}

impl Hash for Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Filter::Values {
                attr,
                values,
                exclude,
            } => {
                0u8.hash(state);
                attr.hash(state);
                values.hash(state);
                exclude.hash(state);
            }
            Filter::Range {
                attr,
                min,
                max,
                exclude,
            } => {
                1u8.hash(state);
                attr.hash(state);
                min.hash(state);
                max.hash(state);
                exclude.hash(state);
            }
            Filter::FloatRange {
                attr,
                min,
                max,
                exclude,
            } => {
                2u8.hash(state);
                attr.hash(state);
                min.to_bits().hash(state);
                max.to_bits().hash(state);
                exclude.hash(state);
            }
            Filter::Strings {
                attr,
                values,
                exclude,
            } => {
                3u8.hash(state);
                attr.hash(state);
                values.hash(state);
                exclude.hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_flips_flag() {
        let filter = Filter::range("price", 10, 20).excluded();
        match filter {
            Filter::Range { exclude, .. } => assert!(exclude),
            _ => panic!("Expected range filter"),
        }
        assert_eq!(Filter::values("gid", vec![1]).attr(), "gid");
    }
}
