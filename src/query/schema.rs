//! Sorting schema description used as a cache key component.

use std::hash::{BuildHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::qcache::fingerprint::hash_state;

/// Kind of a column produced by the sorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Integer,
    BigInt,
    Float,
    String,
    Timestamp,
}

/// A column of the sorting schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub kind: ColumnKind,
    /// Computed expression, if the column is not a stored attribute.
    pub expr: Option<String>,
}

/// The schema the result sorter works with.
///
/// Two queries with different sorting schemas may see different weights for
/// the same match, so the schema signature is part of the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SortingSchema {
    columns: Vec<SchemaColumn>,
}

impl SortingSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stored attribute column.
    pub fn with_column<S: Into<String>>(mut self, name: S, kind: ColumnKind) -> Self {
        self.columns.push(SchemaColumn {
            name: name.into(),
            kind,
            expr: None,
        });
        self
    }

    /// Add a computed column.
    pub fn with_expr<S: Into<String>, E: Into<String>>(
        mut self,
        name: S,
        kind: ColumnKind,
        expr: E,
    ) -> Self {
        self.columns.push(SchemaColumn {
            name: name.into(),
            kind,
            expr: Some(expr.into()),
        });
        self
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    /// Deterministic 64-bit signature of this schema.
    pub fn signature(&self) -> u64 {
        let mut hasher = hash_state().build_hasher();
        self.columns.hash(&mut hasher);
        hasher.finish()
    }
}
