//! Per-column metadata handed out by result cursors.

use serde::Serialize;

use super::types::TypeDescriptor;

/// Name and resolved type of one result column.
///
/// Built on demand from the payload's column metadata and a registry lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnKey {
    /// Display name of the resolved native type, empty when the type is unknown.
    pub type_name: String,
    pub name: String,
    /// Declared storage length in bytes, `-1` for variable width, `0` when not a numeric.
    pub length: i16,
    /// Canonical category of the column.
    pub extra: String,
}

impl ColumnKey {
    pub fn new(name: impl Into<String>, descriptor: &TypeDescriptor) -> Self {
        Self {
            type_name: descriptor.name.clone(),
            name: name.into(),
            length: descriptor.width.map(|w| w.as_len()).unwrap_or(0),
            extra: descriptor.category.to_string(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.type_name.is_empty()
    }
}
