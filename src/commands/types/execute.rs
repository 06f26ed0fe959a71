use std::error::Error;

use serde::Serialize;

use super::TypesCmd;
use crate::commands::Execute;
use crate::db::{Backend, Session, TypeCategory};

/// One registry entry
#[derive(Debug, Clone, Serialize)]
pub struct TypeEntry {
    /// Native id: an OID on PostgreSQL, a type spec on CozoDB.
    pub id: String,
    pub name: String,
    pub category: TypeCategory,
    /// Storage length in bytes, `-1` for variable width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i16>,
    pub is_array: bool,
}

/// Result of the types command execution
#[derive(Debug, Clone, Serialize)]
pub struct TypesResult {
    pub backend: Backend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TypeCategory>,
    pub types: Vec<TypeEntry>,
}

impl Execute for TypesCmd {
    type Output = TypesResult;

    fn execute(self, session: &mut Session) -> Result<Self::Output, Box<dyn Error>> {
        let registry = session.registry();
        let types = registry
            .iter()
            .filter(|(_, desc)| self.category.is_none_or(|c| desc.category == c))
            .map(|(id, desc)| TypeEntry {
                id: id.to_string(),
                name: desc.name.clone(),
                category: desc.category,
                width: desc.width.map(|w| w.as_len()),
                is_array: desc.is_array,
            })
            .collect();

        Ok(TypesResult {
            backend: registry.backend(),
            category: self.category,
            types,
        })
    }
}
