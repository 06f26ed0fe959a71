//! CozoDB backend family.
//!
//! CozoDB runs embedded, either over SQLite storage or fully in memory. Results come back
//! as [`NamedRows`]; column types are taken from the stored relation's schema when the
//! caller knows it, and inferred from the values otherwise.

mod cell;
mod encode;
pub mod types;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use cozo::{DataValue, DbInstance, NamedRows, ScriptMutability};

use super::backend::{Backend, ResultPayload};
use super::cursor::{DecodeCursor, Payload};
use super::escape::validate_identifier;
use super::params::QueryParams;
use super::types::NativeTypeId;
use super::DbError;
pub use cell::CozoCell;

pub type CozoCursor = DecodeCursor<CozoResult>;

/// Storage engine behind a CozoDB instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CozoEngine {
    Sqlite,
    Mem,
}

impl CozoEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            CozoEngine::Sqlite => "sqlite",
            CozoEngine::Mem => "mem",
        }
    }
}

/// Handle to an embedded CozoDB instance. Clones share the same database.
#[derive(Clone)]
pub struct CozoConnection {
    db: DbInstance,
    engine: CozoEngine,
    path: String,
}

impl fmt::Debug for CozoConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CozoConnection")
            .field("engine", &self.engine)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CozoConnection {
    /// Open a CozoDB database backed by SQLite storage.
    pub fn open_sqlite(path: &Path) -> Result<Self, DbError> {
        let db = DbInstance::new(CozoEngine::Sqlite.as_str(), path, "").map_err(|e| {
            DbError::OpenFailed {
                path: path.display().to_string(),
                message: format!("{:?}", e),
            }
        })?;
        tracing::debug!(path = %path.display(), "opened CozoDB over SQLite");
        Ok(Self {
            db,
            engine: CozoEngine::Sqlite,
            path: path.display().to_string(),
        })
    }

    /// Create an in-memory database instance.
    pub fn open_mem() -> Result<Self, DbError> {
        let db = DbInstance::new(CozoEngine::Mem.as_str(), "", "").map_err(|e| DbError::OpenFailed {
            path: ":memory:".to_string(),
            message: format!("{:?}", e),
        })?;
        Ok(Self {
            db,
            engine: CozoEngine::Mem,
            path: String::new(),
        })
    }

    pub fn engine(&self) -> CozoEngine {
        self.engine
    }

    /// Run a mutable script, binding parameters by name.
    pub fn run(&self, script: &str, params: &QueryParams) -> Result<NamedRows, DbError> {
        let params: BTreeMap<String, DataValue> = params
            .params()
            .iter()
            .map(|(name, value)| (name.clone(), DataValue::from(value)))
            .collect();
        self.run_with(script, params)
    }

    /// Run a script with already converted parameters, such as encoded composites.
    pub fn run_with(
        &self,
        script: &str,
        params: BTreeMap<String, DataValue>,
    ) -> Result<NamedRows, DbError> {
        self.db
            .run_script(script, params, ScriptMutability::Mutable)
            .map_err(|e| DbError::QueryFailed {
                message: format!("{:?}", e),
            })
    }

    /// Run a script and infer column types from the returned values.
    pub fn execute(&self, script: &str, params: &QueryParams) -> Result<CozoResult, DbError> {
        self.run(script, params).map(CozoResult::from_named_rows)
    }

    /// Declared column type specs of a stored relation, keyed by column name.
    pub fn column_specs(&self, relation: &str) -> Result<BTreeMap<String, String>, DbError> {
        validate_identifier(relation)?;
        let rows = self.run_with(&format!("::columns {}", relation), BTreeMap::new())?;
        let column = header_index(&rows, "column")?;
        let spec = header_index(&rows, "type")?;
        Ok(rows
            .rows
            .iter()
            .filter_map(|row| match (row.get(column), row.get(spec)) {
                (Some(DataValue::Str(c)), Some(DataValue::Str(t))) => {
                    Some((c.to_string(), t.to_string()))
                }
                _ => None,
            })
            .collect())
    }
}

fn header_index(rows: &NamedRows, header: &str) -> Result<usize, DbError> {
    rows.headers
        .iter()
        .position(|h| h == header)
        .ok_or_else(|| DbError::QueryFailed {
            message: format!("system output has no '{}' column", header),
        })
}

/// Realized CozoDB result with one type spec per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CozoResult {
    headers: Vec<String>,
    types: Vec<NativeTypeId>,
    rows: Vec<Vec<DataValue>>,
}

impl CozoResult {
    /// Infer each column's spec from its first decisive value.
    pub fn from_named_rows(rows: NamedRows) -> Self {
        let types = (0..rows.headers.len())
            .map(|column| {
                let spec = rows
                    .rows
                    .iter()
                    .filter_map(|row| row.get(column))
                    .find_map(types::infer_spec)
                    .unwrap_or_else(|| types::ANY_SPEC.to_string());
                NativeTypeId::Spec(spec)
            })
            .collect();
        Self {
            headers: rows.headers,
            types,
            rows: rows.rows,
        }
    }

    /// Use declared specs; columns with an empty spec fall back to inference.
    pub fn with_types(rows: NamedRows, specs: Vec<String>) -> Self {
        let mut result = Self::from_named_rows(rows);
        for (slot, spec) in result.types.iter_mut().zip(specs) {
            if !spec.is_empty() {
                *slot = NativeTypeId::Spec(types::normalize_spec(&spec));
            }
        }
        result
    }
}

impl Payload for CozoResult {
    type Cell<'a> = CozoCell<'a>;

    const BACKEND: Backend = Backend::Cozo;

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.headers.len()
    }

    fn column_name(&self, column: usize) -> Option<&str> {
        self.headers.get(column).map(String::as_str)
    }

    fn column_type(&self, column: usize) -> Option<&NativeTypeId> {
        self.types.get(column)
    }

    fn cell(&self, row: usize, column: usize) -> Option<CozoCell<'_>> {
        self.rows.get(row)?.get(column).map(CozoCell)
    }

    fn from_payload(payload: ResultPayload) -> Result<Self, ResultPayload> {
        match payload {
            ResultPayload::Cozo(result) => Ok(result),
            other => Err(other),
        }
    }
}
