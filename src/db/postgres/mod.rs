//! PostgreSQL backend family.
//!
//! Queries run over the synchronous `postgres` client. Every result cell is captured as its
//! raw binary wire value plus the column's type OID, and decoded lazily by the cursor.

mod encode;
pub mod types;
pub mod wire;

use std::error::Error;
use std::fmt;

use postgres::types::{FromSql, ToSql, Type};
use postgres::{Client, NoTls};

use super::backend::{Backend, ResultPayload};
use super::config::PostgresConfig;
use super::cursor::{DecodeCursor, Payload};
use super::params::QueryParams;
use super::types::{NativeTypeId, TypeRegistry};
use super::DbError;
use wire::PgCell;

pub type PgCursor = DecodeCursor<PgResult>;

/// An open PostgreSQL connection.
pub struct PgConnection {
    client: Client,
    target: String,
}

impl fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnection")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl PgConnection {
    pub fn connect(config: &PostgresConfig) -> Result<Self, DbError> {
        let target = config.display_target();
        let client = Client::connect(&config.build_connection_string()?, NoTls).map_err(|e| {
            DbError::OpenFailed {
                path: target.clone(),
                message: e.to_string(),
            }
        })?;
        tracing::debug!(target = %target, "connected to PostgreSQL");
        Ok(Self { client, target })
    }

    /// Run a query, binding parameters positionally in insertion order.
    pub fn execute(&mut self, sql: &str, params: &QueryParams) -> Result<PgResult, DbError> {
        let statement = self.client.prepare(sql).map_err(DbError::query)?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.type_().oid()))
            .collect();

        let bound: Vec<&(dyn ToSql + Sync)> = params
            .params()
            .iter()
            .map(|(_, value)| value as &(dyn ToSql + Sync))
            .collect();
        let rows = self
            .client
            .query(&statement, &bound)
            .map_err(DbError::query)?;

        let mut cells = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                let raw: Option<RawCell> = row.try_get(index).map_err(DbError::query)?;
                values.push(raw.map(|cell| cell.0));
            }
            cells.push(values);
        }
        Ok(PgResult::new(columns, cells))
    }

    /// Run one or more statements without parameters or results.
    pub fn batch_execute(&mut self, sql: &str) -> Result<(), DbError> {
        self.client.batch_execute(sql).map_err(DbError::query)
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }
}

/// Raw binary value of any type.
struct RawCell(Vec<u8>);

impl<'a> FromSql<'a> for RawCell {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawCell(raw.to_vec()))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Realized PostgreSQL result: column names and OIDs plus raw binary cells.
#[derive(Debug, Clone, PartialEq)]
pub struct PgResult {
    names: Vec<String>,
    types: Vec<NativeTypeId>,
    oids: Vec<u32>,
    rows: Vec<Vec<Option<Vec<u8>>>>,
}

impl PgResult {
    pub fn new(columns: Vec<(String, u32)>, rows: Vec<Vec<Option<Vec<u8>>>>) -> Self {
        let (names, oids): (Vec<_>, Vec<_>) = columns.into_iter().unzip();
        let types = oids.iter().map(|&oid| NativeTypeId::Oid(oid)).collect();
        Self {
            names,
            types,
            oids,
            rows,
        }
    }
}

impl Payload for PgResult {
    type Cell<'a> = PgCell<'a>;

    const BACKEND: Backend = Backend::Postgres;

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.names.len()
    }

    fn column_name(&self, column: usize) -> Option<&str> {
        self.names.get(column).map(String::as_str)
    }

    fn column_type(&self, column: usize) -> Option<&NativeTypeId> {
        self.types.get(column)
    }

    fn cell(&self, row: usize, column: usize) -> Option<PgCell<'_>> {
        let oid = *self.oids.get(column)?;
        let raw = self.rows.get(row)?.get(column)?;
        Some(PgCell::new(oid, raw.as_deref()))
    }

    fn from_payload(payload: ResultPayload) -> Result<Self, ResultPayload> {
        match payload {
            ResultPayload::Postgres(result) => Ok(result),
            other => Err(other),
        }
    }
}

/// Build the registry from the builtin table and the server catalog.
pub fn build_registry(conn: &mut PgConnection) -> Result<TypeRegistry, DbError> {
    types::load_registry(&mut conn.client)
}
