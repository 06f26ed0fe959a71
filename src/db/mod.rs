//! Backend-agnostic data access for video-analysis metadata.
//!
//! The store is either PostgreSQL or CozoDB (SQLite-backed or in-memory). Client code picks
//! the family once through [`BackendSelector`], opens a [`Session`], and reads every query
//! result through the same [`ResultCursor`] API.
//!
//! # Layers
//!
//! - [`types`]: canonical type taxonomy and the per-connection [`TypeRegistry`].
//! - [`value`]: the [`WireCell`] abstraction each family implements over its raw cells.
//! - [`decode`]: the shared decode engine (width dispatch, arrays, composites, rendering).
//! - [`cursor`]: [`DecodeCursor`] and the [`Cursor`] family enum.
//! - [`postgres`] and [`cozo`]: the two backend families.
//! - [`backend`]: family selection, connections, sessions and loaders.

pub mod backend;
pub mod composite;
pub mod config;
pub mod cozo;
pub mod cursor;
pub mod decode;
pub mod escape;
pub mod key;
pub mod params;
pub mod postgres;
pub mod query;
pub mod types;
pub mod value;

pub use backend::{
    Backend, BackendSelector, Connection, DriverInfo, Loader, ResultPayload, Session,
};
pub use composite::{GeoBox, GeoPoint, IntervalEvent, Matrix, ProcessState, ProcessStatus};
pub use config::{DatabaseConfig, PostgresConfig};
pub use cursor::{Cursor, DecodeCursor, Payload, ResultCursor};
pub use key::ColumnKey;
pub use params::{QueryParams, ValueType};
pub use query::{Context, Query, QueryBuilder};
pub use types::{NativeTypeId, StorageWidth, TypeCategory, TypeDescriptor, TypeRegistry};
pub use value::{DecodeError, WireCell};

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to open database '{path}': {message}")]
    OpenFailed { path: String, message: String },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    #[error("Unsupported backend: '{name}'")]
    UnsupportedBackend { name: String },

    #[error("Backend family mismatch: expected {expected}, found {found}")]
    FamilyMismatch { expected: Backend, found: Backend },

    #[error("Bad configuration: {0}")]
    BadConfiguration(String),

    #[error("Failed to build type registry: {message}")]
    RegistryBuild { message: String },

    #[error("Invalid identifier '{name}'")]
    InvalidIdentifier { name: String },
}

impl DbError {
    pub(crate) fn query(err: impl std::fmt::Display) -> Self {
        DbError::QueryFailed {
            message: err.to_string(),
        }
    }
}
