//! Backend family selection.
//!
//! A [`BackendSelector`] fixes one family (PostgreSQL or CozoDB) and constructs every
//! family member from it: connections, type registries, query builders, result cursors and
//! loaders. Members of different families never mix; every constructor that takes a
//! family-bearing input checks it and fails with [`DbError::FamilyMismatch`].
//!
//! [`Session`] bundles one connection with its registry and is the usual entry point.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use postgres::config::SslMode;
use serde::Serialize;
use tracing::{debug, info};

use super::config::DatabaseConfig;
use super::cozo::{CozoConnection, CozoResult};
use super::cursor::{Cursor, ResultCursor};
use super::params::QueryParams;
use super::postgres::{PgConnection, PgResult};
use super::query::{Context, QueryBuilder};
use super::types::TypeRegistry;
use super::DbError;

/// Backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Cozo,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Cozo => "cozo",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Backend::Postgres),
            "cozo" | "sqlite" | "memory" => Ok(Backend::Cozo),
            _ => Err(DbError::UnsupportedBackend {
                name: s.to_string(),
            }),
        }
    }
}

fn check_family(expected: Backend, found: Backend) -> Result<(), DbError> {
    if expected == found {
        Ok(())
    } else {
        Err(DbError::FamilyMismatch { expected, found })
    }
}

/// An open connection of either family.
#[derive(Debug)]
pub enum Connection {
    Postgres(PgConnection),
    Cozo(CozoConnection),
}

impl Connection {
    pub fn open(config: &DatabaseConfig) -> Result<Self, DbError> {
        match config {
            DatabaseConfig::Postgres(pg) => PgConnection::connect(pg).map(Connection::Postgres),
            DatabaseConfig::CozoSqlite { path } => {
                CozoConnection::open_sqlite(path).map(Connection::Cozo)
            }
            DatabaseConfig::CozoMem => CozoConnection::open_mem().map(Connection::Cozo),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Connection::Postgres(_) => Backend::Postgres,
            Connection::Cozo(_) => Backend::Cozo,
        }
    }

    pub fn as_cozo(&self) -> Option<&CozoConnection> {
        match self {
            Connection::Cozo(conn) => Some(conn),
            Connection::Postgres(_) => None,
        }
    }

    /// Run a query in the family's own language and realize its result.
    pub fn execute(&mut self, script: &str, params: &QueryParams) -> Result<ResultPayload, DbError> {
        debug!(backend = %self.backend(), script, params = params.len(), "executing query");
        match self {
            Connection::Postgres(conn) => conn.execute(script, params).map(ResultPayload::Postgres),
            Connection::Cozo(conn) => conn.execute(script, params).map(ResultPayload::Cozo),
        }
    }
}

/// Realized result of either family, handed to [`ResultCursor::new_result`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPayload {
    Postgres(PgResult),
    Cozo(CozoResult),
}

impl ResultPayload {
    pub fn backend(&self) -> Backend {
        match self {
            ResultPayload::Postgres(_) => Backend::Postgres,
            ResultPayload::Cozo(_) => Backend::Cozo,
        }
    }
}

/// What a [`Loader`] found out about the driver for a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    pub backend: Backend,
    pub driver: &'static str,
    pub engine: String,
}

/// Driver probe for one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loader {
    backend: Backend,
}

impl Loader {
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Check that `config` belongs to this family and can be driven, without connecting.
    pub fn load(&self, config: &DatabaseConfig) -> Result<DriverInfo, DbError> {
        check_family(self.backend, config.backend())?;
        let engine = match config {
            DatabaseConfig::Postgres(pg) => {
                if pg.ssl {
                    return Err(DbError::BadConfiguration(
                        "TLS connections are not supported".to_string(),
                    ));
                }
                let parsed: postgres::Config = pg.build_connection_string()?.parse().map_err(
                    |e: postgres::Error| {
                        DbError::BadConfiguration(format!("invalid connection string: {}", e))
                    },
                )?;
                if matches!(parsed.get_ssl_mode(), SslMode::Require) {
                    return Err(DbError::BadConfiguration(
                        "TLS connections are not supported".to_string(),
                    ));
                }
                "server".to_string()
            }
            DatabaseConfig::CozoSqlite { path } => {
                if path.as_os_str().is_empty() {
                    return Err(DbError::BadConfiguration("sqlite path is empty".to_string()));
                }
                "sqlite".to_string()
            }
            DatabaseConfig::CozoMem => "mem".to_string(),
        };
        Ok(DriverInfo {
            backend: self.backend,
            driver: self.backend.as_str(),
            engine,
        })
    }
}

/// Chosen backend family and factory for its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSelector {
    backend: Backend,
}

impl BackendSelector {
    /// Select a family by name. Unknown names fail; there is no fallback family.
    pub fn initialize(name: &str) -> Result<Self, DbError> {
        let backend = name.parse()?;
        debug!(backend = %backend, "backend selected");
        Ok(Self { backend })
    }

    pub fn for_config(config: &DatabaseConfig) -> Self {
        Self {
            backend: config.backend(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn create_connection(&self, config: &DatabaseConfig) -> Result<Connection, DbError> {
        check_family(self.backend, config.backend())?;
        Connection::open(config)
    }

    pub fn create_type_manager(&self, connection: &mut Connection) -> Result<Arc<TypeRegistry>, DbError> {
        check_family(self.backend, connection.backend())?;
        TypeRegistry::build(connection).map(Arc::new)
    }

    pub fn create_query_builder(&self, context: &Context) -> QueryBuilder {
        QueryBuilder::new(self.backend, context.clone())
    }

    pub fn create_result_set(&self, registry: Arc<TypeRegistry>) -> Result<Cursor, DbError> {
        check_family(self.backend, registry.backend())?;
        Ok(Cursor::new(registry))
    }

    pub fn create_loader(&self) -> Loader {
        Loader {
            backend: self.backend,
        }
    }

    /// Probe the driver, connect and build the registry, in that order.
    pub fn open_session(&self, config: &DatabaseConfig) -> Result<Session, DbError> {
        let driver = self.create_loader().load(config)?;
        let mut connection = self.create_connection(config)?;
        let registry = self.create_type_manager(&mut connection)?;
        info!(
            backend = %self.backend,
            engine = %driver.engine,
            types = registry.len(),
            "session opened"
        );
        Ok(Session {
            selector: *self,
            config: config.clone(),
            connection,
            registry,
            driver,
        })
    }
}

/// One connection plus the registry built for it.
#[derive(Debug)]
pub struct Session {
    selector: BackendSelector,
    config: DatabaseConfig,
    connection: Connection,
    registry: Arc<TypeRegistry>,
    driver: DriverInfo,
}

impl Session {
    pub fn backend(&self) -> Backend {
        self.selector.backend()
    }

    pub fn selector(&self) -> BackendSelector {
        self.selector
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn driver(&self) -> &DriverInfo {
        &self.driver
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Empty cursor bound to this session's registry.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(Arc::clone(&self.registry))
    }

    pub fn query_builder(&self, context: &Context) -> QueryBuilder {
        self.selector.create_query_builder(context)
    }

    pub fn execute(&mut self, script: &str, params: &QueryParams) -> Result<ResultPayload, DbError> {
        self.connection.execute(script, params)
    }

    /// Execute and load the result into a fresh cursor.
    pub fn run(&mut self, script: &str, params: &QueryParams) -> Result<Cursor, DbError> {
        let payload = self.execute(script, params)?;
        let mut cursor = self.cursor();
        cursor.new_result(payload)?;
        Ok(cursor)
    }

    /// Execute a built query. CozoDB results take their column types from the relation's
    /// declared schema.
    pub fn execute_builder(&mut self, builder: &QueryBuilder) -> Result<ResultPayload, DbError> {
        check_family(self.backend(), builder.backend())?;
        let script = builder.render()?;
        if let Some(conn) = self.connection.as_cozo() {
            let specs = conn.column_specs(&builder.relation()?)?;
            let rows = conn.run(&script, builder.params())?;
            let types = rows
                .headers
                .iter()
                .map(|h| specs.get(h).cloned().unwrap_or_default())
                .collect();
            return Ok(ResultPayload::Cozo(CozoResult::with_types(rows, types)));
        }
        self.connection.execute(&script, builder.params())
    }

    /// Open another connection of the same family sharing this session's registry.
    ///
    /// CozoDB workers share the embedded database instance; PostgreSQL workers get their
    /// own server connection.
    pub fn worker(&self) -> Result<Session, DbError> {
        let connection = match &self.connection {
            Connection::Cozo(conn) => Connection::Cozo(conn.clone()),
            Connection::Postgres(_) => self.selector.create_connection(&self.config)?,
        };
        debug!(backend = %self.backend(), "worker connection opened");
        Ok(Session {
            selector: self.selector,
            config: self.config.clone(),
            connection,
            registry: Arc::clone(&self.registry),
            driver: self.driver.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::config::PostgresConfig;
    use crate::db::cozo::types as cozo_types;
    use rstest::rstest;
    use std::path::PathBuf;

    #[rstest]
    #[case("postgres", Backend::Postgres)]
    #[case("PostgreSQL", Backend::Postgres)]
    #[case("pg", Backend::Postgres)]
    #[case("cozo", Backend::Cozo)]
    #[case("sqlite", Backend::Cozo)]
    fn test_initialize_known(#[case] name: &str, #[case] expected: Backend) {
        assert_eq!(BackendSelector::initialize(name).unwrap().backend(), expected);
    }

    #[rstest]
    #[case("mysql")]
    #[case("")]
    fn test_initialize_fails_closed(#[case] name: &str) {
        let err = BackendSelector::initialize(name).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedBackend { .. }));
    }

    #[test]
    fn test_constructors_reject_foreign_family() {
        let selector = BackendSelector::initialize("postgres").unwrap();
        let err = selector.create_connection(&DatabaseConfig::CozoMem).unwrap_err();
        assert!(matches!(
            err,
            DbError::FamilyMismatch {
                expected: Backend::Postgres,
                found: Backend::Cozo
            }
        ));

        let registry = Arc::new(cozo_types::builtin_registry());
        assert!(selector.create_result_set(registry).is_err());

        let mut cozo = Connection::open(&DatabaseConfig::CozoMem).unwrap();
        assert!(selector.create_type_manager(&mut cozo).is_err());
        assert!(selector.create_loader().load(&DatabaseConfig::CozoMem).is_err());
    }

    #[test]
    fn test_query_builder_follows_selector() {
        let selector = BackendSelector::initialize("cozo").unwrap();
        let builder = selector.create_query_builder(&Context::default());
        assert_eq!(builder.backend(), Backend::Cozo);
    }

    #[test]
    fn test_loader_cozo_engines() {
        let loader = BackendSelector::initialize("cozo").unwrap().create_loader();
        assert_eq!(loader.load(&DatabaseConfig::CozoMem).unwrap().engine, "mem");
        let info = loader
            .load(&DatabaseConfig::CozoSqlite {
                path: PathBuf::from("/tmp/vt.sqlite"),
            })
            .unwrap();
        assert_eq!(info.engine, "sqlite");
        assert_eq!(info.driver, "cozo");
        assert!(loader
            .load(&DatabaseConfig::CozoSqlite { path: PathBuf::new() })
            .is_err());
    }

    #[rstest]
    #[case(PostgresConfig { ssl: true, ..PostgresConfig::from_connection_string("host=db user=vt") })]
    #[case(PostgresConfig::from_connection_string("host=db user=vt sslmode=require"))]
    #[case(PostgresConfig::from_connection_string("host=db user=vt bogus_option=1"))]
    #[case(PostgresConfig::default())]
    fn test_loader_postgres_rejects(#[case] pg: PostgresConfig) {
        let loader = BackendSelector::initialize("postgres").unwrap().create_loader();
        let err = loader.load(&DatabaseConfig::Postgres(pg)).unwrap_err();
        assert!(matches!(err, DbError::BadConfiguration(_)));
    }

    #[test]
    fn test_loader_postgres_accepts() {
        let loader = BackendSelector::initialize("postgres").unwrap().create_loader();
        let config = DatabaseConfig::Postgres(PostgresConfig::from_connection_string(
            "postgres://vt@localhost:5432/videos",
        ));
        let info = loader.load(&config).unwrap();
        assert_eq!(info.driver, "postgres");
        assert_eq!(info.engine, "server");
    }

    #[test]
    fn test_open_session_mem() {
        let selector = BackendSelector::for_config(&DatabaseConfig::CozoMem);
        let mut session = selector.open_session(&DatabaseConfig::CozoMem).unwrap();
        assert_eq!(session.backend(), Backend::Cozo);
        assert_eq!(session.driver().engine, "mem");
        assert!(!session.registry().is_empty());

        let mut cursor = session.run("?[x] := x = 7", &QueryParams::new()).unwrap();
        assert!(cursor.next());
        assert_eq!(cursor.get_int8(0), 7);
    }

    #[test]
    fn test_worker_shares_registry_and_data() {
        let mut session = crate::test_utils::mem_session();
        session
            .execute(":create marks {id: Int}", &QueryParams::new())
            .unwrap();
        let mut worker = session.worker().unwrap();
        assert!(Arc::ptr_eq(session.registry(), worker.registry()));

        worker
            .execute("?[id] <- [[1]] :put marks {id}", &QueryParams::new())
            .unwrap();
        let cursor = session.run("?[id] := *marks{id}", &QueryParams::new()).unwrap();
        assert_eq!(cursor.count_rows(), Some(1));
    }
}
