//! Integration tests against a live PostgreSQL server.
//!
//! Run with: cargo test --features postgres-tests
//!
//! Prerequisites:
//! 1. PostgreSQL listening on localhost, reachable as user `postgres`
//! 2. Create test database: `createdb -U postgres vtstore_test`
//!
//! Each test works in its own schema, dropped up front, so runs are repeatable.

#![cfg(feature = "postgres-tests")]

use std::sync::Arc;

use vtstore::db::{
    BackendSelector, Connection, Context, DatabaseConfig, GeoBox, GeoPoint, IntervalEvent, Matrix,
    PostgresConfig, ProcessState, ProcessStatus, Query, QueryParams, ResultCursor, Session,
    TypeCategory,
};

/// Test connection string for PostgreSQL (local instance)
const PG_CONNECTION: &str = "host=localhost user=postgres dbname=vtstore_test";

const SCHEMA: &str = "
    DROP SCHEMA IF EXISTS demo CASCADE;
    DROP TYPE IF EXISTS vtevent, pstate, cvmat, pstatus CASCADE;
    CREATE TYPE pstatus AS ENUM ('created', 'running', 'suspended', 'finished', 'error');
    CREATE TYPE cvmat AS (element_type int4, dims int4[], data bytea);
    CREATE TYPE vtevent AS (group_id int4, class_id int4, is_root bool, region box, score float8, user_data bytea);
    CREATE TYPE pstate AS (status pstatus, progress float4, current_item text, last_error text);
    CREATE SCHEMA demo;
    CREATE TABLE demo.events (
        id int8 PRIMARY KEY,
        sequence text NOT NULL,
        small int2,
        ratio numeric,
        created timestamp,
        event vtevent,
        state pstate,
        mask cvmat,
        anchor point,
        scores float4[]
    );";

fn config() -> DatabaseConfig {
    DatabaseConfig::Postgres(PostgresConfig::from_connection_string(PG_CONNECTION))
}

fn event() -> IntervalEvent {
    IntervalEvent {
        group_id: 3,
        class_id: 9,
        is_root: true,
        region: GeoBox::new(GeoPoint::new(4.0, 5.0), GeoPoint::new(1.0, 2.0)),
        score: 0.5,
        user_data: vec![1, 2, 3],
    }
}

fn state() -> ProcessState {
    ProcessState {
        status: ProcessStatus::Suspended,
        progress: 0.25,
        current_item: "frame-7".to_string(),
        last_error: String::new(),
    }
}

/// Create the schema and custom types, then reopen so the registry sees them.
fn seeded_session() -> Session {
    let config = config();
    let selector = BackendSelector::for_config(&config);
    {
        let mut session = selector.open_session(&config).expect("PostgreSQL session");
        let Connection::Postgres(pg) = session.connection_mut() else {
            panic!("Expected PostgreSQL connection");
        };
        pg.batch_execute(SCHEMA).expect("schema setup");
    }

    let mut session = selector.open_session(&config).expect("PostgreSQL session");
    let Connection::Postgres(pg) = session.connection_mut() else {
        panic!("Expected PostgreSQL connection");
    };
    let mask = Matrix::from_parts(0, vec![2, 2], &[9, 8, 7, 6]).expect("2x2 matrix");
    pg.client()
        .execute(
            "INSERT INTO demo.events VALUES
                (1, 'seq_a', 12, 3.25, '2024-03-01 12:30:00', $1, $2, $3, $4, '{1.5,2.5}'),
                (2, 'seq_b', NULL, NULL, NULL, NULL, NULL, NULL, NULL, '{}')",
            &[&event(), &state(), &mask, &GeoPoint::new(7.0, 8.0)],
        )
        .expect("insert events");
    session
}

#[test]
fn test_registry_has_custom_types() {
    let session = seeded_session();
    let registry = session.registry();
    let categories: Vec<TypeCategory> = registry.iter().map(|(_, d)| d.category).collect();
    for expected in [
        TypeCategory::Matrix,
        TypeCategory::IntervalEvent,
        TypeCategory::ProcessState,
        TypeCategory::ProcessStatus,
    ] {
        assert!(categories.contains(&expected), "missing {}", expected);
    }
}

#[test]
fn test_scalars_and_composites_decode() {
    let mut session = seeded_session();
    let mut cursor = session
        .run(
            "SELECT id, sequence, small, ratio, created, event, state, mask, anchor, scores
             FROM demo.events ORDER BY id",
            &QueryParams::new(),
        )
        .unwrap();
    assert_eq!(cursor.count_rows(), Some(2));
    assert!(cursor.next());

    assert_eq!(cursor.get_int8_by_name("id"), 1);
    assert_eq!(cursor.get_int_by_name("small"), 12);
    assert_eq!(cursor.get_float8_by_name("ratio"), 3.25);
    assert_eq!(cursor.get_value_by_name("created"), "2024-03-01 12:30:00");
    assert_eq!(cursor.get_interval_event_by_name("event"), Some(event()));
    assert_eq!(cursor.get_process_state_by_name("state"), Some(state()));
    assert_eq!(cursor.get_matrix_by_name("mask").map(|m| m.data), Some(vec![9, 8, 7, 6]));
    assert_eq!(cursor.get_point_by_name("anchor"), GeoPoint::new(7.0, 8.0));
    assert_eq!(cursor.get_float_vec_by_name("scores"), Some(vec![1.5, 2.5]));
    assert_eq!(cursor.key(2).map(|k| k.length), Some(2));

    assert!(cursor.next());
    assert_eq!(cursor.get_interval_event_by_name("event"), None);
    assert_eq!(cursor.get_float_vec_by_name("scores"), None);
    assert!(!cursor.next());
}

#[test]
fn test_query_builder_binds_params() {
    let mut session = seeded_session();
    let context = Context::new().with_dataset("demo");
    let mut query = Query::new(&session, &context);
    let builder = query
        .builder()
        .clone()
        .from_dataset("events", &["id", "sequence"])
        .unwrap()
        .where_string_in_list("sequence", vec!["seq_b".to_string(), "seq_x".to_string()]);
    query.set_builder(builder);
    assert_eq!(
        query.sql().unwrap(),
        r#"SELECT "id", "sequence" FROM "demo"."events" WHERE "sequence" = ANY($1)"#
    );

    let cursor = query.execute(&mut session).unwrap();
    assert_eq!(cursor.count_rows(), Some(1));
    assert!(cursor.next());
    assert_eq!(cursor.get_int8(0), 2);
}

#[test]
fn test_worker_opens_own_connection() {
    let session = seeded_session();
    let mut worker = session.worker().unwrap();
    assert!(Arc::ptr_eq(session.registry(), worker.registry()));
    let mut cursor = worker
        .run("SELECT count(*) FROM demo.events", &QueryParams::new())
        .unwrap();
    assert!(cursor.next());
    assert_eq!(cursor.get_int8(0), 2);
}
