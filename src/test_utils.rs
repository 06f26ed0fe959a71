//! Shared test utilities for unit, execute and integration tests.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::db::{BackendSelector, DatabaseConfig, QueryParams, Session};

/// Create a temporary file containing the given content.
pub fn create_temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

/// Open an in-memory CozoDB session.
pub fn mem_session() -> Session {
    BackendSelector::for_config(&DatabaseConfig::CozoMem)
        .open_session(&DatabaseConfig::CozoMem)
        .expect("Failed to open in-memory session")
}

/// In-memory session with a small `clips` relation.
///
/// Use for: query and types execute tests.
pub fn clips_session() -> Session {
    let mut session = mem_session();
    session
        .execute(
            ":create clips {id: Int => name: String, score: Float, tags: [Int]}",
            &QueryParams::new(),
        )
        .expect("Failed to create clips");
    session
        .execute(
            "?[id, name, score, tags] <- [[1, 'intro', 0.5, [1, 2]], [2, 'outro', 1.5, [3]]] :put clips {id => name, score, tags}",
            &QueryParams::new(),
        )
        .expect("Failed to seed clips");
    session
}

/// Builders for PostgreSQL binary wire values.
pub mod pg {
    fn put_value(out: &mut Vec<u8>, value: Option<&[u8]>) {
        match value {
            Some(bytes) => {
                out.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
                out.extend_from_slice(bytes);
            }
            None => out.extend_from_slice(&(-1i32).to_be_bytes()),
        }
    }

    /// Binary `numeric`: base-10000 digits, weight of the first digit, sign and scale.
    pub fn numeric(digits: &[i16], weight: i16, negative: bool, dscale: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(digits.len() as i16).to_be_bytes());
        out.extend_from_slice(&weight.to_be_bytes());
        let sign: u16 = if negative { 0x4000 } else { 0 };
        out.extend_from_slice(&sign.to_be_bytes());
        out.extend_from_slice(&dscale.to_be_bytes());
        for digit in digits {
            out.extend_from_slice(&digit.to_be_bytes());
        }
        out
    }

    /// One-dimensional binary array; no dimensions at all when `elements` is empty.
    pub fn array(elem_oid: u32, elements: &[Option<&[u8]>]) -> Vec<u8> {
        let mut out = Vec::new();
        let ndim: i32 = if elements.is_empty() { 0 } else { 1 };
        let has_null = i32::from(elements.iter().any(Option::is_none));
        out.extend_from_slice(&ndim.to_be_bytes());
        out.extend_from_slice(&has_null.to_be_bytes());
        out.extend_from_slice(&elem_oid.to_be_bytes());
        if ndim == 1 {
            out.extend_from_slice(&(elements.len() as i32).to_be_bytes());
            out.extend_from_slice(&1i32.to_be_bytes());
        }
        for element in elements {
            put_value(&mut out, *element);
        }
        out
    }

    /// Binary `record` with `(oid, value)` fields.
    pub fn record(fields: &[(u32, Option<&[u8]>)]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(fields.len() as i32).to_be_bytes());
        for (field_oid, value) in fields {
            out.extend_from_slice(&field_oid.to_be_bytes());
            put_value(&mut out, *value);
        }
        out
    }
}

/// Builders for CozoDB values.
pub mod cozo {
    use cozo::{DataValue, NamedRows, Num};

    pub fn int(value: i64) -> DataValue {
        DataValue::Num(Num::Int(value))
    }

    pub fn float(value: f64) -> DataValue {
        DataValue::Num(Num::Float(value))
    }

    pub fn text(value: &str) -> DataValue {
        DataValue::Str(value.into())
    }

    pub fn list(values: Vec<DataValue>) -> DataValue {
        DataValue::List(values)
    }

    pub fn named_rows(headers: &[&str], rows: Vec<Vec<DataValue>>) -> NamedRows {
        NamedRows {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
            next: None,
        }
    }
}
