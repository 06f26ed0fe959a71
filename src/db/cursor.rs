//! Result cursors.
//!
//! A cursor owns one realized query result (the payload), a row position and a shared,
//! read-only [`TypeRegistry`]. Getters read the cell at the current row and never move the
//! position; callers step with [`ResultCursor::next`] or [`ResultCursor::set_position`].
//!
//! Both backend families share one engine, [`DecodeCursor`], parameterized by their
//! [`Payload`] type. [`Cursor`] is the closed family enum handed out by sessions.

use std::sync::Arc;

use chrono::NaiveDateTime;
use enum_dispatch::enum_dispatch;
use tracing::warn;

use super::backend::{Backend, ResultPayload};
use super::composite::{GeoPoint, IntervalEvent, Matrix, ProcessState};
use super::cozo::CozoCursor;
use super::decode::{self, NumberKind};
use super::key::ColumnKey;
use super::postgres::PgCursor;
use super::types::{NativeTypeId, TypeCategory, TypeDescriptor, TypeRegistry};
use super::value::{Scalar, WireCell, WireTag};
use super::DbError;

/// Shape of one family's realized result.
pub trait Payload: Sized {
    type Cell<'a>: WireCell
    where
        Self: 'a;

    const BACKEND: Backend;

    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    fn column_name(&self, column: usize) -> Option<&str>;

    fn column_type(&self, column: usize) -> Option<&NativeTypeId>;

    fn column_index(&self, name: &str) -> Option<usize> {
        (0..self.column_count()).find(|&column| self.column_name(column) == Some(name))
    }

    fn cell(&self, row: usize, column: usize) -> Option<Self::Cell<'_>>;

    /// Unwrap the family's payload, handing a foreign one back untouched.
    fn from_payload(payload: ResultPayload) -> Result<Self, ResultPayload>;
}

/// Uniform read access to a query result.
///
/// Decode problems never surface as errors: the getter logs a warning and returns the
/// type's default, or `None` for blobs, arrays and composites.
#[enum_dispatch]
pub trait ResultCursor {
    fn backend(&self) -> Backend;

    /// Replace the held payload and reset the position. A payload of another family is
    /// rejected and the cursor is left as it was.
    fn new_result(&mut self, payload: ResultPayload) -> Result<(), DbError>;

    fn clear(&mut self);

    fn is_ok(&self) -> bool;

    /// `None` while no payload is held.
    fn count_rows(&self) -> Option<usize>;

    fn count_cols(&self) -> Option<usize>;

    fn position(&self) -> Option<usize>;

    fn set_position(&mut self, row: usize);

    /// Step to the next row; an unpositioned cursor moves to row 0.
    fn inc_position(&mut self) {
        let row = self.position().map_or(0, |row| row + 1);
        self.set_position(row);
    }

    /// Step forward and report whether the cursor now sits on a row.
    fn next(&mut self) -> bool {
        self.inc_position();
        matches!((self.position(), self.count_rows()), (Some(row), Some(rows)) if row < rows)
    }

    fn key(&self, column: usize) -> Option<ColumnKey>;

    /// One key per column, in column order.
    fn keys(&self) -> Vec<ColumnKey>;

    /// Category name of the column's resolved type, empty when unresolved.
    fn key_type(&self, column: usize) -> String;

    fn key_index(&self, name: &str) -> Option<usize>;

    /// Canonical text of the value, whatever its type.
    fn get_value(&self, column: usize) -> String;

    fn get_char(&self, column: usize) -> char;
    fn get_string(&self, column: usize) -> String;
    fn get_bool(&self, column: usize) -> bool;
    fn get_int(&self, column: usize) -> i32;
    fn get_int8(&self, column: usize) -> i64;
    fn get_float(&self, column: usize) -> f32;
    fn get_float8(&self, column: usize) -> f64;
    fn get_timestamp(&self, column: usize) -> NaiveDateTime;
    fn get_point(&self, column: usize) -> GeoPoint;
    fn get_blob(&self, column: usize) -> Option<Vec<u8>>;
    fn get_matrix(&self, column: usize) -> Option<Matrix>;
    fn get_interval_event(&self, column: usize) -> Option<IntervalEvent>;
    fn get_process_state(&self, column: usize) -> Option<ProcessState>;

    fn get_int_vec(&self, column: usize) -> Option<Vec<i32>>;
    fn get_int8_vec(&self, column: usize) -> Option<Vec<i64>>;
    fn get_float_vec(&self, column: usize) -> Option<Vec<f32>>;
    fn get_float8_vec(&self, column: usize) -> Option<Vec<f64>>;
    fn get_point_vec(&self, column: usize) -> Option<Vec<GeoPoint>>;

    fn get_int_array(&self, column: usize) -> Option<Box<[i32]>> {
        self.get_int_vec(column).map(Vec::into_boxed_slice)
    }

    fn get_int8_array(&self, column: usize) -> Option<Box<[i64]>> {
        self.get_int8_vec(column).map(Vec::into_boxed_slice)
    }

    fn get_float_array(&self, column: usize) -> Option<Box<[f32]>> {
        self.get_float_vec(column).map(Vec::into_boxed_slice)
    }

    fn get_float8_array(&self, column: usize) -> Option<Box<[f64]>> {
        self.get_float8_vec(column).map(Vec::into_boxed_slice)
    }

    fn get_point_array(&self, column: usize) -> Option<Box<[GeoPoint]>> {
        self.get_point_vec(column).map(Vec::into_boxed_slice)
    }

    /// Column index for a by-name getter, warning when the name is unknown.
    fn named_column(&self, name: &str) -> Option<usize> {
        let column = self.key_index(name);
        if column.is_none() {
            warn!(column = name, "no column with this name");
        }
        column
    }

    fn get_value_by_name(&self, name: &str) -> String {
        self.named_column(name)
            .map(|column| self.get_value(column))
            .unwrap_or_default()
    }

    fn get_char_by_name(&self, name: &str) -> char {
        self.named_column(name)
            .map(|column| self.get_char(column))
            .unwrap_or_default()
    }

    fn get_string_by_name(&self, name: &str) -> String {
        self.named_column(name)
            .map(|column| self.get_string(column))
            .unwrap_or_default()
    }

    fn get_bool_by_name(&self, name: &str) -> bool {
        self.named_column(name)
            .map(|column| self.get_bool(column))
            .unwrap_or_default()
    }

    fn get_int_by_name(&self, name: &str) -> i32 {
        self.named_column(name)
            .map(|column| self.get_int(column))
            .unwrap_or_default()
    }

    fn get_int8_by_name(&self, name: &str) -> i64 {
        self.named_column(name)
            .map(|column| self.get_int8(column))
            .unwrap_or_default()
    }

    fn get_float_by_name(&self, name: &str) -> f32 {
        self.named_column(name)
            .map(|column| self.get_float(column))
            .unwrap_or_default()
    }

    fn get_float8_by_name(&self, name: &str) -> f64 {
        self.named_column(name)
            .map(|column| self.get_float8(column))
            .unwrap_or_default()
    }

    fn get_timestamp_by_name(&self, name: &str) -> NaiveDateTime {
        self.named_column(name)
            .map(|column| self.get_timestamp(column))
            .unwrap_or_default()
    }

    fn get_point_by_name(&self, name: &str) -> GeoPoint {
        self.named_column(name)
            .map(|column| self.get_point(column))
            .unwrap_or_default()
    }

    fn get_blob_by_name(&self, name: &str) -> Option<Vec<u8>> {
        self.named_column(name).and_then(|column| self.get_blob(column))
    }

    fn get_matrix_by_name(&self, name: &str) -> Option<Matrix> {
        self.named_column(name).and_then(|column| self.get_matrix(column))
    }

    fn get_interval_event_by_name(&self, name: &str) -> Option<IntervalEvent> {
        self.named_column(name)
            .and_then(|column| self.get_interval_event(column))
    }

    fn get_process_state_by_name(&self, name: &str) -> Option<ProcessState> {
        self.named_column(name)
            .and_then(|column| self.get_process_state(column))
    }

    fn get_int_vec_by_name(&self, name: &str) -> Option<Vec<i32>> {
        self.named_column(name).and_then(|column| self.get_int_vec(column))
    }

    fn get_int8_vec_by_name(&self, name: &str) -> Option<Vec<i64>> {
        self.named_column(name).and_then(|column| self.get_int8_vec(column))
    }

    fn get_float_vec_by_name(&self, name: &str) -> Option<Vec<f32>> {
        self.named_column(name).and_then(|column| self.get_float_vec(column))
    }

    fn get_float8_vec_by_name(&self, name: &str) -> Option<Vec<f64>> {
        self.named_column(name).and_then(|column| self.get_float8_vec(column))
    }

    fn get_point_vec_by_name(&self, name: &str) -> Option<Vec<GeoPoint>> {
        self.named_column(name).and_then(|column| self.get_point_vec(column))
    }

    fn get_int_array_by_name(&self, name: &str) -> Option<Box<[i32]>> {
        self.named_column(name).and_then(|column| self.get_int_array(column))
    }

    fn get_int8_array_by_name(&self, name: &str) -> Option<Box<[i64]>> {
        self.named_column(name).and_then(|column| self.get_int8_array(column))
    }

    fn get_float_array_by_name(&self, name: &str) -> Option<Box<[f32]>> {
        self.named_column(name).and_then(|column| self.get_float_array(column))
    }

    fn get_float8_array_by_name(&self, name: &str) -> Option<Box<[f64]>> {
        self.named_column(name).and_then(|column| self.get_float8_array(column))
    }

    fn get_point_array_by_name(&self, name: &str) -> Option<Box<[GeoPoint]>> {
        self.named_column(name).and_then(|column| self.get_point_array(column))
    }
}

/// Cursor over one family's payload type.
#[derive(Debug)]
pub struct DecodeCursor<P> {
    registry: Arc<TypeRegistry>,
    payload: Option<P>,
    position: Option<usize>,
}

impl<P: Payload> DecodeCursor<P> {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            payload: None,
            position: None,
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }

    fn descriptor(&self, column: usize) -> &TypeDescriptor {
        let id = self.payload.as_ref().and_then(|p| p.column_type(column));
        self.registry.describe(id)
    }

    /// Cell at the current row plus its column's descriptor.
    fn current(&self, column: usize) -> Option<(P::Cell<'_>, &TypeDescriptor)> {
        let Some(payload) = &self.payload else {
            debug_assert!(false, "read from a cursor without a result");
            warn!(column, "read from a cursor without a result");
            return None;
        };
        let Some(row) = self.position else {
            debug_assert!(false, "read from an unpositioned cursor");
            warn!(column, "read from an unpositioned cursor");
            return None;
        };
        if row >= payload.row_count() {
            debug_assert!(false, "cursor position {} is past the last row", row);
            warn!(column, row, rows = payload.row_count(), "cursor position is past the last row");
            return None;
        }
        let Some(cell) = payload.cell(row, column) else {
            warn!(column, row, "column index out of range");
            return None;
        };
        let desc = self.registry.describe(payload.column_type(column));
        Some((cell, desc))
    }

    fn scalar(&self, column: usize, tag: WireTag) -> Option<Scalar> {
        let (cell, _) = self.current(column)?;
        decode::decode_scalar(&cell, tag, column)
    }
}

impl<P: Payload> ResultCursor for DecodeCursor<P> {
    fn backend(&self) -> Backend {
        P::BACKEND
    }

    fn new_result(&mut self, payload: ResultPayload) -> Result<(), DbError> {
        let found = payload.backend();
        let payload = P::from_payload(payload).map_err(|_| DbError::FamilyMismatch {
            expected: P::BACKEND,
            found,
        })?;
        drop(self.payload.take());
        self.payload = Some(payload);
        self.position = None;
        Ok(())
    }

    fn clear(&mut self) {
        self.payload = None;
        self.position = None;
    }

    fn is_ok(&self) -> bool {
        self.payload.is_some()
    }

    fn count_rows(&self) -> Option<usize> {
        self.payload.as_ref().map(Payload::row_count)
    }

    fn count_cols(&self) -> Option<usize> {
        self.payload.as_ref().map(Payload::column_count)
    }

    fn position(&self) -> Option<usize> {
        self.position
    }

    fn set_position(&mut self, row: usize) {
        self.position = Some(row);
    }

    fn key(&self, column: usize) -> Option<ColumnKey> {
        let name = self.payload.as_ref()?.column_name(column)?;
        Some(ColumnKey::new(name, self.descriptor(column)))
    }

    fn keys(&self) -> Vec<ColumnKey> {
        (0..self.count_cols().unwrap_or(0))
            .filter_map(|column| self.key(column))
            .collect()
    }

    fn key_type(&self, column: usize) -> String {
        match self.descriptor(column).category {
            TypeCategory::Unknown => String::new(),
            category => category.to_string(),
        }
    }

    fn key_index(&self, name: &str) -> Option<usize> {
        self.payload.as_ref()?.column_index(name)
    }

    fn get_value(&self, column: usize) -> String {
        self.current(column)
            .map(|(cell, desc)| decode::render(&cell, desc, column))
            .unwrap_or_default()
    }

    fn get_char(&self, column: usize) -> char {
        match self.scalar(column, WireTag::Char) {
            Some(Scalar::Char(c)) => c,
            _ => char::default(),
        }
    }

    fn get_string(&self, column: usize) -> String {
        self.scalar(column, WireTag::Text)
            .and_then(Scalar::into_text)
            .unwrap_or_default()
    }

    fn get_bool(&self, column: usize) -> bool {
        self.scalar(column, WireTag::Bool)
            .and_then(|s| s.as_bool())
            .unwrap_or_default()
    }

    fn get_int(&self, column: usize) -> i32 {
        self.current(column)
            .map(|(cell, desc)| decode::decode_number(&cell, NumberKind::Integer, desc.width, column))
            .unwrap_or_default()
    }

    fn get_int8(&self, column: usize) -> i64 {
        self.current(column)
            .map(|(cell, desc)| decode::decode_number(&cell, NumberKind::Integer, desc.width, column))
            .unwrap_or_default()
    }

    fn get_float(&self, column: usize) -> f32 {
        self.current(column)
            .map(|(cell, desc)| decode::decode_number(&cell, NumberKind::Float, desc.width, column))
            .unwrap_or_default()
    }

    fn get_float8(&self, column: usize) -> f64 {
        self.current(column)
            .map(|(cell, desc)| decode::decode_number(&cell, NumberKind::Float, desc.width, column))
            .unwrap_or_default()
    }

    fn get_timestamp(&self, column: usize) -> NaiveDateTime {
        self.scalar(column, WireTag::Timestamp)
            .and_then(|s| s.as_timestamp())
            .unwrap_or_default()
    }

    fn get_point(&self, column: usize) -> GeoPoint {
        self.scalar(column, WireTag::Point)
            .and_then(|s| s.as_point())
            .unwrap_or_default()
    }

    fn get_blob(&self, column: usize) -> Option<Vec<u8>> {
        let (cell, _) = self.current(column)?;
        if cell.is_null() {
            return None;
        }
        decode::decode_scalar(&cell, WireTag::Bytea, column).and_then(Scalar::into_bytes)
    }

    fn get_matrix(&self, column: usize) -> Option<Matrix> {
        let (cell, _) = self.current(column)?;
        decode::decode_matrix(&cell, column)
    }

    fn get_interval_event(&self, column: usize) -> Option<IntervalEvent> {
        let (cell, _) = self.current(column)?;
        decode::decode_interval_event(&cell, column)
    }

    fn get_process_state(&self, column: usize) -> Option<ProcessState> {
        let (cell, _) = self.current(column)?;
        decode::decode_process_state(&cell, column)
    }

    fn get_int_vec(&self, column: usize) -> Option<Vec<i32>> {
        let (cell, desc) = self.current(column)?;
        decode::decode_number_array(&cell, NumberKind::Integer, desc.width, column)
    }

    fn get_int8_vec(&self, column: usize) -> Option<Vec<i64>> {
        let (cell, desc) = self.current(column)?;
        decode::decode_number_array(&cell, NumberKind::Integer, desc.width, column)
    }

    fn get_float_vec(&self, column: usize) -> Option<Vec<f32>> {
        let (cell, desc) = self.current(column)?;
        decode::decode_number_array(&cell, NumberKind::Float, desc.width, column)
    }

    fn get_float8_vec(&self, column: usize) -> Option<Vec<f64>> {
        let (cell, desc) = self.current(column)?;
        decode::decode_number_array(&cell, NumberKind::Float, desc.width, column)
    }

    fn get_point_vec(&self, column: usize) -> Option<Vec<GeoPoint>> {
        let (cell, _) = self.current(column)?;
        decode::decode_array(&cell, WireTag::Point, column, |s| s.as_point())
    }
}

/// Result cursor of either backend family.
#[enum_dispatch(ResultCursor)]
#[derive(Debug)]
pub enum Cursor {
    Postgres(PgCursor),
    Cozo(CozoCursor),
}

impl Cursor {
    /// Empty cursor of the registry's family.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        match registry.backend() {
            Backend::Postgres => Cursor::Postgres(PgCursor::new(registry)),
            Backend::Cozo => Cursor::Cozo(CozoCursor::new(registry)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::composite::{GeoBox, ProcessStatus};
    use crate::db::cozo::{types as cozo_types, CozoResult};
    use crate::db::postgres::PgResult;
    use crate::db::postgres::wire::oid;
    use crate::test_utils::cozo::{float, int, list, named_rows, text};
    use ::cozo::DataValue;
    use rstest::{fixture, rstest};

    #[fixture]
    fn cozo_registry() -> Arc<TypeRegistry> {
        Arc::new(cozo_types::builtin_registry())
    }

    fn cozo_cursor(registry: &Arc<TypeRegistry>, result: CozoResult) -> Cursor {
        let mut cursor = Cursor::new(Arc::clone(registry));
        cursor.new_result(ResultPayload::Cozo(result)).unwrap();
        cursor
    }

    fn typed(headers: &[&str], types: &[&str], rows: Vec<Vec<DataValue>>) -> CozoResult {
        CozoResult::with_types(
            named_rows(headers, rows),
            types.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[rstest]
    fn test_lifecycle(cozo_registry: Arc<TypeRegistry>) {
        let mut cursor = Cursor::new(Arc::clone(&cozo_registry));
        assert!(!cursor.is_ok());
        assert_eq!(cursor.count_rows(), None);
        assert_eq!(cursor.count_cols(), None);
        assert_eq!(cursor.position(), None);

        let result = typed(&["n"], &["Int"], vec![vec![int(1)], vec![int(2)]]);
        cursor.new_result(ResultPayload::Cozo(result)).unwrap();
        assert!(cursor.is_ok());
        assert_eq!(cursor.count_rows(), Some(2));
        assert_eq!(cursor.count_cols(), Some(1));
        assert_eq!(cursor.position(), None);

        cursor.clear();
        assert!(!cursor.is_ok());
        assert_eq!(cursor.count_rows(), None);
    }

    #[rstest]
    fn test_new_result_replaces_and_resets(cozo_registry: Arc<TypeRegistry>) {
        let first = typed(&["n"], &["Int"], vec![vec![int(1)]]);
        let mut cursor = cozo_cursor(&cozo_registry, first);
        cursor.set_position(0);

        let second = typed(&["a", "b"], &["Int", "Int"], vec![]);
        cursor.new_result(ResultPayload::Cozo(second)).unwrap();
        assert_eq!(cursor.position(), None);
        assert_eq!(cursor.count_rows(), Some(0));
        assert_eq!(cursor.count_cols(), Some(2));
    }

    #[rstest]
    fn test_family_mismatch_leaves_cursor_untouched(cozo_registry: Arc<TypeRegistry>) {
        let result = typed(&["n"], &["Int"], vec![vec![int(7)]]);
        let mut cursor = cozo_cursor(&cozo_registry, result);
        cursor.set_position(0);

        let foreign = PgResult::new(vec![("n".to_string(), oid::INT4)], vec![]);
        let err = cursor.new_result(ResultPayload::Postgres(foreign)).unwrap_err();
        assert!(matches!(
            err,
            DbError::FamilyMismatch {
                expected: Backend::Cozo,
                found: Backend::Postgres
            }
        ));
        assert_eq!(cursor.position(), Some(0));
        assert_eq!(cursor.get_int8(0), 7);
    }

    #[rstest]
    fn test_next_walks_every_row(cozo_registry: Arc<TypeRegistry>) {
        let rows = (1..=3).map(|n| vec![int(n)]).collect();
        let mut cursor = cozo_cursor(&cozo_registry, typed(&["n"], &["Int"], rows));
        let mut seen = Vec::new();
        while cursor.next() {
            seen.push(cursor.get_int(0));
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(cursor.position(), Some(3));
    }

    #[rstest]
    fn test_next_on_empty_result(cozo_registry: Arc<TypeRegistry>) {
        let mut cursor = cozo_cursor(&cozo_registry, typed(&["n"], &["Int"], vec![]));
        assert!(!cursor.next());
    }

    #[rstest]
    fn test_int_scenario(cozo_registry: Arc<TypeRegistry>) {
        let mut cursor = cozo_cursor(&cozo_registry, typed(&["n"], &["Int"], vec![vec![int(42)]]));
        cursor.set_position(0);
        assert_eq!(cursor.get_int(0), 42);
        assert_eq!(cursor.get_int8(0), 42);
        assert_eq!(cursor.get_value(0), "42");
    }

    #[rstest]
    fn test_float_array_scenario(cozo_registry: Arc<TypeRegistry>) {
        let values = list(vec![float(1.5), float(2.5)]);
        let mut cursor = cozo_cursor(&cozo_registry, typed(&["v"], &["[Float]"], vec![vec![values]]));
        cursor.set_position(0);
        assert_eq!(cursor.get_float8_vec(0), Some(vec![1.5, 2.5]));
        assert_eq!(cursor.get_float_vec(0), Some(vec![1.5f32, 2.5]));
        assert_eq!(cursor.get_float8_array(0).as_deref(), Some(&[1.5, 2.5][..]));
        assert_eq!(cursor.get_value(0), "1.5,2.5");
    }

    #[rstest]
    fn test_empty_and_bad_arrays(cozo_registry: Arc<TypeRegistry>) {
        let rows = vec![
            vec![list(vec![])],
            vec![list(vec![int(1), text("x")])],
            vec![DataValue::Null],
        ];
        let mut cursor = cozo_cursor(&cozo_registry, typed(&["v"], &["[Int]"], rows));
        while cursor.next() {
            assert_eq!(cursor.get_int8_vec(0), None);
            assert_eq!(cursor.get_int_array(0), None);
            assert_eq!(cursor.get_value(0), "");
        }
    }

    #[rstest]
    fn test_get_value_is_deterministic(cozo_registry: Arc<TypeRegistry>) {
        let event = IntervalEvent {
            group_id: 1,
            class_id: 2,
            is_root: true,
            region: GeoBox::from_coords([4.0, 3.0, 2.0, 1.0]),
            score: 0.5,
            user_data: vec![0xab],
        };
        let mut cursor = cozo_cursor(
            &cozo_registry,
            typed(&["e"], &["(Int,Int,Bool,[Float],Float,Bytes)"], vec![vec![DataValue::from(&event)]]),
        );
        cursor.set_position(0);
        let first = cursor.get_value(0);
        assert_eq!(first, cursor.get_value(0));
        assert_eq!(first, "(1,2,true,(4,3),(2,1),0.5,ab)");
    }

    #[rstest]
    fn test_composites_round_trip(cozo_registry: Arc<TypeRegistry>) {
        let matrix = Matrix::new(0, vec![2, 3]).unwrap();
        let event = IntervalEvent::default();
        let state = ProcessState {
            status: ProcessStatus::Running,
            progress: 0.25,
            current_item: "seq-1".to_string(),
            last_error: String::new(),
        };
        let result = typed(
            &["m", "e", "s"],
            &[
                "(Int,[Int],Bytes)",
                "(Int,Int,Bool,[Float],Float,Bytes)",
                "(String,Float,String,String)",
            ],
            vec![vec![
                DataValue::from(&matrix),
                DataValue::from(&event),
                DataValue::from(&state),
            ]],
        );
        let mut cursor = cozo_cursor(&cozo_registry, result);
        cursor.set_position(0);

        let decoded = cursor.get_matrix_by_name("m").unwrap();
        assert_eq!(decoded.dims, vec![2, 3]);
        assert_eq!(decoded.data.len(), 6);
        assert_eq!(decoded, matrix);

        let decoded = cursor.get_interval_event(1).unwrap();
        assert!(decoded.user_data.is_empty());
        assert_eq!(decoded, event);

        assert_eq!(cursor.get_process_state(2), Some(state));
        assert_eq!(cursor.get_value(2), "(running,0.25,seq-1,)");
    }

    #[rstest]
    fn test_keys_and_by_name(cozo_registry: Arc<TypeRegistry>) {
        let result = typed(
            &["id", "name", "mystery"],
            &["Int", "String", "Validity"],
            vec![vec![int(5), text("clip"), DataValue::Null]],
        );
        let mut cursor = cozo_cursor(&cozo_registry, result);
        cursor.set_position(0);

        let keys = cursor.keys();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].name, "id");
        assert_eq!(keys[0].type_name, "Int");
        assert_eq!(keys[0].length, 8);
        assert!(!keys[2].is_resolved());

        assert_eq!(cursor.key_type(0), "integer");
        assert_eq!(cursor.key_type(1), "string");
        assert_eq!(cursor.key_type(2), "");
        assert_eq!(cursor.key_index("name"), Some(1));
        assert_eq!(cursor.key_index("nope"), None);

        assert_eq!(cursor.get_string_by_name("name"), "clip");
        assert_eq!(cursor.get_int_by_name("id"), 5);
        assert_eq!(cursor.get_int_by_name("nope"), 0);
        assert_eq!(cursor.get_blob_by_name("nope"), None);
        assert_eq!(cursor.get_value(2), "");
    }

    #[rstest]
    fn test_mismatch_returns_default(cozo_registry: Arc<TypeRegistry>) {
        let mut cursor = cozo_cursor(&cozo_registry, typed(&["s"], &["String"], vec![vec![text("x")]]));
        cursor.set_position(0);
        assert_eq!(cursor.get_int(0), 0);
        assert!(!cursor.get_bool(0));
        assert_eq!(cursor.get_matrix(0), None);
        assert_eq!(cursor.get_char(0), 'x');
    }

    #[test]
    fn test_postgres_payload_decodes() {
        let registry = Arc::new(crate::db::postgres::types::builtin_registry());
        let result = PgResult::new(
            vec![("n".to_string(), oid::INT4), ("label".to_string(), oid::TEXT)],
            vec![vec![Some(42i32.to_be_bytes().to_vec()), Some(b"clip".to_vec())]],
        );
        let mut cursor = Cursor::new(registry);
        assert_eq!(cursor.backend(), Backend::Postgres);
        cursor.new_result(ResultPayload::Postgres(result)).unwrap();
        assert!(cursor.next());
        assert_eq!(cursor.get_int(0), 42);
        assert_eq!(cursor.get_value(0), "42");
        assert_eq!(cursor.get_string_by_name("label"), "clip");
        assert_eq!(cursor.key(0).unwrap().type_name, "int4");
    }

    #[cfg(debug_assertions)]
    #[rstest]
    #[should_panic(expected = "unpositioned")]
    fn test_unpositioned_read_fails_loudly(cozo_registry: Arc<TypeRegistry>) {
        let cursor = cozo_cursor(&cozo_registry, typed(&["n"], &["Int"], vec![vec![int(1)]]));
        cursor.get_int(0);
    }
}
