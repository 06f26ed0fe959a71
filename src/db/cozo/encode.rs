//! Conversion of domain values into CozoDB values.
//!
//! Composites become lists in record field order, so a column declared with the matching
//! tuple type stores them directly.

use cozo::{DataValue, Num};

use crate::db::composite::{GeoBox, GeoPoint, IntervalEvent, Matrix, ProcessState};
use crate::db::params::ValueType;

fn int(value: i64) -> DataValue {
    DataValue::Num(Num::Int(value))
}

fn float(value: f64) -> DataValue {
    DataValue::Num(Num::Float(value))
}

fn text(value: &str) -> DataValue {
    DataValue::Str(value.into())
}

impl From<GeoPoint> for DataValue {
    fn from(point: GeoPoint) -> Self {
        DataValue::List(vec![float(point.x), float(point.y)])
    }
}

impl From<GeoBox> for DataValue {
    fn from(region: GeoBox) -> Self {
        DataValue::List(region.coords().into_iter().map(float).collect())
    }
}

impl From<&Matrix> for DataValue {
    fn from(matrix: &Matrix) -> Self {
        DataValue::List(vec![
            int(i64::from(matrix.element_type)),
            DataValue::List(matrix.dims.iter().map(|&d| int(i64::from(d))).collect()),
            DataValue::Bytes(matrix.data.clone()),
        ])
    }
}

impl From<&IntervalEvent> for DataValue {
    fn from(event: &IntervalEvent) -> Self {
        DataValue::List(vec![
            int(i64::from(event.group_id)),
            int(i64::from(event.class_id)),
            DataValue::Bool(event.is_root),
            DataValue::from(event.region),
            float(event.score),
            DataValue::Bytes(event.user_data.clone()),
        ])
    }
}

impl From<&ProcessState> for DataValue {
    fn from(state: &ProcessState) -> Self {
        DataValue::List(vec![
            text(state.status.as_str()),
            float(f64::from(state.progress)),
            text(&state.current_item),
            text(&state.last_error),
        ])
    }
}

impl From<&ValueType> for DataValue {
    fn from(value: &ValueType) -> Self {
        match value {
            ValueType::Str(s) => text(s),
            ValueType::Int(i) => int(*i),
            ValueType::Float(f) => float(*f),
            ValueType::Bool(b) => DataValue::Bool(*b),
            ValueType::StrArray(values) => DataValue::List(values.iter().map(|s| text(s)).collect()),
        }
    }
}
