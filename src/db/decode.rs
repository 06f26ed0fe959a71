//! Family-independent decode engine.
//!
//! Every function here works on a single [`WireCell`] and never returns an error: a value
//! that cannot be read as requested is logged with `warn!` and replaced by a default (for
//! scalars) or `None` (for arrays and composites).

use tracing::warn;

use super::composite::{IntervalEvent, Matrix, ProcessState, ProcessStatus};
use super::types::{StorageWidth, TypeCategory, TypeDescriptor};
use super::value::{Canonical, RecordKind, Scalar, WireCell, WireTag};

/// Numeric family of a getter, selecting which width table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Integer,
    Float,
}

const INTEGER_WIDTHS: &[(StorageWidth, WireTag)] = &[
    (StorageWidth::Variable, WireTag::Numeric),
    (StorageWidth::Two, WireTag::Int2),
    (StorageWidth::Four, WireTag::Int4),
    (StorageWidth::Eight, WireTag::Int8),
];

const FLOAT_WIDTHS: &[(StorageWidth, WireTag)] = &[
    (StorageWidth::Variable, WireTag::Numeric),
    (StorageWidth::Four, WireTag::Float4),
    (StorageWidth::Eight, WireTag::Float8),
];

impl NumberKind {
    fn widths(&self) -> &'static [(StorageWidth, WireTag)] {
        match self {
            NumberKind::Integer => INTEGER_WIDTHS,
            NumberKind::Float => FLOAT_WIDTHS,
        }
    }

    /// Wire tag for a storage width. An unresolved width reads as four bytes.
    pub fn tag_for(&self, width: Option<StorageWidth>) -> Option<WireTag> {
        let width = width.unwrap_or(StorageWidth::Four);
        self.widths()
            .iter()
            .find(|(w, _)| *w == width)
            .map(|(_, tag)| *tag)
    }
}

/// Read one scalar, logging the reason on failure.
pub fn decode_scalar<C: WireCell>(cell: &C, tag: WireTag, column: usize) -> Option<Scalar> {
    match cell.scalar(tag) {
        Ok(scalar) => Some(scalar),
        Err(err) => {
            warn!(column, %tag, error = %err, "cannot decode value");
            None
        }
    }
}

/// Width-dispatched numeric read into the canonical output type `O`.
pub fn decode_number<C: WireCell, O: Canonical>(
    cell: &C,
    kind: NumberKind,
    width: Option<StorageWidth>,
    column: usize,
) -> O {
    let Some(tag) = kind.tag_for(width) else {
        warn!(column, width = ?width, "value has unknown length");
        return O::default();
    };
    decode_scalar(cell, tag, column)
        .and_then(|scalar| O::from_scalar(&scalar))
        .unwrap_or_default()
}

/// Decode every element of an array cell, or nothing at all.
///
/// NULL and empty arrays yield `None`. A single element that fails to convert discards the
/// whole array.
pub fn decode_array<C, O, F>(cell: &C, tag: WireTag, column: usize, convert: F) -> Option<Vec<O>>
where
    C: WireCell,
    F: Fn(Scalar) -> Option<O>,
{
    if cell.is_null() {
        return None;
    }
    let elements = match cell.elements(tag) {
        Ok(elements) => elements,
        Err(err) => {
            warn!(column, %tag, error = %err, "cannot decode array");
            return None;
        }
    };
    if elements.is_empty() {
        return None;
    }

    let mut values = Vec::new();
    if values.try_reserve_exact(elements.len()).is_err() {
        warn!(column, len = elements.len(), "cannot allocate array");
        return None;
    }
    for (index, element) in elements.iter().enumerate() {
        match element.scalar(tag).ok().and_then(&convert) {
            Some(value) => values.push(value),
            None => {
                warn!(column, index, %tag, "array element cannot be decoded");
                return None;
            }
        }
    }
    Some(values)
}

/// Width-dispatched numeric array read.
pub fn decode_number_array<C: WireCell, O: Canonical>(
    cell: &C,
    kind: NumberKind,
    width: Option<StorageWidth>,
    column: usize,
) -> Option<Vec<O>> {
    let Some(tag) = kind.tag_for(width) else {
        warn!(column, width = ?width, "array has unknown element length");
        return None;
    };
    decode_array(cell, tag, column, |scalar| O::from_scalar(&scalar))
}

struct Record<C> {
    kind: RecordKind,
    fields: Vec<C>,
    column: usize,
}

impl<C: WireCell> Record<C> {
    fn open(cell: &C, kind: RecordKind, column: usize) -> Option<Self> {
        if cell.is_null() {
            return None;
        }
        let expected = kind.layout().len();
        match cell.fields(kind) {
            Ok(fields) if fields.len() == expected => Some(Self { kind, fields, column }),
            Ok(fields) => {
                warn!(column, record = %kind, expected, found = fields.len(), "record has wrong field count");
                None
            }
            Err(err) => {
                warn!(column, record = %kind, error = %err, "cannot decode record");
                None
            }
        }
    }

    fn scalar(&self, index: usize) -> Option<Scalar> {
        let spec = self.kind.layout().get(index)?;
        let cell = self.fields.get(index)?;
        match cell.scalar(spec.tag) {
            Ok(scalar) => Some(scalar),
            Err(err) => {
                warn!(column = self.column, record = %self.kind, field = spec.name, error = %err, "cannot decode record field");
                None
            }
        }
    }

    fn number<O: Canonical>(&self, index: usize) -> Option<O> {
        O::from_scalar(&self.scalar(index)?)
    }

    fn text(&self, index: usize) -> Option<String> {
        self.scalar(index)?.into_text()
    }

    fn bytes(&self, index: usize) -> Option<Vec<u8>> {
        self.scalar(index)?.into_bytes()
    }
}

pub fn decode_matrix<C: WireCell>(cell: &C, column: usize) -> Option<Matrix> {
    let record = Record::open(cell, RecordKind::Matrix, column)?;
    let element_type = record.number::<i32>(0)?;
    let dims_cell = record.fields.get(1)?;
    let dims = decode_array(dims_cell, WireTag::Int4, column, |s| i32::from_scalar(&s))?;
    let data = record.bytes(2)?;
    Matrix::from_parts(element_type, dims, &data)
}

pub fn decode_interval_event<C: WireCell>(cell: &C, column: usize) -> Option<IntervalEvent> {
    let record = Record::open(cell, RecordKind::IntervalEvent, column)?;
    Some(IntervalEvent {
        group_id: record.number(0)?,
        class_id: record.number(1)?,
        is_root: record.scalar(2)?.as_bool()?,
        region: record.scalar(3)?.as_box()?,
        score: record.number(4)?,
        user_data: record.bytes(5)?,
    })
}

pub fn decode_process_state<C: WireCell>(cell: &C, column: usize) -> Option<ProcessState> {
    let record = Record::open(cell, RecordKind::ProcessState, column)?;
    Some(ProcessState {
        status: ProcessStatus::from_label(&record.text(0)?),
        progress: record.number(1)?,
        current_item: record.text(2)?,
        last_error: record.text(3)?,
    })
}

fn join<T: ToString>(values: Option<Vec<T>>) -> String {
    values
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Canonical text of a cell, chosen by the column's category.
pub fn render<C: WireCell>(cell: &C, desc: &TypeDescriptor, column: usize) -> String {
    match desc.category {
        TypeCategory::String
        | TypeCategory::SequenceType
        | TypeCategory::InOutType
        | TypeCategory::ProcessStatus => decode_scalar(cell, WireTag::Text, column)
            .and_then(Scalar::into_text)
            .unwrap_or_default(),
        TypeCategory::Integer if desc.is_array => join(decode_number_array::<C, i64>(
            cell,
            NumberKind::Integer,
            desc.width,
            column,
        )),
        TypeCategory::Integer => {
            decode_number::<C, i64>(cell, NumberKind::Integer, desc.width, column).to_string()
        }
        TypeCategory::Float if desc.is_array => join(decode_number_array::<C, f64>(
            cell,
            NumberKind::Float,
            desc.width,
            column,
        )),
        TypeCategory::Float => {
            decode_number::<C, f64>(cell, NumberKind::Float, desc.width, column).to_string()
        }
        TypeCategory::Boolean => decode_scalar(cell, WireTag::Bool, column)
            .and_then(|s| s.as_bool())
            .unwrap_or_default()
            .to_string(),
        TypeCategory::Blob => decode_scalar(cell, WireTag::Bytea, column)
            .and_then(Scalar::into_bytes)
            .map(hex::encode)
            .unwrap_or_default(),
        TypeCategory::Timestamp => decode_scalar(cell, WireTag::Timestamp, column)
            .and_then(|s| s.as_timestamp())
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        TypeCategory::GeoPoint if desc.is_array => {
            join(decode_array(cell, WireTag::Point, column, |s| s.as_point()))
        }
        TypeCategory::GeoPoint => decode_scalar(cell, WireTag::Point, column)
            .and_then(|s| s.as_point())
            .unwrap_or_default()
            .to_string(),
        TypeCategory::Matrix => decode_matrix(cell, column)
            .map(|m| m.to_string())
            .unwrap_or_default(),
        TypeCategory::IntervalEvent => decode_interval_event(cell, column)
            .map(|e| e.to_string())
            .unwrap_or_default(),
        TypeCategory::ProcessState => decode_process_state(cell, column)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        TypeCategory::GeoLseg
        | TypeCategory::GeoPath
        | TypeCategory::GeoBox
        | TypeCategory::GeoPolygon
        | TypeCategory::GeoLine
        | TypeCategory::GeoCircle
        | TypeCategory::GeoGeometry
        | TypeCategory::RefType
        | TypeCategory::RefClass
        | TypeCategory::Unknown => String::new(),
    }
}
