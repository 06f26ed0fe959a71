//! Backend-neutral view of a single result cell.
//!
//! Each backend family exposes its cells through [`WireCell`]: a cell can be read as one
//! scalar of a requested [`WireTag`], split into array elements, or split into the fields of
//! a composite record. The decode engine only ever talks to this trait, so the width tables
//! and composite layouts are shared by every family.

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::composite::{GeoBox, GeoPoint};

/// Wire representation requested from a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireTag {
    Char,
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// Arbitrary precision number, handed over as its decimal text.
    Numeric,
    Text,
    Bytea,
    Point,
    Box,
    Timestamp,
}

impl WireTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireTag::Char => "char",
            WireTag::Bool => "bool",
            WireTag::Int2 => "int2",
            WireTag::Int4 => "int4",
            WireTag::Int8 => "int8",
            WireTag::Float4 => "float4",
            WireTag::Float8 => "float8",
            WireTag::Numeric => "numeric",
            WireTag::Text => "text",
            WireTag::Bytea => "bytea",
            WireTag::Point => "point",
            WireTag::Box => "box",
            WireTag::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for WireTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a composite record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub tag: WireTag,
    pub array: bool,
}

const fn field(name: &'static str, tag: WireTag) -> FieldSpec {
    FieldSpec { name, tag, array: false }
}

const MATRIX_LAYOUT: [FieldSpec; 3] = [
    field("element_type", WireTag::Int4),
    FieldSpec { name: "dims", tag: WireTag::Int4, array: true },
    field("data", WireTag::Bytea),
];

const INTERVAL_EVENT_LAYOUT: [FieldSpec; 6] = [
    field("group_id", WireTag::Int4),
    field("class_id", WireTag::Int4),
    field("is_root", WireTag::Bool),
    field("region", WireTag::Box),
    field("score", WireTag::Float8),
    field("user_data", WireTag::Bytea),
];

const PROCESS_STATE_LAYOUT: [FieldSpec; 4] = [
    field("status", WireTag::Text),
    field("progress", WireTag::Float4),
    field("current_item", WireTag::Text),
    field("last_error", WireTag::Text),
];

/// Composite record shapes known to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Matrix,
    IntervalEvent,
    ProcessState,
}

impl RecordKind {
    /// Field order and wire types, identical for every backend.
    pub fn layout(&self) -> &'static [FieldSpec] {
        match self {
            RecordKind::Matrix => &MATRIX_LAYOUT,
            RecordKind::IntervalEvent => &INTERVAL_EVENT_LAYOUT,
            RecordKind::ProcessState => &PROCESS_STATE_LAYOUT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Matrix => "cvmat",
            RecordKind::IntervalEvent => "vtevent",
            RecordKind::ProcessState => "pstate",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded scalar. Integer tags widen to `Int`, float tags to `Float`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Char(char),
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(String),
    Text(String),
    Bytes(Vec<u8>),
    Point(GeoPoint),
    Box(GeoBox),
    Timestamp(NaiveDateTime),
}

impl Scalar {
    /// Value read from a NULL cell.
    pub fn zero(tag: WireTag) -> Self {
        match tag {
            WireTag::Char => Scalar::Char('\0'),
            WireTag::Bool => Scalar::Bool(false),
            WireTag::Int2 | WireTag::Int4 | WireTag::Int8 => Scalar::Int(0),
            WireTag::Float4 | WireTag::Float8 => Scalar::Float(0.0),
            WireTag::Numeric => Scalar::Numeric("0".to_string()),
            WireTag::Text => Scalar::Text(String::new()),
            WireTag::Bytea => Scalar::Bytes(Vec::new()),
            WireTag::Point => Scalar::Point(GeoPoint::default()),
            WireTag::Box => Scalar::Box(GeoBox::default()),
            WireTag::Timestamp => Scalar::Timestamp(NaiveDateTime::default()),
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Scalar::Text(s) | Scalar::Numeric(s) => Some(s),
            Scalar::Char(c) => Some(c.to_string()),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Scalar::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<GeoPoint> {
        match self {
            Scalar::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_box(&self) -> Option<GeoBox> {
        match self {
            Scalar::Box(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Scalar::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Why a cell could not be read as the requested shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("value is NULL")]
    Null,

    #[error("value is not a {expected} (found {found})")]
    TypeMismatch { expected: WireTag, found: String },

    #[error("value does not fit in {tag}")]
    OutOfRange { tag: WireTag },

    #[error("malformed {tag} value: {message}")]
    Malformed { tag: WireTag, message: String },

    #[error("{kind} record has {found} fields, expected {expected}")]
    FieldCount {
        kind: RecordKind,
        expected: usize,
        found: usize,
    },
}

/// Read access to one result cell.
pub trait WireCell: Sized {
    fn is_null(&self) -> bool;

    /// Decode the cell as one scalar. NULL yields [`Scalar::zero`].
    fn scalar(&self, tag: WireTag) -> Result<Scalar, DecodeError>;

    /// Split an array cell into element cells, checking the element type against `tag`.
    fn elements(&self, tag: WireTag) -> Result<Vec<Self>, DecodeError>;

    /// Split a composite cell into field cells in [`RecordKind::layout`] order.
    fn fields(&self, kind: RecordKind) -> Result<Vec<Self>, DecodeError>;
}

/// Rust output types of the numeric getters.
pub trait Canonical: Copy + Default + fmt::Display {
    fn from_scalar(scalar: &Scalar) -> Option<Self>;
}

impl Canonical for i64 {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Int(v) => Some(*v),
            Scalar::Numeric(text) => Some(parse_leading_int(text)),
            _ => None,
        }
    }
}

impl Canonical for i32 {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        i64::from_scalar(scalar).map(|v| v as i32)
    }
}

impl Canonical for f64 {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Float(v) => Some(*v),
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Numeric(text) => Some(parse_leading_float(text)),
            _ => None,
        }
    }
}

impl Canonical for f32 {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        f64::from_scalar(scalar).map(|v| v as f32)
    }
}

/// Integer prefix of a decimal string, 0 when there is none. Saturates on overflow.
pub fn parse_leading_int(text: &str) -> i64 {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        value = value.saturating_mul(10);
        value = if negative {
            value.saturating_sub(digit)
        } else {
            value.saturating_add(digit)
        };
    }
    value
}

/// Longest floating point prefix of a string, 0.0 when there is none.
pub fn parse_leading_float(text: &str) -> f64 {
    let s = text.trim();
    if s.eq_ignore_ascii_case("nan") {
        return f64::NAN;
    }
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return 0.0;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}
