//! [`WireCell`] over CozoDB values.
//!
//! CozoDB has no fixed-width numerics: every integer is an `i64` and every float an `f64`.
//! Narrower integer tags are range checked, and composites are stored as lists whose
//! elements follow the record layout.

use chrono::{DateTime, NaiveDateTime};
use cozo::{DataValue, JsonData, Num, UuidWrapper};

use crate::db::composite::{GeoBox, GeoPoint};
use crate::db::value::{DecodeError, RecordKind, Scalar, WireCell, WireTag};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Borrowed view of one CozoDB value.
#[derive(Debug, Clone, Copy)]
pub struct CozoCell<'a>(pub &'a DataValue);

/// Short label of a value's variant, for mismatch messages.
pub(crate) fn value_kind(value: &DataValue) -> &'static str {
    match value {
        DataValue::Null => "null",
        DataValue::Bool(_) => "bool",
        DataValue::Num(Num::Int(_)) => "int",
        DataValue::Num(Num::Float(_)) => "float",
        DataValue::Str(_) => "string",
        DataValue::Bytes(_) => "bytes",
        DataValue::Uuid(_) => "uuid",
        DataValue::List(_) => "list",
        DataValue::Json(_) => "json",
        _ => "value",
    }
}

fn as_f64(num: &Num) -> f64 {
    match num {
        Num::Int(i) => *i as f64,
        Num::Float(f) => *f,
    }
}

fn num_text(num: &Num) -> String {
    match num {
        Num::Int(i) => i.to_string(),
        Num::Float(f) => f.to_string(),
    }
}

impl<'a> CozoCell<'a> {
    fn mismatch(&self, tag: WireTag) -> DecodeError {
        DecodeError::TypeMismatch {
            expected: tag,
            found: value_kind(self.0).to_string(),
        }
    }

    fn int(&self, tag: WireTag) -> Result<i64, DecodeError> {
        let DataValue::Num(Num::Int(value)) = self.0 else {
            return Err(self.mismatch(tag));
        };
        let value = *value;
        let fits = match tag {
            WireTag::Int2 => i16::try_from(value).is_ok(),
            WireTag::Int4 => i32::try_from(value).is_ok(),
            _ => true,
        };
        if fits {
            Ok(value)
        } else {
            Err(DecodeError::OutOfRange { tag })
        }
    }

    fn coords<const N: usize>(&self, tag: WireTag) -> Result<[f64; N], DecodeError> {
        let DataValue::List(items) = self.0 else {
            return Err(self.mismatch(tag));
        };
        if items.len() != N {
            return Err(DecodeError::Malformed {
                tag,
                message: format!("expected {} coordinates, found {}", N, items.len()),
            });
        }
        let mut coords = [0.0; N];
        for (slot, item) in coords.iter_mut().zip(items) {
            match item {
                DataValue::Num(num) => *slot = as_f64(num),
                _ => return Err(self.mismatch(tag)),
            }
        }
        Ok(coords)
    }

    fn text(&self) -> Result<String, DecodeError> {
        match self.0 {
            DataValue::Str(s) => Ok(s.to_string()),
            DataValue::Num(num) => Ok(num_text(num)),
            DataValue::Bool(b) => Ok(b.to_string()),
            DataValue::Uuid(UuidWrapper(uuid)) => Ok(uuid.to_string()),
            DataValue::Json(JsonData(json)) => Ok(json.to_string()),
            _ => Err(self.mismatch(WireTag::Text)),
        }
    }

    fn timestamp(&self) -> Result<NaiveDateTime, DecodeError> {
        let tag = WireTag::Timestamp;
        let out_of_range = || DecodeError::OutOfRange { tag };
        match self.0 {
            DataValue::Num(Num::Int(secs)) => DateTime::from_timestamp(*secs, 0)
                .map(|ts| ts.naive_utc())
                .ok_or_else(out_of_range),
            DataValue::Num(Num::Float(secs)) => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                DateTime::from_timestamp(whole as i64, nanos)
                    .map(|ts| ts.naive_utc())
                    .ok_or_else(out_of_range)
            }
            DataValue::Str(s) => DateTime::parse_from_rfc3339(s)
                .map(|ts| ts.naive_utc())
                .or_else(|_| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT))
                .map_err(|e| DecodeError::Malformed {
                    tag,
                    message: e.to_string(),
                }),
            _ => Err(self.mismatch(tag)),
        }
    }
}

impl WireCell for CozoCell<'_> {
    fn is_null(&self) -> bool {
        matches!(self.0, DataValue::Null)
    }

    fn scalar(&self, tag: WireTag) -> Result<Scalar, DecodeError> {
        if self.is_null() {
            return Ok(Scalar::zero(tag));
        }
        match tag {
            WireTag::Int2 | WireTag::Int4 | WireTag::Int8 => self.int(tag).map(Scalar::Int),
            WireTag::Float4 | WireTag::Float8 => match self.0 {
                DataValue::Num(num) => Ok(Scalar::Float(as_f64(num))),
                _ => Err(self.mismatch(tag)),
            },
            WireTag::Numeric => match self.0 {
                DataValue::Num(num) => Ok(Scalar::Numeric(num_text(num))),
                DataValue::Str(s) => Ok(Scalar::Numeric(s.to_string())),
                _ => Err(self.mismatch(tag)),
            },
            WireTag::Text => self.text().map(Scalar::Text),
            WireTag::Char => match self.0 {
                DataValue::Str(s) => s.chars().next().map(Scalar::Char).ok_or_else(|| self.mismatch(tag)),
                _ => Err(self.mismatch(tag)),
            },
            WireTag::Bool => match self.0 {
                DataValue::Bool(b) => Ok(Scalar::Bool(*b)),
                _ => Err(self.mismatch(tag)),
            },
            WireTag::Bytea => match self.0 {
                DataValue::Bytes(bytes) => Ok(Scalar::Bytes(bytes.clone())),
                _ => Err(self.mismatch(tag)),
            },
            WireTag::Point => {
                let [x, y] = self.coords(tag)?;
                Ok(Scalar::Point(GeoPoint::new(x, y)))
            }
            WireTag::Box => self.coords(tag).map(|c| Scalar::Box(GeoBox::from_coords(c))),
            WireTag::Timestamp => self.timestamp().map(Scalar::Timestamp),
        }
    }

    fn elements(&self, tag: WireTag) -> Result<Vec<Self>, DecodeError> {
        match self.0 {
            DataValue::Null => Err(DecodeError::Null),
            DataValue::List(items) => Ok(items.iter().map(CozoCell).collect()),
            _ => Err(self.mismatch(tag)),
        }
    }

    fn fields(&self, kind: RecordKind) -> Result<Vec<Self>, DecodeError> {
        let items = match self.0 {
            DataValue::Null => return Err(DecodeError::Null),
            DataValue::List(items) => items,
            _ => return Err(self.mismatch(WireTag::Bytea)),
        };
        let expected = kind.layout().len();
        if items.len() != expected {
            return Err(DecodeError::FieldCount {
                kind,
                expected,
                found: items.len(),
            });
        }
        Ok(items.iter().map(CozoCell).collect())
    }
}
