//! PostgreSQL binary wire format.
//!
//! Result cells are captured as raw binary values together with their type OID. Primitive
//! types go through `postgres::types::FromSql`; numeric, geometric, array and record values
//! are unpacked here by hand.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, Utc};
use postgres::types::{FromSql, Type};

use crate::db::composite::{GeoBox, GeoPoint};
use crate::db::value::{DecodeError, RecordKind, Scalar, WireCell, WireTag};

/// Builtin type OIDs used by the decoder.
pub mod oid {
    pub const BOOL: u32 = 16;
    pub const BYTEA: u32 = 17;
    pub const CHAR: u32 = 18;
    pub const NAME: u32 = 19;
    pub const INT8: u32 = 20;
    pub const INT2: u32 = 21;
    pub const INT4: u32 = 23;
    pub const TEXT: u32 = 25;
    pub const JSON: u32 = 114;
    pub const POINT: u32 = 600;
    pub const LSEG: u32 = 601;
    pub const PATH: u32 = 602;
    pub const BOX: u32 = 603;
    pub const POLYGON: u32 = 604;
    pub const LINE: u32 = 628;
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;
    pub const UNKNOWN: u32 = 705;
    pub const CIRCLE: u32 = 718;
    pub const BPCHAR: u32 = 1042;
    pub const VARCHAR: u32 = 1043;
    pub const TIMESTAMP: u32 = 1114;
    pub const TIMESTAMPTZ: u32 = 1184;
    pub const NUMERIC: u32 = 1700;
    pub const REGCLASS: u32 = 2205;
    pub const REGTYPE: u32 = 2206;
    pub const RECORD: u32 = 2249;

    pub const BOOL_ARRAY: u32 = 1000;
    pub const INT2_ARRAY: u32 = 1005;
    pub const INT4_ARRAY: u32 = 1007;
    pub const TEXT_ARRAY: u32 = 1009;
    pub const INT8_ARRAY: u32 = 1016;
    pub const POINT_ARRAY: u32 = 1017;
    pub const FLOAT4_ARRAY: u32 = 1021;
    pub const FLOAT8_ARRAY: u32 = 1022;
    pub const NUMERIC_ARRAY: u32 = 1231;
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Big-endian cursor over one binary value.
pub(crate) struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
    tag: WireTag,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(data: &'a [u8], tag: WireTag) -> Self {
        Self { data, pos: 0, tag }
    }

    fn truncated(&self) -> DecodeError {
        DecodeError::Malformed {
            tag: self.tag,
            message: format!("unexpected end of value at byte {}", self.pos),
        }
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or_else(|| self.truncated())?;
        if end > self.data.len() {
            return Err(self.truncated());
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N)?;
        bytes.try_into().map_err(|_| self.truncated())
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Length-prefixed value; `-1` encodes NULL.
    pub(crate) fn read_value(&mut self) -> Result<Option<&'a [u8]>, DecodeError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        self.read_bytes(len as usize).map(Some)
    }
}

/// Decode the binary `numeric` format into its exact decimal text.
pub fn numeric_text(raw: &[u8]) -> Result<String, DecodeError> {
    let mut reader = WireReader::new(raw, WireTag::Numeric);
    let ndigits = reader.read_i16()?.max(0) as usize;
    let weight = i32::from(reader.read_i16()?);
    let sign = reader.read_u16()?;
    let dscale = usize::from(reader.read_u16()?);
    let mut digits = Vec::with_capacity(ndigits);
    for _ in 0..ndigits {
        digits.push(reader.read_i16()?);
    }

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let digit_at = |i: i32| -> i16 {
        if i < 0 {
            0
        } else {
            digits.get(i as usize).copied().unwrap_or(0)
        }
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=weight {
            if i == 0 {
                let _ = write!(out, "{}", digit_at(i));
            } else {
                let _ = write!(out, "{:04}", digit_at(i));
            }
        }
    }
    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut i = weight + 1;
        while frac.len() < dscale {
            let _ = write!(frac, "{:04}", digit_at(i));
            i += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }
    Ok(out)
}

fn decode_point(reader: &mut WireReader<'_>) -> Result<GeoPoint, DecodeError> {
    Ok(GeoPoint::new(reader.read_f64()?, reader.read_f64()?))
}

/// One element or column value plus the OID describing it.
#[derive(Debug, Clone, Copy)]
pub struct PgCell<'a> {
    pub oid: u32,
    pub raw: Option<&'a [u8]>,
}

impl<'a> PgCell<'a> {
    pub fn new(oid: u32, raw: Option<&'a [u8]>) -> Self {
        Self { oid, raw }
    }

    fn mismatch(&self, tag: WireTag) -> DecodeError {
        DecodeError::TypeMismatch {
            expected: tag,
            found: type_label(self.oid),
        }
    }

    fn read_sql<'b, T: FromSql<'b>>(ty: &Type, raw: &'b [u8], tag: WireTag) -> Result<T, DecodeError> {
        T::from_sql(ty, raw).map_err(|e| DecodeError::Malformed {
            tag,
            message: e.to_string(),
        })
    }

    fn int(&self, raw: &[u8], tag: WireTag) -> Result<i64, DecodeError> {
        match (tag, self.oid) {
            (WireTag::Int2, oid::INT2) => Ok(i64::from(Self::read_sql::<i16>(&Type::INT2, raw, tag)?)),
            (WireTag::Int4, oid::INT4) => Ok(i64::from(Self::read_sql::<i32>(&Type::INT4, raw, tag)?)),
            (WireTag::Int8, oid::INT8) => Self::read_sql::<i64>(&Type::INT8, raw, tag),
            _ => Err(self.mismatch(tag)),
        }
    }

    fn float(&self, raw: &[u8], tag: WireTag) -> Result<f64, DecodeError> {
        match (tag, self.oid) {
            (WireTag::Float4, oid::FLOAT4) => Ok(f64::from(Self::read_sql::<f32>(&Type::FLOAT4, raw, tag)?)),
            (WireTag::Float8, oid::FLOAT8) => Self::read_sql::<f64>(&Type::FLOAT8, raw, tag),
            _ => Err(self.mismatch(tag)),
        }
    }

    fn timestamp(&self, raw: &[u8]) -> Result<NaiveDateTime, DecodeError> {
        match self.oid {
            oid::TIMESTAMP => Self::read_sql::<NaiveDateTime>(&Type::TIMESTAMP, raw, WireTag::Timestamp),
            oid::TIMESTAMPTZ => {
                Self::read_sql::<DateTime<Utc>>(&Type::TIMESTAMPTZ, raw, WireTag::Timestamp)
                    .map(|ts| ts.naive_utc())
            }
            _ => Err(self.mismatch(WireTag::Timestamp)),
        }
    }

    /// Text form of any value readable as text: text-like types, enum labels, and the
    /// textual rendering of builtin scalars.
    fn text(&self, raw: &[u8]) -> Result<String, DecodeError> {
        match self.oid {
            oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::NAME | oid::UNKNOWN | oid::JSON => {
                Self::read_sql::<&str>(&Type::TEXT, raw, WireTag::Text).map(str::to_string)
            }
            oid::CHAR => Ok(char::from(Self::read_sql::<i8>(&Type::CHAR, raw, WireTag::Char)? as u8).to_string()),
            oid::INT2 => self.int(raw, WireTag::Int2).map(|v| v.to_string()),
            oid::INT4 => self.int(raw, WireTag::Int4).map(|v| v.to_string()),
            oid::INT8 => self.int(raw, WireTag::Int8).map(|v| v.to_string()),
            oid::FLOAT4 => self.float(raw, WireTag::Float4).map(|v| v.to_string()),
            oid::FLOAT8 => self.float(raw, WireTag::Float8).map(|v| v.to_string()),
            oid::NUMERIC => numeric_text(raw),
            oid::BOOL => Self::read_sql::<bool>(&Type::BOOL, raw, WireTag::Bool).map(|b| b.to_string()),
            oid::TIMESTAMP | oid::TIMESTAMPTZ => self
                .timestamp(raw)
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            // Enum labels of user-defined types travel as plain UTF-8.
            other if Type::from_oid(other).is_none() => {
                Self::read_sql::<&str>(&Type::TEXT, raw, WireTag::Text).map(str::to_string)
            }
            _ => Err(self.mismatch(WireTag::Text)),
        }
    }
}

impl WireCell for PgCell<'_> {
    fn is_null(&self) -> bool {
        self.raw.is_none()
    }

    fn scalar(&self, tag: WireTag) -> Result<Scalar, DecodeError> {
        let Some(raw) = self.raw else {
            return Ok(Scalar::zero(tag));
        };
        match tag {
            WireTag::Int2 | WireTag::Int4 | WireTag::Int8 => self.int(raw, tag).map(Scalar::Int),
            WireTag::Float4 | WireTag::Float8 => self.float(raw, tag).map(Scalar::Float),
            WireTag::Numeric if self.oid == oid::NUMERIC => numeric_text(raw).map(Scalar::Numeric),
            WireTag::Bool if self.oid == oid::BOOL => {
                Self::read_sql::<bool>(&Type::BOOL, raw, tag).map(Scalar::Bool)
            }
            WireTag::Char if self.oid == oid::CHAR => {
                Self::read_sql::<i8>(&Type::CHAR, raw, tag).map(|c| Scalar::Char(char::from(c as u8)))
            }
            WireTag::Char => self
                .text(raw)?
                .chars()
                .next()
                .map(Scalar::Char)
                .ok_or_else(|| self.mismatch(tag)),
            WireTag::Text => self.text(raw).map(Scalar::Text),
            WireTag::Bytea if self.oid == oid::BYTEA => {
                Self::read_sql::<Vec<u8>>(&Type::BYTEA, raw, tag).map(Scalar::Bytes)
            }
            WireTag::Point if self.oid == oid::POINT => {
                decode_point(&mut WireReader::new(raw, tag)).map(Scalar::Point)
            }
            WireTag::Box if self.oid == oid::BOX => {
                let mut reader = WireReader::new(raw, tag);
                let high = decode_point(&mut reader)?;
                let low = decode_point(&mut reader)?;
                Ok(Scalar::Box(GeoBox::new(high, low)))
            }
            WireTag::Timestamp => self.timestamp(raw).map(Scalar::Timestamp),
            _ => Err(self.mismatch(tag)),
        }
    }

    fn elements(&self, tag: WireTag) -> Result<Vec<Self>, DecodeError> {
        let Some(raw) = self.raw else {
            return Err(DecodeError::Null);
        };
        if !is_array_oid(self.oid) {
            return Err(self.mismatch(tag));
        }
        let mut reader = WireReader::new(raw, tag);
        let ndim = reader.read_i32()?;
        let _has_null = reader.read_i32()?;
        let element_oid = reader.read_u32()?;
        if ndim <= 0 {
            return Ok(Vec::new());
        }
        let mut count: usize = 1;
        for _ in 0..ndim {
            let len = reader.read_i32()?.max(0) as usize;
            let _lower_bound = reader.read_i32()?;
            count = count.saturating_mul(len);
        }
        // Every element carries at least its 4-byte length.
        if count > raw.len() / 4 {
            return Err(DecodeError::Malformed {
                tag,
                message: format!("array claims {} elements", count),
            });
        }
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(PgCell::new(element_oid, reader.read_value()?));
        }
        Ok(elements)
    }

    fn fields(&self, kind: RecordKind) -> Result<Vec<Self>, DecodeError> {
        let Some(raw) = self.raw else {
            return Err(DecodeError::Null);
        };
        if Type::from_oid(self.oid).is_some() && self.oid != oid::RECORD {
            return Err(DecodeError::TypeMismatch {
                expected: WireTag::Bytea,
                found: type_label(self.oid),
            });
        }
        let mut reader = WireReader::new(raw, WireTag::Bytea);
        let count = reader.read_i32()?.max(0) as usize;
        let expected = kind.layout().len();
        if count != expected {
            return Err(DecodeError::FieldCount {
                kind,
                expected,
                found: count,
            });
        }
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            let field_oid = reader.read_u32()?;
            fields.push(PgCell::new(field_oid, reader.read_value()?));
        }
        Ok(fields)
    }
}

/// Whether an OID names a builtin array type, or an array of a user-defined type.
fn is_array_oid(type_oid: u32) -> bool {
    match Type::from_oid(type_oid) {
        Some(ty) => matches!(ty.kind(), postgres::types::Kind::Array(_)),
        None => true,
    }
}

fn type_label(type_oid: u32) -> String {
    Type::from_oid(type_oid)
        .map(|ty| ty.name().to_string())
        .unwrap_or_else(|| format!("oid {}", type_oid))
}
