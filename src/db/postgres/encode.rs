//! Binary parameter encoding for PostgreSQL.
//!
//! Composite values are written in the binary `record` format: a field count followed by
//! `(oid, length, bytes)` per field. Field types are taken from the target composite when
//! the server describes one, so `float4` and `float8` declarations both round trip.

use std::error::Error;

use bytes::{BufMut, BytesMut};
use postgres::types::{to_sql_checked, IsNull, Kind, ToSql, Type};

use crate::db::composite::{GeoBox, GeoPoint, IntervalEvent, Matrix, ProcessState};
use crate::db::params::ValueType;

type BoxError = Box<dyn Error + Sync + Send>;

/// Field types of the target composite, or `defaults` when the server sent an anonymous
/// record or a composite of a different shape.
fn field_types(ty: &Type, defaults: &[Type]) -> Vec<Type> {
    match ty.kind() {
        Kind::Composite(fields) if fields.len() == defaults.len() => {
            fields.iter().map(|f| f.type_().clone()).collect()
        }
        _ => defaults.to_vec(),
    }
}

/// Write one record field, patching its length once the value is written.
fn write_field<F>(out: &mut BytesMut, ty: &Type, write: F) -> Result<(), BoxError>
where
    F: FnOnce(&Type, &mut BytesMut) -> Result<IsNull, BoxError>,
{
    out.put_u32(ty.oid());
    let base = out.len();
    out.put_i32(0);
    let len = match write(ty, out)? {
        IsNull::No => i32::try_from(out.len() - base - 4)?,
        IsNull::Yes => -1,
    };
    out[base..base + 4].copy_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_int(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        _ => Err(format!("cannot encode an integer as {}", ty).into()),
    }
}

fn write_float(value: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => value.to_sql(ty, out),
        _ => Err(format!("cannot encode a float as {}", ty).into()),
    }
}

fn accepts_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    ) || matches!(ty.kind(), Kind::Enum(_))
}

/// Text and enum labels share the same binary form.
fn write_text(value: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !accepts_text(ty) {
        return Err(format!("cannot encode a string as {}", ty).into());
    }
    out.put_slice(value.as_bytes());
    Ok(IsNull::No)
}

fn write_point(point: &GeoPoint, out: &mut BytesMut) {
    out.put_f64(point.x);
    out.put_f64(point.y);
}

fn write_box(region: &GeoBox, out: &mut BytesMut) {
    write_point(&region.high, out);
    write_point(&region.low, out);
}

fn is_record(ty: &Type, name: &str) -> bool {
    ty.name() == name || *ty == Type::RECORD
}

impl ToSql for GeoPoint {
    fn to_sql(&self, _: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        write_point(self, out);
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::POINT
    }

    to_sql_checked!();
}

impl ToSql for GeoBox {
    fn to_sql(&self, _: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        write_box(self, out);
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::BOX
    }

    to_sql_checked!();
}

impl ToSql for Matrix {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let types = field_types(ty, &[Type::INT4, Type::INT4_ARRAY, Type::BYTEA]);
        out.put_i32(3);
        write_field(out, &types[0], |t, b| write_int(i64::from(self.element_type), t, b))?;
        write_field(out, &types[1], |t, b| match *t {
            Type::INT2_ARRAY => self
                .dims
                .iter()
                .map(|&d| i16::try_from(d))
                .collect::<Result<Vec<_>, _>>()?
                .to_sql(t, b),
            Type::INT8_ARRAY => self
                .dims
                .iter()
                .map(|&d| i64::from(d))
                .collect::<Vec<_>>()
                .to_sql(t, b),
            _ => self.dims.to_sql(&Type::INT4_ARRAY, b),
        })?;
        write_field(out, &types[2], |t, b| self.data.as_slice().to_sql(t, b))?;
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        is_record(ty, "cvmat")
    }

    to_sql_checked!();
}

impl ToSql for IntervalEvent {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let types = field_types(
            ty,
            &[
                Type::INT4,
                Type::INT4,
                Type::BOOL,
                Type::BOX,
                Type::FLOAT8,
                Type::BYTEA,
            ],
        );
        out.put_i32(6);
        write_field(out, &types[0], |t, b| write_int(i64::from(self.group_id), t, b))?;
        write_field(out, &types[1], |t, b| write_int(i64::from(self.class_id), t, b))?;
        write_field(out, &types[2], |t, b| self.is_root.to_sql(t, b))?;
        write_field(out, &types[3], |_, b| {
            write_box(&self.region, b);
            Ok(IsNull::No)
        })?;
        write_field(out, &types[4], |t, b| write_float(self.score, t, b))?;
        write_field(out, &types[5], |t, b| self.user_data.as_slice().to_sql(t, b))?;
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        is_record(ty, "vtevent")
    }

    to_sql_checked!();
}

impl ToSql for ProcessState {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let types = field_types(ty, &[Type::TEXT, Type::FLOAT4, Type::TEXT, Type::TEXT]);
        out.put_i32(4);
        write_field(out, &types[0], |t, b| write_text(self.status.as_str(), t, b))?;
        write_field(out, &types[1], |t, b| write_float(f64::from(self.progress), t, b))?;
        write_field(out, &types[2], |t, b| write_text(&self.current_item, t, b))?;
        write_field(out, &types[3], |t, b| write_text(&self.last_error, t, b))?;
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        is_record(ty, "pstate")
    }

    to_sql_checked!();
}

/// Parameters adapt to the type the server inferred for their placeholder.
impl ToSql for ValueType {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            ValueType::Str(s) => write_text(s, ty, out),
            ValueType::Int(v) => write_int(*v, ty, out),
            ValueType::Float(v) => write_float(*v, ty, out),
            ValueType::Bool(v) if *ty == Type::BOOL => v.to_sql(ty, out),
            ValueType::Bool(_) => Err(format!("cannot encode a bool as {}", ty).into()),
            ValueType::StrArray(values) => match ty.kind() {
                Kind::Array(member) if accepts_text(member) => values
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .to_sql(ty, out),
                _ => Err(format!("cannot encode a string list as {}", ty).into()),
            },
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
