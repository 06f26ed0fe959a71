//! Type registry construction for PostgreSQL.
//!
//! Types are classified by `typname`. Builtins come from a static table so the registry
//! is usable before the catalog is read; the server's `pg_type` catalog then adds the
//! domain types (`cvmat`, `vtevent`, `pstate`, ...) and their array types.

use std::collections::BTreeMap;

use postgres::{Client, Row};

use super::wire::oid;
use crate::db::DbError;
use crate::db::backend::Backend;
use crate::db::types::{NativeTypeId, StorageWidth, TypeCategory, TypeDescriptor, TypeRegistry};

/// `(oid, typname, typlen, typelem)` rows for the builtin types we classify.
const BUILTIN_TYPES: &[(u32, &str, i16, u32)] = &[
    (oid::BOOL, "bool", 1, 0),
    (oid::BYTEA, "bytea", -1, 0),
    (oid::CHAR, "char", 1, 0),
    (oid::NAME, "name", 64, 0),
    (oid::INT8, "int8", 8, 0),
    (oid::INT2, "int2", 2, 0),
    (oid::INT4, "int4", 4, 0),
    (oid::TEXT, "text", -1, 0),
    (oid::JSON, "json", -1, 0),
    (oid::POINT, "point", 16, 0),
    (oid::LSEG, "lseg", 32, 0),
    (oid::PATH, "path", -1, 0),
    (oid::BOX, "box", 32, 0),
    (oid::POLYGON, "polygon", -1, 0),
    (oid::LINE, "line", 24, 0),
    (oid::FLOAT4, "float4", 4, 0),
    (oid::FLOAT8, "float8", 8, 0),
    (oid::UNKNOWN, "unknown", -2, 0),
    (oid::CIRCLE, "circle", 24, 0),
    (oid::BPCHAR, "bpchar", -1, 0),
    (oid::VARCHAR, "varchar", -1, 0),
    (oid::TIMESTAMP, "timestamp", 8, 0),
    (oid::TIMESTAMPTZ, "timestamptz", 8, 0),
    (oid::NUMERIC, "numeric", -1, 0),
    (oid::REGCLASS, "regclass", 4, 0),
    (oid::REGTYPE, "regtype", 4, 0),
    (oid::BOOL_ARRAY, "_bool", -1, oid::BOOL),
    (oid::INT2_ARRAY, "_int2", -1, oid::INT2),
    (oid::INT4_ARRAY, "_int4", -1, oid::INT4),
    (oid::TEXT_ARRAY, "_text", -1, oid::TEXT),
    (oid::INT8_ARRAY, "_int8", -1, oid::INT8),
    (oid::POINT_ARRAY, "_point", -1, oid::POINT),
    (oid::FLOAT4_ARRAY, "_float4", -1, oid::FLOAT4),
    (oid::FLOAT8_ARRAY, "_float8", -1, oid::FLOAT8),
    (oid::NUMERIC_ARRAY, "_numeric", -1, oid::NUMERIC),
];

const CATALOG_QUERY: &str = "SELECT oid, typname, typlen, typelem FROM pg_catalog.pg_type";

/// Category of a (non-array) type name, if it is one we know how to decode.
pub fn classify(typname: &str) -> Option<TypeCategory> {
    let category = match typname {
        "text" | "varchar" | "bpchar" | "name" | "char" | "unknown" | "json" => TypeCategory::String,
        "int2" | "int4" | "int8" => TypeCategory::Integer,
        "float4" | "float8" | "numeric" => TypeCategory::Float,
        "bool" => TypeCategory::Boolean,
        "bytea" => TypeCategory::Blob,
        "timestamp" | "timestamptz" => TypeCategory::Timestamp,
        "point" => TypeCategory::GeoPoint,
        "lseg" => TypeCategory::GeoLseg,
        "path" => TypeCategory::GeoPath,
        "box" => TypeCategory::GeoBox,
        "polygon" => TypeCategory::GeoPolygon,
        "line" => TypeCategory::GeoLine,
        "circle" => TypeCategory::GeoCircle,
        "geometry" => TypeCategory::GeoGeometry,
        "seqtype" => TypeCategory::SequenceType,
        "inouttype" => TypeCategory::InOutType,
        "pstatus" => TypeCategory::ProcessStatus,
        "cvmat" => TypeCategory::Matrix,
        "vtevent" => TypeCategory::IntervalEvent,
        "pstate" => TypeCategory::ProcessState,
        "regtype" => TypeCategory::RefType,
        "regclass" => TypeCategory::RefClass,
        _ => return None,
    };
    Some(category)
}

fn describe(typname: &str, typlen: i16) -> Option<TypeDescriptor> {
    let category = classify(typname)?;
    let desc = TypeDescriptor::new(category, typname);
    Some(match category {
        TypeCategory::Integer | TypeCategory::Float => match StorageWidth::from_len(typlen) {
            Some(width) => desc.with_width(width),
            None => desc,
        },
        _ => desc,
    })
}

/// Classify catalog rows: scalars first, then arrays whose element type is known.
pub fn classify_rows<'a>(
    rows: impl IntoIterator<Item = (u32, &'a str, i16, u32)>,
) -> BTreeMap<NativeTypeId, TypeDescriptor> {
    let rows: Vec<_> = rows.into_iter().collect();
    let mut scalars: BTreeMap<u32, TypeDescriptor> = BTreeMap::new();
    for (type_oid, typname, typlen, typelem) in &rows {
        if *typelem == 0 || !typname.starts_with('_') {
            if let Some(desc) = describe(typname, *typlen) {
                scalars.insert(*type_oid, desc);
            }
        }
    }

    let mut entries: BTreeMap<NativeTypeId, TypeDescriptor> = BTreeMap::new();
    for (type_oid, typname, _, typelem) in &rows {
        if *typelem != 0 && typname.starts_with('_') {
            if let Some(element) = scalars.get(typelem) {
                let name = format!("{}[]", element.name);
                entries.insert(NativeTypeId::Oid(*type_oid), element.array_of(name));
            }
        }
    }
    entries.extend(
        scalars
            .into_iter()
            .map(|(type_oid, desc)| (NativeTypeId::Oid(type_oid), desc)),
    );
    entries
}

/// Registry of the builtin types only, without reading the server catalog.
pub fn builtin_registry() -> TypeRegistry {
    TypeRegistry::from_entries(Backend::Postgres, classify_rows(BUILTIN_TYPES.iter().copied()))
}

fn catalog_row(row: &Row) -> Result<(u32, String, i16, u32), postgres::Error> {
    Ok((row.try_get(0)?, row.try_get(1)?, row.try_get(2)?, row.try_get(3)?))
}

/// Read `pg_type` and merge it over the builtin table.
pub fn load_registry(client: &mut Client) -> Result<TypeRegistry, DbError> {
    let rows = client
        .query(CATALOG_QUERY, &[])
        .map_err(|e| DbError::RegistryBuild {
            message: e.to_string(),
        })?;

    let catalog = rows
        .iter()
        .map(catalog_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DbError::RegistryBuild {
            message: e.to_string(),
        })?;

    let merged = BUILTIN_TYPES.iter().copied().chain(
        catalog
            .iter()
            .map(|(type_oid, typname, typlen, typelem)| (*type_oid, typname.as_str(), *typlen, *typelem)),
    );
    Ok(TypeRegistry::from_entries(Backend::Postgres, classify_rows(merged)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(oid::INT2, TypeCategory::Integer, Some(StorageWidth::Two))]
    #[case(oid::INT4, TypeCategory::Integer, Some(StorageWidth::Four))]
    #[case(oid::INT8, TypeCategory::Integer, Some(StorageWidth::Eight))]
    #[case(oid::FLOAT4, TypeCategory::Float, Some(StorageWidth::Four))]
    #[case(oid::FLOAT8, TypeCategory::Float, Some(StorageWidth::Eight))]
    #[case(oid::NUMERIC, TypeCategory::Float, Some(StorageWidth::Variable))]
    #[case(oid::TEXT, TypeCategory::String, None)]
    #[case(oid::BOX, TypeCategory::GeoBox, None)]
    #[case(oid::REGCLASS, TypeCategory::RefClass, None)]
    fn test_builtin_classification(
        #[case] type_oid: u32,
        #[case] category: TypeCategory,
        #[case] width: Option<StorageWidth>,
    ) {
        let registry = builtin_registry();
        let desc = registry.lookup(&NativeTypeId::Oid(type_oid));
        assert_eq!(desc.category, category);
        assert_eq!(desc.width, width);
        assert!(!desc.is_array);
    }

    #[test]
    fn test_builtin_arrays_inherit_element() {
        let registry = builtin_registry();
        let desc = registry.lookup(&NativeTypeId::Oid(oid::FLOAT8_ARRAY));
        assert_eq!(desc.category, TypeCategory::Float);
        assert_eq!(desc.width, Some(StorageWidth::Eight));
        assert!(desc.is_array);
        assert_eq!(desc.name, "float8[]");
    }

    #[test]
    fn test_domain_types_from_catalog_rows() {
        let rows = [
            (40_001, "cvmat", -1, 0),
            (40_002, "_cvmat", -1, 40_001),
            (40_003, "pstatus", 4, 0),
            (40_004, "vtevent", -1, 0),
            (40_005, "pstate", -1, 0),
            (40_006, "somethingelse", -1, 0),
        ];
        let entries = classify_rows(rows);
        assert_eq!(entries[&NativeTypeId::Oid(40_001)].category, TypeCategory::Matrix);
        assert!(entries[&NativeTypeId::Oid(40_002)].is_array);
        assert_eq!(entries[&NativeTypeId::Oid(40_003)].category, TypeCategory::ProcessStatus);
        assert_eq!(entries[&NativeTypeId::Oid(40_004)].category, TypeCategory::IntervalEvent);
        assert_eq!(entries[&NativeTypeId::Oid(40_005)].category, TypeCategory::ProcessState);
        assert!(!entries.contains_key(&NativeTypeId::Oid(40_006)));
    }

    #[test]
    fn test_unknown_oid_is_a_miss() {
        assert!(builtin_registry().lookup(&NativeTypeId::Oid(3_999_999)).is_unknown());
    }
}
