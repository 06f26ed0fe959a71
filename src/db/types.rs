//! Canonical type taxonomy and the per-connection type registry.
//!
//! Every backend names its column types differently: PostgreSQL hands out type OIDs,
//! CozoDB declares column types as spec strings such as `[Float]`. The registry maps those
//! native identifiers onto one closed set of [`TypeCategory`] values together with the
//! storage width and array flag the decode engine needs to pick a decode path.
//!
//! A registry is built once per connection and never mutated afterwards, so it is shared
//! between cursors as `Arc<TypeRegistry>`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::backend::{Backend, Connection};
use super::DbError;

/// Canonical semantic class of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    String,
    Integer,
    Float,
    Boolean,
    Blob,
    Timestamp,
    GeoPoint,
    GeoLseg,
    GeoPath,
    GeoBox,
    GeoPolygon,
    GeoLine,
    GeoCircle,
    GeoGeometry,
    SequenceType,
    InOutType,
    ProcessStatus,
    Matrix,
    IntervalEvent,
    ProcessState,
    RefType,
    RefClass,
    /// Result of a registry miss; cannot be decoded.
    Unknown,
}

impl TypeCategory {
    pub const ALL: [TypeCategory; 23] = [
        TypeCategory::String,
        TypeCategory::Integer,
        TypeCategory::Float,
        TypeCategory::Boolean,
        TypeCategory::Blob,
        TypeCategory::Timestamp,
        TypeCategory::GeoPoint,
        TypeCategory::GeoLseg,
        TypeCategory::GeoPath,
        TypeCategory::GeoBox,
        TypeCategory::GeoPolygon,
        TypeCategory::GeoLine,
        TypeCategory::GeoCircle,
        TypeCategory::GeoGeometry,
        TypeCategory::SequenceType,
        TypeCategory::InOutType,
        TypeCategory::ProcessStatus,
        TypeCategory::Matrix,
        TypeCategory::IntervalEvent,
        TypeCategory::ProcessState,
        TypeCategory::RefType,
        TypeCategory::RefClass,
        TypeCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCategory::String => "string",
            TypeCategory::Integer => "integer",
            TypeCategory::Float => "float",
            TypeCategory::Boolean => "boolean",
            TypeCategory::Blob => "blob",
            TypeCategory::Timestamp => "timestamp",
            TypeCategory::GeoPoint => "geo_point",
            TypeCategory::GeoLseg => "geo_lseg",
            TypeCategory::GeoPath => "geo_path",
            TypeCategory::GeoBox => "geo_box",
            TypeCategory::GeoPolygon => "geo_polygon",
            TypeCategory::GeoLine => "geo_line",
            TypeCategory::GeoCircle => "geo_circle",
            TypeCategory::GeoGeometry => "geo_geometry",
            TypeCategory::SequenceType => "sequence_type",
            TypeCategory::InOutType => "in_out_type",
            TypeCategory::ProcessStatus => "process_status",
            TypeCategory::Matrix => "matrix",
            TypeCategory::IntervalEvent => "interval_event",
            TypeCategory::ProcessState => "process_state",
            TypeCategory::RefType => "reference_type",
            TypeCategory::RefClass => "reference_class",
            TypeCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown type category: {}", s))
    }
}

/// Byte width of a numeric storage representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StorageWidth {
    Two,
    Four,
    Eight,
    /// Arbitrary precision numeric, decoded through its text form.
    Variable,
}

impl StorageWidth {
    /// Map a catalog type length (PostgreSQL `typlen` convention) to a width.
    pub fn from_len(len: i16) -> Option<Self> {
        match len {
            2 => Some(StorageWidth::Two),
            4 => Some(StorageWidth::Four),
            8 => Some(StorageWidth::Eight),
            -1 => Some(StorageWidth::Variable),
            _ => None,
        }
    }

    pub fn as_len(&self) -> i16 {
        match self {
            StorageWidth::Two => 2,
            StorageWidth::Four => 4,
            StorageWidth::Eight => 8,
            StorageWidth::Variable => -1,
        }
    }
}

/// Resolved description of one native column type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptor {
    pub category: TypeCategory,
    /// Only meaningful for fixed-width numerics and `numeric`.
    pub width: Option<StorageWidth>,
    pub is_array: bool,
    /// Display name of the native type (e.g. `int4`, `float8[]`, `(Int,[Int],Bytes)`).
    pub name: String,
}

static UNKNOWN_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    category: TypeCategory::Unknown,
    width: None,
    is_array: false,
    name: String::new(),
};

impl TypeDescriptor {
    pub fn new(category: TypeCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            width: None,
            is_array: false,
            name: name.into(),
        }
    }

    pub fn with_width(mut self, width: StorageWidth) -> Self {
        self.width = Some(width);
        self
    }

    /// Descriptor of an array whose elements are described by `self`.
    pub fn array_of(&self, name: impl Into<String>) -> Self {
        Self {
            category: self.category,
            width: self.width,
            is_array: true,
            name: name.into(),
        }
    }

    pub fn unknown() -> Self {
        UNKNOWN_DESCRIPTOR.clone()
    }

    pub fn is_unknown(&self) -> bool {
        self.category == TypeCategory::Unknown
    }
}

/// Backend-native type identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeTypeId {
    /// PostgreSQL type OID.
    Oid(u32),
    /// CozoDB normalized column type spec.
    Spec(String),
}

impl fmt::Display for NativeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeTypeId::Oid(oid) => write!(f, "{}", oid),
            NativeTypeId::Spec(spec) => f.write_str(spec),
        }
    }
}

impl From<u32> for NativeTypeId {
    fn from(oid: u32) -> Self {
        NativeTypeId::Oid(oid)
    }
}

impl From<&str> for NativeTypeId {
    fn from(spec: &str) -> Self {
        NativeTypeId::Spec(spec.to_string())
    }
}

/// Immutable map from native type id to [`TypeDescriptor`].
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    backend: Backend,
    entries: BTreeMap<NativeTypeId, TypeDescriptor>,
}

impl TypeRegistry {
    /// Build the registry for a live connection. PostgreSQL reads its type catalog; CozoDB
    /// uses the fixed table of decodable specs.
    pub fn build(connection: &mut Connection) -> Result<Self, DbError> {
        let registry = match connection {
            Connection::Postgres(conn) => super::postgres::build_registry(conn)?,
            Connection::Cozo(_) => super::cozo::types::builtin_registry(),
        };
        tracing::debug!(
            backend = %registry.backend,
            types = registry.len(),
            "type registry built"
        );
        Ok(registry)
    }

    pub fn from_entries(
        backend: Backend,
        entries: impl IntoIterator<Item = (NativeTypeId, TypeDescriptor)>,
    ) -> Self {
        Self {
            backend,
            entries: entries.into_iter().collect(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Resolve a native type id. A miss yields the unknown descriptor, never an error.
    pub fn lookup(&self, id: &NativeTypeId) -> &TypeDescriptor {
        self.entries.get(id).unwrap_or(&UNKNOWN_DESCRIPTOR)
    }

    /// Like [`lookup`](Self::lookup), treating a missing id as a miss.
    pub fn describe(&self, id: Option<&NativeTypeId>) -> &TypeDescriptor {
        id.map_or(&UNKNOWN_DESCRIPTOR, |id| self.lookup(id))
    }

    pub fn contains(&self, id: &NativeTypeId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by native id.
    pub fn iter(&self) -> impl Iterator<Item = (&NativeTypeId, &TypeDescriptor)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_registry() -> TypeRegistry {
        TypeRegistry::from_entries(
            Backend::Postgres,
            [
                (
                    NativeTypeId::Oid(23),
                    TypeDescriptor::new(TypeCategory::Integer, "int4").with_width(StorageWidth::Four),
                ),
                (
                    NativeTypeId::Oid(1021),
                    TypeDescriptor::new(TypeCategory::Float, "float4")
                        .with_width(StorageWidth::Four)
                        .array_of("float4[]"),
                ),
            ],
        )
    }

    #[test]
    fn test_lookup_hit() {
        let registry = sample_registry();
        let desc = registry.lookup(&NativeTypeId::Oid(23));
        assert_eq!(desc.category, TypeCategory::Integer);
        assert_eq!(desc.width, Some(StorageWidth::Four));
        assert!(!desc.is_array);
        assert_eq!(desc.name, "int4");
    }

    #[test]
    fn test_lookup_miss_is_unknown() {
        let registry = sample_registry();
        let desc = registry.lookup(&NativeTypeId::Oid(999_999));
        assert!(desc.is_unknown());
        assert_eq!(desc.name, "");
        assert_eq!(desc.width, None);
    }

    #[test]
    fn test_lookup_miss_other_id_kind() {
        let registry = sample_registry();
        assert!(registry.lookup(&NativeTypeId::from("Int")).is_unknown());
    }

    #[test]
    fn test_array_of_keeps_category_and_width() {
        let registry = sample_registry();
        let desc = registry.lookup(&NativeTypeId::Oid(1021));
        assert_eq!(desc.category, TypeCategory::Float);
        assert_eq!(desc.width, Some(StorageWidth::Four));
        assert!(desc.is_array);
    }

    #[test]
    fn test_iter_is_ordered() {
        let registry = sample_registry();
        let ids: Vec<_> = registry.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, vec![NativeTypeId::Oid(23), NativeTypeId::Oid(1021)]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.backend(), Backend::Postgres);
    }

    #[rstest]
    #[case(2, Some(StorageWidth::Two))]
    #[case(4, Some(StorageWidth::Four))]
    #[case(8, Some(StorageWidth::Eight))]
    #[case(-1, Some(StorageWidth::Variable))]
    #[case(1, None)]
    #[case(16, None)]
    fn test_width_from_len(#[case] len: i16, #[case] expected: Option<StorageWidth>) {
        assert_eq!(StorageWidth::from_len(len), expected);
    }

    #[test]
    fn test_category_names_round_trip() {
        for category in TypeCategory::ALL {
            assert_eq!(category.as_str().parse::<TypeCategory>(), Ok(category));
        }
    }

    #[test]
    fn test_category_parse_rejects_garbage() {
        assert!("not_a_category".parse::<TypeCategory>().is_err());
    }
}
