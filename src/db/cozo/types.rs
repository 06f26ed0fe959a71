//! Type registry construction for CozoDB.
//!
//! CozoDB columns are declared with type specs such as `Int`, `[Float; 3]?` or
//! `(Int, [Int], Bytes)`. Specs are normalized (whitespace, nullability and fixed vector
//! lengths removed) before they are looked up, so every declaration of the same shape
//! resolves to one registry entry. Cozo has no user-defined types, so the registry is the
//! fixed table of decodable shapes; declared specs are read per query instead.

use std::collections::BTreeMap;

use cozo::DataValue;

use super::cell::value_kind;
use crate::db::backend::Backend;
use crate::db::types::{NativeTypeId, StorageWidth, TypeCategory, TypeDescriptor, TypeRegistry};

/// Spec used when a column's type cannot be inferred.
pub const ANY_SPEC: &str = "Any";

const BUILTIN_SPECS: &[(&str, TypeCategory, Option<StorageWidth>, bool)] = &[
    ("Int", TypeCategory::Integer, Some(StorageWidth::Eight), false),
    ("Float", TypeCategory::Float, Some(StorageWidth::Eight), false),
    ("String", TypeCategory::String, None, false),
    ("Uuid", TypeCategory::String, None, false),
    ("Json", TypeCategory::String, None, false),
    ("Bool", TypeCategory::Boolean, None, false),
    ("Bytes", TypeCategory::Blob, None, false),
    ("[Int]", TypeCategory::Integer, Some(StorageWidth::Eight), true),
    ("[Float]", TypeCategory::Float, Some(StorageWidth::Eight), true),
    ("(Float,Float)", TypeCategory::GeoPoint, None, false),
    ("[(Float,Float)]", TypeCategory::GeoPoint, None, true),
    ("(Float,Float,Float,Float)", TypeCategory::GeoBox, None, false),
    ("(Int,[Int],Bytes)", TypeCategory::Matrix, None, false),
    ("(Int,Int,Bool,[Float],Float,Bytes)", TypeCategory::IntervalEvent, None, false),
    ("(String,Float,String,String)", TypeCategory::ProcessState, None, false),
];

/// Canonical form of a column type spec.
pub fn normalize_spec(spec: &str) -> String {
    let compact: String = spec
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '?')
        .collect();

    // `[T;N]` fixed-length lists read exactly like `[T]`.
    let mut out = String::with_capacity(compact.len());
    let mut skipping = 0usize;
    let mut depth = 0usize;
    let mut list_depths: Vec<usize> = Vec::new();
    for c in compact.chars() {
        match c {
            '[' | '(' => {
                depth += 1;
                if c == '[' {
                    list_depths.push(depth);
                }
            }
            ';' if skipping == 0 && list_depths.last() == Some(&depth) => {
                skipping = depth;
                continue;
            }
            ']' | ')' => {
                if c == ']' && list_depths.last() == Some(&depth) {
                    list_depths.pop();
                }
                if skipping == depth {
                    skipping = 0;
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
        if skipping == 0 {
            out.push(c);
        }
    }
    out
}

/// Descriptor for a spec, or `None` when the shape is not one we decode.
pub fn classify_spec(spec: &str) -> Option<TypeDescriptor> {
    let normalized = normalize_spec(spec);
    BUILTIN_SPECS
        .iter()
        .find(|(name, ..)| *name == normalized)
        .map(|(name, category, width, is_array)| {
            let mut desc = TypeDescriptor::new(*category, *name);
            desc.width = *width;
            desc.is_array = *is_array;
            desc
        })
}

fn builtin_entries() -> BTreeMap<NativeTypeId, TypeDescriptor> {
    BUILTIN_SPECS
        .iter()
        .filter_map(|(name, ..)| Some((NativeTypeId::from(*name), classify_spec(name)?)))
        .collect()
}

/// Registry of the builtin specs only.
pub fn builtin_registry() -> TypeRegistry {
    TypeRegistry::from_entries(Backend::Cozo, builtin_entries())
}

/// Spec of a single value, `None` for NULL and empty lists.
pub fn infer_spec(value: &DataValue) -> Option<String> {
    let spec = match value {
        DataValue::Null => return None,
        DataValue::List(items) if items.is_empty() => return None,
        DataValue::List(items) => infer_list(items),
        other => match value_kind(other) {
            "bool" => "Bool".to_string(),
            "int" => "Int".to_string(),
            "float" => "Float".to_string(),
            "string" => "String".to_string(),
            "bytes" => "Bytes".to_string(),
            "uuid" => "Uuid".to_string(),
            "json" => "Json".to_string(),
            _ => ANY_SPEC.to_string(),
        },
    };
    Some(spec)
}

/// Homogeneous lists are arrays; a mix of ints and floats is a float array; anything
/// else is a tuple.
fn infer_list(items: &[DataValue]) -> String {
    let specs: Vec<String> = items
        .iter()
        .map(|item| infer_spec(item).unwrap_or_else(|| ANY_SPEC.to_string()))
        .collect();
    let first = &specs[0];
    if specs.iter().all(|s| s == first) && first != ANY_SPEC {
        return format!("[{}]", first);
    }
    if specs.iter().all(|s| s == "Int" || s == "Float") {
        return "[Float]".to_string();
    }
    format!("({})", specs.join(","))
}
