//! Output formatting tests for query command.

#[cfg(test)]
mod tests {
    use super::super::execute::QueryResult;
    use crate::db::{Backend, ColumnKey, StorageWidth, TypeCategory, TypeDescriptor};
    use rstest::{fixture, rstest};

    // =========================================================================
    // Expected outputs
    // =========================================================================

    const EMPTY_TABLE: &str = "\
Query (cozo): ?[id] := *clips{id}, id > 10

Columns (1):
  id: Int (integer)

No rows.";

    const CLIPS_TABLE: &str = "\
Query (cozo): ?[id, name] := *clips{id, name}

Columns (2):
  id: Int (integer)
  name: String (string)

id  name
1   intro
2   outro

2 of 3 row(s)";

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn int_key(name: &str) -> ColumnKey {
        ColumnKey::new(
            name,
            &TypeDescriptor::new(TypeCategory::Integer, "Int").with_width(StorageWidth::Eight),
        )
    }

    #[fixture]
    fn empty_result() -> QueryResult {
        QueryResult {
            script: "?[id] := *clips{id}, id > 10".to_string(),
            backend: Backend::Cozo,
            columns: vec![int_key("id")],
            total_rows: 0,
            rows: vec![],
        }
    }

    #[fixture]
    fn clips_result() -> QueryResult {
        QueryResult {
            script: "?[id, name] := *clips{id, name}".to_string(),
            backend: Backend::Cozo,
            columns: vec![
                int_key("id"),
                ColumnKey::new("name", &TypeDescriptor::new(TypeCategory::String, "String")),
            ],
            total_rows: 3,
            rows: vec![
                vec!["1".to_string(), "intro".to_string()],
                vec!["2".to_string(), "outro".to_string()],
            ],
        }
    }

    #[fixture]
    fn unresolved_result() -> QueryResult {
        QueryResult {
            script: "SELECT x FROM t".to_string(),
            backend: Backend::Postgres,
            columns: vec![ColumnKey::new("x", &TypeDescriptor::unknown())],
            total_rows: 0,
            rows: vec![],
        }
    }

    // =========================================================================
    // Tests
    // =========================================================================

    crate::output_table_test! {
        test_name: test_to_table_empty,
        fixture: empty_result,
        fixture_type: QueryResult,
        expected: EMPTY_TABLE,
    }

    crate::output_table_test! {
        test_name: test_to_table_rows,
        fixture: clips_result,
        fixture_type: QueryResult,
        expected: CLIPS_TABLE,
    }

    crate::output_contains_test! {
        test_name: test_to_table_unresolved_type,
        fixture: unresolved_result,
        fixture_type: QueryResult,
        format: Table,
        contains: ["Query (postgres): SELECT x FROM t", "x: ? (unknown)"],
    }

    crate::output_json_test! {
        test_name: test_format_json,
        fixture: clips_result,
        fixture_type: QueryResult,
        assertions: {
            "backend": "cozo",
            "total_rows": 3,
        },
    }

    #[rstest]
    fn test_format_json_columns(clips_result: QueryResult) {
        use crate::output::{OutputFormat, Outputable};
        let parsed: serde_json::Value =
            serde_json::from_str(&clips_result.format(OutputFormat::Json)).unwrap();
        assert_eq!(parsed["columns"][0]["name"], "id");
        assert_eq!(parsed["columns"][0]["length"], 8);
        assert_eq!(parsed["rows"][1][1], "outro");
    }

    crate::output_contains_test! {
        test_name: test_format_toon,
        fixture: clips_result,
        fixture_type: QueryResult,
        format: Toon,
        contains: ["script:", "backend: cozo", "intro"],
    }
}
