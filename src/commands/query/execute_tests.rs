//! Execute tests for query command.

#[cfg(test)]
mod tests {
    use super::super::QueryCmd;
    use crate::commands::Execute;
    use crate::db::{Backend, Session, ValueType};
    use crate::test_utils::clips_session;
    use rstest::{fixture, rstest};

    #[fixture]
    fn session() -> Session {
        clips_session()
    }

    fn cmd(script: &str, limit: u32) -> QueryCmd {
        QueryCmd {
            script: script.to_string(),
            params: vec![],
            limit,
        }
    }

    // =========================================================================
    // Core functionality tests
    // =========================================================================

    #[rstest]
    fn test_query_all_clips(mut session: Session) {
        let result = cmd("?[id, name, score, tags] := *clips{id, name, score, tags}", 100)
            .execute(&mut session)
            .unwrap();
        assert_eq!(result.backend, Backend::Cozo);
        assert_eq!(result.total_rows, 2);
        assert_eq!(
            result.rows,
            vec![
                vec!["1", "intro", "0.5", "1,2"],
                vec!["2", "outro", "1.5", "3"],
            ]
        );
        let names: Vec<_> = result.columns.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "score", "tags"]);
        assert_eq!(result.columns[0].type_name, "Int");
        assert_eq!(result.columns[3].extra, "integer");
    }

    #[rstest]
    fn test_query_limit_caps_printed_rows(mut session: Session) {
        let result = cmd("?[id] := *clips{id}", 1).execute(&mut session).unwrap();
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.rows, vec![vec!["1"]]);
    }

    #[rstest]
    fn test_query_binds_params(mut session: Session) {
        let query = QueryCmd {
            script: "?[name] := *clips{id, name}, id == $id".to_string(),
            params: vec![("id".to_string(), ValueType::Int(2))],
            limit: 100,
        };
        let result = query.execute(&mut session).unwrap();
        assert_eq!(result.rows, vec![vec!["outro"]]);
    }

    #[rstest]
    fn test_query_without_rows(mut session: Session) {
        let result = cmd("?[id] := *clips{id}, id > 10", 100)
            .execute(&mut session)
            .unwrap();
        assert_eq!(result.total_rows, 0);
        assert!(result.rows.is_empty());
        assert_eq!(result.columns.len(), 1);
    }

    // =========================================================================
    // Error handling tests
    // =========================================================================

    #[rstest]
    fn test_query_syntax_error(mut session: Session) {
        let err = cmd("?[x] :=", 100).execute(&mut session).unwrap_err();
        assert!(err.to_string().starts_with("Query failed"), "{}", err);
    }

    crate::execute_empty_db_test! {
        cmd_type: QueryCmd,
        cmd: QueryCmd {
            script: "?[id] := *clips{id}".to_string(),
            params: vec![],
            limit: 100,
        },
    }
}
