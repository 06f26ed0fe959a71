use std::error::Error;

use serde::Serialize;

use super::QueryCmd;
use crate::commands::Execute;
use crate::db::{Backend, ColumnKey, ResultCursor, Session};

/// Result of the query command execution
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub script: String,
    pub backend: Backend,
    pub columns: Vec<ColumnKey>,
    /// Rows in the full result, printed or not.
    pub total_rows: usize,
    /// Printed rows, each cell in its canonical text form.
    pub rows: Vec<Vec<String>>,
}

impl Execute for QueryCmd {
    type Output = QueryResult;

    fn execute(self, session: &mut Session) -> Result<Self::Output, Box<dyn Error>> {
        let params = self.query_params();
        let mut cursor = session.run(&self.script, &params)?;

        let columns = cursor.keys();
        let total_rows = cursor.count_rows().unwrap_or(0);
        let mut rows = Vec::new();
        while rows.len() < self.limit as usize && cursor.next() {
            rows.push((0..columns.len()).map(|c| cursor.get_value(c)).collect());
        }

        Ok(QueryResult {
            script: self.script,
            backend: session.backend(),
            columns,
            total_rows,
            rows,
        })
    }
}
