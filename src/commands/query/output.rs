//! Output formatting for query command results.

use super::execute::QueryResult;
use crate::output::{align_columns, Outputable};

impl Outputable for QueryResult {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Query ({}): {}", self.backend, self.script));
        lines.push(String::new());

        if self.columns.is_empty() {
            lines.push("No columns.".to_string());
            return lines.join("\n");
        }

        lines.push(format!("Columns ({}):", self.columns.len()));
        for key in &self.columns {
            let type_name = if key.is_resolved() { key.type_name.as_str() } else { "?" };
            lines.push(format!("  {}: {} ({})", key.name, type_name, key.extra));
        }
        lines.push(String::new());

        if self.rows.is_empty() {
            lines.push("No rows.".to_string());
            return lines.join("\n");
        }

        let header: Vec<String> = self.columns.iter().map(|k| k.name.clone()).collect();
        lines.extend(align_columns(&header, &self.rows));
        lines.push(String::new());
        lines.push(format!("{} of {} row(s)", self.rows.len(), self.total_rows));

        lines.join("\n")
    }
}
