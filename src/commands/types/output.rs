//! Output formatting for types command results.

use super::execute::TypesResult;
use crate::output::{align_columns, Outputable};

impl Outputable for TypesResult {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();

        match self.category {
            Some(category) => lines.push(format!("Types ({}, {})", self.backend, category)),
            None => lines.push(format!("Types ({})", self.backend)),
        }
        lines.push(String::new());

        if self.types.is_empty() {
            lines.push("No types found.".to_string());
            return lines.join("\n");
        }

        let header: Vec<String> = ["ID", "NAME", "CATEGORY", "WIDTH", "ARRAY"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let rows: Vec<Vec<String>> = self
            .types
            .iter()
            .map(|t| {
                vec![
                    t.id.clone(),
                    t.name.clone(),
                    t.category.to_string(),
                    t.width.map(|w| w.to_string()).unwrap_or_else(|| "-".to_string()),
                    if t.is_array { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        lines.extend(align_columns(&header, &rows));
        lines.push(String::new());
        lines.push(format!("{} type(s)", self.types.len()));

        lines.join("\n")
    }
}
