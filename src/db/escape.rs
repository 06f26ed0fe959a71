//! Identifier validation and quoting for generated queries.
//!
//! Values always travel as bound parameters; only table, relation and column names are
//! spliced into query text, and they must pass [`validate_identifier`] first.

use super::DbError;

/// Accept `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<&str, DbError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(DbError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 2);
    result.push('"');
    for c in name.chars() {
        if c == '"' {
            result.push('"');
        }
        result.push(c);
    }
    result.push('"');
    result
}
