mod execute;
mod execute_tests;
mod output;
mod output_tests;

pub use execute::QueryResult;

use clap::Args;

use crate::db::{QueryParams, ValueType};

/// Run a query and print every cell through the result cursor
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  vtstore query '?[x] := x = 7'                                # CozoScript
  vtstore query '?[id, name] := *clips{id, name}' -l 10        # First 10 rows
  vtstore query '?[n] := *clips{name: n, id}, id == $id' -p id=2
  vtstore --db postgres://u@localhost/vt query 'SELECT 1'      # SQL on PostgreSQL")]
pub struct QueryCmd {
    /// Query text in the backend's dialect (SQL or CozoScript)
    pub script: String,

    /// Bind a parameter as NAME=VALUE (ints, floats and true/false are typed)
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, ValueType)>,

    /// Maximum number of rows to print (1-1000)
    #[arg(short, long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub limit: u32,
}

impl QueryCmd {
    pub fn query_params(&self) -> QueryParams {
        self.params
            .iter()
            .cloned()
            .fold(QueryParams::new(), |params, (name, value)| params.with(name, value))
    }
}

/// Parse `NAME=VALUE`, typing the value as int, float or bool when it reads as one.
pub fn parse_param(raw: &str) -> Result<(String, ValueType), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }

    let value = if let Ok(v) = value.parse::<i64>() {
        ValueType::Int(v)
    } else if let Ok(v) = value.parse::<f64>() {
        ValueType::Float(v)
    } else if let Ok(v) = value.parse::<bool>() {
        ValueType::Bool(v)
    } else {
        ValueType::Str(value.to_string())
    };
    Ok((name.to_string(), value))
}
