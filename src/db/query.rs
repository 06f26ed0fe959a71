//! Query construction and execution.
//!
//! [`QueryBuilder`] renders a simple filtered SELECT in the dialect of its family: SQL with
//! `$1..$n` placeholders for PostgreSQL, a CozoScript rule with `$p1..$pn` parameters for
//! CozoDB. Values always travel as [`QueryParams`]; only validated identifiers are spliced
//! into the query text.

use super::backend::{Backend, Session};
use super::cursor::{Cursor, ResultCursor};
use super::escape::{quote_identifier, validate_identifier};
use super::params::{QueryParams, ValueType};
use super::DbError;

/// Selected working context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub dataset: Option<String>,
    pub sequence: Option<String>,
    pub task: Option<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterOp {
    Eq,
    InList,
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    column: String,
    op: FilterOp,
    param: String,
}

/// Builder for a single-table SELECT of one family.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    backend: Backend,
    context: Context,
    table: Option<String>,
    dataset: Option<String>,
    columns: Vec<String>,
    filters: Vec<Filter>,
    params: QueryParams,
    limit: Option<u32>,
}

impl QueryBuilder {
    pub fn new(backend: Backend, context: Context) -> Self {
        Self {
            backend,
            context,
            table: None,
            dataset: None,
            columns: Vec::new(),
            filters: Vec::new(),
            params: QueryParams::new(),
            limit: None,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Select `columns` from a table outside any dataset.
    pub fn from(mut self, table: &str, columns: &[&str]) -> Self {
        self.table = Some(table.to_string());
        self.dataset = None;
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Select `columns` from a table of the context's dataset.
    pub fn from_dataset(mut self, table: &str, columns: &[&str]) -> Result<Self, DbError> {
        let dataset = self
            .context
            .dataset
            .clone()
            .ok_or_else(|| DbError::BadConfiguration("dataset not specified".to_string()))?;
        self = self.from(table, columns);
        self.dataset = Some(dataset);
        Ok(self)
    }

    fn push_filter(mut self, column: &str, op: FilterOp, value: ValueType) -> Self {
        let param = format!("p{}", self.params.len() + 1);
        self.params.insert(param.clone(), value);
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            param,
        });
        self
    }

    pub fn where_string(self, column: &str, value: impl Into<String>) -> Self {
        self.push_filter(column, FilterOp::Eq, ValueType::Str(value.into()))
    }

    pub fn where_int(self, column: &str, value: i64) -> Self {
        self.push_filter(column, FilterOp::Eq, ValueType::Int(value))
    }

    pub fn where_string_in_list(self, column: &str, values: Vec<String>) -> Self {
        self.push_filter(column, FilterOp::InList, ValueType::StrArray(values))
    }

    /// Restrict `column` to the context's sequence.
    pub fn where_sequence(self, column: &str) -> Result<Self, DbError> {
        let sequence = self
            .context
            .sequence
            .clone()
            .ok_or_else(|| DbError::BadConfiguration("sequence not specified".to_string()))?;
        Ok(self.where_string(column, sequence))
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Stored relation or table name as the family names it.
    pub fn relation(&self) -> Result<String, DbError> {
        let table = self
            .table
            .as_deref()
            .ok_or_else(|| DbError::BadConfiguration("no table selected".to_string()))?;
        validate_identifier(table)?;
        match (&self.dataset, self.backend) {
            (Some(dataset), Backend::Cozo) => {
                validate_identifier(dataset)?;
                Ok(format!("{}_{}", dataset, table))
            }
            _ => Ok(table.to_string()),
        }
    }

    /// Query text in the family's dialect.
    pub fn render(&self) -> Result<String, DbError> {
        for column in self.columns.iter().chain(self.filters.iter().map(|f| &f.column)) {
            validate_identifier(column)?;
        }
        match self.backend {
            Backend::Postgres => self.render_sql(),
            Backend::Cozo => self.render_cozo(),
        }
    }

    fn render_sql(&self) -> Result<String, DbError> {
        let table = quote_identifier(&self.relation()?);
        let source = match &self.dataset {
            Some(dataset) => format!("{}.{}", quote_identifier(validate_identifier(dataset)?), table),
            None => table,
        };
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, source);
        for (index, filter) in self.filters.iter().enumerate() {
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            let placeholder = index + 1;
            match filter.op {
                FilterOp::Eq => {
                    sql.push_str(&format!("{} = ${}", quote_identifier(&filter.column), placeholder))
                }
                FilterOp::InList => sql.push_str(&format!(
                    "{} = ANY(${})",
                    quote_identifier(&filter.column),
                    placeholder
                )),
            }
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        Ok(sql)
    }

    fn render_cozo(&self) -> Result<String, DbError> {
        if self.columns.is_empty() {
            return Err(DbError::BadConfiguration(
                "CozoDB queries need explicit columns".to_string(),
            ));
        }
        let relation = self.relation()?;

        let mut bound: Vec<&str> = Vec::new();
        for column in self.columns.iter().chain(self.filters.iter().map(|f| &f.column)) {
            if !bound.contains(&column.as_str()) {
                bound.push(column);
            }
        }

        let mut body = vec![format!("*{}{{{}}}", relation, bound.join(", "))];
        for filter in &self.filters {
            body.push(match filter.op {
                FilterOp::Eq => format!("{} == ${}", filter.column, filter.param),
                FilterOp::InList => format!("is_in({}, ${})", filter.column, filter.param),
            });
        }

        let mut script = format!("?[{}] := {}", self.columns.join(", "), body.join(", "));
        if let Some(limit) = self.limit {
            script.push_str(&format!("\n:limit {}", limit));
        }
        Ok(script)
    }
}

/// A built query together with the cursor holding its result.
#[derive(Debug)]
pub struct Query {
    builder: QueryBuilder,
    cursor: Cursor,
    executed: bool,
}

impl Query {
    pub fn new(session: &Session, context: &Context) -> Self {
        Self {
            builder: session.query_builder(context),
            cursor: session.cursor(),
            executed: false,
        }
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Replace the builder, e.g. `query.set_builder(query.builder().clone().limit(5))`.
    pub fn set_builder(&mut self, builder: QueryBuilder) {
        self.builder = builder;
        self.executed = false;
    }

    pub fn sql(&self) -> Result<String, DbError> {
        self.builder.render()
    }

    /// Run the query and load its result into the cursor.
    pub fn execute(&mut self, session: &mut Session) -> Result<&mut Cursor, DbError> {
        let payload = session.execute_builder(&self.builder)?;
        self.cursor.new_result(payload)?;
        self.executed = true;
        Ok(&mut self.cursor)
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    /// Drop the result and the builder's selection.
    pub fn reset(&mut self) {
        self.cursor.clear();
        self.builder = QueryBuilder::new(self.builder.backend, self.builder.context.clone());
        self.executed = false;
    }
}
