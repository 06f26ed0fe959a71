//! Backend-agnostic query parameters.
//!
//! Parameters keep their insertion order: PostgreSQL binds them positionally (`$1`, `$2`, ...)
//! while CozoDB binds them by name (`$p1`, `$p2`, ...).

/// Backend-agnostic parameter types for database queries.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueType {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    StrArray(Vec<String>),
}

/// Ordered container for query parameters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryParams {
    params: Vec<(String, ValueType)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Set a parameter, replacing an earlier value of the same name in place.
    pub fn with(mut self, key: impl Into<String>, value: ValueType) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_str(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(key, ValueType::Str(value.into()))
    }

    pub fn with_int(self, key: impl Into<String>, value: i64) -> Self {
        self.with(key, ValueType::Int(value))
    }

    pub fn with_float(self, key: impl Into<String>, value: f64) -> Self {
        self.with(key, ValueType::Float(value))
    }

    pub fn with_bool(self, key: impl Into<String>, value: bool) -> Self {
        self.with(key, ValueType::Bool(value))
    }

    pub fn with_str_array(self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.with(key, ValueType::StrArray(values))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ValueType) {
        let key = key.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ValueType> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Parameters in insertion order.
    pub fn params(&self) -> &[(String, ValueType)] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
