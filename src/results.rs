//! Consequence results and the table that aggregates them

use std::fmt;

use serde::Serialize;

use crate::error::{RowLengthError, SchemaMismatchError};

/// One cell of a result row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultValue {
    Float(f64),
    Int(i64),
    Text(String),
}

impl ResultValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ResultValue::Float(v) => Some(*v),
            ResultValue::Int(v) => Some(*v as f64),
            ResultValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResultValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for ResultValue {
    fn from(v: f64) -> Self {
        ResultValue::Float(v)
    }
}

impl From<i64> for ResultValue {
    fn from(v: i64) -> Self {
        ResultValue::Int(v)
    }
}

impl From<&str> for ResultValue {
    fn from(v: &str) -> Self {
        ResultValue::Text(v.to_string())
    }
}

impl From<String> for ResultValue {
    fn from(v: String) -> Self {
        ResultValue::Text(v)
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultValue::Float(v) => write!(f, "{:.2}", v),
            ResultValue::Int(v) => write!(f, "{}", v),
            ResultValue::Text(s) => f.write_str(s),
        }
    }
}

/// A row of named outputs from one computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsequenceResult {
    headers: Vec<String>,
    results: Vec<ResultValue>,
}

impl ConsequenceResult {
    pub fn new(headers: Vec<String>, results: Vec<ResultValue>) -> Result<Self, RowLengthError> {
        if headers.len() != results.len() {
            return Err(RowLengthError {
                headers: headers.len(),
                results: results.len(),
            });
        }
        Ok(Self { headers, results })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ResultValue>,
    {
        let (headers, results) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { headers, results }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn results(&self) -> &[ResultValue] {
        &self.results
    }

    pub fn get(&self, header: &str) -> Option<&ResultValue> {
        self.headers
            .iter()
            .position(|h| h == header)
            .map(|i| &self.results[i])
    }

    /// Append the columns of `other` after this row's columns
    pub fn concat(mut self, other: ConsequenceResult) -> Self {
        self.headers.extend(other.headers);
        self.results.extend(other.results);
        self
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<ResultValue>) {
        (self.headers, self.results)
    }
}

/// Append-only table of result rows sharing one header schema
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsequenceTable {
    headers: Vec<String>,
    rows: Vec<Vec<ResultValue>>,
}

impl ConsequenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table whose schema is fixed before any row arrives
    pub fn with_headers<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; the first row fixes the schema
    pub fn add(&mut self, row: ConsequenceResult) -> Result<(), SchemaMismatchError> {
        let (headers, results) = row.into_parts();
        if self.rows.is_empty() && self.headers.is_empty() {
            self.headers = headers;
        } else if self.headers != headers {
            return Err(SchemaMismatchError {
                expected: self.headers.clone(),
                found: headers,
            });
        }
        self.rows.push(results);
        Ok(())
    }

    /// Append every row of `other`, keeping its order
    pub fn merge(&mut self, other: ConsequenceTable) -> Result<(), SchemaMismatchError> {
        if other.rows.is_empty() {
            return Ok(());
        }
        if self.headers.is_empty() && self.rows.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.headers != other.headers {
            return Err(SchemaMismatchError {
                expected: self.headers.clone(),
                found: other.headers,
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<ResultValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Sum of a numeric column; text cells are ignored
    pub fn column_total(&self, header: &str) -> f64 {
        match self.column(header) {
            Some(i) => self.rows.iter().filter_map(|row| row[i].as_f64()).sum(),
            None => 0.0,
        }
    }
}
