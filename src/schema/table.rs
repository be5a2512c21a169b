//! Generic schema-driven reader for headerless pipe-delimited files

use super::fields::{DefaultValue, FieldSpec, FieldType, TableSchema};
use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::io::Read;

/// A single coerced cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    fn from_default(default: DefaultValue) -> Self {
        match default {
            DefaultValue::Int(v) => Value::Int(v),
            DefaultValue::Float(v) => Value::Float(v),
            DefaultValue::Str(s) => Value::Str(s.to_string()),
        }
    }
}

/// Rows of coerced values with the column metadata that produced them
#[derive(Debug, Clone)]
pub struct TypedTable {
    pub name: &'static str,
    pub columns: Vec<&'static FieldSpec>,
    pub rows: Vec<Vec<Value>>,
    /// Source line of each row, for error reporting downstream
    pub lines: Vec<u64>,
}

impl TypedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column the caller cannot do without
    pub fn require(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|f| f.name == column)
            .ok_or_else(|| PipelineError::MissingRequiredColumn {
                table: self.name,
                column: column.to_string(),
            })
    }

    /// Position of a column that may legitimately be absent
    pub fn optional(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|f| f.name == column)
    }

    /// Remove every column whose descriptor carries the drop flag
    pub fn without_dropped(mut self) -> Self {
        let keep: Vec<bool> = self.columns.iter().map(|f| !f.drop).collect();
        self.columns.retain(|f| !f.drop);
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
        self
    }
}

/// Read a headerless pipe-delimited stream and coerce every cell to its declared type.
///
/// Empty cells take the column default when one is declared and are `Null`
/// otherwise. Short records are padded with empty cells; trailing extra
/// fields are ignored.
pub fn read_table<R: Read>(reader: R, schema: &'static TableSchema) -> Result<TypedTable> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut lines = Vec::new();

    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let row = schema
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| coerce(field, record.get(i).unwrap_or(""), line))
            .collect::<Result<Vec<_>>>()?;

        rows.push(row);
        lines.push(line);
    }

    log::debug!("read {} rows for table '{}'", rows.len(), schema.name);

    Ok(TypedTable {
        name: schema.name,
        columns: schema.fields.iter().collect(),
        rows,
        lines,
    })
}

fn coerce(field: &FieldSpec, raw: &str, line: u64) -> Result<Value> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(field.default.map(Value::from_default).unwrap_or(Value::Null));
    }

    let parse_error = || PipelineError::Parse {
        column: field.name.to_string(),
        value: text.to_string(),
        expected: field.field_type.as_str(),
        line,
    };

    match field.field_type {
        FieldType::String => Ok(Value::Str(text.to_string())),
        FieldType::Int => text
            .parse::<i64>()
            .ok()
            // Some releases write integral columns as "1.0"
            .or_else(|| text.parse::<f64>().ok().filter(|v| v.fract() == 0.0).map(|v| v as i64))
            .map(Value::Int)
            .ok_or_else(parse_error),
        FieldType::Float | FieldType::Double => {
            text.parse::<f64>().map(Value::Float).map_err(|_| parse_error())
        }
        FieldType::Date => field
            .date_format
            .and_then(|format| format.parse(text))
            .map(Value::Date)
            .ok_or_else(parse_error),
    }
}
