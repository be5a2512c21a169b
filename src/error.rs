//! Error types shared by the loader, engine and assemblers

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Shape mismatch: {what} has {actual} entries, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid monthly rate {rate} for loan index {index}: rate must be positive")]
    InvalidRate { index: usize, rate: f64 },

    #[error("Invalid term {term} for loan index {index}: term must be at least 1 month")]
    InvalidTerm { index: usize, term: u32 },

    #[error("Performance rows for loan '{loan_id}' are not strictly ordered by date at row {row}")]
    UnorderedSeries { loan_id: String, row: usize },

    #[error("Row {row} belongs to loan '{found}', not to the history of loan '{loan_id}'")]
    LoanIdMismatch {
        loan_id: String,
        found: String,
        row: usize,
    },

    #[error("Required column '{column}' is missing from table '{table}'")]
    MissingRequiredColumn { table: &'static str, column: String },

    #[error("Cannot parse '{value}' as {expected} in column '{column}' (line {line})")]
    Parse {
        column: String,
        value: String,
        expected: &'static str,
        line: u64,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
