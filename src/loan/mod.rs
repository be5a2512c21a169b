//! Loan origination data, monthly performance observations, and file loading

mod data;
pub mod loader;

pub use data::{
    parse_delinquency, Loan, PerformanceRecord, DLQ_MISSING, DLQ_UNKNOWN,
    SERIOUS_DELINQUENCY_THRESHOLD,
};
pub use loader::{
    load_loans, load_loans_from_reader, load_performance, load_performance_from_reader,
};
