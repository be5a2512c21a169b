//! Loan Performance - scheduled balances and lifecycle features for mortgage loan-level data
//!
//! This library provides:
//! - A declarative column registry and a generic pipe-delimited loader
//! - The amortization engine (scheduled UPB by loan and age)
//! - Temporal feature derivation over per-loan performance histories
//! - Assembly of the loan-month and loan-level output tables
//! - A batch pipeline and CSV/JSON writers

pub mod error;
pub mod schema;
pub mod loan;
pub mod amortization;
pub mod features;
pub mod lifecycle;
pub mod pipeline;
pub mod output;

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use loan::{Loan, PerformanceRecord};
pub use amortization::{
    compute_amortization, MonthlyRates, ScheduleEntry, UpbMatrix, MATURED_SENTINEL,
};
pub use features::{derive_features, EventExtracts, ExecutionMode, FeatureOutput, SeriesOrdering};
pub use lifecycle::{assemble_loans, assemble_performance, LoanMonth, LoanSummary};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
