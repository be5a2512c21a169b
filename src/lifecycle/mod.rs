//! Loan lifecycle assembly: the loan-level and loan-month output tables

mod assembler;

pub use assembler::{assemble_loans, assemble_performance, LoanMonth, LoanSummary};
