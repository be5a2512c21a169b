//! Temporal feature derivation over per-loan performance histories
//!
//! All windows are defined over a single loan's rows in date order; nothing
//! is ever computed across loans.

mod deriver;
mod events;
mod series;
pub mod window;

pub use deriver::{derive_features, derive_history, ExecutionMode, FeatureOutput, FeatureRow};
pub use events::{EventExtracts, ModificationEvent, SeriousDelinquencyEvent, ZeroBalanceEvent};
pub use series::{partition_by_loan, LoanHistory, SeriesOrdering};
