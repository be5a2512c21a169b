//! Amortization engine: scheduled unpaid principal balance by loan and age

mod engine;
mod schedule;

pub use engine::{compute_amortization, monthly_payment, MonthlyRates, MATURED_SENTINEL};
pub use schedule::{scheduled_balances, ScheduleEntry, UpbMatrix};
