//! Matrix and long-format views of scheduled balances

use super::engine::{compute_amortization, MonthlyRates, MATURED_SENTINEL};
use crate::error::{PipelineError, Result};
use crate::loan::Loan;
use serde::{Deserialize, Serialize};

/// Scheduled balances, one row per loan and one column per age
#[derive(Debug, Clone, PartialEq)]
pub struct UpbMatrix {
    start_period: u32,
    loans: usize,
    ages: usize,
    values: Vec<f64>,
}

impl UpbMatrix {
    pub(super) fn new(start_period: u32, loans: usize, ages: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), loans * ages);
        Self {
            start_period,
            loans,
            ages,
            values,
        }
    }

    pub(super) fn empty(start_period: u32) -> Self {
        Self::new(start_period, 0, 0, Vec::new())
    }

    pub fn loans(&self) -> usize {
        self.loans
    }

    pub fn ages(&self) -> usize {
        self.ages
    }

    pub fn start_period(&self) -> u32 {
        self.start_period
    }

    /// Absolute loan age of column `k`
    pub fn age_at(&self, k: usize) -> u32 {
        self.start_period + k as u32
    }

    pub fn row(&self, loan: usize) -> &[f64] {
        &self.values[loan * self.ages..(loan + 1) * self.ages]
    }

    pub fn get(&self, loan: usize, k: usize) -> f64 {
        self.row(loan)[k]
    }

    /// Flatten into `(loan_id, age, balance)` triples, loan-major.
    ///
    /// Matured cells are kept and carry `MATURED_SENTINEL`.
    pub fn to_schedule<S: AsRef<str>>(&self, loan_ids: &[S]) -> Result<Vec<ScheduleEntry>> {
        if loan_ids.len() != self.loans {
            return Err(PipelineError::ShapeMismatch {
                what: "loan_ids",
                expected: self.loans,
                actual: loan_ids.len(),
            });
        }

        let mut entries = Vec::with_capacity(self.values.len());
        for (loan, id) in loan_ids.iter().enumerate() {
            for (k, &scheduled_upb) in self.row(loan).iter().enumerate() {
                entries.push(ScheduleEntry {
                    loan_id: id.as_ref().to_string(),
                    loan_age: self.age_at(k),
                    scheduled_upb,
                });
            }
        }
        Ok(entries)
    }
}

/// One scheduled balance in long format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub loan_id: String,
    pub loan_age: u32,
    pub scheduled_upb: f64,
}

impl ScheduleEntry {
    pub fn is_matured(&self) -> bool {
        self.scheduled_upb == MATURED_SENTINEL
    }
}

/// Scheduled balances from origination for `horizon` months, using each
/// loan's note rate, amount and term.
pub fn scheduled_balances(loans: &[Loan], horizon: u32) -> Result<Vec<ScheduleEntry>> {
    let principals: Vec<f64> = loans.iter().map(|l| l.principal).collect();
    let rates: Vec<f64> = loans.iter().map(Loan::monthly_rate).collect();
    let terms: Vec<u32> = loans.iter().map(|l| l.term_months).collect();

    let matrix =
        compute_amortization(&principals, MonthlyRates::Fixed(&rates), &terms, 0, horizon)?;
    let ids: Vec<&str> = loans.iter().map(|l| l.loan_id.as_str()).collect();
    matrix.to_schedule(&ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_schedule_long_format() {
        let matrix = UpbMatrix::new(6, 2, 3, vec![10.0, 9.0, 8.0, 20.0, 19.0, MATURED_SENTINEL]);
        assert_eq!(matrix.start_period(), 6);
        let entries = matrix.to_schedule(&["A", "B"]).unwrap();

        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].loan_id, "A");
        assert_eq!(entries[0].loan_age, 6);
        assert_eq!(entries[2].loan_age, 8);
        assert_eq!(entries[3].loan_id, "B");
        assert_eq!(entries[4].scheduled_upb, 19.0);
        assert!(entries[5].is_matured());
        assert!(!entries[4].is_matured());
    }

    #[test]
    fn test_to_schedule_requires_one_id_per_loan() {
        let matrix = UpbMatrix::new(0, 2, 1, vec![1.0, 2.0]);
        let err = matrix.to_schedule(&["A"]).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { what: "loan_ids", expected: 2, actual: 1 }));
    }

    #[test]
    fn test_scheduled_balances_from_loans() {
        let loans = vec![
            Loan::new("L1", 100_000.0, 4.8, 360),
            Loan::new("L2", 200_000.0, 6.0, 180),
        ];
        let entries = scheduled_balances(&loans, 12).unwrap();

        assert_eq!(entries.len(), 24);
        assert_eq!(entries[0].scheduled_upb, 100_000.0);
        assert_eq!(entries[12].loan_id, "L2");
        assert_eq!(entries[12].loan_age, 0);
        assert!(entries.iter().all(|e| !e.is_matured()));
    }

    #[test]
    fn test_scheduled_balances_rejects_zero_rate() {
        let loans = vec![Loan::new("L1", 100_000.0, 0.0, 360)];
        let err = scheduled_balances(&loans, 12).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRate { index: 0, .. }));
    }
}
