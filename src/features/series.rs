//! Per-loan partitioning of performance observations

use crate::error::{PipelineError, Result};
use crate::loan::PerformanceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How to treat a loan whose observations arrive out of date order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOrdering {
    /// Reject with `UnorderedSeries`
    #[default]
    Validate,
    /// Sort each loan by observation date first
    Sort,
}

/// All observations of one loan, strictly increasing by date
#[derive(Debug, Clone, PartialEq)]
pub struct LoanHistory {
    loan_id: String,
    rows: Vec<PerformanceRecord>,
}

impl LoanHistory {
    /// Wrap an ordered series; every row must belong to `loan_id`
    /// (`LoanIdMismatch` otherwise) and dates must strictly increase
    pub fn new(loan_id: impl Into<String>, rows: Vec<PerformanceRecord>) -> Result<Self> {
        let loan_id = loan_id.into();

        if let Some(row) = rows.iter().position(|r| r.loan_id != loan_id) {
            let found = rows[row].loan_id.clone();
            return Err(PipelineError::LoanIdMismatch { loan_id, found, row });
        }
        if let Some(row) = rows
            .windows(2)
            .position(|w| w[1].observation_date <= w[0].observation_date)
        {
            return Err(PipelineError::UnorderedSeries { loan_id, row: row + 1 });
        }

        Ok(Self { loan_id, rows })
    }

    pub fn loan_id(&self) -> &str {
        &self.loan_id
    }

    pub fn rows(&self) -> &[PerformanceRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<PerformanceRecord> {
        self.rows
    }
}

/// Group observations by loan, returning histories ordered by loan id.
///
/// Within a loan the input order is kept unless `ordering` asks for a sort.
pub fn partition_by_loan(
    records: Vec<PerformanceRecord>,
    ordering: SeriesOrdering,
) -> Result<Vec<LoanHistory>> {
    let mut groups: BTreeMap<String, Vec<PerformanceRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.loan_id.clone()).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(loan_id, mut rows)| {
            if ordering == SeriesOrdering::Sort {
                rows.sort_by_key(|r| r.observation_date);
            }
            LoanHistory::new(loan_id, rows)
        })
        .collect()
}
