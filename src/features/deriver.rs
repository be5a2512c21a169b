//! Windowed delinquency, zero-balance and modification signals per loan-month

use super::events::EventExtracts;
use super::series::{partition_by_loan, LoanHistory, SeriesOrdering};
use super::window::{
    forward_max, forward_max_present, lag, trailing, FORWARD_LONG, FORWARD_SHORT, TRAILING_ROWS,
};
use crate::error::Result;
use crate::loan::PerformanceRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Execution adapter for the per-loan derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// Loans fanned out across the rayon pool; output order is unchanged
    Parallel,
}

/// A performance observation with its windowed signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub record: PerformanceRecord,

    /// Status of the previous month
    pub dlq_lag1: Option<i32>,

    /// Up to 12 preceding statuses, oldest first
    pub dlq_trail12: Vec<i32>,

    /// Worst status over the following 12 / 24 months
    pub dlq_fwd12_max: Option<i32>,
    pub dlq_fwd24_max: Option<i32>,

    /// Highest zero-balance code reported in the following 12 / 24 months
    pub zb_code_fwd12_max: Option<String>,
    pub zb_code_fwd24_max: Option<String>,

    /// Whether a modification is reported in the following 12 / 24 months
    pub mod_fwd12_max: Option<bool>,
    pub mod_fwd24_max: Option<bool>,
}

/// Feature rows for every loan plus the first-occurrence extracts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureOutput {
    /// Ordered by loan id, then observation date
    pub rows: Vec<FeatureRow>,
    pub events: EventExtracts,
}

/// Compute windowed signals over one loan's ordered history.
///
/// Forward windows cover the next 12 / 24 rows and shrink near the end of the
/// history; they are `None` only on the last row. Missing (-1) and unknown (-2)
/// statuses take part in the maxima like any other value, so a gap month can
/// hide nothing but can also not raise the maximum.
pub fn derive_history(history: LoanHistory) -> Vec<FeatureRow> {
    let statuses: Vec<i32> = history.rows().iter().map(|r| r.delinquency_status).collect();
    let zb_codes: Vec<Option<String>> =
        history.rows().iter().map(|r| r.zero_balance_code.clone()).collect();
    let mod_flags: Vec<bool> = history.rows().iter().map(|r| r.modification_flag).collect();

    history
        .into_rows()
        .into_iter()
        .enumerate()
        .map(|(i, record)| FeatureRow {
            record,
            dlq_lag1: lag(&statuses, i),
            dlq_trail12: trailing(&statuses, i, TRAILING_ROWS).to_vec(),
            dlq_fwd12_max: forward_max(&statuses, i, FORWARD_SHORT),
            dlq_fwd24_max: forward_max(&statuses, i, FORWARD_LONG),
            zb_code_fwd12_max: forward_max_present(&zb_codes, i, FORWARD_SHORT),
            zb_code_fwd24_max: forward_max_present(&zb_codes, i, FORWARD_LONG),
            mod_fwd12_max: forward_max(&mod_flags, i, FORWARD_SHORT),
            mod_fwd24_max: forward_max(&mod_flags, i, FORWARD_LONG),
        })
        .collect()
}

fn derive_loan(history: LoanHistory) -> (Vec<FeatureRow>, EventExtracts) {
    let rows = derive_history(history);
    let events = EventExtracts::from_loan(&rows);
    (rows, events)
}

/// Partition observations by loan, derive windowed signals, and extract events.
///
/// Ordering is checked (or repaired) for every loan before any window is
/// computed, so an error leaves no partial output.
pub fn derive_features(
    records: Vec<PerformanceRecord>,
    ordering: SeriesOrdering,
    mode: ExecutionMode,
) -> Result<FeatureOutput> {
    let start = Instant::now();
    let histories = partition_by_loan(records, ordering)?;
    let loan_count = histories.len();

    let per_loan: Vec<(Vec<FeatureRow>, EventExtracts)> = match mode {
        ExecutionMode::Sequential => histories.into_iter().map(derive_loan).collect(),
        ExecutionMode::Parallel => histories.into_par_iter().map(derive_loan).collect(),
    };

    let mut output = FeatureOutput::default();
    for (rows, events) in per_loan {
        output.rows.extend(rows);
        output.events.append(events);
    }

    log::info!(
        "derived features for {} loans ({} rows) in {} ms: \
         {} modifications, {} serious delinquencies, {} zero balances",
        loan_count,
        output.rows.len(),
        start.elapsed().as_millis(),
        output.events.modifications.len(),
        output.events.serious_delinquencies.len(),
        output.events.zero_balances.len(),
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::loan::{DLQ_MISSING, DLQ_UNKNOWN};
    use chrono::{Months, NaiveDate};

    fn month(offset: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2010, 1, 1).unwrap() + Months::new(offset)
    }

    fn series(loan: &str, statuses: &[i32]) -> Vec<PerformanceRecord> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, &s)| PerformanceRecord::new(loan, month(i as u32), i as i32, s))
            .collect()
    }

    fn history(loan: &str, statuses: &[i32]) -> LoanHistory {
        LoanHistory::new(loan, series(loan, statuses)).unwrap()
    }

    #[test]
    fn test_window_signals() {
        let mut statuses = vec![0, 0, 1, 3, 3, 0, 0];
        statuses.extend(std::iter::repeat(0).take(20));
        let rows = derive_history(history("L1", &statuses));

        // 1-based row 4 (status 3) lags the status-1 row before it
        assert_eq!(rows[3].dlq_lag1, Some(1));
        // 1-based row 3 (status 1) sees the 3s ahead of it
        assert_eq!(rows[2].dlq_fwd12_max, Some(3));
        assert_eq!(rows[2].dlq_fwd24_max, Some(3));
        assert_eq!(rows[0].dlq_lag1, None);
        assert!(rows[0].dlq_trail12.is_empty());
        assert_eq!(rows[4].dlq_trail12, vec![0, 0, 1, 3]);
        // past the 3s nothing worse than current remains
        assert_eq!(rows[4].dlq_fwd12_max, Some(0));
    }

    #[test]
    fn test_trailing_window_holds_twelve() {
        let statuses: Vec<i32> = (0..20).collect();
        let rows = derive_history(history("L1", &statuses));
        assert_eq!(rows[15].dlq_trail12, (3..15).collect::<Vec<_>>());
        assert_eq!(rows[15].dlq_trail12.len(), 12);
    }

    #[test]
    fn test_forward_windows_respect_horizon() {
        // a single bad month 18 rows ahead is inside 24 but outside 12
        let mut statuses = vec![0; 30];
        statuses[18] = 4;
        let rows = derive_history(history("L1", &statuses));

        assert_eq!(rows[0].dlq_fwd12_max, Some(0));
        assert_eq!(rows[0].dlq_fwd24_max, Some(4));
        assert_eq!(rows[6].dlq_fwd12_max, Some(4));
        assert_eq!(rows[29].dlq_fwd12_max, None);
        assert_eq!(rows[29].dlq_fwd24_max, None);
    }

    #[test]
    fn test_short_tail_takes_max_of_remaining_rows() {
        // fewer than 12 rows follow row 0, yet both forward windows carry a value
        let rows = derive_history(history("L1", &[0, 0, 5]));

        assert_eq!(rows[0].dlq_fwd12_max, Some(5));
        assert_eq!(rows[0].dlq_fwd24_max, Some(5));
        assert_eq!(rows[1].dlq_fwd12_max, Some(5));
        assert_eq!(rows[2].dlq_fwd12_max, None);
        assert_eq!(rows[2].dlq_fwd24_max, None);
    }

    #[test]
    fn test_sentinel_statuses_in_windows() {
        let rows = derive_history(history("L1", &[0, DLQ_MISSING, DLQ_UNKNOWN]));
        assert_eq!(rows[0].dlq_fwd12_max, Some(DLQ_MISSING));
        assert_eq!(rows[1].dlq_fwd12_max, Some(DLQ_UNKNOWN));
        assert_eq!(rows[2].dlq_lag1, Some(DLQ_MISSING));
    }

    #[test]
    fn test_zero_balance_and_modification_windows() {
        let mut records = series("L1", &[0; 14]);
        records[5].modification_flag = true;
        records[13].zero_balance_code = Some("01".to_string());
        let rows = derive_history(LoanHistory::new("L1", records).unwrap());

        assert_eq!(rows[0].mod_fwd12_max, Some(true));
        assert_eq!(rows[5].mod_fwd12_max, Some(false));
        assert_eq!(rows[0].zb_code_fwd12_max, None);
        assert_eq!(rows[0].zb_code_fwd24_max.as_deref(), Some("01"));
        assert_eq!(rows[1].zb_code_fwd12_max.as_deref(), Some("01"));
        assert_eq!(rows[13].mod_fwd12_max, None);
    }

    #[test]
    fn test_all_current_has_no_serious_delinquency() {
        let output = derive_features(series("L1", &[0; 36]), SeriesOrdering::Validate, ExecutionMode::Sequential)
            .unwrap();
        assert_eq!(output.rows.len(), 36);
        assert!(output.events.serious_delinquencies.is_empty());
        assert!(output.events.is_empty());
    }

    #[test]
    fn test_serious_delinquency_first_occurrence() {
        let output = derive_features(
            series("L1", &[0, 1, 2, 3, 4, 0, 3, 0]),
            SeriesOrdering::Validate,
            ExecutionMode::Sequential,
        )
        .unwrap();

        let events = &output.events.serious_delinquencies;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].age, 3);
        assert_eq!(events[0].date, month(3));
        assert_eq!(events[0].dlq_trail12, vec![0, 1, 2]);
        assert_eq!(events[0].post_max_dlq_12, Some(4));
    }

    #[test]
    fn test_modification_first_occurrence_only() {
        let mut records = series("L1", &[0, 2, 3, 1, 0, 0]);
        for r in &mut records[2..] {
            r.modification_flag = true;
        }
        let output = derive_features(records, SeriesOrdering::Validate, ExecutionMode::Sequential).unwrap();

        let mods = &output.events.modifications;
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].loan_id, "L1");
        assert_eq!(mods[0].age, 2);
        assert_eq!(mods[0].delinquency_status, 3);
        assert_eq!(mods[0].dlq_lag1, Some(2));
        assert_eq!(mods[0].dlq_trail12, vec![0, 2]);
        assert_eq!(mods[0].post_max_dlq_12, Some(1));
    }

    #[test]
    fn test_zero_balance_extract() {
        let mut records = series("L1", &[0; 201]);
        let last = records.last_mut().unwrap();
        last.zero_balance_code = Some("01".to_string());
        last.zero_balance_date = Some(month(200));
        last.current_upb = Some(0.0);
        last.default_cost = Some(1_250.0);

        let output = derive_features(records, SeriesOrdering::Validate, ExecutionMode::Sequential).unwrap();
        assert!(output.events.modifications.is_empty());

        let zb = &output.events.zero_balances;
        assert_eq!(zb.len(), 1);
        assert_eq!(zb[0].age, 200);
        assert_eq!(zb[0].code, "01");
        assert_eq!(zb[0].zero_balance_date, Some(month(200)));
        assert_eq!(zb[0].dlq_lag1, Some(0));
        assert_eq!(zb[0].dlq_trail12.len(), 12);
        assert_eq!(zb[0].last_upb, Some(0.0));
        assert_eq!(zb[0].default_cost, Some(1_250.0));
    }

    #[test]
    fn test_first_zero_balance_row_wins() {
        let mut records = series("L1", &[0; 8]);
        records[5].zero_balance_code = Some("01".to_string());
        records[5].zero_balance_date = Some(month(5));
        records[7].zero_balance_code = Some("09".to_string());
        records[7].zero_balance_date = Some(month(7));

        let output = derive_features(records, SeriesOrdering::Validate, ExecutionMode::Sequential).unwrap();

        let zb = &output.events.zero_balances;
        assert_eq!(zb.len(), 1);
        assert_eq!(zb[0].age, 5);
        assert_eq!(zb[0].code, "01");
        assert_eq!(zb[0].zero_balance_date, Some(month(5)));
        // the later code still shows up in the forward window of earlier rows
        assert_eq!(output.rows[4].zb_code_fwd12_max.as_deref(), Some("09"));
    }

    #[test]
    fn test_windows_never_cross_loans() {
        let mut records = series("A", &[0, 0, 0]);
        records.extend(series("B", &[6, 6]));
        let output = derive_features(records, SeriesOrdering::Validate, ExecutionMode::Sequential).unwrap();

        assert_eq!(output.rows[2].record.loan_id, "A");
        assert_eq!(output.rows[2].dlq_fwd12_max, None);
        assert_eq!(output.rows[3].record.loan_id, "B");
        assert_eq!(output.rows[3].dlq_lag1, None);
        assert!(output.rows[3].dlq_trail12.is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut records = Vec::new();
        for loan in 0..40 {
            let statuses: Vec<i32> = (0..30).map(|m| (m * 7 + loan) % 5).collect();
            let mut s = series(&format!("L{loan:03}"), &statuses);
            s[(loan % 30) as usize].modification_flag = true;
            records.extend(s);
        }

        let seq = derive_features(records.clone(), SeriesOrdering::Validate, ExecutionMode::Sequential).unwrap();
        let par = derive_features(records, SeriesOrdering::Validate, ExecutionMode::Parallel).unwrap();
        assert_eq!(seq, par);
        assert_eq!(seq.events.modifications.len(), 40);
    }

    #[test]
    fn test_unordered_input_rejected_before_derivation() {
        let mut records = series("A", &[0, 0, 0]);
        records.swap(0, 2);
        let err = derive_features(records, SeriesOrdering::Validate, ExecutionMode::Parallel).unwrap_err();
        assert!(matches!(err, PipelineError::UnorderedSeries { .. }));
    }
}
