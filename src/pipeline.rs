//! Batch runner wiring the amortization engine, feature deriver and assembler

use crate::amortization::{scheduled_balances, ScheduleEntry};
use crate::error::Result;
use crate::features::{derive_features, ExecutionMode, SeriesOrdering};
use crate::lifecycle::{assemble_loans, assemble_performance, LoanMonth, LoanSummary};
use crate::loan::{Loan, PerformanceRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;

/// Configuration for a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Months of scheduled balance computed from origination, used to fill
    /// blank UPBs. Zero disables back-filling.
    pub schedule_horizon: u32,

    /// What to do with a loan whose observations are out of date order
    pub ordering: SeriesOrdering,

    pub execution: ExecutionMode,

    /// Release label carried into the outputs (e.g. "2008Q1")
    pub vintage: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schedule_horizon: 12,
            ordering: SeriesOrdering::Validate,
            execution: ExecutionMode::Sequential,
            vintage: None,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config; absent fields keep their defaults
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }
}

/// Everything a batch produces
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub vintage: Option<String>,
    /// Long-format scheduled balances, matured cells included
    pub schedule: Vec<ScheduleEntry>,
    pub loan_months: Vec<LoanMonth>,
    pub loans: Vec<LoanSummary>,
}

/// Runs one batch end to end
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one batch.
    ///
    /// `loans` is the origination table when available; without it no
    /// schedule is computed and the loan-level table holds only loans that
    /// have at least one event. Any error aborts the whole batch.
    pub fn run(
        &self,
        loans: Option<Vec<Loan>>,
        performance: Vec<PerformanceRecord>,
    ) -> Result<PipelineOutput> {
        let started = Instant::now();
        let label = self.config.vintage.as_deref().unwrap_or("unlabelled");
        log::info!(
            "processing batch {}: {} loans, {} performance rows",
            label,
            loans.as_ref().map_or(0, Vec::len),
            performance.len()
        );

        let stage = Instant::now();
        let schedule = match &loans {
            Some(loans) if self.config.schedule_horizon > 0 => {
                scheduled_balances(loans, self.config.schedule_horizon)?
            }
            _ => Vec::new(),
        };
        log::info!(
            "schedule: {} entries in {} ms",
            schedule.len(),
            stage.elapsed().as_millis()
        );

        let features = derive_features(performance, self.config.ordering, self.config.execution)?;

        let stage = Instant::now();
        let records: Vec<PerformanceRecord> =
            features.rows.into_iter().map(|row| row.record).collect();
        let loan_months = assemble_performance(records, &schedule);
        let summaries = assemble_loans(loans, features.events);
        log::info!(
            "assembled {} loan-months and {} loan summaries in {} ms",
            loan_months.len(),
            summaries.len(),
            stage.elapsed().as_millis()
        );

        log::info!("batch {} finished in {} ms", label, started.elapsed().as_millis());

        Ok(PipelineOutput {
            vintage: self.config.vintage.clone(),
            schedule,
            loan_months,
            loans: summaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::{compute_amortization, MonthlyRates, MATURED_SENTINEL};
    use crate::error::PipelineError;
    use approx::assert_abs_diff_eq;
    use chrono::{Months, NaiveDate};

    fn three_loans() -> Vec<Loan> {
        vec![
            Loan::new("100001", 100_000.0, 4.8, 360),
            Loan::new("100002", 200_000.0, 6.0, 180),
            Loan::new("100003", 150_000.0, 5.4, 240),
        ]
    }

    /// Monthly history for one loan, ages 0..=last, terminating at `last`
    fn terminated_history(loan: &str, last: i32) -> Vec<PerformanceRecord> {
        let origin = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        (0..=last)
            .map(|age| {
                let date = origin + Months::new(age as u32);
                let mut r = PerformanceRecord::new(loan, date, age, 0);
                if age == last {
                    r.zero_balance_code = Some("01".to_string());
                    r.zero_balance_date = Some(date);
                }
                r
            })
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.schedule_horizon, 12);
        assert_eq!(config.ordering, SeriesOrdering::Validate);
        assert_eq!(config.execution, ExecutionMode::Sequential);
        assert!(config.vintage.is_none());
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{"schedule_horizon": 24, "execution": "parallel", "vintage": "2008Q1"}"#;
        let config = PipelineConfig::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(config.schedule_horizon, 24);
        assert_eq!(config.execution, ExecutionMode::Parallel);
        assert_eq!(config.ordering, SeriesOrdering::Validate);
        assert_eq!(config.vintage.as_deref(), Some("2008Q1"));
    }

    #[test]
    fn test_config_rejects_unknown_ordering() {
        let err = PipelineConfig::from_json_reader(r#"{"ordering": "shuffle"}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));
    }

    #[test]
    fn test_three_loan_scenario() {
        let loans = three_loans();
        let principals: Vec<f64> = loans.iter().map(|l| l.principal).collect();
        let rates: Vec<f64> = loans.iter().map(Loan::monthly_rate).collect();
        let terms: Vec<u32> = loans.iter().map(|l| l.term_months).collect();

        let matrix = compute_amortization(&principals, MonthlyRates::Fixed(&rates), &terms, 0, 12).unwrap();
        assert_eq!(matrix.loans(), 3);
        assert_eq!(matrix.ages(), 12);
        for loan in 0..3 {
            let row = matrix.row(loan);
            assert!(row.iter().all(|&v| v != MATURED_SENTINEL));
            assert!(row.windows(2).all(|w| w[1] < w[0]));
        }

        let pipeline = Pipeline::new(PipelineConfig::default());
        let output = pipeline.run(Some(loans), terminated_history("100001", 200)).unwrap();

        assert_eq!(output.schedule.len(), 36);
        assert_eq!(output.loans.len(), 3);

        let first = &output.loans[0];
        assert_eq!(first.loan_id, "100001");
        let zb = first.zero_balance.as_ref().unwrap();
        assert_eq!(zb.age, 200);
        assert_eq!(zb.code, "01");
        assert!(first.modification.is_none());
        assert!(first.serious_delinquency.is_none());
        assert!(output.loans[1..].iter().all(|s| s.zero_balance.is_none()));
    }

    #[test]
    fn test_blank_balances_filled_within_horizon() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let output = pipeline.run(Some(three_loans()), terminated_history("100001", 30)).unwrap();

        assert_eq!(output.loan_months.len(), 31);
        assert_abs_diff_eq!(output.loan_months[0].current_upb.unwrap(), 100_000.0);
        assert!(output.loan_months[11].current_upb.is_some());
        assert!(output.loan_months[12].current_upb.is_none());

        let upbs: Vec<f64> = output.loan_months[..12].iter().filter_map(|m| m.current_upb).collect();
        assert!(upbs.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_without_loan_table() {
        let mut performance = terminated_history("B", 5);
        performance.extend(terminated_history("A", 3));
        let output = Pipeline::default().run(None, performance).unwrap();

        assert!(output.schedule.is_empty());
        assert!(output.loan_months.iter().all(|m| m.current_upb.is_none()));
        let ids: Vec<&str> = output.loans.iter().map(|s| s.loan_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(output.loan_months[0].loan_id, "A");
    }

    #[test]
    fn test_zero_horizon_disables_schedule() {
        let config = PipelineConfig {
            schedule_horizon: 0,
            ..Default::default()
        };
        let output = Pipeline::new(config).run(Some(three_loans()), terminated_history("100001", 3)).unwrap();
        assert!(output.schedule.is_empty());
        assert!(output.loan_months[0].current_upb.is_none());
    }

    #[test]
    fn test_invalid_rate_aborts_batch() {
        let loans = vec![Loan::new("Z", 100_000.0, 0.0, 360)];
        let err = Pipeline::default().run(Some(loans), terminated_history("Z", 3)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRate { index: 0, .. }));
    }

    #[test]
    fn test_unordered_input_aborts_batch() {
        let mut performance = terminated_history("A", 3);
        performance.swap(1, 2);
        let err = Pipeline::default().run(None, performance).unwrap_err();
        assert!(matches!(err, PipelineError::UnorderedSeries { .. }));

        let config = PipelineConfig {
            ordering: SeriesOrdering::Sort,
            ..Default::default()
        };
        let mut performance = terminated_history("A", 3);
        performance.swap(1, 2);
        let output = Pipeline::new(config).run(None, performance).unwrap();
        assert_eq!(output.loan_months.len(), 4);
    }
}
