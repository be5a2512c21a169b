//! Joins schedule, observations and event extracts into the two output tables

use crate::amortization::ScheduleEntry;
use crate::features::{EventExtracts, ModificationEvent, SeriousDelinquencyEvent, ZeroBalanceEvent};
use crate::loan::{Loan, PerformanceRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One row of the loan-month performance table.
///
/// Serialized field names follow the retained columns of the performance schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanMonth {
    #[serde(rename = "LOAN_ID")]
    pub loan_id: String,
    #[serde(rename = "ACT_DTE")]
    pub observation_date: NaiveDate,
    #[serde(rename = "LAST_RT")]
    pub current_rate: Option<f64>,
    #[serde(rename = "LAST_UPB")]
    pub current_upb: Option<f64>,
    #[serde(rename = "LOAN_AGE")]
    pub loan_age: i32,
    #[serde(rename = "Months_To_Legal_Mat")]
    pub months_to_maturity: i64,
    #[serde(rename = "Adj_Month_To_Mat")]
    pub adj_months_to_maturity: i64,
    #[serde(rename = "Maturity_Date")]
    pub maturity_date: Option<NaiveDate>,
    #[serde(rename = "DLQ_STATUS")]
    pub delinquency_status: i32,
    #[serde(rename = "NON_INT_UPB")]
    pub non_interest_upb: Option<f64>,
    #[serde(rename = "PRIN_FORG_UPB_FHFA")]
    pub principal_forgiveness_upb: Option<f64>,
    #[serde(rename = "REPCH_FLAG")]
    pub repurchase_flag: Option<String>,
    #[serde(rename = "PRIN_FORG_UPB_OTH")]
    pub principal_forgiveness_other: Option<String>,
    #[serde(rename = "TRANSFER_FLG")]
    pub servicing_transfer_flag: Option<String>,
}

impl From<PerformanceRecord> for LoanMonth {
    fn from(r: PerformanceRecord) -> Self {
        Self {
            loan_id: r.loan_id,
            observation_date: r.observation_date,
            current_rate: r.current_rate,
            current_upb: r.current_upb,
            loan_age: r.loan_age,
            months_to_maturity: r.months_to_maturity,
            adj_months_to_maturity: r.adj_months_to_maturity,
            maturity_date: r.maturity_date,
            delinquency_status: r.delinquency_status,
            non_interest_upb: r.non_interest_upb,
            principal_forgiveness_upb: r.principal_forgiveness_upb,
            repurchase_flag: r.repurchase_flag,
            principal_forgiveness_other: r.principal_forgiveness_other,
            servicing_transfer_flag: r.servicing_transfer_flag,
        }
    }
}

/// One row of the loan-level table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub loan_id: String,
    /// Origination attributes, when a loan table was supplied
    pub loan: Option<Loan>,
    pub modification: Option<ModificationEvent>,
    pub serious_delinquency: Option<SeriousDelinquencyEvent>,
    pub zero_balance: Option<ZeroBalanceEvent>,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Build the loan-month table.
///
/// Observations are left-joined to the schedule on `(loan_id, age)`; a blank
/// UPB takes the scheduled balance rounded to 3 decimals. Matured schedule
/// cells never fill. Rows with negative age are discarded. The result is
/// ordered by loan id, then observation date.
pub fn assemble_performance(
    records: Vec<PerformanceRecord>,
    schedule: &[ScheduleEntry],
) -> Vec<LoanMonth> {
    let scheduled: HashMap<(&str, u32), f64> = schedule
        .iter()
        .filter(|e| !e.is_matured())
        .map(|e| ((e.loan_id.as_str(), e.loan_age), e.scheduled_upb))
        .collect();

    let mut filled = 0usize;
    let mut months: Vec<LoanMonth> = records
        .into_iter()
        .filter(|r| r.loan_age >= 0)
        .map(|mut r| {
            if r.current_upb.is_none() {
                let key = (r.loan_id.as_str(), r.loan_age as u32);
                if let Some(&upb) = scheduled.get(&key) {
                    r.current_upb = Some(round3(upb));
                    filled += 1;
                }
            }
            LoanMonth::from(r)
        })
        .collect();

    months.sort_by(|a, b| {
        a.loan_id
            .cmp(&b.loan_id)
            .then(a.observation_date.cmp(&b.observation_date))
    });

    log::debug!("assembled {} loan-months, {} balances filled from schedule", months.len(), filled);
    months
}

/// Build the loan-level table.
///
/// With a loan table every loan is kept and the extracts are left-joined onto
/// it; without one the table is the distinct union of loan ids across the
/// extracts. Ordered by loan id.
pub fn assemble_loans(loans: Option<Vec<Loan>>, events: EventExtracts) -> Vec<LoanSummary> {
    let loan_ids: Vec<String> = match &loans {
        Some(loans) => loans.iter().map(|l| l.loan_id.clone()).collect(),
        None => events.loan_ids().into_iter().map(str::to_string).collect(),
    };

    let mut modifications: HashMap<String, ModificationEvent> =
        events.modifications.into_iter().map(|e| (e.loan_id.clone(), e)).collect();
    let mut delinquencies: HashMap<String, SeriousDelinquencyEvent> = events
        .serious_delinquencies
        .into_iter()
        .map(|e| (e.loan_id.clone(), e))
        .collect();
    let mut zero_balances: HashMap<String, ZeroBalanceEvent> =
        events.zero_balances.into_iter().map(|e| (e.loan_id.clone(), e)).collect();

    let mut by_id: BTreeMap<String, Loan> = BTreeMap::new();
    if let Some(loans) = loans {
        for loan in loans {
            by_id.entry(loan.loan_id.clone()).or_insert(loan);
        }
    }

    let mut ids = loan_ids;
    ids.sort();
    ids.dedup();

    ids.into_iter()
        .map(|loan_id| LoanSummary {
            loan: by_id.remove(&loan_id),
            modification: modifications.remove(&loan_id),
            serious_delinquency: delinquencies.remove(&loan_id),
            zero_balance: zero_balances.remove(&loan_id),
            loan_id,
        })
        .collect()
}
