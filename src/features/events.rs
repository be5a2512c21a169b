//! First-occurrence event extracts: modification, serious delinquency, zero balance

use super::deriver::FeatureRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// First month a loan reports a modification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationEvent {
    pub loan_id: String,
    pub date: NaiveDate,
    pub age: i32,
    pub delinquency_status: i32,
    pub dlq_lag1: Option<i32>,
    pub dlq_trail12: Vec<i32>,
    pub post_max_dlq_12: Option<i32>,
    pub post_max_dlq_24: Option<i32>,
    pub post_zb_code_12: Option<String>,
    pub post_zb_code_24: Option<String>,
}

impl ModificationEvent {
    fn from_row(row: &FeatureRow) -> Self {
        Self {
            loan_id: row.record.loan_id.clone(),
            date: row.record.observation_date,
            age: row.record.loan_age,
            delinquency_status: row.record.delinquency_status,
            dlq_lag1: row.dlq_lag1,
            dlq_trail12: row.dlq_trail12.clone(),
            post_max_dlq_12: row.dlq_fwd12_max,
            post_max_dlq_24: row.dlq_fwd24_max,
            post_zb_code_12: row.zb_code_fwd12_max.clone(),
            post_zb_code_24: row.zb_code_fwd24_max.clone(),
        }
    }
}

/// First month a loan is more than two payments behind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriousDelinquencyEvent {
    pub loan_id: String,
    pub date: NaiveDate,
    pub age: i32,
    pub dlq_trail12: Vec<i32>,
    pub post_max_dlq_12: Option<i32>,
    pub post_max_dlq_24: Option<i32>,
    pub post_zb_code_12: Option<String>,
    pub post_zb_code_24: Option<String>,
}

impl SeriousDelinquencyEvent {
    fn from_row(row: &FeatureRow) -> Self {
        Self {
            loan_id: row.record.loan_id.clone(),
            date: row.record.observation_date,
            age: row.record.loan_age,
            dlq_trail12: row.dlq_trail12.clone(),
            post_max_dlq_12: row.dlq_fwd12_max,
            post_max_dlq_24: row.dlq_fwd24_max,
            post_zb_code_12: row.zb_code_fwd12_max.clone(),
            post_zb_code_24: row.zb_code_fwd24_max.clone(),
        }
    }
}

/// Terminating observation of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroBalanceEvent {
    pub loan_id: String,
    pub code: String,
    pub zero_balance_date: Option<NaiveDate>,
    pub age: i32,
    pub dlq_lag1: Option<i32>,
    pub dlq_trail12: Vec<i32>,
    pub last_upb: Option<f64>,
    pub last_paid_installment_date: Option<NaiveDate>,
    pub foreclosure_date: Option<NaiveDate>,
    pub disposition_date: Option<NaiveDate>,
    pub default_cost: Option<f64>,
    pub default_proceeds: Option<f64>,
}

impl ZeroBalanceEvent {
    fn from_row(row: &FeatureRow, code: &str) -> Self {
        let r = &row.record;
        Self {
            loan_id: r.loan_id.clone(),
            code: code.to_string(),
            zero_balance_date: r.zero_balance_date,
            age: r.loan_age,
            dlq_lag1: row.dlq_lag1,
            dlq_trail12: row.dlq_trail12.clone(),
            last_upb: r.current_upb,
            last_paid_installment_date: r.last_paid_installment_date,
            foreclosure_date: r.foreclosure_date,
            disposition_date: r.disposition_date,
            default_cost: r.default_cost,
            default_proceeds: r.default_proceeds,
        }
    }
}

/// The three extracts for a batch, each holding at most one row per loan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventExtracts {
    pub modifications: Vec<ModificationEvent>,
    pub serious_delinquencies: Vec<SeriousDelinquencyEvent>,
    pub zero_balances: Vec<ZeroBalanceEvent>,
}

impl EventExtracts {
    /// Extract first occurrences from one loan's time-ordered feature rows
    pub fn from_loan(rows: &[FeatureRow]) -> Self {
        let modifications = rows
            .iter()
            .find(|r| r.record.modification_flag)
            .map(ModificationEvent::from_row);

        let serious_delinquencies = rows
            .iter()
            .find(|r| r.record.is_seriously_delinquent())
            .map(SeriousDelinquencyEvent::from_row);

        let zero_balances = rows.iter().find_map(|r| {
            r.record
                .zero_balance_code
                .as_deref()
                .map(|code| ZeroBalanceEvent::from_row(r, code))
        });

        Self {
            modifications: modifications.into_iter().collect(),
            serious_delinquencies: serious_delinquencies.into_iter().collect(),
            zero_balances: zero_balances.into_iter().collect(),
        }
    }

    /// Append another batch's extracts
    pub fn append(&mut self, mut other: EventExtracts) {
        self.modifications.append(&mut other.modifications);
        self.serious_delinquencies.append(&mut other.serious_delinquencies);
        self.zero_balances.append(&mut other.zero_balances);
    }

    /// Distinct loan ids across all three extracts, sorted
    pub fn loan_ids(&self) -> BTreeSet<&str> {
        self.modifications
            .iter()
            .map(|e| e.loan_id.as_str())
            .chain(self.serious_delinquencies.iter().map(|e| e.loan_id.as_str()))
            .chain(self.zero_balances.iter().map(|e| e.loan_id.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty()
            && self.serious_delinquencies.is_empty()
            && self.zero_balances.is_empty()
    }
}
