//! Loan and monthly performance records as they come out of the disclosure files

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Delinquency code for an empty status cell
pub const DLQ_MISSING: i32 = -1;

/// Delinquency code for the "X" (unknown) marker
pub const DLQ_UNKNOWN: i32 = -2;

/// Statuses strictly above this count as serious delinquency (90+ days)
pub const SERIOUS_DELINQUENCY_THRESHOLD: i32 = 2;

/// Static origination attributes of one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Unique loan identifier
    pub loan_id: String,

    /// Origination channel (R = retail, B = broker, C = correspondent)
    pub channel: Option<String>,

    /// Note rate in percent (4.5 means 4.5%)
    pub annual_rate: f64,

    /// Original principal balance
    pub principal: f64,

    /// Original term in months
    pub term_months: u32,

    pub origination_date: Option<NaiveDate>,
    pub first_payment_date: Option<NaiveDate>,

    /// Original loan-to-value
    pub ltv: f64,

    /// Original combined loan-to-value (falls back to LTV when not reported)
    pub cltv: f64,

    pub borrower_count: i64,
    pub dti: i64,
    pub credit_score: f64,
    pub co_borrower_credit_score: i64,
    pub first_time_buyer: Option<String>,
    pub purpose: Option<String>,
    pub property_type: Option<String>,
    pub units: i64,
    pub occupancy: Option<String>,
    pub state: Option<String>,
    pub zip3: Option<String>,
    pub mi_pct: i64,
    pub mi_type: String,
    pub product_type: Option<String>,
    pub relocation: Option<String>,
}

impl Loan {
    /// Create a loan with only the amortization inputs populated
    pub fn new(
        loan_id: impl Into<String>,
        principal: f64,
        annual_rate: f64,
        term_months: u32,
    ) -> Self {
        Self {
            loan_id: loan_id.into(),
            channel: None,
            annual_rate,
            principal,
            term_months,
            origination_date: None,
            first_payment_date: None,
            ltv: 0.0,
            cltv: 0.0,
            borrower_count: -1,
            dti: -1,
            credit_score: -1.0,
            co_borrower_credit_score: -1,
            first_time_buyer: None,
            purpose: None,
            property_type: None,
            units: -1,
            occupancy: None,
            state: None,
            zip3: None,
            mi_pct: 0,
            mi_type: "0".to_string(),
            product_type: None,
            relocation: None,
        }
    }

    /// Note rate as a monthly decimal
    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate / 1200.0
    }
}

/// One monthly servicing observation for a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub loan_id: String,

    /// Monthly reporting period
    pub observation_date: NaiveDate,

    /// Current note rate in percent
    pub current_rate: Option<f64>,

    /// Current actual UPB; often blank early in a loan's life
    pub current_upb: Option<f64>,

    /// Months since origination; negative for pre-origination artifacts
    pub loan_age: i32,

    pub months_to_maturity: i64,
    pub adj_months_to_maturity: i64,
    pub maturity_date: Option<NaiveDate>,

    /// Ordinal delinquency: `DLQ_MISSING`, `DLQ_UNKNOWN`, 0 current, n months behind
    pub delinquency_status: i32,

    pub modification_flag: bool,

    /// Present only on the terminating observation
    pub zero_balance_code: Option<String>,
    pub zero_balance_date: Option<NaiveDate>,

    pub last_paid_installment_date: Option<NaiveDate>,
    pub foreclosure_date: Option<NaiveDate>,
    pub disposition_date: Option<NaiveDate>,

    /// Foreclosure, preservation, recovery, miscellaneous and tax costs
    pub default_cost: Option<f64>,

    /// Net sale, credit enhancement, repurchase and other proceeds
    pub default_proceeds: Option<f64>,

    pub non_interest_upb: Option<f64>,
    pub principal_forgiveness_upb: Option<f64>,
    pub repurchase_flag: Option<String>,
    pub principal_forgiveness_other: Option<String>,
    pub servicing_transfer_flag: Option<String>,
}

impl PerformanceRecord {
    /// Create an observation with the ordering and status fields populated
    pub fn new(
        loan_id: impl Into<String>,
        observation_date: NaiveDate,
        loan_age: i32,
        delinquency_status: i32,
    ) -> Self {
        Self {
            loan_id: loan_id.into(),
            observation_date,
            current_rate: None,
            current_upb: None,
            loan_age,
            months_to_maturity: -1,
            adj_months_to_maturity: -1,
            maturity_date: None,
            delinquency_status,
            modification_flag: false,
            zero_balance_code: None,
            zero_balance_date: None,
            last_paid_installment_date: None,
            foreclosure_date: None,
            disposition_date: None,
            default_cost: None,
            default_proceeds: None,
            non_interest_upb: None,
            principal_forgiveness_upb: None,
            repurchase_flag: None,
            principal_forgiveness_other: None,
            servicing_transfer_flag: None,
        }
    }

    pub fn is_seriously_delinquent(&self) -> bool {
        self.delinquency_status > SERIOUS_DELINQUENCY_THRESHOLD
    }
}

/// Decode a raw delinquency cell; `None` when the text is not a status code
pub fn parse_delinquency(raw: Option<&str>) -> Option<i32> {
    match raw.map(str::trim) {
        None | Some("") => Some(DLQ_MISSING),
        Some("X") => Some(DLQ_UNKNOWN),
        Some(code) => code.parse().ok(),
    }
}
