//! CSV and JSON writers for the assembled tables

use crate::error::Result;
use crate::lifecycle::{LoanMonth, LoanSummary};
use crate::pipeline::PipelineOutput;
use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write the loan-month table with the performance schema's retained column names
pub fn write_loan_months_csv<W: Write>(writer: W, months: &[LoanMonth]) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    for month in months {
        csv_writer.serialize(month)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Flat loan-level row: origination attributes followed by the three events
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    #[serde(rename = "LOAN_ID")]
    loan_id: &'a str,
    #[serde(rename = "VINTAGE")]
    vintage: Option<&'a str>,

    #[serde(rename = "ORIG_CHN")]
    channel: Option<&'a str>,
    #[serde(rename = "ORIG_RT")]
    annual_rate: Option<f64>,
    #[serde(rename = "ORIG_AMT")]
    principal: Option<f64>,
    #[serde(rename = "ORIG_TRM")]
    term_months: Option<u32>,
    #[serde(rename = "ORIG_DTE")]
    origination_date: Option<NaiveDate>,
    #[serde(rename = "FRST_DTE")]
    first_payment_date: Option<NaiveDate>,
    #[serde(rename = "OLTV")]
    ltv: Option<f64>,
    #[serde(rename = "OCLTV")]
    cltv: Option<f64>,
    #[serde(rename = "NUM_BO")]
    borrower_count: Option<i64>,
    #[serde(rename = "DTI")]
    dti: Option<i64>,
    #[serde(rename = "CSCORE_B")]
    credit_score: Option<f64>,
    #[serde(rename = "CSCORE_C")]
    co_borrower_credit_score: Option<i64>,
    #[serde(rename = "FTHB_FLG")]
    first_time_buyer: Option<&'a str>,
    #[serde(rename = "PURPOSE")]
    purpose: Option<&'a str>,
    #[serde(rename = "PROP_TYP")]
    property_type: Option<&'a str>,
    #[serde(rename = "NUM_UNIT")]
    units: Option<i64>,
    #[serde(rename = "OCC_STAT")]
    occupancy: Option<&'a str>,
    #[serde(rename = "STATE")]
    state: Option<&'a str>,
    #[serde(rename = "ZIP_3")]
    zip3: Option<&'a str>,
    #[serde(rename = "MI_PCT")]
    mi_pct: Option<i64>,
    #[serde(rename = "MI_TYPE")]
    mi_type: Option<&'a str>,
    #[serde(rename = "Product_Type")]
    product_type: Option<&'a str>,
    #[serde(rename = "RELOCATION_FLG")]
    relocation: Option<&'a str>,

    #[serde(rename = "MOD_DTE")]
    mod_date: Option<NaiveDate>,
    #[serde(rename = "MOD_AGE")]
    mod_age: Option<i32>,
    #[serde(rename = "MOD_DLQ_STATUS")]
    mod_dlq_status: Option<i32>,
    #[serde(rename = "MOD_DLQ_LAG1")]
    mod_dlq_lag1: Option<i32>,
    #[serde(rename = "MOD_DLQ_TRAIL12")]
    mod_dlq_trail12: Option<String>,
    #[serde(rename = "MOD_POST_MAX_DLQ_12")]
    mod_post_max_dlq_12: Option<i32>,
    #[serde(rename = "MOD_POST_MAX_DLQ_24")]
    mod_post_max_dlq_24: Option<i32>,
    #[serde(rename = "MOD_POST_ZB_CODE_12")]
    mod_post_zb_code_12: Option<&'a str>,
    #[serde(rename = "MOD_POST_ZB_CODE_24")]
    mod_post_zb_code_24: Option<&'a str>,

    #[serde(rename = "SDQ_DTE")]
    sdq_date: Option<NaiveDate>,
    #[serde(rename = "SDQ_AGE")]
    sdq_age: Option<i32>,
    #[serde(rename = "SDQ_DLQ_TRAIL12")]
    sdq_dlq_trail12: Option<String>,
    #[serde(rename = "SDQ_POST_MAX_DLQ_12")]
    sdq_post_max_dlq_12: Option<i32>,
    #[serde(rename = "SDQ_POST_MAX_DLQ_24")]
    sdq_post_max_dlq_24: Option<i32>,
    #[serde(rename = "SDQ_POST_ZB_CODE_12")]
    sdq_post_zb_code_12: Option<&'a str>,
    #[serde(rename = "SDQ_POST_ZB_CODE_24")]
    sdq_post_zb_code_24: Option<&'a str>,

    #[serde(rename = "ZB_CODE")]
    zb_code: Option<&'a str>,
    #[serde(rename = "ZB_DTE")]
    zb_date: Option<NaiveDate>,
    #[serde(rename = "ZB_AGE")]
    zb_age: Option<i32>,
    #[serde(rename = "ZB_DLQ_LAG1")]
    zb_dlq_lag1: Option<i32>,
    #[serde(rename = "ZB_DLQ_TRAIL12")]
    zb_dlq_trail12: Option<String>,
    #[serde(rename = "ZB_LAST_UPB")]
    zb_last_upb: Option<f64>,
    #[serde(rename = "LPI_DTE")]
    last_paid_installment_date: Option<NaiveDate>,
    #[serde(rename = "FCC_DTE")]
    foreclosure_date: Option<NaiveDate>,
    #[serde(rename = "DISP_DTE")]
    disposition_date: Option<NaiveDate>,
    #[serde(rename = "DEFAULT_COST")]
    default_cost: Option<f64>,
    #[serde(rename = "DEFAULT_PROCEEDS")]
    default_proceeds: Option<f64>,
}

/// Trailing statuses as a bracketed list, e.g. `[0,0,1]`
fn encode_trail(trail: &[i32]) -> String {
    let items: Vec<String> = trail.iter().map(i32::to_string).collect();
    format!("[{}]", items.join(","))
}

impl<'a> SummaryRow<'a> {
    fn new(summary: &'a LoanSummary, vintage: Option<&'a str>) -> Self {
        let loan = summary.loan.as_ref();
        let m = summary.modification.as_ref();
        let s = summary.serious_delinquency.as_ref();
        let z = summary.zero_balance.as_ref();

        Self {
            loan_id: &summary.loan_id,
            vintage,

            channel: loan.and_then(|l| l.channel.as_deref()),
            annual_rate: loan.map(|l| l.annual_rate),
            principal: loan.map(|l| l.principal),
            term_months: loan.map(|l| l.term_months),
            origination_date: loan.and_then(|l| l.origination_date),
            first_payment_date: loan.and_then(|l| l.first_payment_date),
            ltv: loan.map(|l| l.ltv),
            cltv: loan.map(|l| l.cltv),
            borrower_count: loan.map(|l| l.borrower_count),
            dti: loan.map(|l| l.dti),
            credit_score: loan.map(|l| l.credit_score),
            co_borrower_credit_score: loan.map(|l| l.co_borrower_credit_score),
            first_time_buyer: loan.and_then(|l| l.first_time_buyer.as_deref()),
            purpose: loan.and_then(|l| l.purpose.as_deref()),
            property_type: loan.and_then(|l| l.property_type.as_deref()),
            units: loan.map(|l| l.units),
            occupancy: loan.and_then(|l| l.occupancy.as_deref()),
            state: loan.and_then(|l| l.state.as_deref()),
            zip3: loan.and_then(|l| l.zip3.as_deref()),
            mi_pct: loan.map(|l| l.mi_pct),
            mi_type: loan.map(|l| l.mi_type.as_str()),
            product_type: loan.and_then(|l| l.product_type.as_deref()),
            relocation: loan.and_then(|l| l.relocation.as_deref()),

            mod_date: m.map(|e| e.date),
            mod_age: m.map(|e| e.age),
            mod_dlq_status: m.map(|e| e.delinquency_status),
            mod_dlq_lag1: m.and_then(|e| e.dlq_lag1),
            mod_dlq_trail12: m.map(|e| encode_trail(&e.dlq_trail12)),
            mod_post_max_dlq_12: m.and_then(|e| e.post_max_dlq_12),
            mod_post_max_dlq_24: m.and_then(|e| e.post_max_dlq_24),
            mod_post_zb_code_12: m.and_then(|e| e.post_zb_code_12.as_deref()),
            mod_post_zb_code_24: m.and_then(|e| e.post_zb_code_24.as_deref()),

            sdq_date: s.map(|e| e.date),
            sdq_age: s.map(|e| e.age),
            sdq_dlq_trail12: s.map(|e| encode_trail(&e.dlq_trail12)),
            sdq_post_max_dlq_12: s.and_then(|e| e.post_max_dlq_12),
            sdq_post_max_dlq_24: s.and_then(|e| e.post_max_dlq_24),
            sdq_post_zb_code_12: s.and_then(|e| e.post_zb_code_12.as_deref()),
            sdq_post_zb_code_24: s.and_then(|e| e.post_zb_code_24.as_deref()),

            zb_code: z.map(|e| e.code.as_str()),
            zb_date: z.and_then(|e| e.zero_balance_date),
            zb_age: z.map(|e| e.age),
            zb_dlq_lag1: z.and_then(|e| e.dlq_lag1),
            zb_dlq_trail12: z.map(|e| encode_trail(&e.dlq_trail12)),
            zb_last_upb: z.and_then(|e| e.last_upb),
            last_paid_installment_date: z.and_then(|e| e.last_paid_installment_date),
            foreclosure_date: z.and_then(|e| e.foreclosure_date),
            disposition_date: z.and_then(|e| e.disposition_date),
            default_cost: z.and_then(|e| e.default_cost),
            default_proceeds: z.and_then(|e| e.default_proceeds),
        }
    }
}

/// Write the loan-level table as one flat row per loan
pub fn write_loan_summaries_csv<W: Write>(
    writer: W,
    summaries: &[LoanSummary],
    vintage: Option<&str>,
) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    for summary in summaries {
        csv_writer.serialize(SummaryRow::new(summary, vintage))?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    vintage: Option<&'a str>,
    loans: &'a [LoanSummary],
}

/// Write the loan-level table as pretty-printed JSON, events nested per loan
pub fn write_summaries_json<W: Write>(
    writer: W,
    summaries: &[LoanSummary],
    vintage: Option<&str>,
) -> Result<()> {
    let document = SummaryDocument {
        vintage,
        loans: summaries,
    };
    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}

/// Write every output table of a batch into `out_dir`, creating it if needed.
///
/// File names are prefixed with the vintage label when one is set. Returns
/// the paths written.
pub fn write_outputs(out_dir: &Path, output: &PipelineOutput) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let prefix = output
        .vintage
        .as_deref()
        .map(|v| format!("{v}_"))
        .unwrap_or_default();
    let vintage = output.vintage.as_deref();

    let months_path = out_dir.join(format!("{prefix}loan_months.csv"));
    write_loan_months_csv(BufWriter::new(File::create(&months_path)?), &output.loan_months)?;

    let summary_path = out_dir.join(format!("{prefix}loan_summaries.csv"));
    write_loan_summaries_csv(BufWriter::new(File::create(&summary_path)?), &output.loans, vintage)?;

    let json_path = out_dir.join(format!("{prefix}loan_summaries.json"));
    let mut json_writer = BufWriter::new(File::create(&json_path)?);
    write_summaries_json(&mut json_writer, &output.loans, vintage)?;
    json_writer.flush()?;

    log::info!(
        "wrote {} loan-months and {} loan summaries to {}",
        output.loan_months.len(),
        output.loans.len(),
        out_dir.display()
    );

    Ok(vec![months_path, summary_path, json_path])
}
