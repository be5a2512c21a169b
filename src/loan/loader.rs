//! Load acquisition and performance files into typed records

use super::data::{parse_delinquency, Loan, PerformanceRecord};
use crate::error::{PipelineError, Result};
use crate::schema::{read_table, TypedTable, Value, ACQUISITION, PERFORMANCE};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Load all loans from an acquisition file
pub fn load_loans<P: AsRef<Path>>(path: P) -> Result<Vec<Loan>> {
    load_loans_from_reader(BufReader::new(File::open(path)?))
}

/// Load loans from any reader (e.g., string buffer, decompressed stream)
pub fn load_loans_from_reader<R: Read>(reader: R) -> Result<Vec<Loan>> {
    let table = read_table(reader, &ACQUISITION)?.without_dropped();
    loans_from_table(&table)
}

/// Load all observations from a performance file
pub fn load_performance<P: AsRef<Path>>(path: P) -> Result<Vec<PerformanceRecord>> {
    load_performance_from_reader(BufReader::new(File::open(path)?))
}

/// Load observations from any reader
pub fn load_performance_from_reader<R: Read>(reader: R) -> Result<Vec<PerformanceRecord>> {
    // Dropped performance columns still feed the event extracts, so keep them here
    let table = read_table(reader, &PERFORMANCE)?;
    performance_from_table(&table)
}

/// Cell accessor that turns absent required values into parse errors
struct Cells<'a> {
    table: &'a TypedTable,
    row: &'a [Value],
    line: u64,
}

impl<'a> Cells<'a> {
    fn text(&self, idx: usize) -> Option<String> {
        self.row[idx].as_str().map(str::to_string)
    }

    fn float(&self, idx: usize) -> Option<f64> {
        self.row[idx].as_f64()
    }

    fn int(&self, idx: usize) -> Option<i64> {
        self.row[idx].as_i64()
    }

    fn date(&self, idx: usize) -> Option<NaiveDate> {
        self.row[idx].as_date()
    }

    fn missing(&self, idx: usize, expected: &'static str) -> PipelineError {
        let value = match &self.row[idx] {
            Value::Null => String::new(),
            other => format!("{:?}", other),
        };
        PipelineError::Parse {
            column: self.table.columns[idx].name.to_string(),
            value,
            expected,
            line: self.line,
        }
    }

    fn required_text(&self, idx: usize) -> Result<String> {
        self.text(idx).ok_or_else(|| self.missing(idx, "string"))
    }

    fn required_float(&self, idx: usize) -> Result<f64> {
        self.float(idx).ok_or_else(|| self.missing(idx, "float"))
    }

    fn required_int(&self, idx: usize) -> Result<i64> {
        self.int(idx).ok_or_else(|| self.missing(idx, "int"))
    }

    fn required_date(&self, idx: usize) -> Result<NaiveDate> {
        self.date(idx).ok_or_else(|| self.missing(idx, "date"))
    }

    /// Sum of all components; `None` as soon as any one is blank
    fn sum(&self, idxs: &[usize]) -> Option<f64> {
        idxs.iter().map(|&i| self.float(i)).sum()
    }
}

fn rows(table: &TypedTable) -> impl Iterator<Item = Cells<'_>> {
    table.rows.iter().zip(&table.lines).map(move |(row, &line)| Cells {
        table,
        row,
        line,
    })
}

fn loans_from_table(table: &TypedTable) -> Result<Vec<Loan>> {
    let loan_id = table.require("LOAN_ID")?;
    let rate = table.require("ORIG_RT")?;
    let amount = table.require("ORIG_AMT")?;
    let term = table.require("ORIG_TRM")?;
    let channel = table.require("ORIG_CHN")?;
    let orig_date = table.require("ORIG_DTE")?;
    let first_date = table.require("FRST_DTE")?;
    let oltv = table.require("OLTV")?;
    let ocltv = table.require("OCLTV")?;
    let num_bo = table.require("NUM_BO")?;
    let dti = table.require("DTI")?;
    let cscore_b = table.require("CSCORE_B")?;
    let fthb = table.require("FTHB_FLG")?;
    let purpose = table.require("PURPOSE")?;
    let prop_type = table.require("PROP_TYP")?;
    let num_unit = table.require("NUM_UNIT")?;
    let occ_stat = table.require("OCC_STAT")?;
    let state = table.require("STATE")?;
    let zip3 = table.require("ZIP_3")?;
    let mi_pct = table.require("MI_PCT")?;
    let product = table.require("Product_Type")?;
    let cscore_c = table.require("CSCORE_C")?;
    let mi_type = table.require("MI_TYPE")?;
    let relocation = table.require("RELOCATION_FLG")?;

    let mut loans = Vec::with_capacity(table.len());
    for cells in rows(table) {
        let term_months = u32::try_from(cells.required_int(term)?)
            .map_err(|_| cells.missing(term, "non-negative int"))?;

        let ltv = cells.float(oltv).unwrap_or(0.0);
        let cltv = match cells.float(ocltv) {
            Some(v) if v != 0.0 => v,
            _ => ltv,
        };

        loans.push(Loan {
            loan_id: cells.required_text(loan_id)?,
            channel: cells.text(channel),
            annual_rate: cells.required_float(rate)?,
            principal: cells.required_float(amount)?,
            term_months,
            origination_date: cells.date(orig_date),
            first_payment_date: cells.date(first_date),
            ltv,
            cltv,
            borrower_count: cells.int(num_bo).unwrap_or(-1),
            dti: cells.int(dti).unwrap_or(-1),
            credit_score: cells.float(cscore_b).unwrap_or(-1.0),
            co_borrower_credit_score: cells.int(cscore_c).unwrap_or(-1),
            first_time_buyer: cells.text(fthb),
            purpose: cells.text(purpose),
            property_type: cells.text(prop_type),
            units: cells.int(num_unit).unwrap_or(-1),
            occupancy: cells.text(occ_stat),
            state: cells.text(state),
            zip3: cells.text(zip3),
            mi_pct: cells.int(mi_pct).unwrap_or(0),
            mi_type: cells.text(mi_type).unwrap_or_else(|| "0".to_string()),
            product_type: cells.text(product),
            relocation: cells.text(relocation),
        });
    }

    log::info!("loaded {} loans", loans.len());
    Ok(loans)
}

fn performance_from_table(table: &TypedTable) -> Result<Vec<PerformanceRecord>> {
    let loan_id = table.require("LOAN_ID")?;
    let act_date = table.require("ACT_DTE")?;
    let last_rate = table.require("LAST_RT")?;
    let last_upb = table.require("LAST_UPB")?;
    let loan_age = table.require("LOAN_AGE")?;
    let to_maturity = table.require("Months_To_Legal_Mat")?;
    let adj_to_maturity = table.require("Adj_Month_To_Mat")?;
    let maturity = table.require("Maturity_Date")?;
    let dlq = table.require("DLQ_STATUS")?;
    let mod_flag = table.require("MOD_FLAG")?;
    let zb_code = table.require("ZB_CODE")?;
    let zb_date = table.require("ZB_DTE")?;
    let lpi_date = table.require("LPI_DTE")?;
    let fcc_date = table.require("FCC_DTE")?;
    let disp_date = table.require("DISP_DTE")?;
    let costs = [
        table.require("FCC_COST")?,
        table.require("PP_COST")?,
        table.require("AR_COST")?,
        table.require("IE_COST")?,
        table.require("TAX_COST")?,
    ];
    let proceeds = [
        table.require("NS_PROCS")?,
        table.require("CE_PROCS")?,
        table.require("RMW_PROCS")?,
        table.require("O_PROCS")?,
    ];
    let non_int_upb = table.require("NON_INT_UPB")?;
    let forgiven_upb = table.require("PRIN_FORG_UPB_FHFA")?;
    let repurchase = table.require("REPCH_FLAG")?;
    let forgiven_other = table.require("PRIN_FORG_UPB_OTH")?;
    let transfer = table.require("TRANSFER_FLG")?;

    let mut records = Vec::with_capacity(table.len());
    for cells in rows(table) {
        let status = cells.row[dlq].as_str();
        let delinquency_status = parse_delinquency(status)
            .ok_or_else(|| cells.missing(dlq, "delinquency status"))?;
        let age = i32::try_from(cells.required_int(loan_age)?)
            .map_err(|_| cells.missing(loan_age, "int"))?;

        records.push(PerformanceRecord {
            loan_id: cells.required_text(loan_id)?,
            observation_date: cells.required_date(act_date)?,
            current_rate: cells.float(last_rate),
            current_upb: cells.float(last_upb),
            loan_age: age,
            months_to_maturity: cells.int(to_maturity).unwrap_or(-1),
            adj_months_to_maturity: cells.int(adj_to_maturity).unwrap_or(-1),
            maturity_date: cells.date(maturity),
            delinquency_status,
            modification_flag: cells.text(mod_flag).as_deref() == Some("Y"),
            zero_balance_code: cells.text(zb_code),
            zero_balance_date: cells.date(zb_date),
            last_paid_installment_date: cells.date(lpi_date),
            foreclosure_date: cells.date(fcc_date),
            disposition_date: cells.date(disp_date),
            default_cost: cells.sum(&costs),
            default_proceeds: cells.sum(&proceeds),
            non_interest_upb: cells.float(non_int_upb),
            principal_forgiveness_upb: cells.float(forgiven_upb),
            repurchase_flag: cells.text(repurchase),
            principal_forgiveness_other: cells.text(forgiven_other),
            servicing_transfer_flag: cells.text(transfer),
        });
    }

    log::info!("loaded {} performance observations", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::data::{DLQ_MISSING, DLQ_UNKNOWN};

    const ACQUISITION_ROWS: &str = "\
100001|R|BANK A|6.125|180000|360|12/2007|02/2008|80||1|35|705|N|P|SF|1|P|CA|945||FRM|||N
100002|B|BANK B|5.5|95000|180|11/2007|01/2008|60|75|2|28|760|Y|R|PU|1|P|TX|770|25|FRM|740|1|N
";

    fn perf_row(id: &str, date: &str, upb: &str, age: &str, dlq: &str, tail: &str) -> String {
        format!("{id}|{date}|SERVICER X|6.125|{upb}|{age}|{mat}||03/2038|31080|{dlq}|{tail}\n", mat = 360)
    }

    #[test]
    fn test_load_loans() {
        let loans = load_loans_from_reader(ACQUISITION_ROWS.as_bytes()).unwrap();
        assert_eq!(loans.len(), 2);

        let first = &loans[0];
        assert_eq!(first.loan_id, "100001");
        assert_eq!(first.term_months, 360);
        assert_eq!(first.annual_rate, 6.125);
        assert_eq!(first.principal, 180_000.0);
        assert_eq!(first.origination_date, NaiveDate::from_ymd_opt(2007, 12, 1));
        // OCLTV missing falls back to OLTV
        assert_eq!(first.cltv, 80.0);
        assert_eq!(first.co_borrower_credit_score, -1);
        assert_eq!(first.mi_type, "0");

        let second = &loans[1];
        assert_eq!(second.cltv, 75.0);
        assert_eq!(second.mi_pct, 25);
        assert_eq!(second.state.as_deref(), Some("TX"));
    }

    #[test]
    fn test_load_loans_missing_principal() {
        let rows = ACQUISITION_ROWS.replace("|180000|", "||");
        let err = load_loans_from_reader(rows.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { ref column, .. } if column == "ORIG_AMT"));
    }

    #[test]
    fn test_load_performance() {
        let no_events = "N|||||||||||||||||||N";
        let terminated = "N|01|06/2009||||100|25|0|10|5|||||||||N";
        let mut text = String::new();
        text.push_str(&perf_row("100001", "02/01/2008", "", "0", "0", no_events));
        text.push_str(&perf_row("100001", "03/01/2008", "179500.25", "1", "X", no_events));
        text.push_str(&perf_row("100001", "04/01/2008", "179000", "2", "", terminated));

        let records = load_performance_from_reader(text.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].current_upb, None);
        assert_eq!(records[0].delinquency_status, 0);
        assert_eq!(records[0].months_to_maturity, 360);
        assert_eq!(records[0].adj_months_to_maturity, -1);
        assert_eq!(records[0].observation_date, NaiveDate::from_ymd_opt(2008, 2, 1).unwrap());

        assert_eq!(records[1].delinquency_status, DLQ_UNKNOWN);
        assert_eq!(records[1].current_upb, Some(179_500.25));

        let last = &records[2];
        assert_eq!(last.delinquency_status, DLQ_MISSING);
        assert_eq!(last.zero_balance_code.as_deref(), Some("01"));
        assert_eq!(last.zero_balance_date, NaiveDate::from_ymd_opt(2009, 6, 1));
        assert_eq!(last.default_cost, Some(140.0));
        assert_eq!(last.default_proceeds, None);
        assert!(!last.modification_flag);
    }

    #[test]
    fn test_partially_reported_default_cost_is_blank() {
        let partial = "N|09|06/2009||||100|25||||1000|50|0|0|||||N";
        let text = perf_row("100001", "02/01/2008", "", "0", "0", partial);
        let records = load_performance_from_reader(text.as_bytes()).unwrap();

        assert_eq!(records[0].default_cost, None);
        assert_eq!(records[0].default_proceeds, Some(1_050.0));
    }

    #[test]
    fn test_load_performance_rejects_bad_status() {
        let text = perf_row("100001", "02/01/2008", "", "0", "Q", "N|||||||||||||||||||N");
        let err = load_performance_from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { ref column, .. } if column == "DLQ_STATUS"));
    }
}
