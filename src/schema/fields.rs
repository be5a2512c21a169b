//! Field descriptors for the acquisition and performance disclosure files
//!
//! Column order matches the physical layout of the pipe-delimited files, which
//! carry no header row.

use chrono::NaiveDate;

/// Declared semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    /// Single precision in the source files; held as f64 once loaded
    Float,
    Double,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Date => "date",
        }
    }
}

/// Textual layout of a date column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `MM/yyyy`, resolved to the first day of the month
    MonthYear,
    /// `MM/dd/yyyy`
    MonthDayYear,
}

impl DateFormat {
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        match self {
            DateFormat::MonthYear => {
                let (month, year) = text.split_once('/')?;
                NaiveDate::from_ymd_opt(year.trim().parse().ok()?, month.trim().parse().ok()?, 1)
            }
            DateFormat::MonthDayYear => NaiveDate::parse_from_str(text, "%m/%d/%Y").ok(),
        }
    }
}

/// Value substituted when a cell is empty
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Float(f64),
    Str(&'static str),
}

/// Metadata for one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub default: Option<DefaultValue>,
    pub date_format: Option<DateFormat>,
    /// Column is read (and may feed derivations) but is not part of the output table
    pub drop: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            default: None,
            date_format: None,
            drop: false,
        }
    }

    const fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    const fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    const fn float(name: &'static str) -> Self {
        Self::new(name, FieldType::Float)
    }

    const fn double(name: &'static str) -> Self {
        Self::new(name, FieldType::Double)
    }

    const fn date(name: &'static str, format: DateFormat) -> Self {
        let mut spec = Self::new(name, FieldType::Date);
        spec.date_format = Some(format);
        spec
    }

    const fn or(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    const fn dropped(mut self) -> Self {
        self.drop = true;
        self
    }
}

/// Ordered column metadata for one input file
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the columns that survive into the output table
    pub fn retained_columns(&self) -> Vec<&'static str> {
        self.fields.iter().filter(|f| !f.drop).map(|f| f.name).collect()
    }
}

use DateFormat::{MonthDayYear, MonthYear};
use DefaultValue::{Float as F, Int as I, Str as S};

pub static ACQUISITION: TableSchema = TableSchema {
    name: "acquisition",
    fields: &[
        FieldSpec::string("LOAN_ID"),
        FieldSpec::string("ORIG_CHN"),
        FieldSpec::string("SellerName").dropped(),
        FieldSpec::float("ORIG_RT"),
        FieldSpec::double("ORIG_AMT"),
        FieldSpec::int("ORIG_TRM"),
        FieldSpec::date("ORIG_DTE", MonthYear),
        FieldSpec::date("FRST_DTE", MonthYear),
        FieldSpec::float("OLTV").or(F(0.0)),
        FieldSpec::float("OCLTV").or(F(0.0)),
        FieldSpec::int("NUM_BO").or(I(-1)),
        FieldSpec::int("DTI").or(I(-1)),
        FieldSpec::float("CSCORE_B").or(F(-1.0)),
        FieldSpec::string("FTHB_FLG"),
        FieldSpec::string("PURPOSE"),
        FieldSpec::string("PROP_TYP"),
        FieldSpec::int("NUM_UNIT").or(I(-1)),
        FieldSpec::string("OCC_STAT"),
        FieldSpec::string("STATE"),
        FieldSpec::string("ZIP_3"),
        FieldSpec::int("MI_PCT").or(I(0)),
        FieldSpec::string("Product_Type"),
        FieldSpec::int("CSCORE_C").or(I(-1)),
        FieldSpec::string("MI_TYPE").or(S("0")),
        FieldSpec::string("RELOCATION_FLG"),
    ],
};

pub static PERFORMANCE: TableSchema = TableSchema {
    name: "performance",
    fields: &[
        FieldSpec::string("LOAN_ID"),
        FieldSpec::date("ACT_DTE", MonthDayYear),
        FieldSpec::string("SERVICER").dropped(),
        FieldSpec::float("LAST_RT"),
        FieldSpec::double("LAST_UPB"),
        FieldSpec::int("LOAN_AGE"),
        FieldSpec::int("Months_To_Legal_Mat").or(I(-1)),
        FieldSpec::int("Adj_Month_To_Mat").or(I(-1)),
        FieldSpec::date("Maturity_Date", MonthYear),
        FieldSpec::string("MSA").dropped(),
        FieldSpec::string("DLQ_STATUS"),
        FieldSpec::string("MOD_FLAG").dropped(),
        FieldSpec::string("ZB_CODE").dropped(),
        FieldSpec::date("ZB_DTE", MonthYear).dropped(),
        FieldSpec::date("LPI_DTE", MonthDayYear).dropped(),
        FieldSpec::date("FCC_DTE", MonthDayYear).dropped(),
        FieldSpec::date("DISP_DTE", MonthDayYear).dropped(),
        FieldSpec::float("FCC_COST").dropped(),
        FieldSpec::float("PP_COST").dropped(),
        FieldSpec::float("AR_COST").dropped(),
        FieldSpec::float("IE_COST").dropped(),
        FieldSpec::float("TAX_COST").dropped(),
        FieldSpec::float("NS_PROCS").dropped(),
        FieldSpec::float("CE_PROCS").dropped(),
        FieldSpec::float("RMW_PROCS").dropped(),
        FieldSpec::float("O_PROCS").dropped(),
        FieldSpec::float("NON_INT_UPB"),
        FieldSpec::float("PRIN_FORG_UPB_FHFA"),
        FieldSpec::string("REPCH_FLAG"),
        FieldSpec::string("PRIN_FORG_UPB_OTH"),
        FieldSpec::string("TRANSFER_FLG"),
    ],
};
