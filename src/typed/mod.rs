//! Typed table views.
//!
//! Each view is derived from the documented columns of one logical table,
//! so code referencing a column that does not exist fails to agree with the
//! registry before any data is read. Views extract from merged rows; a
//! table without a view stays a plain `RawRow` on its entity, which keeps
//! unmapped tables visibly untyped rather than silently shaped.

use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashSet;
use serde::Serialize;

pub use macros::TableRow;

use crate::error::{ProjectionError, Result};
use crate::mapping::split::SplitCatalog;
use crate::row::{CellValue, RawRow};
use crate::schema::{SchemaRegistry, parse_date, parse_datetime};

/// A struct extractable from one logical table's merged rows
pub trait TableRow: Sized {
    /// Logical table the view reads
    const TABLE: &'static str;
    /// Columns the view reads, in field order
    const COLUMNS: &'static [&'static str];

    /// Extract the view from a merged row.
    ///
    /// # Errors
    /// Fails when a required column is null or a cell does not convert to
    /// the field's type.
    fn from_row(row: &RawRow) -> Result<Self>;
}

/// Field-level conversion from a staged cell
pub trait FromCell: Sized {
    /// Convert an optional staged cell into a field value.
    ///
    /// # Errors
    /// Fails when the cell is absent but required, or has the wrong shape.
    fn from_cell(cell: Option<&CellValue>, table: &str, column: &str) -> Result<Self>;
}

fn required<'c>(cell: Option<&'c CellValue>, table: &str, column: &str) -> Result<&'c CellValue> {
    cell.filter(|c| !c.is_null())
        .ok_or_else(|| ProjectionError::schema(format!("{table}.{column} is null but required")))
}

fn shape_error(table: &str, column: &str, expected: &str, cell: &CellValue) -> ProjectionError {
    ProjectionError::schema(format!(
        "{table}.{column} expected {expected}, staged as {cell}"
    ))
}

impl FromCell for String {
    fn from_cell(cell: Option<&CellValue>, table: &str, column: &str) -> Result<Self> {
        Ok(required(cell, table, column)?.id_text())
    }
}

impl FromCell for i64 {
    fn from_cell(cell: Option<&CellValue>, table: &str, column: &str) -> Result<Self> {
        let value = required(cell, table, column)?;
        value
            .as_int()
            .ok_or_else(|| shape_error(table, column, "an integer", value))
    }
}

impl FromCell for f64 {
    fn from_cell(cell: Option<&CellValue>, table: &str, column: &str) -> Result<Self> {
        let value = required(cell, table, column)?;
        match value {
            CellValue::Int(v) => Ok(*v as f64),
            CellValue::Float(v) => Ok(*v),
            other => Err(shape_error(table, column, "a number", other)),
        }
    }
}

impl FromCell for NaiveDate {
    fn from_cell(cell: Option<&CellValue>, table: &str, column: &str) -> Result<Self> {
        let value = required(cell, table, column)?;
        parse_date(&value.id_text()).ok_or_else(|| shape_error(table, column, "a date", value))
    }
}

impl FromCell for NaiveDateTime {
    fn from_cell(cell: Option<&CellValue>, table: &str, column: &str) -> Result<Self> {
        let value = required(cell, table, column)?;
        parse_datetime(&value.id_text())
            .ok_or_else(|| shape_error(table, column, "a timestamp", value))
    }
}

impl<T: FromCell> FromCell for Option<T> {
    fn from_cell(cell: Option<&CellValue>, table: &str, column: &str) -> Result<Self> {
        match cell {
            None => Ok(None),
            Some(CellValue::Null) => Ok(None),
            Some(_) => T::from_cell(cell, table, column).map(Some),
        }
    }
}

/// Check a typed view against the loaded registry.
///
/// The view's columns must all be documented somewhere in the logical
/// table's split group; a view naming an undocumented column is a build
/// defect surfaced before any row is read.
///
/// # Errors
/// Fails when the table has no documented schema or the view names
/// undocumented columns, listed by name.
pub fn validate_columns<T: TableRow>(
    registry: &SchemaRegistry,
    splits: &SplitCatalog,
) -> Result<()> {
    let mut declared: FxHashSet<&str> = FxHashSet::default();
    if let Ok(group) = splits.resolve(T::TABLE) {
        for split in &group.splits {
            let Some(schema) = registry.get(&split.table) else {
                return Err(ProjectionError::schema(format!(
                    "split table {} has no documented schema",
                    split.table
                )));
            };
            declared.extend(schema.column_names());
        }
    } else {
        let Some(schema) = registry.get(T::TABLE) else {
            return Err(ProjectionError::schema(format!(
                "table {} has no documented schema",
                T::TABLE
            )));
        };
        declared.extend(schema.column_names());
    }

    let mut missing: Vec<&str> = T::COLUMNS
        .iter()
        .copied()
        .filter(|column| !declared.contains(column))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        missing.sort_unstable();
        Err(ProjectionError::schema(format!(
            "typed view for {} names undocumented columns: {}",
            T::TABLE,
            missing.join(", ")
        )))
    }
}

/// Demographics and identity from the patient master table
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "PATIENT")]
pub struct PatientRow {
    #[column(name = "PAT_ID")]
    pub pat_id: String,
    #[column(name = "PAT_NAME")]
    pub name: Option<String>,
    #[column(name = "BIRTH_DATE")]
    pub birth_date: Option<NaiveDate>,
    #[column(name = "CITY")]
    pub city: Option<String>,
    #[column(name = "ZIP")]
    pub zip: Option<String>,
}

/// One contact, clinical or administrative
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "PAT_ENC")]
pub struct ContactRow {
    #[column(name = "PAT_ENC_CSN_ID")]
    pub csn: i64,
    #[column(name = "PAT_ID")]
    pub pat_id: Option<String>,
    #[column(name = "CONTACT_DATE")]
    pub contact_date: Option<NaiveDate>,
    #[column(name = "VISIT_PROV_ID")]
    pub visit_provider: Option<String>,
    #[column(name = "DEPARTMENT_ID")]
    pub department_id: Option<i64>,
}

/// One encounter diagnosis line
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "PAT_ENC_DX")]
pub struct DiagnosisRow {
    #[column(name = "PAT_ENC_CSN_ID")]
    pub csn: i64,
    #[column(name = "LINE")]
    pub line: Option<i64>,
    #[column(name = "DX_ID")]
    pub dx_id: Option<i64>,
    #[column(name = "PRIMARY_DX_YN")]
    pub primary_yn: Option<String>,
}

/// One procedure or lab order
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "ORDER_PROC")]
pub struct OrderRow {
    #[column(name = "ORDER_PROC_ID")]
    pub order_id: i64,
    #[column(name = "PAT_ENC_CSN_ID")]
    pub csn: Option<i64>,
    #[column(name = "DESCRIPTION")]
    pub description: Option<String>,
    #[column(name = "ORDERING_DATE")]
    pub ordering_date: Option<NaiveDate>,
}

/// One result component line on an order
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "ORDER_RESULTS")]
pub struct OrderResultRow {
    #[column(name = "ORDER_PROC_ID")]
    pub order_id: i64,
    #[column(name = "LINE")]
    pub line: Option<i64>,
    #[column(name = "COMPONENT_ID")]
    pub component_id: Option<i64>,
    #[column(name = "ORD_VALUE")]
    pub value: Option<String>,
}

/// One clinical note header
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "HNO_INFO")]
pub struct NoteRow {
    #[column(name = "NOTE_ID")]
    pub note_id: i64,
    #[column(name = "PAT_ENC_CSN_ID")]
    pub csn: Option<i64>,
    #[column(name = "NOTE_TYPE_C")]
    pub note_type: Option<i64>,
}

/// One reviewed medical history entry
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "MEDICAL_HX")]
pub struct HistoryRow {
    #[column(name = "PAT_ID")]
    pub pat_id: Option<String>,
    #[column(name = "PAT_ENC_CSN_ID")]
    pub recorded_csn: Option<i64>,
    #[column(name = "HX_LNK_ENC_CSN")]
    pub linked_csn: Option<i64>,
    #[column(name = "DX_ID")]
    pub dx_id: Option<i64>,
    #[column(name = "MEDICAL_HX_DATE")]
    pub onset_text: Option<String>,
}

/// One allergy record
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "ALLERGY")]
pub struct AllergyRow {
    #[column(name = "ALLERGY_ID")]
    pub allergy_id: i64,
    #[column(name = "ALLERGEN_ID")]
    pub allergen_id: Option<i64>,
    #[column(name = "DATE_NOTED")]
    pub date_noted: Option<NaiveDate>,
    #[column(name = "PAT_ENC_CSN")]
    pub noted_during: Option<i64>,
}

/// One problem-list entry
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "PROBLEM_LIST")]
pub struct ProblemRow {
    #[column(name = "PROBLEM_LIST_ID")]
    pub problem_id: i64,
    #[column(name = "DX_ID")]
    pub dx_id: Option<i64>,
    #[column(name = "NOTED_DATE")]
    pub noted_date: Option<NaiveDate>,
    #[column(name = "PROBLEM_STATUS_C")]
    pub status: Option<i64>,
}

/// One professional-billing visit
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "ARPB_VISITS")]
pub struct BillingVisitRow {
    #[column(name = "PB_VISIT_ID")]
    pub visit_id: i64,
    #[column(name = "PAT_ID")]
    pub pat_id: Option<String>,
    #[column(name = "PRIM_ENC_CSN_ID")]
    pub clinical_csn: Option<i64>,
}

/// One professional-billing transaction
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "ARPB_TRANSACTIONS")]
pub struct TransactionRow {
    #[column(name = "TX_ID")]
    pub tx_id: i64,
    #[column(name = "PB_VISIT_ID")]
    pub visit_id: Option<i64>,
    #[column(name = "ACCOUNT_ID")]
    pub account_id: Option<i64>,
    #[column(name = "AMOUNT")]
    pub amount: Option<f64>,
    #[column(name = "SERVICE_DATE")]
    pub service_date: Option<NaiveDate>,
}

/// One guarantor account, merged across its splits
#[derive(Debug, Clone, Serialize, TableRow)]
#[table(name = "ACCOUNT")]
pub struct AccountRow {
    #[column(name = "ACCOUNT_ID")]
    pub account_id: i64,
    #[column(name = "ACCOUNT_NAME")]
    pub name: Option<String>,
    #[column(name = "ACCOUNT_TYPE_C")]
    pub account_type: Option<i64>,
}
