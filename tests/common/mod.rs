//! Shared fixtures: a schema registry snapshot and a one-subject staged
//! extract that exercises splits, children, chains, contacts, and bridges.
#![allow(dead_code)]

use std::sync::Arc;

use ehi_graph::config::EngineConfig;
use ehi_graph::mapping::MappingCatalog;
use ehi_graph::projector::SubjectProjector;
use ehi_graph::row::{CellValue, RawRow};
use ehi_graph::schema::{ColumnDef, ColumnType, SchemaRegistry, TableSchema};
use ehi_graph::store::MemoryStore;

/// The extract's single subject
pub const SUBJECT: &str = "Z7004242";
/// The clinical contact carrying diagnoses, orders, and a note
pub const CLINICAL_CSN: i64 = 720_803_470;
/// The zero-content review contact the history row was recorded during
pub const REVIEW_CSN: i64 = 724_519_521;
/// Standing lipid panel order with no result rows of its own
pub const PARENT_ORDER: i64 = 339_016_704;
/// Instantiated child order carrying the five result rows
pub const CHILD_ORDER: i64 = 339_016_707;
/// Guarantor account reachable only through the bridge table
pub const ACCOUNT_ID: i64 = 1_810_018_166;

fn table(name: &str, columns: &[(&str, ColumnType)]) -> TableSchema {
    TableSchema::new(
        name.to_string(),
        String::new(),
        Vec::new(),
        columns
            .iter()
            .map(|&(column, column_type)| ColumnDef {
                name: column.to_string(),
                column_type,
                description: String::new(),
            })
            .collect(),
    )
}

/// Registry covering every physical table the builtin catalog declares
pub fn sample_registry() -> SchemaRegistry {
    use ColumnType::{DateTime, Integer, Numeric, Varchar};

    let tables = [
        table(
            "PATIENT",
            &[
                ("PAT_ID", Varchar),
                ("PAT_NAME", Varchar),
                ("BIRTH_DATE", DateTime),
                ("PAT_MRN_ID", Varchar),
            ],
        ),
        table(
            "PATIENT_2",
            &[("PAT_ID", Varchar), ("CITY", Varchar), ("ZIP", Varchar)],
        ),
        table(
            "PAT_ENC",
            &[
                ("PAT_ENC_CSN_ID", Numeric),
                ("PAT_ID", Varchar),
                ("CONTACT_DATE", DateTime),
                ("VISIT_PROV_ID", Varchar),
                ("DEPARTMENT_ID", Integer),
                ("APPT_STATUS_C", Integer),
            ],
        ),
        table(
            "PAT_ENC_2",
            &[("PAT_ENC_CSN_ID", Numeric), ("PHYS_BP", Varchar)],
        ),
        table(
            "PAT_ENC_DX",
            &[
                ("PAT_ENC_CSN_ID", Numeric),
                ("LINE", Integer),
                ("DX_ID", Numeric),
                ("PRIMARY_DX_YN", Varchar),
            ],
        ),
        table(
            "ORDER_PROC",
            &[
                ("ORDER_PROC_ID", Numeric),
                ("PAT_ID", Varchar),
                ("PAT_ENC_CSN_ID", Numeric),
                ("DESCRIPTION", Varchar),
                ("ORDERING_DATE", DateTime),
            ],
        ),
        table(
            "ORDER_RESULTS",
            &[
                ("ORDER_PROC_ID", Numeric),
                ("LINE", Integer),
                ("COMPONENT_ID", Numeric),
                ("ORD_VALUE", Varchar),
            ],
        ),
        table(
            "ORDER_INSTANTIATED",
            &[("ORDER_ID", Numeric), ("INSTNTD_ORDER_ID", Numeric)],
        ),
        table(
            "HNO_INFO",
            &[
                ("NOTE_ID", Numeric),
                ("PAT_ENC_CSN_ID", Numeric),
                ("NOTE_TYPE_C", Integer),
            ],
        ),
        table(
            "MEDICAL_HX",
            &[
                ("PAT_ID", Varchar),
                ("PAT_ENC_CSN_ID", Numeric),
                ("HX_LNK_ENC_CSN", Numeric),
                ("DX_ID", Numeric),
                ("MEDICAL_HX_DATE", Varchar),
            ],
        ),
        table(
            "ALLERGY",
            &[
                ("ALLERGY_ID", Numeric),
                ("PAT_ID", Varchar),
                ("ALLERGEN_ID", Numeric),
                ("DATE_NOTED", DateTime),
                ("PAT_ENC_CSN", Numeric),
            ],
        ),
        table(
            "ALLERGEN",
            &[("ALLERGEN_ID", Numeric), ("ALLERGEN_NAME", Varchar)],
        ),
        table(
            "PROBLEM_LIST",
            &[
                ("PROBLEM_LIST_ID", Numeric),
                ("PAT_ID", Varchar),
                ("DX_ID", Numeric),
                ("NOTED_DATE", DateTime),
                ("PROBLEM_STATUS_C", Integer),
            ],
        ),
        table(
            "ARPB_VISITS",
            &[
                ("PB_VISIT_ID", Numeric),
                ("PAT_ID", Varchar),
                ("PRIM_ENC_CSN_ID", Numeric),
            ],
        ),
        table(
            "ARPB_TRANSACTIONS",
            &[
                ("TX_ID", Numeric),
                ("PB_VISIT_ID", Numeric),
                ("ACCOUNT_ID", Numeric),
                ("AMOUNT", Numeric),
                ("SERVICE_DATE", DateTime),
            ],
        ),
        table(
            "ACCOUNT",
            &[
                ("ACCOUNT_ID", Numeric),
                ("ACCOUNT_NAME", Varchar),
                ("ACCOUNT_TYPE_C", Integer),
            ],
        ),
        table(
            "ACCOUNT_2",
            &[("ACCT_ID", Numeric), ("TOTAL_BALANCE", Numeric)],
        ),
        table(
            "ACCOUNT_3",
            &[("ACCOUNT_ID", Numeric), ("LAST_PAYMENT_DATE", DateTime)],
        ),
        table(
            "ACCT_GUAR_PAT_INFO",
            &[("ACCOUNT_ID", Numeric), ("PAT_ID", Varchar)],
        ),
    ];

    let mut registry = SchemaRegistry::new();
    for schema in tables {
        registry.insert(schema);
    }
    registry
}

/// One-subject extract.
///
/// The shape bakes in the interesting cases: the ACCOUNT split group joins
/// through a renamed key, diagnoses are staged out of line order, the
/// standing order has zero results while its instantiated child has five,
/// and the history row was recorded during a same-day review contact while
/// documenting the clinical one.
pub fn sample_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_table(
        "PATIENT",
        vec![RawRow::from_pairs([
            ("PAT_ID", CellValue::from(SUBJECT)),
            ("PAT_NAME", CellValue::from("MOUSE,MICKEY")),
            ("BIRTH_DATE", CellValue::from("8/9/1982")),
            ("PAT_MRN_ID", CellValue::from("MR-99-1")),
        ])],
    );
    store.insert_table(
        "PATIENT_2",
        vec![RawRow::from_pairs([
            ("PAT_ID", CellValue::from(SUBJECT)),
            ("CITY", CellValue::from("MADISON")),
            ("ZIP", CellValue::from("53711")),
        ])],
    );
    store.insert_table(
        "PAT_ENC",
        vec![
            RawRow::from_pairs([
                ("PAT_ENC_CSN_ID", CellValue::Int(CLINICAL_CSN)),
                ("PAT_ID", CellValue::from(SUBJECT)),
                ("CONTACT_DATE", CellValue::from("8/9/2018")),
                ("VISIT_PROV_ID", CellValue::from("144590")),
                ("DEPARTMENT_ID", CellValue::Int(101)),
            ]),
            RawRow::from_pairs([
                ("PAT_ENC_CSN_ID", CellValue::Int(REVIEW_CSN)),
                ("PAT_ID", CellValue::from(SUBJECT)),
                ("CONTACT_DATE", CellValue::from("8/9/2018")),
                ("VISIT_PROV_ID", CellValue::from("144590")),
                ("DEPARTMENT_ID", CellValue::Int(101)),
            ]),
        ],
    );
    store.insert_table(
        "PAT_ENC_2",
        vec![RawRow::from_pairs([
            ("PAT_ENC_CSN_ID", CellValue::Int(CLINICAL_CSN)),
            ("PHYS_BP", CellValue::from("120/80")),
        ])],
    );
    store.insert_table(
        "PAT_ENC_DX",
        vec![
            diagnosis(CLINICAL_CSN, 2, 81_357),
            diagnosis(CLINICAL_CSN, 3, 214_252),
            diagnosis(CLINICAL_CSN, 1, 440_360),
        ],
    );
    store.insert_table(
        "ORDER_PROC",
        vec![
            order(PARENT_ORDER, CLINICAL_CSN, "LIPID PANEL"),
            order(CHILD_ORDER, CLINICAL_CSN, "LIPID PANEL"),
        ],
    );
    store.insert_table(
        "ORDER_RESULTS",
        vec![
            result_line(CHILD_ORDER, 2, 1_230_000_062, "55"),
            result_line(CHILD_ORDER, 1, 1_230_000_061, "190"),
            result_line(CHILD_ORDER, 5, 1_230_000_065, "7.9"),
            result_line(CHILD_ORDER, 3, 1_230_000_063, "120"),
            result_line(CHILD_ORDER, 4, 1_230_000_064, "140"),
        ],
    );
    store.insert_table(
        "ORDER_INSTANTIATED",
        vec![RawRow::from_pairs([
            ("ORDER_ID", CellValue::Int(PARENT_ORDER)),
            ("INSTNTD_ORDER_ID", CellValue::Int(CHILD_ORDER)),
        ])],
    );
    store.insert_table(
        "HNO_INFO",
        vec![RawRow::from_pairs([
            ("NOTE_ID", CellValue::Int(1_473_812_517)),
            ("PAT_ENC_CSN_ID", CellValue::Int(CLINICAL_CSN)),
            ("NOTE_TYPE_C", CellValue::Int(1)),
        ])],
    );
    store.insert_table("MEDICAL_HX", vec![history_row(Some(CLINICAL_CSN))]);
    store.insert_table(
        "ALLERGY",
        vec![RawRow::from_pairs([
            ("ALLERGY_ID", CellValue::Int(30_689)),
            ("PAT_ID", CellValue::from(SUBJECT)),
            ("ALLERGEN_ID", CellValue::Int(400_011)),
            ("DATE_NOTED", CellValue::from("1/21/2020")),
            ("PAT_ENC_CSN", CellValue::Int(CLINICAL_CSN)),
        ])],
    );
    store.insert_table(
        "PROBLEM_LIST",
        vec![RawRow::from_pairs([
            ("PROBLEM_LIST_ID", CellValue::Int(117_170_698)),
            ("PAT_ID", CellValue::from(SUBJECT)),
            ("DX_ID", CellValue::Int(81_357)),
            ("NOTED_DATE", CellValue::from("8/9/2018")),
            ("PROBLEM_STATUS_C", CellValue::Int(1)),
        ])],
    );
    store.insert_table(
        "ARPB_VISITS",
        vec![RawRow::from_pairs([
            ("PB_VISIT_ID", CellValue::Int(109_076_101)),
            ("PAT_ID", CellValue::from(SUBJECT)),
            ("PRIM_ENC_CSN_ID", CellValue::Int(CLINICAL_CSN)),
        ])],
    );
    store.insert_table(
        "ARPB_TRANSACTIONS",
        vec![RawRow::from_pairs([
            ("TX_ID", CellValue::Int(315_026_147)),
            ("PB_VISIT_ID", CellValue::Int(109_076_101)),
            ("ACCOUNT_ID", CellValue::Int(ACCOUNT_ID)),
            ("AMOUNT", CellValue::Float(335.0)),
            ("SERVICE_DATE", CellValue::from("8/9/2018")),
        ])],
    );
    store.insert_table(
        "ACCOUNT",
        vec![RawRow::from_pairs([
            ("ACCOUNT_ID", CellValue::Int(ACCOUNT_ID)),
            ("ACCOUNT_NAME", CellValue::from("MOUSE,MICKEY")),
            ("ACCOUNT_TYPE_C", CellValue::Int(1)),
        ])],
    );
    store.insert_table(
        "ACCOUNT_2",
        vec![RawRow::from_pairs([
            ("ACCT_ID", CellValue::Int(ACCOUNT_ID)),
            ("TOTAL_BALANCE", CellValue::Float(335.5)),
        ])],
    );
    store.insert_table(
        "ACCOUNT_3",
        vec![RawRow::from_pairs([
            ("ACCOUNT_ID", CellValue::Int(ACCOUNT_ID)),
            ("LAST_PAYMENT_DATE", CellValue::from("9/1/2018")),
        ])],
    );
    store.insert_table(
        "ACCT_GUAR_PAT_INFO",
        vec![RawRow::from_pairs([
            ("ACCOUNT_ID", CellValue::Int(ACCOUNT_ID)),
            ("PAT_ID", CellValue::from(SUBJECT)),
        ])],
    );
    store
}

/// The extract's single history row; `link` drives the authoritative
/// `HX_LNK_ENC_CSN` column
pub fn history_row(link: Option<i64>) -> RawRow {
    RawRow::from_pairs([
        ("PAT_ID", CellValue::from(SUBJECT)),
        ("PAT_ENC_CSN_ID", CellValue::Int(REVIEW_CSN)),
        (
            "HX_LNK_ENC_CSN",
            link.map_or(CellValue::Null, CellValue::Int),
        ),
        ("DX_ID", CellValue::Int(214_252)),
        ("MEDICAL_HX_DATE", CellValue::from("2010")),
    ])
}

fn diagnosis(csn: i64, line: i64, dx: i64) -> RawRow {
    RawRow::from_pairs([
        ("PAT_ENC_CSN_ID", CellValue::Int(csn)),
        ("LINE", CellValue::Int(line)),
        ("DX_ID", CellValue::Int(dx)),
        ("PRIMARY_DX_YN", CellValue::from(if line == 1 { "Y" } else { "N" })),
    ])
}

fn order(id: i64, csn: i64, description: &str) -> RawRow {
    RawRow::from_pairs([
        ("ORDER_PROC_ID", CellValue::Int(id)),
        ("PAT_ID", CellValue::from(SUBJECT)),
        ("PAT_ENC_CSN_ID", CellValue::Int(csn)),
        ("DESCRIPTION", CellValue::from(description)),
        ("ORDERING_DATE", CellValue::from("8/9/2018")),
    ])
}

fn result_line(order_id: i64, line: i64, component: i64, value: &str) -> RawRow {
    RawRow::from_pairs([
        ("ORDER_PROC_ID", CellValue::Int(order_id)),
        ("LINE", CellValue::Int(line)),
        ("COMPONENT_ID", CellValue::Int(component)),
        ("ORD_VALUE", CellValue::from(value)),
    ])
}

/// Projector over the sample registry and builtin catalog
pub fn sample_projector(config: EngineConfig) -> SubjectProjector {
    SubjectProjector::new(
        Arc::new(sample_registry()),
        Arc::new(MappingCatalog::builtin()),
        config,
    )
}
