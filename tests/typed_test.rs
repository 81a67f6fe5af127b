//! Typed view extraction from projected entities, and the build-time
//! agreement between every shipped view and the registry snapshot.

mod common;

use chrono::NaiveDate;
use ehi_graph::compose::EntityId;
use ehi_graph::config::EngineConfig;
use ehi_graph::mapping::MappingCatalog;
use ehi_graph::typed::{
    AccountRow, AllergyRow, BillingVisitRow, ContactRow, DiagnosisRow, HistoryRow, NoteRow,
    OrderResultRow, OrderRow, PatientRow, ProblemRow, TableRow, TransactionRow, validate_columns,
};

#[test]
fn test_patient_view_spans_both_splits() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let entity = record
        .graph
        .entity(&EntityId::new("PATIENT", common::SUBJECT))
        .unwrap();
    let patient = PatientRow::from_row(&entity.row).unwrap();
    assert_eq!(patient.pat_id, common::SUBJECT);
    assert_eq!(patient.name.as_deref(), Some("MOUSE,MICKEY"));
    assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(1982, 8, 9));
    assert_eq!(patient.city.as_deref(), Some("MADISON"));
    assert_eq!(patient.zip.as_deref(), Some("53711"));
}

#[test]
fn test_contact_view_extracts_identity_and_date() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let entity = record
        .graph
        .entity(&EntityId::new("PAT_ENC", common::CLINICAL_CSN.to_string()))
        .unwrap();
    let contact = ContactRow::from_row(&entity.row).unwrap();
    assert_eq!(contact.csn, common::CLINICAL_CSN);
    assert_eq!(contact.contact_date, NaiveDate::from_ymd_opt(2018, 8, 9));
    assert_eq!(contact.visit_provider.as_deref(), Some("144590"));
    assert_eq!(contact.department_id, Some(101));
}

#[test]
fn test_result_and_transaction_views_read_numbers() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let child_order = record
        .graph
        .entity(&EntityId::new(
            "ORDER_PROC",
            common::CHILD_ORDER.to_string(),
        ))
        .unwrap();
    let first = record.graph.children(child_order, "results").next().unwrap();
    let result = OrderResultRow::from_row(&first.row).unwrap();
    assert_eq!(result.order_id, common::CHILD_ORDER);
    assert_eq!(result.line, Some(1));
    assert_eq!(result.value.as_deref(), Some("190"));

    let tx = record
        .graph
        .entity(&EntityId::new("ARPB_TRANSACTIONS", "315026147"))
        .unwrap();
    let transaction = TransactionRow::from_row(&tx.row).unwrap();
    assert_eq!(transaction.account_id, Some(common::ACCOUNT_ID));
    assert_eq!(transaction.amount, Some(335.0));
    assert_eq!(
        transaction.service_date,
        NaiveDate::from_ymd_opt(2018, 8, 9)
    );
}

#[test]
fn test_history_view_keeps_the_two_contact_columns_apart() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let entity = record
        .graph
        .entity(&EntityId::new("MEDICAL_HX", "Z7004242#1"))
        .unwrap();
    let history = HistoryRow::from_row(&entity.row).unwrap();
    assert_eq!(history.recorded_csn, Some(common::REVIEW_CSN));
    assert_eq!(history.linked_csn, Some(common::CLINICAL_CSN));
    assert_eq!(history.onset_text.as_deref(), Some("2010"));
}

#[test]
fn test_every_shipped_view_matches_the_registry() {
    let registry = common::sample_registry();
    let catalog = MappingCatalog::builtin();
    let splits = catalog.splits();

    validate_columns::<PatientRow>(&registry, splits).unwrap();
    validate_columns::<ContactRow>(&registry, splits).unwrap();
    validate_columns::<DiagnosisRow>(&registry, splits).unwrap();
    validate_columns::<OrderRow>(&registry, splits).unwrap();
    validate_columns::<OrderResultRow>(&registry, splits).unwrap();
    validate_columns::<NoteRow>(&registry, splits).unwrap();
    validate_columns::<HistoryRow>(&registry, splits).unwrap();
    validate_columns::<AllergyRow>(&registry, splits).unwrap();
    validate_columns::<ProblemRow>(&registry, splits).unwrap();
    validate_columns::<BillingVisitRow>(&registry, splits).unwrap();
    validate_columns::<TransactionRow>(&registry, splits).unwrap();
    validate_columns::<AccountRow>(&registry, splits).unwrap();
}

#[test]
fn test_views_declare_the_columns_they_read() {
    assert_eq!(ContactRow::TABLE, "PAT_ENC");
    assert!(ContactRow::COLUMNS.contains(&"PAT_ENC_CSN_ID"));
    assert!(AccountRow::COLUMNS.contains(&"ACCOUNT_NAME"));
}
