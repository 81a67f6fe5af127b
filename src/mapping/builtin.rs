//! Built-in mapping catalog for the core clinical tables.
//!
//! Deployments author their own catalog JSON per extract; this seed covers
//! the tables every extract carries and doubles as a worked example of the
//! declaration style. It exercises all four contact-number semantics:
//! structural ownership (`PAT_ENC_DX.PAT_ENC_CSN_ID`), self identity
//! (`PAT_ENC`), provenance stamps (`ALLERGY.PAT_ENC_CSN`), and clinical
//! cross-references (`ARPB_VISITS.PRIM_ENC_CSN_ID`).

use crate::mapping::manifest::{Manifest, MappedColumn, SkippedColumn};
use crate::mapping::relation::{RelationshipKind, RelationshipSpec};
use crate::mapping::split::{SplitGroup, SplitTable};
use crate::mapping::{
    BridgeSpec, CatalogDoc, ChainSpec, ChildSpec, HistorySpec, MappingCatalog, TableSpec,
};

fn split(table: &str, join_column: &str) -> SplitTable {
    SplitTable {
        table: table.to_string(),
        join_column: join_column.to_string(),
        transform: Default::default(),
    }
}

fn mapped(column: &str, destination: &str) -> MappedColumn {
    MappedColumn {
        column: column.to_string(),
        destination: destination.to_string(),
    }
}

fn skipped(column: &str, reason: &str) -> SkippedColumn {
    SkippedColumn {
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

fn manifest(table: &str, mapped: Vec<MappedColumn>, skipped: Vec<SkippedColumn>) -> Manifest {
    Manifest {
        table: table.to_string(),
        mapped,
        skipped,
    }
}

fn child(table: &str, foreign_key: &str, attach_as: &str, order_by: Option<&str>) -> ChildSpec {
    ChildSpec {
        table: table.to_string(),
        foreign_key: foreign_key.to_string(),
        attach_as: attach_as.to_string(),
        order_by: order_by.map(str::to_string),
    }
}

fn rel(
    table: &str,
    column: &str,
    kind: RelationshipKind,
    target: &str,
    meaning: &str,
) -> RelationshipSpec {
    RelationshipSpec {
        table: table.to_string(),
        column: column.to_string(),
        kind,
        target: target.to_string(),
        meaning: meaning.to_string(),
    }
}

/// The built-in catalog document
#[must_use]
pub fn builtin_doc() -> CatalogDoc {
    use RelationshipKind::{CrossReference, ProvenanceStamp, StructuralChild};

    CatalogDoc {
        splits: vec![
            SplitGroup {
                logical: "PATIENT".to_string(),
                splits: vec![split("PATIENT", "PAT_ID"), split("PATIENT_2", "PAT_ID")],
            },
            SplitGroup {
                logical: "PAT_ENC".to_string(),
                splits: vec![
                    split("PAT_ENC", "PAT_ENC_CSN_ID"),
                    split("PAT_ENC_2", "PAT_ENC_CSN_ID"),
                ],
            },
            SplitGroup {
                logical: "ACCOUNT".to_string(),
                splits: vec![
                    split("ACCOUNT", "ACCOUNT_ID"),
                    split("ACCOUNT_2", "ACCT_ID"),
                    split("ACCOUNT_3", "ACCOUNT_ID"),
                ],
            },
            SplitGroup::single("PAT_ENC_DX", "PAT_ENC_CSN_ID"),
            SplitGroup::single("ORDER_PROC", "ORDER_PROC_ID"),
            SplitGroup::single("ORDER_RESULTS", "ORDER_PROC_ID"),
            SplitGroup::single("HNO_INFO", "NOTE_ID"),
            SplitGroup::single("MEDICAL_HX", "PAT_ENC_CSN_ID"),
            SplitGroup::single("ALLERGY", "ALLERGY_ID"),
            SplitGroup::single("PROBLEM_LIST", "PROBLEM_LIST_ID"),
            SplitGroup::single("ARPB_VISITS", "PB_VISIT_ID"),
            SplitGroup::single("ARPB_TRANSACTIONS", "TX_ID"),
        ],
        tables: vec![
            TableSpec {
                table: "PATIENT".to_string(),
                identity_column: Some("PAT_ID".to_string()),
                subject_column: Some("PAT_ID".to_string()),
                contact_identity: false,
                root: true,
                children: vec![],
            },
            TableSpec {
                table: "PAT_ENC".to_string(),
                identity_column: Some("PAT_ENC_CSN_ID".to_string()),
                subject_column: Some("PAT_ID".to_string()),
                contact_identity: true,
                root: true,
                children: vec![
                    child("PAT_ENC_DX", "PAT_ENC_CSN_ID", "diagnoses", Some("LINE")),
                    child("ORDER_PROC", "PAT_ENC_CSN_ID", "orders", None),
                    child("HNO_INFO", "PAT_ENC_CSN_ID", "notes", None),
                ],
            },
            TableSpec {
                table: "PAT_ENC_DX".to_string(),
                identity_column: None,
                subject_column: None,
                contact_identity: false,
                root: false,
                children: vec![],
            },
            TableSpec {
                table: "ORDER_PROC".to_string(),
                identity_column: Some("ORDER_PROC_ID".to_string()),
                subject_column: Some("PAT_ID".to_string()),
                contact_identity: false,
                root: false,
                children: vec![child("ORDER_RESULTS", "ORDER_PROC_ID", "results", Some("LINE"))],
            },
            TableSpec {
                table: "ORDER_RESULTS".to_string(),
                identity_column: None,
                subject_column: None,
                contact_identity: false,
                root: false,
                children: vec![],
            },
            TableSpec {
                table: "HNO_INFO".to_string(),
                identity_column: Some("NOTE_ID".to_string()),
                subject_column: None,
                contact_identity: false,
                root: false,
                children: vec![],
            },
            TableSpec {
                table: "MEDICAL_HX".to_string(),
                identity_column: None,
                subject_column: Some("PAT_ID".to_string()),
                contact_identity: false,
                root: true,
                children: vec![],
            },
            TableSpec {
                table: "ALLERGY".to_string(),
                identity_column: Some("ALLERGY_ID".to_string()),
                subject_column: Some("PAT_ID".to_string()),
                contact_identity: false,
                root: true,
                children: vec![],
            },
            TableSpec {
                table: "PROBLEM_LIST".to_string(),
                identity_column: Some("PROBLEM_LIST_ID".to_string()),
                subject_column: Some("PAT_ID".to_string()),
                contact_identity: false,
                root: true,
                children: vec![],
            },
            TableSpec {
                table: "ARPB_VISITS".to_string(),
                identity_column: Some("PB_VISIT_ID".to_string()),
                subject_column: Some("PAT_ID".to_string()),
                contact_identity: false,
                root: true,
                children: vec![child("ARPB_TRANSACTIONS", "PB_VISIT_ID", "transactions", None)],
            },
            TableSpec {
                table: "ARPB_TRANSACTIONS".to_string(),
                identity_column: Some("TX_ID".to_string()),
                subject_column: None,
                contact_identity: false,
                root: false,
                children: vec![],
            },
            TableSpec {
                table: "ACCOUNT".to_string(),
                identity_column: Some("ACCOUNT_ID".to_string()),
                subject_column: None,
                contact_identity: false,
                root: true,
                children: vec![],
            },
        ],
        relationships: vec![
            rel(
                "PAT_ENC_DX",
                "PAT_ENC_CSN_ID",
                StructuralChild,
                "PAT_ENC",
                "Encounter this diagnosis line was recorded on",
            ),
            rel(
                "ORDER_PROC",
                "PAT_ENC_CSN_ID",
                StructuralChild,
                "PAT_ENC",
                "Encounter the order was placed in",
            ),
            rel(
                "HNO_INFO",
                "PAT_ENC_CSN_ID",
                StructuralChild,
                "PAT_ENC",
                "Encounter the note documents",
            ),
            rel(
                "ORDER_RESULTS",
                "ORDER_PROC_ID",
                StructuralChild,
                "ORDER_PROC",
                "Order this result component belongs to",
            ),
            rel(
                "ARPB_TRANSACTIONS",
                "PB_VISIT_ID",
                StructuralChild,
                "ARPB_VISITS",
                "Billing visit the transaction posts to",
            ),
            rel(
                "MEDICAL_HX",
                "PAT_ENC_CSN_ID",
                CrossReference,
                "PAT_ENC",
                "Contact where this history row was recorded",
            ),
            rel(
                "MEDICAL_HX",
                "HX_LNK_ENC_CSN",
                CrossReference,
                "PAT_ENC",
                "Clinical encounter this history entry documents",
            ),
            rel(
                "ARPB_VISITS",
                "PRIM_ENC_CSN_ID",
                CrossReference,
                "PAT_ENC",
                "Clinical encounter backing this billing visit",
            ),
            rel(
                "ARPB_TRANSACTIONS",
                "ACCOUNT_ID",
                CrossReference,
                "ACCOUNT",
                "Guarantor account the transaction bills",
            ),
            rel(
                "ALLERGY",
                "ALLERGEN_ID",
                CrossReference,
                "ALLERGEN",
                "Allergen dictionary record",
            ),
            rel(
                "ORDER_INSTANTIATED",
                "ORDER_ID",
                CrossReference,
                "ORDER_PROC",
                "Parent standing order",
            ),
            rel(
                "ORDER_INSTANTIATED",
                "INSTNTD_ORDER_ID",
                CrossReference,
                "ORDER_PROC",
                "Instantiated child order",
            ),
            rel(
                "ALLERGY",
                "PAT_ENC_CSN",
                ProvenanceStamp,
                "PAT_ENC",
                "Contact during which the allergy was noted",
            ),
        ],
        bridges: vec![BridgeSpec {
            entity_table: "ACCOUNT".to_string(),
            bridge_table: "ACCT_GUAR_PAT_INFO".to_string(),
            entity_column: "ACCOUNT_ID".to_string(),
            subject_column: "PAT_ID".to_string(),
        }],
        chains: vec![ChainSpec {
            table: "ORDER_PROC".to_string(),
            link_table: "ORDER_INSTANTIATED".to_string(),
            child_column: "INSTNTD_ORDER_ID".to_string(),
            parent_column: "ORDER_ID".to_string(),
            results_attach_as: "results".to_string(),
        }],
        manifests: vec![
            manifest(
                "PATIENT",
                vec![
                    mapped("PAT_ID", "patient.id"),
                    mapped("PAT_NAME", "patient.name"),
                    mapped("BIRTH_DATE", "patient.birth_date"),
                ],
                vec![skipped(
                    "PAT_MRN_ID",
                    "site-local MRN, subjects are addressed by PAT_ID",
                )],
            ),
            manifest(
                "PATIENT_2",
                vec![
                    mapped("PAT_ID", "patient.id"),
                    mapped("CITY", "patient.city"),
                    mapped("ZIP", "patient.zip"),
                ],
                vec![],
            ),
            manifest(
                "PAT_ENC",
                vec![
                    mapped("PAT_ENC_CSN_ID", "encounter.csn"),
                    mapped("PAT_ID", "encounter.patient"),
                    mapped("CONTACT_DATE", "encounter.date"),
                    mapped("VISIT_PROV_ID", "encounter.provider"),
                    mapped("DEPARTMENT_ID", "encounter.department"),
                ],
                vec![skipped(
                    "APPT_STATUS_C",
                    "scheduling lifecycle, not clinical content",
                )],
            ),
            manifest(
                "PAT_ENC_2",
                vec![
                    mapped("PAT_ENC_CSN_ID", "encounter.csn"),
                    mapped("PHYS_BP", "encounter.vitals.bp"),
                ],
                vec![],
            ),
            manifest(
                "PAT_ENC_DX",
                vec![
                    mapped("PAT_ENC_CSN_ID", "encounter.diagnoses"),
                    mapped("LINE", "encounter.diagnoses[].line"),
                    mapped("DX_ID", "encounter.diagnoses[].dx"),
                    mapped("PRIMARY_DX_YN", "encounter.diagnoses[].primary"),
                ],
                vec![],
            ),
            manifest(
                "ORDER_PROC",
                vec![
                    mapped("ORDER_PROC_ID", "order.id"),
                    mapped("PAT_ID", "order.patient"),
                    mapped("PAT_ENC_CSN_ID", "encounter.orders"),
                    mapped("DESCRIPTION", "order.description"),
                    mapped("ORDERING_DATE", "order.ordered_on"),
                ],
                vec![skipped(
                    "INSTANTIATED_TIME",
                    "lifecycle stamp, chain linkage comes from ORDER_INSTANTIATED",
                )],
            ),
            manifest(
                "ORDER_RESULTS",
                vec![
                    mapped("ORDER_PROC_ID", "order.results"),
                    mapped("LINE", "order.results[].line"),
                    mapped("COMPONENT_ID", "order.results[].component"),
                    mapped("ORD_VALUE", "order.results[].value"),
                ],
                vec![skipped(
                    "LAB_STATUS_C",
                    "order-level status, carried on ORDER_PROC",
                )],
            ),
            manifest(
                "ORDER_INSTANTIATED",
                vec![
                    mapped("ORDER_ID", "order.chain.parent"),
                    mapped("INSTNTD_ORDER_ID", "order.chain.child"),
                ],
                vec![],
            ),
            manifest(
                "HNO_INFO",
                vec![
                    mapped("NOTE_ID", "note.id"),
                    mapped("PAT_ENC_CSN_ID", "encounter.notes"),
                    mapped("NOTE_TYPE_C", "note.type"),
                ],
                vec![skipped(
                    "UNIQUE_NOTE_ID",
                    "alternate key, NOTE_ID is the identity used throughout",
                )],
            ),
            manifest(
                "MEDICAL_HX",
                vec![
                    mapped("PAT_ID", "history.patient"),
                    mapped("PAT_ENC_CSN_ID", "history.recorded_during"),
                    mapped("HX_LNK_ENC_CSN", "history.documents"),
                    mapped("DX_ID", "history.dx"),
                    mapped("MEDICAL_HX_DATE", "history.onset_text"),
                ],
                vec![],
            ),
            manifest(
                "ALLERGY",
                vec![
                    mapped("ALLERGY_ID", "allergy.id"),
                    mapped("PAT_ID", "allergy.patient"),
                    mapped("ALLERGEN_ID", "allergy.allergen"),
                    mapped("DATE_NOTED", "allergy.noted_on"),
                    mapped("PAT_ENC_CSN", "allergy.noted_during"),
                ],
                vec![skipped(
                    "ALLERGY_SEVERITY_C",
                    "severity category set varies by deployment",
                )],
            ),
            manifest(
                "PROBLEM_LIST",
                vec![
                    mapped("PROBLEM_LIST_ID", "problem.id"),
                    mapped("PAT_ID", "problem.patient"),
                    mapped("DX_ID", "problem.dx"),
                    mapped("NOTED_DATE", "problem.noted_on"),
                    mapped("PROBLEM_STATUS_C", "problem.status"),
                ],
                vec![],
            ),
            manifest(
                "ARPB_VISITS",
                vec![
                    mapped("PB_VISIT_ID", "billing_visit.id"),
                    mapped("PAT_ID", "billing_visit.patient"),
                    mapped("PRIM_ENC_CSN_ID", "billing_visit.clinical_encounter"),
                ],
                vec![],
            ),
            manifest(
                "ARPB_TRANSACTIONS",
                vec![
                    mapped("TX_ID", "transaction.id"),
                    mapped("PB_VISIT_ID", "billing_visit.transactions"),
                    mapped("ACCOUNT_ID", "transaction.account"),
                    mapped("AMOUNT", "transaction.amount"),
                    mapped("SERVICE_DATE", "transaction.service_date"),
                ],
                vec![skipped(
                    "DEBIT_CREDIT_FLAG",
                    "sign already folded into AMOUNT",
                )],
            ),
            manifest(
                "ACCOUNT",
                vec![
                    mapped("ACCOUNT_ID", "account.id"),
                    mapped("ACCOUNT_NAME", "account.name"),
                    mapped("ACCOUNT_TYPE_C", "account.type"),
                ],
                vec![],
            ),
            manifest(
                "ACCOUNT_2",
                vec![
                    mapped("ACCT_ID", "account.id"),
                    mapped("TOTAL_BALANCE", "account.balance"),
                ],
                vec![],
            ),
            manifest(
                "ACCOUNT_3",
                vec![
                    mapped("ACCOUNT_ID", "account.id"),
                    mapped("LAST_PAYMENT_DATE", "account.last_payment"),
                ],
                vec![],
            ),
            manifest(
                "ACCT_GUAR_PAT_INFO",
                vec![
                    mapped("ACCOUNT_ID", "bridge to account.id"),
                    mapped("PAT_ID", "bridge to patient.id"),
                ],
                vec![],
            ),
        ],
        history: vec![HistorySpec {
            table: "MEDICAL_HX".to_string(),
            link_column: "HX_LNK_ENC_CSN".to_string(),
            recorded_column: "PAT_ENC_CSN_ID".to_string(),
            contact_date_column: "CONTACT_DATE".to_string(),
            contact_provider_column: "VISIT_PROV_ID".to_string(),
        }],
        synthetic_columns: vec![],
    }
}

impl MappingCatalog {
    /// The built-in catalog for the core clinical tables
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_doc(builtin_doc()).expect("builtin mapping catalog is internally consistent")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_indexes() {
        let catalog = MappingCatalog::builtin();
        assert!(catalog.splits().resolve("ACCOUNT").is_ok());
        assert_eq!(catalog.splits().resolve("ACCOUNT").unwrap().splits[1].join_column, "ACCT_ID");
        assert!(catalog.table("PAT_ENC").unwrap().contact_identity);
        assert!(catalog.bridge("ACCOUNT").is_some());
        assert!(catalog.chain("ORDER_PROC").is_some());
        assert!(catalog.history("MEDICAL_HX").is_some());
        assert!(catalog.manifest("PAT_ENC").unwrap().covers("CONTACT_DATE"));
    }

    #[test]
    fn test_builtin_round_trips_through_json() {
        let doc = builtin_doc();
        let json = serde_json::to_string(&doc).unwrap();
        let reloaded = MappingCatalog::from_json_str(&json).unwrap();
        assert_eq!(reloaded.tables().len(), doc.tables.len());
    }
}
