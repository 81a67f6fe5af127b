//! Parent-chain resolution through the full projection path: result rows
//! keyed by an instantiated order surface on the standing order.

mod common;

use ehi_graph::compose::EntityId;
use ehi_graph::config::{ChainResults, EngineConfig};
use ehi_graph::diagnostics::DiagnosticKind;
use ehi_graph::row::{CellValue, RawRow};
use ehi_graph::store::MemoryStore;

fn order_results_len(record: &ehi_graph::projector::SubjectRecord, order: i64) -> usize {
    record
        .graph
        .entity(&EntityId::new("ORDER_PROC", order.to_string()))
        .and_then(|e| e.collection("results"))
        .map_or(0, |c| c.members.len())
}

#[test]
fn test_results_surface_on_the_standing_order() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    assert_eq!(order_results_len(&record, common::PARENT_ORDER), 5);
    // the instantiated order keeps its own view under the default policy
    assert_eq!(order_results_len(&record, common::CHILD_ORDER), 5);

    // donated members are the same entities, in sequence order
    let parent = record
        .graph
        .entity(&EntityId::new(
            "ORDER_PROC",
            common::PARENT_ORDER.to_string(),
        ))
        .unwrap();
    let lines: Vec<Option<i64>> = record
        .graph
        .children(parent, "results")
        .map(|r| r.field("LINE").and_then(CellValue::as_int))
        .collect();
    assert_eq!(
        lines,
        vec![Some(1), Some(2), Some(3), Some(4), Some(5)]
    );
}

#[test]
fn test_parent_only_policy_empties_the_instantiated_view() {
    let store = common::sample_store();
    let config = EngineConfig {
        chain_results: ChainResults::ParentOnly,
        ..EngineConfig::default()
    };
    let projector = common::sample_projector(config);
    let record = projector.project(&store, common::SUBJECT).unwrap();

    assert_eq!(order_results_len(&record, common::PARENT_ORDER), 5);
    assert_eq!(order_results_len(&record, common::CHILD_ORDER), 0);
}

#[test]
fn test_link_to_unstaged_parent_is_diagnosed_and_skipped() {
    let mut store = common::sample_store();
    store.insert_table(
        "ORDER_INSTANTIATED",
        vec![RawRow::from_pairs([
            ("ORDER_ID", CellValue::Int(999_000_111)),
            ("INSTNTD_ORDER_ID", CellValue::Int(common::CHILD_ORDER)),
        ])],
    );

    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let unresolved: Vec<_> = record
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::UnresolvedReference)
        .filter(|d| d.detail.contains("chain parent"))
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].detail.contains("999000111"));

    // results stay exactly where composition put them
    assert_eq!(order_results_len(&record, common::CHILD_ORDER), 5);
    assert_eq!(order_results_len(&record, common::PARENT_ORDER), 0);
}

#[test]
fn test_link_cycle_leaves_collections_untouched() {
    let mut store = common::sample_store();
    store.insert_table(
        "ORDER_INSTANTIATED",
        vec![
            RawRow::from_pairs([
                ("ORDER_ID", CellValue::Int(common::PARENT_ORDER)),
                ("INSTNTD_ORDER_ID", CellValue::Int(common::CHILD_ORDER)),
            ]),
            RawRow::from_pairs([
                ("ORDER_ID", CellValue::Int(common::CHILD_ORDER)),
                ("INSTNTD_ORDER_ID", CellValue::Int(common::PARENT_ORDER)),
            ]),
        ],
    );

    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    // both walks abandon; each order keeps its composed view
    let cycles = record
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::ChainCycle)
        .count();
    assert_eq!(cycles, 2);
    assert_eq!(order_results_len(&record, common::CHILD_ORDER), 5);
    assert_eq!(order_results_len(&record, common::PARENT_ORDER), 0);
}

#[test]
fn test_absent_link_table_is_reported_once() {
    let mut store = MemoryStore::new();
    store.insert_table(
        "PATIENT",
        vec![RawRow::from_pairs([
            ("PAT_ID", CellValue::from(common::SUBJECT)),
            ("PAT_NAME", CellValue::from("MOUSE,MICKEY")),
        ])],
    );
    store.insert_table(
        "PAT_ENC",
        vec![RawRow::from_pairs([
            ("PAT_ENC_CSN_ID", CellValue::Int(common::CLINICAL_CSN)),
            ("PAT_ID", CellValue::from(common::SUBJECT)),
            ("CONTACT_DATE", CellValue::from("8/9/2018")),
        ])],
    );

    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let missing: Vec<_> = record
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::MissingChildTable)
        .filter(|d| d.detail.contains("ORDER_INSTANTIATED"))
        .collect();
    assert_eq!(missing.len(), 1);
}
