//! Projected output shape and stability: nested collection rendering,
//! sorted index rendering, and byte-identical repeated runs.

mod common;

use ehi_graph::config::EngineConfig;
use serde_json::{Value, json};

#[test]
fn test_repeated_projection_is_byte_identical() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());

    let first = projector.project(&store, common::SUBJECT).unwrap();
    let second = projector.project(&store, common::SUBJECT).unwrap();

    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_entities_nest_collections_under_their_attachment_names() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let graph: Value = serde_json::to_value(&record.graph).unwrap();
    assert_eq!(graph["subject"], json!(common::SUBJECT));

    let entities = graph["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 8);
    assert_eq!(entities[0]["table"], json!("PATIENT"));
    assert_eq!(entities[0]["row"]["PAT_NAME"], json!("MOUSE,MICKEY"));

    let clinical = &entities[1];
    assert_eq!(clinical["id"], json!(common::CLINICAL_CSN.to_string()));
    let diagnoses = clinical["diagnoses"].as_array().unwrap();
    assert_eq!(diagnoses.len(), 3);
    assert_eq!(diagnoses[0]["row"]["LINE"], json!(1));
    assert_eq!(diagnoses[0]["row"]["PRIMARY_DX_YN"], json!("Y"));

    // results donated up the chain render under the standing order too
    let orders = clinical["orders"].as_array().unwrap();
    let standing = orders
        .iter()
        .find(|o| o["id"] == json!(common::PARENT_ORDER.to_string()))
        .unwrap();
    assert_eq!(standing["results"].as_array().unwrap().len(), 5);
}

#[test]
fn test_references_and_provenance_render_flat() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let graph: Value = serde_json::to_value(&record.graph).unwrap();
    let entities = graph["entities"].as_array().unwrap();

    let history = &entities[3];
    assert_eq!(history["table"], json!("MEDICAL_HX"));
    let references = history["references"].as_array().unwrap();
    assert_eq!(references.len(), 2);
    assert!(
        references
            .iter()
            .any(|r| r["column"] == json!("HX_LNK_ENC_CSN")
                && r["value"] == json!(common::CLINICAL_CSN))
    );
    // the referenced encounter is not embedded in the history node
    assert!(history.get("encounter").is_none());

    let allergy = &entities[4];
    assert_eq!(allergy["table"], json!("ALLERGY"));
    let provenance = allergy["provenance"].as_array().unwrap();
    assert_eq!(provenance[0]["column"], json!("PAT_ENC_CSN"));
    assert_eq!(provenance[0]["value"], json!(common::CLINICAL_CSN));
}

#[test]
fn test_contact_index_renders_with_sorted_keys() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let contacts: Value = serde_json::to_value(&record.contacts).unwrap();
    let identities: Vec<&String> = contacts["identities"]
        .as_object()
        .unwrap()
        .keys()
        .collect();
    assert_eq!(
        identities,
        vec![
            &common::CLINICAL_CSN.to_string(),
            &common::REVIEW_CSN.to_string()
        ]
    );
    assert_eq!(
        contacts["identities"][common::CLINICAL_CSN.to_string()]["table"],
        json!("PAT_ENC")
    );

    let referenced = contacts["referenced_by"].as_object().unwrap();
    let incoming = referenced[&common::CLINICAL_CSN.to_string()]
        .as_array()
        .unwrap();
    assert!(
        incoming
            .iter()
            .any(|entry| entry["column"] == json!("HX_LNK_ENC_CSN"))
    );
    assert!(
        incoming
            .iter()
            .any(|entry| entry["column"] == json!("PRIM_ENC_CSN_ID"))
    );
}

#[test]
fn test_row_columns_keep_staged_order() {
    let store = common::sample_store();
    let projector = common::sample_projector(EngineConfig::default());
    let record = projector.project(&store, common::SUBJECT).unwrap();

    let graph = serde_json::to_string(&record.graph).unwrap();
    // merged patient row: base split columns first, then the second split
    let pat_id = graph.find("\"PAT_ID\"").unwrap();
    let name = graph.find("\"PAT_NAME\"").unwrap();
    let city = graph.find("\"CITY\"").unwrap();
    assert!(pat_id < name && name < city);
}
