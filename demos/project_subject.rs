//! Project subject record graphs from a staged TSV extract.
//!
//! Usage: `project <schema-dir> <extract-dir> [subject...]`. With no
//! subjects given, every distinct PAT_ID staged in the PATIENT table is
//! projected. Each record prints as one pretty JSON document.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use log::{info, warn};

use ehi_graph::projector::verify::manifest_sweep;
use ehi_graph::{
    DiagnosticSink, EngineConfig, MappingCatalog, MemoryStore, Result, SchemaRegistry,
    SubjectProjector, TableStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: project <schema-dir> <extract-dir> [subject...]");
        return Ok(());
    }
    let schema_dir = Path::new(&args[0]);
    let extract_dir = Path::new(&args[1]);
    if !extract_dir.exists() {
        warn!("Extract directory not found: {}", extract_dir.display());
        return Ok(());
    }

    let start = Instant::now();
    let registry = Arc::new(SchemaRegistry::load_dir(schema_dir)?);
    let catalog = Arc::new(MappingCatalog::builtin());
    let store: Arc<dyn TableStore> =
        Arc::new(MemoryStore::load_tsv_dir(extract_dir, &registry)?);

    // Surface manifest drift up front; projection proceeds either way
    let mut sink = DiagnosticSink::new();
    manifest_sweep(&catalog, store.as_ref(), &mut sink)?;

    let subjects = if args.len() > 2 {
        args[2..].to_vec()
    } else {
        staged_subjects(store.as_ref())?
    };
    if subjects.is_empty() {
        warn!("No subjects to project");
        return Ok(());
    }

    let projector = SubjectProjector::new(registry, catalog, EngineConfig::default());
    let records = projector.project_many_async(store, subjects).await?;

    for record in &records {
        println!("{}", serde_json::to_string_pretty(record)?);
    }
    info!(
        "Projected {} subject records in {:?}",
        records.len(),
        start.elapsed()
    );
    Ok(())
}

/// Distinct PAT_ID values staged in the PATIENT table, in staged order
fn staged_subjects(store: &dyn TableStore) -> Result<Vec<String>> {
    if !store.table_exists("PATIENT") {
        return Ok(Vec::new());
    }
    Ok(store
        .scan("PATIENT")?
        .iter()
        .filter_map(|row| row.get("PAT_ID"))
        .filter(|cell| !cell.is_null())
        .map(ehi_graph::CellValue::id_text)
        .unique()
        .collect())
}
