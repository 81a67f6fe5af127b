//! Verify a staged extract against its schema snapshot and mapping catalog.
//!
//! Usage: `verify <schema-dir> <extract-dir> [catalog.json]`. Without a
//! catalog file the built-in catalog is checked. Every subject staged in
//! PATIENT is projected in guarded mode; the run exits nonzero when any
//! drift check fails.

use std::env;
use std::path::Path;
use std::process;
use std::sync::Arc;

use itertools::Itertools;
use log::{error, info};

use ehi_graph::{MappingCatalog, MemoryStore, Result, SchemaRegistry, TableStore, Verifier};

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: verify <schema-dir> <extract-dir> [catalog.json]");
        return Ok(());
    }
    let schema_dir = Path::new(&args[0]);
    let extract_dir = Path::new(&args[1]);

    let registry = Arc::new(SchemaRegistry::load_dir(schema_dir)?);
    let catalog = Arc::new(match args.get(2) {
        Some(path) => MappingCatalog::load_file(path)?,
        None => MappingCatalog::builtin(),
    });
    let store = MemoryStore::load_tsv_dir(extract_dir, &registry)?;

    let subjects: Vec<String> = if store.table_exists("PATIENT") {
        store
            .scan("PATIENT")?
            .iter()
            .filter_map(|row| row.get("PAT_ID"))
            .filter(|cell| !cell.is_null())
            .map(ehi_graph::CellValue::id_text)
            .unique()
            .collect()
    } else {
        Vec::new()
    };

    let report = Verifier::new(registry, catalog).verify(&store, &subjects)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.passed {
        info!("Extract verified: {} subjects checked", subjects.len());
        Ok(())
    } else {
        error!("Verification failed with {} findings", report.failures.len());
        process::exit(1);
    }
}
