//! Procedural macros for the ehi-graph crate
//!
//! This crate provides the `TableRow` derive macro, which generates typed
//! row extraction from schema-documented table declarations, eliminating
//! hand-written column plumbing in the ehi-graph crate.

use proc_macro::TokenStream;

// Import modules
mod table_row;

// Tests
#[cfg(test)]
mod tests;

/// Derive macro for typed table rows
///
/// This macro generates a `TableRow` trait implementation from a struct
/// definition, mapping each field to a documented extract column.
///
/// # Example
///
/// ```ignore
/// #[derive(TableRow)]
/// #[table(name = "PATIENT")]
/// struct PatientRow {
///     #[column(name = "PAT_ID")]
///     pat_id: String,
///
///     #[column(name = "PAT_NAME")]
///     name: Option<String>,
///
///     #[column(name = "BIRTH_DATE")]
///     birth_date: Option<chrono::NaiveDate>,
/// }
/// ```
///
/// Fields without a `#[column(name = "...")]` attribute map to their own
/// name uppercased.
#[proc_macro_derive(TableRow, attributes(table, column))]
pub fn derive_table_row(input: TokenStream) -> TokenStream {
    table_row::process_derive_table_row(input)
}
