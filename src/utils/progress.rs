//! Progress reporting for long-running extract operations
//!
//! Standardized indicatif styles so table loading and batch projection
//! render consistently.

use indicatif::{ProgressBar, ProgressStyle};

/// Default style for table-loading progress
pub const LOAD_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} tables ({per_sec}) {msg}";

/// Default style for per-subject projection progress
pub const PROJECT_TEMPLATE: &str =
    "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} subjects ({percent}%) {msg}";

/// Create a progress bar for loading staged tables
///
/// # Arguments
/// * `length` - Number of tables to load
/// * `description` - Initial message to display
///
/// # Returns
/// A configured `ProgressBar`
#[must_use]
pub fn create_load_progress_bar(length: u64, description: &str) -> ProgressBar {
    let pb = ProgressBar::new(length);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(LOAD_TEMPLATE)
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(description.to_string());
    pb
}

/// Create a progress bar for projecting a batch of subjects
///
/// # Arguments
/// * `length` - Number of subjects in the batch
/// * `description` - Optional message to display
///
/// # Returns
/// A configured `ProgressBar`
#[must_use]
pub fn create_projection_progress_bar(length: u64, description: Option<&str>) -> ProgressBar {
    let pb = ProgressBar::new(length);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(PROJECT_TEMPLATE)
            .unwrap()
            .progress_chars("#>-"),
    );
    if let Some(desc) = description {
        pb.set_message(desc.to_string());
    }
    pb
}
