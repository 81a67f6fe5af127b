//! Schema registry and extract value semantics.

pub mod registry;
pub mod types;

pub use registry::{ColumnDef, SchemaRegistry, TableSchema};
pub use types::{ColumnType, coerce, parse_date, parse_datetime};
