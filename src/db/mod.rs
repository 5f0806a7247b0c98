//! Database module for model-sync
//!
//! One connection per module, plus the introspection queries the
//! reconciler diffs against.

pub mod connection;
pub mod introspect;

pub use connection::{engine_name_is_innodb, ModuleConnection};
pub use introspect::{ColumnInfo, ForeignKeyInfo, IndexInfo, TableInfo};
