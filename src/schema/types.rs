//! Reconciliation-time schema types

use crate::model::{AttributeDefinition, DefaultValue};

/// Normalised form of one introspected column, comparable against an
/// attribute definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRecord {
    pub sql_type: String,
    pub length_or_values: Option<String>,
    pub default: Option<String>,
    pub allow_null: bool,
}

impl ColumnRecord {
    /// Build a record from a `SHOW FULL COLUMNS` row: the raw `Type` is
    /// split at the first `(` with the trailing `)` stripped, `Null="NO"`
    /// means not nullable, and `Default` is kept verbatim.
    pub fn from_introspection(raw_type: &str, null: &str, default: Option<String>) -> Self {
        let (sql_type, length_or_values) = match raw_type.split_once('(') {
            Some((head, rest)) => (
                head.to_string(),
                Some(rest.strip_suffix(')').unwrap_or(rest).to_string()),
            ),
            None => (raw_type.to_string(), None),
        };

        ColumnRecord {
            sql_type,
            length_or_values,
            default,
            allow_null: !null.eq_ignore_ascii_case("NO"),
        }
    }

    /// Whether the stored default is the CURRENT_TIMESTAMP sentinel.
    /// MariaDB reports `current_timestamp()`, so the comparison is
    /// case-insensitive and ignores a trailing `()`.
    pub fn default_is_current_timestamp(&self) -> bool {
        self.default
            .as_deref()
            .map(|d| {
                d.strip_suffix("()")
                    .unwrap_or(d)
                    .eq_ignore_ascii_case("CURRENT_TIMESTAMP")
            })
            .unwrap_or(false)
    }

    /// Compare this column against an attribute definition on type,
    /// length/values, default and nullability. Lengths compare in string
    /// form; literal defaults compare verbatim.
    pub fn matches(&self, def: &AttributeDefinition) -> bool {
        if !self.sql_type.eq_ignore_ascii_case(&def.sql_type) {
            return false;
        }

        let lengths_match = match (&self.length_or_values, &def.length_or_values) {
            (None, None) => true,
            (Some(existing), Some(expected)) => *existing == expected.as_sql(),
            _ => false,
        };
        if !lengths_match {
            return false;
        }

        let defaults_match = match (&self.default, &def.default) {
            (None, None) => true,
            (Some(_), Some(DefaultValue::CurrentTimestamp)) => self.default_is_current_timestamp(),
            (Some(existing), Some(DefaultValue::Literal(expected))) => existing == expected,
            _ => false,
        };
        if !defaults_match {
            return false;
        }

        self.allow_null == def.allow_null
    }
}

/// One expected foreign key, named freshly for the current run
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeySpec {
    /// Column on the owning entity's table
    pub column: String,
    /// Model name of the referenced entity
    pub referenced_entity: String,
    /// Fresh collision-resistant constraint name
    pub constraint_name: String,
}

/// Change counts accumulated over one reconciliation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    pub tables_created: usize,
    pub tables_removed: usize,
    pub columns_added: usize,
    pub columns_modified: usize,
    pub columns_dropped: usize,
    pub indexes_added: usize,
    pub indexes_removed: usize,
    pub foreign_keys_dropped: usize,
    pub foreign_keys_created: usize,
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tables created, {} tables removed, {} columns added, {} columns modified, {} columns dropped, {} indexes added, {} indexes removed, {} foreign keys rebuilt",
            self.tables_created,
            self.tables_removed,
            self.columns_added,
            self.columns_modified,
            self.columns_dropped,
            self.indexes_added,
            self.indexes_removed,
            self.foreign_keys_created,
        )
    }
}
