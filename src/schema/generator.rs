//! SQL fragment builder
//!
//! Pure functions producing the MySQL DDL the reconciler executes. No
//! I/O happens here. Identifiers are written unquoted; the reconciliation
//! logic does not depend on quoting.

use crate::model::{AttributeDefinition, DefaultValue, IndexAlgorithm, IndexChoice};

/// Column definition clause: `name type[(lengthOrValues)] [NOT NULL]
/// [DEFAULT ...]`. A CURRENT_TIMESTAMP default is emitted unquoted, other
/// defaults as quoted literals; a NULL default is emitted as `DEFAULT
/// NULL` only for nullable columns.
pub fn column_clause(column: &str, def: &AttributeDefinition) -> String {
    let mut clause = format!("{} {}", column, def.sql_type);

    if let Some(length_or_values) = &def.length_or_values {
        clause.push_str(&format!("({})", length_or_values.as_sql()));
    }

    if !def.allow_null {
        clause.push_str(" NOT NULL");
    }

    match &def.default {
        Some(DefaultValue::CurrentTimestamp) => clause.push_str(" DEFAULT CURRENT_TIMESTAMP"),
        Some(DefaultValue::Literal(value)) => {
            clause.push_str(&format!(" DEFAULT '{}'", escape_literal(value)));
        }
        None => {
            if def.allow_null {
                clause.push_str(" DEFAULT NULL");
            }
        }
    }

    clause
}

pub fn add_column(table: &str, column: &str, def: &AttributeDefinition) -> String {
    format!("ALTER TABLE {} ADD COLUMN {}", table, column_clause(column, def))
}

pub fn modify_column(table: &str, column: &str, def: &AttributeDefinition) -> String {
    format!(
        "ALTER TABLE {} MODIFY COLUMN {}",
        table,
        column_clause(column, def)
    )
}

pub fn drop_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", table, column)
}

/// Skeleton table: just the auto-increment primary key
pub fn create_table(table: &str, pk_column: &str) -> String {
    format!(
        "CREATE TABLE {}({} BIGINT NOT NULL AUTO_INCREMENT, PRIMARY KEY({}))",
        table, pk_column, pk_column
    )
}

/// Add the primary key column to an existing table that lost it
pub fn add_primary_key_column(table: &str, pk_column: &str) -> String {
    format!("ALTER TABLE {} ADD COLUMN {} BIGINT NOT NULL", table, pk_column)
}

/// Promote an existing column to the auto-increment primary key
pub fn alter_primary_key(table: &str, pk_column: &str) -> String {
    format!(
        "ALTER TABLE {} MODIFY COLUMN {} BIGINT NOT NULL AUTO_INCREMENT FIRST, ADD PRIMARY KEY ({})",
        table, pk_column, pk_column
    )
}

/// Index creation fragment. The `USING` clause only applies to plain and
/// unique indexes; spatial and fulltext indexes choose their own
/// structure.
pub fn add_index(
    table: &str,
    index_name: &str,
    choice: IndexChoice,
    column: &str,
    algorithm: IndexAlgorithm,
) -> String {
    let mut statement = format!(
        "ALTER TABLE {} ADD {} {} ({})",
        table,
        choice.sql_keyword(),
        index_name,
        column
    );
    if choice.uses_algorithm() {
        statement.push_str(&format!(" USING {}", algorithm.as_sql()));
    }
    statement
}

pub fn drop_index(table: &str, index_name: &str) -> String {
    format!("ALTER TABLE {} DROP INDEX {}", table, index_name)
}

/// Relationship columns are always BIGINT(20) referencing the target's
/// primary key.
pub fn add_foreign_key_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} ADD COLUMN {} BIGINT(20)", table, column)
}

pub fn modify_foreign_key_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} MODIFY COLUMN {} BIGINT(20)", table, column)
}

pub fn add_foreign_key(
    table: &str,
    constraint_name: &str,
    column: &str,
    referenced_table: &str,
    referenced_column: &str,
) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE SET NULL ON UPDATE CASCADE",
        table, constraint_name, column, referenced_table, referenced_column
    )
}

pub fn drop_foreign_key(schema: &str, table: &str, constraint_name: &str) -> String {
    format!(
        "ALTER TABLE {}.{} DROP FOREIGN KEY {}",
        schema, table, constraint_name
    )
}

/// Single-statement drop of several tables
pub fn drop_tables(tables: &[String]) -> String {
    format!("DROP TABLE {}", tables.join(","))
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE {}", table)
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
