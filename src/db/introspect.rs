//! Schema introspection queries
//!
//! Reads the live state the reconciler diffs against: table listing,
//! `SHOW FULL COLUMNS`, `SHOW INDEX` and the referential constraints of
//! `information_schema`.

use sqlx::{FromRow, Row};

use crate::db::connection::ModuleConnection;
use crate::error::Result;

/// One row of the table listing
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub table_type: String,
}

impl TableInfo {
    pub fn is_base_table(&self) -> bool {
        self.table_type.eq_ignore_ascii_case("BASE TABLE")
    }
}

/// One row of `SHOW FULL COLUMNS`
#[derive(Debug, Clone, FromRow)]
pub struct ColumnInfo {
    #[sqlx(rename = "Field")]
    pub field: String,
    #[sqlx(rename = "Type")]
    pub column_type: String,
    #[sqlx(rename = "Null")]
    pub null: String,
    #[sqlx(rename = "Default")]
    pub default: Option<String>,
}

/// One row of `SHOW INDEX` (an index spanning several columns yields one
/// row per column)
#[derive(Debug, Clone, FromRow)]
pub struct IndexInfo {
    #[sqlx(rename = "Key_name")]
    pub key_name: String,
    #[sqlx(rename = "Column_name")]
    pub column_name: String,
}

/// One referential constraint owned by a table
#[derive(Debug, Clone, FromRow)]
pub struct ForeignKeyInfo {
    #[sqlx(rename = "CONSTRAINT_NAME")]
    pub constraint_name: String,
    #[sqlx(rename = "REFERENCED_TABLE_NAME")]
    pub referenced_table: String,
}

impl ModuleConnection {
    /// List tables and views of the module's schema
    pub async fn introspect_tables(&self) -> Result<Vec<TableInfo>> {
        let sql = "SHOW FULL TABLES";
        let rows = sqlx::query(sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| self.introspection_error(sql, e))?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            // first column is named after the schema, so address by position
            let name: String = row.try_get(0).map_err(|e| self.introspection_error(sql, e))?;
            let table_type: String =
                row.try_get(1).map_err(|e| self.introspection_error(sql, e))?;
            tables.push(TableInfo { name, table_type });
        }
        Ok(tables)
    }

    /// Columns of a table, in table order
    pub async fn introspect_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!("SHOW FULL COLUMNS FROM {table}");
        sqlx::query_as::<_, ColumnInfo>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| self.introspection_error(&sql, e))
    }

    /// Index rows of a table
    pub async fn introspect_indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let sql = format!("SHOW INDEX FROM {table}");
        sqlx::query_as::<_, IndexInfo>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| self.introspection_error(&sql, e))
    }

    /// Foreign-key constraints owned by a table in this module's schema
    pub async fn introspect_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let sql = "SELECT CONSTRAINT_NAME, REFERENCED_TABLE_NAME \
                   FROM information_schema.REFERENTIAL_CONSTRAINTS \
                   WHERE TABLE_NAME = ? AND CONSTRAINT_SCHEMA = ?";
        sqlx::query_as::<_, ForeignKeyInfo>(sql)
            .bind(table)
            .bind(self.schema())
            .fetch_all(self.pool())
            .await
            .map_err(|e| self.introspection_error(sql, e))
    }
}
