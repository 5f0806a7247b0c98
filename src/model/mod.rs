//! Data model types for model-sync
//!
//! A data model maps camelCase entity names to entity definitions. The
//! typed model is produced by the validator from raw JSON; insertion
//! order is preserved so DDL emission is deterministic.

pub mod validator;

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::utils::naming::{self, CasePolicy};

pub use validator::validate_model;

/// A validated data model: entity name to definition, insertion-ordered
pub type DataModel = IndexMap<String, EntityDefinition>;

/// Load and validate a data model from a JSON file
pub fn load_from_file(path: &Path, config: &ConnectionConfig) -> Result<DataModel> {
    let model_str = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read data model {}: {}", path.display(), e))
    })?;

    let raw: serde_json::Value = serde_json::from_str(&model_str).map_err(|e| {
        Error::Config(format!("Failed to parse data model {}: {}", path.display(), e))
    })?;

    validator::validate_model(&raw, config)
}

/// One entity of the data model; corresponds 1:1 to a database table
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDefinition {
    /// Module owning this entity; resolves to a schema in the connection
    /// configuration.
    pub module: String,
    /// Attribute name to definition, insertion-ordered, never empty
    pub attributes: IndexMap<String, AttributeDefinition>,
    pub indexes: Vec<IndexDefinition>,
    /// Related entity name to the roles linking to it. Each role
    /// materialises as one foreign-key column.
    pub relationships: IndexMap<String, Vec<String>>,
    pub options: EntityOptions,
}

impl EntityDefinition {
    /// Every column the entity's table is expected to carry: primary key,
    /// attribute columns, relationship columns, and the locking column
    /// when locking constraints are enforced.
    pub fn expected_columns(&self, policy: CasePolicy) -> Vec<String> {
        let mut columns = vec![naming::primary_key_column(policy).to_string()];
        columns.extend(self.attributes.keys().map(|a| naming::normalize(a, policy)));
        columns.extend(self.relationship_columns(policy).into_iter().map(|(c, _)| c));
        if self.options.enforce_locking_constraints {
            columns.push(naming::locking_column(policy).to_string());
        }
        columns
    }

    /// Relationship columns in declaration order, paired with the related
    /// entity they reference.
    pub fn relationship_columns(&self, policy: CasePolicy) -> Vec<(String, String)> {
        let mut columns = Vec::new();
        for (related, roles) in &self.relationships {
            for role in roles {
                columns.push((
                    naming::relationship_column(related, role, policy),
                    related.clone(),
                ));
            }
        }
        columns
    }

    /// Reverse lookup from a database column to the related entity it
    /// references. Rebuilds each role's column name by the same rule and
    /// returns the first match.
    pub fn relationship_for_column(&self, column: &str, policy: CasePolicy) -> Option<&str> {
        for (related, roles) in &self.relationships {
            for role in roles {
                if naming::relationship_column(related, role, policy) == column {
                    return Some(related.as_str());
                }
            }
        }
        None
    }

    /// Look up the attribute behind a database column, if any
    pub fn attribute_for_column(
        &self,
        column: &str,
        policy: CasePolicy,
    ) -> Option<(&str, &AttributeDefinition)> {
        self.attributes
            .iter()
            .find(|(name, _)| naming::normalize(name, policy) == column)
            .map(|(name, def)| (name.as_str(), def))
    }
}

/// One attribute of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    /// SQL type token (`varchar`, `bigint`, `datetime`, `enum`, ...)
    pub sql_type: String,
    pub length_or_values: Option<LengthOrValues>,
    /// `None` means a NULL default
    pub default: Option<DefaultValue>,
    pub allow_null: bool,
}

impl AttributeDefinition {
    /// Synthetic definition of the optimistic-locking column
    pub fn locking() -> Self {
        AttributeDefinition {
            sql_type: "datetime".to_string(),
            length_or_values: None,
            default: Some(DefaultValue::CurrentTimestamp),
            allow_null: false,
        }
    }
}

/// Length of a sized type, or the value list of an enum/set
#[derive(Debug, Clone, PartialEq)]
pub enum LengthOrValues {
    Length(i64),
    Values(String),
}

impl LengthOrValues {
    /// Parenthesised SQL form. Lengths are coerced to their string form so
    /// they compare against introspected column types.
    pub fn as_sql(&self) -> String {
        match self {
            LengthOrValues::Length(n) => n.to_string(),
            LengthOrValues::Values(v) => v.clone(),
        }
    }
}

/// Column default value
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// The `CURRENT_TIMESTAMP` sentinel, emitted unquoted
    CurrentTimestamp,
    /// A literal, emitted quoted
    Literal(String),
}

/// Index kind. The SQL fragment builder dispatches on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexChoice {
    Index,
    Unique,
    Spatial,
    Fulltext,
}

impl IndexChoice {
    /// Case-insensitive parse of the model's `indexChoice` value
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "index" => Some(IndexChoice::Index),
            "unique" => Some(IndexChoice::Unique),
            "spatial" => Some(IndexChoice::Spatial),
            "fulltext" => Some(IndexChoice::Fulltext),
            _ => None,
        }
    }

    /// DDL keyword for `ALTER TABLE ... ADD <keyword>`
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            IndexChoice::Index => "INDEX",
            IndexChoice::Unique => "UNIQUE INDEX",
            IndexChoice::Spatial => "SPATIAL INDEX",
            IndexChoice::Fulltext => "FULLTEXT INDEX",
        }
    }

    /// Whether the index kind accepts a `USING {BTREE|HASH}` clause
    pub fn uses_algorithm(&self) -> bool {
        matches!(self, IndexChoice::Index | IndexChoice::Unique)
    }
}

/// Index algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAlgorithm {
    BTree,
    Hash,
}

impl IndexAlgorithm {
    /// Case-insensitive parse of the model's index `type` value
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "BTREE" => Some(IndexAlgorithm::BTree),
            "HASH" => Some(IndexAlgorithm::Hash),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            IndexAlgorithm::BTree => "BTREE",
            IndexAlgorithm::Hash => "HASH",
        }
    }
}

/// One secondary index of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    /// Attribute the index covers; must name an attribute of the entity
    pub attribute: String,
    /// Model-side index name, unique across the entity
    pub index_name: String,
    pub index_choice: IndexChoice,
    pub index_type: IndexAlgorithm,
}

/// Per-entity options
#[derive(Debug, Clone, PartialEq)]
pub struct EntityOptions {
    /// Maintain the optimistic-locking datetime column
    pub enforce_locking_constraints: bool,
    /// Surfaced for consumers; has no reconciliation behaviour
    pub is_audit_enabled: bool,
}

impl Default for EntityOptions {
    fn default() -> Self {
        EntityOptions {
            enforce_locking_constraints: true,
            is_audit_enabled: true,
        }
    }
}
