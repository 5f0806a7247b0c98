//! Identifier case translation between the data model and the database.
//!
//! Model identifiers are always camelCase; database identifiers are in the
//! configured case. Every identifier crossing the model/database boundary
//! goes through `normalize` / `denormalize`.

use clap::ValueEnum;
use inflector::Inflector;

/// Database identifier case policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CasePolicy {
    /// snake_case identifiers (`example_entity_one`)
    #[default]
    Snake,
    /// PascalCase identifiers (`ExampleEntityOne`)
    Pascal,
    /// camelCase identifiers (`exampleEntityOne`)
    Camel,
}

/// Convert a camelCase model identifier to a database identifier.
pub fn normalize(name: &str, policy: CasePolicy) -> String {
    match policy {
        CasePolicy::Snake => name.to_snake_case(),
        CasePolicy::Pascal => name.to_pascal_case(),
        CasePolicy::Camel => name.to_camel_case(),
    }
}

/// Convert a database identifier back to a camelCase model identifier.
pub fn denormalize(name: &str, policy: CasePolicy) -> String {
    match policy {
        CasePolicy::Snake | CasePolicy::Pascal | CasePolicy::Camel => name.to_camel_case(),
    }
}

/// Name of the auto-increment primary key column under a case policy.
pub fn primary_key_column(policy: CasePolicy) -> &'static str {
    match policy {
        CasePolicy::Snake | CasePolicy::Camel => "id",
        CasePolicy::Pascal => "Id",
    }
}

/// Name of the optimistic-locking datetime column under a case policy.
pub fn locking_column(policy: CasePolicy) -> &'static str {
    match policy {
        CasePolicy::Snake => "last_updated",
        CasePolicy::Camel => "lastUpdated",
        CasePolicy::Pascal => "LastUpdated",
    }
}

/// Database column name for a relationship role: the normalized related
/// entity joined to the normalized role, separated by `_` for snake case
/// and nothing otherwise.
pub fn relationship_column(related_entity: &str, role: &str, policy: CasePolicy) -> String {
    let sep = match policy {
        CasePolicy::Snake => "_",
        CasePolicy::Pascal | CasePolicy::Camel => "",
    };
    format!(
        "{}{}{}",
        normalize(related_entity, policy),
        sep,
        normalize(role, policy)
    )
}

/// Generate a collision-resistant foreign-key constraint name. Hex digest
/// of a high-resolution timestamp salted with a random component, so the
/// expected constraint set differs on every run.
pub fn fresh_constraint_name() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let salt: u64 = rand::random();
    format!("{:x}", md5::compute(format!("{nanos}:{salt}")))
}
