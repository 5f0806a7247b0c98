//! Per-entity diff computation
//!
//! Compares one entity definition against the introspected state of its
//! table and produces the DDL statements that converge the table, plus
//! change counts. Pure functions so the reconciliation logic is testable
//! without a live database; execution order within a plan is the emission
//! order here.

use std::collections::HashSet;

use crate::model::{AttributeDefinition, EntityDefinition};
use crate::schema::generator;
use crate::schema::types::{ColumnRecord, ForeignKeySpec};
use crate::utils::naming::{self, CasePolicy};

/// One introspected column of an entity's table
#[derive(Debug, Clone)]
pub struct ExistingColumn {
    pub name: String,
    pub record: ColumnRecord,
}

/// Column-level convergence plan for one entity
#[derive(Debug, Clone, Default)]
pub struct ColumnPlan {
    pub statements: Vec<String>,
    pub added: usize,
    pub modified: usize,
    pub dropped: usize,
}

/// Index-level convergence plan for one entity
#[derive(Debug, Clone, Default)]
pub struct IndexPlan {
    pub statements: Vec<String>,
    pub added: usize,
    pub removed: usize,
}

/// Compute the column plan for an entity.
///
/// Existing columns are matched against the expected column set: strays
/// are dropped, drifted attribute columns are modified from their
/// definition at the first mismatching key, the locking column is held to
/// `datetime DEFAULT CURRENT_TIMESTAMP`, and relationship columns are
/// held to BIGINT. Whatever the model expects and the table lacks is then
/// added, in model declaration order.
pub fn plan_columns(
    table: &str,
    entity: &EntityDefinition,
    existing: &[ExistingColumn],
    policy: CasePolicy,
) -> ColumnPlan {
    let pk_column = naming::primary_key_column(policy);
    let locking = naming::locking_column(policy);
    let expected: HashSet<String> = entity.expected_columns(policy).into_iter().collect();

    let mut plan = ColumnPlan::default();
    let mut pk_seen = false;
    let mut locking_seen = false;
    let mut attributes_processed: Vec<String> = Vec::new();
    let mut relationships_processed: Vec<String> = Vec::new();

    for column in existing {
        if column.name == pk_column {
            pk_seen = true;
            continue;
        }

        if !expected.contains(&column.name) {
            plan.statements.push(generator::drop_column(table, &column.name));
            plan.dropped += 1;
            continue;
        }

        if let Some((attr_name, def)) = entity.attribute_for_column(&column.name, policy) {
            attributes_processed.push(attr_name.to_string());
            if !column.record.matches(def) {
                plan.statements
                    .push(generator::modify_column(table, &column.name, def));
                plan.modified += 1;
            }
            continue;
        }

        if column.name == locking {
            locking_seen = true;
            let healthy = column.record.sql_type.eq_ignore_ascii_case("datetime")
                && column.record.default_is_current_timestamp();
            if !healthy {
                plan.statements.push(generator::modify_column(
                    table,
                    &column.name,
                    &AttributeDefinition::locking(),
                ));
                plan.modified += 1;
            }
            continue;
        }

        if entity.relationship_for_column(&column.name, policy).is_some() {
            relationships_processed.push(column.name.clone());
            if !column.record.sql_type.eq_ignore_ascii_case("bigint") {
                plan.statements
                    .push(generator::modify_foreign_key_column(table, &column.name));
                plan.modified += 1;
            }
        }
    }

    for (attr_name, def) in &entity.attributes {
        if !attributes_processed.iter().any(|a| a == attr_name) {
            plan.statements.push(generator::add_column(
                table,
                &naming::normalize(attr_name, policy),
                def,
            ));
            plan.added += 1;
        }
    }

    if !pk_seen {
        plan.statements
            .push(generator::add_primary_key_column(table, pk_column));
        plan.statements
            .push(generator::alter_primary_key(table, pk_column));
        plan.added += 1;
    }

    if entity.options.enforce_locking_constraints && !locking_seen {
        plan.statements.push(generator::add_column(
            table,
            locking,
            &AttributeDefinition::locking(),
        ));
        plan.added += 1;
    }

    for (column, _related) in entity.relationship_columns(policy) {
        if !relationships_processed.iter().any(|c| *c == column) {
            plan.statements
                .push(generator::add_foreign_key_column(table, &column));
            plan.added += 1;
        }
    }

    plan
}

/// Compute the index plan for an entity.
///
/// The expected name set is the model's normalized index names plus the
/// run's fresh foreign-key constraint names, so the indexes MySQL
/// auto-creates alongside foreign keys survive. `PRIMARY` is never
/// touched.
pub fn plan_indexes(
    table: &str,
    entity: &EntityDefinition,
    existing_names: &[String],
    expected_fk_names: &[String],
    policy: CasePolicy,
) -> IndexPlan {
    let mut plan = IndexPlan::default();
    let mut expected: HashSet<String> = expected_fk_names.iter().cloned().collect();

    for index in &entity.indexes {
        let name = naming::normalize(&index.index_name, policy);
        if !existing_names.contains(&name) {
            plan.statements.push(generator::add_index(
                table,
                &name,
                index.index_choice,
                &naming::normalize(&index.attribute, policy),
                index.index_type,
            ));
            plan.added += 1;
        }
        expected.insert(name);
    }

    for name in existing_names {
        if name.eq_ignore_ascii_case("PRIMARY") {
            continue;
        }
        if !expected.contains(name) {
            plan.statements.push(generator::drop_index(table, name));
            plan.removed += 1;
        }
    }

    plan
}

/// Foreign keys whose stored constraint name is not expected this run.
/// Expected names are freshly generated, so in practice this drops every
/// stored constraint; matching stays name-based on purpose.
pub fn plan_foreign_key_drops(
    schema: &str,
    table: &str,
    existing_constraints: &[String],
    expected: &[ForeignKeySpec],
) -> Vec<String> {
    let expected_names: HashSet<&str> =
        expected.iter().map(|s| s.constraint_name.as_str()).collect();

    existing_constraints
        .iter()
        .filter(|name| !expected_names.contains(name.as_str()))
        .map(|name| generator::drop_foreign_key(schema, table, name))
        .collect()
}

/// Creation statements for the run's expected foreign keys
pub fn plan_foreign_key_adds(
    table: &str,
    expected: &[ForeignKeySpec],
    policy: CasePolicy,
) -> Vec<String> {
    expected
        .iter()
        .map(|spec| {
            generator::add_foreign_key(
                table,
                &spec.constraint_name,
                &spec.column,
                &naming::normalize(&spec.referenced_entity, policy),
                naming::primary_key_column(policy),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DefaultValue, EntityOptions, IndexAlgorithm, IndexChoice, IndexDefinition, LengthOrValues,
    };
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn attribute(
        sql_type: &str,
        length: Option<i64>,
        default: Option<DefaultValue>,
        allow_null: bool,
    ) -> AttributeDefinition {
        AttributeDefinition {
            sql_type: sql_type.to_string(),
            length_or_values: length.map(LengthOrValues::Length),
            default,
            allow_null,
        }
    }

    fn example_entity_one() -> EntityDefinition {
        let mut attributes = IndexMap::new();
        attributes.insert(
            "exampleOneBigInt".to_string(),
            attribute("bigint", Some(20), None, true),
        );
        EntityDefinition {
            module: "main".to_string(),
            attributes,
            indexes: vec![IndexDefinition {
                attribute: "exampleOneBigInt".to_string(),
                index_name: "exampleEntityOne_exampleOneBigInt".to_string(),
                index_choice: IndexChoice::Index,
                index_type: IndexAlgorithm::BTree,
            }],
            relationships: IndexMap::new(),
            options: EntityOptions::default(),
        }
    }

    fn existing(name: &str, raw_type: &str, null: &str, default: Option<&str>) -> ExistingColumn {
        ExistingColumn {
            name: name.to_string(),
            record: ColumnRecord::from_introspection(raw_type, null, default.map(String::from)),
        }
    }

    #[test]
    fn test_greenfield_column_plan() {
        // freshly created skeleton table: only the primary key exists
        let entity = example_entity_one();
        let table_state = vec![existing("id", "bigint(20)", "NO", None)];
        let plan = plan_columns("example_entity_one", &entity, &table_state, CasePolicy::Snake);

        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE example_entity_one ADD COLUMN example_one_big_int bigint(20) DEFAULT NULL",
                "ALTER TABLE example_entity_one ADD COLUMN last_updated datetime NOT NULL DEFAULT CURRENT_TIMESTAMP",
            ]
        );
        assert_eq!(plan.added, 2);
        assert_eq!(plan.modified, 0);
        assert_eq!(plan.dropped, 0);
    }

    #[test]
    fn test_converged_table_plans_nothing() {
        let entity = example_entity_one();
        let table_state = vec![
            existing("id", "bigint(20)", "NO", None),
            existing("example_one_big_int", "bigint(20)", "YES", None),
            existing("last_updated", "datetime", "NO", Some("CURRENT_TIMESTAMP")),
        ];
        let plan = plan_columns("example_entity_one", &entity, &table_state, CasePolicy::Snake);
        assert!(plan.statements.is_empty());
    }

    #[test]
    fn test_type_drift_emits_single_modify() {
        let mut entity = example_entity_one();
        entity.attributes.insert(
            "exampleOneStringWithNull".to_string(),
            attribute("varchar", Some(50), None, true),
        );
        let table_state = vec![
            existing("id", "bigint(20)", "NO", None),
            existing("example_one_big_int", "bigint(20)", "YES", None),
            existing("example_one_string_with_null", "varchar(15)", "YES", None),
            existing("last_updated", "datetime", "NO", Some("CURRENT_TIMESTAMP")),
        ];
        let plan = plan_columns("example_entity_one", &entity, &table_state, CasePolicy::Snake);
        assert_eq!(
            plan.statements,
            vec!["ALTER TABLE example_entity_one MODIFY COLUMN example_one_string_with_null varchar(50) DEFAULT NULL"]
        );
        assert_eq!(plan.modified, 1);
    }

    #[test]
    fn test_stray_column_is_dropped() {
        let entity = example_entity_one();
        let table_state = vec![
            existing("id", "bigint(20)", "NO", None),
            existing("example_one_big_int", "bigint(20)", "YES", None),
            existing("abandoned", "varchar(255)", "YES", None),
            existing("last_updated", "datetime", "NO", Some("CURRENT_TIMESTAMP")),
        ];
        let plan = plan_columns("example_entity_one", &entity, &table_state, CasePolicy::Snake);
        assert_eq!(
            plan.statements,
            vec!["ALTER TABLE example_entity_one DROP COLUMN abandoned"]
        );
        assert_eq!(plan.dropped, 1);
    }

    #[test]
    fn test_drifted_locking_column_is_restored() {
        let entity = example_entity_one();
        let table_state = vec![
            existing("id", "bigint(20)", "NO", None),
            existing("example_one_big_int", "bigint(20)", "YES", None),
            existing("last_updated", "timestamp", "YES", None),
        ];
        let plan = plan_columns("example_entity_one", &entity, &table_state, CasePolicy::Snake);
        assert_eq!(
            plan.statements,
            vec!["ALTER TABLE example_entity_one MODIFY COLUMN last_updated datetime NOT NULL DEFAULT CURRENT_TIMESTAMP"]
        );
    }

    #[test]
    fn test_locking_column_skipped_when_disabled() {
        let mut entity = example_entity_one();
        entity.options.enforce_locking_constraints = false;
        let table_state = vec![
            existing("id", "bigint(20)", "NO", None),
            existing("example_one_big_int", "bigint(20)", "YES", None),
        ];
        let plan = plan_columns("example_entity_one", &entity, &table_state, CasePolicy::Snake);
        assert!(plan.statements.is_empty());
    }

    #[test]
    fn test_missing_primary_key_is_rebuilt() {
        let entity = example_entity_one();
        let table_state = vec![
            existing("example_one_big_int", "bigint(20)", "YES", None),
            existing("last_updated", "datetime", "NO", Some("CURRENT_TIMESTAMP")),
        ];
        let plan = plan_columns("example_entity_one", &entity, &table_state, CasePolicy::Snake);
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE example_entity_one ADD COLUMN id BIGINT NOT NULL",
                "ALTER TABLE example_entity_one MODIFY COLUMN id BIGINT NOT NULL AUTO_INCREMENT FIRST, ADD PRIMARY KEY (id)",
            ]
        );
    }

    fn entity_with_relationship() -> EntityDefinition {
        let mut attributes = IndexMap::new();
        attributes.insert(
            "exampleTwoText".to_string(),
            attribute("text", None, None, true),
        );
        let mut relationships = IndexMap::new();
        relationships.insert(
            "exampleEntityOne".to_string(),
            vec!["relationshipOne".to_string(), "relationshipTwo".to_string()],
        );
        EntityDefinition {
            module: "main".to_string(),
            attributes,
            indexes: Vec::new(),
            relationships,
            options: EntityOptions::default(),
        }
    }

    #[test]
    fn test_relationship_columns_are_added() {
        let entity = entity_with_relationship();
        let table_state = vec![
            existing("id", "bigint(20)", "NO", None),
            existing("example_two_text", "text", "YES", None),
            existing("last_updated", "datetime", "NO", Some("CURRENT_TIMESTAMP")),
        ];
        let plan = plan_columns("example_entity_two", &entity, &table_state, CasePolicy::Snake);
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE example_entity_two ADD COLUMN example_entity_one_relationship_one BIGINT(20)",
                "ALTER TABLE example_entity_two ADD COLUMN example_entity_one_relationship_two BIGINT(20)",
            ]
        );
        assert_eq!(plan.added, 2);
    }

    #[test]
    fn test_drifted_relationship_column_is_modified_not_added() {
        let entity = entity_with_relationship();
        let table_state = vec![
            existing("id", "bigint(20)", "NO", None),
            existing("example_two_text", "text", "YES", None),
            existing("example_entity_one_relationship_one", "int(11)", "YES", None),
            existing("example_entity_one_relationship_two", "bigint(20)", "YES", None),
            existing("last_updated", "datetime", "NO", Some("CURRENT_TIMESTAMP")),
        ];
        let plan = plan_columns("example_entity_two", &entity, &table_state, CasePolicy::Snake);
        assert_eq!(
            plan.statements,
            vec!["ALTER TABLE example_entity_two MODIFY COLUMN example_entity_one_relationship_one BIGINT(20)"]
        );
        assert_eq!(plan.modified, 1);
        assert_eq!(plan.added, 0);
    }

    #[test]
    fn test_index_plan_adds_missing_index() {
        let entity = example_entity_one();
        let plan = plan_indexes(
            "example_entity_one",
            &entity,
            &["PRIMARY".to_string()],
            &[],
            CasePolicy::Snake,
        );
        assert_eq!(
            plan.statements,
            vec!["ALTER TABLE example_entity_one ADD INDEX example_entity_one_example_one_big_int (example_one_big_int) USING BTREE"]
        );
        assert_eq!(plan.added, 1);
        assert_eq!(plan.removed, 0);
    }

    #[test]
    fn test_index_plan_drops_stray_but_keeps_primary_and_fk_backing() {
        let entity = example_entity_one();
        let existing_names = vec![
            "PRIMARY".to_string(),
            "example_entity_one_example_one_big_int".to_string(),
            "abc123fkname".to_string(),
            "stray_index".to_string(),
        ];
        let plan = plan_indexes(
            "example_entity_one",
            &entity,
            &existing_names,
            &["abc123fkname".to_string()],
            CasePolicy::Snake,
        );
        assert_eq!(
            plan.statements,
            vec!["ALTER TABLE example_entity_one DROP INDEX stray_index"]
        );
        assert_eq!(plan.removed, 1);
    }

    #[test]
    fn test_foreign_key_drop_plan_drops_everything_stored() {
        let expected = vec![ForeignKeySpec {
            column: "example_entity_one_relationship_one".to_string(),
            referenced_entity: "exampleEntityOne".to_string(),
            constraint_name: "fresh1".to_string(),
        }];
        let statements = plan_foreign_key_drops(
            "app_db",
            "example_entity_two",
            &["stale_constraint".to_string(), "another_stale".to_string()],
            &expected,
        );
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE app_db.example_entity_two DROP FOREIGN KEY stale_constraint",
                "ALTER TABLE app_db.example_entity_two DROP FOREIGN KEY another_stale",
            ]
        );
    }

    #[test]
    fn test_foreign_key_add_plan() {
        let expected = vec![
            ForeignKeySpec {
                column: "example_entity_one_relationship_one".to_string(),
                referenced_entity: "exampleEntityOne".to_string(),
                constraint_name: "fresh1".to_string(),
            },
            ForeignKeySpec {
                column: "example_entity_one_relationship_two".to_string(),
                referenced_entity: "exampleEntityOne".to_string(),
                constraint_name: "fresh2".to_string(),
            },
        ];
        let statements = plan_foreign_key_adds("example_entity_two", &expected, CasePolicy::Snake);
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE example_entity_two ADD CONSTRAINT fresh1 FOREIGN KEY (example_entity_one_relationship_one) REFERENCES example_entity_one(id) ON DELETE SET NULL ON UPDATE CASCADE",
                "ALTER TABLE example_entity_two ADD CONSTRAINT fresh2 FOREIGN KEY (example_entity_one_relationship_two) REFERENCES example_entity_one(id) ON DELETE SET NULL ON UPDATE CASCADE",
            ]
        );
    }
}
