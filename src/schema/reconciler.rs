//! The schema reconciliation engine
//!
//! Drives the phased convergence of every module's schema onto the data
//! model: integrity probe, orphan-table cleanup, table creation, the
//! foreign-key drop pass, column and index reconciliation, and the
//! foreign-key rebuild, with FOREIGN_KEY_CHECKS disabled for the whole
//! mutation window.
//!
//! MySQL implicitly commits DDL, so there is no transactional rollback of
//! schema changes: every statement commits as it executes, the first
//! failure aborts the run, and the schema may be left partially
//! reconciled. All run state lives in this context object.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::db::ModuleConnection;
use crate::error::{Error, Result};
use crate::model::DataModel;
use crate::schema::planner::{self, ExistingColumn};
use crate::schema::types::{ColumnRecord, ForeignKeySpec, SyncSummary};
use crate::schema::generator;
use crate::ui::{Answer, Interaction, Level};
use crate::utils::naming::{self, CasePolicy};

const SECTION_TABLES: &str = "Existing table clean up";
const SECTION_CREATE: &str = "Create new tables";
const SECTION_COLUMNS: &str = "Update columns";
const SECTION_INDEXES: &str = "Update indexes";
const SECTION_RELATIONSHIPS: &str = "Update relationships";

/// Run-scoped reconciliation context: validated model, one connection per
/// configured module, and the expected foreign keys freshly named for
/// this run.
pub struct Reconciler {
    model: DataModel,
    policy: CasePolicy,
    connections: IndexMap<String, ModuleConnection>,
    expected_fks: IndexMap<String, Vec<ForeignKeySpec>>,
}

impl Reconciler {
    /// Open a connection per configured module and prepare the run
    pub async fn connect(
        model: DataModel,
        config: &ConnectionConfig,
        policy: CasePolicy,
    ) -> Result<Self> {
        let mut connections = IndexMap::new();
        for mapping in &config.module_schema_mapping {
            let connection =
                ModuleConnection::connect(&mapping.module_name, &mapping.schema_name, config)
                    .await?;
            connections.insert(mapping.module_name.clone(), connection);
        }

        let expected_fks = expected_foreign_keys(&model, policy);

        Ok(Self {
            model,
            policy,
            connections,
            expected_fks,
        })
    }

    /// Execute the full phased reconciliation. Foreign-key checks are
    /// restored on every connection whichever way the mutation phases
    /// resolve.
    pub async fn run(self, ui: &mut dyn Interaction) -> Result<SyncSummary> {
        debug!(phase = "integrity probe");
        self.integrity_probe().await?;

        if ui.confirm("Ready to proceed?")? != Answer::Yes {
            return Err(Error::Cancelled);
        }

        debug!(phase = "disable foreign key checks");
        for connection in self.connections.values() {
            connection.set_foreign_key_checks(false).await?;
        }

        let outcome = self.mutate(ui).await;

        debug!(phase = "restore foreign key checks");
        self.restore_foreign_key_checks(ui).await;

        outcome
    }

    /// Verify every module's default storage engine is InnoDB
    async fn integrity_probe(&self) -> Result<()> {
        for (module, connection) in &self.connections {
            if !connection.engine_supports_innodb().await? {
                return Err(Error::Integrity(format!(
                    "Module '{module}' default storage engine is not InnoDB"
                )));
            }
        }
        Ok(())
    }

    /// Phases 4 through 10, run with foreign-key checks disabled
    async fn mutate(&self, ui: &mut dyn Interaction) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        debug!(phase = "introspect tables");
        let mut existing_tables: IndexMap<String, Vec<String>> = IndexMap::new();
        for (module, connection) in &self.connections {
            let tables = connection.introspect_tables().await?;
            existing_tables.insert(
                module.clone(),
                tables
                    .into_iter()
                    .filter(|t| t.is_base_table())
                    .map(|t| t.name)
                    .collect(),
            );
        }

        let tables_expected: HashSet<String> = self
            .model
            .keys()
            .map(|entity| naming::normalize(entity, self.policy))
            .collect();

        debug!(phase = "drop orphan tables");
        self.drop_orphan_tables(ui, &existing_tables, &tables_expected, &mut summary)
            .await?;

        debug!(phase = "create new tables");
        self.create_missing_tables(ui, &existing_tables, &mut summary)
            .await?;

        debug!(phase = "drop stale foreign keys");
        self.drop_stale_foreign_keys(&mut summary).await?;

        debug!(phase = "reconcile columns");
        self.reconcile_columns(ui, &mut summary).await?;

        debug!(phase = "reconcile indexes");
        self.reconcile_indexes(ui, &mut summary).await?;

        debug!(phase = "create foreign keys");
        self.create_foreign_keys(ui, &mut summary).await?;

        Ok(summary)
    }

    async fn drop_orphan_tables(
        &self,
        ui: &mut dyn Interaction,
        existing_tables: &IndexMap<String, Vec<String>>,
        tables_expected: &HashSet<String>,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let orphans = partition_orphans(existing_tables, tables_expected);
        let total: usize = orphans.values().map(Vec::len).sum();

        if total == 0 {
            ui.report(SECTION_TABLES, "No orphan tables found", Level::Success);
            return Ok(());
        }

        loop {
            let answer =
                ui.choose_disposition(&format!("{total} orphan tables found. Drop them?"))?;
            match answer {
                Answer::All => {
                    for (module, tables) in &orphans {
                        let connection = self.connection(module)?;
                        connection.execute(&generator::drop_tables(tables)).await?;
                        summary.tables_removed += tables.len();
                    }
                }
                Answer::Yes => {
                    for (module, tables) in &orphans {
                        let connection = self.connection(module)?;
                        for table in tables {
                            if ui.confirm(&format!("Drop table {table}?"))? == Answer::Yes {
                                connection.execute(&generator::drop_table(table)).await?;
                                summary.tables_removed += 1;
                            }
                        }
                    }
                }
                Answer::List => {
                    for (module, tables) in &orphans {
                        for table in tables {
                            ui.report(SECTION_TABLES, &format!("{table} ({module})"), Level::Info);
                        }
                    }
                    continue;
                }
                Answer::None | Answer::No => {
                    ui.report(SECTION_TABLES, "Orphan tables left untouched", Level::Info);
                    return Ok(());
                }
            }
            ui.report(
                SECTION_TABLES,
                &format!("{} tables removed", summary.tables_removed),
                Level::Success,
            );
            return Ok(());
        }
    }

    async fn create_missing_tables(
        &self,
        ui: &mut dyn Interaction,
        existing_tables: &IndexMap<String, Vec<String>>,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        for (entity_name, entity) in &self.model {
            let table = naming::normalize(entity_name, self.policy);
            let already_there = existing_tables
                .get(&entity.module)
                .map(|tables| tables.contains(&table))
                .unwrap_or(false);
            if already_there {
                continue;
            }

            let connection = self.connection(&entity.module)?;
            let sql = generator::create_table(&table, naming::primary_key_column(self.policy));
            connection.execute(&sql).await?;
            ui.report(SECTION_CREATE, &format!("Created table {table}"), Level::Info);
            summary.tables_created += 1;
        }

        ui.report(
            SECTION_CREATE,
            &format!("{} tables created", summary.tables_created),
            Level::Success,
        );
        Ok(())
    }

    /// First relationships pass: drop every stored constraint whose name
    /// is not expected this run. Expected names are fresh, so stored
    /// foreign keys never match and are all rebuilt; running this before
    /// column reconciliation frees relationship columns for type changes.
    async fn drop_stale_foreign_keys(&self, summary: &mut SyncSummary) -> Result<()> {
        for (entity_name, entity) in &self.model {
            let table = naming::normalize(entity_name, self.policy);
            let connection = self.connection(&entity.module)?;

            let stored = connection.introspect_foreign_keys(&table).await?;
            let stored_names: Vec<String> =
                stored.into_iter().map(|fk| fk.constraint_name).collect();
            let expected = self
                .expected_fks
                .get(entity_name)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            for sql in
                planner::plan_foreign_key_drops(connection.schema(), &table, &stored_names, expected)
            {
                connection.execute(&sql).await?;
                summary.foreign_keys_dropped += 1;
            }
        }
        Ok(())
    }

    async fn reconcile_columns(
        &self,
        ui: &mut dyn Interaction,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        for (entity_name, entity) in &self.model {
            let table = naming::normalize(entity_name, self.policy);
            let connection = self.connection(&entity.module)?;

            let columns = connection.introspect_columns(&table).await?;
            let existing: Vec<ExistingColumn> = columns
                .into_iter()
                .map(|c| ExistingColumn {
                    name: c.field,
                    record: ColumnRecord::from_introspection(&c.column_type, &c.null, c.default),
                })
                .collect();

            let plan = planner::plan_columns(&table, entity, &existing, self.policy);
            for sql in &plan.statements {
                connection.execute(sql).await?;
            }
            summary.columns_added += plan.added;
            summary.columns_modified += plan.modified;
            summary.columns_dropped += plan.dropped;
        }

        ui.report(
            SECTION_COLUMNS,
            &format!(
                "{} columns added, {} modified, {} removed",
                summary.columns_added, summary.columns_modified, summary.columns_dropped
            ),
            Level::Success,
        );
        Ok(())
    }

    async fn reconcile_indexes(
        &self,
        ui: &mut dyn Interaction,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        for (entity_name, entity) in &self.model {
            let table = naming::normalize(entity_name, self.policy);
            let connection = self.connection(&entity.module)?;

            let rows = connection.introspect_indexes(&table).await?;
            let mut existing_names: Vec<String> = Vec::new();
            for row in rows {
                if !existing_names.contains(&row.key_name) {
                    existing_names.push(row.key_name);
                }
            }

            let expected_fk_names: Vec<String> = self
                .expected_fks
                .get(entity_name)
                .map(|specs| specs.iter().map(|s| s.constraint_name.clone()).collect())
                .unwrap_or_default();

            let plan = planner::plan_indexes(
                &table,
                entity,
                &existing_names,
                &expected_fk_names,
                self.policy,
            );
            for sql in &plan.statements {
                connection.execute(sql).await?;
            }
            summary.indexes_added += plan.added;
            summary.indexes_removed += plan.removed;
        }

        ui.report(
            SECTION_INDEXES,
            &format!(
                "{} Indexes added, {} removed",
                summary.indexes_added, summary.indexes_removed
            ),
            Level::Success,
        );
        Ok(())
    }

    /// Second relationships pass: create every expected foreign key under
    /// its fresh name.
    async fn create_foreign_keys(
        &self,
        ui: &mut dyn Interaction,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        for (entity_name, entity) in &self.model {
            let table = naming::normalize(entity_name, self.policy);
            let connection = self.connection(&entity.module)?;

            let specs = self
                .expected_fks
                .get(entity_name)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let valid: Vec<ForeignKeySpec> = specs
                .iter()
                .filter(|spec| {
                    let known = entity
                        .relationship_for_column(&spec.column, self.policy)
                        .is_some();
                    if !known {
                        warn!(
                            entity = %entity_name,
                            column = %spec.column,
                            "No relationship resolves to this column; skipping foreign key"
                        );
                    }
                    known
                })
                .cloned()
                .collect();

            for sql in planner::plan_foreign_key_adds(&table, &valid, self.policy) {
                connection.execute(&sql).await?;
                summary.foreign_keys_created += 1;
            }
        }

        ui.report(
            SECTION_RELATIONSHIPS,
            &format!(
                "{} foreign keys dropped, {} created",
                summary.foreign_keys_dropped, summary.foreign_keys_created
            ),
            Level::Success,
        );
        Ok(())
    }

    /// Best-effort restore of FOREIGN_KEY_CHECKS on every connection; runs
    /// on every exit path of the mutation phases.
    async fn restore_foreign_key_checks(&self, ui: &mut dyn Interaction) {
        for (module, connection) in &self.connections {
            if let Err(e) = connection.set_foreign_key_checks(true).await {
                ui.report(
                    SECTION_RELATIONSHIPS,
                    &format!("Failed to restore foreign key checks on module '{module}': {e}"),
                    Level::Error,
                );
            }
        }
    }

    fn connection(&self, module: &str) -> Result<&ModuleConnection> {
        self.connections.get(module).ok_or_else(|| {
            Error::Integrity(format!("Module '{module}' has no open connection"))
        })
    }
}

/// Expected foreign keys per entity, freshly named for this run. One spec
/// per relationship role, in model declaration order.
fn expected_foreign_keys(
    model: &DataModel,
    policy: CasePolicy,
) -> IndexMap<String, Vec<ForeignKeySpec>> {
    model
        .iter()
        .map(|(entity_name, entity)| {
            let specs = entity
                .relationship_columns(policy)
                .into_iter()
                .map(|(column, related)| ForeignKeySpec {
                    column,
                    referenced_entity: related,
                    constraint_name: naming::fresh_constraint_name(),
                })
                .collect();
            (entity_name.clone(), specs)
        })
        .collect()
}

/// Orphan tables per module: existing base tables not expected by the
/// model, partitioned so each drop runs on the owning connection.
fn partition_orphans(
    existing_tables: &IndexMap<String, Vec<String>>,
    tables_expected: &HashSet<String>,
) -> IndexMap<String, Vec<String>> {
    let mut orphans = IndexMap::new();
    for (module, tables) in existing_tables {
        let stray: Vec<String> = tables
            .iter()
            .filter(|table| !tables_expected.contains(*table))
            .cloned()
            .collect();
        if !stray.is_empty() {
            orphans.insert(module.clone(), stray);
        }
    }
    orphans
}
