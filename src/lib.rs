//! model-sync: reconcile a declarative data model against MySQL/MariaDB
//!
//! model-sync takes a JSON data model describing entities, attributes,
//! indexes and relationships, diffs it against the live schemas of one or
//! more modules, and executes the DDL that makes the database converge on
//! the model: tables are created and dropped, columns added, modified and
//! removed, indexes rebuilt, and foreign keys synchronised.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod schema;
pub mod ui;
pub mod utils;

use std::path::Path;

// Flatten the surface callers need into the crate root
pub use config::ConnectionConfig;
pub use error::{Error, Result};
pub use model::{DataModel, EntityDefinition};
pub use schema::reconciler::Reconciler;
pub use schema::types::SyncSummary;
pub use ui::{Answer, ConsoleUi, HeadlessUi, Interaction};
pub use utils::naming::CasePolicy;

/// Initialize a sync client from the data model and connection
/// configuration files
pub async fn init(
    model_path: &Path,
    config_path: &Path,
    policy: CasePolicy,
) -> Result<SyncClient> {
    let config = config::load_from_file(config_path)?;
    let model = model::load_from_file(model_path, &config)?;
    Ok(SyncClient {
        model,
        config,
        policy,
    })
}

/// The main client for running reconciliations
pub struct SyncClient {
    model: DataModel,
    config: ConnectionConfig,
    policy: CasePolicy,
}

impl SyncClient {
    /// Create a client from an already validated model and configuration
    pub fn new(model: DataModel, config: ConnectionConfig, policy: CasePolicy) -> Self {
        Self {
            model,
            config,
            policy,
        }
    }

    pub fn model(&self) -> &DataModel {
        &self.model
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connect to every configured module and run the full reconciliation
    pub async fn sync(&self, ui: &mut dyn Interaction) -> Result<SyncSummary> {
        let reconciler =
            Reconciler::connect(self.model.clone(), &self.config, self.policy).await?;
        reconciler.run(ui).await
    }
}
