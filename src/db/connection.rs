//! Per-module database connection handling

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use sqlx::Row;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};

const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection to the schema backing one module. The pool is capped at a
/// single connection so session-scoped flags such as FOREIGN_KEY_CHECKS
/// apply to every statement of the run.
#[derive(Debug, Clone)]
pub struct ModuleConnection {
    module: String,
    schema: String,
    pool: MySqlPool,
}

impl ModuleConnection {
    /// Open the connection for a module's schema
    pub async fn connect(module: &str, schema: &str, config: &ConnectionConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(schema);

        options = match &config.ssl {
            Some(ssl) => options
                .ssl_mode(MySqlSslMode::VerifyCa)
                .ssl_ca(&ssl.ca)
                .ssl_client_cert(&ssl.cert)
                .ssl_client_key(&ssl.key),
            None => options.ssl_mode(MySqlSslMode::Preferred),
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| Error::connect(module, e.to_string()))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| Error::connect(module, e.to_string()))?;

        info!(module, schema, "Connected");

        Ok(Self {
            module: module.to_string(),
            schema: schema.to_string(),
            pool,
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub(crate) fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Execute one DDL statement
    pub async fn execute(&self, sql: &str) -> Result<()> {
        debug!(module = %self.module, sql, "Executing DDL");
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::ddl(&self.module, &self.schema, sql, e.to_string()))?;
        Ok(())
    }

    /// Toggle the session-scoped FOREIGN_KEY_CHECKS flag
    pub async fn set_foreign_key_checks(&self, enabled: bool) -> Result<()> {
        let sql = if enabled {
            "SET FOREIGN_KEY_CHECKS = 1"
        } else {
            "SET FOREIGN_KEY_CHECKS = 0"
        };
        self.execute(sql).await
    }

    /// Whether the module's default storage engine is InnoDB
    pub async fn engine_supports_innodb(&self) -> Result<bool> {
        let sql = "SELECT @@default_storage_engine";
        let row = sqlx::query(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::introspection(&self.module, &self.schema, sql, e.to_string()))?;
        let engine: String = row
            .try_get(0)
            .map_err(|e| Error::introspection(&self.module, &self.schema, sql, e.to_string()))?;
        Ok(engine_name_is_innodb(&engine))
    }

    pub(crate) fn introspection_error(&self, sql: &str, e: sqlx::Error) -> Error {
        Error::introspection(&self.module, &self.schema, sql, e.to_string())
    }
}

/// Whether a reported storage engine name is InnoDB. The server reports
/// the name in varying case.
pub fn engine_name_is_innodb(engine: &str) -> bool {
    engine.eq_ignore_ascii_case("InnoDB")
}
