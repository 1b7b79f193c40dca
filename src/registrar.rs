//! Registration of Parquet-backed tables on the warehouse SQL server.
//!
//! After every pipeline run the output of each resource type is exposed twice:
//! as a snapshot table named after the run's timestamp, and as the canonical
//! table that always points at the latest run.
//!
//! This is the primary API for the pipeline controller and for the CLI.

use derive_builder::Builder;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PARQUET_ROOT;
use crate::db::ddl::{self, parse_resource_list};
use crate::db::{Connector, DdlConnection, SqlxConnector};
use crate::error::{RegistrarError, Result};

/// Connection settings of a [`TableRegistrar`]
#[derive(Builder)]
pub struct RegistrarArgs {
    /// Server URL, e.g. `postgres://thrift-server:10000/default`; a `jdbc:` prefix is accepted
    #[builder(setter(into))]
    url: String,
    #[builder(setter(into, strip_option), default)]
    user: Option<String>,
    #[builder(setter(into, strip_option), default)]
    password: Option<String>,
    /// Root directory of the batch layout on the server's storage
    #[builder(setter(into), default = "PARQUET_ROOT.to_string()")]
    parquet_root: String,
}

/// Issues the DDL registering pipeline output as tables
///
/// Statements are executed strictly in order on a single connection per
/// operation. Nothing is retried and nothing is rolled back: the statements
/// are idempotent, so re-running a failed operation is safe.
///
/// # Example
///
/// ```no_run
/// use dwh_table_registrar::registrar::{RegistrarArgsBuilder, TableRegistrar};
///
/// # async fn example() -> anyhow::Result<()> {
/// let args = RegistrarArgsBuilder::default()
///     .url("postgres://thrift-server:10000/default")
///     .user("hive")
///     .password("hive")
///     .build()?;
///
/// let registrar = TableRegistrar::new(args)?;
/// registrar
///     .create_resource_tables("Patient,Observation", "2023_01_24t18_42_54_302111z", "run1")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TableRegistrar {
    connector: Arc<dyn Connector>,
    parquet_root: String,
}

impl TableRegistrar {
    /// Create a registrar talking to the server through the `sqlx` driver
    ///
    /// No connection is opened until an operation runs.
    pub fn new(args: RegistrarArgs) -> Result<Self> {
        let RegistrarArgs {
            url,
            user,
            password,
            parquet_root,
        } = args;

        let connector = SqlxConnector::new(&url, user.as_deref(), password.as_deref())?;
        debug!(url = connector.redacted_url(), "configured table registrar");

        Ok(Self::with_connector(Arc::new(connector), parquet_root))
    }

    /// Create a registrar on top of any [`Connector`]
    pub fn with_connector(connector: Arc<dyn Connector>, parquet_root: impl Into<String>) -> Self {
        Self {
            connector,
            parquet_root: parquet_root.into(),
        }
    }

    /// Register snapshot and canonical tables for every resource in a comma
    /// separated list
    ///
    /// Files are expected under `<parquet_root>/<parquet_path_suffix>/<resource>`.
    /// An empty list is a no-op and opens no connection. The first failing
    /// statement aborts the remaining resources.
    pub async fn create_resource_tables(
        &self,
        resource_list: &str,
        timestamp: &str,
        parquet_path_suffix: &str,
    ) -> Result<()> {
        let resources = parse_resource_list(resource_list);
        if resources.is_empty() {
            debug!("no resources to register");
            return Ok(());
        }
        self.validate_batch(&resources, timestamp, parquet_path_suffix)?;

        info!(
            resources = resources.len(),
            timestamp, parquet_path_suffix, "registering resource tables"
        );

        let mut conn = self.connector.connect().await?;
        let result = async {
            for resource in &resources {
                self.create_resource_and_canonical_tables(
                    conn.as_mut(),
                    resource,
                    timestamp,
                    parquet_path_suffix,
                )
                .await?;
            }
            Ok::<_, RegistrarError>(())
        }
        .await;

        release(conn, result).await
    }

    /// Register a single snapshot table over a fully resolved location
    ///
    /// The canonical table is left untouched.
    pub async fn create_resource_table(
        &self,
        resource: &str,
        timestamp: &str,
        parquet_path: &str,
    ) -> Result<()> {
        let sql = self.plan_resource_table(resource, timestamp, parquet_path)?;

        info!(resource, timestamp, parquet_path, "registering snapshot table");
        self.execute_on_new_connection(&sql).await
    }

    /// Register the canonical table of a resource over a fully resolved
    /// location, unless one already exists
    pub async fn create_resource_canonical_table(
        &self,
        resource: &str,
        parquet_path: &str,
    ) -> Result<()> {
        let sql = self.plan_resource_canonical_table(resource, parquet_path)?;

        info!(resource, parquet_path, "registering canonical table");
        self.execute_on_new_connection(&sql).await
    }

    /// Statements [`Self::create_resource_tables`] would execute, in order
    pub fn plan_resource_tables(
        &self,
        resource_list: &str,
        timestamp: &str,
        parquet_path_suffix: &str,
    ) -> Result<Vec<String>> {
        let resources = parse_resource_list(resource_list);
        if resources.is_empty() {
            return Ok(Vec::new());
        }
        self.validate_batch(&resources, timestamp, parquet_path_suffix)?;

        Ok(resources
            .iter()
            .flat_map(|resource| {
                let location =
                    ddl::batch_location(&self.parquet_root, parquet_path_suffix, resource);
                ddl::snapshot_and_canonical_statements(resource, timestamp, &location)
            })
            .collect())
    }

    /// Statement [`Self::create_resource_table`] would execute
    pub fn plan_resource_table(
        &self,
        resource: &str,
        timestamp: &str,
        parquet_path: &str,
    ) -> Result<String> {
        ddl::validate_resource(resource)?;
        ddl::validate_timestamp(timestamp)?;
        ddl::validate_location(parquet_path)?;

        Ok(ddl::create_table_sql(
            &ddl::snapshot_table_name(resource, timestamp),
            parquet_path,
        ))
    }

    /// Statement [`Self::create_resource_canonical_table`] would execute
    pub fn plan_resource_canonical_table(
        &self,
        resource: &str,
        parquet_path: &str,
    ) -> Result<String> {
        ddl::validate_resource(resource)?;
        ddl::validate_location(parquet_path)?;

        Ok(ddl::create_table_sql(resource, parquet_path))
    }

    /// Snapshot table, then drop and recreate the canonical table, on a shared
    /// connection
    ///
    /// The canonical table is dropped first so it always reflects the newest
    /// location. A crash between the drop and the create leaves the resource
    /// without a canonical table until the next run.
    async fn create_resource_and_canonical_tables(
        &self,
        conn: &mut dyn DdlConnection,
        resource: &str,
        timestamp: &str,
        parquet_path_suffix: &str,
    ) -> Result<()> {
        let location = ddl::batch_location(&self.parquet_root, parquet_path_suffix, resource);
        info!(resource, location, "registering snapshot and canonical tables");

        for sql in ddl::snapshot_and_canonical_statements(resource, timestamp, &location) {
            execute_sql(conn, &sql).await?;
        }
        Ok(())
    }

    async fn execute_on_new_connection(&self, sql: &str) -> Result<()> {
        let mut conn = self.connector.connect().await?;
        let result = execute_sql(conn.as_mut(), sql).await;
        release(conn, result).await
    }

    /// Reject every bad input up front so no statement runs for a partially
    /// valid batch
    fn validate_batch(
        &self,
        resources: &[&str],
        timestamp: &str,
        parquet_path_suffix: &str,
    ) -> Result<()> {
        ddl::validate_timestamp(timestamp)?;
        ddl::validate_location(parquet_path_suffix)?;
        for resource in resources {
            ddl::validate_resource(resource)?;
            ddl::validate_location(&ddl::batch_location(
                &self.parquet_root,
                parquet_path_suffix,
                resource,
            ))?;
        }
        Ok(())
    }
}

async fn execute_sql(conn: &mut dyn DdlConnection, sql: &str) -> Result<()> {
    debug!(sql, "executing statement");
    conn.execute(sql).await
}

/// Close the connection whatever the outcome of the statements run on it
///
/// A failed close is logged; the statements' result is what the caller sees.
async fn release(conn: Box<dyn DdlConnection>, result: Result<()>) -> Result<()> {
    if let Err(err) = conn.close().await {
        warn!(error = %err, "failed to close connection");
    }
    result
}
