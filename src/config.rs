//! Configuration constants for the table registrar
//!
//! This module centralizes the fixed names and tunables shared by the DDL
//! builder, the connector and the CLI.

use std::time::Duration;

// ============================================================================
// Warehouse Layout
// ============================================================================

/// Directory on the SQL server's storage hosting the pipeline's Parquet output
///
/// The batch operation resolves every location as `<root>/<suffix>/<resource>`.
pub const PARQUET_ROOT: &str = "/dwh";

/// Database (schema) every registered table is qualified with
pub const DATABASE: &str = "default";

// ============================================================================
// Connection Configuration
// ============================================================================

/// Timeout for establishing a connection to the SQL server
///
/// Set to 45 seconds because Thrift servers backed by a cold Spark session can
/// take a while to accept the first connection. Statement execution itself is
/// not bounded.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(45);

/// Prefix of JDBC-style URLs, stripped before handing the URL to the driver
pub const JDBC_URL_PREFIX: &str = "jdbc:";
