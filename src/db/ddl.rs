//! DDL text generation for Parquet-backed tables
//!
//! Table names and locations cannot be bound as query parameters, so every
//! value is validated here before it is substituted into the statement text.

use chrono::{DateTime, Utc};

use crate::config::DATABASE;
use crate::error::{RegistrarError, Result};

/// Split a comma separated resource list such as `Patient,Observation`
///
/// Entries are trimmed and blank entries are skipped, so an empty list yields
/// no resources at all.
pub fn parse_resource_list(resource_list: &str) -> Vec<&str> {
    resource_list
        .split(',')
        .map(str::trim)
        .filter(|resource| !resource.is_empty())
        .collect()
}

/// Render the timestamp suffix used for snapshot table names
///
/// `2023-01-24T18:42:54.302111Z` becomes `2023_01_24t18_42_54_302111z`.
pub fn timestamp_suffix(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y_%m_%dt%H_%M_%S_%6fz").to_string()
}

/// Name of the snapshot table for one pipeline run
pub fn snapshot_table_name(resource: &str, timestamp: &str) -> String {
    format!("{}_{}", resource, timestamp)
}

/// `CREATE TABLE IF NOT EXISTS` over the Parquet files at `location`
pub fn create_table_sql(table: &str, location: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} USING PARQUET LOCATION '{}'",
        DATABASE, table, location
    )
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}.{}", DATABASE, table)
}

/// Statements registering a resource's snapshot table and repointing its
/// canonical table at the same location
///
/// The order is fixed: snapshot, drop canonical, create canonical.
pub fn snapshot_and_canonical_statements(
    resource: &str,
    timestamp: &str,
    location: &str,
) -> [String; 3] {
    [
        create_table_sql(&snapshot_table_name(resource, timestamp), location),
        drop_table_sql(resource),
        create_table_sql(resource, location),
    ]
}

/// Location of a resource's files under the batch directory layout
pub fn batch_location(parquet_root: &str, path_suffix: &str, resource: &str) -> String {
    format!("{}/{}/{}", parquet_root, path_suffix, resource)
}

/// Resource names must be plain identifiers: an ASCII letter followed by ASCII
/// letters, digits or underscores
pub fn validate_resource(resource: &str) -> Result<()> {
    let invalid = |reason: &'static str| RegistrarError::InvalidIdentifier {
        kind: "resource name",
        value: resource.to_string(),
        reason,
    };

    let mut chars = resource.chars();
    match chars.next() {
        None => return Err(invalid("must not be empty")),
        Some(first) if !first.is_ascii_alphabetic() => {
            return Err(invalid("must start with an ASCII letter"));
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("may only contain ASCII letters, digits and '_'"));
    }
    Ok(())
}

pub fn validate_timestamp(timestamp: &str) -> Result<()> {
    let invalid = |reason: &'static str| RegistrarError::InvalidIdentifier {
        kind: "timestamp suffix",
        value: timestamp.to_string(),
        reason,
    };

    if timestamp.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if !timestamp
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid("may only contain ASCII letters, digits and '_'"));
    }
    Ok(())
}

/// Locations end up inside a single-quoted SQL literal
pub fn validate_location(location: &str) -> Result<()> {
    let invalid = |reason: &'static str| RegistrarError::InvalidLocation {
        value: location.to_string(),
        reason,
    };

    if location.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if location.contains(['\'', '\\']) {
        return Err(invalid("must not contain quotes or backslashes"));
    }
    if location.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    Ok(())
}
