//! Integration tests for the registrar and the sqlx connector
//!
//! These tests use SQLite database files in temporary directories to exercise
//! real connections end to end. SQLite does not understand `USING PARQUET`, so
//! registrar statements reaching it surface as database errors.

#[cfg(test)]
mod tests {
    use crate::{
        db::{Connector, SqlxConnector},
        error::RegistrarError,
        registrar::{RegistrarArgsBuilder, TableRegistrar},
    };
    use tempfile::TempDir;

    // ============ Test Helpers ============

    /// Helper to build a URL for a fresh SQLite database file
    fn sqlite_url(dir: &TempDir) -> String {
        format!("sqlite://{}?mode=rwc", dir.path().join("warehouse.db").display())
    }

    fn sqlite_registrar(dir: &TempDir) -> TableRegistrar {
        let args = RegistrarArgsBuilder::default()
            .url(sqlite_url(dir))
            .build()
            .unwrap();
        TableRegistrar::new(args).unwrap()
    }

    // ============ Tests ============

    #[tokio::test]
    async fn test_sqlx_connector_executes_ddl() {
        let temp_dir = TempDir::new().unwrap();
        let connector = SqlxConnector::new(&sqlite_url(&temp_dir), None, None).unwrap();

        let mut conn = connector.connect().await.unwrap();
        conn.execute("CREATE TABLE IF NOT EXISTS patient_t1 (id TEXT)")
            .await
            .unwrap();
        // Idempotent, like every statement the registrar issues.
        conn.execute("CREATE TABLE IF NOT EXISTS patient_t1 (id TEXT)")
            .await
            .unwrap();
        conn.close().await.unwrap();

        // The table is visible from a new connection.
        let mut conn = connector.connect().await.unwrap();
        conn.execute("INSERT INTO patient_t1 (id) VALUES ('p1')")
            .await
            .unwrap();
        conn.execute("DROP TABLE IF EXISTS patient_t1").await.unwrap();
        conn.execute("DROP TABLE IF EXISTS patient_t1").await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlx_connector_reports_failed_statement() {
        let temp_dir = TempDir::new().unwrap();
        let connector = SqlxConnector::new(&sqlite_url(&temp_dir), None, None).unwrap();

        let mut conn = connector.connect().await.unwrap();
        let err = conn.execute("CREATE TABLE (").await.unwrap_err();
        conn.close().await.unwrap();

        assert!(err.is_database());
        match err {
            RegistrarError::Execute { sql, .. } => assert_eq!(sql, "CREATE TABLE ("),
            other => panic!("Expected execute error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_registrar_surfaces_server_rejection() {
        let temp_dir = TempDir::new().unwrap();
        let registrar = sqlite_registrar(&temp_dir);

        let err = registrar
            .create_resource_table("Observation", "t1", "/data/obs")
            .await
            .unwrap_err();

        match err {
            RegistrarError::Execute { sql, .. } => assert_eq!(
                sql,
                "CREATE TABLE IF NOT EXISTS default.Observation_t1 USING PARQUET LOCATION '/data/obs'"
            ),
            other => panic!("Expected execute error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_rejected_statement() {
        let temp_dir = TempDir::new().unwrap();
        let registrar = sqlite_registrar(&temp_dir);

        let err = registrar
            .create_resource_tables("Patient,Observation", "t1", "run1")
            .await
            .unwrap_err();

        match err {
            RegistrarError::Execute { sql, .. } => {
                assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS default.Patient_t1 "))
            }
            other => panic!("Expected execute error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_never_connects() {
        // Nothing listens on port 1; any connection attempt would fail.
        let args = RegistrarArgsBuilder::default()
            .url("postgres://127.0.0.1:1/default")
            .user("hive")
            .password("hive")
            .build()
            .unwrap();
        let registrar = TableRegistrar::new(args).unwrap();

        registrar.create_resource_tables("", "t1", "run1").await.unwrap();

        let err = registrar
            .create_resource_tables("Patient", "t1", "run1")
            .await
            .unwrap_err();
        match err {
            RegistrarError::Connect { url, .. } => {
                assert_eq!(url, "postgres://hive@127.0.0.1:1/default")
            }
            other => panic!("Expected connect error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_scheme_fails_as_database_error() {
        let result = async {
            let connector = SqlxConnector::new("hive2://thrift-server:10000/default", None, None)?;
            connector.connect().await.map(|_| ())
        }
        .await;

        let err = result.unwrap_err();
        assert!(err.is_database());
    }
}
