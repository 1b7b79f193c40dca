//! Adapter between the registrar and the SQL server's driver.
use async_trait::async_trait;
use sqlx::any::AnyConnectOptions;
use sqlx::{AnyConnection, ConnectOptions, Connection, Executor};
use std::fmt;
use url::Url;

use crate::config::{CONNECT_TIMEOUT, JDBC_URL_PREFIX};
use crate::error::{RegistrarError, Result};

/// Opens connections to the SQL server
///
/// One connection is acquired per registrar operation and handed back through
/// [`DdlConnection::close`] once its statements have run.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DdlConnection>>;
}

/// A live connection able to run DDL statements one at a time
#[async_trait]
pub trait DdlConnection: Send {
    /// Execute a single statement, returning once the server has applied it
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Gracefully close the connection
    async fn close(self: Box<Self>) -> Result<()>;
}

/// [`Connector`] backed by the `sqlx` driver selected from the URL scheme
/// (`postgres://`, `mysql://`, `sqlite://`)
#[derive(Clone)]
pub struct SqlxConnector {
    connect_options: AnyConnectOptions,
    /// URL with the password stripped, safe to log and to embed in errors
    redacted_url: String,
}

impl SqlxConnector {
    pub fn new(url: &str, user: Option<&str>, password: Option<&str>) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let mut url = Url::parse(url.strip_prefix(JDBC_URL_PREFIX).unwrap_or(url))?;
        if let Some(user) = user {
            url.set_username(user)
                .map_err(|_| RegistrarError::Credentials(url.to_string()))?;
        }
        if let Some(password) = password {
            url.set_password(Some(password))
                .map_err(|_| RegistrarError::Credentials(url.to_string()))?;
        }

        let mut redacted = url.clone();
        // Cannot fail: the password was only ever set on URLs that accept one.
        let _ = redacted.set_password(None);
        let redacted_url = redacted.to_string();

        let connect_options =
            AnyConnectOptions::from_url(&url).map_err(|source| RegistrarError::Connect {
                url: redacted_url.clone(),
                source,
            })?;

        Ok(Self {
            connect_options,
            redacted_url,
        })
    }

    pub fn redacted_url(&self) -> &str {
        &self.redacted_url
    }
}

// Connect options carry the password in their URL.
impl fmt::Debug for SqlxConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlxConnector")
            .field("url", &self.redacted_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    async fn connect(&self) -> Result<Box<dyn DdlConnection>> {
        tracing::debug!(url = %self.redacted_url, "opening connection");

        let conn = tokio::time::timeout(CONNECT_TIMEOUT, self.connect_options.connect())
            .await
            // Convert tokio timeouts into sqlx pool timeouts.
            .map_err(|_| sqlx::Error::PoolTimedOut)
            .and_then(|result| result)
            .map_err(|source| RegistrarError::Connect {
                url: self.redacted_url.clone(),
                source,
            })?;

        Ok(Box::new(SqlxConnection { conn }))
    }
}

struct SqlxConnection {
    conn: AnyConnection,
}

#[async_trait]
impl DdlConnection for SqlxConnection {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        // DDL goes out as a simple query; there is nothing to prepare or bind.
        Executor::execute(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|source| RegistrarError::Execute {
                sql: sql.to_string(),
                source,
            })?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await.map_err(RegistrarError::Close)
    }
}
