use thiserror::Error;

pub type Result<T, E = RegistrarError> = std::result::Result<T, E>;

/// Errors surfaced by the table registrar
#[derive(Error, Debug)]
pub enum RegistrarError {
    #[error("Error connecting to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Error executing `{sql}`: {source}")]
    Execute {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Error closing connection: {0}")]
    Close(#[source] sqlx::Error),

    #[error("Error parsing connection URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Connection URL cannot carry credentials: {0}")]
    Credentials(String),

    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Invalid parquet location '{value}': {reason}")]
    InvalidLocation { value: String, reason: &'static str },
}

impl RegistrarError {
    /// True for failures reported by the database or its driver, as opposed to
    /// rejected configuration or input
    pub fn is_database(&self) -> bool {
        matches!(
            self,
            RegistrarError::Connect { .. }
                | RegistrarError::Execute { .. }
                | RegistrarError::Close(_)
        )
    }
}
