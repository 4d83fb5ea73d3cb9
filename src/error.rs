use thiserror::Error;

/// Internal application errors surfaced during account deletion.
///
/// Every variant ends up as a `500` response; validation and not-found outcomes
/// are ordinary responses and never travel through this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid tenant database name `{0}`")]
    InvalidDatabaseName(String),
    #[error("database `{database}`: {source}")]
    Database {
        database: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("database `{database}`: {operation} timed out")]
    Timeout {
        database: String,
        operation: &'static str,
    },
    #[error("invocation error: {0}")]
    Invocation(String),
    #[error("malformed payload: {0}")]
    Payload(String),
}

impl AppError {
    /// Short classification string used for logging.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::InvalidDatabaseName(_) | AppError::Database { .. } => "database",
            AppError::Timeout { .. } => "timeout",
            AppError::Invocation(_) => "invocation",
            AppError::Payload(_) => "payload",
        }
    }

    pub(crate) fn database(database: &str, source: sqlx::Error) -> Self {
        AppError::Database {
            database: database.to_owned(),
            source,
        }
    }
}
