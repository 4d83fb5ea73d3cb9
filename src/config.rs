//! Environment-sourced configuration, read once during cold start.

use std::{env, fmt, time::Duration};

use crate::error::AppError;

const DB_HOST_ENV: &str = "DB_HOST";
const DB_PORT_ENV: &str = "DB_PORT";
const DB_USER_ENV: &str = "DB_USER";
const DB_PASSWORD_ENV: &str = "DB_PASSWORD";
const DB_PASSWORD_PARAMETER_ENV: &str = "DB_PASSWORD_PARAMETER";
const CENTRAL_DB_NAME_ENV: &str = "CENTRAL_DB_NAME";
const IDENTITY_FUNCTION_ENV: &str = "IDENTITY_DELETION_FUNCTION";

pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_CENTRAL_DB_NAME: &str = "sisco_central";
pub const DEFAULT_IDENTITY_FUNCTION: &str = "siscoapp-propietarios-eliminar-cuenta-cognito";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters shared by every database the handler talks to.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

// Keeps the password out of logs.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl DbConfig {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_DB_PORT,
            user: user.into(),
            password: password.into(),
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
        }
    }
}

/// Everything the handler needs besides the SDK clients.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db: DbConfig,
    pub central_database: String,
    pub identity_function: String,
    /// SSM parameter holding the database password, when the secret is not
    /// injected through `DB_PASSWORD`.
    pub password_parameter: Option<String>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// `DB_PASSWORD` may be absent when `DB_PASSWORD_PARAMETER` is set; the
    /// password is then resolved later with [`AppConfig::with_password`].
    pub fn from_env() -> Result<Self, AppError> {
        let password_parameter = optional(DB_PASSWORD_PARAMETER_ENV);
        let password = match optional(DB_PASSWORD_ENV) {
            Some(password) => password,
            None if password_parameter.is_some() => String::new(),
            None => return Err(missing(DB_PASSWORD_ENV)),
        };

        let port = match optional(DB_PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                AppError::Config(format!("{DB_PORT_ENV} is not a valid port: `{raw}`"))
            })?,
            None => DEFAULT_DB_PORT,
        };

        let mut db = DbConfig::new(required(DB_HOST_ENV)?, required(DB_USER_ENV)?, password);
        db.port = port;

        Ok(Self {
            db,
            central_database: optional(CENTRAL_DB_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_CENTRAL_DB_NAME.to_owned()),
            identity_function: optional(IDENTITY_FUNCTION_ENV)
                .unwrap_or_else(|| DEFAULT_IDENTITY_FUNCTION.to_owned()),
            password_parameter,
        })
    }

    /// Replace the database password (used once the SSM lookup succeeds).
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.db.password = password.into();
        self
    }

    /// True when no password came from the environment.
    pub fn password_missing(&self) -> bool {
        self.db.password.is_empty()
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}

fn required(key: &str) -> Result<String, AppError> {
    optional(key).ok_or_else(|| missing(key))
}

fn missing(key: &str) -> AppError {
    AppError::Config(format!("missing {key} env var"))
}
