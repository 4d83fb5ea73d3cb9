//! Relational side of an account deletion: the tenant audit entry and the
//! central account/notification purge.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow},
    ConnectOptions, Connection, Row,
};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::{config::DbConfig, error::AppError};

/// `bitacora.modulo` for account actions.
pub const AUDIT_MODULE: &str = "Cuenta";
/// `bitacora.accion` for a deletion.
pub const AUDIT_ACTION: &str = "Eliminar Cuenta";
/// Deletion kind recorded in the audit detail; users delete their own accounts.
pub const DELETION_KIND: &str = "voluntaria";

const MAX_DATABASE_NAME_LEN: usize = 64;

const SELECT_USER: &str = "SELECT id FROM usuarios WHERE documento = ?";
const INSERT_AUDIT: &str = "INSERT INTO bitacora \
     (usuario_documento, responsable, modulo, accion, detalles, fecha) \
     VALUES (?, ?, ?, ?, ?, NOW())";
const DELETE_SYSTEM_ACCOUNT: &str =
    "DELETE FROM usuarios_sistema WHERE documento = ? AND proyecto_nit = ?";
const DELETE_NOTIFICATIONS: &str =
    "DELETE FROM notificaciones WHERE usuario_documento = ? AND proyecto_nit = ?";

/// Primary key of a `usuarios` row, whatever its column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserId {
    Signed(i64),
    Unsigned(u64),
    Text(String),
}

impl UserId {
    fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        if let Ok(id) = row.try_get::<i64, _>("id") {
            return Ok(UserId::Signed(id));
        }
        if let Ok(id) = row.try_get::<u64, _>("id") {
            return Ok(UserId::Unsigned(id));
        }
        row.try_get::<String, _>("id").map(UserId::Text)
    }
}

/// JSON stored in `bitacora.detalles`.
#[derive(Debug, Serialize)]
pub struct AuditDetail<'a> {
    pub usuario_id: &'a UserId,
    pub tipo: &'a str,
}

impl<'a> AuditDetail<'a> {
    pub fn voluntary(usuario_id: &'a UserId) -> Self {
        Self {
            usuario_id,
            tipo: DELETION_KIND,
        }
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Payload(format!("failed to encode audit detail: {e}")))
    }
}

/// Rows removed from the central database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CentralPurge {
    pub accounts: u64,
    pub notifications: u64,
}

/// Persistence port used by the handler.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look the user up in the tenant database and, when found, append and
    /// commit the deletion audit entry. `None` means the user does not exist
    /// and nothing was written.
    async fn record_tenant_deletion(
        &self,
        tenant_database: &str,
        documento: &str,
    ) -> Result<Option<UserId>, AppError>;

    /// Remove the system account and its notifications from the central
    /// database in one committed transaction. Zero matching rows is not an error.
    async fn purge_central_account(
        &self,
        documento: &str,
        proyecto_nit: &str,
    ) -> Result<CentralPurge, AppError>;
}

/// MySQL-backed store. Opens one connection per phase and closes it when the
/// phase ends.
#[derive(Debug, Clone)]
pub struct MySqlAccountStore {
    db: DbConfig,
    central_database: String,
}

impl MySqlAccountStore {
    pub fn new(db: DbConfig, central_database: impl Into<String>) -> Self {
        Self {
            db,
            central_database: central_database.into(),
        }
    }

    pub fn central_database(&self) -> &str {
        &self.central_database
    }

    /// Open a connection to `database` within the connect timeout.
    pub async fn connect(&self, database: &str) -> Result<MySqlConnection, AppError> {
        let options = MySqlConnectOptions::new()
            .host(&self.db.host)
            .port(self.db.port)
            .username(&self.db.user)
            .password(&self.db.password)
            .database(database);
        bounded(database, "connect", self.db.connect_timeout, options.connect()).await
    }
}

#[async_trait]
impl AccountStore for MySqlAccountStore {
    async fn record_tenant_deletion(
        &self,
        tenant_database: &str,
        documento: &str,
    ) -> Result<Option<UserId>, AppError> {
        validate_database_name(tenant_database)?;

        let mut conn = self.connect(tenant_database).await?;
        let outcome = audit_deletion(&mut conn, &self.db, tenant_database, documento).await;
        release(conn, tenant_database, self.db.write_timeout).await;
        outcome
    }

    async fn purge_central_account(
        &self,
        documento: &str,
        proyecto_nit: &str,
    ) -> Result<CentralPurge, AppError> {
        let database = self.central_database.as_str();
        let mut conn = self.connect(database).await?;
        let outcome = purge_central(&mut conn, &self.db, database, documento, proyecto_nit).await;
        release(conn, database, self.db.write_timeout).await;
        outcome
    }
}

async fn audit_deletion(
    conn: &mut MySqlConnection,
    db: &DbConfig,
    database: &str,
    documento: &str,
) -> Result<Option<UserId>, AppError> {
    let mut tx = bounded(database, "begin", db.write_timeout, conn.begin()).await?;

    let row = bounded(
        database,
        "select usuario",
        db.read_timeout,
        sqlx::query(SELECT_USER).bind(documento).fetch_optional(&mut *tx),
    )
    .await?;
    // Dropping the transaction rolls back; nothing has been written yet.
    let Some(row) = row else {
        return Ok(None);
    };

    let user_id = UserId::from_row(&row).map_err(|e| AppError::database(database, e))?;
    let detalles = AuditDetail::voluntary(&user_id).to_json()?;

    bounded(
        database,
        "insert bitacora",
        db.write_timeout,
        sqlx::query(INSERT_AUDIT)
            .bind(documento)
            .bind(documento)
            .bind(AUDIT_MODULE)
            .bind(AUDIT_ACTION)
            .bind(detalles)
            .execute(&mut *tx),
    )
    .await?;
    bounded(database, "commit", db.write_timeout, tx.commit()).await?;

    Ok(Some(user_id))
}

async fn purge_central(
    conn: &mut MySqlConnection,
    db: &DbConfig,
    database: &str,
    documento: &str,
    proyecto_nit: &str,
) -> Result<CentralPurge, AppError> {
    let mut tx = bounded(database, "begin", db.write_timeout, conn.begin()).await?;

    let accounts = bounded(
        database,
        "delete usuarios_sistema",
        db.write_timeout,
        sqlx::query(DELETE_SYSTEM_ACCOUNT)
            .bind(documento)
            .bind(proyecto_nit)
            .execute(&mut *tx),
    )
    .await?
    .rows_affected();

    let notifications = bounded(
        database,
        "delete notificaciones",
        db.write_timeout,
        sqlx::query(DELETE_NOTIFICATIONS)
            .bind(documento)
            .bind(proyecto_nit)
            .execute(&mut *tx),
    )
    .await?
    .rows_affected();

    bounded(database, "commit", db.write_timeout, tx.commit()).await?;

    Ok(CentralPurge {
        accounts,
        notifications,
    })
}

/// Run a database future under `limit`, logging failures with the database name.
async fn bounded<T, F>(
    database: &str,
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => {
            error!(database = %database, operation, error = %source, "database error");
            Err(AppError::database(database, source))
        }
        Err(_) => {
            error!(
                database = %database,
                operation,
                timeout_ms = limit.as_millis() as u64,
                "database operation timed out"
            );
            Err(AppError::Timeout {
                database: database.to_owned(),
                operation,
            })
        }
    }
}

async fn release(conn: MySqlConnection, database: &str, limit: Duration) {
    close_within(conn.close(), database, limit).await;
}

/// A close that outlives `limit` is abandoned; the socket is dropped with the future.
async fn close_within<F>(close: F, database: &str, limit: Duration)
where
    F: Future<Output = Result<(), sqlx::Error>>,
{
    match timeout(limit, close).await {
        Ok(Ok(())) => info!(database = %database, "database connection closed"),
        Ok(Err(err)) => warn!(
            database = %database,
            error = %err,
            "failed to close database connection cleanly"
        ),
        Err(_) => warn!(
            database = %database,
            timeout_ms = limit.as_millis() as u64,
            "closing database connection timed out"
        ),
    }
}

/// Tenant database names come from the client; only plain MySQL identifiers
/// are allowed through to the connection options.
pub fn validate_database_name(name: &str) -> Result<(), AppError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_DATABASE_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '$'));
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidDatabaseName(name.to_owned()))
    }
}
