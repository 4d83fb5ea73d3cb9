//! Idempotent schema creation for local and integration-test databases.
//!
//! Production schemas are owned elsewhere; these statements only create the
//! columns the deletion flow reads and writes.

use sqlx::mysql::MySqlConnection;
use tracing::info;

const TENANT_SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS usuarios (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        documento VARCHAR(32) NOT NULL UNIQUE,
        nombre VARCHAR(255) NULL
    )",
    "CREATE TABLE IF NOT EXISTS bitacora (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        usuario_documento VARCHAR(32) NOT NULL,
        responsable VARCHAR(32) NOT NULL,
        modulo VARCHAR(64) NOT NULL,
        accion VARCHAR(128) NOT NULL,
        detalles TEXT NULL,
        fecha DATETIME NOT NULL
    )",
];

const CENTRAL_SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS usuarios_sistema (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        documento VARCHAR(32) NOT NULL,
        proyecto_nit VARCHAR(32) NOT NULL,
        copropiedad VARCHAR(64) NULL
    )",
    "CREATE TABLE IF NOT EXISTS notificaciones (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        usuario_documento VARCHAR(32) NOT NULL,
        proyecto_nit VARCHAR(32) NOT NULL,
        mensaje TEXT NULL
    )",
];

/// Create `usuarios` and `bitacora` when missing.
pub async fn ensure_tenant_schema(conn: &mut MySqlConnection) -> Result<(), sqlx::Error> {
    apply(conn, &TENANT_SCHEMA).await?;
    info!("tenant schema ready");
    Ok(())
}

/// Create `usuarios_sistema` and `notificaciones` when missing.
pub async fn ensure_central_schema(conn: &mut MySqlConnection) -> Result<(), sqlx::Error> {
    apply(conn, &CENTRAL_SCHEMA).await?;
    info!("central schema ready");
    Ok(())
}

async fn apply(conn: &mut MySqlConnection, statements: &[&str]) -> Result<(), sqlx::Error> {
    for statement in statements {
        sqlx::query(*statement).execute(&mut *conn).await?;
    }
    Ok(())
}
