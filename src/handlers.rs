use std::sync::Arc;

use lambda_http::{
    http::StatusCode,
    lambda_runtime::{Error as LambdaError, LambdaEvent},
};
use serde_json::Value;
use tracing::{error, info, info_span, Instrument};

use crate::{
    context::AppContext, error::AppError, request::InvocationEvent, response::ApiResponse,
};

pub const ACCOUNT_DELETED_MESSAGE: &str = "Cuenta eliminada exitosamente";
pub const USER_NOT_FOUND_MESSAGE: &str = "Usuario no encontrado";
const IDENTITY_FAILURE_PREFIX: &str = "No se pudo eliminar de Cognito";
const INTERNAL_ERROR_PREFIX: &str = "Error interno";

/// Entry point used by the Lambda runtime. Never returns `Err`: every failure,
/// including an event that is not a JSON object, becomes a structured response.
pub async fn handle_request(
    ctx: Arc<AppContext>,
    event: LambdaEvent<Value>,
) -> Result<ApiResponse, LambdaError> {
    let span = info_span!("delete_account", request_id = %event.context.request_id);
    let response = async {
        match InvocationEvent::from_payload(event.payload) {
            Ok(invocation) => delete_account(ctx.as_ref(), invocation).await,
            Err(err) => internal_error(err),
        }
    }
    .instrument(span)
    .await;
    Ok(response)
}

/// Run the full deletion flow for one event.
pub async fn delete_account(ctx: &AppContext, event: InvocationEvent) -> ApiResponse {
    match run_deletion(ctx, event).await {
        Ok(response) => response,
        Err(err) => internal_error(err),
    }
}

fn internal_error(err: AppError) -> ApiResponse {
    error!(
        category = err.category(),
        error = ?err,
        message = %err,
        "account deletion failed"
    );
    ApiResponse::error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("{INTERNAL_ERROR_PREFIX}: {err}"),
    )
}

async fn run_deletion(ctx: &AppContext, event: InvocationEvent) -> Result<ApiResponse, AppError> {
    let deletion = match event.decode()?.validate() {
        Ok(deletion) => deletion,
        Err(reason) => return Ok(ApiResponse::error(StatusCode::BAD_REQUEST, reason.message())),
    };

    info!(
        documento = %deletion.documento,
        tenant_database = %deletion.tenant_database,
        "deleting user account"
    );

    // The tenant audit entry must be committed before anything central is touched.
    let Some(user_id) = ctx
        .store()
        .record_tenant_deletion(&deletion.tenant_database, &deletion.documento)
        .await?
    else {
        return Ok(ApiResponse::error(StatusCode::NOT_FOUND, USER_NOT_FOUND_MESSAGE));
    };
    info!(?user_id, "deletion recorded in tenant audit log");

    let purged = ctx
        .store()
        .purge_central_account(&deletion.documento, &deletion.proyecto_nit)
        .await?;
    info!(
        accounts = purged.accounts,
        notifications = purged.notifications,
        "central records removed"
    );

    // Local records stay deleted even if this fails; there is no compensation.
    let reply = ctx.identity().delete_identity(&deletion.documento).await?;
    if !reply.succeeded() {
        let message = reply.failure_message();
        error!(
            documento = %deletion.documento,
            error = %message,
            "identity provider deletion failed"
        );
        return Ok(ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{IDENTITY_FAILURE_PREFIX}: {message}"),
        ));
    }

    Ok(ApiResponse::success(ACCOUNT_DELETED_MESSAGE))
}
