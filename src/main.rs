//! Lambda entrypoint.
//!
//! The binary initialises JSON logging, reads the database and downstream
//! function settings from the environment, optionally resolves the database
//! password from SSM, and then hands execution to the Lambda runtime. The
//! `AppContext` is built once per cold start and reused by every invocation.

use std::sync::Arc;

use eliminar_cuenta_lambda::{
    config::AppConfig, handle_request, identity::LambdaIdentityDeleter, store::MySqlAccountStore,
    AppContext,
};
use lambda_http::lambda_runtime::{run, service_fn, Error as LambdaError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .json()
        .with_current_span(false)
        .init();

    let mut config = AppConfig::from_env().map_err(|e| LambdaError::from(e.to_string()))?;
    info!(
        db_host = %config.db.host,
        db_port = config.db.port,
        central_database = %config.central_database,
        identity_function = %config.identity_function,
        "initialising Lambda runtime"
    );

    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    if let Some(parameter) = config.password_parameter.clone() {
        let ssm = aws_sdk_ssm::Client::new(&sdk_config);
        match ssm
            .get_parameter()
            .name(&parameter)
            .with_decryption(true)
            .send()
            .await
        {
            Ok(resp) => {
                let password = resp.parameter.and_then(|p| p.value).ok_or_else(|| {
                    LambdaError::from("database password parameter missing value")
                })?;
                config = config.with_password(password);
            }
            Err(err) => {
                warn!(
                    "failed to fetch database password from SSM ({}); falling back to DB_PASSWORD env var",
                    err
                );
                if config.password_missing() {
                    return Err(LambdaError::from(
                        "missing DB_PASSWORD env var fallback after SSM lookup failure",
                    ));
                }
            }
        }
    }

    let store = MySqlAccountStore::new(config.db.clone(), config.central_database.clone());
    let identity = LambdaIdentityDeleter::new(
        aws_sdk_lambda::Client::new(&sdk_config),
        config.identity_function.clone(),
    );
    let ctx = Arc::new(AppContext::new(Arc::new(store), Arc::new(identity)));

    run(service_fn(move |event| {
        let ctx = ctx.clone();
        async move { handle_request(ctx, event).await }
    }))
    .await
}
