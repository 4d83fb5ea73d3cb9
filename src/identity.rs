//! Identity-provider side of an account deletion, delegated to another Lambda.

use async_trait::async_trait;
use aws_sdk_lambda::{error::DisplayErrorContext, primitives::Blob, types::InvocationType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::AppError;

pub const UNKNOWN_ERROR_MESSAGE: &str = "Error desconocido";

#[derive(Debug, Serialize)]
struct IdentityDeletionPayload<'a> {
    documento: &'a str,
}

/// Reply returned by the identity-deletion function.
///
/// `success` and `error` are kept loosely typed: the callee is only expected to
/// send something truthy on success. `errorMessage` is what Lambda itself
/// returns when the callee raised instead of replying.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityDeletionReply {
    #[serde(default)]
    success: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

impl IdentityDeletionReply {
    /// A reply reporting success.
    pub fn succeeded_reply() -> Self {
        Self {
            success: Some(Value::Bool(true)),
            ..Self::default()
        }
    }

    /// A reply reporting failure with the given message.
    pub fn failed_reply(error: impl Into<String>) -> Self {
        Self {
            success: Some(Value::Bool(false)),
            error: Some(Value::String(error.into())),
            error_message: None,
        }
    }

    /// Decode the raw invocation payload, which must be a JSON object.
    pub fn parse(payload: &[u8]) -> Result<Self, AppError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| AppError::Payload(format!("identity deletion reply is not JSON: {e}")))?;
        if !value.is_object() {
            return Err(AppError::Payload(format!(
                "identity deletion reply is not an object: {value}"
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| AppError::Payload(format!("unexpected identity deletion reply: {e}")))
    }

    pub fn succeeded(&self) -> bool {
        self.success.as_ref().is_some_and(is_truthy)
    }

    /// Human-readable failure reason, falling back to a generic message.
    pub fn failure_message(&self) -> String {
        match &self.error {
            Some(Value::String(message)) if !message.is_empty() => return message.clone(),
            Some(value) if is_truthy(value) => return value.to_string(),
            _ => {}
        }
        self.error_message
            .as_deref()
            .filter(|message| !message.is_empty())
            .unwrap_or(UNKNOWN_ERROR_MESSAGE)
            .to_owned()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Port for removing the user's identity-provider account.
#[async_trait]
pub trait IdentityDeleter: Send + Sync {
    async fn delete_identity(&self, documento: &str) -> Result<IdentityDeletionReply, AppError>;
}

/// Invokes the identity-deletion Lambda synchronously (`RequestResponse`).
#[derive(Debug, Clone)]
pub struct LambdaIdentityDeleter {
    client: aws_sdk_lambda::Client,
    function_name: String,
}

impl LambdaIdentityDeleter {
    pub fn new(client: aws_sdk_lambda::Client, function_name: impl Into<String>) -> Self {
        Self {
            client,
            function_name: function_name.into(),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }
}

#[async_trait]
impl IdentityDeleter for LambdaIdentityDeleter {
    async fn delete_identity(&self, documento: &str) -> Result<IdentityDeletionReply, AppError> {
        let payload = serde_json::to_vec(&IdentityDeletionPayload { documento })
            .map_err(|e| AppError::Payload(format!("failed to encode invocation payload: {e}")))?;

        let output = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| {
                AppError::Invocation(format!(
                    "failed to invoke `{}`: {}",
                    self.function_name,
                    DisplayErrorContext(&e)
                ))
            })?;

        if let Some(function_error) = output.function_error() {
            warn!(
                function = %self.function_name,
                function_error,
                "identity deletion function raised an error"
            );
        } else {
            info!(
                function = %self.function_name,
                status = output.status_code(),
                "identity deletion function replied"
            );
        }

        let body = output.payload().map(|blob| blob.as_ref()).unwrap_or_default();
        IdentityDeletionReply::parse(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_flag_must_be_truthy() {
        assert!(IdentityDeletionReply::parse(br#"{"success": true}"#).unwrap().succeeded());
        assert!(IdentityDeletionReply::parse(br#"{"success": 1}"#).unwrap().succeeded());
        for raw in [
            &br#"{}"#[..],
            br#"{"success": false}"#,
            br#"{"success": null}"#,
            br#"{"success": 0}"#,
            br#"{"success": ""}"#,
        ] {
            assert!(!IdentityDeletionReply::parse(raw).unwrap().succeeded());
        }
    }

    #[test]
    fn failure_message_prefers_error_field() {
        let reply =
            IdentityDeletionReply::parse(br#"{"success": false, "error": "UserNotFoundException"}"#)
                .unwrap();
        assert_eq!(reply.failure_message(), "UserNotFoundException");
    }

    #[test]
    fn failure_message_uses_lambda_error_message() {
        let reply = IdentityDeletionReply::parse(
            br#"{"errorMessage": "Task timed out", "errorType": "TimeoutError"}"#,
        )
        .unwrap();
        assert!(!reply.succeeded());
        assert_eq!(reply.failure_message(), "Task timed out");
    }

    #[test]
    fn failure_message_defaults() {
        let reply = IdentityDeletionReply::parse(br#"{"success": false}"#).unwrap();
        assert_eq!(reply.failure_message(), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn non_object_payloads_are_rejected() {
        for raw in [&b""[..], b"not json", b"null", b"[true]"] {
            let err = IdentityDeletionReply::parse(raw).unwrap_err();
            assert_eq!(err.category(), "payload");
        }
    }

    #[test]
    fn invocation_payload_shape() {
        let encoded = serde_json::to_string(&IdentityDeletionPayload {
            documento: "1020304050",
        })
        .unwrap();
        assert_eq!(encoded, r#"{"documento":"1020304050"}"#);
    }
}
