use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::AppError;

/// Invocation event delivered by the runtime.
///
/// API Gateway proxies put the request as a JSON string in `body`; direct
/// invocations may pass the object as-is. Every other field is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct InvocationEvent {
    #[serde(default)]
    pub body: Option<Value>,
}

/// Decoded request body.
#[derive(Debug, Default, Deserialize)]
pub struct DeletionRequest {
    #[serde(default)]
    pub user_context: Option<Value>,
}

/// Identity fields carried in `user_context`, before validation.
#[derive(Debug, Default, Deserialize)]
struct UserContextFields {
    #[serde(default, deserialize_with = "lenient_text")]
    copropiedad: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    documento: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    proyecto_nit: Option<String>,
}

/// A validated account deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDeletion {
    /// Tenant database named by `copropiedad`.
    pub tenant_database: String,
    pub documento: String,
    pub proyecto_nit: String,
}

/// Reasons a request is rejected with `400`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingContext,
    IncompleteData,
}

impl ValidationError {
    /// Client-facing message.
    pub fn message(self) -> &'static str {
        match self {
            ValidationError::MissingContext => "Contexto de usuario requerido",
            ValidationError::IncompleteData => "Datos incompletos",
        }
    }
}

impl InvocationEvent {
    /// Read the event the runtime delivered. Only JSON objects are events;
    /// anything else is a malformed payload.
    pub fn from_payload(payload: Value) -> Result<Self, AppError> {
        match payload {
            Value::Object(_) => serde_json::from_value(payload)
                .map_err(|e| AppError::Payload(format!("unexpected event: {e}"))),
            other => Err(AppError::Payload(format!(
                "event must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Decode the body, which is either a JSON string or an inline object.
    pub fn decode(self) -> Result<DeletionRequest, AppError> {
        match self.body {
            None | Some(Value::Null) => Ok(DeletionRequest::default()),
            Some(Value::String(raw)) => serde_json::from_str(&raw)
                .map_err(|e| AppError::Payload(format!("request body is not valid JSON: {e}"))),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| AppError::Payload(format!("unexpected request body: {e}"))),
        }
    }
}

impl DeletionRequest {
    /// Check that the three identity fields are present and non-empty.
    pub fn validate(self) -> Result<AccountDeletion, ValidationError> {
        let context = match self.user_context {
            Some(Value::Object(map)) if !map.is_empty() => map,
            _ => return Err(ValidationError::MissingContext),
        };

        let fields: UserContextFields = serde_json::from_value(Value::Object(context))
            .map_err(|_| ValidationError::IncompleteData)?;

        match (fields.copropiedad, fields.documento, fields.proyecto_nit) {
            (Some(tenant_database), Some(documento), Some(proyecto_nit)) => Ok(AccountDeletion {
                tenant_database,
                documento,
                proyecto_nit,
            }),
            _ => Err(ValidationError::IncompleteData),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Accept strings and non-zero numbers; empty strings, zero and anything else
/// count as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}
