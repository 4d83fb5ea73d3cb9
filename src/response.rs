use std::collections::HashMap;

use lambda_http::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Proxy-style response envelope returned to the runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    success: bool,
    message: &'a str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
}

impl ApiResponse {
    /// `200` with `{"success": true, "message": message}`.
    pub fn success(message: &str) -> Self {
        json_response(
            StatusCode::OK,
            SuccessBody {
                success: true,
                message,
            },
        )
    }

    /// Error response with `{"success": false, "error": message}`.
    pub fn error(status: StatusCode, message: impl AsRef<str>) -> Self {
        json_response(
            status,
            ErrorBody {
                success: false,
                error: message.as_ref(),
            },
        )
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: T) -> ApiResponse {
    let body = serde_json::to_string(&value).unwrap_or_else(|_| "{}".into());

    if status.is_server_error() {
        error!(
            http_status = status.as_u16(),
            body = %body,
            "returning server error response"
        );
    } else if status.is_client_error() {
        warn!(
            http_status = status.as_u16(),
            body = %body,
            "returning client error response"
        );
    }

    ApiResponse {
        status_code: status.as_u16(),
        headers: HashMap::from([("Content-Type".to_owned(), "application/json".to_owned())]),
        body,
    }
}
