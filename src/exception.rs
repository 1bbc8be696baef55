//! HTTP exception taxonomy.
//!
//! Exceptions thrown anywhere in the request pipeline are normalized into
//! a structured JSON response carrying `statusCode`, `message`, and
//! optionally the canonical reason phrase under `error`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use strum_macros::Display;

/// The HTTP-status-coded kinds an exception can carry.
///
/// The strum-derived `Display` yields the canonical reason phrase, which
/// becomes the `error` field of the JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ExceptionKind {
    #[strum(serialize = "Bad Request")]
    BadRequest,
    #[strum(serialize = "Unauthorized")]
    Unauthorized,
    #[strum(serialize = "Forbidden")]
    Forbidden,
    #[strum(serialize = "Not Found")]
    NotFound,
    #[strum(serialize = "Method Not Allowed")]
    MethodNotAllowed,
    #[strum(serialize = "Not Acceptable")]
    NotAcceptable,
    #[strum(serialize = "Request Timeout")]
    RequestTimeout,
    #[strum(serialize = "Conflict")]
    Conflict,
    #[strum(serialize = "Gone")]
    Gone,
    #[strum(serialize = "Precondition Failed")]
    PreconditionFailed,
    #[strum(serialize = "Payload Too Large")]
    PayloadTooLarge,
    #[strum(serialize = "Unsupported Media Type")]
    UnsupportedMediaType,
    #[strum(serialize = "I'm a teapot")]
    ImATeapot,
    #[strum(serialize = "Unprocessable Entity")]
    UnprocessableEntity,
    #[strum(serialize = "Internal Server Error")]
    InternalServerError,
    #[strum(serialize = "Not Implemented")]
    NotImplemented,
    #[strum(serialize = "Bad Gateway")]
    BadGateway,
    #[strum(serialize = "Service Unavailable")]
    ServiceUnavailable,
    #[strum(serialize = "Gateway Timeout")]
    GatewayTimeout,
}

impl ExceptionKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ExceptionKind::BadRequest => StatusCode::BAD_REQUEST,
            ExceptionKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ExceptionKind::Forbidden => StatusCode::FORBIDDEN,
            ExceptionKind::NotFound => StatusCode::NOT_FOUND,
            ExceptionKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ExceptionKind::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ExceptionKind::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ExceptionKind::Conflict => StatusCode::CONFLICT,
            ExceptionKind::Gone => StatusCode::GONE,
            ExceptionKind::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            ExceptionKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ExceptionKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ExceptionKind::ImATeapot => StatusCode::IM_A_TEAPOT,
            ExceptionKind::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ExceptionKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ExceptionKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ExceptionKind::BadGateway => StatusCode::BAD_GATEWAY,
            ExceptionKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ExceptionKind::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// A structured pipeline exception.
#[derive(Debug)]
pub struct HttpException {
    pub kind: ExceptionKind,
    pub message: String,
    /// Overrides the strum-derived reason phrase when set.
    pub error: Option<String>,
    /// Underlying cause, kept for logs only; never serialized.
    pub cause: Option<anyhow::Error>,
}

macro_rules! exception_ctor {
    ($name:ident, $kind:ident) => {
        pub fn $name(message: impl Into<String>) -> Self {
            Self::new(ExceptionKind::$kind, message)
        }
    };
}

impl HttpException {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            error: None,
            cause: None,
        }
    }

    exception_ctor!(bad_request, BadRequest);
    exception_ctor!(unauthorized, Unauthorized);
    exception_ctor!(forbidden, Forbidden);
    exception_ctor!(not_found, NotFound);
    exception_ctor!(method_not_allowed, MethodNotAllowed);
    exception_ctor!(not_acceptable, NotAcceptable);
    exception_ctor!(request_timeout, RequestTimeout);
    exception_ctor!(conflict, Conflict);
    exception_ctor!(gone, Gone);
    exception_ctor!(precondition_failed, PreconditionFailed);
    exception_ctor!(payload_too_large, PayloadTooLarge);
    exception_ctor!(unsupported_media_type, UnsupportedMediaType);
    exception_ctor!(im_a_teapot, ImATeapot);
    exception_ctor!(unprocessable_entity, UnprocessableEntity);
    exception_ctor!(internal_server_error, InternalServerError);
    exception_ctor!(not_implemented, NotImplemented);
    exception_ctor!(bad_gateway, BadGateway);
    exception_ctor!(service_unavailable, ServiceUnavailable);
    exception_ctor!(gateway_timeout, GatewayTimeout);

    /// The response produced for any uncaught, unrecognized failure.
    pub fn internal_default() -> Self {
        Self::new(ExceptionKind::InternalServerError, "Internal server error")
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// The JSON body serialized into the response.
    pub fn body(&self) -> serde_json::Value {
        let reason = self.error.clone().unwrap_or_else(|| self.kind.to_string());
        let body = ExceptionBody {
            status_code: self.status_code(),
            message: &self.message,
            // Redundant when it would only repeat the message verbatim.
            error: (reason != self.message).then_some(reason.as_str()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        serde_json::to_value(&body).unwrap_or_else(|_| {
            json!({ "statusCode": self.status_code(), "message": self.message })
        })
    }
}

/// Wire shape of the error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExceptionBody<'a> {
    status_code: u16,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    timestamp: String,
}

impl std::fmt::Display for HttpException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.status_code(), self.message)
    }
}

impl std::error::Error for HttpException {}

impl HttpException {
    /// The normalized JSON response, without consuming the exception.
    pub fn to_response(&self) -> Response {
        if let Some(cause) = &self.cause {
            tracing::error!(status = self.status_code(), cause = %cause, "{}", self.message);
        }
        (self.kind.status(), Json(self.body())).into_response()
    }
}

impl IntoResponse for HttpException {
    fn into_response(self) -> Response {
        self.to_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(ExceptionKind::BadRequest.status_code(), 400);
        assert_eq!(ExceptionKind::Forbidden.status_code(), 403);
        assert_eq!(ExceptionKind::NotFound.status_code(), 404);
        assert_eq!(ExceptionKind::ServiceUnavailable.status_code(), 503);
    }

    #[test]
    fn reason_phrase_comes_from_strum() {
        assert_eq!(ExceptionKind::UnprocessableEntity.to_string(), "Unprocessable Entity");
        assert_eq!(ExceptionKind::ImATeapot.to_string(), "I'm a teapot");
    }

    #[test]
    fn body_carries_status_and_message() {
        let exception = HttpException::not_found("User not found");
        let body = exception.body();
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["message"], "User not found");
        assert_eq!(body["error"], "Not Found");
        assert!(body.get("timestamp").is_some());
    }

    #[test]
    fn default_uncaught_body() {
        let body = HttpException::internal_default().body();
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["message"], "Internal server error");
    }
}
