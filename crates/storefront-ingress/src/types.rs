//! Shared ingress types and utilities

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use storefront_core::CartError;
use storefront_egress::EgressError;
use thiserror::Error;

/// Request ID for tracing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros();

        Self(format!("req_{:x}_{:x}", timestamp, count))
    }

    /// Accept an inbound `x-request-id` if it is short and header-safe
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let valid = !value.is_empty()
            && value.len() <= 64
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request metadata collected during ingress
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub request_id: RequestId,
    /// Client IP address (first `x-forwarded-for` entry or `x-real-ip`)
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// Request timestamp
    pub timestamp: i64,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self {
            request_id: RequestId::generate(),
            client_ip: None,
            user_agent: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_client_ip(mut self, ip: String) -> Self {
        self.client_ip = Some(ip);
        self
    }

    pub fn with_user_agent(mut self, ua: String) -> Self {
        self.user_agent = Some(ua);
        self
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// What kind of page an error should be rendered as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Unauthorized,
    Unprocessable,
    BadGateway,
    Internal,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Translation key prefix for the error page (`error.<code>.title`)
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Unprocessable => "unprocessable",
            ErrorKind::BadGateway => "bad_gateway",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Response extension marking a response produced from an `IngressError`.
///
/// The tenant middleware replaces the body of marked HTML responses with the
/// localized error page, and clears the auth cookie on `Unauthorized`.
/// Under `/api/` an `Unauthorized` becomes a JSON 401 instead of the login
/// redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage(pub ErrorKind);

/// Ingress error types
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Sign-in required")]
    Unauthorized,

    #[error(transparent)]
    Tenant(#[from] storefront_core::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] EgressError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngressError {
    pub fn kind(&self) -> ErrorKind {
        use storefront_core::Error as CoreError;

        match self {
            IngressError::InvalidRequest(_) | IngressError::Serialization(_) => {
                ErrorKind::BadRequest
            }
            IngressError::NotFound(_) => ErrorKind::NotFound,
            IngressError::Unauthorized => ErrorKind::Unauthorized,
            IngressError::Tenant(err) => match err {
                CoreError::InvalidHost(_) | CoreError::InvalidTenant(_) => ErrorKind::BadRequest,
                CoreError::TenantNotFound(_) => ErrorKind::NotFound,
                _ => ErrorKind::Internal,
            },
            IngressError::Backend(err) => match err {
                EgressError::NotFound(_) => ErrorKind::NotFound,
                EgressError::Unauthorized => ErrorKind::Unauthorized,
                EgressError::Validation(_) => ErrorKind::Unprocessable,
                _ => ErrorKind::BadGateway,
            },
            IngressError::Cart(_) => ErrorKind::Unprocessable,
            IngressError::Template(_) | IngressError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        match kind {
            ErrorKind::BadGateway | ErrorKind::Internal => {
                tracing::error!(error = %self, "Request failed");
            }
            _ => tracing::debug!(error = %self, "Request rejected"),
        }

        let mut response = if kind == ErrorKind::Unauthorized {
            Redirect::to("/login").into_response()
        } else {
            // Upstream detail stays in the logs
            let message = match kind {
                ErrorKind::BadGateway => "Backend unavailable".to_string(),
                ErrorKind::Internal => "Internal error".to_string(),
                _ => self.to_string(),
            };
            json_error(kind, &message)
        };

        response.extensions_mut().insert(ErrorPage(kind));
        response
    }
}

/// JSON error body used for API clients and non-page failures
pub fn json_error(kind: ErrorKind, message: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "message": message,
            "type": kind.code(),
            "code": kind.status().as_u16(),
        }
    });
    (kind.status(), axum::Json(body)).into_response()
}

/// Ingress result type
pub type IngressResult<T> = Result<T, IngressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generate_is_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req_"));
    }

    #[test]
    fn test_request_id_from_header() {
        assert_eq!(
            RequestId::from_header("abc-123").map(|r| r.to_string()),
            Some("abc-123".to_string())
        );
        assert!(RequestId::from_header("").is_none());
        assert!(RequestId::from_header("has space").is_none());
        assert!(RequestId::from_header(&"x".repeat(65)).is_none());
    }

    #[test]
    fn test_backend_errors_map_to_pages() {
        let not_found = IngressError::from(EgressError::NotFound("/products/x".to_string()));
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let down = IngressError::from(EgressError::Upstream {
            status: 503,
            message: "maintenance".to_string(),
        });
        assert_eq!(down.kind(), ErrorKind::BadGateway);

        let expired = IngressError::from(EgressError::Unauthorized);
        assert_eq!(expired.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_unknown_tenant_is_not_found() {
        let err = IngressError::from(storefront_core::Error::TenantNotFound("nope".to_string()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = IngressError::from(storefront_core::Error::InvalidHost("---".to_string()));
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_error_response_is_marked() {
        let response = IngressError::Cart(CartError::InvalidEmail).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.extensions().get::<ErrorPage>(),
            Some(&ErrorPage(ErrorKind::Unprocessable))
        );
    }

    #[test]
    fn test_unauthorized_redirects_to_login() {
        let response = IngressError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), "/login");
    }
}
