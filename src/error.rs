//! Unified error type and the central error-to-response mapping.
//!
//! Handlers and middleware return `Result<_, Error>`. Nothing maps an error to
//! a response on its own: [`Router::dispatch`](crate::Router::dispatch) hands
//! every error to one [`ErrorHandler`], [`default_handler`] unless the
//! application installs its own with [`Router::on_error`](crate::Router::on_error).

use std::sync::Arc;

use http::StatusCode;
use tracing::error;

use crate::method::Method;
use crate::response::Response;

/// The error type returned by vireo's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No route matches the path under any method.
    #[error("no route for {method} {path}")]
    NotFound { method: String, path: String },

    /// The path is routed, but not for this method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<Method>,
    },

    /// A route with the same shape is already registered for this method.
    #[error("route `{pattern}` conflicts with `{existing}`")]
    Conflict { pattern: String, existing: String },

    /// The route pattern itself is malformed.
    #[error("invalid route `{pattern}`: {reason}")]
    InvalidRoute { pattern: String, reason: String },

    /// A parameter was missing or malformed while binding request data.
    #[error("bind: {0}")]
    Bind(String),

    /// A renderer or encoder failed to produce the response body.
    #[error("encoding: {0}")]
    Encoding(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// The status code [`default_handler`] answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. }         => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Bind(_)                 => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. }  => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound         => StatusCode::NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _                                    => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Conflict { .. }
            | Self::InvalidRoute { .. }
            | Self::Encoding(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Maps an error that reached the dispatch boundary to the response sent to
/// the client.
pub type ErrorHandler = Arc<dyn Fn(Error) -> Response + Send + Sync + 'static>;

/// The default mapping: status from [`Error::status`], a short JSON message
/// body, and an `Allow` header on 405.
///
/// Client errors carry their message; server errors only carry the reason
/// phrase so internals never leak to the client. 5xx are logged.
pub fn default_handler(err: Error) -> Response {
    let status = err.status();

    let message = if status.is_server_error() {
        error!(error = %err, "request failed");
        status.canonical_reason().unwrap_or("Internal Server Error").to_owned()
    } else {
        match &err {
            Error::Bind(msg) => msg.clone(),
            Error::PayloadTooLarge { .. } => err.to_string(),
            _ => status.canonical_reason().unwrap_or_default().to_owned(),
        }
    };

    let body = serde_json::json!({ "message": message }).to_string();
    let mut builder = Response::builder().status(status);

    if let Error::MethodNotAllowed { allowed, .. } = &err {
        let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
        builder = builder.header("allow", &allow);
    }

    builder.json(body.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_by_kind() {
        let missing = Error::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let broken = Error::from(std::io::Error::other("disk on fire"));
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn method_not_allowed_lists_allowed_methods() {
        let res = default_handler(Error::MethodNotAllowed {
            method: "POST".into(),
            path: "/json".into(),
            allowed: vec![Method::Get, Method::Head],
        });

        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET, HEAD"));
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let res = default_handler(Error::Encoding("secret template path".into()));
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = res.into_bytes().await.unwrap();
        assert_eq!(&body[..], br#"{"message":"Internal Server Error"}"#);
    }

    #[tokio::test]
    async fn bind_errors_carry_their_message() {
        let res = default_handler(Error::Bind("missing field `email`".into()));
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

        let body = res.into_bytes().await.unwrap();
        assert_eq!(&body[..], br#"{"message":"missing field `email`"}"#);
    }
}
