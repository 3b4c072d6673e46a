//! Request ID middleware for HTTP request correlation
//!
//! Reuses the caller's `X-Request-Id` when it is well formed, otherwise
//! generates one. The id is recorded on the request's tracing span and
//! echoed on the response.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    response::Response,
};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// The header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Layer that adds request ID handling to HTTP services
#[derive(Debug, Clone, Default)]
pub struct RequestIdLayer;

impl RequestIdLayer {
    /// Create a new request ID layer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Service that extracts or generates a request ID for each request
#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

/// Caller-supplied ids are kept only if they are short and made of
/// token characters, so they are safe to log and echo
fn is_acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

fn request_id_for(req: &Request) -> HeaderValue {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .filter(|v| v.to_str().is_ok_and(is_acceptable))
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        })
}

impl<S> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let request_id = request_id_for(&request);
        let header = HeaderName::from_static(REQUEST_ID_HEADER);
        request
            .headers_mut()
            .insert(header.clone(), request_id.clone());

        let span = tracing::info_span!(
            "http_request",
            request_id = request_id.to_str().unwrap_or_default(),
            method = %request.method(),
            uri = %request.uri().path(),
        );

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let mut response = inner.call(request).await?;
                response.headers_mut().insert(header, request_id);
                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::HeaderMap, routing::get};
    use tower::ServiceExt;

    use super::*;

    /// Echoes the id the handler saw
    async fn echo(headers: HeaderMap) -> String {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    async fn call(id: Option<&str>) -> (String, String) {
        let app = Router::new()
            .route("/test", get(echo))
            .layer(RequestIdLayer::new());

        let mut builder = axum::http::Request::builder().uri("/test");
        if let Some(id) = id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (header, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn caller_id_is_echoed() {
        let (header, seen) = call(Some("req-701U.10:abc_1")).await;
        assert_eq!(header, "req-701U.10:abc_1");
        assert_eq!(seen, header);
    }

    #[tokio::test]
    async fn missing_id_is_generated() {
        let (header, seen) = call(None).await;
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(seen, header);
    }

    #[tokio::test]
    async fn malformed_id_is_replaced() {
        let (header, _) = call(Some("has spaces; and=stuff")).await;
        assert!(Uuid::parse_str(&header).is_ok());

        let long = "a".repeat(200);
        let (header, _) = call(Some(long.as_str())).await;
        assert!(Uuid::parse_str(&header).is_ok());
    }

    #[test]
    fn acceptable_ids() {
        assert!(is_acceptable("abc-123"));
        assert!(is_acceptable("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_acceptable(""));
        assert!(!is_acceptable("a b"));
        assert!(!is_acceptable("ação"));
    }
}
