use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use uuid::Uuid;

/// Per-request metadata carried into audit rows: the request id minted by
/// the request-id middleware (or generated here when absent), the client
/// address and the user agent.
#[derive(Debug, Clone)]
pub(crate) struct RequestContext {
    pub(crate) request_id: String,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
}

impl RequestContext {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        Self { request_id, ip_address, user_agent }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_request_id_and_client_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-123"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("test-agent"));

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.request_id, "req-123");
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(ctx.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn generates_request_id_when_missing() {
        let ctx = RequestContext::from_headers(&HeaderMap::new());
        assert!(!ctx.request_id.is_empty());
        assert!(ctx.ip_address.is_none());
    }
}
