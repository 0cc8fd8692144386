//! Request extractors.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Request identifier taken from inbound headers, or generated.
///
/// Checks `x-request-id`, `x-correlation-id`, and `request-id` in order;
/// falls back to a fresh UUID so every request has one.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = ["x-request-id", "x-correlation-id", "request-id"]
            .iter()
            .find_map(|name| {
                parts
                    .headers
                    .get(*name)
                    .and_then(|value| value.to_str().ok())
                    .filter(|value| !value.is_empty())
            })
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string);
        Ok(Self(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> RequestId {
        let (mut parts, ()) = request.into_parts();
        RequestId::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_uses_inbound_header() {
        let request = Request::builder()
            .header("x-request-id", "req-abc")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.0, "req-abc");
    }

    #[tokio::test]
    async fn test_falls_back_to_correlation_id() {
        let request = Request::builder()
            .header("x-correlation-id", "corr-1")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.0, "corr-1");
    }

    #[tokio::test]
    async fn test_generates_uuid_when_absent() {
        let request = Request::builder().body(()).unwrap();
        let id = extract(request).await.0;
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }
}
