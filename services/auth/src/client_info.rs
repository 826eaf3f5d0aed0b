//! Request metadata captured for the login audit trail

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{TypedHeader, headers::UserAgent};

/// Raw client metadata as presented by the request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Peer address of the connection
    pub remote_addr: Option<String>,
    /// Raw `X-Forwarded-For` header
    pub forwarded_for: Option<String>,
    /// Raw `User-Agent` header
    pub user_agent: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let forwarded_for = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let user_agent = TypedHeader::<UserAgent>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(ua)| ua.to_string());

        Ok(ClientInfo {
            remote_addr,
            forwarded_for,
            user_agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_headers_and_peer() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.2")
            .header("user-agent", "curl/8.5.0")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 10], 4711))));
        let (mut parts, _) = req.into_parts();

        let info = ClientInfo::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(info.remote_addr.as_deref(), Some("192.168.1.10"));
        assert_eq!(info.forwarded_for.as_deref(), Some("203.0.113.7, 10.0.0.2"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.5.0"));
    }

    #[tokio::test]
    async fn test_missing_metadata_is_none() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

        let info = ClientInfo::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(info, ClientInfo::default());
    }
}
