//! Client metadata extractor for the login audit trail.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;

use crate::services::auth::LoginContext;

/// User agent and peer address of the caller.
///
/// The address comes from `ConnectInfo` when the server was started with
/// `into_make_service_with_connect_info`, and is `None` otherwise.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo(pub LoginContext);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let ip_address = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientInfo(LoginContext {
            user_agent,
            ip_address,
        }))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    #[tokio::test]
    async fn reads_user_agent_and_peer_address() {
        let mut request = Request::builder()
            .header(USER_AGENT, "curl/8.0")
            .body(())
            .unwrap();
        let addr: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        let (mut parts, _) = request.into_parts();

        let ClientInfo(ctx) = ClientInfo::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(ctx.ip_address.as_deref(), Some("10.1.2.3"));
    }

    #[tokio::test]
    async fn missing_metadata_is_none() {
        let (mut parts, _) = Request::new(()).into_parts();
        let ClientInfo(ctx) = ClientInfo::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(ctx.user_agent.is_none());
        assert!(ctx.ip_address.is_none());
    }
}
