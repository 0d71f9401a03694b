//! Peer admission.
//!
//! The single write endpoint of the service: authenticate the caller's bearer
//! token, authorize it against the configured claim, then hand the caller a
//! tunnel grant. Checks run strictly in that order so an unauthenticated
//! request learns nothing about the body schema or pool state.
use std::net::IpAddr;

use axum::{
    extract::State,
    http::{header, HeaderMap},
};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tracing::{event, instrument, Level};

use super::state::ApiState;
use crate::error::ApiRejection;
use crate::gateway::keys::PublicKey;
use crate::gateway::PeerGrant;

#[derive(Debug, Deserialize)]
pub struct CreateTunnelRequest {
    pub public_key: PublicKey,
}

#[derive(Debug, Serialize)]
pub struct CreateTunnelResponse {
    /// `host:port` the peer should dial.
    pub endpoint: String,
    /// Tunnel-side address of the gateway itself.
    pub gateway: IpAddr,
    /// The gateway's public key.
    pub public_key: PublicKey,
    pub preshared_key: String,
    /// Host-masked address assigned to the peer.
    pub allowed_ip: IpNetwork,
    pub persistent_keepalive_interval: u16,
}

impl From<PeerGrant> for CreateTunnelResponse {
    fn from(grant: PeerGrant) -> Self {
        Self {
            endpoint: grant.server.endpoint(),
            gateway: grant.server.gateway_ip,
            public_key: grant.server.public_key,
            preshared_key: grant.preshared_key.to_base64(),
            allowed_ip: grant.allowed_ip,
            persistent_keepalive_interval: grant.persistent_keepalive,
        }
    }
}

/// Pull the bearer credential out of the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("Bearer") => Some(token),
        _ => None,
    }
}

#[instrument(skip(state, headers, body), level = "debug")]
pub async fn create_tunnel(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: String,
) -> Result<axum::Json<CreateTunnelResponse>, ApiRejection> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/json") {
        return Err(ApiRejection::bad_request(format!(
            "unsupported content type: '{}'",
            content_type
        )));
    }

    let token = bearer_token(&headers)
        .ok_or_else(|| ApiRejection::unauthorized("missing bearer credential"))?;

    let claims = state
        .verifier
        .verify_token(token, &state.auth.issuer)
        .await
        .map_err(|err| ApiRejection::forbidden(format!("token rejected: {}", err)))?;

    // Authentication is not admission: the configured claim must also match.
    match claims.string_claim(&state.auth.claim) {
        Some(value) if value == state.auth.allowed_value => {}
        Some(value) => {
            return Err(ApiRejection::forbidden(format!(
                "claim '{}' value '{}' is not allowed",
                state.auth.claim, value
            )));
        }
        None => {
            return Err(ApiRejection::forbidden(format!(
                "token carries no '{}' claim",
                state.auth.claim
            )));
        }
    }

    let request: CreateTunnelRequest = serde_json::from_str(&body)
        .map_err(|err| ApiRejection::bad_request(format!("invalid request body: {}", err)))?;

    let grant = state
        .gateway
        .add_peer(request.public_key)
        .await
        .map_err(|err| {
            event!(
                Level::ERROR,
                message = "Failed admitting peer",
                err = format!("{:?}", err)
            );
            ApiRejection::from(err)
        })?;

    Ok(axum::Json(grant.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer a b".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
    }
}
