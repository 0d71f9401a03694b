//! Token verification against an identity provider.
//!
//! One stable verification capability with a fixed contract: a bearer token
//! and an expected issuer in, the full claim set or a categorized failure
//! out. Optional behaviors (expected token type, request timeout) are named
//! configuration fields, not signature variants.
pub mod cache;
pub mod claims;
pub mod discovery;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use crate::clock::Clock;
use crate::error::{Result, ShrikeError, VerifyError};
use claims::Claims;
use discovery::DiscoveryClient;

pub const DEFAULT_TOKEN_TYPE: &str = "ID";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(
        &self,
        token: &str,
        issuer: &str,
    ) -> std::result::Result<Claims, VerifyError>;
}

#[derive(Clone, Debug)]
pub struct VerifierConfig {
    /// Value the token's `typ` claim must equal, when present.
    pub expected_token_type: String,

    /// Upper bound on any single discovery or key-set fetch.
    pub request_timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            expected_token_type: DEFAULT_TOKEN_TYPE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        }
    }
}

pub struct Provider {
    discovery: DiscoveryClient,
    config: VerifierConfig,
    clock: Arc<dyn Clock>,
}

impl Provider {
    pub fn new(config: VerifierConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ShrikeError::Config(format!("unable to build http client: {}", err)))?;
        Ok(Self {
            discovery: DiscoveryClient::new(http, clock.clone()),
            config,
            clock,
        })
    }

    /// Pin a static signing-key set for an issuer, bypassing discovery.
    pub fn cache_signing_keys(&self, issuer: &str, keys: JwkSet) {
        self.discovery.cache_signing_keys(issuer, keys);
    }
}

#[async_trait]
impl TokenVerifier for Provider {
    async fn verify_token(
        &self,
        token: &str,
        issuer: &str,
    ) -> std::result::Result<Claims, VerifyError> {
        let header =
            decode_header(token).map_err(|err| VerifyError::Malformed(err.to_string()))?;

        // Only asymmetric signing is trusted: accepting HMAC here would let
        // a published verification key double as a signing secret.
        if matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(VerifyError::SymmetricAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Malformed("token header has no key id".to_string()))?;
        let keys = self.discovery.signing_keys(issuer).await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| VerifyError::UntrustedKey(kid.clone()))?;
        let decoding_key = DecodingKey::from_jwk(jwk)
            .map_err(|err| VerifyError::UntrustedKey(format!("{}: {}", kid, err)))?;

        // Time and identity claims are validated by hand below, skew-free
        // and only when present; the library pass checks the signature.
        let mut validation = Validation::new(header.alg);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|err| {
            match err.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => VerifyError::BadSignature,
                _ => VerifyError::Malformed(err.to_string()),
            }
        })?;

        let claims = data.claims;
        claims.validate_time(self.clock.now())?;
        claims.require_issuer(issuer)?;
        claims.require_typ(&self.config.expected_token_type)?;
        Ok(claims)
    }
}
