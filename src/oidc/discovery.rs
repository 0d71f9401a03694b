//! Identity-provider discovery.
//!
//! Resolves the well-known configuration document under an issuer URL and
//! the signing-key set it points at, both cached per issuer. All outbound
//! calls ride the shared `reqwest` client, which carries a bounded timeout
//! so a slow provider cannot stall verification indefinitely.
use std::sync::Arc;

use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use super::cache::OidcCache;
use crate::clock::Clock;
use crate::error::VerifyError;

pub const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    pub jwks_uri: String,
}

pub struct DiscoveryClient {
    http: reqwest::Client,
    cache: OidcCache,
}

impl DiscoveryClient {
    pub fn new(http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            cache: OidcCache::new(clock),
        }
    }

    /// Fetch (or serve from cache) the provider's well-known configuration.
    pub async fn document(&self, issuer: &str) -> Result<DiscoveryDocument, VerifyError> {
        if let Some(document) = self.cache.document(issuer) {
            return Ok(document);
        }

        let url = well_known_url(issuer)?;
        let document: DiscoveryDocument = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if document.issuer.is_empty() {
            return Err(VerifyError::Discovery(
                "discovery document is missing an issuer".to_string(),
            ));
        }
        if document.issuer != issuer {
            // tolerated, but worth an audit trail
            warn!(
                expected = issuer,
                found = %document.issuer,
                "discovery returned non-matching issuer"
            );
        }

        self.cache.store_document(issuer, document.clone());
        Ok(document)
    }

    /// Fetch (or serve from cache) the issuer's signing-key set, resolving
    /// the discovery document first if needed.
    pub async fn signing_keys(&self, issuer: &str) -> Result<Arc<JwkSet>, VerifyError> {
        if let Some(keys) = self.cache.signing_keys(issuer) {
            return Ok(keys);
        }

        let document = self.document(issuer).await?;
        let set: JwkSet = self
            .http
            .get(&document.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let set = Arc::new(set);
        self.cache.store_signing_keys(issuer, set.clone());
        Ok(set)
    }

    /// Pin a static signing-key set for an issuer, bypassing discovery.
    pub fn cache_signing_keys(&self, issuer: &str, keys: JwkSet) {
        self.cache.store_signing_keys(issuer, Arc::new(keys));
    }
}

fn well_known_url(issuer: &str) -> Result<Url, VerifyError> {
    let mut url = Url::parse(issuer)
        .map_err(|err| VerifyError::Discovery(format!("could not parse issuer as URL: {}", err)))?;
    let path = format!("{}/{}", url.path().trim_end_matches('/'), WELL_KNOWN_PATH);
    url.set_path(&path);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_url() {
        assert_eq!(
            well_known_url("https://issuer.example").unwrap().as_str(),
            "https://issuer.example/.well-known/openid-configuration"
        );
        assert_eq!(
            well_known_url("https://issuer.example/tenant/").unwrap().as_str(),
            "https://issuer.example/tenant/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_bad_issuer_url_rejected() {
        assert!(matches!(
            well_known_url("not a url"),
            Err(VerifyError::Discovery(_))
        ));
    }
}
