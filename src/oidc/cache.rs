//! Issuer-keyed caches for discovery documents and signing-key sets.
//!
//! Read-mostly: lookups take a read lock and never block each other; only a
//! store excludes other access to the same cache. The two caches expire
//! independently, each entry 30 minutes after it was stored.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::jwk::JwkSet;

use super::discovery::DiscoveryDocument;
use crate::clock::Clock;

pub const CACHE_TTL_MINUTES: i64 = 30;

struct Entry<T> {
    expires_at: DateTime<Utc>,
    value: T,
}

pub struct OidcCache {
    clock: Arc<dyn Clock>,
    documents: RwLock<HashMap<String, Entry<DiscoveryDocument>>>,
    keys: RwLock<HashMap<String, Entry<Arc<JwkSet>>>>,
}

impl OidcCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            documents: RwLock::new(HashMap::new()),
            keys: RwLock::new(HashMap::new()),
        }
    }

    fn expiry(&self) -> DateTime<Utc> {
        self.clock.now() + Duration::minutes(CACHE_TTL_MINUTES)
    }

    pub fn document(&self, issuer: &str) -> Option<DiscoveryDocument> {
        let documents = self.documents.read().expect("cache lock poisoned");
        let entry = documents.get(issuer)?;
        if self.clock.now() > entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn store_document(&self, issuer: &str, document: DiscoveryDocument) {
        let entry = Entry {
            expires_at: self.expiry(),
            value: document,
        };
        let mut documents = self.documents.write().expect("cache lock poisoned");
        documents.insert(issuer.to_string(), entry);
    }

    pub fn signing_keys(&self, issuer: &str) -> Option<Arc<JwkSet>> {
        let keys = self.keys.read().expect("cache lock poisoned");
        let entry = keys.get(issuer)?;
        if self.clock.now() > entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn store_signing_keys(&self, issuer: &str, set: Arc<JwkSet>) {
        let entry = Entry {
            expires_at: self.expiry(),
            value: set,
        };
        let mut keys = self.keys.write().expect("cache lock poisoned");
        keys.insert(issuer.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const ISSUER: &str = "https://issuer.example";

    fn document() -> DiscoveryDocument {
        DiscoveryDocument {
            issuer: ISSUER.to_string(),
            authorization_endpoint: None,
            token_endpoint: None,
            jwks_uri: format!("{}/jwks", ISSUER),
        }
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = OidcCache::new(clock.clone());

        cache.store_document(ISSUER, document());
        assert!(cache.document(ISSUER).is_some());

        clock.advance(Duration::minutes(CACHE_TTL_MINUTES - 1));
        assert!(cache.document(ISSUER).is_some());

        clock.advance(Duration::minutes(2));
        assert!(cache.document(ISSUER).is_none());
    }

    #[test]
    fn test_caches_expire_independently() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = OidcCache::new(clock.clone());

        cache.store_document(ISSUER, document());
        clock.advance(Duration::minutes(20));
        cache.store_signing_keys(ISSUER, Arc::new(JwkSet { keys: vec![] }));

        // document cache expires first, the key set survives
        clock.advance(Duration::minutes(15));
        assert!(cache.document(ISSUER).is_none());
        assert!(cache.signing_keys(ISSUER).is_some());
    }

    #[test]
    fn test_unknown_issuer_misses() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = OidcCache::new(clock);
        assert!(cache.document("https://nobody.example").is_none());
        assert!(cache.signing_keys("https://nobody.example").is_none());
    }
}
