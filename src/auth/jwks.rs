//! OpenID discovery + JWKS fetching with per-issuer caching and singleflight
//! coalescing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::verifier::VerifyError;

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    issuer: String,
    jwks_uri: String,
}

/// A fetched key set together with the issuer string the discovery document
/// claims it speaks for, so callers can validate the `iss` claim against the
/// same source that supplied the keys.
#[derive(Clone)]
pub struct DiscoveredKeys {
    pub keys: JwkSet,
    pub issuer: String,
}

struct CacheEntry {
    discovered: DiscoveredKeys,
    fetched_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

/// One entry per OpenID discovery URL. Concurrent misses for the same
/// issuer coalesce onto a single outbound fetch via a per-issuer
/// [`tokio::sync::Mutex`].
pub struct JwksCache {
    http: reqwest::Client,
    default_ttl: Duration,
    entries: Mutex<HashMap<String, Arc<Mutex<Option<CacheEntry>>>>>,
}

impl JwksCache {
    pub fn new(default_ttl: Duration) -> Self {
        JwksCache {
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builds"),
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, discovery_url: &str) -> Arc<Mutex<Option<CacheEntry>>> {
        let mut entries = self.entries.lock().await;
        entries
            .entry(discovery_url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Returns cached keys if fresh, otherwise fetches and repopulates.
    pub async fn get(&self, discovery_url: &str) -> Result<DiscoveredKeys, VerifyError> {
        let slot = self.slot(discovery_url).await;
        let mut guard = slot.lock().await;
        if let Some(entry) = guard.as_ref() {
            if entry.is_fresh() {
                return Ok(entry.discovered.clone());
            }
        }
        let entry = self.fetch(discovery_url).await?;
        let discovered = entry.discovered.clone();
        *guard = Some(entry);
        Ok(discovered)
    }

    /// Bypasses the TTL and refetches unconditionally. Called at most once
    /// per failed signature verification, on the key-rotation path.
    pub async fn force_refresh(&self, discovery_url: &str) -> Result<DiscoveredKeys, VerifyError> {
        let slot = self.slot(discovery_url).await;
        let mut guard = slot.lock().await;
        let entry = self.fetch(discovery_url).await?;
        let discovered = entry.discovered.clone();
        *guard = Some(entry);
        Ok(discovered)
    }

    async fn fetch(&self, discovery_url: &str) -> Result<CacheEntry, VerifyError> {
        let document: DiscoveryDocument = self
            .http
            .get(discovery_url)
            .send()
            .await
            .map_err(|err| VerifyError::DiscoveryUnreachable(err.to_string()))?
            .error_for_status()
            .map_err(|err| VerifyError::DiscoveryUnreachable(err.to_string()))?
            .json()
            .await
            .map_err(|err| VerifyError::DiscoveryUnreachable(err.to_string()))?;

        let response = self
            .http
            .get(&document.jwks_uri)
            .send()
            .await
            .map_err(|err| VerifyError::JwksUnreachable(err.to_string()))?
            .error_for_status()
            .map_err(|err| VerifyError::JwksUnreachable(err.to_string()))?;

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(max_age)
            .unwrap_or(self.default_ttl);

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|err| VerifyError::JwksUnreachable(err.to_string()))?;

        Ok(CacheEntry {
            discovered: DiscoveredKeys { keys, issuer: document.issuer },
            fetched_at: Instant::now(),
            ttl,
        })
    }
}

fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control.split(',').find_map(|directive| {
        let directive = directive.trim();
        let seconds = directive.strip_prefix("max-age=")?;
        seconds.parse::<u64>().ok().map(Duration::from_secs)
    })
}
