//! Shared HTTP client and access-level selection.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::auth::AuthApi;
use super::cache::{CacheKey, CacheValue};
use super::rest::Rest;
use crate::config::BackendConfig;
use crate::models::AccessToken;

/// Client for the hosted backend.
///
/// Cheaply cloneable. Holds the connection pool, both API keys, and the
/// catalog cache shared by every request.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    service_role_key: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(BackendClientInner {
                http,
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
                cache,
            }),
        }
    }

    /// Requests subject to row-level security as an anonymous visitor.
    #[must_use]
    pub fn anon(&self) -> Rest<'_> {
        Rest::new(self, &self.inner.anon_key, &self.inner.anon_key)
    }

    /// Requests subject to row-level security as the signed-in user.
    #[must_use]
    pub fn as_user<'a>(&'a self, token: &'a AccessToken) -> Rest<'a> {
        Rest::new(self, &self.inner.anon_key, token.expose())
    }

    /// Requests with the service role, which bypasses row-level security.
    ///
    /// Only profile creation, guest checkout, admin seeding, and the CLI use this.
    #[must_use]
    pub fn privileged(&self) -> Rest<'_> {
        let key = self.inner.service_role_key.expose_secret();
        Rest::new(self, key, key)
    }

    /// The hosted auth API.
    #[must_use]
    pub const fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn anon_key(&self) -> &str {
        &self.inner.anon_key
    }

    pub(crate) fn cache(&self) -> &Cache<CacheKey, CacheValue> {
        &self.inner.cache
    }

    /// Build `{base}/{segments...}`.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, super::BackendError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| super::BackendError::InvalidUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Drop every cached catalog entry.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
        tracing::debug!("Catalog cache invalidated");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(url: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: Url::parse(url).unwrap(),
            anon_key: "anon".to_string(),
            service_role_key: SecretString::from("service"),
        })
    }

    #[test]
    fn test_endpoint_with_and_without_trailing_slash() {
        let a = client("https://abc.backend.test").endpoint(&["rest", "v1", "product_master"]);
        let b = client("https://abc.backend.test/").endpoint(&["rest", "v1", "product_master"]);
        assert_eq!(
            a.unwrap().as_str(),
            "https://abc.backend.test/rest/v1/product_master"
        );
        assert_eq!(
            b.unwrap().as_str(),
            "https://abc.backend.test/rest/v1/product_master"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = client("http://localhost:54321/proxy")
            .endpoint(&["auth", "v1", "token"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:54321/proxy/auth/v1/token");
    }
}
