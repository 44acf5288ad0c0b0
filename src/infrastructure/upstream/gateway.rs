//! Cached, classified access to the upstream API

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::domain::cache::build_key;
use crate::domain::upstream::{
    FetchError, Method, QueryParams, Resource, TransactionQuery, TransportError, UpstreamRequest,
    UpstreamResponse, UpstreamTransport,
};
use crate::infrastructure::cache::CacheStore;

/// Length of the hex scope id derived from a credential
const SCOPE_LEN: usize = 16;

/// Settings shared by every gateway instance
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Server-level credential used when none is supplied per gateway
    pub api_key: Option<String>,
    /// Budget for each upstream call
    pub call_timeout: Duration,
    /// Service namespace prefixed to every cache key
    pub namespace: String,
    /// TTL overrides keyed by resource name (e.g. `accounts`, `summary`)
    pub resource_ttls: HashMap<String, Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut resource_ttls = HashMap::new();
        resource_ttls.insert("summary".to_string(), Duration::from_secs(1800));

        Self {
            api_key: None,
            call_timeout: Duration::from_secs(30),
            namespace: "organizze".to_string(),
            resource_ttls,
        }
    }
}

impl GatewayConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_resource_ttl(mut self, resource: impl Into<String>, ttl: Duration) -> Self {
        self.resource_ttls.insert(resource.into(), ttl);
        self
    }

    /// TTL for a resource, falling back to `default` when no override exists
    pub fn ttl_for(&self, resource: &str, default: Duration) -> Duration {
        self.resource_ttls.get(resource).copied().unwrap_or(default)
    }
}

/// Derives the caller scope id from an upstream credential
///
/// The first 16 hex characters of the credential's SHA-256. Used to namespace
/// cache entries per caller and as the user id of issued sessions.
pub fn scope_for(credential: &str) -> String {
    let digest = Sha256::digest(credential.as_bytes());
    let mut scope = hex::encode(digest);
    scope.truncate(SCOPE_LEN);
    scope
}

/// Upstream gateway bound to a single caller credential
///
/// Reads (`GET`) are served from the [`CacheStore`] when possible and
/// written back after a successful upstream call. Every failure is reported
/// as exactly one [`FetchError`]; no call is retried.
#[derive(Clone)]
pub struct FetchGateway {
    transport: Arc<dyn UpstreamTransport>,
    cache: Arc<CacheStore>,
    config: Arc<GatewayConfig>,
    authorization: String,
    scope: String,
}

impl std::fmt::Debug for FetchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchGateway")
            .field("scope", &self.scope)
            .field("config", &self.config)
            .field("authorization", &"[REDACTED]")
            .finish()
    }
}

impl FetchGateway {
    /// Creates a gateway for `credential`, or for the configured API key when `None`
    ///
    /// Fails with [`FetchError::Internal`] when neither is available.
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        cache: Arc<CacheStore>,
        config: Arc<GatewayConfig>,
        credential: Option<&str>,
    ) -> Result<Self, FetchError> {
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or_else(|| {
                config
                    .api_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
            })
            .ok_or_else(|| FetchError::internal("No upstream API credential configured"))?;

        Ok(Self {
            authorization: format!("Basic {}", credential),
            scope: scope_for(credential),
            transport,
            cache,
            config,
        })
    }

    /// Scope id of the bound credential
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Cache key for a read of `resource` with `params`
    pub fn cache_key(&self, resource: &str, params: &QueryParams) -> String {
        build_key(
            &self.config.namespace,
            &[self.scope.as_str(), resource, params.canonical().as_str()],
        )
    }

    /// Cache key for a value derived from upstream data
    pub fn derived_key(&self, name: &str) -> String {
        build_key(&self.config.namespace, &[self.scope.as_str(), name])
    }

    /// Fetches `resource` (an upstream path such as `/accounts`)
    pub async fn fetch(
        &self,
        resource: &str,
        method: Method,
        params: &QueryParams,
    ) -> Result<Value, FetchError> {
        let cache_key = method
            .is_cacheable()
            .then(|| self.cache_key(resource, params));

        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get::<Value>(key).await {
                debug!(resource, cache_key = %key, "Cache hit");
                return Ok(cached);
            }
            debug!(resource, cache_key = %key, "Cache miss");
        }

        let payload = self.call_upstream(resource, method, params).await?;

        if let Some(key) = cache_key {
            let ttl = self.config.ttl_for(resource_name(resource), self.cache.default_ttl());
            self.store_detached(key, payload.clone(), ttl).await;
        }

        Ok(payload)
    }

    /// `GET` shorthand for [`fetch`](Self::fetch)
    pub async fn get(&self, resource: Resource, params: &QueryParams) -> Result<Value, FetchError> {
        self.fetch(resource.path(), Method::Get, params).await
    }

    pub async fn accounts(&self) -> Result<Value, FetchError> {
        self.get(Resource::Accounts, &QueryParams::new()).await
    }

    pub async fn transactions(&self, query: &TransactionQuery) -> Result<Value, FetchError> {
        self.get(Resource::Transactions, &query.to_params()).await
    }

    pub async fn categories(&self) -> Result<Value, FetchError> {
        self.get(Resource::Categories, &QueryParams::new()).await
    }

    pub async fn budgets(&self) -> Result<Value, FetchError> {
        self.get(Resource::Budgets, &QueryParams::new()).await
    }

    /// Returns the cached value derived under `name`, computing and caching it on a miss
    ///
    /// The TTL comes from the `name` override, or the cache default.
    pub async fn cached_derived<T, F, Fut>(&self, name: &str, compute: F) -> Result<T, FetchError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let key = self.derived_key(name);

        if let Some(cached) = self.cache.get::<T>(&key).await {
            debug!(derived = name, cache_key = %key, "Cache hit");
            return Ok(cached);
        }

        let value = compute().await?;
        let encoded = serde_json::to_value(&value)
            .map_err(|e| FetchError::internal(format!("Failed to encode {}: {}", name, e)))?;

        let ttl = self.config.ttl_for(name, self.cache.default_ttl());
        self.store_detached(key, encoded, ttl).await;

        Ok(value)
    }

    /// Reports whether the upstream accepts the bound credential; never fails
    pub async fn health_check(&self) -> bool {
        match self.accounts().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Upstream health check failed");
                false
            }
        }
    }

    async fn call_upstream(
        &self,
        resource: &str,
        method: Method,
        params: &QueryParams,
    ) -> Result<Value, FetchError> {
        let request = UpstreamRequest {
            method,
            path: resource.to_string(),
            params: params.clone(),
            authorization: self.authorization.clone(),
            timeout: self.config.call_timeout,
        };

        let start = Instant::now();
        let outcome =
            tokio::time::timeout(self.config.call_timeout, self.transport.send(request)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let response = match outcome {
            Err(_) => Err(FetchError::Timeout),
            Ok(result) => result.map_err(classify_transport),
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(resource, method = %method, duration_ms, kind = e.kind(), error = %e, "Upstream call failed");
                return Err(e);
            }
        };

        info!(resource, method = %method, status = response.status, duration_ms, "Upstream call completed");

        parse_response(resource, response)
    }

    /// Writes to the cache from a spawned task so the write completes even if
    /// the calling request is dropped mid-way
    async fn store_detached(&self, key: String, value: Value, ttl: Duration) {
        let cache = Arc::clone(&self.cache);
        let task = tokio::spawn(async move { cache.set_with_ttl(&key, &value, ttl).await });

        match task.await {
            Ok(true) => {}
            Ok(false) => debug!("Cache write failed, returning upstream payload anyway"),
            Err(e) => warn!(error = %e, "Cache write task failed"),
        }
    }
}

fn classify_transport(error: TransportError) -> FetchError {
    match error {
        TransportError::Timeout => FetchError::Timeout,
        TransportError::Connect(message) | TransportError::Interrupted(message) => {
            FetchError::NetworkUnavailable(message)
        }
        TransportError::InvalidRequest(message) => FetchError::Internal(message),
    }
}

fn parse_response(resource: &str, response: UpstreamResponse) -> Result<Value, FetchError> {
    if !response.is_success() {
        return Err(FetchError::from_status(response.status));
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&response.body).map_err(|e| {
        FetchError::internal(format!("Unparseable response from {}: {}", resource, e))
    })
}

/// `/accounts` -> `accounts`
fn resource_name(resource: &str) -> &str {
    resource.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::upstream::MockTransport;
    use crate::infrastructure::cache::{CacheBacking, CacheConfig};
    use serde_json::json;

    fn store() -> Arc<CacheStore> {
        Arc::new(CacheStore::local(&CacheConfig::default()))
    }

    fn gateway_with(
        transport: Arc<MockTransport>,
        cache: Arc<CacheStore>,
        config: GatewayConfig,
    ) -> FetchGateway {
        FetchGateway::new(transport, cache, Arc::new(config), Some("user-token")).unwrap()
    }

    fn gateway(transport: Arc<MockTransport>, cache: Arc<CacheStore>) -> FetchGateway {
        gateway_with(transport, cache, GatewayConfig::default())
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let transport = Arc::new(
            MockTransport::new().with_json("/accounts", json!([{"id": 1, "name": "Checking"}])),
        );
        let gateway = gateway(transport.clone(), store());

        let first = gateway.accounts().await.unwrap();
        assert_eq!(transport.calls(), 1);

        let second = gateway.accounts().await.unwrap();
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_first_read_populates_cache() {
        let cache = store();
        let transport = Arc::new(MockTransport::new().with_json("/categories", json!([])));
        let gateway = gateway(transport, cache.clone());

        gateway.categories().await.unwrap();

        let key = gateway.cache_key("/categories", &QueryParams::new());
        assert_eq!(cache.get::<Value>(&key).await, Some(json!([])));
    }

    #[tokio::test]
    async fn test_credential_sent_as_basic_authorization() {
        let transport = Arc::new(MockTransport::new().with_json("/budgets", json!([])));
        let gateway = gateway(transport.clone(), store());

        gateway.budgets().await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].authorization, "Basic user-token");
        assert_eq!(requests[0].path, "/budgets");
        assert_eq!(requests[0].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_non_get_bypasses_cache() {
        let transport = Arc::new(MockTransport::new().with_json("/transactions", json!({"id": 9})));
        let cache = store();
        let gateway = gateway(transport.clone(), cache.clone());

        gateway
            .fetch("/transactions", Method::Post, &QueryParams::new())
            .await
            .unwrap();
        gateway
            .fetch("/transactions", Method::Post, &QueryParams::new())
            .await
            .unwrap();

        assert_eq!(transport.calls(), 2);
        let key = gateway.cache_key("/transactions", &QueryParams::new());
        assert_eq!(cache.get::<Value>(&key).await, None);
    }

    #[tokio::test]
    async fn test_distinct_params_use_distinct_entries() {
        let transport = Arc::new(MockTransport::new().echoing());
        let gateway = gateway(transport.clone(), store());

        let page_one = gateway
            .transactions(&TransactionQuery::default())
            .await
            .unwrap();
        let page_two = gateway
            .transactions(&TransactionQuery::default().with_page(2))
            .await
            .unwrap();

        assert_eq!(transport.calls(), 2);
        assert_ne!(page_one, page_two);
    }

    #[tokio::test]
    async fn test_callers_do_not_share_entries() {
        let cache = store();
        let transport = Arc::new(MockTransport::new().with_json("/accounts", json!([])));
        let config = Arc::new(GatewayConfig::default());

        let alice =
            FetchGateway::new(transport.clone(), cache.clone(), config.clone(), Some("alice")).unwrap();
        let bob = FetchGateway::new(transport.clone(), cache, config, Some("bob")).unwrap();

        alice.accounts().await.unwrap();
        bob.accounts().await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_ne!(alice.scope(), bob.scope());
    }

    #[tokio::test]
    async fn test_unauthorized_is_classified_and_not_cached() {
        let cache = store();
        let transport = Arc::new(MockTransport::new().with_status("/accounts", 401, "denied"));
        let gateway = gateway(transport, cache.clone());

        let result = gateway.accounts().await;

        assert_eq!(result, Err(FetchError::Unauthorized));
        let key = gateway.cache_key("/accounts", &QueryParams::new());
        assert_eq!(cache.get::<Value>(&key).await, None);
    }

    #[tokio::test]
    async fn test_status_classification() {
        let transport = Arc::new(
            MockTransport::new()
                .with_status("/accounts", 429, "")
                .with_status("/categories", 503, "")
                .with_status("/budgets", 404, ""),
        );
        let gateway = gateway(transport, store());

        assert_eq!(gateway.accounts().await, Err(FetchError::RateLimited));
        assert_eq!(
            gateway.categories().await,
            Err(FetchError::UpstreamBadStatus(503))
        );
        assert_eq!(gateway.budgets().await, Err(FetchError::UpstreamBadStatus(404)));
    }

    #[tokio::test]
    async fn test_unparseable_success_is_internal_and_not_cached() {
        let cache = store();
        let transport = Arc::new(MockTransport::new().with_status("/accounts", 200, "<html>"));
        let gateway = gateway(transport, cache.clone());

        let result = gateway.accounts().await;

        assert!(matches!(result, Err(FetchError::Internal(_))));
        let key = gateway.cache_key("/accounts", &QueryParams::new());
        assert_eq!(cache.get::<Value>(&key).await, None);
    }

    #[tokio::test]
    async fn test_timeout_within_budget() {
        let cache = store();
        let transport = Arc::new(
            MockTransport::new()
                .with_json("/accounts", json!([]))
                .with_delay(Duration::from_secs(5)),
        );
        let config = GatewayConfig::default().with_call_timeout(Duration::from_millis(100));
        let gateway = gateway_with(transport, cache.clone(), config);

        let start = Instant::now();
        let result = gateway.accounts().await;

        assert_eq!(result, Err(FetchError::Timeout));
        assert!(start.elapsed() < Duration::from_millis(1000));
        let key = gateway.cache_key("/accounts", &QueryParams::new());
        assert_eq!(cache.get::<Value>(&key).await, None);
    }

    #[tokio::test]
    async fn test_transport_errors_are_classified() {
        let transport = Arc::new(
            MockTransport::new()
                .with_error("/accounts", TransportError::Connect("dns".to_string()))
                .with_error("/categories", TransportError::Interrupted("reset".to_string()))
                .with_error("/budgets", TransportError::InvalidRequest("bad header".to_string()))
                .with_error("/transactions", TransportError::Timeout),
        );
        let gateway = gateway(transport, store());

        assert!(matches!(
            gateway.accounts().await,
            Err(FetchError::NetworkUnavailable(_))
        ));
        assert!(matches!(
            gateway.categories().await,
            Err(FetchError::NetworkUnavailable(_))
        ));
        assert!(matches!(gateway.budgets().await, Err(FetchError::Internal(_))));
        assert_eq!(
            gateway.transactions(&TransactionQuery::default()).await,
            Err(FetchError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_missing_credential_fails_construction() {
        let transport: Arc<dyn UpstreamTransport> = Arc::new(MockTransport::new());
        let config = Arc::new(GatewayConfig::default());

        let result = FetchGateway::new(transport.clone(), store(), config.clone(), None);
        assert!(matches!(result, Err(FetchError::Internal(_))));

        let result = FetchGateway::new(transport, store(), config, Some("   "));
        assert!(matches!(result, Err(FetchError::Internal(_))));
    }

    #[tokio::test]
    async fn test_configured_credential_is_fallback() {
        let transport = Arc::new(MockTransport::new().with_json("/accounts", json!([])));
        let config = Arc::new(GatewayConfig::default().with_api_key("server-key"));

        let gateway = FetchGateway::new(transport.clone(), store(), config, None).unwrap();
        gateway.accounts().await.unwrap();

        assert_eq!(transport.requests()[0].authorization, "Basic server-key");
        assert_eq!(gateway.scope(), scope_for("server-key"));
    }

    #[tokio::test]
    async fn test_resource_ttl_override() {
        let mock_cache = Arc::new(MockCache::new());
        let cache = Arc::new(CacheStore::from_backing(
            CacheBacking::Local,
            mock_cache.clone(),
            Duration::from_secs(3600),
            false,
        ));
        let transport = Arc::new(
            MockTransport::new()
                .with_json("/accounts", json!([]))
                .with_json("/categories", json!([])),
        );
        let config = GatewayConfig::default().with_resource_ttl("categories", Duration::from_secs(60));
        let gateway = gateway_with(transport, cache, config);

        gateway.accounts().await.unwrap();
        gateway.categories().await.unwrap();

        let accounts_key = gateway.cache_key("/accounts", &QueryParams::new());
        let categories_key = gateway.cache_key("/categories", &QueryParams::new());
        assert_eq!(mock_cache.ttl_of(&accounts_key), Some(Duration::from_secs(3600)));
        assert_eq!(mock_cache.ttl_of(&categories_key), Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_failed_cache_write_still_returns_payload() {
        let cache = Arc::new(CacheStore::from_backing(
            CacheBacking::Durable,
            Arc::new(MockCache::new().with_error("down")),
            Duration::from_secs(60),
            false,
        ));
        let transport = Arc::new(MockTransport::new().with_json("/accounts", json!([1])));
        let gateway = gateway(transport.clone(), cache);

        assert_eq!(gateway.accounts().await, Ok(json!([1])));
        assert_eq!(gateway.accounts().await, Ok(json!([1])));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_degraded_store_still_serves() {
        let config = CacheConfig::default()
            .with_backing_address("redis://127.0.0.1:1")
            .with_connect_timeout(Duration::from_millis(200));
        let cache = Arc::new(CacheStore::connect(&config).await);
        let transport = Arc::new(MockTransport::new().with_json("/accounts", json!([])));
        let gateway = gateway(transport.clone(), cache.clone());

        assert!(cache.is_degraded());
        gateway.accounts().await.unwrap();
        gateway.accounts().await.unwrap();
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_for_distinct_keys() {
        let transport = Arc::new(MockTransport::new().echoing());
        let gateway = gateway(transport.clone(), store());

        let mut tasks = tokio::task::JoinSet::new();
        for page in 1..=50u32 {
            let gateway = gateway.clone();
            tasks.spawn(async move {
                let query = TransactionQuery::default().with_page(page);
                let payload = gateway.transactions(&query).await.unwrap();
                (page, payload)
            });
        }

        let mut completed = 0;
        while let Some(result) = tasks.join_next().await {
            let (page, payload) = result.unwrap();
            let expected = format!("page={}&per_page=50", page);
            assert_eq!(payload["params"], json!(expected));
            completed += 1;
        }

        assert_eq!(completed, 50);
        assert_eq!(transport.calls(), 50);
    }

    #[tokio::test]
    async fn test_cached_derived_computes_once() {
        let gateway = gateway(Arc::new(MockTransport::new()), store());
        let counter = std::sync::atomic::AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..2 {
            let value: i64 = gateway
                .cached_derived("summary", move || async move {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_derived_propagates_errors() {
        let gateway = gateway(Arc::new(MockTransport::new()), store());

        let result: Result<i64, FetchError> = gateway
            .cached_derived("summary", || async { Err(FetchError::RateLimited) })
            .await;

        assert_eq!(result, Err(FetchError::RateLimited));
    }

    #[tokio::test]
    async fn test_health_check() {
        let healthy = gateway(
            Arc::new(MockTransport::new().with_json("/accounts", json!([]))),
            store(),
        );
        let unhealthy = gateway(
            Arc::new(MockTransport::new().with_status("/accounts", 401, "")),
            store(),
        );

        assert!(healthy.health_check().await);
        assert!(!unhealthy.health_check().await);
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let transport = Arc::new(MockTransport::new().with_status("/transactions", 204, ""));
        let gateway = gateway(transport, store());

        let result = gateway
            .fetch("/transactions", Method::Delete, &QueryParams::new())
            .await;

        assert_eq!(result, Ok(Value::Null));
    }

    #[tokio::test]
    async fn test_http_round_trip_is_cached() {
        use crate::infrastructure::upstream::{HttpTransport, DEFAULT_USER_AGENT};
        use wiremock::matchers::{header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/transactions"))
            .and(header("authorization", "Basic user-token"))
            .and(query_param("per_page", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 7}])))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Arc::new(HttpTransport::new(server.uri(), DEFAULT_USER_AGENT).unwrap());
        let gateway = FetchGateway::new(
            transport,
            store(),
            Arc::new(GatewayConfig::default()),
            Some("user-token"),
        )
        .unwrap();

        let query = TransactionQuery::default();
        let first = gateway.transactions(&query).await.unwrap();
        let second = gateway.transactions(&query).await.unwrap();

        assert_eq!(first, json!([{"id": 7}]));
        assert_eq!(first, second);
    }

    #[test]
    fn test_scope_for_is_stable() {
        assert_eq!(scope_for("token"), scope_for("token"));
        assert_eq!(scope_for("token").len(), 16);
        assert_ne!(scope_for("token"), scope_for("other"));
    }

    #[test]
    fn test_debug_redacts_credential() {
        let gateway = FetchGateway::new(
            Arc::new(MockTransport::new()),
            store(),
            Arc::new(GatewayConfig::default()),
            Some("very-secret"),
        )
        .unwrap();

        assert!(!format!("{:?}", gateway).contains("very-secret"));
    }
}
