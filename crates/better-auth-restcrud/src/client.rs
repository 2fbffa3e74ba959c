// HTTP layer: the transport seam and the retrying REST client.
//
// `HttpTransport` is the boundary between the adapter and the wire; the
// production implementation is reqwest, tests plug in an in-memory one.
// `RestClient` owns everything above the wire: URL/query building, tenant
// header injection, retry with backoff, status classification, and metrics.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::RestCrudConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::metrics::AdapterMetrics;

/// Tenant scoping header sent when multi-tenancy is enabled.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// HTTP method subset used against the generated backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One request against the remote API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, without a leading slash
    /// (e.g. `users` or `users/u1`).
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// One response from the remote API. Non-2xx statuses are represented here
/// too; classification into errors happens above the transport, so the
/// retry loop can see the status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The wire boundary. Implementations only move bytes; retries, auth
/// headers beyond the static ones, and error taxonomy live in
/// [`RestClient`].
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    async fn execute(&self, request: ApiRequest) -> AdapterResult<ApiResponse>;
}

// ─── Reqwest transport ───────────────────────────────────────────

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &RestCrudConfig) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref key) = config.api_key {
            let value = if config.auth_header.eq_ignore_ascii_case("authorization") {
                format!("Bearer {key}")
            } else {
                key.clone()
            };
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(config.auth_header.as_bytes()),
                reqwest::header::HeaderValue::from_str(&value),
            ) {
                headers.insert(name, value);
            }
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> AdapterResult<ApiResponse> {
        let url = format!("{}/{}", self.base_url, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, &url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout(e.to_string())
            } else {
                AdapterError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        Ok(ApiResponse { status, body })
    }
}

// ─── Rest client ─────────────────────────────────────────────────

/// Request executor for the generated CRUD backend.
#[derive(Debug)]
pub struct RestClient {
    transport: Arc<dyn HttpTransport>,
    config: RestCrudConfig,
    metrics: Arc<AdapterMetrics>,
    tenant: RwLock<Option<String>>,
}

impl RestClient {
    pub fn new(config: RestCrudConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new(&config));
        Self::with_transport(config, transport)
    }

    /// Build a client over a custom transport (tests, instrumentation).
    pub fn with_transport(config: RestCrudConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            config,
            metrics: Arc::new(AdapterMetrics::new()),
            tenant: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RestCrudConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<AdapterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Set or clear the tenant id injected as `X-Tenant-ID`. A plain field
    /// write; callers issuing parallel requests for different tenants must
    /// use separate adapters.
    pub fn set_tenant(&self, tenant: Option<String>) {
        if let Ok(mut guard) = self.tenant.write() {
            *guard = tenant;
        }
    }

    fn current_tenant(&self) -> Option<String> {
        self.tenant.read().ok().and_then(|g| g.clone())
    }

    /// Execute a request, retrying retryable failures with backoff.
    /// Returns the response whatever its status; classification is the
    /// caller's job via [`Self::expect_ok`].
    pub async fn request(&self, mut request: ApiRequest) -> AdapterResult<ApiResponse> {
        if self.config.multi_tenant {
            if let Some(tenant) = self.current_tenant() {
                request.headers.push((TENANT_HEADER.to_string(), tenant));
            }
        }

        if self.config.debug_logs {
            tracing::debug!(method = %request.method, path = %request.path, "restcrud request");
        }

        let retry = &self.config.retry;
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let outcome = self.transport.execute(request.clone()).await;
            match outcome {
                Ok(response) => {
                    let retryable_status = !response.is_success()
                        && retry.retryable_statuses.contains(&response.status);
                    if retryable_status && attempt < retry.max_retries {
                        tokio::time::sleep(retry.delay_for(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    if response.is_success() {
                        self.metrics
                            .record_request(started.elapsed().as_millis() as u64);
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if err.is_retryable(&retry.retryable_statuses) && attempt < retry.max_retries {
                        tokio::time::sleep(retry.delay_for(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    self.metrics.record_error(err.kind());
                    return Err(err);
                }
            }
        }
    }

    /// Turn a non-2xx response into the taxonomy error, recording it.
    pub fn expect_ok(&self, response: ApiResponse) -> AdapterResult<Value> {
        if response.is_success() {
            return Ok(response.body);
        }
        let message = response
            .body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| response.body.to_string());
        let err = AdapterError::from_status(response.status, message);
        self.metrics.record_error(err.kind());
        Err(err)
    }

    // ─── CRUD helpers ───────────────────────────────────────────

    /// `GET /{collection}` with server-side filters and paging.
    pub async fn get_list(
        &self,
        collection: &str,
        filters: &[String],
        limit: Option<i64>,
        offset: Option<i64>,
        sort: Option<(&str, &str)>,
    ) -> AdapterResult<Value> {
        let mut request = ApiRequest::new(Method::Get, collection);
        for filter in filters {
            request.query.push(("filter".to_string(), filter.clone()));
        }
        if let Some(limit) = limit {
            request.query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = offset {
            request
                .query
                .push(("offset".to_string(), offset.to_string()));
        }
        if let Some((field, direction)) = sort {
            request
                .query
                .push(("sort".to_string(), format!("{field},{direction}")));
        }
        let response = self.request(request).await?;
        self.expect_ok(response)
    }

    /// `GET /{collection}/{id}`. A 404 means "not found", not an error.
    pub async fn get_by_id(&self, collection: &str, id: &str) -> AdapterResult<Option<Value>> {
        let request = ApiRequest::new(Method::Get, format!("{collection}/{id}"));
        let response = self.request(request).await?;
        if response.status == 404 {
            return Ok(None);
        }
        self.expect_ok(response).map(Some)
    }

    /// `POST /{collection}`. In dry-run mode the payload is echoed back
    /// without touching the network.
    pub async fn create_record(&self, collection: &str, body: Value) -> AdapterResult<Value> {
        if self.config.dry_run {
            return Ok(body);
        }
        let mut request = ApiRequest::new(Method::Post, collection);
        request.body = Some(body);
        let response = self.request(request).await?;
        self.expect_ok(response)
    }

    /// `PATCH /{collection}/{id}`. A 404 surfaces as a not-found error:
    /// updating a missing record is a caller mistake.
    pub async fn update_record(
        &self,
        collection: &str,
        id: &str,
        body: Value,
    ) -> AdapterResult<Value> {
        if self.config.dry_run {
            return Ok(body);
        }
        let mut request = ApiRequest::new(Method::Patch, format!("{collection}/{id}"));
        request.body = Some(body);
        let response = self.request(request).await?;
        self.expect_ok(response)
    }

    /// `DELETE /{collection}/{id}` (with `?soft=true` when configured).
    pub async fn delete_record(&self, collection: &str, id: &str) -> AdapterResult<Value> {
        if self.config.dry_run {
            return Ok(Value::Null);
        }
        let mut request = ApiRequest::new(Method::Delete, format!("{collection}/{id}"));
        if self.config.soft_delete {
            request
                .query
                .push(("soft".to_string(), "true".to_string()));
        }
        let response = self.request(request).await?;
        self.expect_ok(response)
    }
}
