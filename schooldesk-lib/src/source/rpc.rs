//! PostgREST-style RPC backend

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::warn;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Map;
use url::Url;

use super::DataSource;
use super::FetchParams;
use super::PageRequest;
use super::PagedSource;
use super::Pages;
use super::RetryConfig;
use crate::auth::TokenProvider;
use crate::error::ApiError;
use crate::error::ConfigError;
use crate::error::Error;
use crate::model::Record;
use crate::model::RecordId;
use crate::model::ReferenceCollection;
use crate::model::ReferenceKind;
use crate::view::BulkAction;
use crate::view::BulkKind;

/// Where a reference collection comes from.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceFunction {
    /// RPC function returning the rows.
    pub function: String,
    /// Column holding the identifier.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Column holding the display label.
    #[serde(default = "default_label_field")]
    pub label_field: String,
}

impl ReferenceFunction {
    /// A function returning `id` / `name` rows.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            id_field: default_id_field(),
            label_field: default_label_field(),
        }
    }
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_label_field() -> String {
    "name".to_string()
}

fn default_page_size() -> usize {
    1000
}

/// Connection settings for [`RpcSource`].
///
/// # Example
///
/// ```
/// use schooldesk_lib::source::RpcConfig;
///
/// let config = RpcConfig::new("https://school.example.co", "anon-key")
///     .with_page_size(500)
///     .with_function("students", "get_students_with_programs");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// Project URL, without the `/rest/v1` suffix.
    pub base_url: String,
    /// Public API key sent in the `apikey` header.
    pub api_key: String,
    /// Rows requested per page. The backend caps pages at this size.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Column holding each record's identifier.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Table name to RPC function. Tables without an entry call a function
    /// of the same name.
    #[serde(default)]
    pub functions: HashMap<String, String>,
    /// Reference kind name to its source function.
    #[serde(default = "default_references")]
    pub references: HashMap<String, ReferenceFunction>,
    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Retry policy for reads.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_references() -> HashMap<String, ReferenceFunction> {
    HashMap::from([
        ("branches".to_string(), ReferenceFunction::new("get_branches")),
        ("programs".to_string(), ReferenceFunction::new("get_programs")),
    ])
}

impl RpcConfig {
    /// Creates a config with default page size and reference functions.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            page_size: default_page_size(),
            id_field: default_id_field(),
            functions: HashMap::new(),
            references: default_references(),
            timeout_secs: None,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Maps a table to its RPC function.
    pub fn with_function(mut self, table: impl Into<String>, function: impl Into<String>) -> Self {
        self.functions.insert(table.into(), function.into());
        self
    }

    /// Sets the function for a reference kind.
    pub fn with_reference(mut self, kind: &ReferenceKind, function: ReferenceFunction) -> Self {
        self.references.insert(kind.name().to_string(), function);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Sets the retry policy for reads.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn function_for(&self, table: &str) -> String {
        self.functions
            .get(table)
            .cloned()
            .unwrap_or_else(|| table.to_string())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(())
    }
}

/// Reads and writes through RPC functions exposed at
/// `{base_url}/rest/v1/rpc/{function}`.
///
/// Collections are requested with `limit`/`offset` parameters and drained
/// page by page. This source is cheap to clone (uses `Arc` internally).
///
/// # Example
///
/// ```ignore
/// use schooldesk_lib::auth::StaticTokenProvider;
/// use schooldesk_lib::source::{FetchParams, RpcConfig, RpcSource, DataSource};
///
/// let source = RpcSource::new(
///     RpcConfig::new("https://school.example.co", "anon-key"),
///     StaticTokenProvider::new(session_jwt),
/// )?;
/// let students = source.fetch_all(&FetchParams::table("students")).await?;
/// ```
#[derive(Clone)]
pub struct RpcSource {
    inner: Arc<RpcSourceInner>,
}

struct RpcSourceInner {
    config: RpcConfig,
    rpc_base: Url,
    token_provider: Arc<dyn TokenProvider>,
    http_client: Client,
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl RpcSource {
    /// Creates a source with a default HTTP client.
    pub fn new(
        config: RpcConfig,
        token_provider: impl TokenProvider + 'static,
    ) -> Result<Self, Error> {
        Self::with_http_client(config, token_provider, Client::new())
    }

    /// Creates a source with a custom HTTP client.
    pub fn with_http_client(
        config: RpcConfig,
        token_provider: impl TokenProvider + 'static,
        http_client: Client,
    ) -> Result<Self, Error> {
        config.validate()?;
        let base = format!("{}/rest/v1/rpc/", config.base_url.trim_end_matches('/'));
        let rpc_base =
            Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))?;
        Ok(Self {
            inner: Arc::new(RpcSourceInner {
                config,
                rpc_base,
                token_provider: Arc::new(token_provider),
                http_client,
            }),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RpcConfig {
        &self.inner.config
    }

    /// Calls an RPC function with a JSON object body.
    ///
    /// An empty response body resolves to `null`.
    pub async fn call(
        &self,
        function: &str,
        body: &Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, Error> {
        let url = self
            .inner
            .rpc_base
            .join(function)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", function, e)))?;

        let token = self.inner.token_provider.get_token().await?;

        let mut request = self
            .inner
            .http_client
            .post(url)
            .header("apikey", &self.inner.config.api_key)
            .bearer_auth(&token.access_token)
            .json(body);

        if let Some(secs) = self.inner.config.timeout_secs {
            request = request.timeout(Duration::from_secs(secs));
        }

        let response = request.send().await.map_err(ApiError::from)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            warn!("rpc {} failed with HTTP {}", function, status.as_u16());
            return Err(http_error(status.as_u16(), text).into());
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::parse_with_body(e.to_string(), text).into())
    }
}

impl RpcSource {
    /// Calls a read-only function, retrying transient failures.
    async fn read(
        &self,
        function: &str,
        body: &Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, Error> {
        let retry = &self.inner.config.retry;
        let mut attempt = 0;
        loop {
            match self.call(function, body).await {
                Ok(value) => return Ok(value),
                Err(e) => match retry.backoff(attempt, &e) {
                    Some(delay) => {
                        debug!("rpc {} retry {} in {:?}: {}", function, attempt + 1, delay, e);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
            }
        }
    }
}

fn http_error(status: u16, body: String) -> ApiError {
    match serde_json::from_str::<PostgrestError>(&body) {
        Ok(err) => ApiError::Http {
            status,
            message: err.message.unwrap_or_else(|| body.clone()),
            code: err.code,
            details: err.details.or(err.hint),
        },
        Err(_) => ApiError::http(status, body),
    }
}

fn rows(value: serde_json::Value) -> Result<Vec<serde_json::Value>, Error> {
    match value {
        serde_json::Value::Array(rows) => Ok(rows),
        serde_json::Value::Null => Ok(Vec::new()),
        other => {
            Err(ApiError::parse_with_body("expected an array of rows", other.to_string()).into())
        }
    }
}

#[async_trait]
impl PagedSource for RpcSource {
    fn page_size(&self) -> usize {
        self.inner.config.page_size
    }

    async fn fetch_page(
        &self,
        params: &FetchParams,
        page: PageRequest,
    ) -> Result<Vec<Record>, Error> {
        let mut body = params.filters.clone();
        body.insert("limit".to_string(), page.limit.into());
        body.insert("offset".to_string(), page.offset.into());

        let function = self.inner.config.function_for(&params.table);
        let id_field = &self.inner.config.id_field;
        rows(self.read(&function, &body).await?)?
            .into_iter()
            .map(|row| Record::from_json(row, id_field).map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl DataSource for RpcSource {
    async fn fetch_all(&self, params: &FetchParams) -> Result<Vec<Record>, Error> {
        Pages::new(self, params).drain().await
    }

    async fn fetch_reference(&self, kind: &ReferenceKind) -> Result<ReferenceCollection, Error> {
        let function = self
            .inner
            .config
            .references
            .get(kind.name())
            .ok_or_else(|| ConfigError::UnknownReference(kind.name().to_string()))?;

        let rows = rows(self.read(&function.function, &Map::new()).await?)?;
        debug!("fetched {} {} rows", rows.len(), kind);
        Ok(ReferenceCollection::from_rows(
            kind.clone(),
            rows,
            &function.id_field,
            &function.label_field,
        )?)
    }

    async fn mutate(&self, action: &BulkAction, ids: &[RecordId]) -> Result<(), Error> {
        let mut body = action.params.clone();
        body.insert(
            "ids".to_string(),
            ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().into(),
        );
        if let BulkKind::SetField { field, value } = &action.kind {
            body.insert(field.clone(), value.to_json());
        }

        let response = self.call(&action.function, &body).await?;

        // Functions wrapping their result as `{ data, error }` report failure in-band.
        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ApiError::Remote(message).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    #[test]
    fn test_http_error_parses_postgrest_body() {
        let err = http_error(
            400,
            r#"{"message":"invalid input","code":"22P02","details":null,"hint":"check ids"}"#.to_string(),
        );
        match err {
            ApiError::Http { status, message, code, details } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid input");
                assert_eq!(code.as_deref(), Some("22P02"));
                assert_eq!(details.as_deref(), Some("check ids"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(http_error(502, "bad gateway".to_string()).status_code(), Some(502));
    }

    #[test]
    fn test_config_validation() {
        let config = RpcConfig::new("https://school.example.co", "");
        assert!(matches!(
            RpcSource::new(config, StaticTokenProvider::new("t")),
            Err(Error::Config(ConfigError::Missing("api_key")))
        ));

        let config = RpcConfig::new("https://school.example.co", "k").with_page_size(0);
        assert!(matches!(
            RpcSource::new(config, StaticTokenProvider::new("t")),
            Err(Error::Config(ConfigError::ZeroPageSize))
        ));
    }

    #[test]
    fn test_function_mapping() {
        let config = RpcConfig::new("https://school.example.co/", "k")
            .with_function("students", "get_students_with_programs");
        assert_eq!(config.function_for("students"), "get_students_with_programs");
        assert_eq!(config.function_for("teachers"), "teachers");

        let source = RpcSource::new(config, StaticTokenProvider::new("t")).unwrap();
        assert_eq!(
            source.inner.rpc_base.join("get_branches").unwrap().as_str(),
            "https://school.example.co/rest/v1/rpc/get_branches"
        );
    }
}
