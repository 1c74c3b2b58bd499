//! Elasticsearch-compatible search engine client

use async_trait::async_trait;
use catalog_core::config::EngineConfig;
use catalog_core::engine::{
    BulkIndexReport, BulkItemResult, EngineResponse, IndexStats, IndexTimings, SearchEngine,
    SearchTimings, ShardCounts,
};
use catalog_core::query::CompiledQuery;
use catalog_core::{CatalogError, Product, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Engine client configuration
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    pub base_url: String,
    pub index: String,
    pub timeout: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            index: "products".to_string(),
            timeout: Duration::from_secs(30),
            username: None,
            password: None,
        }
    }
}

impl From<&EngineConfig> for ElasticConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            base_url: config.url.clone(),
            index: config.index.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

/// HTTP client for the engine's REST API
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ElasticClient {
    config: ElasticConfig,
    base: Url,
    client: reqwest::Client,
}

impl ElasticClient {
    /// Create a new engine client
    pub fn new(config: ElasticConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        if base.cannot_be_a_base() {
            return Err(CatalogError::validation(format!(
                "engine URL '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CatalogError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            base,
            client,
        })
    }

    pub fn index(&self) -> &str {
        &self.config.index
    }

    /// Product mapping used when the index is created
    pub fn product_mapping() -> Value {
        let text_with_keyword = json!({
            "type": "text",
            "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
        });

        json!({
            "mappings": {
                "properties": {
                    "id": { "type": "keyword" },
                    "name": text_with_keyword,
                    "description": text_with_keyword,
                    "category": text_with_keyword,
                    "price": { "type": "double" },
                    "rating": { "type": "float" },
                    "inStock": { "type": "boolean" },
                    "tags": text_with_keyword,
                    "createdAt": { "type": "date" },
                    "updatedAt": { "type": "date" }
                }
            }
        })
    }

    /// Create the index with the product mapping when it does not exist
    ///
    /// Returns `true` when the index was created.
    pub async fn ensure_index(&self) -> Result<bool> {
        let url = self.url(&[self.index()])?;
        let response = self.send(self.request(Method::HEAD, url.clone())).await?;

        if response.status().is_success() {
            debug!("Index {} already exists", self.index());
            return Ok(false);
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Err(engine_error("index lookup", response).await);
        }

        let response = self
            .send(
                self.request(Method::PUT, url)
                    .json(&Self::product_mapping()),
            )
            .await?;
        check(response, "index creation").await?;

        info!("Created index {}", self.index());
        Ok(true)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::validation("engine URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.config.username {
            Some(ref user) => builder.basic_auth(user, self.config.password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::timeout("search engine request")
            } else {
                CatalogError::network(format!("Failed to reach search engine: {}", e))
            }
        })
    }
}

async fn engine_error(operation: &str, response: Response) -> CatalogError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    CatalogError::engine(format!("{} failed with status {}: {}", operation, status, body))
}

async fn check(response: Response, operation: &str) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(engine_error(operation, response).await)
    }
}

async fn parse<T: for<'de> Deserialize<'de>>(response: Response, operation: &str) -> Result<T> {
    response.json::<T>().await.map_err(|e| {
        CatalogError::engine(format!("Failed to parse {} response: {}", operation, e))
    })
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<std::collections::HashMap<String, BulkResponseItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

impl BulkResponseItem {
    fn into_result(self) -> BulkItemResult {
        let success = self.error.is_none() && (200..300).contains(&self.status);
        let error = self.error.map(|e| {
            e.get("reason")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string())
        });
        BulkItemResult {
            id: self.id,
            success,
            error,
        }
    }
}

fn u64_at(value: &Value, pointer: &str) -> u64 {
    value.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}

#[async_trait]
impl SearchEngine for ElasticClient {
    async fn execute(&self, query: &CompiledQuery) -> Result<EngineResponse> {
        let url = self.url(&[self.index(), "_search"])?;
        debug!("Executing search against {}", url);

        let response = self
            .send(self.request(Method::POST, url).json(&query.to_body()))
            .await?;
        let response = check(response, "search").await?;
        parse(response, "search").await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Product>> {
        let url = self.url(&[self.index(), "_doc", id])?;
        let response = self.send(self.request(Method::GET, url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response, "get document").await?;
        let doc: GetResponse = parse(response, "get document").await?;

        match (doc.found, doc.source) {
            (true, Some(source)) => {
                let mut product: Product = serde_json::from_value(source)?;
                if product.id.is_empty() {
                    product.id = doc.id;
                }
                Ok(Some(product))
            }
            _ => Ok(None),
        }
    }

    async fn index_one(&self, product: &Product) -> Result<()> {
        if product.id.is_empty() {
            return Err(CatalogError::validation("product id is required for indexing"));
        }
        let url = self.url(&[self.index(), "_doc", &product.id])?;
        let response = self
            .send(self.request(Method::PUT, url).json(product))
            .await?;
        check(response, "index document").await?;
        debug!("Indexed product {}", product.id);
        Ok(())
    }

    async fn index_bulk(&self, products: &[Product]) -> Result<BulkIndexReport> {
        if products.is_empty() {
            return Ok(BulkIndexReport::default());
        }

        let mut body = String::new();
        for product in products {
            let action = json!({ "index": { "_index": self.index(), "_id": product.id } });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&serde_json::to_string(product)?);
            body.push('\n');
        }

        let url = self.url(&["_bulk"])?;
        let response = self
            .send(
                self.request(Method::POST, url)
                    .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                    .body(body),
            )
            .await?;
        let response = check(response, "bulk index").await?;
        let bulk: BulkResponse = parse(response, "bulk index").await?;

        let items = bulk
            .items
            .into_iter()
            .filter_map(|mut item| item.remove("index").or_else(|| item.into_values().next()))
            .map(BulkResponseItem::into_result)
            .collect();
        let report = BulkIndexReport::from_items(items);

        if report.has_errors() {
            warn!(
                "Bulk index finished with {} of {} failures",
                report.error_count,
                report.items.len()
            );
        } else {
            info!("Bulk indexed {} products", report.items.len());
        }
        Ok(report)
    }

    async fn update_by_id(&self, id: &str, changes: &Value) -> Result<bool> {
        let url = self.url(&[self.index(), "_update", id])?;
        let response = self
            .send(self.request(Method::POST, url).json(&json!({ "doc": changes })))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response, "update document").await?;
        Ok(true)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let url = self.url(&[self.index(), "_doc", id])?;
        let response = self.send(self.request(Method::DELETE, url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response, "delete document").await?;
        Ok(true)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let url = self.url(&[self.index(), "_stats"])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let response = check(response, "index stats").await?;
        let raw: Value = parse(response, "index stats").await?;

        Ok(IndexStats {
            doc_count: u64_at(&raw, "/_all/primaries/docs/count"),
            size_bytes: u64_at(&raw, "/_all/primaries/store/size_in_bytes"),
            shards: ShardCounts {
                total: u64_at(&raw, "/_shards/total") as u32,
                successful: u64_at(&raw, "/_shards/successful") as u32,
                failed: u64_at(&raw, "/_shards/failed") as u32,
            },
            search: SearchTimings {
                query_total: u64_at(&raw, "/_all/total/search/query_total"),
                query_time_ms: u64_at(&raw, "/_all/total/search/query_time_in_millis"),
            },
            indexing: IndexTimings {
                index_total: u64_at(&raw, "/_all/total/indexing/index_total"),
                index_time_ms: u64_at(&raw, "/_all/total/indexing/index_time_in_millis"),
            },
        })
    }

    async fn health(&self) -> Result<bool> {
        let url = self.url(&["_cluster", "health"])?;

        match self.request(Method::GET, url).send().await {
            Ok(response) if response.status().is_success() => {
                let body: Value = parse(response, "cluster health").await?;
                let status = body.get("status").and_then(Value::as_str).unwrap_or("red");
                Ok(status != "red")
            }
            Ok(response) => {
                warn!("Engine health check returned {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Engine health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
