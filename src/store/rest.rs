//! Task store backed by a hosted PostgREST endpoint.
//!
//! Reads send filters as query operators with a `Range` header and
//! `Prefer: count=exact`; the total comes back in `Content-Range`. Mutations
//! address rows with `id=eq.<id>` and ask for the affected rows back, so an
//! empty response means the id did not exist.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::query::{Pagination, TaskFilters, TasksPage};
use crate::task::{NewTask, Task, TaskPatch};

use super::TaskStore;

const REST_PATH: &str = "rest/v1";
const PREFER_COUNT: &str = "count=exact";
const PREFER_RETURN: &str = "return=representation";

#[derive(Clone)]
pub struct RestTaskStore {
    client: Client,
    endpoint: String,
}

impl RestTaskStore {
    pub fn new(base_url: &str, api_key: &str, table: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::InvalidConfig("store api key is not a valid header".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| Error::InvalidConfig("store api key is not a valid header".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/{REST_PATH}/{table}", base_url.trim_end_matches('/')),
        })
    }

    /// Build from config; `NotConfigured` when endpoint or key is missing.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let credentials = config.credentials()?;
        Self::new(
            &credentials.url,
            &credentials.api_key,
            &config.table,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn by_id(&self, builder: RequestBuilder, id: &str) -> RequestBuilder {
        builder
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", PREFER_RETURN)
    }
}

#[async_trait]
impl TaskStore for RestTaskStore {
    async fn fetch(&self, filters: &TaskFilters, pagination: Pagination) -> Result<TasksPage> {
        let (from, to) = pagination.range();
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(filters.to_query_pairs());
        query.push(("order".to_string(), "created_at.desc".to_string()));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .header("Range-Unit", "items")
            .header("Range", format!("{from}-{to}"))
            .header("Prefer", PREFER_COUNT)
            .send()
            .await?;

        // Past the last row PostgREST answers 416 with `*/<total>`.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            let total = parse_total(response.headers()).unwrap_or(0);
            return Ok(TasksPage::new(Vec::new(), total, pagination));
        }

        let response = check_status(response).await?;
        let total_header = parse_total(response.headers());
        let tasks: Vec<Task> = response.json().await?;
        let total = total_header.unwrap_or(from + tasks.len());
        tracing::debug!(returned = tasks.len(), total, page = pagination.page, "fetched tasks");
        Ok(TasksPage::new(tasks, total, pagination))
    }

    async fn create(&self, task: &NewTask) -> Result<Task> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Prefer", PREFER_RETURN)
            .json(task)
            .send()
            .await?;
        let rows: Vec<Task> = check_status(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::OperationFailed("insert returned no row".to_string()))
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let stamped = patch.clone().stamped(Utc::now());
        let response = self
            .by_id(self.client.patch(&self.endpoint), id)
            .json(&stamped)
            .send()
            .await?;
        let rows: Vec<Task> = check_status(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .by_id(self.client.delete(&self.endpoint), id)
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = check_status(response).await?.json().await?;
        if rows.is_empty() {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct PostgrestError {
    message: Option<String>,
    hint: Option<String>,
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<PostgrestError>(&body) {
        Ok(PostgrestError {
            message: Some(message),
            hint,
        }) => match hint {
            Some(hint) if !hint.is_empty() => format!("{message} ({hint})"),
            _ => message,
        },
        _ if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        _ => body,
    };
    Err(Error::RemoteRejected {
        status: status.as_u16(),
        message,
    })
}

/// Total row count from `Content-Range: 0-9/42` or `*/42`.
fn parse_total(headers: &HeaderMap) -> Option<usize> {
    let raw = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    let (_, total) = raw.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_range(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_RANGE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_content_range_total() {
        assert_eq!(parse_total(&headers_with_range("0-9/42")), Some(42));
        assert_eq!(parse_total(&headers_with_range("*/0")), Some(0));
        assert_eq!(parse_total(&headers_with_range("0-9/*")), None);
        assert_eq!(parse_total(&HeaderMap::new()), None);
    }

    #[test]
    fn endpoint_joins_rest_path() {
        let store = RestTaskStore::new(
            "https://db.example.co/",
            "key",
            "tasks",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(store.endpoint(), "https://db.example.co/rest/v1/tasks");
    }

    #[test]
    fn from_config_requires_credentials() {
        let err = RestTaskStore::from_config(&StoreConfig::default())
            .err()
            .expect("not configured");
        assert!(matches!(err, Error::NotConfigured(_)));
    }
}
