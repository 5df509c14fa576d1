//! Airtable record source
//!
//! Lists records of one table through the Airtable REST API:
//! `GET {api_base}/v0/{base_id}/{table}?pageSize=..&offset=..&filterByFormula=..`.
//! Pagination is driven by the `offset` token in the response; its presence
//! means more pages are available.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::connectors::trait_::{
    Cursor, FetchFilters, RecordPage, RecordSource, RecordSourceFactory, SourceError, SourceRecord,
};
use crate::schema::{AirtableConnection, EntitySchema};

/// Airtable caps `pageSize` at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

pub const DEFAULT_API_BASE: &str = "https://api.airtable.com";

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    #[serde(default)]
    records: Vec<SourceRecord>,
    #[serde(default)]
    offset: Option<String>,
}

/// Formula selecting records whose last-modified field is at or after `since`.
pub fn modified_since_formula(field: &str, since: DateTime<Utc>) -> String {
    format!(
        "NOT(IS_BEFORE({{{}}}, '{}'))",
        field,
        since.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Client bound to a single Airtable base
#[derive(Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    api_base: Url,
    base_id: String,
    api_key: String,
}

impl AirtableClient {
    pub fn new(http: reqwest::Client, api_base: Url, base_id: String, api_key: String) -> Self {
        Self {
            http,
            api_base,
            base_id,
            api_key,
        }
    }

    fn table_url(&self, table: &str) -> Result<Url, SourceError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Configuration {
                details: format!("API base {} cannot carry a path", self.api_base),
            })?
            .pop_if_empty()
            .extend(["v0", self.base_id.as_str(), table]);
        Ok(url)
    }

    fn list_url(&self, schema: &EntitySchema, filters: &FetchFilters) -> Result<Url, SourceError> {
        let mut url = self.table_url(&schema.table_name)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(
                "pageSize",
                &filters.page_size.clamp(1, MAX_PAGE_SIZE).to_string(),
            );
            if let Some(offset) = filters.cursor.as_ref().and_then(Cursor::as_str) {
                query.append_pair("offset", offset);
            }
            // No last-modified column means no filter at all, never an empty one.
            if let (Some(since), Some(field)) = (filters.modified_since, schema.last_modified_field())
            {
                query.append_pair("filterByFormula", &modified_since_formula(field, since));
            }
        }
        Ok(url)
    }
}

fn map_send_error(err: reqwest::Error) -> SourceError {
    SourceError::Network {
        retryable: err.is_timeout() || err.is_connect() || err.is_request(),
        details: err.to_string(),
    }
}

#[async_trait]
impl RecordSource for AirtableClient {
    async fn fetch_page(
        &self,
        schema: &EntitySchema,
        filters: &FetchFilters,
    ) -> Result<RecordPage, SourceError> {
        let url = self.list_url(schema, filters)?;
        debug!(base_id = %self.base_id, table = %schema.table_name, %url, "Fetching Airtable page");

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            warn!(base_id = %self.base_id, ?retry_after, "Rate limited by Airtable");
            return Err(SourceError::RateLimited { retry_after });
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Authentication {
                status: status.as_u16(),
                details: body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(map_send_error)?;
        let parsed: ListRecordsResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::MalformedResponse {
                details: e.to_string(),
            })?;

        let has_more = parsed.offset.is_some();
        Ok(RecordPage {
            records: parsed.records,
            next_cursor: parsed.offset.map(Cursor::from_string),
            has_more,
        })
    }
}

/// Builds [`AirtableClient`]s from per-VA connection documents
pub struct AirtableConnector {
    http: reqwest::Client,
    api_base: Url,
    default_api_key: Option<String>,
}

impl AirtableConnector {
    pub fn new(
        api_base: &str,
        default_api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let api_base = Url::parse(api_base).map_err(|e| SourceError::Configuration {
            details: format!("invalid Airtable API base {api_base}: {e}"),
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("va-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Configuration {
                details: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            api_base,
            default_api_key: default_api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

impl RecordSourceFactory for AirtableConnector {
    fn connect(
        &self,
        va_id: Uuid,
        connection: &AirtableConnection,
    ) -> Result<Arc<dyn RecordSource>, SourceError> {
        let base_id = connection.base_id.trim();
        if base_id.is_empty() {
            return Err(SourceError::Configuration {
                details: format!("VA {va_id} has no Airtable base id"),
            });
        }
        let api_key = connection
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_api_key.clone())
            .ok_or_else(|| SourceError::Configuration {
                details: format!("VA {va_id} has no Airtable API key"),
            })?;

        Ok(Arc::new(AirtableClient::new(
            self.http.clone(),
            self.api_base.clone(),
            base_id.to_string(),
            api_key,
        )))
    }
}
