//! HTTP client for the hosted backend's row API.
//!
//! PostgREST-style semantics: `GET /rest/v1/{table}` with filter query
//! parameters, `PATCH`/`POST` for mutations, `POST /rest/v1/rpc/{fn}` for
//! stored procedures. The key rides as both `apikey` and bearer token.
//! Rows decode into the typed structs in `crate::types` at this boundary;
//! callers never touch raw JSON shapes.

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::BackendConfig;
use crate::error::BackendError;

/// Typed access to the hosted backend. Explicitly constructed and passed
/// into the components that need it; the composition root owns its
/// lifecycle.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
    key: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        config.validate()?;
        let base = Url::parse(&config.url)
            .map_err(|e| BackendError::Config(format!("invalid backend URL: {}", e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            key: config.key.clone(),
        })
    }

    /// Backend host, for deriving the realtime socket URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn rest_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base.as_str().trim_end_matches('/'),
            table
        )
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Content-Type", "application/json")
    }

    /// Start a row query against `table`.
    pub fn select(&self, table: &str) -> SelectBuilder<'_> {
        SelectBuilder {
            client: self,
            table: table.to_string(),
            params: Vec::new(),
        }
    }

    /// Insert one row. The backend assigns id/created_at.
    pub async fn insert(&self, table: &str, body: &Value) -> Result<(), BackendError> {
        let resp = self
            .authed(self.http.post(self.rest_url(table)))
            .json(body)
            .send()
            .await?;
        Self::check(resp).await
    }

    /// Patch the row with the given id.
    pub async fn update(&self, table: &str, id: &str, fields: &Value) -> Result<(), BackendError> {
        let resp = self
            .authed(self.http.patch(self.rest_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .json(fields)
            .send()
            .await?;
        Self::check(resp).await
    }

    /// Insert-or-update keyed on the primary key.
    pub async fn upsert(&self, table: &str, body: &Value) -> Result<(), BackendError> {
        let resp = self
            .authed(self.http.post(self.rest_url(table)))
            .header("Prefer", "resolution=merge-duplicates")
            .json(body)
            .send()
            .await?;
        Self::check(resp).await
    }

    /// Call a stored procedure.
    pub async fn rpc(&self, function: &str, args: &Value) -> Result<Value, BackendError> {
        let url = format!(
            "{}/rest/v1/rpc/{}",
            self.base.as_str().trim_end_matches('/'),
            function
        );
        let resp = self.authed(self.http.post(url)).json(args).send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|source| BackendError::Decode {
            table: format!("rpc/{}", function),
            source,
        })
    }

    async fn check(resp: reqwest::Response) -> Result<(), BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// Builder for `GET /rest/v1/{table}` queries. Filters are simple
/// equality / not-null predicates; nothing here needs full PostgREST
/// operator coverage.
pub struct SelectBuilder<'a> {
    client: &'a BackendClient,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> SelectBuilder<'a> {
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn not_null(mut self, column: &str) -> Self {
        self.params
            .push((column.to_string(), "not.is.null".to_string()));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.params
            .push(("order".to_string(), format!("{}.desc", column)));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.params
            .push(("order".to_string(), format!("{}.asc", column)));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    /// Zero-based inclusive row window (`offset=..&limit=..` equivalent).
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.params.push(("offset".to_string(), from.to_string()));
        self.params
            .push(("limit".to_string(), (to.saturating_sub(from) + 1).to_string()));
        self
    }

    /// Accumulated query pairs, in insertion order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.params
    }

    /// Execute and decode into typed rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        let (rows, _) = self.fetch_inner(false).await?;
        Ok(rows)
    }

    /// Execute with an exact total count (for paged listings). The count
    /// covers all rows matching the filters, not just the returned window.
    pub async fn fetch_counted<T: DeserializeOwned>(
        self,
    ) -> Result<(Vec<T>, usize), BackendError> {
        let (rows, count) = self.fetch_inner(true).await?;
        let total = count.unwrap_or(rows.len());
        Ok((rows, total))
    }

    /// Execute expecting at most one row.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<Option<T>, BackendError> {
        let rows: Vec<T> = self.limit(1).fetch().await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_inner<T: DeserializeOwned>(
        self,
        counted: bool,
    ) -> Result<(Vec<T>, Option<usize>), BackendError> {
        let mut req = self
            .client
            .authed(self.client.http.get(self.client.rest_url(&self.table)))
            .query(&self.params);
        if counted {
            req = req.header("Prefer", "count=exact");
        }
        let resp = req.send().await?;
        let status = resp.status();
        let total = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let rows = serde_json::from_str(&body).map_err(|source| BackendError::Decode {
            table: self.table,
            source,
        })?;
        Ok((rows, total))
    }
}

/// Parse the total out of a `content-range` header (`0-19/57` or `*/57`).
fn parse_content_range_total(value: &str) -> Option<usize> {
    let total = value.rsplit('/').next()?;
    total.parse().ok()
}
