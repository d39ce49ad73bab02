//! PostgREST query construction and execution.
//!
//! A [`QueryBuilder`] is produced by [`SupabaseClient::from`], configured
//! through chained calls, and awaited via [`QueryBuilder::run`]. Requests are
//! buildable without network access so tests can assert on method, path, and
//! headers.
use anyhow::{Context, Result};
use reqwest::{Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::SupabaseClient;
use crate::db::{PostgrestError, Table};

#[derive(Debug, Clone)]
enum Action {
    Select,
    Insert(Value),
    Update(Value),
    Delete,
}

#[derive(Debug)]
pub struct QueryBuilder<'a> {
    client: &'a SupabaseClient,
    table: Table,
    action: Action,
    columns: Option<String>,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<u32>,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(client: &'a SupabaseClient, table: Table) -> Self {
        Self {
            client,
            table,
            action: Action::Select,
            columns: None,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Restrict the returned columns, e.g. `"id"` or `"id,username"`.
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    /// Keep only rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.into(), format!("eq.{value}")));
        self
    }

    /// Order by `column`.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{column}.{direction}"));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Insert rows. `rows` is the serialized insert shape (an object or an
    /// array of objects).
    pub fn insert(mut self, rows: Value) -> Self {
        self.action = Action::Insert(rows);
        self
    }

    /// Update matching rows with the serialized change set.
    pub fn update(mut self, changes: Value) -> Self {
        self.action = Action::Update(changes);
        self
    }

    /// Delete matching rows.
    pub fn delete(mut self) -> Self {
        self.action = Action::Delete;
        self
    }

    /// Build the HTTP request this query will send, using `bearer` as the
    /// authorization credential.
    pub fn build_request(&self, bearer: &str) -> Result<Request> {
        let mut url = self
            .client
            .base_url()
            .join(&format!("rest/v1/{}", self.table.as_str()))
            .context("invalid query endpoint")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(columns) = &self.columns {
                pairs.append_pair("select", columns);
            }
            for (column, filter) in &self.filters {
                pairs.append_pair(column, filter);
            }
            if let Some(order) = &self.order {
                pairs.append_pair("order", order);
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        let method = match &self.action {
            Action::Select => Method::GET,
            Action::Insert(_) => Method::POST,
            Action::Update(_) => Method::PATCH,
            Action::Delete => Method::DELETE,
        };

        let mut request = self
            .client
            .http()
            .request(method, url)
            .header("apikey", self.client.anon_key())
            .bearer_auth(bearer);
        match &self.action {
            Action::Insert(body) | Action::Update(body) => {
                request = request
                    .header("Prefer", "return=representation")
                    .json(body);
            }
            Action::Delete => {
                request = request.header("Prefer", "return=representation");
            }
            Action::Select => {}
        }
        request.build().context("failed to build query request")
    }

    /// Execute the query. The outer `Result` is transport failure; the inner
    /// one is the backend's structured error.
    pub async fn run<T: DeserializeOwned>(self) -> Result<Result<Vec<T>, PostgrestError>> {
        let bearer = self
            .client
            .access_token()
            .await
            .unwrap_or_else(|| self.client.anon_key().to_string());
        let request = self.build_request(&bearer)?;
        debug!(url = %request.url(), method = %request.method(), "sending query request");

        let response = self
            .client
            .http()
            .execute(request)
            .await
            .context("failed to reach query service")?;
        let status = response.status();
        let raw = response.text().await.context("failed to read query response")?;

        if !status.is_success() {
            return Ok(Err(PostgrestError::from_body(status, &raw)));
        }
        if status == StatusCode::NO_CONTENT || raw.trim().is_empty() {
            return Ok(Ok(Vec::new()));
        }
        let rows: Vec<T> = serde_json::from_str(&raw).context("invalid query response body")?;
        Ok(Ok(rows))
    }
}
