//! Database helper: uniform result shapes over the query layer.
//!
//! Many call sites share one wrapper, so every failure carries the label the
//! caller passed in. That label is the only thing this layer adds to the
//! backend's own error record.
use anyhow::Result;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use tracing::warn;

use crate::query::QueryBuilder;

/// The tables this application may query. Free-form names never reach the
/// request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Profiles,
    Entries,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Entries => "entries",
        }
    }
}

/// Error record as reported by the backend's query API.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl PostgrestError {
    /// Parse an error response body, falling back to a synthetic record when
    /// the body is not the expected JSON shape.
    pub(crate) fn from_body(status: StatusCode, raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| PostgrestError {
            code: status.as_u16().to_string(),
            message: if raw.trim().is_empty() {
                format!("query failed with status {status}")
            } else {
                raw.trim().to_string()
            },
            details: None,
            hint: None,
        })
    }
}

/// A backend query failure tied to the call site that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbFailure {
    pub operation: String,
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for DbFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.operation, self.message)?;
        if !self.code.is_empty() {
            write!(f, " (code: {})", self.code)?;
        }
        Ok(())
    }
}

impl std::error::Error for DbFailure {}

/// Exactly one of rows or failure.
pub type DbResult<T> = Result<T, DbFailure>;

fn normalize_db_error(operation: &str, error: PostgrestError) -> DbFailure {
    DbFailure {
        operation: operation.to_string(),
        code: error.code,
        message: error.message,
        details: error.details,
        hint: error.hint,
    }
}

/// Await a prepared query under a call-site label. Backend failures come
/// back structured; only transport-level problems propagate as errors.
pub async fn run_query<T: DeserializeOwned>(
    operation: &str,
    query: QueryBuilder<'_>,
) -> Result<DbResult<Vec<T>>> {
    match query.run::<T>().await? {
        Ok(rows) => Ok(Ok(rows)),
        Err(error) => {
            warn!(operation, code = %error.code, "query returned an error");
            Ok(Err(normalize_db_error(operation, error)))
        }
    }
}

/// Collapse a [`DbResult`] for callers that want to propagate instead of
/// branching: the data unchanged on success, an error carrying the operation
/// label otherwise.
pub fn unwrap_db<T>(result: DbResult<T>) -> Result<T> {
    result.map_err(Into::into)
}
