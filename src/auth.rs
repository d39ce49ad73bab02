//! Auth helper: thin pass-throughs to the backend's GoTrue endpoints.
//!
//! Expected backend outcomes (bad credentials, duplicate account, expired
//! session) come back as a structured [`AuthError`] inside [`AuthResult`];
//! only transport-level failures propagate as plain errors. Codes and
//! messages are defined by the backend service, not by this layer.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::client::SupabaseClient;

/// Sessions within this many seconds of expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Backend-reported authentication failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub code: Option<String>,
    pub message: String,
}

/// Exactly one of value or error, as a real sum type.
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Unix timestamp (seconds) at which the access token expires.
    pub expires_at: i64,
    pub user: Option<AuthUser>,
}

impl Session {
    fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp() + EXPIRY_MARGIN_SECS
    }
}

/// Wire shape of GoTrue token-bearing responses.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<AuthUser>,
}

fn default_token_type() -> String {
    "bearer".into()
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at,
            user: self.user,
        }
    }
}

/// Current session, refreshed on demand when expired and the platform allows
/// token refresh. `Ok(None)` means "not signed in", which is not an error.
pub async fn get_session(client: &SupabaseClient) -> Result<AuthResult<Option<Session>>> {
    let session = match client.cached_session().await {
        Some(session) => Some(session),
        None => {
            let stored = client.persisted_session().await?;
            if let Some(session) = stored.clone() {
                client.store_session(session).await?;
            }
            stored
        }
    };

    let Some(session) = session else {
        return Ok(Ok(None));
    };
    if !session.is_expired() {
        return Ok(Ok(Some(session)));
    }
    if !client.options().auto_refresh_token || session.refresh_token.is_empty() {
        return Ok(Ok(None));
    }

    match refresh_session(client, &session.refresh_token).await? {
        Ok(fresh) => {
            client.store_session(fresh.clone()).await?;
            Ok(Ok(Some(fresh)))
        }
        Err(err) => Ok(Err(err)),
    }
}

/// Exchange email/password credentials for a session.
pub async fn sign_in(
    client: &SupabaseClient,
    email: &str,
    password: &str,
) -> Result<AuthResult<Session>> {
    let body = json!({ "email": email, "password": password });
    let outcome = auth_post(client, "token", Some("grant_type=password"), None, &body).await?;
    match outcome {
        Ok(value) => {
            let token: TokenResponse =
                serde_json::from_value(value).context("invalid sign-in response")?;
            let session = token.into_session();
            client.store_session(session.clone()).await?;
            Ok(Ok(session))
        }
        Err(err) => Ok(Err(err)),
    }
}

/// Register a new account. Depending on backend settings the response is
/// either a bare user (confirmation pending) or a full session.
pub async fn sign_up(
    client: &SupabaseClient,
    email: &str,
    password: &str,
) -> Result<AuthResult<AuthUser>> {
    let body = json!({ "email": email, "password": password });
    let outcome = auth_post(client, "signup", None, None, &body).await?;
    match outcome {
        Ok(value) => {
            if value.get("access_token").is_some() {
                let token: TokenResponse =
                    serde_json::from_value(value).context("invalid sign-up response")?;
                let session = token.into_session();
                let user = session
                    .user
                    .clone()
                    .context("sign-up session carried no user")?;
                client.store_session(session).await?;
                Ok(Ok(user))
            } else {
                let user: AuthUser =
                    serde_json::from_value(value).context("invalid sign-up response")?;
                Ok(Ok(user))
            }
        }
        Err(err) => Ok(Err(err)),
    }
}

/// End the current session. Local session state is cleared even when the
/// backend call fails, so a dropped token cannot wedge the client.
pub async fn sign_out(client: &SupabaseClient) -> Result<AuthResult<()>> {
    let session = match client.cached_session().await {
        Some(session) => Some(session),
        None => client.persisted_session().await?,
    };
    let Some(session) = session else {
        client.clear_session().await?;
        return Ok(Ok(()));
    };

    let outcome = auth_post(
        client,
        "logout",
        None,
        Some(&session.access_token),
        &Value::Null,
    )
    .await?;
    client.clear_session().await?;
    match outcome {
        Ok(_) => Ok(Ok(())),
        Err(err) => Ok(Err(err)),
    }
}

async fn refresh_session(
    client: &SupabaseClient,
    refresh_token: &str,
) -> Result<AuthResult<Session>> {
    let body = json!({ "refresh_token": refresh_token });
    let outcome = auth_post(
        client,
        "token",
        Some("grant_type=refresh_token"),
        None,
        &body,
    )
    .await?;
    match outcome {
        Ok(value) => {
            let token: TokenResponse =
                serde_json::from_value(value).context("invalid refresh response")?;
            Ok(Ok(token.into_session()))
        }
        Err(err) => Ok(Err(err)),
    }
}

/// POST to an `auth/v1` endpoint. Success yields the parsed body (null for
/// empty responses); API-level failure yields a normalized [`AuthError`].
async fn auth_post(
    client: &SupabaseClient,
    endpoint: &str,
    query: Option<&str>,
    bearer: Option<&str>,
    body: &Value,
) -> Result<AuthResult<Value>> {
    let mut url = client
        .base_url()
        .join(&format!("auth/v1/{endpoint}"))
        .context("invalid auth endpoint")?;
    if let Some(query) = query {
        url.set_query(Some(query));
    }

    debug!(%url, "sending auth request");
    let mut request = client
        .http()
        .post(url)
        .header("apikey", client.anon_key());
    request = match bearer {
        Some(token) => request.bearer_auth(token),
        None => request.bearer_auth(client.anon_key()),
    };
    if !body.is_null() {
        request = request.json(body);
    }

    let response = request.send().await.context("failed to reach auth service")?;
    let status = response.status();
    if status.is_success() {
        if status == StatusCode::NO_CONTENT {
            return Ok(Ok(Value::Null));
        }
        let value = response
            .json::<Value>()
            .await
            .context("invalid auth response body")?;
        return Ok(Ok(value));
    }

    let raw = response.text().await.unwrap_or_default();
    Ok(Err(normalize_auth_error(status, &raw)))
}

/// GoTrue error bodies are heterogeneous; fold the known shapes into one
/// `{code, message}` record.
fn normalize_auth_error(status: StatusCode, raw: &str) -> AuthError {
    let body: Value = serde_json::from_str(raw).unwrap_or(Value::Null);
    let message = ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(String::from)
        .unwrap_or_else(|| format!("auth request failed with status {status}"));
    let code = ["error_code", "code"].iter().find_map(|key| {
        body.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    });
    AuthError { code, message }
}
