//! Login session against `POST /authentication`.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::http::{read_json, HttpFileApi};
use crate::ClientError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
}

/// A logged-in console user. Holds the bearer token until [`logout`](Self::logout).
#[derive(Clone)]
pub struct Session {
    client: Client,
    base_url: String,
    username: String,
    token: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl Session {
    pub async fn login(
        base_url: impl Into<String>,
        username: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        Self::login_with_client(Client::new(), base_url, username, password).await
    }

    pub async fn login_with_client(
        client: Client,
        base_url: impl Into<String>,
        username: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let res = client
            .post(format!("{base_url}/authentication"))
            .json(&json!({
                "strategy": "local",
                "username": username,
                "password": password,
            }))
            .send()
            .await?;

        let out: LoginResponse = read_json(res).await.map_err(|e| match e {
            ClientError::Unauthorized(_) => ClientError::InvalidCredentials,
            other => other,
        })?;

        tracing::info!(username, "logged in");
        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            token: Some(out.access_token),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Drops the token; later API calls need a fresh login.
    pub fn logout(&mut self) {
        if self.token.take().is_some() {
            tracing::info!(username = %self.username, "logged out");
        }
    }

    /// File API authorized with this session's token.
    pub fn file_api(&self) -> Result<HttpFileApi, ClientError> {
        let token = self
            .token
            .clone()
            .ok_or_else(|| ClientError::Unauthorized("logged out".into()))?;
        Ok(HttpFileApi::with_client(self.client.clone(), self.base_url.clone()).with_token(token))
    }
}
