//! GitHub REST calls used by the runner lifecycle.
use reqwest::{
    StatusCode,
    header::{ACCEPT, AUTHORIZATION, USER_AGENT},
};
use serde::Deserialize;
use tracing::debug;

use crate::error::AgentError;

const UA: &str = "github-actions-runner-controller";
const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<String>,
}

/// Thin client over the three token endpoints; every one answers 201 on success.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Exchanges an app assertion for an installation access token.
    pub async fn installation_token(
        &self,
        installation_id: &str,
        app_jwt: &str,
    ) -> Result<String, AgentError> {
        let url = format!(
            "{}/app/installations/{installation_id}/access_tokens",
            self.api_url
        );
        self.post_for_token(&url, app_jwt, "installation access token")
            .await
    }

    pub async fn registration_token(
        &self,
        repository: &str,
        token: &str,
    ) -> Result<String, AgentError> {
        let url = format!(
            "{}/repos/{repository}/actions/runners/registration-token",
            self.api_url
        );
        self.post_for_token(&url, token, "registration token").await
    }

    pub async fn remove_token(&self, repository: &str, token: &str) -> Result<String, AgentError> {
        let url = format!(
            "{}/repos/{repository}/actions/runners/remove-token",
            self.api_url
        );
        self.post_for_token(&url, token, "remove token").await
    }

    async fn post_for_token(
        &self,
        url: &str,
        bearer: &str,
        what: &'static str,
    ) -> Result<String, AgentError> {
        let resp = self
            .http
            .post(url)
            .header(ACCEPT, ACCEPT_GITHUB_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
            .header(USER_AGENT, UA)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .send()
            .await?;

        if resp.status() != StatusCode::CREATED {
            return Err(AgentError::Status {
                what,
                status: resp.status().as_u16(),
            });
        }
        let body: TokenResponse = resp.json().await?;
        debug!(what, expires_at = ?body.expires_at, "token acquired");
        Ok(body.token)
    }
}
