//! HTTP Oracle client.
//!
//! Talks to a text-completion endpoint. The wire shape is deliberately thin:
//! prompt in, text out. Status mapping is the interesting part: 429 becomes
//! a rate-limit signal carrying the server's retry-after hint.

use crate::oracle::{Oracle, OracleError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the HTTP Oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.oracle.example.com".to_string(),
            model: "default".to_string(),
            api_key_env: "ORACLE_API_KEY".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Reqwest-backed Oracle implementation.
#[derive(Debug)]
pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            OracleError::MissingApiKey {
                env_var: config.api_key_env.clone(),
            }
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            model: config.model,
            api_key,
        })
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/v1/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
            })
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(15);
            return Err(OracleError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        if body.text.is_empty() {
            return Err(OracleError::InvalidResponse("empty completion".to_string()));
        }

        Ok(body.text)
    }
}
