//! Graph-style HTTP client for the social platform.
//!
//! Error classification is the load-bearing part: 401/403 responses and
//! error payloads naming a missing permission map to the permission class,
//! which upstream triggers batch-fail instead of per-item retries.

use crate::domain::TokenStatus;
use crate::id::now_ms;
use crate::platform::{
    PageInfo, PageInsights, PlatformComment, PlatformError, PlatformPost, SocialPlatform,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Configuration for the platform client.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    pub page_id: String,
    /// Environment variable holding the page access token.
    pub token_env: String,
    pub timeout: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.platform.example.com".to_string(),
            page_id: String::new(),
            token_env: "PLATFORM_ACCESS_TOKEN".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Reqwest-backed platform client.
pub struct HttpPlatform {
    client: reqwest::Client,
    base_url: String,
    page_id: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
}

impl HttpPlatform {
    pub fn new(config: PlatformConfig) -> Result<Self, PlatformError> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            PlatformError::Permission(format!("access token env {} not set", config.token_env))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            page_id: config.page_id,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(&self, response: reqwest::Response) -> Result<Value, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| PlatformError::InvalidResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);

        let message = detail
            .as_ref()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| body.clone());

        if is_permission_error(status.as_u16(), detail.as_ref().map(|d| d.code), &message) {
            return Err(PlatformError::Permission(message));
        }

        Err(PlatformError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, PlatformError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .query(&[("access_token", self.token.as_str())])
            .send()
            .await?;
        self.check(response).await
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<Value, PlatformError> {
        let response = self
            .client
            .post(self.url(path))
            .query(&[("access_token", self.token.as_str())])
            .form(form)
            .send()
            .await?;
        self.check(response).await
    }
}

/// Permission-class detection: auth statuses, OAuth error codes, or an error
/// message naming a missing permission/scope.
fn is_permission_error(status: u16, code: Option<i64>, message: &str) -> bool {
    if status == 401 || status == 403 {
        return true;
    }
    if matches!(code, Some(190) | Some(200..=299)) {
        return true;
    }
    let lower = message.to_lowercase();
    lower.contains("permission") || lower.contains("scope")
}

fn str_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl SocialPlatform for HttpPlatform {
    async fn get_posts(&self, limit: usize) -> Result<Vec<PlatformPost>, PlatformError> {
        let path = format!("{}/posts", self.page_id);
        let limit = limit.to_string();
        let value = self
            .get(&path, &[("fields", "id,message,created_time"), ("limit", &limit)])
            .await?;

        let posts = value["data"]
            .as_array()
            .ok_or_else(|| PlatformError::InvalidResponse("missing data array".to_string()))?
            .iter()
            .map(|p| PlatformPost {
                id: str_field(p, "id"),
                message: str_field(p, "message"),
                created_at: p["created_time"].as_i64().unwrap_or(0),
            })
            .collect();
        Ok(posts)
    }

    async fn get_post_comments(
        &self,
        post_id: &str,
    ) -> Result<Vec<PlatformComment>, PlatformError> {
        let path = format!("{}/comments", post_id);
        let value = self.get(&path, &[("fields", "id,from,message")]).await?;

        let comments = value["data"]
            .as_array()
            .ok_or_else(|| PlatformError::InvalidResponse("missing data array".to_string()))?
            .iter()
            .map(|c| PlatformComment {
                id: str_field(c, "id"),
                author_name: str_field(&c["from"], "name"),
                text: str_field(c, "message"),
            })
            .collect();
        Ok(comments)
    }

    async fn publish_post(&self, message: &str) -> Result<String, PlatformError> {
        let path = format!("{}/feed", self.page_id);
        let value = self.post(&path, &[("message", message)]).await?;
        let id = str_field(&value, "id");
        if id.is_empty() {
            return Err(PlatformError::InvalidResponse("publish returned no id".to_string()));
        }
        Ok(id)
    }

    async fn publish_media_post(
        &self,
        message: &str,
        media_url: &str,
    ) -> Result<String, PlatformError> {
        let path = format!("{}/photos", self.page_id);
        let value = self
            .post(&path, &[("caption", message), ("url", media_url)])
            .await?;
        let id = str_field(&value, "id");
        if id.is_empty() {
            return Err(PlatformError::InvalidResponse("publish returned no id".to_string()));
        }
        Ok(id)
    }

    async fn reply_to_comment(
        &self,
        comment_id: &str,
        message: &str,
    ) -> Result<(), PlatformError> {
        let path = format!("{}/comments", comment_id);
        self.post(&path, &[("message", message)]).await?;
        Ok(())
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), PlatformError> {
        let response = self
            .client
            .delete(self.url(post_id))
            .query(&[("access_token", self.token.as_str())])
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn get_page_info(&self) -> Result<PageInfo, PlatformError> {
        let value = self
            .get(&self.page_id.clone(), &[("fields", "id,name,followers_count")])
            .await?;
        Ok(PageInfo {
            id: str_field(&value, "id"),
            name: str_field(&value, "name"),
            followers: value["followers_count"].as_i64().unwrap_or(0),
        })
    }

    async fn get_page_insights(&self, period: &str) -> Result<PageInsights, PlatformError> {
        let path = format!("{}/insights", self.page_id);
        let value = self
            .get(&path, &[("metric", "page_engaged_users,page_impressions"), ("period", period)])
            .await?;

        let mut engagement = 0.0;
        let mut impressions = 0;
        if let Some(data) = value["data"].as_array() {
            for metric in data {
                let name = str_field(metric, "name");
                let latest = metric["values"]
                    .as_array()
                    .and_then(|v| v.last())
                    .and_then(|v| v["value"].as_f64())
                    .unwrap_or(0.0);
                match name.as_str() {
                    "page_engaged_users" => engagement = latest,
                    "page_impressions" => impressions = latest as i64,
                    _ => {}
                }
            }
        }

        Ok(PageInsights {
            period: period.to_string(),
            engagement,
            impressions,
        })
    }

    async fn get_token_status(&self) -> Result<TokenStatus, PlatformError> {
        let value = self
            .get("debug_token", &[("input_token", self.token.as_str())])
            .await?;
        let data = &value["data"];

        let is_valid = data["is_valid"].as_bool().unwrap_or(false);
        let expires_at = data["expires_at"].as_i64().filter(|&e| e > 0).map(|e| e * 1000);
        let days_until_expiry =
            expires_at.map(|e| (e - now_ms()) / (24 * 60 * 60 * 1000));
        let scopes = data["scopes"]
            .as_array()
            .map(|s| {
                s.iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(TokenStatus {
            is_valid,
            expires_at,
            days_until_expiry,
            scopes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_error_detection() {
        assert!(is_permission_error(403, None, "forbidden"));
        assert!(is_permission_error(401, None, ""));
        assert!(is_permission_error(400, Some(190), "token invalid"));
        assert!(is_permission_error(400, Some(200), "requires publish_pages"));
        assert!(is_permission_error(
            400,
            None,
            "The user has not granted the Permission"
        ));
        assert!(is_permission_error(400, None, "missing scope: publish"));
        assert!(!is_permission_error(500, Some(1), "internal error"));
        assert!(!is_permission_error(400, Some(100), "invalid parameter"));
    }

    #[test]
    fn test_str_field() {
        let value = serde_json::json!({ "id": "p-1", "count": 3 });
        assert_eq!(str_field(&value, "id"), "p-1");
        assert_eq!(str_field(&value, "missing"), "");
        assert_eq!(str_field(&value, "count"), "");
    }

    #[test]
    fn test_default_config() {
        let config = PlatformConfig::default();
        assert_eq!(config.token_env, "PLATFORM_ACCESS_TOKEN");
    }
}
