//! Trending-product source for the researcher step.

use crate::domain::ProductCandidate;
use crate::platform::PlatformError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Category queries the researcher fans out over.
pub const CATEGORY_QUERIES: [&str; 4] = ["electronics", "home", "fitness", "beauty"];

/// Source of trending product candidates.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Trending products for one category query.
    async fn trending(&self, query: &str) -> Result<Vec<ProductCandidate>, PlatformError>;
}

/// HTTP product feed client.
pub struct HttpProductSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductSource {
    pub fn new(base_url: &str) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl ProductSource for HttpProductSource {
    async fn trending(&self, query: &str) -> Result<Vec<ProductCandidate>, PlatformError> {
        let url = format!("{}/trending", self.base_url);
        let response = self.client.get(&url).query(&[("category", query)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;

        let candidates = value["products"]
            .as_array()
            .ok_or_else(|| PlatformError::InvalidResponse("missing products array".to_string()))?
            .iter()
            .filter_map(parse_candidate)
            .collect();
        Ok(candidates)
    }
}

fn parse_candidate(value: &Value) -> Option<ProductCandidate> {
    Some(ProductCandidate {
        id: value["id"].as_str()?.to_string(),
        name: value["name"].as_str()?.to_string(),
        url: value["url"].as_str().unwrap_or_default().to_string(),
        price: value["price"].as_f64().unwrap_or(0.0),
        description: value["description"].as_str().unwrap_or_default().to_string(),
        units_sold: value["units_sold"].as_u64().unwrap_or(0),
    })
}
