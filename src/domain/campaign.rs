//! Product campaigns and trending-product candidates
//!
//! A ProductCampaign links a published content item back to the product it
//! promotes, carrying the reply template the Comment Response Engine uses for
//! buy-intent comments.

use crate::id::{generate_campaign_id, now_ms};
use serde::{Deserialize, Serialize};

/// A campaign tying a content item to a source product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCampaign {
    /// Unique identifier ("camp-{timestamp}-{hex}")
    pub id: String,

    /// The content item this campaign was created for
    pub post_id: String,

    /// Source product details
    pub product_url: String,
    pub product_name: String,
    pub product_price: f64,
    pub product_description: String,

    /// The persuasive copy generated for the post, kept for fallback matching
    pub copy_text: String,

    /// Reply template for buy-intent comments; `[NAME]` is substituted
    pub reply_template: String,

    /// Whether the comment engine may reply automatically
    pub auto_reply: bool,

    /// Mirror of the linked post's status string
    pub status: String,

    pub created_at: i64,
}

impl ProductCampaign {
    /// Create a campaign for a freshly generated product post
    pub fn new(post_id: &str, candidate: &ProductCandidate, copy_text: &str, reply_template: &str) -> Self {
        Self {
            id: generate_campaign_id(),
            post_id: post_id.to_string(),
            product_url: candidate.url.clone(),
            product_name: candidate.name.clone(),
            product_price: candidate.price,
            product_description: candidate.description.clone(),
            copy_text: copy_text.to_string(),
            reply_template: reply_template.to_string(),
            auto_reply: true,
            status: "approved".to_string(),
            created_at: now_ms(),
        }
    }
}

/// A trending product returned by the researcher step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCandidate {
    /// Stable product identifier (dedupe key across category queries)
    pub id: String,
    pub name: String,
    pub url: String,
    pub price: f64,
    pub description: String,
    /// Popularity metric used for ranking
    pub units_sold: u64,
}

/// Merge candidates from several category queries.
///
/// Dedupe is by product id, first-seen-wins (deterministic given query
/// order). Result is sorted by units_sold descending and truncated to `top`.
pub fn merge_candidates(batches: Vec<Vec<ProductCandidate>>, top: usize) -> Vec<ProductCandidate> {
    let mut seen = std::collections::HashSet::new();
    let mut merged: Vec<ProductCandidate> = Vec::new();

    for batch in batches {
        for candidate in batch {
            if seen.insert(candidate.id.clone()) {
                merged.push(candidate);
            }
        }
    }

    merged.sort_by(|a, b| b.units_sold.cmp(&a.units_sold));
    merged.truncate(top);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, units: u64) -> ProductCandidate {
        ProductCandidate {
            id: id.to_string(),
            name: format!("Product {}", id),
            url: format!("https://shop.example.com/{}", id),
            price: 49.9,
            description: "A product".to_string(),
            units_sold: units,
        }
    }

    #[test]
    fn test_merge_dedupes_by_id() {
        // 3 candidates across two queries, one id repeats
        let merged = merge_candidates(
            vec![
                vec![candidate("a", 100), candidate("b", 50)],
                vec![candidate("a", 999)],
            ],
            10,
        );

        assert_eq!(merged.len(), 2);
        // first-seen-wins: "a" keeps units_sold=100 from the first query
        assert_eq!(merged[0].id, "a");
        assert_eq!(merged[0].units_sold, 100);
        assert_eq!(merged[1].id, "b");
    }

    #[test]
    fn test_merge_sorts_descending_by_units_sold() {
        let merged = merge_candidates(
            vec![vec![candidate("low", 5), candidate("high", 500), candidate("mid", 50)]],
            10,
        );

        let ids: Vec<&str> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_merge_truncates_to_top() {
        let batch: Vec<ProductCandidate> =
            (0..20).map(|i| candidate(&format!("p{}", i), i as u64)).collect();
        let merged = merge_candidates(vec![batch], 10);
        assert_eq!(merged.len(), 10);
        // Highest sellers survive the cut
        assert_eq!(merged[0].units_sold, 19);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_candidates(vec![], 10).is_empty());
        assert!(merge_candidates(vec![vec![]], 10).is_empty());
    }

    #[test]
    fn test_campaign_from_candidate() {
        let c = candidate("a", 10);
        let campaign = ProductCampaign::new("post-1", &c, "Great deal!", "Oi [NAME], confira!");

        assert!(campaign.id.starts_with("camp-"));
        assert_eq!(campaign.post_id, "post-1");
        assert_eq!(campaign.product_name, "Product a");
        assert_eq!(campaign.copy_text, "Great deal!");
        assert!(campaign.auto_reply);
        assert_eq!(campaign.status, "approved");
    }
}
