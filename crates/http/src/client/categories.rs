//! Category client methods

use super::{ClientError, GatherClient};
use crate::types::CategoriesResponse;
use reqwest::Method;
use tracing::warn;

/// Categories shown when the backend list is unavailable
pub const DEFAULT_CATEGORIES: &[&str] = &["운동", "스터디", "모임"];

impl GatherClient {
    pub async fn categories(&self) -> Result<Vec<String>, ClientError> {
        let req = self.request(Method::GET, "/api/categories");
        let body: CategoriesResponse = self.execute(req).await?;
        Ok(body.categories)
    }

    /// Categories, or [`DEFAULT_CATEGORIES`] if the request fails or returns none
    pub async fn categories_or_default(&self) -> Vec<String> {
        match self.categories().await {
            Ok(categories) if !categories.is_empty() => categories,
            Ok(_) => default_categories(),
            Err(e) => {
                warn!("Failed to load categories, using defaults: {}", e);
                default_categories()
            }
        }
    }
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect()
}
