//! Gathering API client methods

use super::{ClientError, GatherClient};
use crate::types::{
    DataEnvelope, GatheringDetail, GatheringQuery, GatheringRole, GatheringSort, GatheringSummary,
    GatheringUpdate, IntroRequest, IntroResponse, MyGathering, NewGathering, extract_list,
};
use reqwest::Method;
use serde_json::Value as JsonValue;
use tracing::debug;

const SHOWCASE_SIZE: u32 = 3;
const MY_GATHERINGS_PAGE_SIZE: u32 = 10;

impl GatherClient {
    /// List gatherings
    ///
    /// Entries without a usable id are skipped.
    pub async fn list_gatherings(
        &self,
        query: &GatheringQuery,
    ) -> Result<Vec<GatheringSummary>, ClientError> {
        let req = self
            .request(Method::GET, "/api/v1/gatherings")
            .query(&query.to_pairs());
        let raw: JsonValue = self.execute(req).await?;

        let items = extract_list(raw);
        let total = items.len();
        let summaries: Vec<_> = items
            .iter()
            .filter_map(GatheringSummary::from_value)
            .collect();
        if summaries.len() < total {
            debug!(
                skipped = total - summaries.len(),
                "Dropped gathering entries without an id"
            );
        }
        Ok(summaries)
    }

    /// Three most recent gatherings
    pub async fn latest_gatherings(&self) -> Result<Vec<GatheringSummary>, ClientError> {
        self.list_gatherings(&GatheringQuery {
            page: Some(1),
            size: Some(SHOWCASE_SIZE),
            sort: Some(GatheringSort::Latest),
            category: None,
        })
        .await
    }

    /// Three most popular gatherings
    pub async fn popular_gatherings(&self) -> Result<Vec<GatheringSummary>, ClientError> {
        self.list_gatherings(&GatheringQuery {
            size: Some(SHOWCASE_SIZE),
            sort: Some(GatheringSort::Popular),
            ..GatheringQuery::default()
        })
        .await
    }

    /// Three recommended gatherings
    ///
    /// The backend has no recommendation ranking yet; this is the latest list
    /// without paging.
    pub async fn recommended_gatherings(&self) -> Result<Vec<GatheringSummary>, ClientError> {
        self.list_gatherings(&GatheringQuery {
            size: Some(SHOWCASE_SIZE),
            sort: Some(GatheringSort::Latest),
            ..GatheringQuery::default()
        })
        .await
    }

    /// Get one gathering
    pub async fn gathering(&self, id: i64) -> Result<GatheringDetail, ClientError> {
        let req = self.request(Method::GET, &format!("/api/v1/gatherings/{id}"));
        let raw: JsonValue = self.execute(req).await?;
        Ok(GatheringDetail::from_value(&raw, id))
    }

    /// Create a gathering and return the normalized result
    pub async fn create_gathering(
        &self,
        gathering: &NewGathering,
    ) -> Result<GatheringDetail, ClientError> {
        let req = self
            .request(Method::POST, "/api/v1/gatherings")
            .json(gathering);
        let raw: JsonValue = self.execute(req).await?;
        Ok(GatheringDetail::from_value(&raw, 0))
    }

    /// Update the fields set in `update`
    pub async fn update_gathering(
        &self,
        id: i64,
        update: &GatheringUpdate,
    ) -> Result<(), ClientError> {
        let req = self
            .request(Method::PATCH, &format!("/api/v1/gatherings/{id}"))
            .json(update);
        self.execute_empty(req).await
    }

    pub async fn delete_gathering(&self, id: i64) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/api/v1/gatherings/{id}"));
        self.execute_empty(req).await
    }

    /// Join a gathering as the current user
    pub async fn join_gathering(&self, id: i64) -> Result<(), ClientError> {
        let req = self.request(
            Method::POST,
            &format!("/api/v1/gatherings/{id}/participants"),
        );
        self.execute_empty(req).await
    }

    /// Leave a gathering the current user joined
    pub async fn leave_gathering(&self, id: i64) -> Result<(), ClientError> {
        let req = self.request(
            Method::DELETE,
            &format!("/api/v1/gatherings/{id}/participants"),
        );
        self.execute_empty(req).await
    }

    /// Have the backend draft a description for a gathering
    pub async fn generate_intro(&self, request: &IntroRequest) -> Result<String, ClientError> {
        let req = self
            .request(Method::POST, "/api/v1/gatherings/intro")
            .json(request);
        let body: IntroResponse = self.execute(req).await?;
        Ok(body.intro)
    }

    /// Gatherings the current user hosts or joined, newest first
    pub async fn my_gatherings(
        &self,
        role: GatheringRole,
        page: u32,
    ) -> Result<Vec<MyGathering>, ClientError> {
        let req = self.request(Method::GET, "/api/v1/users/gatherings").query(&[
            ("role", role.as_str().to_string()),
            ("page", page.to_string()),
            ("size", MY_GATHERINGS_PAGE_SIZE.to_string()),
            ("sort", "createdAt,desc".to_string()),
        ]);
        let body: DataEnvelope<MyGathering> = self.execute(req).await?;
        Ok(body.data)
    }
}
