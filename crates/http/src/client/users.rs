//! User profile and review client methods

use super::{ClientError, GatherClient};
use crate::types::{ReviewPage, ReviewSettingRequest, UserProfile};
use gather_core::UserId;
use reqwest::Method;

impl GatherClient {
    /// Public profile of a user, with the first page of reviews
    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile, ClientError> {
        let req = self.request(Method::GET, &format!("/api/v1/users/{user_id}"));
        self.execute(req).await
    }

    /// Profile of the signed-in user
    ///
    /// The user id comes from the access token; a session without one is
    /// reported as an authentication failure.
    pub async fn my_profile(&self) -> Result<UserProfile, ClientError> {
        let user_id = self.current_user()?;
        self.profile(user_id).await
    }

    /// Page of reviews, starting after `cursor` when given
    pub async fn reviews(
        &self,
        user_id: UserId,
        cursor: Option<&str>,
    ) -> Result<ReviewPage, ClientError> {
        let mut req = self.request(Method::GET, &format!("/api/v1/users/{user_id}/reviews"));
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }
        self.execute(req).await
    }

    /// Show or hide the signed-in user's reviews on their profile
    pub async fn set_reviews_public(&self, public: bool) -> Result<(), ClientError> {
        let user_id = self.current_user()?;
        let req = self
            .request(
                Method::PATCH,
                &format!("/api/v1/users/{user_id}/review-setting"),
            )
            .json(&ReviewSettingRequest {
                reviews_public: public,
            });
        self.execute_empty(req).await
    }

    fn current_user(&self) -> Result<UserId, ClientError> {
        self.session().user_id().ok_or_else(|| {
            ClientError::AuthenticationFailed("no signed-in user for this request".into())
        })
    }
}
