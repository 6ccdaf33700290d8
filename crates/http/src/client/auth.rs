//! Authentication API client methods

use super::{ClientError, GatherClient};
use crate::types::{AccessTokenResponse, EmailVerificationRequest, LoginRequest, SignupRequest};
use gather_core::UserId;
use serde_json::json;

impl GatherClient {
    /// Log in with email and password, and start a session with the issued token
    ///
    /// Bad credentials come back as [`ClientError::AuthenticationFailed`]
    /// without touching any existing session.
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Option<UserId>, ClientError> {
        let req = self
            .request(reqwest::Method::POST, "/api/v1/auth/login")
            .json(&LoginRequest {
                email: email.into(),
                password: password.into(),
            });
        let body: AccessTokenResponse = self.execute_public(req).await?;
        let token = body
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ClientError::ServerError {
                status: 200,
                message: "login response did not contain an access token".into(),
            })?;

        self.session().login(token)?;
        Ok(self.session().user_id())
    }

    /// Create an account; the email must have been verified first
    pub async fn signup(&self, request: &SignupRequest) -> Result<(), ClientError> {
        let req = self
            .request(reqwest::Method::POST, "/api/v1/auth/signup")
            .json(request);
        self.execute_public_empty(req).await
    }

    /// Send a verification mail to `email`
    pub async fn send_email_verification(
        &self,
        email: impl Into<String>,
    ) -> Result<(), ClientError> {
        let req = self
            .request(reqwest::Method::POST, "/api/v1/auth/email/verification")
            .json(&EmailVerificationRequest {
                email: email.into(),
            });
        self.execute_public_empty(req).await
    }

    /// Check whether the mailed verification link has been followed
    ///
    /// The pending signup is identified by a cookie set by
    /// [`GatherClient::send_email_verification`].
    pub async fn confirm_email_verification(&self) -> Result<(), ClientError> {
        let req = self
            .request(
                reqwest::Method::POST,
                "/api/v1/auth/email/verification/confirm",
            )
            .json(&json!({}));
        self.execute_public_empty(req).await
    }

    /// End the session; server errors are logged, local state is always cleared
    pub async fn logout(&self) {
        self.session().logout().await;
    }
}
