//! Session-aware request sending
//!
//! Requests pick up the current access token at send time. A 401 on the first
//! attempt runs a forced reissue and, if that yields a token, the request is
//! sent once more. The retry's own response is final whatever its status.

use super::GatherClient;
use super::error::ClientError;
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::debug;

impl GatherClient {
    /// Send a request with the session's bearer token, retrying once after a reissue on 401
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        // Streaming bodies cannot be cloned; those requests get no retry.
        let retry = request.try_clone();

        let response = self.authorize(request).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(retry) = retry else {
            debug!("Request body is not replayable, surfacing 401");
            return Ok(response);
        };

        debug!(url = %response.url(), "Received 401, reissuing access token");
        if !self.session().reissue(true).await {
            return Ok(response);
        }

        Ok(self.authorize(retry).send().await?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session().access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}
