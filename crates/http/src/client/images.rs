//! Image upload client methods
//!
//! Uploads are two steps: the API hands out a presigned object-storage URL,
//! then the bytes go straight to storage. Only the first step is a session
//! request; the storage PUT carries no bearer token.

use super::{ClientError, GatherClient};
use crate::types::{ImageRef, PresignedUpload, PresignedUrlRequest};
use reqwest::{Method, header};
use tracing::debug;

impl GatherClient {
    /// Ask the API for an upload target for a file
    pub async fn presigned_upload(
        &self,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Result<PresignedUpload, ClientError> {
        let req = self
            .request(Method::POST, "/api/v1/images/presigned-url")
            .json(&PresignedUrlRequest {
                file_name: file_name.into(),
                file_type: content_type.into(),
            });
        self.execute(req).await
    }

    /// PUT raw bytes to a presigned URL
    pub async fn put_presigned(
        &self,
        upload: &PresignedUpload,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        let req = self
            .client
            .put(&upload.upload_url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        self.execute_public_empty(req).await
    }

    /// Upload an image and return where it was stored
    ///
    /// The returned reference goes into `gatheringImage` or `profileImage`
    /// of a later request.
    pub async fn upload_image(
        &self,
        file_name: impl Into<String>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageRef, ClientError> {
        let upload = self.presigned_upload(file_name, content_type).await?;
        let bucket = upload.bucket.clone().ok_or_else(|| ClientError::ServerError {
            status: 200,
            message: "presigned upload response did not name a bucket".into(),
        })?;

        debug!(key = %upload.key, size = bytes.len(), "Uploading image");
        self.put_presigned(&upload, content_type, bytes).await?;

        Ok(ImageRef {
            bucket,
            key: upload.key,
        })
    }
}
