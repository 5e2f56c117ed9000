//! Two-step cover photo upload: ask the backend for a presigned ticket,
//! then send the bytes straight to storage.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use whateat_net::ApiClient;

use crate::error::UploadError;

/// Body of `POST /uploads/recipe-images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeImageUploadRequest {
    pub content_type: String,
    pub file_name: String,
    pub file_size_bytes: usize,
}

/// Presigned upload ticket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeImageUploadTicket {
    #[serde(alias = "upload_url")]
    pub upload_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(alias = "public_url")]
    pub public_url: String,
    #[serde(default = "default_upload_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, alias = "max_size_bytes")]
    pub max_size_bytes: Option<usize>,
}

fn default_upload_method() -> String {
    "PUT".to_string()
}

pub struct CoverImageUploader {
    api: ApiClient,
    max_upload_bytes: usize,
}

impl CoverImageUploader {
    pub fn new(api: ApiClient, max_upload_bytes: usize) -> Self {
        Self {
            api,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Upload `bytes` and return the public URL of the stored image.
    pub async fn upload_cover_photo(
        &self,
        bytes: Bytes,
        mime_type: &str,
        file_name: &str,
        access_token: &str,
    ) -> Result<String, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::InvalidImageData);
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(UploadError::ImageTooLarge {
                max_bytes: self.max_upload_bytes,
            });
        }

        let request = RecipeImageUploadRequest {
            content_type: mime_type.to_string(),
            file_name: file_name.to_string(),
            file_size_bytes: bytes.len(),
        };
        let ticket: RecipeImageUploadTicket = self
            .api
            .post("/uploads/recipe-images", &request, Some(access_token))
            .await?;

        if let Some(server_max) = ticket.max_size_bytes.filter(|max| *max > 0) {
            if bytes.len() > server_max {
                return Err(UploadError::ImageTooLarge {
                    max_bytes: server_max,
                });
            }
        }

        let size = bytes.len();
        let status = self
            .api
            .upload(&ticket.upload_url, &ticket.method, &ticket.headers, bytes)
            .await?;
        if !(200..300).contains(&status) {
            warn!(status, path = ?ticket.path, "Cover upload rejected by storage");
            return Err(UploadError::UploadFailed { status });
        }

        info!(bytes = size, path = ?ticket.path, "Uploaded cover photo");
        Ok(ticket.public_url)
    }
}
