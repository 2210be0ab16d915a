//! Google Drive API client.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Body, Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use driveremote_common::{Error, Result};

use super::auth::TokenManager;
use crate::transport::{ByteStream, DriveTransport, Resource};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields requested for every resource.
const RESOURCE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,parents,md5Checksum,trashed";
/// Fields requested for listings.
const LIST_FIELDS: &str =
    "files(id,name,mimeType,size,modifiedTime,parents,md5Checksum,trashed),nextPageToken";
/// Largest page size the listing endpoint accepts.
const PAGE_SIZE: &str = "1000";

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    files: Vec<Resource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Build the listing query for children of `parent_id`.
fn children_query(parent_id: &str, include_trashed: bool) -> String {
    let parent_id = parent_id.replace('\\', "\\\\").replace('\'', "\\'");
    if include_trashed {
        format!("'{}' in parents", parent_id)
    } else {
        format!("'{}' in parents and trashed = false", parent_id)
    }
}

/// Build the metadata body for a new resource.
fn create_body(title: &str, parent_ids: &[String], mime_type: Option<&str>) -> serde_json::Value {
    let mut metadata = serde_json::json!({
        "name": title,
        "parents": parent_ids,
    });

    if let Some(mime_type) = mime_type {
        metadata["mimeType"] = serde_json::json!(mime_type);
    }

    metadata
}

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    token_manager: Arc<TokenManager>,
}

impl DriveClient {
    /// Create a new Drive client.
    ///
    /// # Errors
    /// - HTTP client construction failure
    pub fn new(token_manager: Arc<TokenManager>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("driveremote/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token_manager,
        })
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        let token = self.token_manager.get_access_token().await?;
        Ok(format!("Bearer {}", token))
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Network(format!("Failed to parse response: {}", e)))
    }

    /// Map non-success statuses onto the error taxonomy.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound("Resource not found".to_string()))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(Error::Authentication(
                "Invalid or expired token".to_string(),
            ))
        } else if status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            Err(Error::PermissionDenied(format!("Access denied: {}", body)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Network(format!("API error: {} - {}", status, body)))
        }
    }
}

#[async_trait]
impl DriveTransport for DriveClient {
    async fn list_children(
        &self,
        parent_id: &str,
        include_trashed: bool,
    ) -> Result<Vec<Resource>> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let query = children_query(parent_id, include_trashed);
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let auth = self.auth_header().await?;

            let mut request = self
                .http
                .get(&url)
                .header(header::AUTHORIZATION, auth)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", LIST_FIELDS),
                    ("pageSize", PAGE_SIZE),
                ]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::Network(format!("Failed to list folder: {}", e)))?;

            let list_response: FileListResponse = self.handle_response(response).await?;
            all_files.extend(list_response.files);

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Listed {} children of {}", all_files.len(), parent_id);
        Ok(all_files)
    }

    async fn create_resource(
        &self,
        title: &str,
        parent_ids: &[String],
        mime_type: Option<&str>,
    ) -> Result<Resource> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", RESOURCE_FIELDS)])
            .json(&create_body(title, parent_ids, mime_type))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create resource: {}", e)))?;

        self.handle_response(response).await
    }

    async fn upload_content(&self, resource_id: &str, content: ByteStream) -> Result<Resource> {
        let url = format!("{}/files/{}", DRIVE_UPLOAD_BASE, resource_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .patch(&url)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .query(&[("uploadType", "media"), ("fields", RESOURCE_FIELDS)])
            .body(Body::wrap_stream(content))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload content: {}", e)))?;

        self.handle_response(response).await
    }

    async fn download_content(&self, resource_id: &str) -> Result<ByteStream> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, resource_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to start download: {}", e)))?;

        let response = Self::check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| Error::Network(format!("Stream read error: {}", e))));

        Ok(Box::pin(stream))
    }

    async fn get_metadata(&self, resource_id: &str) -> Result<Resource> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, resource_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", RESOURCE_FIELDS)])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get metadata: {}", e)))?;

        self.handle_response(response).await
    }
}
