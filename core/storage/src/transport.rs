//! The ID-addressed transport the remote is built on.
//!
//! The transport knows nothing about paths. It lists children of a folder
//! ID, creates resources under parent IDs and moves bytes in and out of a
//! resource ID. Everything path-shaped lives in the resolver on top.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use driveremote_common::Result;

/// MIME type that marks a resource as a folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Byte stream type for upload/download operations.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// One node of the remote hierarchy as returned by a listing call.
///
/// Titles are not unique: several resources may share a title under the
/// same parent, and a resource may have several parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Opaque resource ID.
    pub id: String,
    /// Display name.
    #[serde(rename = "name")]
    pub title: String,
    /// MIME type.
    pub mime_type: String,
    /// Parent folder IDs.
    #[serde(default)]
    pub parents: Vec<String>,
    /// MD5 checksum (only for binary files).
    #[serde(default)]
    pub md5_checksum: Option<String>,
    /// File size in bytes, as the API's decimal string.
    #[serde(default)]
    pub size: Option<String>,
    /// Modified time.
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// Trashed status.
    #[serde(default)]
    pub trashed: bool,
}

impl Resource {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }

    /// Check whether `parent_id` is one of this resource's parents.
    pub fn has_parent(&self, parent_id: &str) -> bool {
        self.parents.iter().any(|p| p == parent_id)
    }
}

/// Authenticated access to an ID-addressed drive.
///
/// Implementations own authentication, sessions and any retry policy.
/// Every method is a single request/response exchange from the caller's
/// point of view.
#[async_trait]
pub trait DriveTransport: Send + Sync {
    /// List every child of `parent_id`, following pagination to the end.
    ///
    /// Trashed resources are excluded unless `include_trashed` is set.
    async fn list_children(&self, parent_id: &str, include_trashed: bool)
        -> Result<Vec<Resource>>;

    /// Create an empty resource titled `title` under `parent_ids`.
    ///
    /// With `mime_type` set to [`FOLDER_MIME_TYPE`] this creates a folder.
    async fn create_resource(
        &self,
        title: &str,
        parent_ids: &[String],
        mime_type: Option<&str>,
    ) -> Result<Resource>;

    /// Replace the content of `resource_id` with `content`.
    async fn upload_content(&self, resource_id: &str, content: ByteStream) -> Result<Resource>;

    /// Stream the content of `resource_id`.
    async fn download_content(&self, resource_id: &str) -> Result<ByteStream>;

    /// Fetch metadata of `resource_id`.
    async fn get_metadata(&self, resource_id: &str) -> Result<Resource>;
}
