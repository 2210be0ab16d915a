//! In-memory drive transport for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

use driveremote_common::{Error, Result, RootAlias};

use crate::transport::{ByteStream, DriveTransport, Resource, FOLDER_MIME_TYPE};

/// In-memory resource with its content.
#[derive(Debug, Clone)]
struct Entry {
    resource: Resource,
    content: Vec<u8>,
}

/// In-memory drive transport.
///
/// Behaves like an ID-addressed drive: titles are not unique, listings are
/// returned in creation order and the `root`/`appDataFolder` aliases are
/// always present. Every call is counted so tests can assert how many
/// listings or mutations an operation performed.
pub struct MemoryTransport {
    entries: RwLock<Vec<Entry>>,
    list_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
}

impl MemoryTransport {
    /// Create an empty drive.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            mutation_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `list_children` calls so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `create_resource` and `upload_content` calls so far.
    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    /// Insert a folder directly, without counting it as a call.
    pub fn seed_folder(&self, title: &str, parent_id: &str) -> String {
        self.insert(title, parent_id, FOLDER_MIME_TYPE, Vec::new(), None)
    }

    /// Insert a file directly, without counting it as a call.
    pub fn seed_file(
        &self,
        title: &str,
        parent_id: &str,
        content: &[u8],
        md5_checksum: Option<&str>,
    ) -> String {
        self.insert(
            title,
            parent_id,
            "application/octet-stream",
            content.to_vec(),
            md5_checksum.map(String::from),
        )
    }

    /// Move a resource to the trash.
    pub fn trash(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.resource.id == id)
            .ok_or_else(|| Error::NotFound(format!("Resource not found: {}", id)))?;
        entry.resource.trashed = true;
        Ok(())
    }

    /// Content of a resource, if it exists.
    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.resource.id == id)
            .map(|e| e.content.clone())
    }

    /// All non-trashed children of `parent_id` titled `title`.
    pub fn children_titled(&self, parent_id: &str, title: &str) -> Vec<Resource> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| !e.resource.trashed)
            .filter(|e| e.resource.has_parent(parent_id) && e.resource.title == title)
            .map(|e| e.resource.clone())
            .collect()
    }

    /// Total number of resources, trashed ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Check if the drive holds no resources.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(
        &self,
        title: &str,
        parent_id: &str,
        mime_type: &str,
        content: Vec<u8>,
        md5_checksum: Option<String>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let size = (mime_type != FOLDER_MIME_TYPE).then(|| content.len().to_string());
        let resource = Resource {
            id: id.clone(),
            title: title.to_string(),
            mime_type: mime_type.to_string(),
            parents: vec![parent_id.to_string()],
            md5_checksum,
            size,
            modified_time: Some(Utc::now()),
            trashed: false,
        };
        self.entries
            .write()
            .unwrap()
            .push(Entry { resource, content });
        id
    }

    fn is_known_folder(entries: &[Entry], id: &str) -> bool {
        RootAlias::parse(id).is_some()
            || entries
                .iter()
                .any(|e| e.resource.id == id && e.resource.is_folder() && !e.resource.trashed)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriveTransport for MemoryTransport {
    async fn list_children(
        &self,
        parent_id: &str,
        include_trashed: bool,
    ) -> Result<Vec<Resource>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.resource.has_parent(parent_id))
            .filter(|e| include_trashed || !e.resource.trashed)
            .map(|e| e.resource.clone())
            .collect())
    }

    async fn create_resource(
        &self,
        title: &str,
        parent_ids: &[String],
        mime_type: Option<&str>,
    ) -> Result<Resource> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);

        {
            let entries = self.entries.read().unwrap();
            if let Some(missing) = parent_ids
                .iter()
                .find(|id| !Self::is_known_folder(&entries, id))
            {
                return Err(Error::NotFound(format!("Parent folder not found: {}", missing)));
            }
        }

        let parent = parent_ids.first().map(String::as_str).unwrap_or("root");
        let mime_type = mime_type.unwrap_or("application/octet-stream");
        let id = self.insert(title, parent, mime_type, Vec::new(), None);

        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.resource.id == id)
            .ok_or_else(|| Error::NotFound(format!("Resource not found: {}", id)))?;
        entry.resource.parents = parent_ids.to_vec();
        Ok(entry.resource.clone())
    }

    async fn upload_content(&self, resource_id: &str, mut content: ByteStream) -> Result<Resource> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);

        let mut data = Vec::new();
        while let Some(chunk) = content.next().await {
            data.extend_from_slice(&chunk?);
        }

        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.resource.id == resource_id)
            .ok_or_else(|| Error::NotFound(format!("Resource not found: {}", resource_id)))?;

        if entry.resource.is_folder() {
            return Err(Error::InvalidInput(format!(
                "Cannot upload content to folder: {}",
                resource_id
            )));
        }

        entry.resource.size = Some(data.len().to_string());
        entry.resource.modified_time = Some(Utc::now());
        entry.content = data;
        Ok(entry.resource.clone())
    }

    async fn download_content(&self, resource_id: &str) -> Result<ByteStream> {
        let entries = self.entries.read().unwrap();
        let entry = entries
            .iter()
            .find(|e| e.resource.id == resource_id)
            .ok_or_else(|| Error::NotFound(format!("Resource not found: {}", resource_id)))?;

        if entry.resource.is_folder() {
            return Err(Error::InvalidInput(format!(
                "Cannot download folder: {}",
                resource_id
            )));
        }

        let data = Bytes::from(entry.content.clone());
        Ok(Box::pin(stream::once(async move { Ok(data) })))
    }

    async fn get_metadata(&self, resource_id: &str) -> Result<Resource> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.resource.id == resource_id)
            .map(|e| e.resource.clone())
            .ok_or_else(|| Error::NotFound(format!("Resource not found: {}", resource_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let drive = MemoryTransport::new();
        let first = drive.seed_folder("data", "root");
        let second = drive.seed_folder("data", "root");
        drive.seed_folder("other", "appDataFolder");

        let children = drive.list_children("root", false).await.unwrap();
        let ids: Vec<_> = children.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(drive.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_trashed_hidden_by_default() {
        let drive = MemoryTransport::new();
        let id = drive.seed_file("old.bin", "root", b"x", None);
        drive.trash(&id).unwrap();

        assert!(drive.list_children("root", false).await.unwrap().is_empty());
        assert_eq!(drive.list_children("root", true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_under_unknown_parent_fails() {
        let drive = MemoryTransport::new();
        let result = drive
            .create_resource("x", &["missing".to_string()], Some(FOLDER_MIME_TYPE))
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(drive.is_empty());
    }

    #[tokio::test]
    async fn test_upload_and_download_content() {
        let drive = MemoryTransport::new();
        let file = drive
            .create_resource("file.bin", &["root".to_string()], None)
            .await
            .unwrap();

        let body: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"def")),
        ]));
        let updated = drive.upload_content(&file.id, body).await.unwrap();
        assert_eq!(updated.size_bytes(), Some(6));
        assert_eq!(drive.mutation_calls(), 2);

        let mut downloaded = drive.download_content(&file.id).await.unwrap();
        let mut data = Vec::new();
        while let Some(chunk) = downloaded.next().await {
            data.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(data, b"abcdef");
    }

    #[tokio::test]
    async fn test_get_metadata_missing() {
        let drive = MemoryTransport::new();
        assert!(drive.get_metadata("nope").await.unwrap_err().is_not_found());
    }
}
