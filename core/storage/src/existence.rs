//! Existence checks for one or many paths.

use futures::{stream, FutureExt, StreamExt, TryStreamExt};

use driveremote_common::{Result, StoragePath};

use crate::progress::ProgressReporter;
use crate::resolver::resolve;
use crate::transport::DriveTransport;

/// Check whether `path` resolves to a resource.
pub async fn exists<T>(transport: &T, path: &StoragePath) -> Result<bool>
where
    T: DriveTransport + ?Sized,
{
    Ok(resolve(transport, path, false).await?.is_some())
}

/// Check many paths, at most `concurrency` at a time.
///
/// Results come back in input order whatever order the checks finish in.
/// `progress` is told `finish(<url>)` once per path as its check completes.
///
/// # Errors
/// - The first transport failure aborts the batch
pub async fn batch_exists<T>(
    transport: &T,
    paths: &[StoragePath],
    progress: &dyn ProgressReporter,
    concurrency: usize,
) -> Result<Vec<bool>>
where
    T: DriveTransport + ?Sized,
{
    let checks: Vec<_> = paths
        .iter()
        .map(|path| check_reporting(transport, path, progress).boxed())
        .collect();
    stream::iter(checks)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

async fn check_reporting<T>(
    transport: &T,
    path: &StoragePath,
    progress: &dyn ProgressReporter,
) -> Result<bool>
where
    T: DriveTransport + ?Sized,
{
    let found = exists(transport, path).await?;
    progress.finish(&path.to_string());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use crate::progress::tests::RecordingProgress;
    use crate::transport::{ByteStream, Resource};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Delays listings of selected folders.
    struct SlowListings {
        inner: MemoryTransport,
        delays: HashMap<String, Duration>,
    }

    #[async_trait]
    impl DriveTransport for SlowListings {
        async fn list_children(&self, parent_id: &str, include_trashed: bool) -> Result<Vec<Resource>> {
            if let Some(delay) = self.delays.get(parent_id) {
                tokio::time::sleep(*delay).await;
            }
            self.inner.list_children(parent_id, include_trashed).await
        }

        async fn create_resource(
            &self,
            title: &str,
            parent_ids: &[String],
            mime_type: Option<&str>,
        ) -> Result<Resource> {
            self.inner.create_resource(title, parent_ids, mime_type).await
        }

        async fn upload_content(&self, resource_id: &str, content: ByteStream) -> Result<Resource> {
            self.inner.upload_content(resource_id, content).await
        }

        async fn download_content(&self, resource_id: &str) -> Result<ByteStream> {
            self.inner.download_content(resource_id).await
        }

        async fn get_metadata(&self, resource_id: &str) -> Result<Resource> {
            self.inner.get_metadata(resource_id).await
        }
    }

    #[tokio::test]
    async fn test_exists() {
        let drive = MemoryTransport::new();
        let data = drive.seed_folder("data", "root");
        drive.seed_file("file.bin", &data, b"1", None);

        let present = StoragePath::parse("gdrive://root/data/file.bin").unwrap();
        let absent = StoragePath::parse("gdrive://root/data/other.bin").unwrap();

        assert!(exists(&drive, &present).await.unwrap());
        assert!(!exists(&drive, &absent).await.unwrap());
        assert_eq!(drive.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn test_batch_exists_preserves_order() {
        let drive = MemoryTransport::new();
        let data = drive.seed_folder("data", "root");
        drive.seed_file("b", &data, b"", None);
        drive.seed_file("d", &data, b"", None);

        let urls = [
            "gdrive://root/data/a",
            "gdrive://root/data/b",
            "gdrive://root/missing/c",
            "gdrive://root/data/d",
            "gdrive://root/data",
        ];
        let paths: Vec<_> = urls
            .iter()
            .map(|u| StoragePath::parse(u).unwrap())
            .collect();

        for concurrency in [1, 2, 16] {
            let recorder = RecordingProgress::default();
            let results = batch_exists(&drive, &paths, &recorder, concurrency)
                .await
                .unwrap();
            assert_eq!(results, vec![false, true, false, true, true]);

            let mut notified: Vec<_> = recorder
                .events
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _, _)| name.clone())
                .collect();
            notified.sort();
            let mut expected: Vec<_> = urls.iter().map(|u| u.to_string()).collect();
            expected.sort();
            assert_eq!(notified, expected);
        }
    }

    #[tokio::test]
    async fn test_batch_exists_order_independent_of_completion() {
        let inner = MemoryTransport::new();
        let mut delays = HashMap::new();
        let mut urls = Vec::new();
        for i in 0..5u64 {
            let folder = inner.seed_folder(&format!("f{}", i), "root");
            if i % 2 == 0 {
                inner.seed_file("x", &folder, b"", None);
            }
            // Earlier inputs answer later.
            delays.insert(folder, Duration::from_millis((5 - i) * 40));
            urls.push(format!("gdrive://root/f{}/x", i));
        }
        let drive = SlowListings { inner, delays };
        let paths: Vec<_> = urls.iter().map(|u| StoragePath::parse(u).unwrap()).collect();

        let recorder = RecordingProgress::default();
        let results = batch_exists(&drive, &paths, &recorder, 5).await.unwrap();

        assert_eq!(results, vec![true, false, true, false, true]);

        let notified: Vec<_> = recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _, _)| name.clone())
            .collect();
        let reversed: Vec<_> = urls.iter().rev().cloned().collect();
        assert_eq!(notified, reversed);
    }

    #[tokio::test]
    async fn test_batch_exists_empty() {
        let drive = MemoryTransport::new();
        let recorder = RecordingProgress::default();
        let results = batch_exists(&drive, &[], &recorder, 4).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(drive.list_calls(), 0);
    }
}
