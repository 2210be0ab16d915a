//! Upload and download between local files and remote paths.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use driveremote_common::{Error, Result, StoragePath};

use crate::blocking;
use crate::progress::{ProgressReporter, TrackReadProgress};
use crate::resolver::resolve;
use crate::transport::{ByteStream, DriveTransport, Resource};

/// Default read chunk for uploads (256KB).
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

fn reader_stream<R>(reader: R, chunk_size: usize) -> ByteStream
where
    R: AsyncRead + Send + 'static,
{
    Box::pin(ReaderStream::with_capacity(reader, chunk_size).map(|chunk| chunk.map_err(Error::from)))
}

/// Upload the local file `from` as a new resource at `to`.
///
/// The parent folder chain of `to` is resolved with creation, so missing
/// folders are created. A new file resource is always created: uploading
/// the same destination twice leaves two resources with the same title.
///
/// The local file is opened before anything is created remotely and is
/// owned by the upload stream, so it is closed on every exit path.
///
/// # Errors
/// - `InvalidInput` if `to` is the root
/// - Local I/O errors reading `from`
/// - Any transport failure
pub async fn upload<T>(
    transport: &T,
    from: &Path,
    to: &StoragePath,
    name: &str,
    progress: Option<Arc<dyn ProgressReporter>>,
    chunk_size: usize,
) -> Result<Resource>
where
    T: DriveTransport + ?Sized,
{
    let parent = to
        .parent()
        .ok_or_else(|| Error::InvalidInput(format!("Cannot upload to the root: {}", to)))?;

    let file = File::open(from).await?;
    let total = file.metadata().await?.len();

    let parent_id = resolve(transport, &parent, true)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Parent folder not found: {}", parent)))?;
    debug!("Uploading {} to {} under {}", from.display(), to, parent_id);

    let resource = transport
        .create_resource(to.name(), &[parent_id], None)
        .await?;

    let content = match progress {
        Some(progress) => {
            progress.update(name, 0, total);
            reader_stream(TrackReadProgress::new(file, name, progress), chunk_size)
        }
        None => reader_stream(file, chunk_size),
    };

    let uploaded = transport.upload_content(&resource.id, content).await?;
    info!("Uploaded {} ({} bytes) to {} as {}", from.display(), total, to, uploaded.id);

    Ok(uploaded)
}

/// Download the resource at `from` into the local file `to`.
///
/// Missing local parent directories are created. Content is written to a
/// temporary file beside `to` and moved into place only once complete, so
/// a failed transfer leaves any existing file at `to` untouched. With a
/// reporter, `name` is marked complete once the file is in place.
///
/// # Errors
/// - `NotFound` if `from` does not resolve
/// - Local I/O errors writing `to`
/// - Any transport failure
pub async fn download<T>(
    transport: &T,
    from: &StoragePath,
    to: &Path,
    name: &str,
    progress: Option<&dyn ProgressReporter>,
) -> Result<()>
where
    T: DriveTransport + ?Sized,
{
    let resource_id = resolve(transport, from, false)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Remote path not found: {}", from)))?;

    let content = transport.download_content(&resource_id).await?;

    let dir = match to.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await?;

    let temp = blocking(move || {
        tempfile::Builder::new()
            .prefix(".driveremote-")
            .tempfile_in(&dir)
            .map_err(Error::from)
    })
    .await?;
    let (file, temp_path) = temp.into_parts();

    // The temporary file is removed when `temp_path` drops on error.
    let written = write_stream(content, File::from_std(file)).await?;

    let target = to.to_path_buf();
    blocking(move || temp_path.persist(&target).map_err(|e| Error::Io(e.error))).await?;
    info!("Downloaded {} ({} bytes) to {}", from, written, to.display());

    if let Some(progress) = progress {
        progress.finish(name);
    }

    Ok(())
}

async fn write_stream(mut content: ByteStream, mut file: File) -> Result<u64> {
    let mut written = 0u64;

    while let Some(chunk) = content.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use crate::progress::tests::RecordingProgress;
    use futures::stream;

    fn path(url: &str) -> StoragePath {
        StoragePath::parse(url).unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_download_round_trip() {
        let drive = MemoryTransport::new();
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("out").join("dst.bin");
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&src, &data).await.unwrap();

        let remote = path("gdrive://root/data/ab/cdef");
        upload(&drive, &src, &remote, "cdef", None, 4096)
            .await
            .unwrap();
        download(&drive, &remote, &dst, "cdef", None).await.unwrap();

        assert_eq!(tokio::fs::read(&dst).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_upload_twice_creates_duplicates() {
        let drive = MemoryTransport::new();
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        tokio::fs::write(&src, b"payload").await.unwrap();

        let remote = path("gdrive://root/data/file.bin");
        let first = upload(&drive, &src, &remote, "file", None, DEFAULT_CHUNK_SIZE)
            .await
            .unwrap();
        let second = upload(&drive, &src, &remote, "file", None, DEFAULT_CHUNK_SIZE)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        let data = drive.children_titled("root", "data");
        assert_eq!(data.len(), 1);
        assert_eq!(drive.children_titled(&data[0].id, "file.bin").len(), 2);
    }

    #[tokio::test]
    async fn test_upload_to_root_child() {
        let drive = MemoryTransport::new();
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        tokio::fs::write(&src, b"top").await.unwrap();

        let uploaded = upload(&drive, &src, &path("gdrive://root/top.bin"), "top", None, 16)
            .await
            .unwrap();

        assert_eq!(uploaded.parents, vec!["root".to_string()]);
        assert_eq!(drive.list_calls(), 0);
        assert_eq!(drive.content(&uploaded.id).unwrap(), b"top");
    }

    #[tokio::test]
    async fn test_upload_reports_progress() {
        let drive = MemoryTransport::new();
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        tokio::fs::write(&src, vec![7u8; 10_000]).await.unwrap();

        let recorder = Arc::new(RecordingProgress::default());
        upload(
            &drive,
            &src,
            &path("gdrive://root/p.bin"),
            "p.bin",
            Some(recorder.clone() as Arc<dyn ProgressReporter>),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(
            recorder.events.lock().unwrap().first().cloned(),
            Some(("p.bin".to_string(), 0, 10_000))
        );
        let advanced: u64 = recorder.advanced.lock().unwrap().iter().map(|(_, d)| *d).sum();
        assert_eq!(advanced, 10_000);
    }

    #[tokio::test]
    async fn test_upload_missing_local_file_creates_nothing() {
        let drive = MemoryTransport::new();
        let dir = tempfile::tempdir().unwrap();

        let result = upload(
            &drive,
            &dir.path().join("nope"),
            &path("gdrive://root/a/b"),
            "b",
            None,
            DEFAULT_CHUNK_SIZE,
        )
        .await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(drive.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_to_root_rejected() {
        let drive = MemoryTransport::new();
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        tokio::fs::write(&src, b"x").await.unwrap();

        let result = upload(&drive, &src, &path("gdrive://root"), "x", None, 16).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let drive = MemoryTransport::new();
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("dst.bin");

        let err = download(&drive, &path("gdrive://root/missing"), &dst, "m", None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_download_marks_progress_complete() {
        let drive = MemoryTransport::new();
        drive.seed_file("f.bin", "root", b"content", None);
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("f.bin");
        let recorder = RecordingProgress::default();

        download(&drive, &path("gdrive://root/f.bin"), &dst, "f.bin", Some(&recorder))
            .await
            .unwrap();

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![("f.bin".to_string(), 1, 1)]
        );
    }

    /// Serves a stream that breaks after the first chunk.
    struct BrokenDownload(MemoryTransport);

    #[async_trait::async_trait]
    impl DriveTransport for BrokenDownload {
        async fn list_children(&self, parent_id: &str, include_trashed: bool) -> Result<Vec<Resource>> {
            self.0.list_children(parent_id, include_trashed).await
        }

        async fn create_resource(
            &self,
            title: &str,
            parent_ids: &[String],
            mime_type: Option<&str>,
        ) -> Result<Resource> {
            self.0.create_resource(title, parent_ids, mime_type).await
        }

        async fn upload_content(&self, resource_id: &str, content: ByteStream) -> Result<Resource> {
            self.0.upload_content(resource_id, content).await
        }

        async fn download_content(&self, _resource_id: &str) -> Result<ByteStream> {
            Ok(Box::pin(stream::iter(vec![
                Ok(bytes::Bytes::from_static(b"first")),
                Err(Error::Network("connection reset".to_string())),
            ])))
        }

        async fn get_metadata(&self, resource_id: &str) -> Result<Resource> {
            self.0.get_metadata(resource_id).await
        }
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_partial_file() {
        let drive = BrokenDownload(MemoryTransport::new());
        drive.0.seed_file("f.bin", "root", b"content", None);
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("partial.bin");

        let err = download(&drive, &path("gdrive://root/f.bin"), &dst, "f", None)
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert!(!dst.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_keeps_existing_file() {
        let drive = BrokenDownload(MemoryTransport::new());
        drive.0.seed_file("f.bin", "root", b"content", None);
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("existing.bin");
        tokio::fs::write(&dst, b"previous good copy").await.unwrap();

        let recorder = RecordingProgress::default();
        let err = download(&drive, &path("gdrive://root/f.bin"), &dst, "f", Some(&recorder))
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(tokio::fs::read(&dst).await.unwrap(), b"previous good copy");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_replaces_existing_file() {
        let drive = MemoryTransport::new();
        drive.seed_file("f.bin", "root", b"new", None);
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("f.bin");
        tokio::fs::write(&dst, b"older and longer").await.unwrap();

        download(&drive, &path("gdrive://root/f.bin"), &dst, "f", None)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&dst).await.unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
