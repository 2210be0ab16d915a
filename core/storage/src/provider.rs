//! Remote contract consumed by the versioning tool.

use async_trait::async_trait;
use std::path::Path;

use driveremote_common::{Error, Result, StoragePath};

use crate::progress::ProgressReporter;

/// Path-addressed remote storage as seen by the versioning tool.
///
/// Implementations translate paths into whatever addressing the backend
/// uses. Absence is an ordinary outcome for the existence checks and an
/// error everywhere else.
#[async_trait]
pub trait Remote: Send + Sync {
    /// URL scheme handled by this remote (e.g., "gdrive").
    fn scheme(&self) -> &str;

    /// Base location the remote was configured with.
    fn path_info(&self) -> &StoragePath;

    /// Check if a path exists.
    async fn exists(&self, path: &StoragePath) -> Result<bool>;

    /// Check many paths; the result has one entry per input, in input order.
    ///
    /// `progress` is notified once per checked path.
    async fn batch_exists(
        &self,
        paths: &[StoragePath],
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<bool>>;

    /// Upload the local file `from` to `to`.
    ///
    /// `name` labels progress events; `no_progress_bar` suppresses them.
    async fn upload(
        &self,
        from: &Path,
        to: &StoragePath,
        name: &str,
        no_progress_bar: bool,
    ) -> Result<()>;

    /// Download `from` into the local file `to`.
    ///
    /// # Errors
    /// - Path not found
    async fn download(
        &self,
        from: &StoragePath,
        to: &Path,
        name: &str,
        no_progress_bar: bool,
    ) -> Result<()>;

    /// Create every missing folder of `path`, returning the deepest one's ID.
    ///
    /// # Errors
    /// - An existing segment is not a folder
    async fn makedirs(&self, path: &StoragePath) -> Result<String>;

    /// Checksum the backend stores for the file at `path`.
    ///
    /// # Errors
    /// - Path not found or no checksum recorded
    async fn get_file_checksum(&self, path: &StoragePath) -> Result<String>;

    /// Paths of the entries directly under the base location.
    async fn list_cache_paths(&self) -> Result<Vec<StoragePath>>;

    /// Remove a file.
    async fn remove(&self, path: &StoragePath) -> Result<()> {
        Err(Error::NotImplemented(format!(
            "remove is not supported by the {} remote: {}",
            self.scheme(),
            path
        )))
    }
}
