//! Google Drive remote implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use driveremote_common::{Error, Result, StoragePath, GDRIVE_SCHEME};

use crate::existence;
use crate::materializer;
use crate::progress::{LogProgress, ProgressReporter};
use crate::provider::Remote;
use crate::resolver::resolve;
use crate::transfer::{self, DEFAULT_CHUNK_SIZE};
use crate::transport::DriveTransport;

use super::auth::{AuthConfig, AuthManager, TokenManager, Tokens};
use super::client::DriveClient;
use super::credentials::CredentialStore;

fn default_oauth_id() -> String {
    "default".to_string()
}

fn default_batch_concurrency() -> usize {
    8
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Google Drive remote configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GDriveConfig {
    /// Remote URL, `gdrive://<root>/<path>`.
    pub url: String,
    /// OAuth2 tokens. Loaded from the credential store when absent.
    #[serde(default)]
    pub tokens: Option<Tokens>,
    /// Optional custom OAuth2 configuration.
    #[serde(default)]
    pub auth_config: Option<AuthConfig>,
    /// Namespace for stored credentials.
    #[serde(default = "default_oauth_id")]
    pub oauth_id: String,
    /// Directory holding stored credentials (default: user config dir).
    #[serde(default)]
    pub credentials_dir: Option<PathBuf>,
    /// Maximum concurrent resolutions in `batch_exists`.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// Read chunk size for uploads.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl GDriveConfig {
    /// Configuration for `url` with every other setting at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tokens: None,
            auth_config: None,
            oauth_id: default_oauth_id(),
            credentials_dir: None,
            batch_concurrency: default_batch_concurrency(),
            chunk_size: default_chunk_size(),
        }
    }

    /// Credential store selected by this configuration.
    pub fn credential_store(&self) -> Result<CredentialStore> {
        let dir = match &self.credentials_dir {
            Some(dir) => dir.clone(),
            None => CredentialStore::default_dir()?,
        };
        let auth_config = self.auth_config.clone().unwrap_or_default();
        Ok(CredentialStore::new(dir, &self.oauth_id, &auth_config))
    }
}

/// Google Drive remote.
///
/// Every path operation walks the path from the configured root through
/// the transport; nothing about the remote tree is cached between calls.
pub struct GDriveProvider {
    path_info: StoragePath,
    transport: Arc<dyn DriveTransport>,
    token_manager: Option<Arc<TokenManager>>,
    progress: Arc<dyn ProgressReporter>,
    batch_concurrency: usize,
    chunk_size: usize,
}

impl GDriveProvider {
    /// Create a Google Drive remote talking to the Drive API.
    ///
    /// Without configured tokens, they are read from the credential store
    /// on first use.
    ///
    /// # Errors
    /// - The URL is malformed or not a `gdrive://` URL
    /// - No tokens configured and no credential store available
    /// - Invalid OAuth2 configuration
    pub fn new(config: GDriveConfig) -> Result<Self> {
        let path_info = parse_remote_url(&config.url)?;
        let auth_manager = AuthManager::new(config.auth_config.clone().unwrap_or_default())?;

        let token_manager = match (config.tokens.clone(), config.credential_store()) {
            (Some(tokens), Ok(store)) => TokenManager::new(auth_manager, tokens).with_store(store),
            (Some(tokens), Err(e)) => {
                warn!("Refreshed tokens will not be persisted: {}", e);
                TokenManager::new(auth_manager, tokens)
            }
            (None, Ok(store)) => TokenManager::from_store(auth_manager, store),
            (None, Err(e)) => {
                return Err(Error::Authentication(format!(
                    "No tokens configured and no credential store: {}",
                    e
                )))
            }
        };
        let token_manager = Arc::new(token_manager);
        let client = DriveClient::new(token_manager.clone())?;

        let mut provider = Self::with_transport(path_info, Arc::new(client));
        provider.token_manager = Some(token_manager);
        provider.batch_concurrency = config.batch_concurrency;
        provider.chunk_size = config.chunk_size;
        Ok(provider)
    }

    /// Create a remote on top of any transport.
    pub fn with_transport(path_info: StoragePath, transport: Arc<dyn DriveTransport>) -> Self {
        Self {
            path_info,
            transport,
            token_manager: None,
            progress: Arc::new(LogProgress),
            batch_concurrency: default_batch_concurrency(),
            chunk_size: default_chunk_size(),
        }
    }

    /// Report transfer progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Bound concurrent resolutions in `batch_exists`.
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    /// The root, lower-cased.
    pub fn root(&self) -> String {
        self.path_info.root()
    }

    /// Get current tokens (useful for persistence).
    ///
    /// `None` for remotes built on a custom transport.
    pub async fn get_tokens(&self) -> Result<Option<Tokens>> {
        match &self.token_manager {
            Some(manager) => manager.get_tokens().await.map(Some),
            None => Ok(None),
        }
    }

    /// Resolve `path` to a resource ID without creating anything.
    pub async fn resolve(&self, path: &StoragePath) -> Result<Option<String>> {
        resolve(self.transport.as_ref(), path, false).await
    }
}

pub(crate) fn parse_remote_url(url: &str) -> Result<StoragePath> {
    let path = StoragePath::parse(url)?;
    if path.scheme() != GDRIVE_SCHEME {
        return Err(Error::InvalidInput(format!(
            "Expected a {}:// URL, got {}",
            GDRIVE_SCHEME, url
        )));
    }
    Ok(path)
}

#[async_trait]
impl Remote for GDriveProvider {
    fn scheme(&self) -> &str {
        GDRIVE_SCHEME
    }

    fn path_info(&self) -> &StoragePath {
        &self.path_info
    }

    async fn exists(&self, path: &StoragePath) -> Result<bool> {
        existence::exists(self.transport.as_ref(), path).await
    }

    async fn batch_exists(
        &self,
        paths: &[StoragePath],
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<bool>> {
        existence::batch_exists(
            self.transport.as_ref(),
            paths,
            progress,
            self.batch_concurrency,
        )
        .await
    }

    async fn upload(
        &self,
        from: &Path,
        to: &StoragePath,
        name: &str,
        no_progress_bar: bool,
    ) -> Result<()> {
        let progress = (!no_progress_bar).then(|| self.progress.clone());
        transfer::upload(
            self.transport.as_ref(),
            from,
            to,
            name,
            progress,
            self.chunk_size,
        )
        .await?;
        Ok(())
    }

    async fn download(
        &self,
        from: &StoragePath,
        to: &Path,
        name: &str,
        no_progress_bar: bool,
    ) -> Result<()> {
        let progress = (!no_progress_bar).then(|| self.progress.as_ref());
        transfer::download(self.transport.as_ref(), from, to, name, progress).await
    }

    async fn makedirs(&self, path: &StoragePath) -> Result<String> {
        materializer::makedirs(self.transport.as_ref(), path).await
    }

    async fn get_file_checksum(&self, path: &StoragePath) -> Result<String> {
        let file_id = self
            .resolve(path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Remote path not found: {}", path)))?;

        let resource = self.transport.get_metadata(&file_id).await?;
        resource
            .md5_checksum
            .ok_or_else(|| Error::NotFound(format!("No md5Checksum recorded for {}", path)))
    }

    async fn list_cache_paths(&self) -> Result<Vec<StoragePath>> {
        let Some(base_id) = self.resolve(&self.path_info).await? else {
            debug!("list_cache_paths: {} does not exist", self.path_info);
            return Ok(Vec::new());
        };

        let children = self.transport.list_children(&base_id, false).await?;
        let mut paths = Vec::with_capacity(children.len());

        for child in children {
            match self.path_info.join(&child.title) {
                Ok(path) => paths.push(path),
                Err(e) => warn!("Skipping {} ({}): {}", child.title, child.id, e),
            }
        }

        Ok(paths)
    }
}

/// Create a Google Drive remote from configuration.
pub fn create_gdrive_provider(config: serde_json::Value) -> Result<Arc<dyn Remote>> {
    let gdrive_config: GDriveConfig = serde_json::from_value(config)
        .map_err(|e| Error::InvalidInput(format!("Invalid GDrive config: {}", e)))?;

    Ok(Arc::new(GDriveProvider::new(gdrive_config)?))
}
