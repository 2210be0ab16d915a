//! On-disk storage of OAuth2 tokens.
//!
//! Tokens live in `<dir>/<creds_id>`, one JSON file per combination of
//! credential namespace, client ID and scopes, so switching any of them
//! never picks up tokens minted for another. Reads and writes hold an
//! exclusive lock on `<creds_id>.lock`; writes replace the file atomically.

use blake2::{Blake2s256, Digest};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use driveremote_common::{Error, Result};

use super::auth::{AuthConfig, Tokens};
use crate::blocking;

/// Subdirectory of the user config dir holding stored tokens.
const CREDENTIALS_SUBDIR: &str = "driveremote/gdrive-oauth2";

/// Token file for one credential namespace.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store for `oauth_id` and `auth_config` inside `dir`.
    pub fn new(dir: impl AsRef<Path>, oauth_id: &str, auth_config: &AuthConfig) -> Self {
        let creds_id = credentials_id(oauth_id, &auth_config.client_id, &auth_config.scopes);
        Self {
            path: dir.as_ref().join(creds_id),
        }
    }

    /// The per-user default directory.
    ///
    /// # Errors
    /// - No config directory can be determined for the current user
    pub fn default_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CREDENTIALS_SUBDIR))
            .ok_or_else(|| {
                Error::InvalidInput("Cannot determine user config directory".to_string())
            })
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock file guarding the token file.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Load stored tokens, if any.
    ///
    /// # Errors
    /// - The file exists but cannot be read or parsed
    pub async fn load(&self) -> Result<Option<Tokens>> {
        let store = self.clone();
        blocking(move || store.load_locked()).await
    }

    /// Write `tokens`, creating the directory if needed.
    pub async fn save(&self, tokens: &Tokens) -> Result<()> {
        let json = serde_json::to_vec_pretty(tokens)
            .map_err(|e| Error::Serialization(format!("Failed to serialize tokens: {}", e)))?;

        let store = self.clone();
        blocking(move || store.save_locked(&json)).await?;

        debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn load_locked(&self) -> Result<Option<Tokens>> {
        if !self.dir().is_dir() {
            debug!("No credentials directory at {}", self.dir().display());
            return Ok(None);
        }

        let _lock = StoreLock::acquire(&self.lock_path())?;
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored credentials at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| Error::Serialization(format!("Invalid credentials file: {}", e)))
    }

    fn save_locked(&self, json: &[u8]) -> Result<()> {
        let dir = self.dir();
        std::fs::create_dir_all(dir)?;

        let _lock = StoreLock::acquire(&self.lock_path())?;
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(json)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Exclusive advisory lock, released on drop.
struct StoreLock {
    file: File,
}

impl StoreLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn credentials_id(oauth_id: &str, client_id: &str, scopes: &[String]) -> String {
    let mut parts = vec![oauth_id, client_id];
    parts.extend(scopes.iter().map(String::as_str));

    let mut hasher = Blake2s256::new();
    hasher.update(parts.join("|").as_bytes());
    format!("{:x}", hasher.finalize())
}
